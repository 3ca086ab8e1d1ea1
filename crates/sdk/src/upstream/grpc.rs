// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! gRPC-backed implementations of the wallet/portfolio/history client
//! traits. Any transport or status failure is reported as
//! `CoreErrorKind::UpstreamUnavailable` so callers (the saga, the intake
//! pre-check) know to retry it; the upstream services never
//! return any other `CoreErrorKind` over the wire in this contract, so
//! every other kind is also folded into `UpstreamUnavailable` rather than
//! guessed at.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};

use super::proto::history_service_client::HistoryServiceClient;
use super::proto::portfolio_service_client::PortfolioServiceClient;
use super::proto::wallet_service_client::WalletServiceClient;
use super::proto::{
	GetBalanceRequest, GetHoldingRequest, PortfolioMovementRequest, RecordStockTxRequest,
	RecordWalletTxRequest, WalletMovementRequest,
};
use super::{HistoryClient, PortfolioClient, WalletClient};
use crate::error::{CoreError, CoreErrorKind};
use crate::types::{Order, StockTxId, WalletMovement, WalletTxId};

fn upstream_unavailable(detail: impl Into<String>) -> CoreError {
	CoreError::new(CoreErrorKind::UpstreamUnavailable, detail.into())
}

async fn connect(endpoint: &str) -> Result<Channel, CoreError> {
	Endpoint::from_shared(endpoint.to_string())
		.map_err(|e| upstream_unavailable(format!("invalid endpoint {endpoint}: {e}")))?
		.timeout(Duration::from_secs(5))
		.connect()
		.await
		.map_err(|e| upstream_unavailable(format!("connecting to {endpoint}: {e}")))
}

#[derive(Clone)]
pub struct WalletGrpcClient {
	client: WalletServiceClient<Channel>,
}

impl WalletGrpcClient {
	pub async fn new(endpoint: &str) -> Result<Self, CoreError> {
		Ok(Self {
			client: WalletServiceClient::new(connect(endpoint).await?),
		})
	}
}

#[async_trait]
impl WalletClient for WalletGrpcClient {
	async fn balance(&self, user_id: &str) -> Result<u64, CoreError> {
		let resp = self
			.client
			.clone()
			.get_balance(GetBalanceRequest {
				user_id: user_id.to_string(),
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?
			.into_inner();
		Ok(resp.balance)
	}

	async fn debit(&self, idempotency_key: StockTxId, user_id: &str, amount: u64) -> Result<WalletTxId, CoreError> {
		let resp = self
			.client
			.clone()
			.debit(WalletMovementRequest {
				idempotency_key: idempotency_key.to_string(),
				user_id: user_id.to_string(),
				amount,
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?
			.into_inner();
		parse_wallet_tx_id(&resp.wallet_tx_id)
	}

	async fn credit(&self, idempotency_key: StockTxId, user_id: &str, amount: u64) -> Result<WalletTxId, CoreError> {
		let resp = self
			.client
			.clone()
			.credit(WalletMovementRequest {
				idempotency_key: idempotency_key.to_string(),
				user_id: user_id.to_string(),
				amount,
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?
			.into_inner();
		parse_wallet_tx_id(&resp.wallet_tx_id)
	}
}

fn parse_wallet_tx_id(raw: &str) -> Result<WalletTxId, CoreError> {
	raw.parse::<uuid::Uuid>()
		.map(WalletTxId)
		.map_err(|e| upstream_unavailable(format!("malformed wallet_tx_id {raw}: {e}")))
}

#[derive(Clone)]
pub struct PortfolioGrpcClient {
	client: PortfolioServiceClient<Channel>,
}

impl PortfolioGrpcClient {
	pub async fn new(endpoint: &str) -> Result<Self, CoreError> {
		Ok(Self {
			client: PortfolioServiceClient::new(connect(endpoint).await?),
		})
	}
}

#[async_trait]
impl PortfolioClient for PortfolioGrpcClient {
	async fn holding(&self, user_id: &str, stock_id: &str) -> Result<u64, CoreError> {
		let resp = self
			.client
			.clone()
			.get_holding(GetHoldingRequest {
				user_id: user_id.to_string(),
				stock_id: stock_id.to_string(),
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?
			.into_inner();
		Ok(resp.quantity_owned)
	}

	async fn debit_shares(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		stock_id: &str,
		quantity: u64,
	) -> Result<(), CoreError> {
		self.client
			.clone()
			.debit_shares(PortfolioMovementRequest {
				idempotency_key: idempotency_key.to_string(),
				user_id: user_id.to_string(),
				stock_id: stock_id.to_string(),
				quantity,
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?;
		Ok(())
	}

	async fn credit_shares(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		stock_id: &str,
		quantity: u64,
	) -> Result<(), CoreError> {
		self.client
			.clone()
			.credit_shares(PortfolioMovementRequest {
				idempotency_key: idempotency_key.to_string(),
				user_id: user_id.to_string(),
				stock_id: stock_id.to_string(),
				quantity,
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?;
		Ok(())
	}
}

#[derive(Clone)]
pub struct HistoryGrpcClient {
	client: HistoryServiceClient<Channel>,
}

impl HistoryGrpcClient {
	pub async fn new(endpoint: &str) -> Result<Self, CoreError> {
		Ok(Self {
			client: HistoryServiceClient::new(connect(endpoint).await?),
		})
	}
}

#[async_trait]
impl HistoryClient for HistoryGrpcClient {
	async fn record_stock_tx(&self, idempotency_key: StockTxId, order: &Order) -> Result<(), CoreError> {
		self.client
			.clone()
			.record_stock_tx(RecordStockTxRequest {
				idempotency_key: idempotency_key.to_string(),
				stock_tx_id: order.stock_tx_id.to_string(),
				stock_id: order.stock_id.clone(),
				user_id: order.user_id.clone(),
				side: format!("{:?}", order.side),
				order_type: format!("{:?}", order.order_type),
				qty: order.original_qty,
				execution_price: order.limit_price.unwrap_or(0),
				status: format!("{:?}", order.status),
				recorded_at: order.updated_at.to_rfc3339(),
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?;
		Ok(())
	}

	async fn record_wallet_tx(&self, idempotency_key: StockTxId, movement: &WalletMovement) -> Result<(), CoreError> {
		self.client
			.clone()
			.record_wallet_tx(RecordWalletTxRequest {
				idempotency_key: idempotency_key.to_string(),
				wallet_tx_id: movement.wallet_tx_id.to_string(),
				stock_tx_id: movement.stock_tx_id.to_string(),
				user_id: movement.user_id.clone(),
				kind: format!("{:?}", movement.kind),
				amount: movement.amount,
				recorded_at: movement.created_at.to_rfc3339(),
			})
			.await
			.map_err(|status| upstream_unavailable(status.to_string()))?;
		Ok(())
	}
}
