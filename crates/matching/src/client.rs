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

//! gRPC client the matching engine uses to hand a just-executed trade to
//! the Settlement Coordinator. Forwarding is fire-and-forget from the engine's
//! point of view - the coordinator is the authoritative owner of the saga
//! and retries on its own, so this client only needs one attempt per call
//! site; `server.rs` is responsible for logging a failure, not retrying it.

use std::time::Duration;

use core_sdk::Trade;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};

pub mod proto {
	tonic::include_proto!("core.settlement");
}

use proto::settlement_service_client::SettlementServiceClient;
use proto::{SettlementStatus, SubmitTradeRequest, Trade as ProtoTrade};

#[derive(Debug, Error)]
pub enum SettlementClientError {
	#[error("gRPC transport error: {0}")]
	Transport(String),
	#[error("gRPC status error: {0}")]
	Status(String),
}

fn trade_to_proto(trade: &Trade) -> ProtoTrade {
	ProtoTrade {
		buy_tx_id: trade.buy_tx_id.to_string(),
		sell_tx_id: trade.sell_tx_id.to_string(),
		stock_id: trade.stock_id.clone(),
		qty: trade.qty,
		execution_price: trade.execution_price,
		buyer_id: trade.buyer_id.clone(),
		seller_id: trade.seller_id.clone(),
		executed_at: trade.executed_at.to_rfc3339(),
		buy_leg_tx_id: trade.buy_leg_tx_id.to_string(),
		sell_leg_tx_id: trade.sell_leg_tx_id.to_string(),
	}
}

/// gRPC client for the settlement service.
#[derive(Clone)]
pub struct SettlementGrpcClient {
	client: SettlementServiceClient<Channel>,
}

impl SettlementGrpcClient {
	pub async fn new(endpoint: &str) -> Result<Self, SettlementClientError> {
		let channel = Endpoint::from_shared(endpoint.to_string())
			.map_err(|e| SettlementClientError::Transport(format!("invalid endpoint: {e}")))?
			.timeout(Duration::from_secs(10))
			.connect()
			.await
			.map_err(|e| SettlementClientError::Transport(format!("connection failed: {e}")))?;

		Ok(Self {
			client: SettlementServiceClient::new(channel),
		})
	}

	/// Hand one matched trade to settlement. Returns the settlement
	/// status the coordinator accepted the trade with (typically
	/// `PENDING`, since the saga runs asynchronously after this returns).
	pub async fn submit_trade(&mut self, trade: Trade) -> Result<SettlementStatus, SettlementClientError> {
		let request = SubmitTradeRequest {
			trade: Some(trade_to_proto(&trade)),
		};

		let response = self
			.client
			.submit_trade(tonic::Request::new(request))
			.await
			.map_err(|e| SettlementClientError::Status(format!("gRPC error: {e}")))?
			.into_inner();

		SettlementStatus::try_from(response.status)
			.map_err(|_| SettlementClientError::Status(format!("unknown settlement status {}", response.status)))
	}
}
