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

//! gRPC surface for the Settlement Coordinator.
//!
//! `SubmitTrade` is the matching engine's only call into this service
//! (mirrored by `core_matching::client::SettlementGrpcClient`): it
//! enqueues the trade onto its shard and returns `PENDING` immediately,
//! since the saga itself runs asynchronously. `GetSettlementStatus` lets
//! an operator or test poll for the eventual `SETTLED`/`FAILED` outcome.

use core_sdk::{StockTxId, Trade};
use tonic::{Request, Response, Status};

use crate::saga::{SettlementCoordinator, SettlementOutcome};

pub mod proto {
	tonic::include_proto!("core.settlement");
}

use proto::settlement_service_server::{SettlementService, SettlementServiceServer};
use proto::{
	GetSettlementStatusRequest, GetSettlementStatusResponse, SettlementStatus as ProtoStatus,
	SubmitTradeRequest, SubmitTradeResponse, Trade as ProtoTrade,
};

fn parse_stock_tx_id(raw: &str) -> Result<StockTxId, Status> {
	raw.parse::<uuid::Uuid>()
		.map(StockTxId)
		.map_err(|_| Status::invalid_argument(format!("invalid stock_tx_id: {}", raw)))
}

fn trade_from_proto(trade: ProtoTrade) -> Result<Trade, Status> {
	Ok(Trade {
		buy_tx_id: parse_stock_tx_id(&trade.buy_tx_id)?,
		sell_tx_id: parse_stock_tx_id(&trade.sell_tx_id)?,
		buy_leg_tx_id: parse_stock_tx_id(&trade.buy_leg_tx_id)?,
		sell_leg_tx_id: parse_stock_tx_id(&trade.sell_leg_tx_id)?,
		stock_id: trade.stock_id,
		qty: trade.qty,
		execution_price: trade.execution_price,
		buyer_id: trade.buyer_id,
		seller_id: trade.seller_id,
		executed_at: trade
			.executed_at
			.parse()
			.map_err(|e| Status::invalid_argument(format!("invalid executed_at: {e}")))?,
	})
}

fn outcome_to_proto(outcome: SettlementOutcome) -> ProtoStatus {
	match outcome {
		SettlementOutcome::Pending => ProtoStatus::Pending,
		SettlementOutcome::Settled => ProtoStatus::Settled,
		SettlementOutcome::Failed => ProtoStatus::Failed,
	}
}

pub struct SettlementServiceImpl {
	coordinator: SettlementCoordinator,
}

impl SettlementServiceImpl {
	pub fn new(coordinator: SettlementCoordinator) -> Self {
		Self { coordinator }
	}
}

#[tonic::async_trait]
impl SettlementService for SettlementServiceImpl {
	async fn submit_trade(
		&self,
		request: Request<SubmitTradeRequest>,
	) -> Result<Response<SubmitTradeResponse>, Status> {
		let req = request.into_inner();
		let proto_trade = req
			.trade
			.ok_or_else(|| Status::invalid_argument("trade is required"))?;
		let trade = trade_from_proto(proto_trade)?;

		self.coordinator
			.submit_trade(trade)
			.await
			.map_err(|e| Status::invalid_argument(e.detail))?;

		Ok(Response::new(SubmitTradeResponse {
			status: ProtoStatus::Pending as i32,
			message: String::new(),
		}))
	}

	async fn get_settlement_status(
		&self,
		request: Request<GetSettlementStatusRequest>,
	) -> Result<Response<GetSettlementStatusResponse>, Status> {
		let req = request.into_inner();
		let buy_tx_id = parse_stock_tx_id(&req.buy_tx_id)?;
		let sell_tx_id = parse_stock_tx_id(&req.sell_tx_id)?;

		let (outcome, message) = self
			.coordinator
			.status_of(buy_tx_id, sell_tx_id)
			.ok_or_else(|| Status::not_found("no settlement recorded for this trade"))?;

		Ok(Response::new(GetSettlementStatusResponse {
			status: outcome_to_proto(outcome) as i32,
			message,
		}))
	}
}

/// Create the settlement gRPC service server.
pub fn create_server(coordinator: SettlementCoordinator) -> SettlementServiceServer<SettlementServiceImpl> {
	SettlementServiceServer::new(SettlementServiceImpl::new(coordinator))
}
