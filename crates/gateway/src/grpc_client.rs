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

//! gRPC client the Intake API uses to dispatch an admitted order to the
//! matching engine. Mirrors the conversion functions in
//! `core_matching::server`, just in the opposite direction.

use std::time::Duration;

use core_sdk::types::{CancelOrderRequest, CancelOrderResponse, OrderStatus, OrderType, PlaceOrderRequest, PlaceOrderResponse, Side, StockTxId};
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};

pub mod proto {
	tonic::include_proto!("core.matching");
}

use proto::matching_service_client::MatchingServiceClient;
use proto::{
	CancelOrderRequest as ProtoCancelRequest, CancelOrderResponse as ProtoCancelResponse,
	OrderSide as ProtoSide, OrderStatus as ProtoStatus, OrderType as ProtoOrderType,
	SubmitOrderRequest as ProtoSubmitRequest, SubmitOrderResponse as ProtoSubmitResponse,
};

#[derive(Debug, Error)]
pub enum MatchingClientError {
	#[error("gRPC transport error: {0}")]
	Transport(String),
	#[error("gRPC status error: {0}")]
	Status(String),
	#[error("order rejected: {0}")]
	Rejected(String),
}

fn side_to_proto(side: Side) -> ProtoSide {
	match side {
		Side::Buy => ProtoSide::Buy,
		Side::Sell => ProtoSide::Sell,
	}
}

fn order_type_to_proto(order_type: OrderType) -> ProtoOrderType {
	match order_type {
		OrderType::Market => ProtoOrderType::Market,
		OrderType::Limit => ProtoOrderType::Limit,
	}
}

fn side_from_proto(side: ProtoSide) -> Result<Side, MatchingClientError> {
	match side {
		ProtoSide::Buy => Ok(Side::Buy),
		ProtoSide::Sell => Ok(Side::Sell),
		ProtoSide::Unspecified => Err(MatchingClientError::Status(
			"matching engine returned an unspecified side".to_string(),
		)),
	}
}

fn status_from_proto(status: ProtoStatus) -> Result<OrderStatus, MatchingClientError> {
	match status {
		ProtoStatus::InProgress => Ok(OrderStatus::InProgress),
		ProtoStatus::PartiallyComplete => Ok(OrderStatus::PartiallyComplete),
		ProtoStatus::Completed => Ok(OrderStatus::Completed),
		ProtoStatus::Cancelled => Ok(OrderStatus::Cancelled),
		ProtoStatus::Unspecified => Err(MatchingClientError::Status(
			"matching engine returned an unspecified order status".to_string(),
		)),
	}
}

fn parse_stock_tx_id(raw: &str) -> Result<StockTxId, MatchingClientError> {
	raw.parse::<uuid::Uuid>()
		.map(StockTxId)
		.map_err(|e| MatchingClientError::Status(format!("invalid stock_tx_id from matching engine: {e}")))
}

/// gRPC client for the matching engine, dialed once at gateway startup
/// and shared across every dispatched request.
#[derive(Clone)]
pub struct MatchingGrpcClient {
	client: MatchingServiceClient<Channel>,
}

impl MatchingGrpcClient {
	pub async fn new(endpoint: &str, timeout: Duration) -> Result<Self, MatchingClientError> {
		let channel = Endpoint::from_shared(endpoint.to_string())
			.map_err(|e| MatchingClientError::Transport(format!("invalid endpoint: {e}")))?
			.timeout(timeout)
			.connect()
			.await
			.map_err(|e| MatchingClientError::Transport(format!("connection failed: {e}")))?;

		Ok(Self {
			client: MatchingServiceClient::new(channel),
		})
	}

	/// Submit an admitted order. A `NO_LIQUIDITY` rejection of a MARKET
	/// order comes back as
	/// `Err(MatchingClientError::Rejected)`, not a successful response -
	/// the matching engine reports it as a `CANCELLED` status with a
	/// `NO_LIQUIDITY` message rather than a gRPC error.
	pub async fn submit_order(
		&self,
		user_id: &str,
		request: &PlaceOrderRequest,
	) -> Result<PlaceOrderResponse, MatchingClientError> {
		let mut client = self.client.clone();

		let proto_request = ProtoSubmitRequest {
			stock_id: request.stock_id.clone(),
			user_id: user_id.to_string(),
			side: side_to_proto(request.side) as i32,
			order_type: order_type_to_proto(request.order_type) as i32,
			quantity: request.quantity,
			price: request.price,
		};

		let response: ProtoSubmitResponse = client
			.submit_order(tonic::Request::new(proto_request))
			.await
			.map_err(|e| MatchingClientError::Status(format!("gRPC error: {e}")))?
			.into_inner();

		let status = status_from_proto(response.status())?;
		if status == OrderStatus::Cancelled && response.message == "NO_LIQUIDITY" {
			return Err(MatchingClientError::Rejected("NO_LIQUIDITY".to_string()));
		}

		Ok(PlaceOrderResponse {
			stock_tx_id: parse_stock_tx_id(&response.stock_tx_id)?,
			status,
		})
	}

	pub async fn cancel_order(
		&self,
		user_id: &str,
		request: &CancelOrderRequest,
	) -> Result<CancelOrderResponse, MatchingClientError> {
		let mut client = self.client.clone();

		let proto_request = ProtoCancelRequest {
			stock_tx_id: request.stock_tx_id.to_string(),
			user_id: user_id.to_string(),
		};

		let response: ProtoCancelResponse = client
			.cancel_order(tonic::Request::new(proto_request))
			.await
			.map_err(|e| MatchingClientError::Status(format!("gRPC error: {e}")))?
			.into_inner();

		Ok(CancelOrderResponse {
			stock_tx_id: parse_stock_tx_id(&response.stock_tx_id)?,
			status: status_from_proto(response.status())?,
			stock_id: response.stock_id.clone(),
			side: side_from_proto(response.side())?,
			remaining_qty: response.remaining_qty,
		})
	}
}
