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

//! Types used inside the matching engine pipeline: the command an inbound
//! `NEW_ORDER`/`CANCEL_ORDER` event is normalized into, the engine's
//! in-book representation of a resting order, and the outcome handed back
//! after processing one command.

use chrono::{DateTime, Utc};
use core_sdk::{CoreErrorKind, MinorUnits, Order, OrderStatus, OrderType, Side, StockTxId, Trade};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// A placement or cancellation, normalized from the event bus into the
/// shape the per-stock worker consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderCommand {
	New {
		stock_tx_id: StockTxId,
		stock_id: String,
		user_id: String,
		side: Side,
		order_type: OrderType,
		quantity: u64,
		/// Required iff `order_type == Limit`.
		price: Option<MinorUnits>,
		created_at: DateTime<Utc>,
	},
	Cancel {
		stock_tx_id: StockTxId,
		updated_at: DateTime<Utc>,
	},
}

impl OrderCommand {
	pub fn stock_tx_id(&self) -> StockTxId {
		match self {
			OrderCommand::New { stock_tx_id, .. } => *stock_tx_id,
			OrderCommand::Cancel { stock_tx_id, .. } => *stock_tx_id,
		}
	}
}

/// The engine's in-book representation of a resting order. Only LIMIT
/// orders ever rest, so `limit_price` is always
/// populated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentOrder {
	pub stock_tx_id: StockTxId,
	pub stock_id: String,
	pub user_id: String,
	pub side: Side,
	pub limit_price: MinorUnits,
	pub remaining_qty: u64,
	pub created_at: DateTime<Utc>,
}

impl ResidentOrder {
	pub fn from_order(order: &Order) -> Option<Self> {
		if order.order_type != OrderType::Limit {
			return None;
		}
		Some(Self {
			stock_tx_id: order.stock_tx_id,
			stock_id: order.stock_id.clone(),
			user_id: order.user_id.clone(),
			side: order.side,
			limit_price: order.limit_price?,
			remaining_qty: order.remaining_qty,
			created_at: order.created_at,
		})
	}
}

/// One `OrderCommand` paired with the channel its caller is waiting on.
/// This is what actually flows through the ingress queue: the queue's
/// backpressure boundary and the request/response boundary are the same
/// boundary here, since the matching loop can answer a command as fast
/// as it can dequeue it.
pub struct EngineRequest {
	pub command: OrderCommand,
	pub respond_to: oneshot::Sender<Result<MatchOutcome, MatchingError>>,
}

/// Outcome of processing one `OrderCommand` against a stock's book: the
/// trades it produced (in execution order) and the resulting status of
/// the inbound order itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
	pub stock_tx_id: StockTxId,
	pub trades: Vec<Trade>,
	pub status: OrderStatus,
	pub remaining_qty: u64,
}

/// Error types for matching operations.
#[derive(Debug, Error)]
pub enum MatchingError {
	#[error("invalid order: {0}")]
	InvalidOrder(String),
	#[error("order book error: {0}")]
	OrderBookError(String),
	#[error("stock not found: {0}")]
	StockNotFound(String),
	#[error("no opposing liquidity for market order")]
	NoLiquidity,
	#[error("order store conflict on {0}")]
	Conflict(StockTxId),
}

impl From<&MatchingError> for CoreErrorKind {
	fn from(err: &MatchingError) -> Self {
		match err {
			MatchingError::InvalidOrder(_) => CoreErrorKind::InvalidInput,
			MatchingError::OrderBookError(_) => CoreErrorKind::Internal,
			MatchingError::StockNotFound(_) => CoreErrorKind::NotFound,
			MatchingError::NoLiquidity => CoreErrorKind::NoLiquidity,
			MatchingError::Conflict(_) => CoreErrorKind::Conflict,
		}
	}
}
