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

//! Wire types shared by every CORE service: orders, trades, wallet
//! movements, portfolio holdings, and the client-facing response envelope.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies an order (and, for a child order, the completed leg it
/// represents) across every service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockTxId(pub Uuid);

impl StockTxId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for StockTxId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for StockTxId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Identifies a single wallet debit or credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletTxId(pub Uuid);

impl WalletTxId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for WalletTxId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for WalletTxId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Money and prices are integer minor units throughout the core so that
/// matching and settlement arithmetic never touches floating point.
pub type MinorUnits = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	pub fn opposite(self) -> Side {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
	Market,
	Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	InProgress,
	PartiallyComplete,
	Completed,
	Cancelled,
}

impl OrderStatus {
	/// Terminal statuses never transition further.
	pub fn is_terminal(self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}
}

/// An order as recorded by the Order Store. `remaining_qty` and `status`
/// are the fields the matching engine and settlement coordinator mutate;
/// everything else is fixed at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub stock_tx_id: StockTxId,
	pub stock_id: String,
	pub user_id: String,
	pub side: Side,
	pub order_type: OrderType,
	/// Present iff `order_type == Limit`, and then strictly positive.
	pub limit_price: Option<MinorUnits>,
	pub original_qty: u64,
	pub remaining_qty: u64,
	/// Set on a child order produced by a partial fill.
	pub parent_tx_id: Option<StockTxId>,
	/// Set when a completed leg causes a wallet movement.
	pub wallet_tx_id: Option<WalletTxId>,
	pub status: OrderStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// status=COMPLETED ⇒ remaining_qty = 0.
	pub fn invariant_holds(&self) -> bool {
		if self.status == OrderStatus::Completed && self.remaining_qty != 0 {
			return false;
		}
		if self.order_type == OrderType::Limit && self.limit_price.is_none_or(|p| p == 0) {
			return false;
		}
		true
	}
}

/// Emitted by the matching engine upon each match. Never updated once
/// created; it is the unit of work handed to settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
	pub buy_tx_id: StockTxId,
	pub sell_tx_id: StockTxId,
	/// History/Order Store id for the buy-side leg: `buy_tx_id` itself if
	/// this trade fully completed the buy order, or a freshly minted
	/// child id if the buy order still rests afterward.
	pub buy_leg_tx_id: StockTxId,
	/// Same as `buy_leg_tx_id`, for the sell side.
	pub sell_leg_tx_id: StockTxId,
	pub stock_id: String,
	pub qty: u64,
	pub execution_price: MinorUnits,
	pub buyer_id: String,
	pub seller_id: String,
	pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletMovementKind {
	Debit,
	Credit,
}

/// A debit or credit against a user wallet, linked to the originating
/// `stock_tx_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMovement {
	pub wallet_tx_id: WalletTxId,
	pub stock_tx_id: StockTxId,
	pub user_id: String,
	pub kind: WalletMovementKind,
	pub amount: MinorUnits,
	pub created_at: DateTime<Utc>,
}

/// Per (user_id, stock_id) share ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioHolding {
	pub user_id: String,
	pub stock_id: String,
	pub quantity_owned: u64,
}

/// Inbound placement request, as accepted by the Intake API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
	pub stock_id: String,
	pub side: Side,
	pub order_type: OrderType,
	pub quantity: u64,
	/// Required iff `order_type == Limit`.
	pub price: Option<MinorUnits>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
	pub stock_tx_id: StockTxId,
	pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
	pub stock_tx_id: StockTxId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderResponse {
	pub stock_tx_id: StockTxId,
	pub status: OrderStatus,
	pub stock_id: String,
	pub side: Side,
	/// Quantity that was still resting (and therefore un-escrowed, for a
	/// SELL) at the moment of cancellation.
	pub remaining_qty: u64,
}

/// Client-facing response envelope: every REST response is
/// shaped `{success, data, message}`, independent of HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl<T> ApiResponse<T> {
	pub fn ok(data: T) -> Self {
		Self {
			success: true,
			data: Some(data),
			message: None,
		}
	}

	pub fn err(message: impl Into<String>) -> Self {
		Self {
			success: false,
			data: None,
			message: Some(message.into()),
		}
	}
}
