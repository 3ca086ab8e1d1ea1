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

//! Per-stock order book: two price-time-priority queues (bids, asks) kept
//! in `BTreeMap`s keyed so that the best price sits at the first entry,
//! giving O(log n) insert/remove and O(1) best-price peek.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use core_sdk::{MinorUnits, Side, StockTxId};
use thiserror::Error;

use crate::types::ResidentOrder;

/// Bids are ordered by price descending, then by arrival time ascending:
/// wrapping price in `Reverse` makes the highest price sort first.
type BidKey = (Reverse<MinorUnits>, DateTime<Utc>, StockTxId);
/// Asks are ordered by price ascending, then by arrival time ascending.
type AskKey = (MinorUnits, DateTime<Utc>, StockTxId);

#[derive(Debug, Error)]
pub enum OrderBookError {
	#[error("order {0} already present in book")]
	AlreadyPresent(StockTxId),
	#[error("order {0} not found in book")]
	NotFound(StockTxId),
	#[error("cannot remove {0} more than its resting quantity")]
	OverRemoval(StockTxId),
}

pub struct OrderBook {
	stock_id: String,
	bids: BTreeMap<BidKey, ResidentOrder>,
	asks: BTreeMap<AskKey, ResidentOrder>,
	bid_index: HashMap<StockTxId, BidKey>,
	ask_index: HashMap<StockTxId, AskKey>,
}

impl OrderBook {
	pub fn new(stock_id: impl Into<String>) -> Self {
		Self {
			stock_id: stock_id.into(),
			bids: BTreeMap::new(),
			asks: BTreeMap::new(),
			bid_index: HashMap::new(),
			ask_index: HashMap::new(),
		}
	}

	pub fn stock_id(&self) -> &str {
		&self.stock_id
	}

	/// Insert a resting LIMIT order. Only LIMIT orders occupy a stable
	/// price-ordered position; a MARKET order is never inserted here.
	pub fn insert(&mut self, order: ResidentOrder) -> Result<(), OrderBookError> {
		let tx_id = order.stock_tx_id;
		match order.side {
			Side::Buy => {
				if self.bid_index.contains_key(&tx_id) {
					return Err(OrderBookError::AlreadyPresent(tx_id));
				}
				let key = (Reverse(order.limit_price), order.created_at, tx_id);
				self.bid_index.insert(tx_id, key);
				self.bids.insert(key, order);
			}
			Side::Sell => {
				if self.ask_index.contains_key(&tx_id) {
					return Err(OrderBookError::AlreadyPresent(tx_id));
				}
				let key = (order.limit_price, order.created_at, tx_id);
				self.ask_index.insert(tx_id, key);
				self.asks.insert(key, order);
			}
		}
		Ok(())
	}

	pub fn best_bid(&self) -> Option<&ResidentOrder> {
		self.bids.values().next()
	}

	pub fn best_ask(&self) -> Option<&ResidentOrder> {
		self.asks.values().next()
	}

	pub fn best_bid_mut(&mut self) -> Option<&mut ResidentOrder> {
		self.bids.values_mut().next()
	}

	pub fn best_ask_mut(&mut self) -> Option<&mut ResidentOrder> {
		self.asks.values_mut().next()
	}

	/// Remove the current best bid/ask entirely (used when a match fully
	/// consumes the resting order).
	pub fn pop_best(&mut self, side: Side) -> Option<ResidentOrder> {
		match side {
			Side::Buy => {
				let key = *self.bids.keys().next()?;
				let order = self.bids.remove(&key)?;
				self.bid_index.remove(&order.stock_tx_id);
				Some(order)
			}
			Side::Sell => {
				let key = *self.asks.keys().next()?;
				let order = self.asks.remove(&key)?;
				self.ask_index.remove(&order.stock_tx_id);
				Some(order)
			}
		}
	}

	/// Decrement the remaining quantity of the current best order on
	/// `side` by `qty` without removing it from the book (a partial fill
	/// of the resting order).
	pub fn reduce_best(&mut self, side: Side, qty: u64) -> Result<(), OrderBookError> {
		let order = match side {
			Side::Buy => self.bids.values_mut().next(),
			Side::Sell => self.asks.values_mut().next(),
		}
		.ok_or(OrderBookError::NotFound(StockTxId::new()))?;

		if qty > order.remaining_qty {
			return Err(OrderBookError::OverRemoval(order.stock_tx_id));
		}
		order.remaining_qty -= qty;
		Ok(())
	}

	/// Remove a specific resting order by id, regardless of book
	/// position.
	pub fn remove(&mut self, stock_tx_id: StockTxId, side: Side) -> Option<ResidentOrder> {
		match side {
			Side::Buy => {
				let key = self.bid_index.remove(&stock_tx_id)?;
				self.bids.remove(&key)
			}
			Side::Sell => {
				let key = self.ask_index.remove(&stock_tx_id)?;
				self.asks.remove(&key)
			}
		}
	}

	/// Remove a resting order without knowing which side it is on (used
	/// for cancellation, where the caller only has a `stock_tx_id`).
	pub fn remove_any(&mut self, stock_tx_id: StockTxId) -> Option<ResidentOrder> {
		self.remove(stock_tx_id, Side::Buy)
			.or_else(|| self.remove(stock_tx_id, Side::Sell))
	}

	pub fn find(&self, stock_tx_id: StockTxId, side: Side) -> Option<&ResidentOrder> {
		match side {
			Side::Buy => self
				.bid_index
				.get(&stock_tx_id)
				.and_then(|k| self.bids.get(k)),
			Side::Sell => self
				.ask_index
				.get(&stock_tx_id)
				.and_then(|k| self.asks.get(k)),
		}
	}

	/// True iff the top of book can cross: `bid.price >= ask.price`.
	pub fn crosses(&self) -> bool {
		match (self.best_bid(), self.best_ask()) {
			(Some(bid), Some(ask)) => bid.limit_price >= ask.limit_price,
			_ => false,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.bids.is_empty() && self.asks.is_empty()
	}

	pub fn bid_count(&self) -> usize {
		self.bids.len()
	}

	pub fn ask_count(&self) -> usize {
		self.asks.len()
	}

	/// Snapshot every resting order, best-first per side, for
	/// serialization into a `Snapshot` (crate::snapshot).
	pub fn resting_orders(&self) -> impl Iterator<Item = &ResidentOrder> {
		self.bids.values().chain(self.asks.values())
	}
}

#[cfg(test)]
mod tests {
	use chrono::Duration;

	use super::*;

	fn order(tx: StockTxId, side: Side, price: u64, qty: u64, t: DateTime<Utc>) -> ResidentOrder {
		ResidentOrder {
			stock_tx_id: tx,
			stock_id: "ACME".to_string(),
			user_id: "u1".to_string(),
			side,
			limit_price: price,
			remaining_qty: qty,
			created_at: t,
		}
	}

	#[test]
	fn best_bid_is_highest_price() {
		let mut book = OrderBook::new("ACME");
		let t0 = Utc::now();
		book.insert(order(StockTxId::new(), Side::Buy, 50, 10, t0))
			.unwrap();
		book.insert(order(
			StockTxId::new(),
			Side::Buy,
			60,
			10,
			t0 + Duration::seconds(1),
		))
		.unwrap();
		assert_eq!(book.best_bid().unwrap().limit_price, 60);
	}

	#[test]
	fn best_ask_is_lowest_price() {
		let mut book = OrderBook::new("ACME");
		let t0 = Utc::now();
		book.insert(order(StockTxId::new(), Side::Sell, 60, 10, t0))
			.unwrap();
		book.insert(order(
			StockTxId::new(),
			Side::Sell,
			50,
			10,
			t0 + Duration::seconds(1),
		))
		.unwrap();
		assert_eq!(book.best_ask().unwrap().limit_price, 50);
	}

	#[test]
	fn price_time_priority_among_equal_prices() {
		let mut book = OrderBook::new("ACME");
		let t0 = Utc::now();
		let first = StockTxId::new();
		let second = StockTxId::new();
		book.insert(order(first, Side::Sell, 50, 10, t0)).unwrap();
		book.insert(order(second, Side::Sell, 50, 10, t0 + Duration::seconds(1)))
			.unwrap();
		assert_eq!(book.best_ask().unwrap().stock_tx_id, first);
	}

	#[test]
	fn crosses_iff_bid_at_least_ask() {
		let t0 = Utc::now();

		let mut book = OrderBook::new("ACME");
		book.insert(order(StockTxId::new(), Side::Buy, 49, 10, t0))
			.unwrap();
		book.insert(order(StockTxId::new(), Side::Sell, 50, 10, t0))
			.unwrap();
		assert!(!book.crosses());

		let mut book = OrderBook::new("ACME");
		book.insert(order(StockTxId::new(), Side::Buy, 50, 10, t0))
			.unwrap();
		book.insert(order(StockTxId::new(), Side::Sell, 50, 10, t0))
			.unwrap();
		assert!(book.crosses());
	}

	#[test]
	fn remove_cancels_resting_order() {
		let mut book = OrderBook::new("ACME");
		let tx = StockTxId::new();
		book.insert(order(tx, Side::Buy, 50, 10, Utc::now()))
			.unwrap();
		assert!(book.remove(tx, Side::Buy).is_some());
		assert!(book.is_empty());
	}

	#[test]
	fn reduce_best_decrements_without_removing() {
		let mut book = OrderBook::new("ACME");
		book.insert(order(StockTxId::new(), Side::Sell, 50, 10, Utc::now()))
			.unwrap();
		book.reduce_best(Side::Sell, 4).unwrap();
		assert_eq!(book.best_ask().unwrap().remaining_qty, 6);
	}
}
