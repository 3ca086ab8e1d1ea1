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

use chrono::Utc;
use core_sdk::{Order, OrderStatus, Side, StockTxId};
use dashmap::DashMap;

use super::{OrderStore, OrderStoreError};

/// In-process `DashMap`-backed Order Store. A real deployment would back
/// the same trait with a transactional database; this is the MVP
/// substitution point, not a scoped-down feature.
pub struct MemoryOrderStore {
	orders: DashMap<StockTxId, Order>,
}

impl MemoryOrderStore {
	pub fn new() -> Self {
		Self {
			orders: DashMap::new(),
		}
	}
}

impl Default for MemoryOrderStore {
	fn default() -> Self {
		Self::new()
	}
}

impl OrderStore for MemoryOrderStore {
	fn insert(&self, order: Order) -> Result<(), OrderStoreError> {
		let stock_tx_id = order.stock_tx_id;
		if self.orders.contains_key(&stock_tx_id) {
			return Err(OrderStoreError::AlreadyExists(stock_tx_id));
		}
		self.orders.insert(stock_tx_id, order);
		Ok(())
	}

	fn get(&self, stock_tx_id: StockTxId) -> Result<Order, OrderStoreError> {
		self.orders
			.get(&stock_tx_id)
			.map(|entry| entry.value().clone())
			.ok_or(OrderStoreError::NotFound(stock_tx_id))
	}

	fn list_by_user(&self, user_id: &str) -> Vec<Order> {
		let mut orders: Vec<Order> = self
			.orders
			.iter()
			.filter(|entry| entry.value().user_id == user_id)
			.map(|entry| entry.value().clone())
			.collect();
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		orders
	}

	fn list_by_stock_side_status(&self, stock_id: &str, side: Side, status: OrderStatus) -> Vec<Order> {
		self.orders
			.iter()
			.filter(|entry| {
				let order = entry.value();
				order.stock_id == stock_id && order.side == side && order.status == status
			})
			.map(|entry| entry.value().clone())
			.collect()
	}

	fn compare_and_swap(
		&self,
		stock_tx_id: StockTxId,
		expected_status: OrderStatus,
		new_status: OrderStatus,
		new_remaining_qty: u64,
	) -> Result<(), OrderStoreError> {
		let mut entry = self
			.orders
			.get_mut(&stock_tx_id)
			.ok_or(OrderStoreError::NotFound(stock_tx_id))?;

		if entry.status != expected_status {
			return Err(OrderStoreError::Conflict(stock_tx_id, entry.status));
		}

		entry.status = new_status;
		entry.remaining_qty = new_remaining_qty;
		entry.updated_at = Utc::now();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use core_sdk::OrderType;

	use super::*;

	fn test_order(stock_tx_id: StockTxId, user_id: &str, stock_id: &str) -> Order {
		let now = Utc::now();
		Order {
			stock_tx_id,
			stock_id: stock_id.to_string(),
			user_id: user_id.to_string(),
			side: Side::Buy,
			order_type: OrderType::Limit,
			limit_price: Some(100),
			original_qty: 10,
			remaining_qty: 10,
			parent_tx_id: None,
			wallet_tx_id: None,
			status: OrderStatus::InProgress,
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn insert_and_get_roundtrips() {
		let store = MemoryOrderStore::new();
		let id = StockTxId::new();
		store.insert(test_order(id, "alice", "ACME")).unwrap();

		let fetched = store.get(id).unwrap();
		assert_eq!(fetched.user_id, "alice");
	}

	#[test]
	fn duplicate_insert_is_rejected() {
		let store = MemoryOrderStore::new();
		let id = StockTxId::new();
		store.insert(test_order(id, "alice", "ACME")).unwrap();

		let result = store.insert(test_order(id, "alice", "ACME"));
		assert!(matches!(result, Err(OrderStoreError::AlreadyExists(_))));
	}

	#[test]
	fn compare_and_swap_succeeds_on_matching_status() {
		let store = MemoryOrderStore::new();
		let id = StockTxId::new();
		store.insert(test_order(id, "alice", "ACME")).unwrap();

		store
			.compare_and_swap(id, OrderStatus::InProgress, OrderStatus::Completed, 0)
			.unwrap();

		let order = store.get(id).unwrap();
		assert_eq!(order.status, OrderStatus::Completed);
		assert_eq!(order.remaining_qty, 0);
	}

	#[test]
	fn compare_and_swap_fails_on_stale_status() {
		let store = MemoryOrderStore::new();
		let id = StockTxId::new();
		store.insert(test_order(id, "alice", "ACME")).unwrap();

		store
			.compare_and_swap(id, OrderStatus::InProgress, OrderStatus::Cancelled, 10)
			.unwrap();

		// A second CAS racing against the first now finds a stale expected status.
		let result = store.compare_and_swap(id, OrderStatus::InProgress, OrderStatus::Completed, 0);
		assert!(matches!(result, Err(OrderStoreError::Conflict(_, OrderStatus::Cancelled))));
	}

	#[test]
	fn list_by_user_orders_most_recent_first() {
		let store = MemoryOrderStore::new();
		let id1 = StockTxId::new();
		let id2 = StockTxId::new();

		let mut o1 = test_order(id1, "alice", "ACME");
		o1.created_at = Utc::now() - chrono::Duration::seconds(10);
		let o2 = test_order(id2, "alice", "ACME");

		store.insert(o1).unwrap();
		store.insert(o2).unwrap();

		let listed = store.list_by_user("alice");
		assert_eq!(listed.len(), 2);
		assert_eq!(listed[0].stock_tx_id, id2);
	}

	#[test]
	fn list_by_stock_side_status_filters_correctly() {
		let store = MemoryOrderStore::new();
		let id1 = StockTxId::new();
		let id2 = StockTxId::new();

		store.insert(test_order(id1, "alice", "ACME")).unwrap();
		let mut other = test_order(id2, "bob", "ACME");
		other.side = Side::Sell;
		store.insert(other).unwrap();

		let buys = store.list_by_stock_side_status("ACME", Side::Buy, OrderStatus::InProgress);
		assert_eq!(buys.len(), 1);
		assert_eq!(buys[0].stock_tx_id, id1);
	}
}
