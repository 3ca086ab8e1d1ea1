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

use std::collections::HashMap;

use core_sdk::StockTxId;

use super::{JournalError, OrderJournal};
use crate::types::OrderCommand;

/// In-memory implementation of Order Journal for MVP
///
/// This implementation provides a lightweight, non-persistent journal
/// suitable for initial development and testing. It maintains orders
/// in memory with minimal overhead.
///
/// Characteristics:
/// - No fsync or durability guarantees
/// - Fast append and lookup operations
/// - Simple HashMap-based storage
/// - Lifecycle: covers only "received -> completed" interval
///
/// Future evolution paths:
/// - Add mmap-backed storage for crash persistence
/// - Implement truncation/compaction for long-running systems
/// - Replace with external log system (Kafka, etc.)
pub struct MemoryOrderJournal {
	/// Active orders indexed by stock_tx_id
	active_orders: HashMap<StockTxId, OrderCommand>,
	/// Completed order ids for cleanup tracking
	completed_orders: Vec<StockTxId>,
}

impl MemoryOrderJournal {
	pub fn new() -> Self {
		Self {
			active_orders: HashMap::new(),
			completed_orders: Vec::new(),
		}
	}

	/// Perform cleanup of completed orders
	///
	/// This can be called periodically to reclaim memory.
	/// In production, this would be coordinated with State Journal commits.
	pub fn compact(&mut self) {
		for stock_tx_id in self.completed_orders.drain(..) {
			self.active_orders.remove(&stock_tx_id);
		}
	}
}

impl Default for MemoryOrderJournal {
	fn default() -> Self {
		Self::new()
	}
}

impl OrderJournal for MemoryOrderJournal {
	fn append(&mut self, order: OrderCommand) -> Result<(), JournalError> {
		let stock_tx_id = order.stock_tx_id();
		if self.active_orders.contains_key(&stock_tx_id) {
			return Err(JournalError::DuplicateOrder(stock_tx_id));
		}

		self.active_orders.insert(stock_tx_id, order);
		Ok(())
	}

	fn is_active(&self, stock_tx_id: StockTxId) -> bool {
		self.active_orders.contains_key(&stock_tx_id)
	}

	fn mark_completed(&mut self, stock_tx_id: StockTxId) {
		if self.active_orders.contains_key(&stock_tx_id) {
			self.completed_orders.push(stock_tx_id);
		}
	}

	fn replay(&self) -> Box<dyn Iterator<Item = OrderCommand> + '_> {
		Box::new(self.active_orders.values().cloned())
	}

	fn active_count(&self) -> usize {
		self.active_orders.len()
	}
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use core_sdk::{MinorUnits, OrderType, Side};

	use super::*;

	fn create_test_order(stock_tx_id: StockTxId, stock_id: &str) -> OrderCommand {
		OrderCommand::New {
			stock_tx_id,
			stock_id: stock_id.to_string(),
			user_id: "u1".to_string(),
			side: Side::Buy,
			order_type: OrderType::Limit,
			quantity: 1,
			price: Some(50_000 as MinorUnits),
			created_at: Utc::now(),
		}
	}

	#[test]
	fn test_append_and_is_active() {
		let mut journal = MemoryOrderJournal::new();
		let tx = StockTxId::new();
		let order = create_test_order(tx, "ACME");

		assert!(!journal.is_active(tx));

		journal.append(order.clone()).unwrap();
		assert!(journal.is_active(tx));
		assert_eq!(journal.active_count(), 1);
	}

	#[test]
	fn test_duplicate_order_rejected() {
		let mut journal = MemoryOrderJournal::new();
		let tx = StockTxId::new();
		let order = create_test_order(tx, "ACME");

		journal.append(order.clone()).unwrap();
		let result = journal.append(order.clone());

		assert!(result.is_err());
		assert!(matches!(result, Err(JournalError::DuplicateOrder(_))));
	}

	#[test]
	fn test_mark_completed() {
		let mut journal = MemoryOrderJournal::new();
		let tx = StockTxId::new();
		let order = create_test_order(tx, "ACME");

		journal.append(order).unwrap();
		assert!(journal.is_active(tx));

		journal.mark_completed(tx);
		// Still active until compact is called
		assert!(journal.is_active(tx));

		journal.compact();
		assert!(!journal.is_active(tx));
		assert_eq!(journal.active_count(), 0);
	}

	#[test]
	fn test_replay() {
		let mut journal = MemoryOrderJournal::new();
		let ids: Vec<StockTxId> = (0..5).map(|_| StockTxId::new()).collect();

		for &tx in &ids {
			journal.append(create_test_order(tx, "ACME")).unwrap();
		}

		let replayed: Vec<_> = journal.replay().collect();
		assert_eq!(replayed.len(), 5);

		journal.mark_completed(ids[0]);
		journal.mark_completed(ids[2]);
		journal.compact();

		let replayed_after_compact: Vec<_> = journal.replay().collect();
		assert_eq!(replayed_after_compact.len(), 3);
	}
}
