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

//! Order Store: the authoritative, durable-in-spirit record of every order
//! placed through the intake API. Kept entirely outside the
//! matching loop - the loop only ever touches the in-memory `OrderBook`
//! and emits `MatchingEvent`s; every Order Store read/write is a
//! suspension point owned by the caller (the gRPC handler layer), never
//! by the matching thread itself.

mod memory;

use core_sdk::{Order, OrderStatus, Side, StockTxId};
pub use memory::MemoryOrderStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderStoreError {
	#[error("order {0} not found")]
	NotFound(StockTxId),
	#[error("order {0} already exists")]
	AlreadyExists(StockTxId),
	#[error("compare-and-swap failed on order {0}: expected status {1:?}")]
	Conflict(StockTxId, OrderStatus),
}

/// Authoritative order record store.
///
/// Updates to `status`/`remaining_qty`/`updated_at` go through
/// `compare_and_swap` so that a concurrent cancel and a concurrent match
/// can never silently clobber one another - the loser re-reads and
/// re-decides.
pub trait OrderStore: Send + Sync {
	/// Insert a newly-admitted order. Fails if `stock_tx_id` is already
	/// present (the intake layer is expected to check first, but this
	/// guards against a racing double-insert).
	fn insert(&self, order: Order) -> Result<(), OrderStoreError>;

	/// Look up a single order by its id.
	fn get(&self, stock_tx_id: StockTxId) -> Result<Order, OrderStoreError>;

	/// All orders placed by a user, most-recent first.
	fn list_by_user(&self, user_id: &str) -> Vec<Order>;

	/// All orders for one stock/side in one status, for engine
	/// reconciliation on reconnect and for crash-recovery book rebuild.
	fn list_by_stock_side_status(&self, stock_id: &str, side: Side, status: OrderStatus) -> Vec<Order>;

	/// Atomically move an order from `expected_status` to `new_status`
	/// with a new `remaining_qty`, or fail with `Conflict` if the order's
	/// current status no longer matches `expected_status`.
	fn compare_and_swap(
		&self,
		stock_tx_id: StockTxId,
		expected_status: OrderStatus,
		new_status: OrderStatus,
		new_remaining_qty: u64,
	) -> Result<(), OrderStoreError>;
}
