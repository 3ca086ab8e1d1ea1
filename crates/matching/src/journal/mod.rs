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

mod memory;

use core_sdk::StockTxId;
use thiserror::Error;

pub use memory::MemoryOrderJournal;

use crate::types::OrderCommand;

/// Error types for Order Journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
	#[error("failed to append order: {0}")]
	AppendFailed(String),
	#[error("order already exists: {0}")]
	DuplicateOrder(StockTxId),
	#[error("journal storage error: {0}")]
	StorageError(String),
}

/// Order Journal trait - the idempotency anchor for the matching engine.
///
/// Key semantic constraints:
/// - Orders are append-only; they cannot be modified once written
/// - An order remains "active" until explicitly marked complete
/// - The journal does NOT provide delete/remove semantics
/// - Lifecycle completion is determined by the matching engine, not the
///   journal's own bookkeeping
///
/// This abstraction is implementation-agnostic: it can be backed by
/// in-memory structures, mmap files, or external systems.
pub trait OrderJournal: Send {
	/// Append a `NEW_ORDER` command to the journal.
	///
	/// Must complete before the event is considered durably received.
	/// Returns `DuplicateOrder` if `stock_tx_id` is already active,
	/// signaling the caller to treat this delivery as a no-op replay.
	fn append(&mut self, order: OrderCommand) -> Result<(), JournalError>;

	/// Whether `stock_tx_id` is a previously-appended order whose
	/// lifecycle has not yet been marked complete.
	fn is_active(&self, stock_tx_id: StockTxId) -> bool;

	/// Mark an order as completed (fully filled or cancelled).
	fn mark_completed(&mut self, stock_tx_id: StockTxId);

	/// Replay all active orders for crash recovery.
	fn replay(&self) -> Box<dyn Iterator<Item = OrderCommand> + '_>;

	/// Count of active (non-terminal) orders.
	fn active_count(&self) -> usize;
}
