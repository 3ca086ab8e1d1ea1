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

mod buffer;
mod storage;
mod writer;

use chrono::{DateTime, Utc};
use core_sdk::{MinorUnits, Side, StockTxId, Trade};
use serde::{Deserialize, Serialize};

pub use buffer::{EventBuffer, EventConsumer, EventProducer};
pub use storage::{EventStorage, MemoryEventStorage};
pub use writer::{EventWriter, EventWriterConfig};

/// Sequence number for event ordering.
///
/// Events are assigned monotonically increasing sequence numbers to
/// ensure deterministic replay ordering during crash recovery.
pub type SequenceNumber = u64;

/// Events produced by the matching engine.
///
/// These events represent the single source of truth for all state changes
/// in one stock's order book. The book can be fully reconstructed by
/// replaying events from the beginning.
///
/// Design principles:
/// - Events are immutable once emitted
/// - Each event has a unique, monotonically increasing sequence number
/// - Events are sufficient to rebuild complete order book state
/// - Events do not contain redundant computed state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchingEvent {
	/// The taker order (the one just submitted) was accepted; if LIMIT
	/// and not immediately fully matched, it now rests in the book.
	OrderAccepted {
		seq: SequenceNumber,
		stock_tx_id: StockTxId,
		stock_id: String,
		side: Side,
		price: Option<MinorUnits>,
		qty: u64,
		timestamp: DateTime<Utc>,
	},

	/// The taker order was rejected during admission or matching (e.g. a
	/// MARKET order with no opposing liquidity).
	OrderRejected {
		seq: SequenceNumber,
		stock_tx_id: StockTxId,
		stock_id: String,
		reason: String,
		timestamp: DateTime<Utc>,
	},

	/// The taker order was completely filled.
	TakerOrderFilled {
		seq: SequenceNumber,
		stock_tx_id: StockTxId,
		stock_id: String,
		filled_qty: u64,
		timestamp: DateTime<Utc>,
	},

	/// The taker order was partially filled and the remainder rests (or,
	/// for a MARKET order that walked the book dry, is reported back
	/// without resting).
	TakerOrderPartiallyFilled {
		seq: SequenceNumber,
		stock_tx_id: StockTxId,
		stock_id: String,
		filled_qty: u64,
		remaining_qty: u64,
		timestamp: DateTime<Utc>,
	},

	/// A resting (maker) order was completely filled by an incoming
	/// taker and removed from the book.
	MakerOrderFilled {
		seq: SequenceNumber,
		stock_tx_id: StockTxId,
		stock_id: String,
		filled_qty: u64,
		timestamp: DateTime<Utc>,
	},

	/// A resting (maker) order was partially filled and continues to
	/// rest with a reduced quantity.
	MakerOrderPartiallyFilled {
		seq: SequenceNumber,
		stock_tx_id: StockTxId,
		stock_id: String,
		filled_qty: u64,
		remaining_qty: u64,
		timestamp: DateTime<Utc>,
	},

	/// A resting order was cancelled and removed from the book.
	OrderCancelled {
		seq: SequenceNumber,
		stock_tx_id: StockTxId,
		stock_id: String,
		remaining_qty: u64,
		timestamp: DateTime<Utc>,
	},

	/// A trade was executed between a maker and a taker order.
	TradeExecuted {
		seq: SequenceNumber,
		trade: Trade,
		timestamp: DateTime<Utc>,
	},
}

impl MatchingEvent {
	pub fn sequence(&self) -> SequenceNumber {
		match self {
			MatchingEvent::OrderAccepted { seq, .. }
			| MatchingEvent::OrderRejected { seq, .. }
			| MatchingEvent::TakerOrderFilled { seq, .. }
			| MatchingEvent::TakerOrderPartiallyFilled { seq, .. }
			| MatchingEvent::MakerOrderFilled { seq, .. }
			| MatchingEvent::MakerOrderPartiallyFilled { seq, .. }
			| MatchingEvent::OrderCancelled { seq, .. }
			| MatchingEvent::TradeExecuted { seq, .. } => *seq,
		}
	}

	/// The `stock_tx_id` this event is about, if any (a `TradeExecuted`
	/// covers two order ids, so it has none of its own).
	pub fn stock_tx_id(&self) -> Option<StockTxId> {
		match self {
			MatchingEvent::OrderAccepted { stock_tx_id, .. }
			| MatchingEvent::OrderRejected { stock_tx_id, .. }
			| MatchingEvent::TakerOrderFilled { stock_tx_id, .. }
			| MatchingEvent::TakerOrderPartiallyFilled { stock_tx_id, .. }
			| MatchingEvent::MakerOrderFilled { stock_tx_id, .. }
			| MatchingEvent::MakerOrderPartiallyFilled { stock_tx_id, .. }
			| MatchingEvent::OrderCancelled { stock_tx_id, .. } => Some(*stock_tx_id),
			MatchingEvent::TradeExecuted { .. } => None,
		}
	}

	pub fn stock_id(&self) -> &str {
		match self {
			MatchingEvent::OrderAccepted { stock_id, .. }
			| MatchingEvent::OrderRejected { stock_id, .. }
			| MatchingEvent::TakerOrderFilled { stock_id, .. }
			| MatchingEvent::TakerOrderPartiallyFilled { stock_id, .. }
			| MatchingEvent::MakerOrderFilled { stock_id, .. }
			| MatchingEvent::MakerOrderPartiallyFilled { stock_id, .. }
			| MatchingEvent::OrderCancelled { stock_id, .. } => stock_id,
			MatchingEvent::TradeExecuted { trade, .. } => &trade.stock_id,
		}
	}

	/// Whether this event marks the end of an order's lifecycle from the
	/// book's point of view (fully filled, cancelled, or rejected).
	pub fn is_order_complete(&self) -> bool {
		matches!(
			self,
			MatchingEvent::TakerOrderFilled { .. }
				| MatchingEvent::MakerOrderFilled { .. }
				| MatchingEvent::OrderCancelled { .. }
				| MatchingEvent::OrderRejected { .. }
		)
	}
}

/// Batch of events for efficient processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
	pub events: Vec<MatchingEvent>,
	pub batch_timestamp: DateTime<Utc>,
}

impl EventBatch {
	pub fn new(events: Vec<MatchingEvent>) -> Self {
		Self {
			events,
			batch_timestamp: Utc::now(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}
}
