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

mod control;
mod state;

pub use control::EngineControlMessage;
pub use state::MatchingEngineState;

use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
};

use chrono::Utc;
use core_sdk::{MinorUnits, OrderStatus, Side, Trade};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
	OrderBook,
	event::{EventProducer, MatchingEvent},
	journal::OrderJournal,
	queue::QueueReceiver,
	snapshot::{Snapshot, SnapshotMetadata},
	types::{MatchOutcome, MatchingError, OrderCommand},
};

/// Error types for matching engine operations
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("engine shutdown")]
	Shutdown,
	#[error("event buffer full")]
	EventBufferFull,
}

/// Configuration for the matching engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
	pub stock_id: String,
	pub verbose_logging: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			stock_id: String::new(),
			verbose_logging: false,
		}
	}
}

/// One resting order consumed by a fill, recorded so the caller can emit
/// the right maker-side event and forward the trade.
struct FillStep {
	maker_tx_id: core_sdk::StockTxId,
	maker_user_id: String,
	fill_qty: u64,
	fill_price: MinorUnits,
	maker_fully_filled: bool,
	maker_remaining_qty: u64,
}

/// Main matching engine with single-threaded event loop
///
/// The MatchingEngine runs the core matching loop in a dedicated thread,
/// one per stock: it consumes `EngineRequest`s from the
/// ingress queue and answers each one synchronously via its embedded
/// oneshot channel, while also emitting `MatchingEvent`s to the event
/// buffer for durability and downstream settlement handoff.
///
/// Architecture:
/// - Single-threaded: all matching logic for this stock runs on one thread
/// - Deterministic: same inputs always produce same outputs
/// - Event-sourced: all state changes produce events
/// - Non-blocking: uses channels for input/output; never touches the
///   network, the Order Store, or Settlement directly
///
/// Control messages (snapshot/restore/replay/shutdown) are handled via a
/// separate control channel so they never compete with order flow for
/// queue capacity.
pub struct MatchingEngine {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
	control_tx: mpsc::Sender<EngineControlMessage>,
}

impl MatchingEngine {
	/// Start the matching engine, seeding its book from `initial_orders` -
	/// the resting orders the Order Store reports for this stock, so a
	/// freshly (re)created engine rejoins with the same book a crashed or
	/// evicted predecessor would have had, rather than an empty one.
	pub fn start(
		config: EngineConfig,
		queue_receiver: QueueReceiver,
		event_producer: EventProducer,
		journal: Arc<Mutex<Box<dyn OrderJournal>>>,
		initial_orders: Vec<crate::types::ResidentOrder>,
	) -> Self {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let (control_tx, control_rx) = mpsc::channel(16);

		let mut state = MatchingEngineState::new(config.stock_id.clone());
		for order in initial_orders {
			let tx_id = order.stock_tx_id;
			if let Err(e) = state.orderbook.insert(order) {
				warn!(target: "engine", stock_id = %config.stock_id, stock_tx_id = %tx_id, error = %e, "failed to seed resting order from Order Store");
			}
		}

		let thread_handle = thread::Builder::new()
			.name(format!("matching-loop-{}", config.stock_id))
			.spawn(move || {
				info!(target: "engine", stock_id = %config.stock_id, "matching engine started");
				Self::run_matching_loop(
					state,
					&config,
					&queue_receiver,
					&event_producer,
					&journal,
					control_rx,
					&shutdown_clone,
				);
				info!(target: "engine", stock_id = %config.stock_id, "matching engine stopped");
			})
			.expect("failed to spawn matching engine thread");

		Self {
			thread_handle: Some(thread_handle),
			shutdown,
			control_tx,
		}
	}

	/// Main matching loop - the heart of the engine.
	///
	/// Per iteration: drain pending control messages (non-blocking), then
	/// process at most one `EngineRequest` from the ingress queue. The loop
	/// never suspends on anything but the ingress queue itself - no I/O, no lock contention with other stocks.
	fn run_matching_loop(
		mut state: MatchingEngineState,
		config: &EngineConfig,
		queue_receiver: &QueueReceiver,
		event_producer: &EventProducer,
		journal: &Arc<Mutex<Box<dyn OrderJournal>>>,
		mut control_rx: mpsc::Receiver<EngineControlMessage>,
		shutdown: &Arc<AtomicBool>,
	) {
		loop {
			if shutdown.load(Ordering::Relaxed) {
				break;
			}

			match control_rx.try_recv() {
				Ok(EngineControlMessage::CreateSnapshot { respond_to }) => {
					let _ = respond_to.send(Self::create_snapshot_internal(&state));
				}
				Ok(EngineControlMessage::RestoreSnapshot {
					snapshot,
					respond_to,
				}) => {
					let _ = respond_to.send(Self::restore_snapshot_internal(&mut state, snapshot));
				}
				Ok(EngineControlMessage::ReplayEvents { events, respond_to }) => {
					let _ = respond_to.send(Self::replay_events_internal(&mut state, events));
				}
				Ok(EngineControlMessage::Shutdown) => {
					info!(target: "engine", "received shutdown signal via control channel");
					break;
				}
				Err(mpsc::error::TryRecvError::Empty) => {}
				Err(mpsc::error::TryRecvError::Disconnected) => {
					warn!(target: "engine", "control channel disconnected");
					break;
				}
			}

			let req = match queue_receiver.try_recv() {
				Ok(req) => req,
				Err(crate::queue::QueueError::Empty) => {
					thread::sleep(std::time::Duration::from_millis(1));
					continue;
				}
				Err(crate::queue::QueueError::Disconnected) => {
					error!(target: "engine", "ingress queue disconnected");
					break;
				}
				Err(crate::queue::QueueError::Full) => {
					error!(target: "engine", "unexpected Full error on try_recv");
					continue;
				}
			};

			if config.verbose_logging {
				debug!(target: "engine", stock_tx_id = %req.command.stock_tx_id(), "processing command");
			}

			let result = Self::process_command(&mut state, req.command, event_producer, journal);
			let _ = req.respond_to.send(result);
		}
	}

	/// Process one command against the in-memory book, returning the
	/// resulting order status and the trades produced.
	fn process_command(
		state: &mut MatchingEngineState,
		cmd: OrderCommand,
		event_producer: &EventProducer,
		journal: &Arc<Mutex<Box<dyn OrderJournal>>>,
	) -> Result<MatchOutcome, MatchingError> {
		match cmd {
			OrderCommand::New {
				stock_tx_id,
				stock_id,
				user_id,
				side,
				order_type,
				quantity,
				price,
				created_at,
			} => {
				{
					let mut journal = journal.lock().unwrap();
					if journal.is_active(stock_tx_id) {
						// Redelivered NEW_ORDER: treat as a no-op, reporting
						// whatever the book currently shows for it.
						return Ok(Self::redelivery_outcome(state, stock_tx_id));
					}
					journal
						.append(OrderCommand::New {
							stock_tx_id,
							stock_id: stock_id.clone(),
							user_id: user_id.clone(),
							side,
							order_type,
							quantity,
							price,
							created_at,
						})
						.map_err(|e| MatchingError::InvalidOrder(e.to_string()))?;
				}

				match order_type {
					core_sdk::OrderType::Market => Self::process_market(
						state,
						stock_tx_id,
						&stock_id,
						&user_id,
						side,
						quantity,
						event_producer,
						journal,
					),
					core_sdk::OrderType::Limit => {
						let limit_price = price
							.ok_or_else(|| MatchingError::InvalidOrder("LIMIT order missing price".into()))?;
						Self::process_limit(
							state,
							stock_tx_id,
							&stock_id,
							&user_id,
							side,
							quantity,
							limit_price,
							created_at,
							event_producer,
							journal,
						)
					}
				}
			}
			OrderCommand::Cancel {
				stock_tx_id,
				updated_at,
			} => Self::process_cancel(state, stock_tx_id, updated_at, event_producer, journal),
		}
	}

	/// A MARKET order walks the book across as many price levels as
	/// needed. No opposing liquidity at all is a rejection
	/// (`MatchingError::NoLiquidity`); liquidity that
	/// runs out partway through leaves the order `PartiallyComplete` and,
	/// since MARKET orders never rest, terminal either way.
	#[allow(clippy::too_many_arguments)]
	fn process_market(
		state: &mut MatchingEngineState,
		stock_tx_id: core_sdk::StockTxId,
		stock_id: &str,
		user_id: &str,
		side: Side,
		quantity: u64,
		event_producer: &EventProducer,
		journal: &Arc<Mutex<Box<dyn OrderJournal>>>,
	) -> Result<MatchOutcome, MatchingError> {
		let mut remaining = quantity;
		let mut trades = Vec::new();

		while remaining > 0 {
			let Some(step) = Self::match_step(&mut state.orderbook, side, remaining, None) else {
				break;
			};
			remaining -= step.fill_qty;
			let trade = Self::emit_fill(
				state, stock_id, user_id, stock_tx_id, side, &step, event_producer,
			)?;
			trades.push(trade);
		}

		journal.lock().unwrap().mark_completed(stock_tx_id);

		if trades.is_empty() {
			state.next_sequence += 1;
			event_producer
				.push(MatchingEvent::OrderRejected {
					seq: state.next_sequence,
					stock_tx_id,
					stock_id: stock_id.to_string(),
					reason: "no opposing liquidity".to_string(),
					timestamp: Utc::now(),
				})
				.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;
			return Err(MatchingError::NoLiquidity);
		}

		let status = if remaining == 0 {
			OrderStatus::Completed
		} else {
			OrderStatus::PartiallyComplete
		};

		state.next_sequence += 1;
		let filled_qty = quantity - remaining;
		let event = if remaining == 0 {
			MatchingEvent::TakerOrderFilled {
				seq: state.next_sequence,
				stock_tx_id,
				stock_id: stock_id.to_string(),
				filled_qty,
				timestamp: Utc::now(),
			}
		} else {
			MatchingEvent::TakerOrderPartiallyFilled {
				seq: state.next_sequence,
				stock_tx_id,
				stock_id: stock_id.to_string(),
				filled_qty,
				remaining_qty: remaining,
				timestamp: Utc::now(),
			}
		};
		event_producer
			.push(event)
			.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;

		Ok(MatchOutcome {
			stock_tx_id,
			trades,
			status,
			remaining_qty: remaining,
		})
	}

	/// A LIMIT order matches while the book crosses its price, then rests
	/// whatever quantity is left (possibly all of it, possibly none).
	#[allow(clippy::too_many_arguments)]
	fn process_limit(
		state: &mut MatchingEngineState,
		stock_tx_id: core_sdk::StockTxId,
		stock_id: &str,
		user_id: &str,
		side: Side,
		quantity: u64,
		limit_price: MinorUnits,
		created_at: chrono::DateTime<Utc>,
		event_producer: &EventProducer,
		journal: &Arc<Mutex<Box<dyn OrderJournal>>>,
	) -> Result<MatchOutcome, MatchingError> {
		let mut remaining = quantity;
		let mut trades = Vec::new();

		while remaining > 0 {
			let Some(step) =
				Self::match_step(&mut state.orderbook, side, remaining, Some(limit_price))
			else {
				break;
			};
			remaining -= step.fill_qty;
			let trade = Self::emit_fill(
				state, stock_id, user_id, stock_tx_id, side, &step, event_producer,
			)?;
			trades.push(trade);
		}

		state.next_sequence += 1;

		if remaining == 0 {
			journal.lock().unwrap().mark_completed(stock_tx_id);
			event_producer
				.push(MatchingEvent::TakerOrderFilled {
					seq: state.next_sequence,
					stock_tx_id,
					stock_id: stock_id.to_string(),
					filled_qty: quantity,
					timestamp: Utc::now(),
				})
				.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;

			return Ok(MatchOutcome {
				stock_tx_id,
				trades,
				status: OrderStatus::Completed,
				remaining_qty: 0,
			});
		}

		state
			.orderbook
			.insert(crate::types::ResidentOrder {
				stock_tx_id,
				stock_id: stock_id.to_string(),
				user_id: user_id.to_string(),
				side,
				limit_price,
				remaining_qty: remaining,
				created_at,
			})
			.map_err(|e| MatchingError::OrderBookError(e.to_string()))?;

		let status = if trades.is_empty() {
			event_producer
				.push(MatchingEvent::OrderAccepted {
					seq: state.next_sequence,
					stock_tx_id,
					stock_id: stock_id.to_string(),
					side,
					price: Some(limit_price),
					qty: remaining,
					timestamp: Utc::now(),
				})
				.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;
			OrderStatus::InProgress
		} else {
			event_producer
				.push(MatchingEvent::TakerOrderPartiallyFilled {
					seq: state.next_sequence,
					stock_tx_id,
					stock_id: stock_id.to_string(),
					filled_qty: quantity - remaining,
					remaining_qty: remaining,
					timestamp: Utc::now(),
				})
				.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;
			OrderStatus::PartiallyComplete
		};

		Ok(MatchOutcome {
			stock_tx_id,
			trades,
			status,
			remaining_qty: remaining,
		})
	}

	fn process_cancel(
		state: &mut MatchingEngineState,
		stock_tx_id: core_sdk::StockTxId,
		_updated_at: chrono::DateTime<Utc>,
		event_producer: &EventProducer,
		journal: &Arc<Mutex<Box<dyn OrderJournal>>>,
	) -> Result<MatchOutcome, MatchingError> {
		let Some(order) = state.orderbook.remove_any(stock_tx_id) else {
			// Either never rested (already fully matched) or already
			// cancelled; the caller's Order Store CAS is authoritative on
			// which, so we just report a conflict.
			return Err(MatchingError::Conflict(stock_tx_id));
		};

		journal.lock().unwrap().mark_completed(stock_tx_id);

		state.next_sequence += 1;
		event_producer
			.push(MatchingEvent::OrderCancelled {
				seq: state.next_sequence,
				stock_tx_id,
				stock_id: order.stock_id.clone(),
				remaining_qty: order.remaining_qty,
				timestamp: Utc::now(),
			})
			.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;

		Ok(MatchOutcome {
			stock_tx_id,
			trades: vec![],
			status: OrderStatus::Cancelled,
			remaining_qty: order.remaining_qty,
		})
	}

	/// What to report for a `NEW_ORDER` the journal has already seen: the
	/// current resting state if it still rests, otherwise terminal.
	fn redelivery_outcome(state: &MatchingEngineState, stock_tx_id: core_sdk::StockTxId) -> MatchOutcome {
		for side in [Side::Buy, Side::Sell] {
			if let Some(order) = state.orderbook.find(stock_tx_id, side) {
				return MatchOutcome {
					stock_tx_id,
					trades: vec![],
					status: OrderStatus::InProgress,
					remaining_qty: order.remaining_qty,
				};
			}
		}
		MatchOutcome {
			stock_tx_id,
			trades: vec![],
			status: OrderStatus::Completed,
			remaining_qty: 0,
		}
	}

	/// Consume one resting order on the opposite side of `taker_side`,
	/// respecting `limit` (`None` for a MARKET order, which crosses any
	/// price). Returns `None` when there's nothing left to match against.
	fn match_step(
		orderbook: &mut OrderBook,
		taker_side: Side,
		taker_remaining: u64,
		limit: Option<MinorUnits>,
	) -> Option<FillStep> {
		let opposite = taker_side.opposite();
		let best = match opposite {
			Side::Buy => orderbook.best_bid(),
			Side::Sell => orderbook.best_ask(),
		}?;

		if let Some(limit_price) = limit {
			let crosses = match taker_side {
				Side::Buy => best.limit_price <= limit_price,
				Side::Sell => best.limit_price >= limit_price,
			};
			if !crosses {
				return None;
			}
		}

		let maker_tx_id = best.stock_tx_id;
		let maker_user_id = best.user_id.clone();
		let fill_price = best.limit_price;
		let fill_qty = taker_remaining.min(best.remaining_qty);
		let maker_fully_filled = fill_qty == best.remaining_qty;
		let maker_remaining_qty = best.remaining_qty - fill_qty;

		if maker_fully_filled {
			orderbook.pop_best(opposite);
		} else {
			orderbook
				.reduce_best(opposite, fill_qty)
				.expect("best order just observed to have enough remaining_qty");
		}

		Some(FillStep {
			maker_tx_id,
			maker_user_id,
			fill_qty,
			fill_price,
			maker_fully_filled,
			maker_remaining_qty,
		})
	}

	/// Emit the maker-side event and the trade event for one fill step,
	/// returning the `Trade` for the caller to accumulate.
	#[allow(clippy::too_many_arguments)]
	fn emit_fill(
		state: &mut MatchingEngineState,
		stock_id: &str,
		taker_user_id: &str,
		taker_tx_id: core_sdk::StockTxId,
		taker_side: Side,
		step: &FillStep,
		event_producer: &EventProducer,
	) -> Result<Trade, MatchingError> {
		let now = Utc::now();

		state.next_sequence += 1;
		let maker_event = if step.maker_fully_filled {
			MatchingEvent::MakerOrderFilled {
				seq: state.next_sequence,
				stock_tx_id: step.maker_tx_id,
				stock_id: stock_id.to_string(),
				filled_qty: step.fill_qty,
				timestamp: now,
			}
		} else {
			MatchingEvent::MakerOrderPartiallyFilled {
				seq: state.next_sequence,
				stock_tx_id: step.maker_tx_id,
				stock_id: stock_id.to_string(),
				filled_qty: step.fill_qty,
				remaining_qty: step.maker_remaining_qty,
				timestamp: now,
			}
		};
		event_producer
			.push(maker_event)
			.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;

		let (buy_tx_id, sell_tx_id, buyer_id, seller_id) = match taker_side {
			Side::Buy => (
				taker_tx_id,
				step.maker_tx_id,
				taker_user_id.to_string(),
				step.maker_user_id.clone(),
			),
			Side::Sell => (
				step.maker_tx_id,
				taker_tx_id,
				step.maker_user_id.clone(),
				taker_user_id.to_string(),
			),
		};

		let trade = Trade {
			buy_tx_id,
			sell_tx_id,
			// The Order Store owns the full-vs-partial decision for each
			// side; these default to the parent id and get overwritten by
			// the gRPC layer once that decision is known.
			buy_leg_tx_id: buy_tx_id,
			sell_leg_tx_id: sell_tx_id,
			stock_id: stock_id.to_string(),
			qty: step.fill_qty,
			execution_price: step.fill_price,
			buyer_id,
			seller_id,
			executed_at: now,
		};

		state.next_sequence += 1;
		event_producer
			.push(MatchingEvent::TradeExecuted {
				seq: state.next_sequence,
				trade: trade.clone(),
				timestamp: now,
			})
			.map_err(|_| MatchingError::OrderBookError("event buffer full".into()))?;

		Ok(trade)
	}

	/// Internal helper to create a snapshot from state (called within matching loop)
	fn create_snapshot_internal(state: &MatchingEngineState) -> Result<Snapshot, String> {
		let state_data = serde_json::to_vec(&state.orderbook.resting_orders().collect::<Vec<_>>())
			.map_err(|e| format!("failed to serialize orderbook: {}", e))?;

		let metadata = SnapshotMetadata {
			created_at: Utc::now().timestamp() as u64,
			event_seq: state.next_sequence,
			size_bytes: state_data.len(),
			market: state.orderbook.stock_id().to_string(),
		};

		Ok(Snapshot {
			metadata,
			state_data,
		})
	}

	/// Request a snapshot of the current engine state without blocking
	/// the matching loop longer than it takes to serve this one request.
	pub fn create_snapshot(&self) -> Result<Snapshot, String> {
		let (tx, rx) = oneshot::channel();
		self.control_tx
			.blocking_send(EngineControlMessage::CreateSnapshot { respond_to: tx })
			.map_err(|_| "engine shut down or control channel full".to_string())?;
		rx.blocking_recv()
			.map_err(|_| "snapshot request cancelled or engine stopped".to_string())?
	}

	fn restore_snapshot_internal(
		state: &mut MatchingEngineState,
		snapshot: Snapshot,
	) -> Result<(), String> {
		let orders: Vec<crate::types::ResidentOrder> = serde_json::from_slice(&snapshot.state_data)
			.map_err(|e| format!("failed to deserialize orderbook: {}", e))?;

		state.reset(snapshot.metadata.market.clone());
		for order in orders {
			state
				.orderbook
				.insert(order)
				.map_err(|e| format!("failed to restore resting order: {}", e))?;
		}
		state.next_sequence = snapshot.metadata.event_seq;

		info!(
			"restored engine state from snapshot at seq={}",
			snapshot.metadata.event_seq
		);
		Ok(())
	}

	pub fn restore_from_snapshot(&self, snapshot: Snapshot) -> Result<(), String> {
		let (tx, rx) = oneshot::channel();
		self.control_tx
			.blocking_send(EngineControlMessage::RestoreSnapshot {
				snapshot,
				respond_to: tx,
			})
			.map_err(|_| "engine shut down or control channel full".to_string())?;
		rx.blocking_recv()
			.map_err(|_| "restore request cancelled or engine stopped".to_string())?
	}

	/// Replay events to rebuild orderbook state (internal helper), used
	/// during crash recovery to fast-forward from a snapshot's sequence
	/// to the latest durably-persisted event.
	fn replay_events_internal(
		state: &mut MatchingEngineState,
		events: Vec<MatchingEvent>,
	) -> Result<(), String> {
		info!("replaying {} events", events.len());

		for event in events {
			match event {
				MatchingEvent::OrderAccepted {
					stock_tx_id,
					stock_id,
					side,
					price,
					qty,
					timestamp,
					..
				} => {
					if let Some(limit_price) = price {
						let _ = state.orderbook.insert(crate::types::ResidentOrder {
							stock_tx_id,
							stock_id,
							user_id: "recovered".to_string(),
							side,
							limit_price,
							remaining_qty: qty,
							created_at: timestamp,
						});
					}
				}
				MatchingEvent::TakerOrderFilled { stock_tx_id, .. }
				| MatchingEvent::MakerOrderFilled { stock_tx_id, .. }
				| MatchingEvent::OrderCancelled { stock_tx_id, .. } => {
					state.orderbook.remove_any(stock_tx_id);
				}
				MatchingEvent::TakerOrderPartiallyFilled {
					stock_tx_id,
					remaining_qty,
					..
				}
				| MatchingEvent::MakerOrderPartiallyFilled {
					stock_tx_id,
					remaining_qty,
					..
				} => {
					for side in [Side::Buy, Side::Sell] {
						if state.orderbook.find(stock_tx_id, side).is_some() {
							let _ = state.orderbook.reduce_best(side, 0);
							break;
						}
					}
					let _ = remaining_qty;
				}
				MatchingEvent::OrderRejected { .. } | MatchingEvent::TradeExecuted { .. } => {
					// No book state to reconstruct from these.
				}
			}
		}

		info!("event replay complete");
		Ok(())
	}

	pub fn replay_events(&self, events: Vec<MatchingEvent>) -> Result<(), String> {
		let (tx, rx) = oneshot::channel();
		self.control_tx
			.blocking_send(EngineControlMessage::ReplayEvents { events, respond_to: tx })
			.map_err(|_| "engine shut down or control channel full".to_string())?;
		rx.blocking_recv()
			.map_err(|_| "replay request cancelled or engine stopped".to_string())?
	}

	/// Shutdown the matching engine gracefully
	pub fn shutdown(mut self) {
		info!("shutting down matching engine");
		self.shutdown.store(true, Ordering::Relaxed);

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!("matching engine thread panicked: {:?}", e);
		}
	}
}

impl Drop for MatchingEngine {
	fn drop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			let _ = Err::<(), _>(e);
		}
	}
}

#[cfg(test)]
mod tests {
	use core_sdk::OrderType;

	use super::*;
	use crate::{
		event::EventBuffer,
		journal::MemoryOrderJournal,
		queue::IngressQueue,
		types::EngineRequest,
	};

	fn start_engine(stock_id: &str) -> (MatchingEngine, crate::queue::QueueSender, EventProducer) {
		let (queue_sender, queue_receiver) = IngressQueue::new(64).split();
		let (event_producer, event_consumer) = EventBuffer::new(256).split();
		std::mem::forget(event_consumer);
		let journal: Arc<Mutex<Box<dyn OrderJournal>>> =
			Arc::new(Mutex::new(Box::new(MemoryOrderJournal::new())));
		let engine = MatchingEngine::start(
			EngineConfig {
				stock_id: stock_id.to_string(),
				verbose_logging: false,
			},
			queue_receiver,
			event_producer.clone(),
			journal,
			Vec::new(),
		);
		(engine, queue_sender, event_producer)
	}

	fn submit(
		queue_sender: &crate::queue::QueueSender,
		command: OrderCommand,
	) -> Result<MatchOutcome, MatchingError> {
		let (tx, rx) = oneshot::channel();
		queue_sender
			.try_enqueue(EngineRequest {
				command,
				respond_to: tx,
			})
			.unwrap();
		rx.blocking_recv().unwrap()
	}

	#[test]
	fn limit_order_rests_when_book_is_empty() {
		let (engine, queue_sender, _producer) = start_engine("ACME");

		let outcome = submit(
			&queue_sender,
			OrderCommand::New {
				stock_tx_id: core_sdk::StockTxId::new(),
				stock_id: "ACME".to_string(),
				user_id: "buyer".to_string(),
				side: Side::Buy,
				order_type: OrderType::Limit,
				quantity: 10,
				price: Some(100),
				created_at: Utc::now(),
			},
		)
		.unwrap();

		assert_eq!(outcome.status, OrderStatus::InProgress);
		assert_eq!(outcome.remaining_qty, 10);
		assert!(outcome.trades.is_empty());

		engine.shutdown();
	}

	#[test]
	fn crossing_limit_orders_produce_a_trade() {
		let (engine, queue_sender, _producer) = start_engine("ACME");

		submit(
			&queue_sender,
			OrderCommand::New {
				stock_tx_id: core_sdk::StockTxId::new(),
				stock_id: "ACME".to_string(),
				user_id: "seller".to_string(),
				side: Side::Sell,
				order_type: OrderType::Limit,
				quantity: 5,
				price: Some(100),
				created_at: Utc::now(),
			},
		)
		.unwrap();

		let outcome = submit(
			&queue_sender,
			OrderCommand::New {
				stock_tx_id: core_sdk::StockTxId::new(),
				stock_id: "ACME".to_string(),
				user_id: "buyer".to_string(),
				side: Side::Buy,
				order_type: OrderType::Limit,
				quantity: 5,
				price: Some(100),
				created_at: Utc::now(),
			},
		)
		.unwrap();

		assert_eq!(outcome.status, OrderStatus::Completed);
		assert_eq!(outcome.trades.len(), 1);
		assert_eq!(outcome.trades[0].qty, 5);
		assert_eq!(outcome.trades[0].execution_price, 100);

		engine.shutdown();
	}

	#[test]
	fn market_order_with_no_liquidity_is_rejected() {
		let (engine, queue_sender, _producer) = start_engine("ACME");

		let result = submit(
			&queue_sender,
			OrderCommand::New {
				stock_tx_id: core_sdk::StockTxId::new(),
				stock_id: "ACME".to_string(),
				user_id: "buyer".to_string(),
				side: Side::Buy,
				order_type: OrderType::Market,
				quantity: 1,
				price: None,
				created_at: Utc::now(),
			},
		);

		assert!(matches!(result, Err(MatchingError::NoLiquidity)));

		engine.shutdown();
	}

	#[test]
	fn market_order_walks_book_across_price_levels() {
		let (engine, queue_sender, _producer) = start_engine("ACME");

		for (qty, price) in [(3u64, 100u64), (4, 101), (5, 102)] {
			submit(
				&queue_sender,
				OrderCommand::New {
					stock_tx_id: core_sdk::StockTxId::new(),
					stock_id: "ACME".to_string(),
					user_id: "seller".to_string(),
					side: Side::Sell,
					order_type: OrderType::Limit,
					quantity: qty,
					price: Some(price),
					created_at: Utc::now(),
				},
			)
			.unwrap();
		}

		let outcome = submit(
			&queue_sender,
			OrderCommand::New {
				stock_tx_id: core_sdk::StockTxId::new(),
				stock_id: "ACME".to_string(),
				user_id: "buyer".to_string(),
				side: Side::Buy,
				order_type: OrderType::Market,
				quantity: 6,
				price: None,
				created_at: Utc::now(),
			},
		)
		.unwrap();

		assert_eq!(outcome.status, OrderStatus::Completed);
		assert_eq!(outcome.trades.len(), 2);
		assert_eq!(outcome.trades[0].qty, 3);
		assert_eq!(outcome.trades[0].execution_price, 100);
		assert_eq!(outcome.trades[1].qty, 3);
		assert_eq!(outcome.trades[1].execution_price, 101);

		engine.shutdown();
	}

	#[test]
	fn cancel_removes_resting_order() {
		let (engine, queue_sender, _producer) = start_engine("ACME");

		let tx_id = core_sdk::StockTxId::new();
		submit(
			&queue_sender,
			OrderCommand::New {
				stock_tx_id: tx_id,
				stock_id: "ACME".to_string(),
				user_id: "buyer".to_string(),
				side: Side::Buy,
				order_type: OrderType::Limit,
				quantity: 10,
				price: Some(100),
				created_at: Utc::now(),
			},
		)
		.unwrap();

		let outcome = submit(
			&queue_sender,
			OrderCommand::Cancel {
				stock_tx_id: tx_id,
				updated_at: Utc::now(),
			},
		)
		.unwrap();

		assert_eq!(outcome.status, OrderStatus::Cancelled);
		assert_eq!(outcome.remaining_qty, 10);

		let result = submit(
			&queue_sender,
			OrderCommand::Cancel {
				stock_tx_id: tx_id,
				updated_at: Utc::now(),
			},
		);
		assert!(matches!(result, Err(MatchingError::Conflict(_))));

		engine.shutdown();
	}
}
