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

//! gRPC server for the matching engine.
//!
//! The service owns one lazily-created `MatchingEngine` per `stock_id`
//! plus the
//! single Order Store shared by all of them. `SubmitOrder`/`CancelOrder`
//! enqueue an `EngineRequest` on the right stock's ingress queue, await
//! the oneshot response, then reconcile the Order Store and forward any
//! resulting trades to settlement - all of that I/O happens here, never
//! inside the matching loop itself.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use core_sdk::{MinorUnits, Order, OrderStatus, Side, StockTxId, Trade};
use dashmap::DashMap;
use tokio::sync::{broadcast, oneshot};
use tonic::{Request, Response, Status};
use tracing::{error, info, warn};

use crate::{
	client::SettlementGrpcClient,
	config::MatchingConfig,
	engine::{EngineConfig, MatchingEngine},
	event::{EventBuffer, EventWriter, EventWriterConfig, MemoryEventStorage},
	journal::{MemoryOrderJournal, OrderJournal},
	queue::{IngressQueue, QueueSender},
	snapshot::{Snapshotter, SnapshotterConfig},
	store::{MemoryOrderStore, OrderStore, OrderStoreError},
	types::{EngineRequest, MatchOutcome, MatchingError, OrderCommand, ResidentOrder},
};

pub mod proto {
	tonic::include_proto!("core.matching");
}

use proto::matching_service_server::{MatchingService, MatchingServiceServer};
use proto::{
	CancelOrderRequest, CancelOrderResponse, GetOrderRequest, GetOrderResponse, MatchedTrade,
	Order as ProtoOrder, OrderSide as ProtoSide, OrderStatus as ProtoStatus,
	OrderType as ProtoOrderType, StreamMatchedTradesRequest, SubmitOrderRequest,
	SubmitOrderResponse,
};

fn side_to_proto(side: Side) -> ProtoSide {
	match side {
		Side::Buy => ProtoSide::Buy,
		Side::Sell => ProtoSide::Sell,
	}
}

fn side_from_proto(side: ProtoSide) -> Result<Side, Status> {
	match side {
		ProtoSide::Buy => Ok(Side::Buy),
		ProtoSide::Sell => Ok(Side::Sell),
		ProtoSide::Unspecified => Err(Status::invalid_argument("side must be specified")),
	}
}

fn order_type_to_proto(order_type: core_sdk::OrderType) -> ProtoOrderType {
	match order_type {
		core_sdk::OrderType::Market => ProtoOrderType::Market,
		core_sdk::OrderType::Limit => ProtoOrderType::Limit,
	}
}

fn order_type_from_proto(order_type: ProtoOrderType) -> Result<core_sdk::OrderType, Status> {
	match order_type {
		ProtoOrderType::Market => Ok(core_sdk::OrderType::Market),
		ProtoOrderType::Limit => Ok(core_sdk::OrderType::Limit),
		ProtoOrderType::Unspecified => Err(Status::invalid_argument("order_type must be specified")),
	}
}

fn status_to_proto(status: OrderStatus) -> ProtoStatus {
	match status {
		OrderStatus::InProgress => ProtoStatus::InProgress,
		OrderStatus::PartiallyComplete => ProtoStatus::PartiallyComplete,
		OrderStatus::Completed => ProtoStatus::Completed,
		OrderStatus::Cancelled => ProtoStatus::Cancelled,
	}
}

fn parse_stock_tx_id(raw: &str) -> Result<StockTxId, Status> {
	raw.parse::<uuid::Uuid>()
		.map(StockTxId)
		.map_err(|_| Status::invalid_argument(format!("invalid stock_tx_id: {}", raw)))
}

fn order_to_proto(order: &Order) -> ProtoOrder {
	ProtoOrder {
		stock_tx_id: order.stock_tx_id.to_string(),
		stock_id: order.stock_id.clone(),
		user_id: order.user_id.clone(),
		side: side_to_proto(order.side) as i32,
		order_type: order_type_to_proto(order.order_type) as i32,
		limit_price: order.limit_price,
		original_qty: order.original_qty,
		remaining_qty: order.remaining_qty,
		parent_tx_id: order.parent_tx_id.map(|id| id.to_string()),
		wallet_tx_id: order.wallet_tx_id.map(|id| id.to_string()),
		status: status_to_proto(order.status) as i32,
		created_at: order.created_at.to_rfc3339(),
		updated_at: order.updated_at.to_rfc3339(),
	}
}

fn trade_to_proto(trade: &Trade) -> MatchedTrade {
	MatchedTrade {
		buy_tx_id: trade.buy_tx_id.to_string(),
		sell_tx_id: trade.sell_tx_id.to_string(),
		stock_id: trade.stock_id.clone(),
		qty: trade.qty,
		execution_price: trade.execution_price,
		buyer_id: trade.buyer_id.clone(),
		seller_id: trade.seller_id.clone(),
		executed_at: trade.executed_at.to_rfc3339(),
		buy_leg_tx_id: trade.buy_leg_tx_id.to_string(),
		sell_leg_tx_id: trade.sell_leg_tx_id.to_string(),
	}
}

fn matching_error_to_status(err: MatchingError) -> Status {
	match err {
		MatchingError::InvalidOrder(msg) => Status::invalid_argument(msg),
		MatchingError::StockNotFound(id) => Status::not_found(format!("stock not found: {}", id)),
		MatchingError::NoLiquidity => Status::failed_precondition("no opposing liquidity"),
		MatchingError::Conflict(id) => Status::aborted(format!("conflict on order {}", id)),
		MatchingError::OrderBookError(msg) => Status::internal(msg),
	}
}

/// One stock's worth of running infrastructure: its ingress queue, its
/// matching engine, and the background threads that durably record its
/// events and periodic snapshots.
struct StockHandle {
	queue_sender: QueueSender,
	engine: MatchingEngine,
	event_writer: EventWriter,
	snapshotter: Snapshotter,
}

/// Lazily spawns and looks up the per-stock matching infrastructure.
struct EngineRegistry {
	stocks: DashMap<String, Arc<StockHandle>>,
	config: MatchingConfig,
	order_store: Arc<dyn OrderStore>,
}

impl EngineRegistry {
	fn new(config: MatchingConfig, order_store: Arc<dyn OrderStore>) -> Self {
		Self {
			stocks: DashMap::new(),
			config,
			order_store,
		}
	}

	/// Every non-terminal order the Order Store holds for `stock_id`,
	/// converted to the book's resting-order shape. A fresh engine seeds
	/// its book from this instead of starting empty, so a stock's
	/// matching thread can be (re)created - after a crash, or simply on
	/// first order - without losing orders the Order Store already
	/// accepted.
	fn resting_orders(&self, stock_id: &str) -> Vec<ResidentOrder> {
		let statuses = [OrderStatus::InProgress, OrderStatus::PartiallyComplete];
		let sides = [Side::Buy, Side::Sell];

		sides
			.into_iter()
			.flat_map(|side| {
				statuses
					.into_iter()
					.flat_map(move |status| self.order_store.list_by_stock_side_status(stock_id, side, status))
			})
			.filter_map(|order| ResidentOrder::from_order(&order))
			.collect()
	}

	fn get_or_create(&self, stock_id: &str) -> Arc<StockHandle> {
		if let Some(handle) = self.stocks.get(stock_id) {
			return handle.clone();
		}

		let journal: Arc<Mutex<Box<dyn OrderJournal>>> =
			Arc::new(Mutex::new(Box::new(MemoryOrderJournal::new())));

		let ingress_queue = IngressQueue::new(self.config.ingress_queue_size);
		let (queue_sender, queue_receiver) = ingress_queue.split();

		let event_buffer = EventBuffer::new(self.config.event_buffer_size);
		let (event_producer, event_consumer) = event_buffer.split();

		let event_storage = Box::new(MemoryEventStorage::new());
		let event_writer = EventWriter::start(
			event_consumer,
			event_storage,
			EventWriterConfig {
				batch_size: self.config.event_batch_size,
				batch_timeout_ms: self.config.event_batch_timeout_ms,
				verbose_logging: false,
			},
		);

		let engine = MatchingEngine::start(
			EngineConfig {
				stock_id: stock_id.to_string(),
				verbose_logging: false,
			},
			queue_receiver,
			event_producer,
			journal,
			self.resting_orders(stock_id),
		);

		let snapshotter = Snapshotter::start(SnapshotterConfig {
			interval_secs: self.config.snapshot_interval_secs,
			verbose_logging: false,
		});

		let handle = Arc::new(StockHandle {
			queue_sender,
			engine,
			event_writer,
			snapshotter,
		});

		self.stocks
			.entry(stock_id.to_string())
			.or_insert(handle)
			.clone()
	}
}

/// Matching service implementation.
pub struct MatchingServiceImpl {
	registry: EngineRegistry,
	order_store: Arc<dyn OrderStore>,
	settlement_client: SettlementGrpcClient,
	trade_tx: broadcast::Sender<MatchedTrade>,
}

impl MatchingServiceImpl {
	pub fn new(
		config: MatchingConfig,
		order_store: Arc<dyn OrderStore>,
		settlement_client: SettlementGrpcClient,
	) -> Self {
		let (trade_tx, _rx) = broadcast::channel(1024);
		Self {
			registry: EngineRegistry::new(config, order_store.clone()),
			order_store,
			settlement_client,
			trade_tx,
		}
	}

	async fn submit_command(
		&self,
		stock_id: &str,
		command: OrderCommand,
	) -> Result<MatchOutcome, MatchingError> {
		let handle = self.registry.get_or_create(stock_id);
		let (respond_to, rx) = oneshot::channel();

		handle
			.queue_sender
			.try_enqueue(EngineRequest {
				command,
				respond_to,
			})
			.map_err(|e| MatchingError::OrderBookError(format!("ingress queue: {}", e)))?;

		rx.await
			.map_err(|_| MatchingError::OrderBookError("engine dropped response channel".into()))?
	}

	/// Reconcile the Order Store for one side of one trade: reduce its
	/// remaining quantity, flip it terminal if depleted, or mint a
	/// completed child order for the traded portion if it still rests.
	///
	/// Returns the id that History should record this leg under: the
	/// order's own `stock_tx_id` if the trade completed it, or the
	/// freshly minted child's id if it still rests afterward - the same
	/// id either way the Order Store now holds under that status.
	async fn settle_order_side(&self, trade: &Trade, stock_tx_id: StockTxId, user_id: &str) -> StockTxId {
		let current = match self.order_store.get(stock_tx_id) {
			Ok(order) => order,
			Err(e) => {
				warn!("cannot reconcile order {}: {}", stock_tx_id, e);
				return stock_tx_id;
			}
		};

		if current.remaining_qty < trade.qty {
			error!(
				"trade qty {} exceeds order {} remaining {}",
				trade.qty, stock_tx_id, current.remaining_qty
			);
			return stock_tx_id;
		}

		let new_remaining = current.remaining_qty - trade.qty;
		let (new_status, child) = if new_remaining == 0 {
			(OrderStatus::Completed, None)
		} else {
			let now = trade.executed_at;
			let child = Order {
				stock_tx_id: StockTxId::new(),
				stock_id: trade.stock_id.clone(),
				user_id: user_id.to_string(),
				side: current.side,
				order_type: core_sdk::OrderType::Limit,
				limit_price: Some(trade.execution_price),
				original_qty: trade.qty,
				remaining_qty: 0,
				parent_tx_id: Some(stock_tx_id),
				wallet_tx_id: None,
				status: OrderStatus::Completed,
				created_at: now,
				updated_at: now,
			};
			(OrderStatus::PartiallyComplete, Some(child))
		};

		let leg_tx_id = child.as_ref().map(|c| c.stock_tx_id).unwrap_or(stock_tx_id);

		match self.order_store.compare_and_swap(
			stock_tx_id,
			current.status,
			new_status,
			new_remaining,
		) {
			Ok(()) => {
				if let Some(child) = child
					&& let Err(e) = self.order_store.insert(child)
				{
					error!("failed to mint child order for {}: {}", stock_tx_id, e);
					return stock_tx_id;
				}
			}
			Err(OrderStoreError::Conflict(_, observed)) => {
				warn!(
					"CAS conflict reconciling order {} (expected {:?}, observed {:?}); leaving for next settlement pass",
					stock_tx_id, current.status, observed
				);
				return stock_tx_id;
			}
			Err(e) => {
				error!("failed to reconcile order {}: {}", stock_tx_id, e);
				return stock_tx_id;
			}
		}

		leg_tx_id
	}

	async fn handle_trades(&self, trades: &[Trade]) {
		for trade in trades {
			let buy_leg_tx_id = self
				.settle_order_side(trade, trade.buy_tx_id, &trade.buyer_id)
				.await;
			let sell_leg_tx_id = self
				.settle_order_side(trade, trade.sell_tx_id, &trade.seller_id)
				.await;

			let trade = Trade {
				buy_leg_tx_id,
				sell_leg_tx_id,
				..trade.clone()
			};

			let _ = self.trade_tx.send(trade_to_proto(&trade));

			let mut client = self.settlement_client.clone();
			let trade = trade.clone();
			tokio::spawn(async move {
				if let Err(e) = client.submit_trade(trade.clone()).await {
					error!(
						"failed to forward trade {}/{} to settlement: {}",
						trade.buy_tx_id, trade.sell_tx_id, e
					);
				}
			});
		}
	}
}

#[tonic::async_trait]
impl MatchingService for MatchingServiceImpl {
	async fn submit_order(
		&self,
		request: Request<SubmitOrderRequest>,
	) -> Result<Response<SubmitOrderResponse>, Status> {
		let req = request.into_inner();

		if req.quantity == 0 {
			return Err(Status::invalid_argument("quantity must be > 0"));
		}
		let side = side_from_proto(req.side())?;
		let order_type = order_type_from_proto(req.order_type())?;

		let price: Option<MinorUnits> = match order_type {
			core_sdk::OrderType::Limit => match req.price {
				Some(p) if p > 0 => Some(p),
				_ => return Err(Status::invalid_argument("LIMIT order requires price > 0")),
			},
			core_sdk::OrderType::Market => {
				if req.price.is_some() {
					return Err(Status::invalid_argument("MARKET order must not carry a price"));
				}
				None
			}
		};

		let stock_tx_id = StockTxId::new();
		let created_at = Utc::now();

		let command = OrderCommand::New {
			stock_tx_id,
			stock_id: req.stock_id.clone(),
			user_id: req.user_id.clone(),
			side,
			order_type,
			quantity: req.quantity,
			price,
			created_at,
		};

		let outcome = match self.submit_command(&req.stock_id, command).await {
			Ok(outcome) => outcome,
			Err(MatchingError::NoLiquidity) => {
				return Ok(Response::new(SubmitOrderResponse {
					stock_tx_id: stock_tx_id.to_string(),
					status: ProtoStatus::Cancelled as i32,
					message: "NO_LIQUIDITY".to_string(),
				}));
			}
			Err(e) => return Err(matching_error_to_status(e)),
		};

		let order = Order {
			stock_tx_id,
			stock_id: req.stock_id.clone(),
			user_id: req.user_id.clone(),
			side,
			order_type,
			limit_price: price,
			original_qty: req.quantity,
			remaining_qty: req.quantity,
			parent_tx_id: None,
			wallet_tx_id: None,
			status: OrderStatus::InProgress,
			created_at,
			updated_at: created_at,
		};
		if let Err(e) = self.order_store.insert(order) {
			error!("failed to record order {}: {}", stock_tx_id, e);
		}

		self.handle_trades(&outcome.trades).await;

		if !outcome.trades.is_empty() {
			let final_status = if outcome.remaining_qty == 0 {
				OrderStatus::Completed
			} else {
				OrderStatus::PartiallyComplete
			};
			if let Err(e) = self.order_store.compare_and_swap(
				stock_tx_id,
				OrderStatus::InProgress,
				final_status,
				outcome.remaining_qty,
			) {
				warn!("failed to finalize taker status for {}: {}", stock_tx_id, e);
			}
		}

		Ok(Response::new(SubmitOrderResponse {
			stock_tx_id: stock_tx_id.to_string(),
			status: status_to_proto(outcome.status) as i32,
			message: String::new(),
		}))
	}

	async fn cancel_order(
		&self,
		request: Request<CancelOrderRequest>,
	) -> Result<Response<CancelOrderResponse>, Status> {
		let req = request.into_inner();
		let stock_tx_id = parse_stock_tx_id(&req.stock_tx_id)?;

		let order = self
			.order_store
			.get(stock_tx_id)
			.map_err(|_| Status::not_found("order not found"))?;

		if order.user_id != req.user_id {
			return Err(Status::not_found("order not found"));
		}
		if order.status.is_terminal() {
			return Err(Status::failed_precondition("ALREADY_TERMINAL"));
		}

		let outcome = self
			.submit_command(
				&order.stock_id,
				OrderCommand::Cancel {
					stock_tx_id,
					updated_at: Utc::now(),
				},
			)
			.await
			.map_err(matching_error_to_status)?;

		if let Err(e) = self.order_store.compare_and_swap(
			stock_tx_id,
			order.status,
			OrderStatus::Cancelled,
			outcome.remaining_qty,
		) {
			warn!("failed to record cancellation of {}: {}", stock_tx_id, e);
		}

		Ok(Response::new(CancelOrderResponse {
			stock_tx_id: stock_tx_id.to_string(),
			status: status_to_proto(OrderStatus::Cancelled) as i32,
			message: String::new(),
			stock_id: order.stock_id,
			side: side_to_proto(order.side) as i32,
			remaining_qty: outcome.remaining_qty,
		}))
	}

	async fn get_order(
		&self,
		request: Request<GetOrderRequest>,
	) -> Result<Response<GetOrderResponse>, Status> {
		let req = request.into_inner();
		let stock_tx_id = parse_stock_tx_id(&req.stock_tx_id)?;

		let order = self
			.order_store
			.get(stock_tx_id)
			.map_err(|_| Status::not_found("order not found"))?;

		Ok(Response::new(GetOrderResponse {
			order: Some(order_to_proto(&order)),
		}))
	}

	type StreamMatchedTradesStream =
		tokio_stream::wrappers::ReceiverStream<Result<MatchedTrade, Status>>;

	async fn stream_matched_trades(
		&self,
		request: Request<StreamMatchedTradesRequest>,
	) -> Result<Response<Self::StreamMatchedTradesStream>, Status> {
		let stock_id = request.into_inner().stock_id;
		let mut trades = self.trade_tx.subscribe();
		let (tx, rx) = tokio::sync::mpsc::channel(128);

		tokio::spawn(async move {
			loop {
				match trades.recv().await {
					Ok(trade) => {
						if stock_id.is_empty() || trade.stock_id == stock_id {
							if tx.send(Ok(trade)).await.is_err() {
								break;
							}
						}
					}
					Err(broadcast::error::RecvError::Lagged(_)) => continue,
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		});

		Ok(Response::new(tokio_stream::wrappers::ReceiverStream::new(
			rx,
		)))
	}
}

/// Create the matching gRPC service server.
pub fn create_server(
	config: MatchingConfig,
	order_store: Arc<dyn OrderStore>,
	settlement_client: SettlementGrpcClient,
) -> MatchingServiceServer<MatchingServiceImpl> {
	info!("matching service ready, stocks created on first order");
	MatchingServiceServer::new(MatchingServiceImpl::new(
		config,
		order_store,
		settlement_client,
	))
}
