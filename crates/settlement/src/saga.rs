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

//! The Settlement Coordinator: a bounded, sharded worker
//! pool that drives the four-step compensating saga for each matched
//! trade, then hands the completed legs to the History Writer.
//!
//! Sharding is by `min(buyer_id, seller_id)`, so trades
//! between the same pair of users always serialize through the same
//! worker and observe wallet causality in production order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use core_sdk::{
	CoreError, CoreErrorKind, HistoryClient, Order, OrderStatus, OrderType, PortfolioClient, Side,
	StockTxId, Trade, WalletClient, WalletMovement, WalletMovementKind,
};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::SettlementConfig;
use crate::retry::{compensate_indefinitely, with_backoff};
use crate::validator::validate_trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
	Pending,
	Settled,
	Failed,
}

type StatusKey = (StockTxId, StockTxId);

struct SagaContext {
	wallet: Arc<dyn WalletClient>,
	portfolio: Arc<dyn PortfolioClient>,
	history: Arc<dyn HistoryClient>,
	config: SettlementConfig,
	status: Arc<DashMap<StatusKey, (SettlementOutcome, String)>>,
}

/// Entry point the matching engine's forwarded trades flow through.
pub struct SettlementCoordinator {
	shard_senders: Vec<mpsc::Sender<Trade>>,
	status: Arc<DashMap<StatusKey, (SettlementOutcome, String)>>,
}

impl SettlementCoordinator {
	pub fn start(
		config: SettlementConfig,
		wallet: Arc<dyn WalletClient>,
		portfolio: Arc<dyn PortfolioClient>,
		history: Arc<dyn HistoryClient>,
	) -> Self {
		let status = Arc::new(DashMap::new());
		let mut shard_senders = Vec::with_capacity(config.worker_shards.max(1));

		for shard in 0..config.worker_shards.max(1) {
			let (tx, rx) = mpsc::channel(config.shard_queue_size);
			let ctx = Arc::new(SagaContext {
				wallet: wallet.clone(),
				portfolio: portfolio.clone(),
				history: history.clone(),
				config: config.clone(),
				status: status.clone(),
			});
			tokio::spawn(run_shard(shard, rx, ctx));
			shard_senders.push(tx);
		}

		Self {
			shard_senders,
			status,
		}
	}

	/// Enqueue one matched trade for settlement. Returns once the trade is
	/// queued, not once it settles - the saga itself runs asynchronously
	/// on the trade's shard.
	pub async fn submit_trade(&self, trade: Trade) -> Result<(), CoreError> {
		validate_trade(&trade).map_err(|e| CoreError::new(CoreErrorKind::InvalidInput, e.to_string()))?;

		let key = (trade.buy_tx_id, trade.sell_tx_id);
		self.status
			.insert(key, (SettlementOutcome::Pending, String::new()));

		let shard = shard_for(&trade, self.shard_senders.len());
		self.shard_senders[shard].send(trade).await.map_err(|_| {
			self.status.remove(&key);
			CoreError::new(CoreErrorKind::Internal, "settlement shard worker is gone")
		})
	}

	pub fn status_of(&self, buy_tx_id: StockTxId, sell_tx_id: StockTxId) -> Option<(SettlementOutcome, String)> {
		self.status.get(&(buy_tx_id, sell_tx_id)).map(|e| e.clone())
	}
}

fn shard_for(trade: &Trade, shards: usize) -> usize {
	if shards == 0 {
		return 0;
	}
	let key = std::cmp::min(&trade.buyer_id, &trade.seller_id);
	let mut hasher = DefaultHasher::new();
	key.hash(&mut hasher);
	(hasher.finish() as usize) % shards
}

async fn run_shard(shard: usize, mut rx: mpsc::Receiver<Trade>, ctx: Arc<SagaContext>) {
	info!(shard, "settlement shard worker started");
	while let Some(trade) = rx.recv().await {
		let key = (trade.buy_tx_id, trade.sell_tx_id);
		match run_saga(&ctx, &trade).await {
			Ok(()) => {
				ctx.status
					.insert(key, (SettlementOutcome::Settled, String::new()));
			}
			Err(detail) => {
				warn!(
					buy_tx_id = %trade.buy_tx_id,
					sell_tx_id = %trade.sell_tx_id,
					%detail,
					"trade settlement aborted"
				);
				ctx.status.insert(key, (SettlementOutcome::Failed, detail));
			}
		}
	}
	info!(shard, "settlement shard worker stopped");
}

/// Runs the four-step saga for one trade. Returns `Ok(())`
/// once all four steps and the history writes have completed; `Err`
/// carries the diagnostic message for a saga that aborted and (if any
/// effects had been applied) was fully compensated.
async fn run_saga(ctx: &SagaContext, trade: &Trade) -> Result<(), String> {
	let amount = trade.qty.saturating_mul(trade.execution_price);
	let step_retries = ctx.config.max_step_retries;
	let step_delay = Duration::from_millis(ctx.config.step_backoff_base_ms);
	let comp_delay = Duration::from_millis(ctx.config.compensation_backoff_base_ms);
	let comp_max_delay = Duration::from_millis(ctx.config.compensation_backoff_max_ms);
	let comp_threshold = ctx.config.compensation_alarm_threshold;

	let debit_buyer_key = StockTxId::new();
	let debit_seller_shares_key = StockTxId::new();
	let credit_buyer_shares_key = StockTxId::new();
	let credit_seller_key = StockTxId::new();

	// Step 1: debit buyer's wallet.
	let step1 = with_backoff(step_retries, step_delay, || {
		ctx.wallet.debit(debit_buyer_key, &trade.buyer_id, amount)
	})
	.await;
	let buyer_debit_tx = match step1 {
		Ok(tx) => tx,
		Err(err) => return Err(format!("step 1 (debit buyer) failed: {err}")),
	};

	// Step 2: debit seller's escrowed shares.
	let step2 = with_backoff(step_retries, step_delay, || {
		ctx.portfolio
			.debit_shares(debit_seller_shares_key, &trade.seller_id, &trade.stock_id, trade.qty)
	})
	.await;
	if let Err(err) = step2 {
		compensate_indefinitely(
			"credit buyer back after step 2 failure",
			comp_threshold,
			comp_delay,
			comp_max_delay,
			|| ctx.wallet.credit(debit_buyer_key, &trade.buyer_id, amount),
		)
		.await;
		return Err(format!("step 2 (debit seller shares) failed: {err}"));
	}

	// Step 3: credit buyer's shares.
	let step3 = with_backoff(step_retries, step_delay, || {
		ctx.portfolio
			.credit_shares(credit_buyer_shares_key, &trade.buyer_id, &trade.stock_id, trade.qty)
	})
	.await;
	if let Err(err) = step3 {
		compensate_indefinitely(
			"re-escrow seller shares after step 3 failure",
			comp_threshold,
			comp_delay,
			comp_max_delay,
			|| ctx.portfolio.credit_shares(debit_seller_shares_key, &trade.seller_id, &trade.stock_id, trade.qty),
		)
		.await;
		compensate_indefinitely(
			"credit buyer back after step 3 failure",
			comp_threshold,
			comp_delay,
			comp_max_delay,
			|| ctx.wallet.credit(debit_buyer_key, &trade.buyer_id, amount),
		)
		.await;
		return Err(format!("step 3 (credit buyer shares) failed: {err}"));
	}

	// Step 4: credit seller's wallet.
	let step4 = with_backoff(step_retries, step_delay, || {
		ctx.wallet.credit(credit_seller_key, &trade.seller_id, amount)
	})
	.await;
	let seller_credit_tx = match step4 {
		Ok(tx) => tx,
		Err(err) => {
			compensate_indefinitely(
				"debit buyer shares back after step 4 failure",
				comp_threshold,
				comp_delay,
				comp_max_delay,
				|| {
					ctx.portfolio
						.debit_shares(credit_buyer_shares_key, &trade.buyer_id, &trade.stock_id, trade.qty)
				},
			)
			.await;
			compensate_indefinitely(
				"re-escrow seller shares after step 4 failure",
				comp_threshold,
				comp_delay,
				comp_max_delay,
				|| ctx.portfolio.credit_shares(debit_seller_shares_key, &trade.seller_id, &trade.stock_id, trade.qty),
			)
			.await;
			compensate_indefinitely(
				"credit buyer back after step 4 failure",
				comp_threshold,
				comp_delay,
				comp_max_delay,
				|| ctx.wallet.credit(debit_buyer_key, &trade.buyer_id, amount),
			)
			.await;
			return Err(format!("step 4 (credit seller) failed: {err}"));
		}
	};

	record_history(ctx, trade, buyer_debit_tx, seller_credit_tx, amount).await;
	Ok(())
}

/// Records the two completed legs and their linked wallet movements.
///
/// Each leg is recorded under `trade.{buy,sell}_leg_tx_id` - the id the
/// matching engine's Order Store reconciliation already minted for this
/// fill (the order's own id if the trade completed it, a fresh child id
/// if it still rests afterward) - so History never collides two
/// partial fills of the same resting order under one key, and a leg
/// recorded here always correlates with the Order Store row of the same
/// id. `parent_tx_id` links a child leg back to the resting parent;
/// it is `None` when the leg id is the order's own, since that isn't a
/// child. History writes use the same idempotency contract as the saga
/// steps, so a crash between settlement and history recording simply
/// replays as a no-op upsert on the next delivery.
async fn record_history(
	ctx: &SagaContext,
	trade: &Trade,
	buyer_debit_tx: core_sdk::WalletTxId,
	seller_credit_tx: core_sdk::WalletTxId,
	amount: u64,
) {
	let now = Utc::now();

	let buy_parent_tx_id = (trade.buy_leg_tx_id != trade.buy_tx_id).then_some(trade.buy_tx_id);
	let sell_parent_tx_id = (trade.sell_leg_tx_id != trade.sell_tx_id).then_some(trade.sell_tx_id);

	let buy_leg = Order {
		stock_tx_id: trade.buy_leg_tx_id,
		stock_id: trade.stock_id.clone(),
		user_id: trade.buyer_id.clone(),
		side: Side::Buy,
		order_type: OrderType::Limit,
		limit_price: Some(trade.execution_price),
		original_qty: trade.qty,
		remaining_qty: 0,
		parent_tx_id: buy_parent_tx_id,
		wallet_tx_id: Some(buyer_debit_tx),
		status: OrderStatus::Completed,
		created_at: trade.executed_at,
		updated_at: now,
	};
	let sell_leg = Order {
		stock_tx_id: trade.sell_leg_tx_id,
		stock_id: trade.stock_id.clone(),
		user_id: trade.seller_id.clone(),
		side: Side::Sell,
		order_type: OrderType::Limit,
		limit_price: Some(trade.execution_price),
		original_qty: trade.qty,
		remaining_qty: 0,
		parent_tx_id: sell_parent_tx_id,
		wallet_tx_id: Some(seller_credit_tx),
		status: OrderStatus::Completed,
		created_at: trade.executed_at,
		updated_at: now,
	};

	let buyer_movement = WalletMovement {
		wallet_tx_id: buyer_debit_tx,
		stock_tx_id: trade.buy_leg_tx_id,
		user_id: trade.buyer_id.clone(),
		kind: WalletMovementKind::Debit,
		amount,
		created_at: now,
	};
	let seller_movement = WalletMovement {
		wallet_tx_id: seller_credit_tx,
		stock_tx_id: trade.sell_leg_tx_id,
		user_id: trade.seller_id.clone(),
		kind: WalletMovementKind::Credit,
		amount,
		created_at: now,
	};

	if let Err(e) = ctx.history.record_stock_tx(trade.buy_leg_tx_id, &buy_leg).await {
		error!(stock_tx_id = %trade.buy_leg_tx_id, error = %e, "failed to record buy-leg history");
	}
	if let Err(e) = ctx.history.record_stock_tx(trade.sell_leg_tx_id, &sell_leg).await {
		error!(stock_tx_id = %trade.sell_leg_tx_id, error = %e, "failed to record sell-leg history");
	}
	if let Err(e) = ctx.history.record_wallet_tx(trade.buy_leg_tx_id, &buyer_movement).await {
		error!(wallet_tx_id = %buyer_debit_tx, error = %e, "failed to record buyer wallet movement history");
	}
	if let Err(e) = ctx.history.record_wallet_tx(trade.sell_leg_tx_id, &seller_movement).await {
		error!(wallet_tx_id = %seller_credit_tx, error = %e, "failed to record seller wallet movement history");
	}
}

#[cfg(test)]
mod tests {
	use core_sdk::upstream::{MemoryHistoryClient, MemoryPortfolioClient, MemoryWalletClient};

	use super::*;

	fn trade(buyer: &str, seller: &str, qty: u64, price: u64) -> Trade {
		let buy_tx_id = StockTxId::new();
		let sell_tx_id = StockTxId::new();
		Trade {
			buy_tx_id,
			sell_tx_id,
			buy_leg_tx_id: buy_tx_id,
			sell_leg_tx_id: sell_tx_id,
			stock_id: "ACME".to_string(),
			qty,
			execution_price: price,
			buyer_id: buyer.to_string(),
			seller_id: seller.to_string(),
			executed_at: Utc::now(),
		}
	}

	fn test_config() -> SettlementConfig {
		SettlementConfig {
			worker_shards: 1,
			shard_queue_size: 16,
			max_step_retries: 0,
			..SettlementConfig::default()
		}
	}

	#[tokio::test]
	async fn successful_saga_moves_cash_and_shares() {
		let wallet = Arc::new(MemoryWalletClient::new());
		wallet.seed("buyer", 10_000);
		let portfolio = Arc::new(MemoryPortfolioClient::new());
		portfolio.seed("seller", "ACME", 50);
		let history = Arc::new(MemoryHistoryClient::new());

		let coordinator = SettlementCoordinator::start(test_config(), wallet.clone(), portfolio.clone(), history.clone());
		let t = trade("buyer", "seller", 10, 150);
		let key = (t.buy_tx_id, t.sell_tx_id);
		coordinator.submit_trade(t).await.unwrap();

		for _ in 0..200 {
			if matches!(coordinator.status_of(key.0, key.1), Some((SettlementOutcome::Settled, _))) {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		assert_eq!(wallet.balance("buyer").await.unwrap(), 8_500);
		assert_eq!(wallet.balance("seller").await.unwrap(), 1_500);
		assert_eq!(portfolio.holding("buyer", "ACME").await.unwrap(), 10);
		assert_eq!(portfolio.holding("seller", "ACME").await.unwrap(), 40);
		assert_eq!(history.recorded_stock_tx_count(), 2);
		assert_eq!(history.recorded_wallet_tx_count(), 2);
	}

	#[tokio::test]
	async fn insufficient_seller_shares_compensates_buyer_debit() {
		let wallet = Arc::new(MemoryWalletClient::new());
		wallet.seed("buyer", 10_000);
		let portfolio = Arc::new(MemoryPortfolioClient::new());
		portfolio.seed("seller", "ACME", 2); // fewer than traded qty
		let history = Arc::new(MemoryHistoryClient::new());

		let coordinator = SettlementCoordinator::start(test_config(), wallet.clone(), portfolio.clone(), history.clone());
		let t = trade("buyer", "seller", 10, 150);
		let key = (t.buy_tx_id, t.sell_tx_id);
		coordinator.submit_trade(t).await.unwrap();

		for _ in 0..200 {
			if matches!(coordinator.status_of(key.0, key.1), Some((SettlementOutcome::Failed, _))) {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		assert_eq!(wallet.balance("buyer").await.unwrap(), 10_000);
		assert_eq!(history.recorded_stock_tx_count(), 0);
	}
}
