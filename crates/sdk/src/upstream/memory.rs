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

//! In-memory test doubles for the wallet/portfolio/history clients,
//! following the same `DashMap`-backed substitution pattern as
//! `core_matching::store::MemoryOrderStore`.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{HistoryClient, PortfolioClient, WalletClient};
use crate::error::{CoreError, CoreErrorKind};
use crate::types::{MinorUnits, Order, StockTxId, WalletMovement, WalletTxId};

/// Seeded with a starting balance per user; debits below zero are rejected
/// with `InsufficientFunds` rather than going negative.
pub struct MemoryWalletClient {
	balances: DashMap<String, MinorUnits>,
	applied: DashMap<StockTxId, WalletTxId>,
}

impl MemoryWalletClient {
	pub fn new() -> Self {
		Self {
			balances: DashMap::new(),
			applied: DashMap::new(),
		}
	}

	pub fn seed(&self, user_id: impl Into<String>, amount: MinorUnits) {
		self.balances.insert(user_id.into(), amount);
	}
}

impl Default for MemoryWalletClient {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl WalletClient for MemoryWalletClient {
	async fn balance(&self, user_id: &str) -> Result<MinorUnits, CoreError> {
		Ok(self.balances.get(user_id).map(|b| *b).unwrap_or(0))
	}

	async fn debit(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		amount: MinorUnits,
	) -> Result<WalletTxId, CoreError> {
		if let Some(existing) = self.applied.get(&idempotency_key) {
			return Ok(*existing);
		}
		let mut balance = self.balances.entry(user_id.to_string()).or_insert(0);
		if *balance < amount {
			return Err(CoreError::new(
				CoreErrorKind::InsufficientFunds,
				format!("user {user_id} has insufficient balance for debit of {amount}"),
			));
		}
		*balance -= amount;
		let wallet_tx_id = WalletTxId::new();
		self.applied.insert(idempotency_key, wallet_tx_id);
		Ok(wallet_tx_id)
	}

	async fn credit(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		amount: MinorUnits,
	) -> Result<WalletTxId, CoreError> {
		if let Some(existing) = self.applied.get(&idempotency_key) {
			return Ok(*existing);
		}
		*self.balances.entry(user_id.to_string()).or_insert(0) += amount;
		let wallet_tx_id = WalletTxId::new();
		self.applied.insert(idempotency_key, wallet_tx_id);
		Ok(wallet_tx_id)
	}
}

pub struct MemoryPortfolioClient {
	holdings: DashMap<(String, String), u64>,
	applied: DashMap<StockTxId, u64>,
}

impl MemoryPortfolioClient {
	pub fn new() -> Self {
		Self {
			holdings: DashMap::new(),
			applied: DashMap::new(),
		}
	}

	pub fn seed(&self, user_id: impl Into<String>, stock_id: impl Into<String>, quantity: u64) {
		self.holdings.insert((user_id.into(), stock_id.into()), quantity);
	}
}

impl Default for MemoryPortfolioClient {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl PortfolioClient for MemoryPortfolioClient {
	async fn holding(&self, user_id: &str, stock_id: &str) -> Result<u64, CoreError> {
		Ok(self
			.holdings
			.get(&(user_id.to_string(), stock_id.to_string()))
			.map(|h| *h)
			.unwrap_or(0))
	}

	async fn debit_shares(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		stock_id: &str,
		quantity: u64,
	) -> Result<(), CoreError> {
		if self.applied.contains_key(&idempotency_key) {
			return Ok(());
		}
		let key = (user_id.to_string(), stock_id.to_string());
		let mut held = self.holdings.entry(key).or_insert(0);
		if *held < quantity {
			return Err(CoreError::new(
				CoreErrorKind::InsufficientShares,
				format!("user {user_id} holds fewer than {quantity} shares of {stock_id}"),
			));
		}
		*held -= quantity;
		self.applied.insert(idempotency_key, quantity);
		Ok(())
	}

	async fn credit_shares(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		stock_id: &str,
		quantity: u64,
	) -> Result<(), CoreError> {
		if self.applied.contains_key(&idempotency_key) {
			return Ok(());
		}
		let key = (user_id.to_string(), stock_id.to_string());
		*self.holdings.entry(key).or_insert(0) += quantity;
		self.applied.insert(idempotency_key, quantity);
		Ok(())
	}
}

pub struct MemoryHistoryClient {
	stock_tx_records: DashMap<StockTxId, Order>,
	wallet_tx_records: DashMap<StockTxId, WalletMovement>,
}

impl MemoryHistoryClient {
	pub fn new() -> Self {
		Self {
			stock_tx_records: DashMap::new(),
			wallet_tx_records: DashMap::new(),
		}
	}

	pub fn recorded_stock_tx_count(&self) -> usize {
		self.stock_tx_records.len()
	}

	pub fn recorded_wallet_tx_count(&self) -> usize {
		self.wallet_tx_records.len()
	}
}

impl Default for MemoryHistoryClient {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl HistoryClient for MemoryHistoryClient {
	async fn record_stock_tx(&self, idempotency_key: StockTxId, order: &Order) -> Result<(), CoreError> {
		self.stock_tx_records.insert(idempotency_key, order.clone());
		Ok(())
	}

	async fn record_wallet_tx(
		&self,
		idempotency_key: StockTxId,
		movement: &WalletMovement,
	) -> Result<(), CoreError> {
		self.wallet_tx_records.insert(idempotency_key, movement.clone());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn wallet_debit_rejects_insufficient_balance() {
		let wallet = MemoryWalletClient::new();
		wallet.seed("alice", 100);

		let result = wallet.debit(StockTxId::new(), "alice", 200).await;
		assert!(matches!(
			result,
			Err(CoreError {
				kind: CoreErrorKind::InsufficientFunds,
				..
			})
		));
	}

	#[tokio::test]
	async fn wallet_debit_is_idempotent_on_retry() {
		let wallet = MemoryWalletClient::new();
		wallet.seed("alice", 100);
		let key = StockTxId::new();

		let first = wallet.debit(key, "alice", 40).await.unwrap();
		let second = wallet.debit(key, "alice", 40).await.unwrap();

		assert_eq!(first, second);
		assert_eq!(wallet.balance("alice").await.unwrap(), 60);
	}

	#[tokio::test]
	async fn portfolio_debit_rejects_insufficient_shares() {
		let portfolio = MemoryPortfolioClient::new();
		portfolio.seed("bob", "ACME", 5);

		let result = portfolio.debit_shares(StockTxId::new(), "bob", "ACME", 10).await;
		assert!(matches!(
			result,
			Err(CoreError {
				kind: CoreErrorKind::InsufficientShares,
				..
			})
		));
	}

	#[tokio::test]
	async fn portfolio_credit_is_idempotent_on_retry() {
		let portfolio = MemoryPortfolioClient::new();
		let key = StockTxId::new();

		portfolio.credit_shares(key, "bob", "ACME", 10).await.unwrap();
		portfolio.credit_shares(key, "bob", "ACME", 10).await.unwrap();

		assert_eq!(portfolio.holding("bob", "ACME").await.unwrap(), 10);
	}
}
