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

//! Client boundaries to the wallet, portfolio and history services
//!. Those services are owned elsewhere; CORE
//! only ever dials them, behind the trait objects below, so the Settlement
//! Coordinator's saga and the Intake API's pre-checks can run against a
//! gRPC implementation in production and an in-memory double in tests
//! without touching call sites.

pub mod grpc;
pub mod memory;

pub mod proto {
	tonic::include_proto!("core.upstream");
}

pub use grpc::{HistoryGrpcClient, PortfolioGrpcClient, WalletGrpcClient};
pub use memory::{MemoryHistoryClient, MemoryPortfolioClient, MemoryWalletClient};

use async_trait::async_trait;

use crate::error::CoreError;
use crate::types::{MinorUnits, Order, StockTxId, WalletMovement, WalletTxId};

/// Debits and credits a user's cash balance. Every mutating call is keyed
/// by `idempotency_key` - the child `stock_tx_id` minted for that
/// settlement leg - so retrying after a dropped response never
/// double-applies the movement.
#[async_trait]
pub trait WalletClient: Send + Sync {
	async fn balance(&self, user_id: &str) -> Result<MinorUnits, CoreError>;

	async fn debit(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		amount: MinorUnits,
	) -> Result<WalletTxId, CoreError>;

	async fn credit(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		amount: MinorUnits,
	) -> Result<WalletTxId, CoreError>;
}

/// Debits and credits a user's share holdings for one stock. Same
/// idempotency contract as `WalletClient`.
#[async_trait]
pub trait PortfolioClient: Send + Sync {
	async fn holding(&self, user_id: &str, stock_id: &str) -> Result<u64, CoreError>;

	async fn debit_shares(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		stock_id: &str,
		quantity: u64,
	) -> Result<(), CoreError>;

	async fn credit_shares(
		&self,
		idempotency_key: StockTxId,
		user_id: &str,
		stock_id: &str,
		quantity: u64,
	) -> Result<(), CoreError>;
}

/// Idempotent upsert of completed order/wallet-movement records
///. Keyed the same way as wallet/portfolio movements.
#[async_trait]
pub trait HistoryClient: Send + Sync {
	async fn record_stock_tx(&self, idempotency_key: StockTxId, order: &Order) -> Result<(), CoreError>;

	async fn record_wallet_tx(
		&self,
		idempotency_key: StockTxId,
		movement: &WalletMovement,
	) -> Result<(), CoreError>;
}
