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

//! Settlement Coordinator service entry point.
//!
//! Boots the gRPC surface defined in `server.rs` over a
//! `SettlementCoordinator`, wired against the wallet,
//! portfolio and history services over gRPC.

use std::sync::Arc;

use anyhow::{Context, Result};
use core_sdk::upstream::{HistoryGrpcClient, PortfolioGrpcClient, WalletGrpcClient};
use core_sdk::{HistoryClient, PortfolioClient, WalletClient};
use core_settlement::config::SettlementConfig;
use core_settlement::{logging, saga::SettlementCoordinator, server};
use tonic::transport::Server;

#[tokio::main]
async fn main() -> Result<()> {
	logging::init_logging().context("failed to initialize logging")?;

	let config = SettlementConfig::from_env().unwrap_or_else(|_| SettlementConfig::default());

	tracing::info!(bind_addr = %config.bind_addr, "starting core-settlement");

	let wallet: Arc<dyn WalletClient> = Arc::new(
		WalletGrpcClient::new(&config.wallet_endpoint)
			.await
			.context("failed to connect to wallet service")?,
	);
	let portfolio: Arc<dyn PortfolioClient> = Arc::new(
		PortfolioGrpcClient::new(&config.portfolio_endpoint)
			.await
			.context("failed to connect to portfolio service")?,
	);
	let history: Arc<dyn HistoryClient> = Arc::new(
		HistoryGrpcClient::new(&config.history_endpoint)
			.await
			.context("failed to connect to history service")?,
	);

	let bind_addr = config.bind_addr;
	let coordinator = SettlementCoordinator::start(config, wallet, portfolio, history);
	let svc = server::create_server(coordinator);

	Server::builder()
		.add_service(svc)
		.serve_with_shutdown(bind_addr, async {
			let _ = tokio::signal::ctrl_c().await;
			tracing::info!("shutdown signal received");
		})
		.await
		.context("settlement gRPC server failed")?;

	Ok(())
}
