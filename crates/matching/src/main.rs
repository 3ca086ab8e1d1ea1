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

//! Matching engine service entry point.
//!
//! Boots the gRPC surface defined in `server.rs`: one Order Store shared by
//! every stock, lazily-spawned per-stock matching engines, and a client to
//! hand executed trades off to settlement.

use std::sync::Arc;

use anyhow::{Context, Result};
use core_matching::config::MatchingConfig;
use core_matching::store::MemoryOrderStore;
use core_matching::{client::SettlementGrpcClient, logging, server};
use tonic::transport::Server;

#[tokio::main]
async fn main() -> Result<()> {
	logging::init_logging().context("failed to initialize logging")?;

	let config = MatchingConfig::from_env().unwrap_or_else(|_| MatchingConfig::default());

	tracing::info!(bind_addr = %config.bind_addr, "starting core-matching");

	let settlement_client = SettlementGrpcClient::new(&config.settlement_endpoint)
		.await
		.context("failed to connect to settlement service")?;

	let order_store: Arc<dyn core_matching::store::OrderStore> = Arc::new(MemoryOrderStore::new());
	let bind_addr = config.bind_addr;
	let svc = server::create_server(config, order_store, settlement_client);

	Server::builder()
		.add_service(svc)
		.serve_with_shutdown(bind_addr, async {
			let _ = tokio::signal::ctrl_c().await;
			tracing::info!("shutdown signal received");
		})
		.await
		.context("matching gRPC server failed")?;

	Ok(())
}
