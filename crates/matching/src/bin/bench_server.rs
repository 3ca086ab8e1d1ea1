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

//! Standalone matching server for the throughput harness in
//! `benches/engine_throughput.rs` - same gRPC surface as `main.rs`, just
//! with logging quieted and config sourced from `configs/bench.toml`
//! instead of the environment.

use std::sync::Arc;

use anyhow::Result;
use tonic::transport::Server;

use core_matching::{client::SettlementGrpcClient, config::MatchingConfig, server, store::MemoryOrderStore};

#[tokio::main]
async fn main() -> Result<()> {
	unsafe {
		std::env::set_var("RUST_LOG", "error");
		std::env::set_var("LOG_TO_CONSOLE", "false");
	}

	let config = MatchingConfig::from_file("configs/bench.toml").unwrap_or_else(|_| MatchingConfig::default());

	println!("Starting Benchmark Server");
	println!("Ingress Queue: {}", config.ingress_queue_size);
	println!("Event Buffer: {}", config.event_buffer_size);
	println!("Listening on: {}", config.bind_addr);

	let settlement_client = SettlementGrpcClient::new(&config.settlement_endpoint).await?;
	let order_store: Arc<dyn core_matching::store::OrderStore> = Arc::new(MemoryOrderStore::new());
	let bind_addr = config.bind_addr;
	let matching_service = server::create_server(config, order_store, settlement_client);

	println!("Server ready for benchmarking");

	Server::builder()
		.add_service(matching_service)
		.serve_with_shutdown(bind_addr, async {
			tokio::signal::ctrl_c().await.ok();
			println!("Shutting down...");
		})
		.await?;

	Ok(())
}
