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

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const LOG_COMPONENT_NAME: &str = "settlement";
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Settlement Coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
	/// gRPC server bind address
	pub bind_addr: SocketAddr,
	/// Wallet service endpoint
	pub wallet_endpoint: String,
	/// Portfolio service endpoint
	pub portfolio_endpoint: String,
	/// History service endpoint
	pub history_endpoint: String,
	/// Number of saga worker shards; trades for the same user pair always
	/// land on the same shard, by `min(buyer_id, seller_id)`
	pub worker_shards: usize,
	/// Capacity of each shard's trade queue
	pub shard_queue_size: usize,
	/// Max retry attempts per forward saga step before compensating
	pub max_step_retries: u32,
	/// Base delay for the forward-step exponential backoff
	pub step_backoff_base_ms: u64,
	/// Base delay for indefinite compensation retries
	pub compensation_backoff_base_ms: u64,
	/// Cap on the compensation backoff delay
	pub compensation_backoff_max_ms: u64,
	/// Number of failed compensation attempts after which the alarm escalates
	pub compensation_alarm_threshold: u32,
}

impl Default for SettlementConfig {
	fn default() -> Self {
		Self {
			bind_addr: "0.0.0.0:50052".parse().unwrap(),
			wallet_endpoint: "http://localhost:50061".to_string(),
			portfolio_endpoint: "http://localhost:50062".to_string(),
			history_endpoint: "http://localhost:50063".to_string(),
			worker_shards: 8,
			shard_queue_size: 1024,
			max_step_retries: 5,
			step_backoff_base_ms: 50,
			compensation_backoff_base_ms: 200,
			compensation_backoff_max_ms: 30_000,
			compensation_alarm_threshold: 5,
		}
	}
}

impl SettlementConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("SETTLEMENT"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("SETTLEMENT"))
			.build()?;

		cfg.try_deserialize()
	}
}
