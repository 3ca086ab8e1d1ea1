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
pub const LOG_COMPONENT_NAME: &str = "matching";
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Matching engine configuration.
///
/// One `MatchingConfig` is shared across every per-stock engine the
/// service spawns; `ingress_queue_size`/`event_buffer_size` size each
/// stock's channels identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
	/// gRPC server bind address
	pub bind_addr: SocketAddr,
	/// Settlement service endpoint
	pub settlement_endpoint: String,
	/// Capacity of each stock's ingress queue
	pub ingress_queue_size: usize,
	/// Capacity of each stock's event buffer
	pub event_buffer_size: usize,
	/// Max events per event-writer commit batch
	pub event_batch_size: usize,
	/// Max time to wait before committing a partial event batch
	pub event_batch_timeout_ms: u64,
	/// Interval between periodic snapshots, per stock
	pub snapshot_interval_secs: u64,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			bind_addr: "0.0.0.0:50051".parse().unwrap(),
			settlement_endpoint: "http://localhost:50052".to_string(),
			ingress_queue_size: 4096,
			event_buffer_size: 4096,
			event_batch_size: 100,
			event_batch_timeout_ms: 100,
			snapshot_interval_secs: 60,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}
}
