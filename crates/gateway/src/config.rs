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

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "gateway";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

// Server configuration constants
/// Default HTTP server bind address (can be overridden by GATEWAY_BIND_ADDR environment variable)
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Intake API configuration.
///
/// The gateway trusts `X-User-Id`/`X-User-Type` headers forwarded by the
/// out-of-scope outer API gateway, so there is no signature/key material
/// here - only where to dispatch once a request is authenticated and
/// admitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// HTTP server bind address
	pub bind_addr: SocketAddr,
	/// Number of actix-web worker threads; `None` defaults to the number
	/// of logical CPUs
	pub workers: Option<usize>,
	/// Matching engine gRPC endpoint. A single `core-matching` service
	/// shards by `stock_id` internally, so the gateway only
	/// ever needs one endpoint.
	pub matching_endpoint: String,
	/// Wallet service gRPC endpoint, used for the optional BUY-side
	/// balance pre-check
	pub wallet_endpoint: String,
	/// Portfolio service gRPC endpoint, used for the SELL-side share
	/// escrow performed at intake
	pub portfolio_endpoint: String,
	/// Rate limiting configuration
	pub rate_limit: RateLimitConfig,
	/// Capacity of the in-process dispatch queue to the matching engine
	pub dispatch_queue_capacity: usize,
	/// How long a request may wait for a free dispatch slot before the
	/// gateway reports `GATEWAY_OVERLOADED`
	pub dispatch_queue_timeout_ms: u64,
	/// Timeout for the gRPC call to the matching engine
	pub matching_rpc_timeout_ms: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
	/// Requests per second per user
	pub requests_per_second: u32,
	/// Burst capacity
	pub burst: u32,
}

impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			bind_addr: DEFAULT_BIND_ADDR.parse().unwrap(),
			workers: None,
			matching_endpoint: "http://localhost:50051".to_string(),
			wallet_endpoint: "http://localhost:50061".to_string(),
			portfolio_endpoint: "http://localhost:50062".to_string(),
			rate_limit: RateLimitConfig {
				requests_per_second: 100,
				burst: 200,
			},
			dispatch_queue_capacity: 4096,
			dispatch_queue_timeout_ms: 2_000,
			matching_rpc_timeout_ms: 5_000,
		}
	}
}

impl GatewayConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("GATEWAY"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("GATEWAY"))
			.build()?;

		cfg.try_deserialize()
	}
}
