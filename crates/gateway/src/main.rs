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

//! Intake API service entry point.
//!
//! Handles client order submission, authenticates the forwarded
//! `X-User-Id`/`X-User-Type` headers, admits or rejects the order, and
//! dispatches it to the matching engine.

use core_gateway::{GatewayConfig, GatewayServer, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	logging::init_logging()?;

	let config = GatewayConfig::from_env().unwrap_or_else(|e| {
		tracing::warn!(error = %e, "failed to load gateway config from environment, using defaults");
		GatewayConfig::default()
	});

	tracing::info!(target: "gateway::main", "starting core-gateway");

	let server = GatewayServer::new(config).await?;
	server.serve().await
}
