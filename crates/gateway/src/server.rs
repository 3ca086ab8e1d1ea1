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

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use core_sdk::upstream::{PortfolioClient, PortfolioGrpcClient, WalletClient, WalletGrpcClient};

use crate::{
	admission::AdmissionController, config::GatewayConfig, dispatcher::MatchingDispatcher, middleware,
	routes,
};

/// Shared state handed to every actix-web worker: the
/// dispatcher that forwards admitted orders to the matching engine, the
/// admission controller (rate limiting), and the wallet/portfolio clients
/// used for the intake-time pre-check and escrow.
pub struct GatewayState {
	pub dispatcher: Arc<MatchingDispatcher>,
	pub admission: Arc<AdmissionController>,
	pub wallet: Arc<dyn WalletClient>,
	pub portfolio: Arc<dyn PortfolioClient>,
}

/// The Intake API's HTTP server.
pub struct GatewayServer {
	config: GatewayConfig,
	state: web::Data<GatewayState>,
}

impl GatewayServer {
	pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
		let dispatcher = Arc::new(MatchingDispatcher::new(&config).await?);
		let admission = Arc::new(AdmissionController::new(
			config.rate_limit.requests_per_second,
			config.rate_limit.burst,
		));
		let wallet: Arc<dyn WalletClient> = Arc::new(
			WalletGrpcClient::new(&config.wallet_endpoint)
				.await
				.map_err(|e| anyhow::anyhow!("failed to dial wallet service: {e}"))?,
		);
		let portfolio: Arc<dyn PortfolioClient> = Arc::new(
			PortfolioGrpcClient::new(&config.portfolio_endpoint)
				.await
				.map_err(|e| anyhow::anyhow!("failed to dial portfolio service: {e}"))?,
		);

		Ok(Self {
			config,
			state: web::Data::new(GatewayState {
				dispatcher,
				admission,
				wallet,
				portfolio,
			}),
		})
	}

	/// Start the HTTP server and run until shut down.
	pub async fn serve(self) -> anyhow::Result<()> {
		let bind_addr = self.config.bind_addr;
		let workers = self.config.workers.unwrap_or_else(num_cpus::get);
		let state = self.state.clone();

		tracing::info!(target: "gateway::server", %bind_addr, workers, "starting core-gateway");

		HttpServer::new(move || {
			App::new()
				.app_data(state.clone())
				.wrap(middleware::RequestContextMiddleware)
				.wrap(middleware::LoggingMiddleware)
				.wrap(middleware::CorsMiddleware)
				.configure(routes::configure_routes)
		})
		.workers(workers)
		.bind(bind_addr)?
		.run()
		.await?;

		Ok(())
	}
}
