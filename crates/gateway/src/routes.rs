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

use actix_web::web;

use crate::handlers;

/// Configure the client-facing Intake API routes: order placement,
/// cancellation, and a liveness probe.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
	cfg.service(
		web::scope("/engine")
			.route("/placeStockOrder", web::post().to(handlers::place_order))
			.route(
				"/cancelStockTransaction",
				web::post().to(handlers::cancel_order),
			),
	)
	.route("/health", web::get().to(handlers::health));
}
