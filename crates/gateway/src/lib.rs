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

//! Core Gateway - the Intake API.
//!
//! Accepts client order placement/cancellation, trusts the `X-User-Id`/
//! `X-User-Type` headers forwarded by the out-of-scope outer API gateway,
//! rate-limits and validates the request, performs the SELL-side escrow
//! and optional BUY-side balance pre-check against the wallet/portfolio
//! services, then dispatches to the matching engine over gRPC.

pub mod admission;
pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod grpc_client;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod otel;
pub mod request_context;
pub mod routes;
pub mod server;
pub mod trace_context;

pub use config::GatewayConfig;
pub use server::{GatewayServer, GatewayState};
