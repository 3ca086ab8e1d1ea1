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

//! Core Settlement Coordinator
//!
//! Consumes matched trades from the matching engine and drives the
//! compensating saga that moves cash and shares between buyer and seller,
//! then hands the completed legs to the history writer.

pub mod config;
pub mod logging;
pub mod otel;
pub mod retry;
pub mod saga;
pub mod server;
pub mod validator;

pub use config::SettlementConfig;
pub use saga::SettlementCoordinator;
