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

//! The shared error taxonomy. Every crate's own error type
//! converts into `CoreErrorKind` at the boundary where it crosses a
//! service, so the gateway has a single place to map outcomes onto HTTP
//! status codes regardless of which downstream produced the failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoreErrorKind {
	#[error("invalid input")]
	InvalidInput,
	#[error("unauthenticated")]
	Unauthenticated,
	#[error("forbidden")]
	Forbidden,
	#[error("not found")]
	NotFound,
	#[error("already terminal")]
	AlreadyTerminal,
	#[error("insufficient funds")]
	InsufficientFunds,
	#[error("insufficient shares")]
	InsufficientShares,
	#[error("no liquidity")]
	NoLiquidity,
	#[error("conflict")]
	Conflict,
	#[error("upstream unavailable")]
	UpstreamUnavailable,
	#[error("internal error")]
	Internal,
}

impl CoreErrorKind {
	/// Whether a caller may safely retry the call that produced this
	/// error without risking a duplicate side effect.
	pub fn retryable(self) -> bool {
		matches!(self, CoreErrorKind::UpstreamUnavailable)
	}
}

/// A fully-formed core error: a taxonomy kind plus a human-readable detail
/// message, suitable for the `message` field of the client-facing
/// response envelope.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct CoreError {
	pub kind: CoreErrorKind,
	pub detail: String,
}

impl CoreError {
	pub fn new(kind: CoreErrorKind, detail: impl Into<String>) -> Self {
		Self {
			kind,
			detail: detail.into(),
		}
	}
}
