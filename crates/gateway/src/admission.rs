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

//! Admission control for the Intake API: per-user rate
//! limiting, request shape validation, and the SELL-side share escrow /
//! optional BUY-side balance pre-check performed before an order is
//! dispatched to the matching engine.
//!
//! The balance/escrow checks here are advisory only - the authoritative
//! check happens at Settlement step 1, so a user can still see their order rejected downstream
//! even after passing admission.

use std::num::NonZeroU32;
use std::sync::Arc;

use core_sdk::types::{OrderType, PlaceOrderRequest, Side, StockTxId};
use core_sdk::upstream::{PortfolioClient, WalletClient};
use dashmap::DashMap;
use governor::{Quota, RateLimiter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdmissionError {
	#[error("invalid order: {0}")]
	InvalidOrder(String),
	#[error("rate limit exceeded")]
	RateLimitExceeded,
	#[error("insufficient balance")]
	InsufficientBalance,
	#[error("insufficient shares")]
	InsufficientShares,
	#[error("upstream unavailable: {0}")]
	UpstreamUnavailable(String),
}

type UserRateLimiter = Arc<
	RateLimiter<
		governor::state::direct::NotKeyed,
		governor::state::InMemoryState,
		governor::clock::DefaultClock,
	>,
>;

/// Per-user token-bucket rate limiting, keyed lazily as users are seen.
pub struct AdmissionController {
	rate_limiters: DashMap<String, UserRateLimiter>,
	quota: Quota,
}

impl AdmissionController {
	pub fn new(requests_per_second: u32, burst: u32) -> Self {
		let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(1).unwrap());
		let burst = NonZeroU32::new(burst).unwrap_or(per_second);
		let quota = Quota::per_second(per_second).allow_burst(burst);
		Self {
			rate_limiters: DashMap::new(),
			quota,
		}
	}

	pub fn check_rate_limit(&self, user_id: &str) -> Result<(), AdmissionError> {
		let limiter = self
			.rate_limiters
			.entry(user_id.to_string())
			.or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)))
			.clone();

		limiter.check().map_err(|_| AdmissionError::RateLimitExceeded)
	}
}

/// Syntactic validation of a placement request, independent of any
/// upstream call.
pub fn validate_place_order(request: &PlaceOrderRequest) -> Result<(), AdmissionError> {
	if request.stock_id.trim().is_empty() {
		return Err(AdmissionError::InvalidOrder(
			"stock_id is required".to_string(),
		));
	}

	if request.quantity == 0 {
		return Err(AdmissionError::InvalidOrder(
			"quantity must be greater than zero".to_string(),
		));
	}

	match request.order_type {
		OrderType::Limit => match request.price {
			None => {
				return Err(AdmissionError::InvalidOrder(
					"limit orders require a price".to_string(),
				));
			}
			Some(0) => {
				return Err(AdmissionError::InvalidOrder(
					"price must be greater than zero".to_string(),
				));
			}
			Some(_) => {}
		},
		OrderType::Market => {
			if request.price.is_some() {
				return Err(AdmissionError::InvalidOrder(
					"market orders must not carry a price".to_string(),
				));
			}
		}
	}

	Ok(())
}

/// SELL-side escrow: hold the shares being offered so the same position
/// cannot be sold twice while the order is in flight. Keyed by a
/// gateway-local idempotency key, since the real `stock_tx_id` is minted
/// by the matching engine once the order is accepted.
pub async fn escrow_sell_shares(
	portfolio: &dyn PortfolioClient,
	idempotency_key: StockTxId,
	user_id: &str,
	stock_id: &str,
	quantity: u64,
) -> Result<(), AdmissionError> {
	let owned = portfolio
		.holding(user_id, stock_id)
		.await
		.map_err(|e| AdmissionError::UpstreamUnavailable(e.detail))?;

	if owned < quantity {
		return Err(AdmissionError::InsufficientShares);
	}

	portfolio
		.debit_shares(idempotency_key, user_id, stock_id, quantity)
		.await
		.map_err(|e| AdmissionError::UpstreamUnavailable(e.detail))
}

/// Reverses `escrow_sell_shares` if the order could not be dispatched to
/// the matching engine after all.
pub async fn release_sell_shares(
	portfolio: &dyn PortfolioClient,
	idempotency_key: StockTxId,
	user_id: &str,
	stock_id: &str,
	quantity: u64,
) -> Result<(), AdmissionError> {
	portfolio
		.credit_shares(idempotency_key, user_id, stock_id, quantity)
		.await
		.map_err(|e| AdmissionError::UpstreamUnavailable(e.detail))
}

/// Non-authoritative BUY-side balance pre-check for LIMIT orders; helps
/// reject obviously-unaffordable orders early without holding any funds.
pub async fn precheck_buy_balance(
	wallet: &dyn WalletClient,
	user_id: &str,
	required: u64,
) -> Result<(), AdmissionError> {
	let balance = wallet
		.balance(user_id)
		.await
		.map_err(|e| AdmissionError::UpstreamUnavailable(e.detail))?;

	if balance < required {
		return Err(AdmissionError::InsufficientBalance);
	}

	Ok(())
}

/// Total notional of a LIMIT buy at its limit price; MARKET buys have no
/// price to pre-check against.
pub fn required_buy_balance(request: &PlaceOrderRequest) -> Option<u64> {
	if request.side != Side::Buy {
		return None;
	}
	request.price.map(|price| price.saturating_mul(request.quantity))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn limit_request(quantity: u64, price: Option<u64>) -> PlaceOrderRequest {
		PlaceOrderRequest {
			stock_id: "ACME".to_string(),
			side: Side::Buy,
			order_type: OrderType::Limit,
			quantity,
			price,
		}
	}

	#[test]
	fn rejects_zero_quantity() {
		let req = limit_request(0, Some(100));
		assert!(validate_place_order(&req).is_err());
	}

	#[test]
	fn rejects_limit_without_price() {
		let req = limit_request(10, None);
		assert!(validate_place_order(&req).is_err());
	}

	#[test]
	fn rejects_market_with_price() {
		let req = PlaceOrderRequest {
			order_type: OrderType::Market,
			price: Some(100),
			..limit_request(10, None)
		};
		assert!(validate_place_order(&req).is_err());
	}

	#[test]
	fn accepts_well_formed_limit() {
		let req = limit_request(10, Some(500));
		assert!(validate_place_order(&req).is_ok());
	}

	#[test]
	fn required_buy_balance_is_price_times_quantity() {
		let req = limit_request(10, Some(500));
		assert_eq!(required_buy_balance(&req), Some(5_000));
	}

	#[test]
	fn required_buy_balance_is_none_for_sell() {
		let req = PlaceOrderRequest {
			side: Side::Sell,
			..limit_request(10, Some(500))
		};
		assert_eq!(required_buy_balance(&req), None);
	}
}
