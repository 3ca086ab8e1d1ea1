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

use core_sdk::Trade;
use thiserror::Error;

/// Error types for trade validation
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("invalid trade: {0}")]
	InvalidTrade(String),
}

/// Validate a matched trade before it enters the settlement saga.
pub fn validate_trade(trade: &Trade) -> Result<(), ValidationError> {
	if trade.stock_id.is_empty() {
		return Err(ValidationError::InvalidTrade(
			"stock_id is required".to_string(),
		));
	}
	if trade.execution_price == 0 {
		return Err(ValidationError::InvalidTrade(
			"execution_price must be greater than zero".to_string(),
		));
	}
	if trade.qty == 0 {
		return Err(ValidationError::InvalidTrade(
			"qty must be greater than zero".to_string(),
		));
	}
	if trade.buyer_id.is_empty() || trade.seller_id.is_empty() {
		return Err(ValidationError::InvalidTrade(
			"buyer_id and seller_id are required".to_string(),
		));
	}
	if trade.buyer_id == trade.seller_id {
		return Err(ValidationError::InvalidTrade(
			"a user cannot trade against themselves".to_string(),
		));
	}
	Ok(())
}

/// Validate a batch of trades
pub fn validate_trades(trades: &[Trade]) -> Result<(), ValidationError> {
	for trade in trades {
		validate_trade(trade)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use core_sdk::StockTxId;

	use super::*;

	fn trade() -> Trade {
		let buy_tx_id = StockTxId::new();
		let sell_tx_id = StockTxId::new();
		Trade {
			buy_tx_id,
			sell_tx_id,
			buy_leg_tx_id: buy_tx_id,
			sell_leg_tx_id: sell_tx_id,
			stock_id: "ACME".to_string(),
			qty: 10,
			execution_price: 150,
			buyer_id: "u1".to_string(),
			seller_id: "u2".to_string(),
			executed_at: Utc::now(),
		}
	}

	#[test]
	fn valid_trade_passes() {
		assert!(validate_trade(&trade()).is_ok());
	}

	#[test]
	fn zero_qty_is_rejected() {
		let mut t = trade();
		t.qty = 0;
		assert!(validate_trade(&t).is_err());
	}

	#[test]
	fn self_trade_is_rejected() {
		let mut t = trade();
		t.seller_id = t.buyer_id.clone();
		assert!(validate_trade(&t).is_err());
	}
}
