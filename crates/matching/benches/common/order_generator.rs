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

use chrono::Utc;
use core_matching::types::OrderCommand;
use core_sdk::types::{OrderType, Side, StockTxId};

#[derive(Clone)]
pub enum Scenario {
	NoCross,
	CrossHeavy,
	DeepBook,
}

pub struct OrderGenerator {
	thread_id: usize,
	counter: u64,
	scenario: Scenario,
}

impl OrderGenerator {
	pub fn new(thread_id: usize, scenario: Scenario) -> Self {
		Self {
			thread_id,
			counter: 0,
			scenario,
		}
	}

	fn order(&self, side: Side, price: u64, quantity: u64) -> OrderCommand {
		OrderCommand::New {
			stock_tx_id: StockTxId::new(),
			stock_id: "ACME".to_string(),
			user_id: format!("bench_{}", self.thread_id),
			side,
			order_type: OrderType::Limit,
			quantity,
			price: Some(price),
			created_at: Utc::now(),
		}
	}

	pub fn next_order(&mut self) -> OrderCommand {
		self.counter += 1;

		match self.scenario {
			Scenario::NoCross => {
				if self.counter.is_multiple_of(2) {
					self.order(Side::Buy, 44000 + (self.counter % 1000), 1)
				} else {
					self.order(Side::Sell, 56000 + (self.counter % 1000), 1)
				}
			}
			Scenario::CrossHeavy => {
				let side = if self.counter.is_multiple_of(2) { Side::Buy } else { Side::Sell };
				self.order(side, 50000, 10)
			}
			Scenario::DeepBook => {
				// Spike-the-depth load: every 100th order is a deep taker
				// (an extreme limit price standing in for a market order,
				// since this engine has no IOC/market semantics and its
				// unfilled remainder simply rests), interleaved with a
				// steady stream of two-sided resting makers to keep the
				// book deep enough for the taker to chew through.
				let is_spike_taker = self.counter.is_multiple_of(100);

				if is_spike_taker {
					let side = if (self.counter / 100).is_multiple_of(2) { Side::Buy } else { Side::Sell };
					let price = match side {
						Side::Buy => 1_000_000_000,
						Side::Sell => 1,
					};
					self.order(side, price, 10_000_000)
				} else {
					let mid: u64 = 50_000;
					let levels: u64 = 2_000;
					let offset = (self.counter % levels) as i64 - (levels as i64 / 2);
					let price = (mid as i64 + offset) as u64;
					let side = if self.counter.is_multiple_of(2) { Side::Buy } else { Side::Sell };
					self.order(side, price, 1_000)
				}
			}
		}
	}

	pub fn warmup_orders(&self, count: usize) -> Vec<OrderCommand> {
		let mid: u64 = 50_000;
		let levels: u64 = 2_000;
		let half = levels / 2;

		(0..count)
			.map(|i| {
				let i = i as u64;
				let side = if i.is_multiple_of(2) { Side::Buy } else { Side::Sell };

				// buy < mid, sell > mid so warmup orders never cross each other
				let level = (i / 2) % half;
				let price = match side {
					Side::Buy => mid - 1 - level,
					Side::Sell => mid + 1 + level,
				};

				OrderCommand::New {
					stock_tx_id: StockTxId::new(),
					stock_id: "ACME".to_string(),
					user_id: "warmup".to_string(),
					side,
					order_type: OrderType::Limit,
					quantity: 1_000,
					price: Some(price),
					created_at: Utc::now(),
				}
			})
			.collect()
	}
}
