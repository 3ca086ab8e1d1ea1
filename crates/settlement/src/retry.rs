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

//! Retry policies for the Settlement Coordinator's saga:
//! bounded exponential backoff for forward steps, unbounded backoff for
//! compensations.

use std::future::Future;
use std::time::Duration;

use core_sdk::CoreError;
use tracing::warn;

/// Retries `step` while it fails with a retryable `CoreError`, up to
/// `max_retries` times, with delay doubling from `base_delay` each attempt.
/// A non-retryable error, or exhausting the retry budget, returns the last
/// error immediately so the caller can begin compensating.
pub async fn with_backoff<F, Fut, T>(
	max_retries: u32,
	base_delay: Duration,
	mut step: F,
) -> Result<T, CoreError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, CoreError>>,
{
	let mut attempt = 0;
	loop {
		match step().await {
			Ok(value) => return Ok(value),
			Err(err) if err.kind.retryable() && attempt < max_retries => {
				let delay = base_delay * 2u32.saturating_pow(attempt);
				tokio::time::sleep(delay).await;
				attempt += 1;
			}
			Err(err) => return Err(err),
		}
	}
}

/// Retries `compensation` indefinitely until it succeeds. A saga that has
/// already applied a partial effect must never abandon the attempt to undo
/// it; after `alarm_threshold` consecutive failures the log
/// level of intent escalates so an operator notices a stuck compensation.
pub async fn compensate_indefinitely<F, Fut>(
	description: &str,
	alarm_threshold: u32,
	base_delay: Duration,
	max_delay: Duration,
	mut compensation: F,
) where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<(), CoreError>>,
{
	let mut attempt: u32 = 0;
	loop {
		match compensation().await {
			Ok(()) => {
				if attempt > 0 {
					warn!(attempt, description, "compensation succeeded after retrying");
				}
				return;
			}
			Err(err) => {
				attempt += 1;
				if attempt >= alarm_threshold {
					warn!(
						attempt,
						alarm_threshold,
						description,
						error = %err,
						"compensation still failing past alarm threshold - operator attention required"
					);
				} else {
					warn!(attempt, description, error = %err, "compensation step failed, retrying");
				}
				let delay = (base_delay * 2u32.saturating_pow(attempt.min(16))).min(max_delay);
				tokio::time::sleep(delay).await;
			}
		}
	}
}
