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

//! Forwards an admitted order from the Intake API to the matching engine
//! over gRPC, queuing requests so a slow or
//! overloaded matching engine applies back-pressure to the gateway
//! instead of each handler dialing out independently.

use std::time::{Duration, Instant};

use core_sdk::types::{CancelOrderRequest, CancelOrderResponse, PlaceOrderRequest, PlaceOrderResponse};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::{
	config::GatewayConfig,
	grpc_client::{MatchingClientError, MatchingGrpcClient},
	request_context::RequestContext,
};

/// Error types for dispatching operations
#[derive(Debug, Error)]
pub enum DispatcherError {
	#[error("Gateway dispatch queue is overloaded")]
	GatewayOverloaded,
	#[error("Timed out while waiting in dispatch queue")]
	QueueTimeout,
	#[error("Matching confirmation not received within gateway timeout")]
	MatchingTimeout,
	#[error("Matching rejected order: {0}")]
	MatchingRejected(String),
	#[error("Matching internal error: {0}")]
	MatchingInternal(String),
	#[error("Dispatching error: {0}")]
	DispatchingError(String),
}

#[derive(Debug, Clone)]
pub struct DispatchTimings {
	pub queue_wait_ms: u128,
	pub rpc_ms: u128,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderOutcome {
	pub response: PlaceOrderResponse,
	pub timings: DispatchTimings,
}

#[derive(Debug, Clone)]
pub struct CancelOrderOutcome {
	pub response: CancelOrderResponse,
	pub timings: DispatchTimings,
}

enum DispatchJob {
	Place {
		request: PlaceOrderRequest,
		user_id: String,
		enqueued_at: Instant,
		response_tx: oneshot::Sender<Result<PlaceOrderOutcome, DispatcherError>>,
	},
	Cancel {
		request: CancelOrderRequest,
		user_id: String,
		enqueued_at: Instant,
		response_tx: oneshot::Sender<Result<CancelOrderOutcome, DispatcherError>>,
	},
}

/// Queues admitted orders and cancellations for delivery to the single
/// `core-matching` gRPC endpoint.
pub struct MatchingDispatcher {
	queue_tx: mpsc::Sender<DispatchJob>,
	queue_timeout: Duration,
}

impl MatchingDispatcher {
	pub async fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
		let rpc_timeout = Duration::from_millis(config.matching_rpc_timeout_ms);
		let client = MatchingGrpcClient::new(&config.matching_endpoint, rpc_timeout).await?;
		let (queue_tx, queue_rx) = mpsc::channel(config.dispatch_queue_capacity);

		let dispatcher = Self {
			queue_tx,
			queue_timeout: Duration::from_millis(config.dispatch_queue_timeout_ms),
		};

		dispatcher.spawn_worker(queue_rx, client);

		tracing::info!(
			target: "gateway::dispatcher",
			"MatchingDispatcher initialized against {} (queue cap={}, queue timeout={}ms, rpc timeout={}ms)",
			config.matching_endpoint,
			config.dispatch_queue_capacity,
			config.dispatch_queue_timeout_ms,
			config.matching_rpc_timeout_ms,
		);

		Ok(dispatcher)
	}

	/// Dispatch an admitted placement to the matching engine and wait for
	/// its synchronous acceptance/rejection.
	pub async fn dispatch_place(
		&self,
		request: PlaceOrderRequest,
		user_id: String,
		_context: RequestContext,
	) -> Result<PlaceOrderOutcome, DispatcherError> {
		let (response_tx, response_rx) = oneshot::channel();
		let job = DispatchJob::Place {
			request,
			user_id,
			enqueued_at: Instant::now(),
			response_tx,
		};
		self.enqueue(job, response_rx).await
	}

	/// Dispatch a cancellation to the matching engine.
	pub async fn dispatch_cancel(
		&self,
		request: CancelOrderRequest,
		user_id: String,
		_context: RequestContext,
	) -> Result<CancelOrderOutcome, DispatcherError> {
		let (response_tx, response_rx) = oneshot::channel();
		let job = DispatchJob::Cancel {
			request,
			user_id,
			enqueued_at: Instant::now(),
			response_tx,
		};
		self.enqueue(job, response_rx).await
	}

	async fn enqueue<T>(
		&self,
		job: DispatchJob,
		response_rx: oneshot::Receiver<Result<T, DispatcherError>>,
	) -> Result<T, DispatcherError> {
		self.queue_tx.try_send(job).map_err(|e| match e {
			mpsc::error::TrySendError::Full(_) => DispatcherError::GatewayOverloaded,
			mpsc::error::TrySendError::Closed(_) => {
				DispatcherError::DispatchingError("dispatch queue closed".to_string())
			}
		})?;

		let result = tokio::time::timeout(self.queue_timeout, response_rx)
			.await
			.map_err(|_| DispatcherError::QueueTimeout)?;

		result.map_err(|_| DispatcherError::DispatchingError("dispatcher worker dropped response".to_string()))?
	}

	fn spawn_worker(&self, mut queue_rx: mpsc::Receiver<DispatchJob>, client: MatchingGrpcClient) {
		tokio::spawn(async move {
			while let Some(job) = queue_rx.recv().await {
				match job {
					DispatchJob::Place {
						request,
						user_id,
						enqueued_at,
						response_tx,
					} => {
						let queue_wait = enqueued_at.elapsed();
						let rpc_start = Instant::now();
						let result = client.submit_order(&user_id, &request).await;
						let timings = DispatchTimings {
							queue_wait_ms: queue_wait.as_millis(),
							rpc_ms: rpc_start.elapsed().as_millis(),
						};
						let outcome = result
							.map(|response| PlaceOrderOutcome { response, timings })
							.map_err(map_client_error);
						let _ = response_tx.send(outcome);
					}
					DispatchJob::Cancel {
						request,
						user_id,
						enqueued_at,
						response_tx,
					} => {
						let queue_wait = enqueued_at.elapsed();
						let rpc_start = Instant::now();
						let result = client.cancel_order(&user_id, &request).await;
						let timings = DispatchTimings {
							queue_wait_ms: queue_wait.as_millis(),
							rpc_ms: rpc_start.elapsed().as_millis(),
						};
						let outcome = result
							.map(|response| CancelOrderOutcome { response, timings })
							.map_err(map_client_error);
						let _ = response_tx.send(outcome);
					}
				}
			}
		});
	}
}

fn map_client_error(err: MatchingClientError) -> DispatcherError {
	match err {
		MatchingClientError::Transport(e) => DispatcherError::DispatchingError(e),
		MatchingClientError::Status(e) => DispatcherError::MatchingInternal(e),
		// NO_LIQUIDITY surfaces here.
		MatchingClientError::Rejected(e) => DispatcherError::MatchingRejected(e),
	}
}
