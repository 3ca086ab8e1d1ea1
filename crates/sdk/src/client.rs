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

//! Thin client for the Intake API's client-facing REST surface
//!. Embeddable: no background threads, no environment or
//! configuration loading.

use thiserror::Error;

use crate::types::{
	ApiResponse, CancelOrderRequest, CancelOrderResponse, Order, PlaceOrderRequest,
	PlaceOrderResponse,
};

/// Error types for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("network error: {0}")]
	Network(String),
	#[error("server error: {0}")]
	Server(String),
	#[error("authentication error: {0}")]
	Authentication(String),
}

/// Async client for interacting with the gateway's Intake API.
pub struct Client {
	base_url: String,
	http: reqwest::Client,
	bearer_token: Option<String>,
}

impl Client {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			http: reqwest::Client::new(),
			bearer_token: None,
		}
	}

	pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
		self.bearer_token = Some(token.into());
		self
	}

	fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.bearer_token {
			Some(token) => builder.bearer_auth(token),
			None => builder,
		}
	}

	/// `POST /engine/placeStockOrder`
	pub async fn place_order(
		&self,
		request: PlaceOrderRequest,
	) -> Result<PlaceOrderResponse, ClientError> {
		let url = format!("{}/engine/placeStockOrder", self.base_url);
		let resp = self
			.authorize(self.http.post(&url).json(&request))
			.send()
			.await
			.map_err(|e| ClientError::Network(e.to_string()))?;

		let envelope: ApiResponse<PlaceOrderResponse> = resp
			.json()
			.await
			.map_err(|e| ClientError::Server(e.to_string()))?;

		envelope
			.data
			.ok_or_else(|| ClientError::Server(envelope.message.unwrap_or_default()))
	}

	/// `POST /engine/cancelStockTransaction`
	pub async fn cancel_order(
		&self,
		request: CancelOrderRequest,
	) -> Result<CancelOrderResponse, ClientError> {
		let url = format!("{}/engine/cancelStockTransaction", self.base_url);
		let resp = self
			.authorize(self.http.post(&url).json(&request))
			.send()
			.await
			.map_err(|e| ClientError::Network(e.to_string()))?;

		let envelope: ApiResponse<CancelOrderResponse> = resp
			.json()
			.await
			.map_err(|e| ClientError::Server(e.to_string()))?;

		envelope
			.data
			.ok_or_else(|| ClientError::Server(envelope.message.unwrap_or_default()))
	}

	/// `GET /transaction/getStockTransactions`
	pub async fn list_stock_transactions(&self) -> Result<Vec<Order>, ClientError> {
		let url = format!("{}/transaction/getStockTransactions", self.base_url);
		let resp = self
			.authorize(self.http.get(&url))
			.send()
			.await
			.map_err(|e| ClientError::Network(e.to_string()))?;

		let envelope: ApiResponse<Vec<Order>> = resp
			.json()
			.await
			.map_err(|e| ClientError::Server(e.to_string()))?;

		envelope
			.data
			.ok_or_else(|| ClientError::Server(envelope.message.unwrap_or_default()))
	}
}

/// Blocking variant built on a dedicated current-thread runtime, for
/// embedding in synchronous call sites.
pub struct SyncClient {
	runtime: tokio::runtime::Runtime,
	inner: Client,
}

impl SyncClient {
	pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(|e| ClientError::Network(e.to_string()))?;
		Ok(Self {
			runtime,
			inner: Client::new(base_url),
		})
	}

	pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
		self.inner = self.inner.with_bearer_token(token);
		self
	}

	pub fn place_order(
		&self,
		request: PlaceOrderRequest,
	) -> Result<PlaceOrderResponse, ClientError> {
		self.runtime.block_on(self.inner.place_order(request))
	}

	pub fn cancel_order(
		&self,
		request: CancelOrderRequest,
	) -> Result<CancelOrderResponse, ClientError> {
		self.runtime.block_on(self.inner.cancel_order(request))
	}
}
