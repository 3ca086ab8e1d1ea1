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

//! HTTP handlers for the client-facing Intake API:
//! `POST /engine/placeStockOrder` and `POST /engine/cancelStockTransaction`.

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use core_sdk::types::{ApiResponse, CancelOrderRequest, PlaceOrderRequest, Side, StockTxId};
use std::fmt;
use thiserror::Error;
use tracing::field;
use uuid::Uuid;

use crate::{
	admission,
	admission::AdmissionError,
	auth::{AuthContext, AuthError},
	dispatcher::{CancelOrderOutcome, DispatcherError, PlaceOrderOutcome},
	request_context::RequestContext,
	server::GatewayState,
};

/// Error types for gateway operations
#[derive(Debug, Error)]
pub enum GatewayErrorKind {
	#[error("Authentication error: {0}")]
	Auth(AuthError),
	#[error("Admission error: {0}")]
	Admission(AdmissionError),
	#[error("Dispatching error: {0}")]
	Dispatching(DispatcherError),
	#[error("Internal error: {0}")]
	Internal(String),
}

#[derive(Debug)]
pub struct GatewayError {
	kind: GatewayErrorKind,
	request_id: String,
}

impl fmt::Display for GatewayError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.kind)
	}
}

impl GatewayError {
	fn auth(err: AuthError, ctx: &RequestContext) -> Self {
		Self {
			kind: GatewayErrorKind::Auth(err),
			request_id: ctx.request_id.clone(),
		}
	}

	fn admission(err: AdmissionError, ctx: &RequestContext) -> Self {
		Self {
			kind: GatewayErrorKind::Admission(err),
			request_id: ctx.request_id.clone(),
		}
	}

	fn dispatch(err: DispatcherError, ctx: &RequestContext) -> Self {
		Self {
			kind: GatewayErrorKind::Dispatching(err),
			request_id: ctx.request_id.clone(),
		}
	}
}

/// Maps each error kind onto the client-facing envelope with HTTP status
/// mirroring the semantic outcome.
impl actix_web::ResponseError for GatewayError {
	fn error_response(&self) -> HttpResponse {
		let (status, code, reason) = match &self.kind {
			GatewayErrorKind::Auth(e) => (
				actix_web::http::StatusCode::UNAUTHORIZED,
				"UNAUTHENTICATED",
				e.to_string(),
			),
			GatewayErrorKind::Admission(AdmissionError::RateLimitExceeded) => (
				actix_web::http::StatusCode::TOO_MANY_REQUESTS,
				"RATE_LIMITED",
				"Rate limit exceeded".to_string(),
			),
			GatewayErrorKind::Admission(AdmissionError::InvalidOrder(reason)) => (
				actix_web::http::StatusCode::BAD_REQUEST,
				"INVALID_INPUT",
				reason.clone(),
			),
			GatewayErrorKind::Admission(AdmissionError::InsufficientBalance) => (
				actix_web::http::StatusCode::BAD_REQUEST,
				"INSUFFICIENT_FUNDS",
				"Insufficient wallet balance".to_string(),
			),
			GatewayErrorKind::Admission(AdmissionError::InsufficientShares) => (
				actix_web::http::StatusCode::BAD_REQUEST,
				"INSUFFICIENT_SHARES",
				"Insufficient shares owned".to_string(),
			),
			GatewayErrorKind::Admission(AdmissionError::UpstreamUnavailable(reason)) => (
				actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
				"UPSTREAM_UNAVAILABLE",
				reason.clone(),
			),
			GatewayErrorKind::Dispatching(DispatcherError::GatewayOverloaded)
			| GatewayErrorKind::Dispatching(DispatcherError::QueueTimeout) => (
				actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
				"UPSTREAM_UNAVAILABLE",
				self.kind.to_string(),
			),
			GatewayErrorKind::Dispatching(DispatcherError::MatchingRejected(reason)) => (
				actix_web::http::StatusCode::BAD_REQUEST,
				"NO_LIQUIDITY",
				if reason.is_empty() {
					"Order rejected by matching engine".to_string()
				} else {
					reason.clone()
				},
			),
			GatewayErrorKind::Dispatching(DispatcherError::MatchingInternal(_))
			| GatewayErrorKind::Dispatching(DispatcherError::DispatchingError(_)) => (
				actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
				"UPSTREAM_UNAVAILABLE",
				self.kind.to_string(),
			),
			GatewayErrorKind::Internal(reason) => (
				actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
				"INTERNAL",
				reason.clone(),
			),
		};

		let body: ApiResponse<()> = ApiResponse::err(format!("[{code}] {reason} (request_id={})", self.request_id));
		HttpResponse::build(status).json(body)
	}
}

/// Health check endpoint
pub async fn health() -> impl Responder {
	HttpResponse::Ok().json(serde_json::json!({
		"status": "ok",
		"service": "core-gateway"
	}))
}

fn request_context(req: &HttpRequest) -> RequestContext {
	RequestContext::from_http(req).unwrap_or_else(|| RequestContext {
		request_id: Uuid::new_v4().to_string(),
		trace_id: Uuid::new_v4().to_string(),
		traceparent: None,
		tracestate: None,
	})
}

/// `POST /engine/placeStockOrder`.
///
/// Validates the request, performs the SELL-side share escrow or
/// optional BUY-side balance pre-check, and dispatches the order to the
/// matching engine, which inserts it IN_PROGRESS and publishes
/// `NEW_ORDER` before returning.
pub async fn place_order(
	state: web::Data<GatewayState>,
	request: web::Json<PlaceOrderRequest>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let context = request_context(&req);

	let auth = AuthContext::from_http(&req).map_err(|e| GatewayError::auth(e, &context))?;

	state
		.admission
		.check_rate_limit(&auth.user_id)
		.map_err(|e| GatewayError::admission(e, &context))?;

	admission::validate_place_order(&request).map_err(|e| GatewayError::admission(e, &context))?;

	let request = request.into_inner();
	let idempotency_key = StockTxId::new();
	let mut escrowed = false;

	if request.side == Side::Sell {
		admission::escrow_sell_shares(
			state.portfolio.as_ref(),
			idempotency_key,
			&auth.user_id,
			&request.stock_id,
			request.quantity,
		)
		.await
		.map_err(|e| GatewayError::admission(e, &context))?;
		escrowed = true;
	} else if let Some(required) = admission::required_buy_balance(&request) {
		admission::precheck_buy_balance(state.wallet.as_ref(), &auth.user_id, required)
			.await
			.map_err(|e| GatewayError::admission(e, &context))?;
	}

	let dispatch_result = state
		.dispatcher
		.dispatch_place(request.clone(), auth.user_id.clone(), context.clone())
		.await;

	match dispatch_result {
		Ok(PlaceOrderOutcome { response, timings }) => {
			tracing::Span::current().record("queue_wait_ms", field::display(timings.queue_wait_ms));
			tracing::Span::current().record("rpc_ms", field::display(timings.rpc_ms));
			Ok(HttpResponse::Ok().json(ApiResponse::ok(response)))
		}
		Err(err) => {
			if escrowed {
				// The order never made it into the book; release the
				// share escrow taken above.
				if let Err(release_err) = admission::release_sell_shares(
					state.portfolio.as_ref(),
					idempotency_key,
					&auth.user_id,
					&request.stock_id,
					request.quantity,
				)
				.await
				{
					tracing::error!(
						request_id = %context.request_id,
						error = %release_err,
						"failed to release sell escrow after a failed dispatch"
					);
				}
			}
			Err(GatewayError::dispatch(err, &context))
		}
	}
}

/// `POST /engine/cancelStockTransaction`. Honored only
/// for orders still resting in the book at the moment the matching
/// engine processes the event.
pub async fn cancel_order(
	state: web::Data<GatewayState>,
	request: web::Json<CancelOrderRequest>,
	req: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
	let context = request_context(&req);

	let auth = AuthContext::from_http(&req).map_err(|e| GatewayError::auth(e, &context))?;

	state
		.admission
		.check_rate_limit(&auth.user_id)
		.map_err(|e| GatewayError::admission(e, &context))?;

	let dispatch_result = state
		.dispatcher
		.dispatch_cancel(request.into_inner(), auth.user_id.clone(), context.clone())
		.await;

	match dispatch_result {
		Ok(CancelOrderOutcome { response, timings }) => {
			tracing::Span::current().record("queue_wait_ms", field::display(timings.queue_wait_ms));
			tracing::Span::current().record("rpc_ms", field::display(timings.rpc_ms));

			if response.side == Side::Sell && response.remaining_qty > 0 {
				// The cancelled resting quantity was never sold; give the
				// escrowed shares back.
				if let Err(release_err) = admission::release_sell_shares(
					state.portfolio.as_ref(),
					response.stock_tx_id,
					&auth.user_id,
					&response.stock_id,
					response.remaining_qty,
				)
				.await
				{
					tracing::error!(
						request_id = %context.request_id,
						error = %release_err,
						"failed to release sell escrow after cancellation"
					);
				}
			}

			Ok(HttpResponse::Ok().json(ApiResponse::ok(response)))
		}
		Err(err) => Err(GatewayError::dispatch(err, &context)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::ResponseError;
	use actix_web::body::to_bytes;
	use actix_web::http::StatusCode;
	use serde_json::Value;

	fn ctx() -> RequestContext {
		RequestContext {
			request_id: "req-test".to_string(),
			trace_id: "trace-test".to_string(),
			traceparent: None,
			tracestate: None,
		}
	}

	#[actix_rt::test]
	async fn insufficient_shares_maps_to_400() {
		let err = GatewayError::admission(AdmissionError::InsufficientShares, &ctx());
		let resp = err.error_response();
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
		let body = to_bytes(resp.into_body()).await.unwrap();
		let json: Value = serde_json::from_slice(&body).unwrap();
		assert_eq!(json["success"], false);
		assert!(json["message"].as_str().unwrap().contains("INSUFFICIENT_SHARES"));
	}

	#[actix_rt::test]
	async fn no_liquidity_rejection_maps_to_400() {
		let err = GatewayError::dispatch(DispatcherError::MatchingRejected("NO_LIQUIDITY".to_string()), &ctx());
		let resp = err.error_response();
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
		let body = to_bytes(resp.into_body()).await.unwrap();
		let json: Value = serde_json::from_slice(&body).unwrap();
		assert!(json["message"].as_str().unwrap().contains("NO_LIQUIDITY"));
	}

	#[actix_rt::test]
	async fn gateway_overload_is_retryable_service_unavailable() {
		let err = GatewayError::dispatch(DispatcherError::GatewayOverloaded, &ctx());
		let resp = err.error_response();
		assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
	}

	#[actix_rt::test]
	async fn rate_limit_maps_to_429() {
		let err = GatewayError::admission(AdmissionError::RateLimitExceeded, &ctx());
		let resp = err.error_response();
		assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
	}
}
