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

//! Header-trust authentication.
//!
//! The gateway sits behind an out-of-scope outer API gateway that has
//! already verified the caller's credentials and forwards the result as
//! `X-User-Id`/`X-User-Type` headers. This module only extracts and
//! validates the shape of those headers - it does not verify signatures
//! or tokens itself.

use actix_web::HttpRequest;
use thiserror::Error;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_TYPE_HEADER: &str = "X-User-Type";

#[derive(Debug, Error)]
pub enum AuthError {
	#[error("missing {0} header")]
	MissingHeader(&'static str),
	#[error("{0} header is not valid UTF-8")]
	InvalidHeaderEncoding(&'static str),
	#[error("user_id header is empty")]
	EmptyUserId,
}

/// The authenticated principal making the request, as asserted by the
/// outer gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
	pub user_id: String,
	pub user_type: String,
}

impl AuthContext {
	/// Extract the trusted identity headers from an inbound request.
	pub fn from_http(req: &HttpRequest) -> Result<Self, AuthError> {
		let user_id = header_str(req, USER_ID_HEADER)?;
		if user_id.is_empty() {
			return Err(AuthError::EmptyUserId);
		}
		let user_type = header_str(req, USER_TYPE_HEADER)?;

		Ok(Self {
			user_id: user_id.to_string(),
			user_type: user_type.to_string(),
		})
	}
}

fn header_str<'a>(req: &'a HttpRequest, name: &'static str) -> Result<&'a str, AuthError> {
	req.headers()
		.get(name)
		.ok_or(AuthError::MissingHeader(name))?
		.to_str()
		.map_err(|_| AuthError::InvalidHeaderEncoding(name))
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::test::TestRequest;

	#[test]
	fn extracts_both_headers() {
		let req = TestRequest::default()
			.insert_header((USER_ID_HEADER, "user-1"))
			.insert_header((USER_TYPE_HEADER, "retail"))
			.to_http_request();

		let ctx = AuthContext::from_http(&req).unwrap();
		assert_eq!(ctx.user_id, "user-1");
		assert_eq!(ctx.user_type, "retail");
	}

	#[test]
	fn missing_user_id_is_rejected() {
		let req = TestRequest::default()
			.insert_header((USER_TYPE_HEADER, "retail"))
			.to_http_request();

		assert!(matches!(
			AuthContext::from_http(&req),
			Err(AuthError::MissingHeader(USER_ID_HEADER))
		));
	}

	#[test]
	fn empty_user_id_is_rejected() {
		let req = TestRequest::default()
			.insert_header((USER_ID_HEADER, ""))
			.insert_header((USER_TYPE_HEADER, "retail"))
			.to_http_request();

		assert!(matches!(AuthContext::from_http(&req), Err(AuthError::EmptyUserId)));
	}
}
