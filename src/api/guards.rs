use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use crate::api::errors::ApiError;
use crate::core::metrics;
use crate::core::state::AppState;

pub(crate) const ACCESS_CODE_HEADER: &str = "x-access-code";

/// Proof that the request carried the configured access code.
///
/// Extracted from headers only, so handlers that take it before their body
/// extractor reject unauthenticated requests without reading the body.
pub(crate) struct AccessGranted;

#[async_trait]
impl FromRequestParts<AppState> for AccessGranted {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts.headers.get(ACCESS_CODE_HEADER).and_then(|value| value.to_str().ok());
        let expected = &state.settings().access().access_code;

        match presented {
            Some(code) if access_code_matches(code, expected) => Ok(AccessGranted),
            _ => {
                metrics::record_grade_request("unauthorized");
                tracing::warn!(header_present = presented.is_some(), "Rejected access code");
                Err(ApiError::Unauthorized("Invalid access code"))
            }
        }
    }
}

/// Compares fixed-length digests so the comparison time does not depend on
/// how much of the code matched.
fn access_code_matches(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented.iter().zip(expected.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}
