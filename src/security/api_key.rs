//! Shared-secret API key verification.

use crate::error::ApiError;
use subtle::ConstantTimeEq;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Check `provided` against the configured secret in constant time.
pub fn verify_api_key(expected: &str, provided: Option<&str>) -> Result<(), ApiError> {
    let provided = match provided {
        Some(key) if !key.is_empty() => key,
        _ => return Err(ApiError::Unauthorized("missing API key")),
    };

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid API key"))
    }
}
