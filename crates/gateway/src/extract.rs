//! Caller identity extraction
//!
//! Every operation takes an explicit user id; the gateway reads it from the
//! `x-user-id` header. Authentication itself happens upstream, this layer
//! only refuses requests that arrive with no usable identity.

use axum::{extract::FromRequestParts, http::request::Parts};
use recipeguard_common::errors::{AppError, Result};
use uuid::Uuid;

/// The authenticated caller, available to every handler
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing or invalid X-User-ID header".to_string(),
            })?;

        Ok(Caller { user_id })
    }
}
