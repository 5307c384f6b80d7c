//! Caller identity extraction.
//!
//! Authentication itself happens upstream: an identity-aware gateway
//! resolves the session and forwards the numeric user id in the
//! `X-User-Id` header. This module only reads that header; role checks
//! (moderator, assigned voter) are evaluated against meeting rows by the
//! model layer.

use actix_web::HttpRequest;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Numeric id of the calling user, as asserted by the upstream identity layer.
pub fn caller_id(req: &HttpRequest) -> Result<i64, AppError> {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::Identity(format!("missing or invalid {USER_ID_HEADER} header")))
}
