//! Static API-key check for the plan-state routes.

use crate::app::AppContext;
use crate::error::PlanwatchError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware requiring a valid `x-api-key` header.
///
/// Comparison is constant-time. An unconfigured key rejects every request
/// rather than letting the routes run open.
pub async fn require_api_key(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = ctx.config.api_key.as_ref() else {
        return PlanwatchError::unauthorized("API key is not configured").into_response();
    };

    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|provided| {
            bool::from(
                provided
                    .as_bytes()
                    .ct_eq(expected.expose_secret().as_bytes()),
            )
        })
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        PlanwatchError::unauthorized("Missing or invalid API key").into_response()
    }
}
