//! axum middleware applying a [`RateLimiter`] to one route.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::SecondsFormat;
use serde_json::json;
use tracing::warn;

use super::identity::client_identifier;
use super::{RateLimitConfig, RateLimitDecision, RateLimiter};

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Limiter plus the budget of one route.
///
/// Buckets are keyed by `"{scope}:{client}"` so routes sharing a limiter
/// keep separate budgets.
#[derive(Clone)]
pub struct RouteLimit {
    pub limiter: Arc<RateLimiter>,
    pub config: RateLimitConfig,
    pub scope: &'static str,
}

impl RouteLimit {
    pub fn new(limiter: Arc<RateLimiter>, config: RateLimitConfig, scope: &'static str) -> Self {
        Self {
            limiter,
            config,
            scope,
        }
    }
}

/// Use with `axum::middleware::from_fn_with_state`.
///
/// Each route counts against its own bucket per client, so exhausting the
/// creation budget leaves completions untouched.
pub async fn enforce(State(route): State<RouteLimit>, request: Request, next: Next) -> Response {
    let client = client_identifier(request.headers());
    let key = format!("{}:{}", route.scope, client);
    let decision = route.limiter.check(&key, &route.config);

    if !decision.allowed {
        warn!(
            scope = route.scope,
            %client,
            limit = route.config.max,
            reset_at = %decision.reset_at,
            "rate limit exceeded"
        );
        return rejection_response(&route.config, &decision);
    }

    next.run(request).await
}

/// 429 with `X-RateLimit-*` headers.
pub fn rejection_response(config: &RateLimitConfig, decision: &RateLimitDecision) -> Response {
    let reset = decision
        .reset_at
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": RATE_LIMITED_MESSAGE })),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(config.max));
    headers.insert(REMAINING_HEADER, HeaderValue::from(0u32));
    if let Ok(value) = HeaderValue::from_str(&reset) {
        headers.insert(RESET_HEADER, value);
    }
    response
}
