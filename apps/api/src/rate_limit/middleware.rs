use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::CallerId;
use crate::errors::{AppError, RATE_LIMIT_REMAINING_HEADER};
use crate::rate_limit::{rate_limit_key, Decision, RateLimitPolicy, SlidingWindowLimiter};

#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<SlidingWindowLimiter>,
    pub policy: RateLimitPolicy,
}

/// Gate for rate-limited routes. Install with `route_layer` so the matched path is known.
///
/// Caller identity is the `x-user-id` header, then the peer address, then "anonymous".
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    matched_path: Option<MatchedPath>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let route = matched_path
        .as_ref()
        .map(MatchedPath::as_str)
        .unwrap_or_else(|| request.uri().path())
        .to_string();

    let (parts, body) = request.into_parts();
    let caller = CallerId::from_parts(&parts)
        .map(|c| c.0)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string());
    let request = Request::from_parts(parts, body);

    let key = rate_limit_key(&route, &caller);
    match rate_limit.limiter.check(&key, rate_limit.policy).await {
        Decision::Admitted { remaining } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
        Decision::FailOpen => next.run(request).await,
        Decision::Rejected {
            remaining,
            retry_after,
        } => AppError::RateLimited {
            remaining,
            retry_after_secs: retry_after.as_secs_f64().ceil() as u64,
        }
        .into_response(),
    }
}
