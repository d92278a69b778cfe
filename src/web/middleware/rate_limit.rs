use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use salvo::http::Method;
use salvo::http::header::HeaderValue;
use salvo::prelude::*;
use salvo::writing::Scribe;
use tracing::debug;

use crate::rate_limit::{FixedWindowLimiter, RateDecision};
use crate::web::ApiError;
use crate::web::metrics::Metrics;

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_key(req: &Request) -> String {
    let header_ip = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .and_then(|value| value.parse::<IpAddr>().ok())
    };

    if let Some(ip) = header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip")) {
        return ip.to_string();
    }

    let remote = req.remote_addr();
    if let Some(addr) = remote.as_ipv4() {
        return addr.ip().to_string();
    }
    if let Some(addr) = remote.as_ipv6() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

/// Applies the fixed-window limiter to POST requests under the route it wraps.
pub struct RateLimitHoop {
    limiter: Arc<FixedWindowLimiter>,
}

impl RateLimitHoop {
    pub fn new(limiter: Arc<FixedWindowLimiter>) -> Self {
        Self { limiter }
    }
}

#[handler]
impl RateLimitHoop {
    async fn handle(&self, req: &mut Request, res: &mut Response, ctrl: &mut FlowCtrl) {
        if req.method() != Method::POST {
            return;
        }

        let key = client_key(req);
        match self.limiter.check(&key, Instant::now()) {
            RateDecision::Allowed { remaining } => {
                res.headers_mut()
                    .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            }
            RateDecision::Limited { retry_after } => {
                Metrics::rate_limited();
                debug!(client = %key, "rate limited");
                let retry_after = (retry_after.as_millis().div_ceil(1000) as u64).max(1);
                ApiError::TooManyRequests {
                    message: "too many requests, slow down".to_string(),
                    retry_after,
                }
                .render(res);
                ctrl.skip_rest();
            }
        }
    }
}
