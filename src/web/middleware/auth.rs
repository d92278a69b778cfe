use salvo::http::header::AUTHORIZATION;
use salvo::prelude::*;
use salvo::writing::Scribe;
use secrecy::ExposeSecret;
use tracing::warn;

use crate::web::{ApiError, app_state};

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Guards `/api/admin` and the pathway role endpoints with the shared staff token.
#[handler]
pub async fn require_admin(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let state = match app_state(depot) {
        Ok(state) => state,
        Err(err) => {
            err.render(res);
            ctrl.skip_rest();
            return;
        }
    };

    let expected = state.config.server.admin_token.expose_secret();
    let authorized = !expected.is_empty()
        && bearer_token(req).is_some_and(|given| tokens_match(given, expected));

    if !authorized {
        warn!(path = %req.uri().path(), "rejected admin request without a valid token");
        ApiError::Unauthorized.render(res);
        ctrl.skip_rest();
    }
}

#[cfg(test)]
mod tests {
    use super::tokens_match;

    #[test]
    fn token_comparison() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cret", "s3cres"));
        assert!(!tokens_match("s3c", "s3cret"));
        assert!(!tokens_match("", "s3cret"));
    }
}
