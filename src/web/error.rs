use salvo::http::ParseError;
use salvo::http::header::{HeaderValue, RETRY_AFTER};
use salvo::prelude::*;
use salvo::writing::Scribe;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::appeals::SubmissionError;
use crate::community::QuizError;
use crate::db::DatabaseError;
use crate::discord::DiscordError;
use crate::web::metrics::Metrics;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing or invalid admin token")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    TooManyRequests { message: String, retry_after: u64 },
    /// The detail is logged, never sent to the client.
    #[error("internal server error")]
    Internal(String),
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl Scribe for ApiError {
    fn render(self, res: &mut Response) {
        res.status_code(self.status_code());
        match &self {
            ApiError::TooManyRequests { message, retry_after } => {
                res.headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(*retry_after));
                res.render(Json(json!({
                    "error": message,
                    "retryAfter": retry_after,
                })));
            }
            ApiError::Internal(detail) => {
                error!("request failed: {detail}");
                res.render(Json(json!({ "error": self.to_string() })));
            }
            _ => res.render(Json(json!({ "error": self.to_string() }))),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<DiscordError> for ApiError {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::InvalidId(_) => ApiError::BadRequest(err.to_string()),
            DiscordError::NotFound => ApiError::NotFound("discord user or guild not found".into()),
            DiscordError::Forbidden(reason) => {
                warn!("discord refused request: {reason}");
                ApiError::Forbidden("the bot is not allowed to do that".into())
            }
            DiscordError::NotConfigured => {
                ApiError::Unavailable("discord integration is not configured".into())
            }
            DiscordError::Api(detail) => {
                Metrics::discord_error();
                warn!("discord api call failed: {detail}");
                ApiError::Unavailable("discord is unreachable right now".into())
            }
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        ApiError::BadRequest(format!("invalid request body: {err}"))
    }
}
