use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::web::{ApiError, app_state};

const MAX_METADATA_BYTES: usize = 4096;
const MAX_SUMMARY_DAYS: i64 = 90;

static EVENT_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{1,63}$").expect("event type pattern compiles"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsRequest {
    event_type: String,
    #[serde(default)]
    metadata: Option<Value>,
}

fn check_metadata(metadata: Option<Value>) -> Result<Value, ApiError> {
    match metadata {
        None | Some(Value::Null) => Ok(json!({})),
        Some(value @ Value::Object(_)) => {
            if value.to_string().len() > MAX_METADATA_BYTES {
                return Err(ApiError::bad_request("metadata is too large"));
            }
            Ok(value)
        }
        Some(_) => Err(ApiError::bad_request("metadata must be a JSON object")),
    }
}

#[handler]
pub async fn record_event(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let body: AnalyticsRequest = req.parse_json().await?;

    if !EVENT_TYPE_RE.is_match(&body.event_type) {
        return Err(ApiError::bad_request(
            "eventType must be lowercase letters, digits or underscores",
        ));
    }
    let metadata = check_metadata(body.metadata)?;

    state
        .db
        .analytics_store()
        .record_event(&body.event_type, &metadata, Utc::now())
        .await?;

    res.status_code(StatusCode::ACCEPTED);
    Ok(Json(json!({ "accepted": true })))
}

#[handler]
pub async fn analytics_summary(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let days = req.query::<i64>("days").unwrap_or(7).clamp(1, MAX_SUMMARY_DAYS);
    let since = Utc::now() - Duration::days(days);

    let store = state.db.analytics_store();
    let counts = store.count_by_type(since).await?;
    let recent = store.recent_events(20).await?;
    let total: i64 = counts.iter().map(|c| c.count).sum();

    Ok(Json(json!({
        "days": days,
        "since": since,
        "total": total,
        "counts": counts,
        "recent": recent,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_pattern() {
        assert!(EVENT_TYPE_RE.is_match("page_view"));
        assert!(EVENT_TYPE_RE.is_match("quiz2"));
        assert!(!EVENT_TYPE_RE.is_match("a"));
        assert!(!EVENT_TYPE_RE.is_match("PageView"));
        assert!(!EVENT_TYPE_RE.is_match("2fast"));
        assert!(!EVENT_TYPE_RE.is_match("page-view"));
    }

    #[test]
    fn metadata_must_be_a_small_object() {
        assert_eq!(check_metadata(None).unwrap(), json!({}));
        assert!(check_metadata(Some(json!([1, 2]))).is_err());
        assert!(check_metadata(Some(json!({ "blob": "x".repeat(5000) }))).is_err());
        assert_eq!(
            check_metadata(Some(json!({ "path": "/" }))).unwrap()["path"],
            "/"
        );
    }
}
