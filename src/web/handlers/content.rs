use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::community::roles::pathway_by_slug;
use crate::db::{ContentBlock, NewCommunityEvent};
use crate::web::handlers::actor_or_default;
use crate::web::{ApiError, app_state};

const MAX_EVENT_TITLE_CHARS: usize = 120;
const MAX_CONTENT_BODY_BYTES: usize = 64 * 1024;

static CONTENT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]{0,63}$").expect("content key pattern compiles"));

#[derive(Debug, Deserialize)]
struct ContentUpdate {
    title: String,
    body: String,
    #[serde(default)]
    actor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventCreate {
    #[serde(flatten)]
    event: NewCommunityEvent,
    #[serde(default)]
    actor: Option<String>,
}

fn content_key(req: &Request) -> Result<String, ApiError> {
    let key = req
        .param::<String>("key")
        .ok_or_else(|| ApiError::bad_request("missing content key"))?;
    if !CONTENT_KEY_RE.is_match(&key) {
        return Err(ApiError::bad_request(format!("invalid content key '{key}'")));
    }
    Ok(key)
}

fn check_event(event: &NewCommunityEvent) -> Result<(), ApiError> {
    let title_chars = event.title.trim().chars().count();
    if title_chars == 0 {
        return Err(ApiError::bad_request("title is required"));
    }
    if title_chars > MAX_EVENT_TITLE_CHARS {
        return Err(ApiError::bad_request(format!(
            "title must be at most {MAX_EVENT_TITLE_CHARS} characters"
        )));
    }
    if let Some(ends_at) = event.ends_at
        && ends_at < event.starts_at
    {
        return Err(ApiError::bad_request("event cannot end before it starts"));
    }
    if let Some(slug) = event.pathway.as_deref()
        && pathway_by_slug(slug).is_none()
    {
        return Err(ApiError::bad_request(format!("unknown pathway '{slug}'")));
    }
    Ok(())
}

#[handler]
pub async fn get_content(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let key = content_key(req)?;
    let block = state
        .db
        .content_store()
        .get_content(&key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no content for '{key}'")))?;
    Ok(Json(json!({ "content": block })))
}

#[handler]
pub async fn list_content(depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let blocks = state.db.content_store().list_content().await?;
    Ok(Json(json!({ "content": blocks })))
}

#[handler]
pub async fn put_content(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let key = content_key(req)?;
    let update: ContentUpdate = req.parse_json().await?;

    if update.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    if update.body.len() > MAX_CONTENT_BODY_BYTES {
        return Err(ApiError::bad_request("content body is too large"));
    }

    let actor = actor_or_default(update.actor.as_deref());
    let block = ContentBlock {
        key: key.clone(),
        title: update.title.trim().to_string(),
        body: update.body,
        updated_by: actor.clone(),
        updated_at: Utc::now(),
    };
    state.db.content_store().upsert_content(&block).await?;
    info!(key = %key, actor = %actor, "content updated");

    state
        .audit(&actor, "content.update", json!({ "key": key }))
        .await;

    Ok(Json(json!({ "content": block })))
}

#[handler]
pub async fn list_events(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let limit = req.query::<i64>("limit").unwrap_or(20).clamp(1, 100);
    let events = state
        .db
        .event_store()
        .upcoming_events(Utc::now(), limit)
        .await?;
    Ok(Json(json!({ "events": events })))
}

#[handler]
pub async fn create_event(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let EventCreate { mut event, actor }: EventCreate = req.parse_json().await?;
    check_event(&event)?;
    event.title = event.title.trim().to_string();

    let created = state.db.event_store().create_event(&event, Utc::now()).await?;
    info!(event_id = created.id, "community event created");

    let actor = actor_or_default(actor.as_deref());
    state
        .audit(
            &actor,
            "event.create",
            json!({ "id": created.id, "title": created.title }),
        )
        .await;

    res.status_code(StatusCode::CREATED);
    Ok(Json(json!({ "event": created })))
}

#[handler]
pub async fn delete_event(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let id = req
        .param::<i64>("id")
        .ok_or_else(|| ApiError::bad_request("event id must be a number"))?;

    if !state.db.event_store().delete_event(id).await? {
        return Err(ApiError::not_found(format!("event {id} not found")));
    }
    info!(event_id = id, "community event deleted");

    let actor = actor_or_default(req.query::<String>("actor").as_deref());
    state.audit(&actor, "event.delete", json!({ "id": id })).await;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn event(title: &str) -> NewCommunityEvent {
        NewCommunityEvent {
            title: title.into(),
            description: String::new(),
            pathway: None,
            starts_at: Utc::now(),
            ends_at: None,
            location: None,
        }
    }

    #[test]
    fn content_keys() {
        assert!(CONTENT_KEY_RE.is_match("about"));
        assert!(CONTENT_KEY_RE.is_match("rules.v2"));
        assert!(!CONTENT_KEY_RE.is_match("-about"));
        assert!(!CONTENT_KEY_RE.is_match("About"));
        assert!(!CONTENT_KEY_RE.is_match(""));
    }

    #[test]
    fn event_checks() {
        assert!(check_event(&event("Game night")).is_ok());
        assert!(check_event(&event("   ")).is_err());
        assert!(check_event(&event(&"x".repeat(121))).is_err());

        let mut backwards = event("Backwards");
        backwards.ends_at = Some(backwards.starts_at - Duration::hours(1));
        assert!(check_event(&backwards).is_err());

        let mut unknown = event("Unknown pathway");
        unknown.pathway = Some("cooking".into());
        assert!(check_event(&unknown).is_err());

        let mut gaming = event("Raid");
        gaming.pathway = Some("gaming".into());
        assert!(check_event(&gaming).is_ok());
    }
}
