use std::str::FromStr;

use chrono::Utc;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::db::{AppealStatus, MemberStats};
use crate::discord::{MAX_TIMEOUT_MINUTES, parse_snowflake};
use crate::web::handlers::{actor_or_default, pagination};
use crate::web::metrics::Metrics;
use crate::web::{ApiError, AppState, app_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Ban,
    Unban,
    Timeout,
    Untimeout,
    Kick,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Ban => "ban",
            ModerationAction::Unban => "unban",
            ModerationAction::Timeout => "timeout",
            ModerationAction::Untimeout => "untimeout",
            ModerationAction::Kick => "kick",
        }
    }

    /// Actions that only make sense against someone currently in the guild.
    fn needs_membership(&self) -> bool {
        matches!(
            self,
            ModerationAction::Timeout | ModerationAction::Untimeout | ModerationAction::Kick
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModerationRequest {
    action: ModerationAction,
    discord_id: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    duration_minutes: Option<u32>,
    #[serde(default)]
    delete_message_days: Option<u8>,
    #[serde(default)]
    moderator: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
    #[serde(default)]
    actor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatsUpdate {
    xp: i64,
    #[serde(default)]
    level: Option<i32>,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    actor: Option<String>,
}

fn parse_status(raw: &str) -> Result<AppealStatus, ApiError> {
    AppealStatus::from_str(raw.trim()).map_err(|_| {
        ApiError::bad_request(format!(
            "status must be one of pending, under_review, approved, denied (got '{raw}')"
        ))
    })
}

/// Validates the duration for timeouts; every other action ignores it.
fn timeout_minutes(request: &ModerationRequest) -> Result<Option<u32>, ApiError> {
    if request.action != ModerationAction::Timeout {
        return Ok(None);
    }
    match request.duration_minutes {
        Some(minutes) if (1..=MAX_TIMEOUT_MINUTES).contains(&minutes) => Ok(Some(minutes)),
        _ => Err(ApiError::bad_request(format!(
            "durationMinutes must be between 1 and {MAX_TIMEOUT_MINUTES}"
        ))),
    }
}

#[handler]
pub async fn list_appeals(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let status = req
        .query::<String>("status")
        .map(|raw| parse_status(&raw))
        .transpose()?;
    let (limit, offset) = pagination(req, 50, 200);

    let appeals = state
        .db
        .appeal_store()
        .list_appeals(status, limit, offset)
        .await?;

    Ok(Json(json!({
        "appeals": appeals,
        "limit": limit,
        "offset": offset,
    })))
}

#[handler]
pub async fn update_appeal(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let id = req
        .param::<i64>("id")
        .ok_or_else(|| ApiError::bad_request("appeal id must be a number"))?;
    let update: StatusUpdate = req.parse_json().await?;
    let status = parse_status(&update.status)?;

    let store = state.db.appeal_store();
    let previous = store
        .get_appeal(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("appeal {id} not found")))?;
    let updated = store
        .update_appeal_status(id, status, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("appeal {id} not found")))?;

    let actor = actor_or_default(update.actor.as_deref());
    info!(appeal_id = id, from = %previous.status.as_str(), to = %status.as_str(), "appeal status changed");
    state
        .audit(
            &actor,
            "appeal.status",
            json!({
                "id": id,
                "from": previous.status,
                "to": updated.status,
            }),
        )
        .await;

    Ok(Json(json!({ "appeal": updated })))
}

async fn dispatch(
    state: &AppState,
    request: &ModerationRequest,
    discord_id: &str,
    minutes: Option<u32>,
    reason: &str,
) -> Result<(), ApiError> {
    let directory = &state.directory;
    match request.action {
        ModerationAction::Ban => {
            let days = request.delete_message_days.unwrap_or(0);
            directory.ban(discord_id, days, reason).await?
        }
        ModerationAction::Unban => directory.unban(discord_id).await?,
        ModerationAction::Timeout => {
            let minutes = minutes.ok_or_else(|| ApiError::bad_request("durationMinutes is required"))?;
            directory.timeout(discord_id, minutes, reason).await?
        }
        ModerationAction::Untimeout => directory.remove_timeout(discord_id).await?,
        ModerationAction::Kick => directory.kick(discord_id, reason).await?,
    }
    Ok(())
}

#[handler]
pub async fn moderate(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let request: ModerationRequest = req.parse_json().await?;
    let discord_id = parse_snowflake(&request.discord_id)?.to_string();
    let minutes = timeout_minutes(&request)?;

    if request.action.needs_membership()
        && !state.directory.check_guild_membership(&discord_id).await?
    {
        return Err(ApiError::not_found("that user is not in the guild"));
    }

    let moderator = actor_or_default(request.moderator.as_deref());
    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty());
    let audit_reason = reason.map_or_else(
        || format!("{} via the Conclave site", moderator),
        |reason| format!("{reason} ({moderator})"),
    );

    dispatch(&state, &request, &discord_id, minutes, &audit_reason).await?;
    Metrics::moderation_action();
    info!(
        action = request.action.as_str(),
        discord_id = %discord_id,
        moderator = %moderator,
        "moderation action applied"
    );

    let logged = state
        .db
        .audit_log_store()
        .append_mod_log(
            request.action.as_str(),
            &discord_id,
            &moderator,
            reason,
            minutes.map(|m| m as i32),
            Utc::now(),
        )
        .await;

    let entry = match logged {
        Ok(entry) => {
            let notifier = state.notifier.clone();
            let notified = entry.clone();
            tokio::spawn(async move { notifier.notify_moderation(&notified).await });
            Some(entry)
        }
        Err(err) => {
            warn!(discord_id = %discord_id, "failed to write mod log: {err}");
            None
        }
    };

    Ok(Json(json!({
        "success": true,
        "action": request.action.as_str(),
        "discordId": discord_id,
        "logEntry": entry,
    })))
}

#[handler]
pub async fn list_mod_logs(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let (limit, offset) = pagination(req, 50, 200);
    let entries = state
        .db
        .audit_log_store()
        .list_mod_logs(limit, offset)
        .await?;
    Ok(Json(json!({ "entries": entries, "limit": limit, "offset": offset })))
}

#[handler]
pub async fn list_admin_logs(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let (limit, offset) = pagination(req, 50, 200);
    let entries = state
        .db
        .audit_log_store()
        .list_admin_logs(limit, offset)
        .await?;
    Ok(Json(json!({ "entries": entries, "limit": limit, "offset": offset })))
}

#[handler]
pub async fn update_member_stats(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let user_id = req
        .param::<String>("id")
        .ok_or_else(|| ApiError::bad_request("missing member id"))?;
    let user_id = parse_snowflake(&user_id)?.to_string();
    let update: StatsUpdate = req.parse_json().await?;

    if update.xp < 0 {
        return Err(ApiError::bad_request("xp cannot be negative"));
    }
    if update.level.is_some_and(|level| level < 0) {
        return Err(ApiError::bad_request("level cannot be negative"));
    }

    let stats = MemberStats {
        user_id: user_id.clone(),
        xp: update.xp,
        level: update
            .level
            .unwrap_or_else(|| MemberStats::level_for_xp(update.xp)),
        roles: update.roles,
        updated_at: Utc::now(),
    };
    state.db.member_stats_store().upsert_stats(&stats).await?;

    let actor = actor_or_default(update.actor.as_deref());
    state
        .audit(
            &actor,
            "member.stats",
            json!({ "userId": user_id, "xp": stats.xp, "level": stats.level }),
        )
        .await;

    Ok(Json(json!({ "stats": stats })))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn request(action: ModerationAction, minutes: Option<u32>) -> ModerationRequest {
        ModerationRequest {
            action,
            discord_id: "123456789012345678".into(),
            reason: None,
            duration_minutes: minutes,
            delete_message_days: None,
            moderator: None,
        }
    }

    #[test_case(Some(1) => true ; "one minute")]
    #[test_case(Some(MAX_TIMEOUT_MINUTES) => true ; "four weeks")]
    #[test_case(Some(MAX_TIMEOUT_MINUTES + 1) => false ; "past the cap")]
    #[test_case(Some(0) => false ; "zero")]
    #[test_case(None => false ; "missing")]
    fn timeout_duration_bounds(minutes: Option<u32>) -> bool {
        timeout_minutes(&request(ModerationAction::Timeout, minutes)).is_ok()
    }

    #[test]
    fn duration_ignored_for_other_actions() {
        let kick = request(ModerationAction::Kick, Some(0));
        assert_eq!(timeout_minutes(&kick).unwrap(), None);
    }

    #[test]
    fn membership_required_only_for_present_members() {
        assert!(ModerationAction::Kick.needs_membership());
        assert!(ModerationAction::Timeout.needs_membership());
        assert!(!ModerationAction::Ban.needs_membership());
        assert!(!ModerationAction::Unban.needs_membership());
    }

    #[test]
    fn status_parsing() {
        assert_eq!(parse_status("under_review").unwrap(), AppealStatus::UnderReview);
        assert!(parse_status("closed").is_err());
    }
}
