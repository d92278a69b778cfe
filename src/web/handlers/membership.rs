use chrono::Utc;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use serenity::all::Permissions;
use tracing::debug;

use crate::community::badges_for;
use crate::discord::{GuildMember, has_permission, parse_snowflake, permission_names};
use crate::web::metrics::Metrics;
use crate::web::{ApiError, AppState, app_state};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyMembershipRequest {
    discord_id: String,
}

/// A configured staff role settles it without asking Discord for the
/// guild's roles.
async fn is_staff(state: &AppState, member: &GuildMember) -> Result<bool, ApiError> {
    if state.roles.is_staff(&member.roles) {
        return Ok(true);
    }
    let permissions = state.directory.member_permissions(member).await?;
    Ok(has_permission(permissions, Permissions::BAN_MEMBERS))
}

#[handler]
pub async fn verify_membership(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let body: VerifyMembershipRequest = req.parse_json().await?;
    parse_snowflake(&body.discord_id)?;

    Metrics::membership_checked();
    let member = state.directory.get_member(body.discord_id.trim()).await?;

    let Some(member) = member else {
        debug!(discord_id = %body.discord_id, "not a guild member");
        return Ok(Json(json!({
            "isMember": false,
            "tier": null,
            "pathways": [],
            "isStaff": false,
        })));
    };

    let is_staff = is_staff(&state, &member).await?;
    state
        .track(
            "membership_verified",
            json!({ "pathways": state.roles.get_pathway_roles(&member.roles).len() }),
            Utc::now(),
        )
        .await;

    Ok(Json(json!({
        "isMember": true,
        "username": member.display_name(),
        "tier": state.roles.get_member_tier(&member.roles),
        "pathways": state.roles.get_pathway_roles(&member.roles),
        "isStaff": is_staff,
    })))
}

#[handler]
pub async fn member_profile(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let discord_id = req
        .param::<String>("id")
        .ok_or_else(|| ApiError::bad_request("missing member id"))?;
    parse_snowflake(&discord_id)?;

    let member = state
        .directory
        .get_member(&discord_id)
        .await?
        .ok_or_else(|| ApiError::not_found("not a member of the guild"))?;

    let stats = state
        .db
        .member_stats_store()
        .get_stats(&member.user_id)
        .await?;
    let badges = badges_for(stats.as_ref(), &member.roles, &state.roles);
    let permissions = state.directory.member_permissions(&member).await?;
    let is_staff = state.roles.is_staff(&member.roles)
        || has_permission(permissions, Permissions::BAN_MEMBERS);

    Ok(Json(json!({
        "member": &member,
        "displayName": member.display_name(),
        "tier": state.roles.get_member_tier(&member.roles),
        "pathways": state.roles.get_pathway_roles(&member.roles),
        "isStaff": is_staff,
        "permissions": permission_names(permissions),
        "stats": stats,
        "badges": badges,
    })))
}

#[handler]
pub async fn guild_summary(depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let summary = state.directory.guild_summary().await?;
    Ok(Json(json!({ "guild": summary })))
}
