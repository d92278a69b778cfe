use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::community::PATHWAYS;
use crate::community::roles::pathway_by_slug;
use crate::discord::parse_snowflake;
use crate::web::handlers::actor_or_default;
use crate::web::{ApiError, AppState, app_state};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathwayChange {
    discord_id: String,
    pathway: String,
    #[serde(default)]
    actor: Option<String>,
}

#[handler]
pub async fn list_pathways(depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let pathways: Vec<Value> = PATHWAYS
        .iter()
        .map(|pathway| {
            json!({
                "pathway": pathway,
                "joinable": state.roles.pathway_role_id(pathway.slug).is_some(),
            })
        })
        .collect();
    Ok(Json(json!({ "pathways": pathways })))
}

/// Resolves the request to `(discord_id, slug, role_id)` and the member's current roles.
async fn prepare(
    state: &AppState,
    change: &PathwayChange,
) -> Result<(String, &'static str, u64, Vec<u64>), ApiError> {
    let discord_id = parse_snowflake(&change.discord_id)?.to_string();
    let pathway = pathway_by_slug(change.pathway.trim())
        .ok_or_else(|| ApiError::not_found(format!("unknown pathway '{}'", change.pathway)))?;
    let role_id = state.roles.pathway_role_id(pathway.slug).ok_or_else(|| {
        ApiError::Unavailable(format!("pathway '{}' has no role configured", pathway.slug))
    })?;

    let member = state
        .directory
        .get_member(&discord_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("join the Discord server first".into()))?;

    Ok((discord_id, pathway.slug, role_id, member.roles))
}

#[handler]
pub async fn join_pathway(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let change: PathwayChange = req.parse_json().await?;
    let (discord_id, slug, role_id, roles) = prepare(&state, &change).await?;

    if roles.contains(&role_id) {
        return Err(ApiError::Conflict(format!("already in the {slug} pathway")));
    }

    state
        .directory
        .add_role(&discord_id, role_id, &format!("joined the {slug} pathway"))
        .await?;
    info!(discord_id = %discord_id, pathway = slug, "pathway joined");

    let actor = actor_or_default(change.actor.as_deref());
    state
        .audit(
            &actor,
            "pathway.join",
            json!({ "discordId": discord_id, "pathway": slug }),
        )
        .await;

    Ok(Json(json!({ "success": true, "pathway": slug, "joined": true })))
}

#[handler]
pub async fn leave_pathway(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let change: PathwayChange = req.parse_json().await?;
    let (discord_id, slug, role_id, roles) = prepare(&state, &change).await?;

    if !roles.contains(&role_id) {
        return Err(ApiError::Conflict(format!("not in the {slug} pathway")));
    }

    state
        .directory
        .remove_role(&discord_id, role_id, &format!("left the {slug} pathway"))
        .await?;
    info!(discord_id = %discord_id, pathway = slug, "pathway left");

    let actor = actor_or_default(change.actor.as_deref());
    state
        .audit(
            &actor,
            "pathway.leave",
            json!({ "discordId": discord_id, "pathway": slug }),
        )
        .await;

    Ok(Json(json!({ "success": true, "pathway": slug, "joined": false })))
}
