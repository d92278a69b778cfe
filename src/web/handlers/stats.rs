use salvo::prelude::*;
use serde_json::{Value, json};

use crate::community::badges::all_badges;
use crate::web::{ApiError, app_state};

#[handler]
pub async fn leaderboard(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let limit = req.query::<i64>("limit").unwrap_or(10).clamp(1, 100);
    let entries = state.db.member_stats_store().leaderboard(limit).await?;

    let ranked: Vec<Value> = entries
        .iter()
        .enumerate()
        .map(|(index, stats)| json!({ "rank": index + 1, "stats": stats }))
        .collect();

    Ok(Json(json!({ "leaderboard": ranked })))
}

#[handler]
pub async fn list_badges() -> Json<Value> {
    Json(json!({ "badges": all_badges() }))
}
