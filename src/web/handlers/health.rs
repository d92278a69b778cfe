use salvo::prelude::*;
use serde_json::{Value, json};

use crate::web::metrics::Metrics;
use crate::web::{ApiError, app_state};

#[handler]
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[handler]
pub async fn get_status(depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;

    let database_reachable = match state.db.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("database ping failed: {err}");
            false
        }
    };

    Ok(Json(json!({
        "status": if database_reachable { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "processUptimeSeconds": Metrics::uptime_secs(),
        "database": {
            "backend": state.db.db_type().as_str(),
            "reachable": database_reachable,
        },
        "discordConfigured": state.directory.is_configured(),
    })))
}
