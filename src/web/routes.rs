use std::sync::Arc;

use salvo::affix_state;
use salvo::prelude::*;

use crate::web::AppState;
use crate::web::handlers::{
    admin, analytics, appeals, content, health, membership, pathways, quiz, stats,
};
use crate::web::metrics::metrics_endpoint;
use crate::web::middleware::auth::require_admin;
use crate::web::middleware::rate_limit::RateLimitHoop;

fn admin_router() -> Router {
    Router::with_path("admin")
        .hoop(require_admin)
        .push(Router::with_path("appeals").get(admin::list_appeals))
        .push(Router::with_path("appeals/{id}").patch(admin::update_appeal))
        .push(Router::with_path("moderation").post(admin::moderate))
        .push(Router::with_path("mod-logs").get(admin::list_mod_logs))
        .push(Router::with_path("admin-logs").get(admin::list_admin_logs))
        .push(Router::with_path("members/{id}/stats").put(admin::update_member_stats))
        .push(Router::with_path("analytics").get(analytics::analytics_summary))
        .push(Router::with_path("content/{key}").put(content::put_content))
        .push(Router::with_path("events").post(content::create_event))
        .push(Router::with_path("events/{id}").delete(content::delete_event))
}

fn api_router(state: &AppState) -> Router {
    Router::with_path("api")
        .hoop(RateLimitHoop::new(state.limiter.clone()))
        .push(Router::with_path("appeals").post(appeals::submit_appeal))
        .push(Router::with_path("complaints").post(appeals::submit_complaint))
        .push(
            Router::with_path("discord")
                .push(Router::with_path("verify-membership").post(membership::verify_membership))
                .push(Router::with_path("members/{id}").get(membership::member_profile))
                .push(Router::with_path("guild").get(membership::guild_summary)),
        )
        .push(
            Router::with_path("pathways").get(pathways::list_pathways).push(
                Router::new()
                    .hoop(require_admin)
                    .push(Router::with_path("join").post(pathways::join_pathway))
                    .push(Router::with_path("leave").post(pathways::leave_pathway)),
            ),
        )
        .push(
            Router::with_path("quiz")
                .get(quiz::get_quiz)
                .post(quiz::submit_quiz),
        )
        .push(Router::with_path("analytics").post(analytics::record_event))
        .push(
            Router::with_path("content")
                .get(content::list_content)
                .push(Router::with_path("{key}").get(content::get_content)),
        )
        .push(Router::with_path("events").get(content::list_events))
        .push(Router::with_path("stats/leaderboard").get(stats::leaderboard))
        .push(Router::with_path("badges").get(stats::list_badges))
        .push(admin_router())
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = api_router(&state);
    Router::new()
        .hoop(affix_state::inject(state))
        .push(Router::with_path("health").get(health::health_check))
        .push(Router::with_path("status").get(health::get_status))
        .push(Router::with_path("metrics").get(metrics_endpoint))
        .push(api)
}
