use chrono::{DateTime, Duration, Utc};
use salvo::prelude::*;
use serde_json::{Value, json};
use tracing::info;

use crate::appeals::{
    AppealSubmission, ComplaintSubmission, cooldown_remaining, describe_wait, retry_after_secs,
};
use crate::db::{Appeal, AppealKind, NewAppeal};
use crate::web::metrics::Metrics;
use crate::web::{ApiError, AppState, app_state};

/// Inserts the submission unless the same account submitted one of the same
/// family within the cooldown. Complaints and appeals are tracked separately.
async fn create_with_cooldown(
    state: &AppState,
    submission: &NewAppeal,
    now: DateTime<Utc>,
) -> Result<Appeal, ApiError> {
    let cooldown_hours = state.config.appeals.cooldown_hours;
    let since = now - Duration::hours(cooldown_hours);

    match state
        .db
        .appeal_store()
        .create_unless_recent(submission, since, now)
        .await?
    {
        Ok(created) => Ok(created),
        Err(previous) => {
            let remaining = cooldown_remaining(Some(&previous), now, cooldown_hours)
                .unwrap_or_else(Duration::zero);
            let what = if previous.kind == AppealKind::Complaint {
                "complaint"
            } else {
                "appeal"
            };
            Err(ApiError::TooManyRequests {
                message: format!(
                    "you already submitted a {what} recently; try again in {}",
                    describe_wait(remaining)
                ),
                retry_after: retry_after_secs(remaining),
            })
        }
    }
}

fn accepted(appeal: &Appeal) -> Json<Value> {
    Json(json!({
        "success": true,
        "id": appeal.id,
        "status": appeal.status,
    }))
}

#[handler]
pub async fn submit_appeal(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let submission: AppealSubmission = req.parse_json().await?;
    let new_appeal = submission.validate(&state.config.appeals)?;

    let now = Utc::now();
    let appeal = create_with_cooldown(&state, &new_appeal, now).await?;
    Metrics::appeal_submitted();
    info!(appeal_id = appeal.id, kind = %appeal.kind, "appeal submitted");

    let notifier = state.notifier.clone();
    let notified = appeal.clone();
    tokio::spawn(async move { notifier.notify_appeal(&notified).await });

    state
        .track(
            "appeal_submitted",
            json!({ "type": appeal.kind.as_str() }),
            now,
        )
        .await;

    res.status_code(StatusCode::CREATED);
    Ok(accepted(&appeal))
}

#[handler]
pub async fn submit_complaint(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let submission: ComplaintSubmission = req.parse_json().await?;
    let new_complaint = submission.validate(&state.config.appeals)?;

    let now = Utc::now();
    let complaint = create_with_cooldown(&state, &new_complaint, now).await?;
    Metrics::complaint_submitted();
    info!(
        complaint_id = complaint.id,
        anonymous = complaint.discord_id.is_none(),
        "complaint submitted"
    );

    let notifier = state.notifier.clone();
    let notified = complaint.clone();
    tokio::spawn(async move { notifier.notify_complaint(&notified).await });

    state
        .track(
            "complaint_submitted",
            json!({ "category": complaint.reason }),
            now,
        )
        .await;

    res.status_code(StatusCode::CREATED);
    Ok(accepted(&complaint))
}
