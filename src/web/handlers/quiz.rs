use chrono::Utc;
use salvo::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::community::quiz::score;
use crate::community::{PATHWAYS, QUESTIONS};
use crate::web::{ApiError, app_state};

#[derive(Debug, Deserialize)]
struct QuizAnswers {
    answers: Vec<usize>,
}

#[handler]
pub async fn get_quiz() -> Json<Value> {
    Json(json!({
        "questions": &QUESTIONS,
        "pathways": &PATHWAYS,
    }))
}

#[handler]
pub async fn submit_quiz(req: &mut Request, depot: &mut Depot) -> Result<Json<Value>, ApiError> {
    let state = app_state(depot)?;
    let body: QuizAnswers = req.parse_json().await?;
    let result = score(&body.answers)?;

    state
        .track(
            "quiz_completed",
            json!({ "pathway": result.pathway.slug }),
            Utc::now(),
        )
        .await;

    Ok(Json(json!({ "result": result })))
}
