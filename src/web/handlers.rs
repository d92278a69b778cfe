use salvo::prelude::*;

pub mod admin;
pub mod analytics;
pub mod appeals;
pub mod content;
pub mod health;
pub mod membership;
pub mod pathways;
pub mod quiz;
pub mod stats;

#[cfg(test)]
mod tests;

const DEFAULT_ACTOR: &str = "admin";

/// `limit`/`offset` query parameters, clamped to sane bounds.
fn pagination(req: &Request, default_limit: i64, max_limit: i64) -> (i64, i64) {
    let limit = req
        .query::<i64>("limit")
        .unwrap_or(default_limit)
        .clamp(1, max_limit);
    let offset = req.query::<i64>("offset").unwrap_or(0).max(0);
    (limit, offset)
}

fn actor_or_default(actor: Option<&str>) -> String {
    actor
        .map(str::trim)
        .filter(|actor| !actor.is_empty())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string()
}
