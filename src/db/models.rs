use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppealKind {
    Ban,
    Timeout,
    Warning,
    Complaint,
}

impl AppealKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppealKind::Ban => "ban",
            AppealKind::Timeout => "timeout",
            AppealKind::Warning => "warning",
            AppealKind::Complaint => "complaint",
        }
    }
}

impl FromStr for AppealKind {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ban" => Ok(AppealKind::Ban),
            "timeout" | "mute" => Ok(AppealKind::Timeout),
            "warning" => Ok(AppealKind::Warning),
            "complaint" => Ok(AppealKind::Complaint),
            other => Err(DatabaseError::Query(format!("unknown appeal kind '{other}'"))),
        }
    }
}

impl fmt::Display for AppealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    UnderReview,
    Approved,
    Denied,
}

impl AppealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppealStatus::Pending => "pending",
            AppealStatus::UnderReview => "under_review",
            AppealStatus::Approved => "approved",
            AppealStatus::Denied => "denied",
        }
    }
}

impl FromStr for AppealStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppealStatus::Pending),
            "under_review" => Ok(AppealStatus::UnderReview),
            "approved" => Ok(AppealStatus::Approved),
            "denied" => Ok(AppealStatus::Denied),
            other => Err(DatabaseError::Query(format!(
                "unknown appeal status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appeal {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: AppealKind,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub reason: String,
    pub appeal_text: String,
    pub contact_email: Option<String>,
    pub status: AppealStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppeal {
    pub kind: AppealKind,
    pub discord_id: Option<String>,
    pub discord_username: Option<String>,
    pub reason: String,
    pub appeal_text: String,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub user_id: String,
    pub xp: i64,
    pub level: i32,
    pub roles: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl MemberStats {
    pub fn level_for_xp(xp: i64) -> i32 {
        if xp <= 0 {
            return 0;
        }
        ((xp as f64) / 100.0).sqrt().floor() as i32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: i64,
    pub event_type: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub key: String,
    pub title: String,
    pub body: String,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEvent {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub pathway: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommunityEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pathway: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModLogEntry {
    pub id: i64,
    pub action: String,
    pub target_id: String,
    pub moderator: String,
    pub reason: Option<String>,
    pub duration_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogEntry {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn roles_to_json(roles: &[String]) -> String {
    serde_json::to_string(roles).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn roles_from_json(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub(crate) fn json_from_text(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

/// Busiest event types first, then alphabetical.
pub(crate) fn sort_counts(rows: Vec<(String, i64)>) -> Vec<EventTypeCount> {
    let mut counts: Vec<EventTypeCount> = rows
        .into_iter()
        .map(|(event_type, count)| EventTypeCount { event_type, count })
        .collect();
    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.event_type.cmp(&b.event_type))
    });
    counts
}
