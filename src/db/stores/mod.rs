use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::DatabaseError;
use super::models::{
    AdminLogEntry, AnalyticsEvent, Appeal, AppealStatus, CommunityEvent,
    ContentBlock, EventTypeCount, MemberStats, ModLogEntry, NewAppeal, NewCommunityEvent,
};

#[async_trait]
pub trait AppealStore: Send + Sync {
    async fn create_appeal(
        &self,
        appeal: &NewAppeal,
        now: DateTime<Utc>,
    ) -> Result<Appeal, DatabaseError>;
    async fn get_appeal(&self, id: i64) -> Result<Option<Appeal>, DatabaseError>;
    async fn list_appeals(
        &self,
        status: Option<AppealStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Appeal>, DatabaseError>;
    /// Most recent submission for `discord_id`, restricted to complaints or
    /// to every other kind depending on `complaints`.
    async fn latest_for_discord_id(
        &self,
        discord_id: &str,
        complaints: bool,
    ) -> Result<Option<Appeal>, DatabaseError>;
    /// Inserts `appeal` unless the same account already has a submission of
    /// the same family (complaint or not) created after `since`; that
    /// submission is returned as `Err` instead. The check and the insert run
    /// in one transaction. Anonymous submissions are always inserted.
    async fn create_unless_recent(
        &self,
        appeal: &NewAppeal,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Result<Appeal, Appeal>, DatabaseError>;
    async fn update_appeal_status(
        &self,
        id: i64,
        status: AppealStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Appeal>, DatabaseError>;
}

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn record_event(
        &self,
        event_type: &str,
        metadata: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
    async fn count_by_type(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventTypeCount>, DatabaseError>;
    async fn recent_events(&self, limit: i64) -> Result<Vec<AnalyticsEvent>, DatabaseError>;
}

#[async_trait]
pub trait MemberStatsStore: Send + Sync {
    async fn upsert_stats(&self, stats: &MemberStats) -> Result<(), DatabaseError>;
    async fn get_stats(&self, user_id: &str) -> Result<Option<MemberStats>, DatabaseError>;
    async fn leaderboard(&self, limit: i64) -> Result<Vec<MemberStats>, DatabaseError>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_content(&self, key: &str) -> Result<Option<ContentBlock>, DatabaseError>;
    async fn upsert_content(&self, block: &ContentBlock) -> Result<(), DatabaseError>;
    async fn list_content(&self) -> Result<Vec<ContentBlock>, DatabaseError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(
        &self,
        event: &NewCommunityEvent,
        now: DateTime<Utc>,
    ) -> Result<CommunityEvent, DatabaseError>;
    async fn upcoming_events(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<CommunityEvent>, DatabaseError>;
    async fn delete_event(&self, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn append_mod_log(
        &self,
        action: &str,
        target_id: &str,
        moderator: &str,
        reason: Option<&str>,
        duration_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<ModLogEntry, DatabaseError>;
    async fn list_mod_logs(&self, limit: i64, offset: i64)
    -> Result<Vec<ModLogEntry>, DatabaseError>;
    async fn append_admin_log(
        &self,
        actor: &str,
        action: &str,
        details: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
    async fn list_admin_logs(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AdminLogEntry>, DatabaseError>;
}
