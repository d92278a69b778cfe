use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::dsl::count_star;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;
use serde_json::Value;

use crate::db::schema_sqlite::{
    admin_logs, analytics, appeals, content, events, member_stats, mod_logs,
};

use super::models::{
    AdminLogEntry, AnalyticsEvent, Appeal, AppealKind, AppealStatus, CommunityEvent, ContentBlock,
    EventTypeCount, MemberStats, ModLogEntry, NewAppeal, NewCommunityEvent, json_from_text,
    roles_from_json, roles_to_json, sort_counts,
};
use super::stores::{
    AnalyticsStore, AppealStore, AuditLogStore, ContentStore, EventStore, MemberStatsStore,
};
use super::DatabaseError;

// Fixed-width UTC text so lexical order matches chronological order.
pub(crate) fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = appeals)]
struct DbAppeal {
    id: i64,
    kind: String,
    discord_id: Option<String>,
    discord_username: Option<String>,
    reason: String,
    appeal_text: String,
    contact_email: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl DbAppeal {
    fn to_appeal(&self) -> Result<Appeal, DatabaseError> {
        Ok(Appeal {
            id: self.id,
            kind: self.kind.parse()?,
            discord_id: self.discord_id.clone(),
            discord_username: self.discord_username.clone(),
            reason: self.reason.clone(),
            appeal_text: self.appeal_text.clone(),
            contact_email: self.contact_email.clone(),
            status: self.status.parse()?,
            created_at: string_to_datetime(&self.created_at)?,
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = appeals)]
struct NewDbAppeal<'a> {
    kind: &'a str,
    discord_id: Option<&'a str>,
    discord_username: Option<&'a str>,
    reason: &'a str,
    appeal_text: &'a str,
    contact_email: Option<&'a str>,
    status: &'a str,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = analytics)]
struct DbAnalyticsEvent {
    id: i64,
    event_type: String,
    metadata: String,
    created_at: String,
}

impl DbAnalyticsEvent {
    fn to_event(&self) -> Result<AnalyticsEvent, DatabaseError> {
        Ok(AnalyticsEvent {
            id: self.id,
            event_type: self.event_type.clone(),
            metadata: json_from_text(&self.metadata),
            created_at: string_to_datetime(&self.created_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = analytics)]
struct NewDbAnalyticsEvent<'a> {
    event_type: &'a str,
    metadata: String,
    created_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = member_stats)]
struct DbMemberStats {
    user_id: String,
    xp: i64,
    level: i32,
    roles: String,
    updated_at: String,
}

impl DbMemberStats {
    fn to_stats(&self) -> Result<MemberStats, DatabaseError> {
        Ok(MemberStats {
            user_id: self.user_id.clone(),
            xp: self.xp,
            level: self.level,
            roles: roles_from_json(&self.roles),
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = member_stats)]
struct UpsertMemberStats<'a> {
    user_id: &'a str,
    xp: i64,
    level: i32,
    roles: String,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = content)]
struct DbContentBlock {
    content_key: String,
    title: String,
    body: String,
    updated_by: String,
    updated_at: String,
}

impl DbContentBlock {
    fn to_block(&self) -> Result<ContentBlock, DatabaseError> {
        Ok(ContentBlock {
            key: self.content_key.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            updated_by: self.updated_by.clone(),
            updated_at: string_to_datetime(&self.updated_at)?,
        })
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = content)]
struct UpsertContentBlock<'a> {
    content_key: &'a str,
    title: &'a str,
    body: &'a str,
    updated_by: &'a str,
    updated_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
struct DbCommunityEvent {
    id: i64,
    title: String,
    description: String,
    pathway: Option<String>,
    starts_at: String,
    ends_at: Option<String>,
    location: Option<String>,
    created_at: String,
}

impl DbCommunityEvent {
    fn to_event(&self) -> Result<CommunityEvent, DatabaseError> {
        Ok(CommunityEvent {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            pathway: self.pathway.clone(),
            starts_at: string_to_datetime(&self.starts_at)?,
            ends_at: self.ends_at.as_deref().map(string_to_datetime).transpose()?,
            location: self.location.clone(),
            created_at: string_to_datetime(&self.created_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewDbCommunityEvent<'a> {
    title: &'a str,
    description: &'a str,
    pathway: Option<&'a str>,
    starts_at: String,
    ends_at: Option<String>,
    location: Option<&'a str>,
    created_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mod_logs)]
struct DbModLogEntry {
    id: i64,
    action: String,
    target_id: String,
    moderator: String,
    reason: Option<String>,
    duration_minutes: Option<i32>,
    created_at: String,
}

impl DbModLogEntry {
    fn to_entry(&self) -> Result<ModLogEntry, DatabaseError> {
        Ok(ModLogEntry {
            id: self.id,
            action: self.action.clone(),
            target_id: self.target_id.clone(),
            moderator: self.moderator.clone(),
            reason: self.reason.clone(),
            duration_minutes: self.duration_minutes,
            created_at: string_to_datetime(&self.created_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = mod_logs)]
struct NewDbModLogEntry<'a> {
    action: &'a str,
    target_id: &'a str,
    moderator: &'a str,
    reason: Option<&'a str>,
    duration_minutes: Option<i32>,
    created_at: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = admin_logs)]
struct DbAdminLogEntry {
    id: i64,
    actor: String,
    action: String,
    details: String,
    created_at: String,
}

impl DbAdminLogEntry {
    fn to_entry(&self) -> Result<AdminLogEntry, DatabaseError> {
        Ok(AdminLogEntry {
            id: self.id,
            actor: self.actor.clone(),
            action: self.action.clone(),
            details: json_from_text(&self.details),
            created_at: string_to_datetime(&self.created_at)?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = admin_logs)]
struct NewDbAdminLogEntry<'a> {
    actor: &'a str,
    action: &'a str,
    details: String,
    created_at: String,
}

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

fn last_insert_rowid(conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
    diesel::sql_query("SELECT last_insert_rowid() AS id")
        .get_result::<LastInsertRowId>(conn)
        .map(|row| row.id)
        .map_err(query_error)
}

fn query_error(e: diesel::result::Error) -> DatabaseError {
    DatabaseError::Query(e.to_string())
}

/// Every connection waits on the write lock instead of failing with
/// `SQLITE_BUSY`, and WAL lets readers proceed during a write.
const CONNECTION_PRAGMAS: &str = "PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;";

pub(crate) fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    let mut conn =
        SqliteConnection::establish(path).map_err(|e| DatabaseError::Connection(e.to_string()))?;
    conn.batch_execute(CONNECTION_PRAGMAS)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
    Ok(conn)
}

async fn with_connection<T, F>(db_path: Arc<String>, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut SqliteConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = establish_connection(&db_path)?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

fn insert_appeal(
    conn: &mut SqliteConnection,
    appeal: &NewAppeal,
    now: DateTime<Utc>,
) -> Result<Appeal, DatabaseError> {
    let row = NewDbAppeal {
        kind: appeal.kind.as_str(),
        discord_id: appeal.discord_id.as_deref(),
        discord_username: appeal.discord_username.as_deref(),
        reason: &appeal.reason,
        appeal_text: &appeal.appeal_text,
        contact_email: appeal.contact_email.as_deref(),
        status: AppealStatus::Pending.as_str(),
        created_at: datetime_to_string(&now),
        updated_at: datetime_to_string(&now),
    };

    diesel::insert_into(appeals::table)
        .values(&row)
        .execute(conn)
        .map_err(query_error)?;
    let appeal_id = last_insert_rowid(conn)?;
    load_appeal(conn, appeal_id)?
        .ok_or_else(|| DatabaseError::NotFound(format!("appeal {appeal_id}")))
}

fn latest_appeal(
    conn: &mut SqliteConnection,
    user_id: &str,
    complaints: bool,
) -> Result<Option<Appeal>, DatabaseError> {
    let mut query = appeals::table
        .filter(appeals::discord_id.eq(user_id))
        .into_boxed();
    query = if complaints {
        query.filter(appeals::kind.eq(AppealKind::Complaint.as_str()))
    } else {
        query.filter(appeals::kind.ne(AppealKind::Complaint.as_str()))
    };

    query
        .order(appeals::created_at.desc())
        .select(DbAppeal::as_select())
        .first::<DbAppeal>(conn)
        .optional()
        .map_err(query_error)?
        .map(|row| row.to_appeal())
        .transpose()
}

fn load_appeal(conn: &mut SqliteConnection, appeal_id: i64) -> Result<Option<Appeal>, DatabaseError> {
    appeals::table
        .find(appeal_id)
        .select(DbAppeal::as_select())
        .first::<DbAppeal>(conn)
        .optional()
        .map_err(query_error)?
        .map(|row| row.to_appeal())
        .transpose()
}

pub struct SqliteStore {
    db_path: Arc<String>,
}

impl SqliteStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl AppealStore for SqliteStore {
    async fn create_appeal(
        &self,
        appeal: &NewAppeal,
        now: DateTime<Utc>,
    ) -> Result<Appeal, DatabaseError> {
        let appeal = appeal.clone();
        with_connection(self.db_path.clone(), move |conn| insert_appeal(conn, &appeal, now)).await
    }

    async fn get_appeal(&self, appeal_id: i64) -> Result<Option<Appeal>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| load_appeal(conn, appeal_id)).await
    }

    async fn list_appeals(
        &self,
        status: Option<AppealStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Appeal>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            let mut query = appeals::table.into_boxed();
            if let Some(status) = status {
                query = query.filter(appeals::status.eq(status.as_str()));
            }

            query
                .order(appeals::id.desc())
                .limit(limit)
                .offset(offset)
                .select(DbAppeal::as_select())
                .load::<DbAppeal>(conn)
                .map_err(query_error)?
                .iter()
                .map(DbAppeal::to_appeal)
                .collect()
        })
        .await
    }

    async fn latest_for_discord_id(
        &self,
        user_id: &str,
        complaints: bool,
    ) -> Result<Option<Appeal>, DatabaseError> {
        let user_id = user_id.to_string();
        with_connection(self.db_path.clone(), move |conn| {
            latest_appeal(conn, &user_id, complaints)
        })
        .await
    }

    async fn create_unless_recent(
        &self,
        appeal: &NewAppeal,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Result<Appeal, Appeal>, DatabaseError> {
        let appeal = appeal.clone();
        with_connection(self.db_path.clone(), move |conn| {
            // IMMEDIATE takes the write lock before the read, so two writers
            // for the same account cannot both see an empty history.
            conn.immediate_transaction(|conn| {
                if let Some(user_id) = appeal.discord_id.as_deref() {
                    let complaints = appeal.kind == AppealKind::Complaint;
                    if let Some(previous) = latest_appeal(conn, user_id, complaints)?
                        && previous.created_at > since
                    {
                        return Ok(Err(previous));
                    }
                }
                insert_appeal(conn, &appeal, now).map(Ok)
            })
        })
        .await
    }

    async fn update_appeal_status(
        &self,
        appeal_id: i64,
        new_status: AppealStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Appeal>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            let updated = diesel::update(appeals::table.find(appeal_id))
                .set((
                    appeals::status.eq(new_status.as_str()),
                    appeals::updated_at.eq(datetime_to_string(&now)),
                ))
                .execute(conn)
                .map_err(query_error)?;
            if updated == 0 {
                return Ok(None);
            }
            load_appeal(conn, appeal_id)
        })
        .await
    }
}

#[async_trait]
impl AnalyticsStore for SqliteStore {
    async fn record_event(
        &self,
        event_type: &str,
        metadata: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let event_type = event_type.to_string();
        let metadata = metadata.to_string();
        with_connection(self.db_path.clone(), move |conn| {
            diesel::insert_into(analytics::table)
                .values(NewDbAnalyticsEvent {
                    event_type: &event_type,
                    metadata,
                    created_at: datetime_to_string(&now),
                })
                .execute(conn)
                .map(|_| ())
                .map_err(query_error)
        })
        .await
    }

    async fn count_by_type(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<EventTypeCount>, DatabaseError> {
        let since = datetime_to_string(&since);
        with_connection(self.db_path.clone(), move |conn| {
            let rows = analytics::table
                .filter(analytics::created_at.ge(since))
                .group_by(analytics::event_type)
                .select((analytics::event_type, count_star()))
                .load::<(String, i64)>(conn)
                .map_err(query_error)?;
            Ok(sort_counts(rows))
        })
        .await
    }

    async fn recent_events(&self, limit: i64) -> Result<Vec<AnalyticsEvent>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            analytics::table
                .order(analytics::id.desc())
                .limit(limit)
                .select(DbAnalyticsEvent::as_select())
                .load::<DbAnalyticsEvent>(conn)
                .map_err(query_error)?
                .iter()
                .map(DbAnalyticsEvent::to_event)
                .collect()
        })
        .await
    }
}

#[async_trait]
impl MemberStatsStore for SqliteStore {
    async fn upsert_stats(&self, stats: &MemberStats) -> Result<(), DatabaseError> {
        let stats = stats.clone();
        with_connection(self.db_path.clone(), move |conn| {
            let row = UpsertMemberStats {
                user_id: &stats.user_id,
                xp: stats.xp,
                level: stats.level,
                roles: roles_to_json(&stats.roles),
                updated_at: datetime_to_string(&stats.updated_at),
            };

            diesel::insert_into(member_stats::table)
                .values(&row)
                .on_conflict(member_stats::user_id)
                .do_update()
                .set(&row)
                .execute(conn)
                .map(|_| ())
                .map_err(query_error)
        })
        .await
    }

    async fn get_stats(&self, user_id: &str) -> Result<Option<MemberStats>, DatabaseError> {
        let user_id = user_id.to_string();
        with_connection(self.db_path.clone(), move |conn| {
            member_stats::table
                .find(user_id)
                .select(DbMemberStats::as_select())
                .first::<DbMemberStats>(conn)
                .optional()
                .map_err(query_error)?
                .map(|row| row.to_stats())
                .transpose()
        })
        .await
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<MemberStats>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            member_stats::table
                .order((member_stats::xp.desc(), member_stats::user_id.asc()))
                .limit(limit)
                .select(DbMemberStats::as_select())
                .load::<DbMemberStats>(conn)
                .map_err(query_error)?
                .iter()
                .map(DbMemberStats::to_stats)
                .collect()
        })
        .await
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn get_content(&self, key: &str) -> Result<Option<ContentBlock>, DatabaseError> {
        let key = key.to_string();
        with_connection(self.db_path.clone(), move |conn| {
            content::table
                .find(key)
                .select(DbContentBlock::as_select())
                .first::<DbContentBlock>(conn)
                .optional()
                .map_err(query_error)?
                .map(|row| row.to_block())
                .transpose()
        })
        .await
    }

    async fn upsert_content(&self, block: &ContentBlock) -> Result<(), DatabaseError> {
        let block = block.clone();
        with_connection(self.db_path.clone(), move |conn| {
            let row = UpsertContentBlock {
                content_key: &block.key,
                title: &block.title,
                body: &block.body,
                updated_by: &block.updated_by,
                updated_at: datetime_to_string(&block.updated_at),
            };

            diesel::insert_into(content::table)
                .values(&row)
                .on_conflict(content::content_key)
                .do_update()
                .set(&row)
                .execute(conn)
                .map(|_| ())
                .map_err(query_error)
        })
        .await
    }

    async fn list_content(&self) -> Result<Vec<ContentBlock>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            content::table
                .order(content::content_key.asc())
                .select(DbContentBlock::as_select())
                .load::<DbContentBlock>(conn)
                .map_err(query_error)?
                .iter()
                .map(DbContentBlock::to_block)
                .collect()
        })
        .await
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn create_event(
        &self,
        event: &NewCommunityEvent,
        now: DateTime<Utc>,
    ) -> Result<CommunityEvent, DatabaseError> {
        let event = event.clone();
        with_connection(self.db_path.clone(), move |conn| {
            let row = NewDbCommunityEvent {
                title: &event.title,
                description: &event.description,
                pathway: event.pathway.as_deref(),
                starts_at: datetime_to_string(&event.starts_at),
                ends_at: event.ends_at.as_ref().map(datetime_to_string),
                location: event.location.as_deref(),
                created_at: datetime_to_string(&now),
            };

            diesel::insert_into(events::table)
                .values(&row)
                .execute(conn)
                .map_err(query_error)?;
            let event_id = last_insert_rowid(conn)?;

            events::table
                .find(event_id)
                .select(DbCommunityEvent::as_select())
                .first::<DbCommunityEvent>(conn)
                .map_err(query_error)?
                .to_event()
        })
        .await
    }

    async fn upcoming_events(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<CommunityEvent>, DatabaseError> {
        let now = datetime_to_string(&now);
        with_connection(self.db_path.clone(), move |conn| {
            events::table
                .filter(events::starts_at.ge(now))
                .order(events::starts_at.asc())
                .limit(limit)
                .select(DbCommunityEvent::as_select())
                .load::<DbCommunityEvent>(conn)
                .map_err(query_error)?
                .iter()
                .map(DbCommunityEvent::to_event)
                .collect()
        })
        .await
    }

    async fn delete_event(&self, event_id: i64) -> Result<bool, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            diesel::delete(events::table.find(event_id))
                .execute(conn)
                .map(|deleted| deleted > 0)
                .map_err(query_error)
        })
        .await
    }
}

#[async_trait]
impl AuditLogStore for SqliteStore {
    async fn append_mod_log(
        &self,
        action: &str,
        target_id: &str,
        moderator: &str,
        reason: Option<&str>,
        duration_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<ModLogEntry, DatabaseError> {
        let action = action.to_string();
        let target_id = target_id.to_string();
        let moderator = moderator.to_string();
        let reason = reason.map(str::to_string);
        with_connection(self.db_path.clone(), move |conn| {
            diesel::insert_into(mod_logs::table)
                .values(NewDbModLogEntry {
                    action: &action,
                    target_id: &target_id,
                    moderator: &moderator,
                    reason: reason.as_deref(),
                    duration_minutes,
                    created_at: datetime_to_string(&now),
                })
                .execute(conn)
                .map_err(query_error)?;
            let entry_id = last_insert_rowid(conn)?;

            mod_logs::table
                .find(entry_id)
                .select(DbModLogEntry::as_select())
                .first::<DbModLogEntry>(conn)
                .map_err(query_error)?
                .to_entry()
        })
        .await
    }

    async fn list_mod_logs(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModLogEntry>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            mod_logs::table
                .order(mod_logs::id.desc())
                .limit(limit)
                .offset(offset)
                .select(DbModLogEntry::as_select())
                .load::<DbModLogEntry>(conn)
                .map_err(query_error)?
                .iter()
                .map(DbModLogEntry::to_entry)
                .collect()
        })
        .await
    }

    async fn append_admin_log(
        &self,
        actor: &str,
        action: &str,
        details: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let actor = actor.to_string();
        let action = action.to_string();
        let details = details.to_string();
        with_connection(self.db_path.clone(), move |conn| {
            diesel::insert_into(admin_logs::table)
                .values(NewDbAdminLogEntry {
                    actor: &actor,
                    action: &action,
                    details,
                    created_at: datetime_to_string(&now),
                })
                .execute(conn)
                .map(|_| ())
                .map_err(query_error)
        })
        .await
    }

    async fn list_admin_logs(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AdminLogEntry>, DatabaseError> {
        with_connection(self.db_path.clone(), move |conn| {
            admin_logs::table
                .order(admin_logs::id.desc())
                .limit(limit)
                .offset(offset)
                .select(DbAdminLogEntry::as_select())
                .load::<DbAdminLogEntry>(conn)
                .map_err(query_error)?
                .iter()
                .map(DbAdminLogEntry::to_entry)
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn stored_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);

        let a = datetime_to_string(&earlier);
        let b = datetime_to_string(&later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(string_to_datetime(&b).unwrap(), later);
    }

    #[test]
    fn garbage_timestamp_is_a_query_error() {
        assert!(matches!(
            string_to_datetime("yesterday"),
            Err(DatabaseError::Query(_))
        ));
    }
}
