use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use serde_json::Value;

use crate::db::manager::Pool;
use crate::db::schema::{admin_logs, analytics, appeals, content, events, member_stats, mod_logs};

use super::models::{
    AdminLogEntry, AnalyticsEvent, Appeal, AppealKind, AppealStatus, CommunityEvent, ContentBlock,
    EventTypeCount, MemberStats, ModLogEntry, NewAppeal, NewCommunityEvent, json_from_text,
    roles_from_json, roles_to_json, sort_counts,
};
use super::stores::{
    AnalyticsStore, AppealStore, AuditLogStore, ContentStore, EventStore, MemberStatsStore,
};
use super::DatabaseError;

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
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DbAppeal> for Appeal {
    type Error = DatabaseError;

    fn try_from(value: DbAppeal) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            kind: value.kind.parse()?,
            discord_id: value.discord_id,
            discord_username: value.discord_username,
            reason: value.reason,
            appeal_text: value.appeal_text,
            contact_email: value.contact_email,
            status: value.status.parse()?,
            created_at: value.created_at,
            updated_at: value.updated_at,
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
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = analytics)]
struct DbAnalyticsEvent {
    id: i64,
    event_type: String,
    metadata: String,
    created_at: DateTime<Utc>,
}

impl From<DbAnalyticsEvent> for AnalyticsEvent {
    fn from(value: DbAnalyticsEvent) -> Self {
        Self {
            id: value.id,
            event_type: value.event_type,
            metadata: json_from_text(&value.metadata),
            created_at: value.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = analytics)]
struct NewDbAnalyticsEvent<'a> {
    event_type: &'a str,
    metadata: String,
    created_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = member_stats)]
struct DbMemberStats {
    user_id: String,
    xp: i64,
    level: i32,
    roles: String,
    updated_at: DateTime<Utc>,
}

impl From<DbMemberStats> for MemberStats {
    fn from(value: DbMemberStats) -> Self {
        Self {
            user_id: value.user_id,
            xp: value.xp,
            level: value.level,
            roles: roles_from_json(&value.roles),
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = member_stats)]
struct UpsertMemberStats<'a> {
    user_id: &'a str,
    xp: i64,
    level: i32,
    roles: String,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = content)]
struct DbContentBlock {
    content_key: String,
    title: String,
    body: String,
    updated_by: String,
    updated_at: DateTime<Utc>,
}

impl From<DbContentBlock> for ContentBlock {
    fn from(value: DbContentBlock) -> Self {
        Self {
            key: value.content_key,
            title: value.title,
            body: value.body,
            updated_by: value.updated_by,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = content)]
struct UpsertContentBlock<'a> {
    content_key: &'a str,
    title: &'a str,
    body: &'a str,
    updated_by: &'a str,
    updated_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = events)]
struct DbCommunityEvent {
    id: i64,
    title: String,
    description: String,
    pathway: Option<String>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    location: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<DbCommunityEvent> for CommunityEvent {
    fn from(value: DbCommunityEvent) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            pathway: value.pathway,
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            location: value.location,
            created_at: value.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = events)]
struct NewDbCommunityEvent<'a> {
    title: &'a str,
    description: &'a str,
    pathway: Option<&'a str>,
    starts_at: &'a DateTime<Utc>,
    ends_at: Option<&'a DateTime<Utc>>,
    location: Option<&'a str>,
    created_at: &'a DateTime<Utc>,
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
    created_at: DateTime<Utc>,
}

impl From<DbModLogEntry> for ModLogEntry {
    fn from(value: DbModLogEntry) -> Self {
        Self {
            id: value.id,
            action: value.action,
            target_id: value.target_id,
            moderator: value.moderator,
            reason: value.reason,
            duration_minutes: value.duration_minutes,
            created_at: value.created_at,
        }
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
    created_at: &'a DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = admin_logs)]
struct DbAdminLogEntry {
    id: i64,
    actor: String,
    action: String,
    details: String,
    created_at: DateTime<Utc>,
}

impl From<DbAdminLogEntry> for AdminLogEntry {
    fn from(value: DbAdminLogEntry) -> Self {
        Self {
            id: value.id,
            actor: value.actor,
            action: value.action,
            details: json_from_text(&value.details),
            created_at: value.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = admin_logs)]
struct NewDbAdminLogEntry<'a> {
    actor: &'a str,
    action: &'a str,
    details: String,
    created_at: &'a DateTime<Utc>,
}

fn query_error(e: diesel::result::Error) -> DatabaseError {
    DatabaseError::Query(e.to_string())
}

fn insert_appeal(
    conn: &mut PgConnection,
    appeal: &NewAppeal,
    now: &DateTime<Utc>,
) -> Result<Appeal, DatabaseError> {
    let row = NewDbAppeal {
        kind: appeal.kind.as_str(),
        discord_id: appeal.discord_id.as_deref(),
        discord_username: appeal.discord_username.as_deref(),
        reason: &appeal.reason,
        appeal_text: &appeal.appeal_text,
        contact_email: appeal.contact_email.as_deref(),
        status: AppealStatus::Pending.as_str(),
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(appeals::table)
        .values(&row)
        .returning(DbAppeal::as_returning())
        .get_result::<DbAppeal>(conn)
        .map_err(query_error)?
        .try_into()
}

fn latest_appeal(
    conn: &mut PgConnection,
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
        .map(Appeal::try_from)
        .transpose()
}

async fn with_connection<T, F>(pool: Pool, operation: F) -> Result<T, DatabaseError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        operation(&mut conn)
    })
    .await
    .map_err(|e| DatabaseError::Query(format!("database task failed: {e}")))?
}

pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppealStore for PostgresStore {
    async fn create_appeal(
        &self,
        appeal: &NewAppeal,
        now: DateTime<Utc>,
    ) -> Result<Appeal, DatabaseError> {
        let appeal = appeal.clone();
        with_connection(self.pool.clone(), move |conn| insert_appeal(conn, &appeal, &now)).await
    }

    async fn get_appeal(&self, appeal_id: i64) -> Result<Option<Appeal>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            appeals::table
                .find(appeal_id)
                .select(DbAppeal::as_select())
                .first::<DbAppeal>(conn)
                .optional()
                .map_err(query_error)?
                .map(Appeal::try_from)
                .transpose()
        })
        .await
    }

    async fn list_appeals(
        &self,
        status: Option<AppealStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Appeal>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
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
                .into_iter()
                .map(Appeal::try_from)
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
        with_connection(self.pool.clone(), move |conn| {
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
        with_connection(self.pool.clone(), move |conn| {
            conn.transaction(|conn| {
                if let Some(user_id) = appeal.discord_id.as_deref() {
                    let complaints = appeal.kind == AppealKind::Complaint;
                    // Serializes submissions per account and family until commit.
                    let lock_key = format!(
                        "cooldown:{}:{user_id}",
                        if complaints { "complaint" } else { "appeal" }
                    );
                    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
                        .bind::<Text, _>(lock_key)
                        .execute(conn)?;

                    if let Some(previous) = latest_appeal(conn, user_id, complaints)?
                        && previous.created_at > since
                    {
                        return Ok(Err(previous));
                    }
                }
                insert_appeal(conn, &appeal, &now).map(Ok)
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
        with_connection(self.pool.clone(), move |conn| {
            diesel::update(appeals::table.find(appeal_id))
                .set((
                    appeals::status.eq(new_status.as_str()),
                    appeals::updated_at.eq(now),
                ))
                .returning(DbAppeal::as_returning())
                .get_result::<DbAppeal>(conn)
                .optional()
                .map_err(query_error)?
                .map(Appeal::try_from)
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl AnalyticsStore for PostgresStore {
    async fn record_event(
        &self,
        event_type: &str,
        metadata: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let event_type = event_type.to_string();
        let metadata = metadata.to_string();
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(analytics::table)
                .values(NewDbAnalyticsEvent {
                    event_type: &event_type,
                    metadata,
                    created_at: &now,
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
        with_connection(self.pool.clone(), move |conn| {
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
        with_connection(self.pool.clone(), move |conn| {
            analytics::table
                .order(analytics::id.desc())
                .limit(limit)
                .select(DbAnalyticsEvent::as_select())
                .load::<DbAnalyticsEvent>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(query_error)
        })
        .await
    }
}

#[async_trait]
impl MemberStatsStore for PostgresStore {
    async fn upsert_stats(&self, stats: &MemberStats) -> Result<(), DatabaseError> {
        let stats = stats.clone();
        with_connection(self.pool.clone(), move |conn| {
            let row = UpsertMemberStats {
                user_id: &stats.user_id,
                xp: stats.xp,
                level: stats.level,
                roles: roles_to_json(&stats.roles),
                updated_at: &stats.updated_at,
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
        with_connection(self.pool.clone(), move |conn| {
            member_stats::table
                .find(user_id)
                .select(DbMemberStats::as_select())
                .first::<DbMemberStats>(conn)
                .optional()
                .map(|value| value.map(Into::into))
                .map_err(query_error)
        })
        .await
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<MemberStats>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            member_stats::table
                .order((member_stats::xp.desc(), member_stats::user_id.asc()))
                .limit(limit)
                .select(DbMemberStats::as_select())
                .load::<DbMemberStats>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(query_error)
        })
        .await
    }
}

#[async_trait]
impl ContentStore for PostgresStore {
    async fn get_content(&self, key: &str) -> Result<Option<ContentBlock>, DatabaseError> {
        let key = key.to_string();
        with_connection(self.pool.clone(), move |conn| {
            content::table
                .find(key)
                .select(DbContentBlock::as_select())
                .first::<DbContentBlock>(conn)
                .optional()
                .map(|value| value.map(Into::into))
                .map_err(query_error)
        })
        .await
    }

    async fn upsert_content(&self, block: &ContentBlock) -> Result<(), DatabaseError> {
        let block = block.clone();
        with_connection(self.pool.clone(), move |conn| {
            let row = UpsertContentBlock {
                content_key: &block.key,
                title: &block.title,
                body: &block.body,
                updated_by: &block.updated_by,
                updated_at: &block.updated_at,
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
        with_connection(self.pool.clone(), move |conn| {
            content::table
                .order(content::content_key.asc())
                .select(DbContentBlock::as_select())
                .load::<DbContentBlock>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(query_error)
        })
        .await
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn create_event(
        &self,
        event: &NewCommunityEvent,
        now: DateTime<Utc>,
    ) -> Result<CommunityEvent, DatabaseError> {
        let event = event.clone();
        with_connection(self.pool.clone(), move |conn| {
            let row = NewDbCommunityEvent {
                title: &event.title,
                description: &event.description,
                pathway: event.pathway.as_deref(),
                starts_at: &event.starts_at,
                ends_at: event.ends_at.as_ref(),
                location: event.location.as_deref(),
                created_at: &now,
            };

            diesel::insert_into(events::table)
                .values(&row)
                .returning(DbCommunityEvent::as_returning())
                .get_result::<DbCommunityEvent>(conn)
                .map(Into::into)
                .map_err(query_error)
        })
        .await
    }

    async fn upcoming_events(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<CommunityEvent>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            events::table
                .filter(events::starts_at.ge(now))
                .order(events::starts_at.asc())
                .limit(limit)
                .select(DbCommunityEvent::as_select())
                .load::<DbCommunityEvent>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(query_error)
        })
        .await
    }

    async fn delete_event(&self, event_id: i64) -> Result<bool, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            diesel::delete(events::table.find(event_id))
                .execute(conn)
                .map(|deleted| deleted > 0)
                .map_err(query_error)
        })
        .await
    }
}

#[async_trait]
impl AuditLogStore for PostgresStore {
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
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(mod_logs::table)
                .values(NewDbModLogEntry {
                    action: &action,
                    target_id: &target_id,
                    moderator: &moderator,
                    reason: reason.as_deref(),
                    duration_minutes,
                    created_at: &now,
                })
                .returning(DbModLogEntry::as_returning())
                .get_result::<DbModLogEntry>(conn)
                .map(Into::into)
                .map_err(query_error)
        })
        .await
    }

    async fn list_mod_logs(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModLogEntry>, DatabaseError> {
        with_connection(self.pool.clone(), move |conn| {
            mod_logs::table
                .order(mod_logs::id.desc())
                .limit(limit)
                .offset(offset)
                .select(DbModLogEntry::as_select())
                .load::<DbModLogEntry>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(query_error)
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
        with_connection(self.pool.clone(), move |conn| {
            diesel::insert_into(admin_logs::table)
                .values(NewDbAdminLogEntry {
                    actor: &actor,
                    action: &action,
                    details,
                    created_at: &now,
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
        with_connection(self.pool.clone(), move |conn| {
            admin_logs::table
                .order(admin_logs::id.desc())
                .limit(limit)
                .offset(offset)
                .select(DbAdminLogEntry::as_select())
                .load::<DbAdminLogEntry>(conn)
                .map(|rows| rows.into_iter().map(Into::into).collect())
                .map_err(query_error)
        })
        .await
    }
}
