use std::sync::Arc;

use crate::config::{DatabaseConfig, DbType};
use crate::db::{
    AnalyticsStore, AppealStore, AuditLogStore, ContentStore, DatabaseError, EventStore,
    MemberStatsStore,
};

#[cfg(feature = "postgres")]
use crate::db::postgres::PostgresStore;
#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;
#[cfg(feature = "postgres")]
use diesel::r2d2::{self, ConnectionManager};
#[cfg(any(feature = "postgres", feature = "sqlite"))]
use diesel::RunQueryDsl;

#[cfg(feature = "postgres")]
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::{SqliteStore, establish_connection};

#[cfg(feature = "postgres")]
const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS appeals (
        id BIGSERIAL PRIMARY KEY,
        kind TEXT NOT NULL,
        discord_id TEXT,
        discord_username TEXT,
        reason TEXT NOT NULL,
        appeal_text TEXT NOT NULL,
        contact_email TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analytics (
        id BIGSERIAL PRIMARY KEY,
        event_type TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS member_stats (
        user_id TEXT PRIMARY KEY,
        xp BIGINT NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 0,
        roles TEXT NOT NULL DEFAULT '[]',
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS content (
        content_key TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_by TEXT NOT NULL,
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        pathway TEXT,
        starts_at TIMESTAMP WITH TIME ZONE NOT NULL,
        ends_at TIMESTAMP WITH TIME ZONE,
        location TEXT,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mod_logs (
        id BIGSERIAL PRIMARY KEY,
        action TEXT NOT NULL,
        target_id TEXT NOT NULL,
        moderator TEXT NOT NULL,
        reason TEXT,
        duration_minutes INTEGER,
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS admin_logs (
        id BIGSERIAL PRIMARY KEY,
        actor TEXT NOT NULL,
        action TEXT NOT NULL,
        details TEXT NOT NULL DEFAULT '{}',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_appeals_discord_id ON appeals(discord_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_appeals_status ON appeals(status)",
    "CREATE INDEX IF NOT EXISTS idx_analytics_created_at ON analytics(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_member_stats_xp ON member_stats(xp)",
    "CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at)",
];

#[cfg(feature = "sqlite")]
const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS appeals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        discord_id TEXT,
        discord_username TEXT,
        reason TEXT NOT NULL,
        appeal_text TEXT NOT NULL,
        contact_email TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS analytics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_type TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS member_stats (
        user_id TEXT PRIMARY KEY,
        xp INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL DEFAULT 0,
        roles TEXT NOT NULL DEFAULT '[]',
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS content (
        content_key TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        updated_by TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        pathway TEXT,
        starts_at TEXT NOT NULL,
        ends_at TEXT,
        location TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mod_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        action TEXT NOT NULL,
        target_id TEXT NOT NULL,
        moderator TEXT NOT NULL,
        reason TEXT,
        duration_minutes INTEGER,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS admin_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        actor TEXT NOT NULL,
        action TEXT NOT NULL,
        details TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_appeals_discord_id ON appeals(discord_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_appeals_status ON appeals(status)",
    "CREATE INDEX IF NOT EXISTS idx_analytics_created_at ON analytics(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_member_stats_xp ON member_stats(xp)",
    "CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at)",
];

/// Owns the backend connection and hands out the per-concern stores.
#[derive(Clone)]
pub struct DatabaseManager {
    #[cfg(feature = "postgres")]
    postgres_pool: Option<Pool>,
    #[cfg(feature = "sqlite")]
    sqlite_path: Option<Arc<String>>,
    appeal_store: Arc<dyn AppealStore>,
    analytics_store: Arc<dyn AnalyticsStore>,
    member_stats_store: Arc<dyn MemberStatsStore>,
    content_store: Arc<dyn ContentStore>,
    event_store: Arc<dyn EventStore>,
    audit_log_store: Arc<dyn AuditLogStore>,
    db_type: DbType,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let db_type = config.db_type();

        match db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let manager = ConnectionManager::<PgConnection>::new(config.connection_string());
                let pool = r2d2::Pool::builder()
                    .max_size(config.max_connections().unwrap_or(10))
                    .min_idle(Some(config.min_connections().unwrap_or(1)))
                    .build(manager)
                    .map_err(|e| DatabaseError::Connection(e.to_string()))?;

                let store = Arc::new(PostgresStore::new(pool.clone()));

                Ok(Self {
                    postgres_pool: Some(pool),
                    #[cfg(feature = "sqlite")]
                    sqlite_path: None,
                    appeal_store: store.clone(),
                    analytics_store: store.clone(),
                    member_stats_store: store.clone(),
                    content_store: store.clone(),
                    event_store: store.clone(),
                    audit_log_store: store,
                    db_type,
                })
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = config.sqlite_path().ok_or_else(|| {
                    DatabaseError::Connection("no sqlite path configured".to_string())
                })?;
                let path = Arc::new(path);
                let store = Arc::new(SqliteStore::new(path.clone()));

                Ok(Self {
                    #[cfg(feature = "postgres")]
                    postgres_pool: None,
                    sqlite_path: Some(path),
                    appeal_store: store.clone(),
                    analytics_store: store.clone(),
                    member_stats_store: store.clone(),
                    content_store: store.clone(),
                    event_store: store.clone(),
                    audit_log_store: store,
                    db_type,
                })
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Connection(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Connection(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    /// Creates every table and index that is missing. Safe to run on each start.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        match self.db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let pool = self.postgres_pool.clone().ok_or_else(|| {
                    DatabaseError::Migration("postgres pool missing".to_string())
                })?;
                Self::migrate_postgres(pool).await
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = self.sqlite_path.clone().ok_or_else(|| {
                    DatabaseError::Migration("sqlite path missing".to_string())
                })?;
                Self::migrate_sqlite(path).await
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => Err(DatabaseError::Migration(
                "PostgreSQL feature not enabled".to_string(),
            )),
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => Err(DatabaseError::Migration(
                "SQLite feature not enabled".to_string(),
            )),
        }
    }

    #[cfg(feature = "postgres")]
    async fn migrate_postgres(pool: Pool) -> Result<(), DatabaseError> {
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;

            for statement in POSTGRES_SCHEMA {
                diesel::sql_query(*statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    #[cfg(feature = "sqlite")]
    async fn migrate_sqlite(path: Arc<String>) -> Result<(), DatabaseError> {
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&path)?;

            for statement in SQLITE_SCHEMA {
                diesel::sql_query(*statement)
                    .execute(&mut conn)
                    .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration task failed: {e}")))?
    }

    /// Connectivity check behind `/status`.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        match self.db_type {
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let pool = self.postgres_pool.clone().ok_or_else(|| {
                    DatabaseError::Connection("postgres pool missing".to_string())
                })?;
                tokio::task::spawn_blocking(move || {
                    let mut conn = pool
                        .get()
                        .map_err(|e| DatabaseError::Connection(e.to_string()))?;
                    diesel::sql_query("SELECT 1")
                        .execute(&mut conn)
                        .map(|_| ())
                        .map_err(|e| DatabaseError::Query(e.to_string()))
                })
                .await
                .map_err(|e| DatabaseError::Query(format!("ping task failed: {e}")))?
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = self.sqlite_path.clone().ok_or_else(|| {
                    DatabaseError::Connection("sqlite path missing".to_string())
                })?;
                tokio::task::spawn_blocking(move || {
                    let mut conn = establish_connection(&path)?;
                    diesel::sql_query("SELECT 1")
                        .execute(&mut conn)
                        .map(|_| ())
                        .map_err(|e| DatabaseError::Query(e.to_string()))
                })
                .await
                .map_err(|e| DatabaseError::Query(format!("ping task failed: {e}")))?
            }
            #[allow(unreachable_patterns)]
            _ => Err(DatabaseError::Connection(
                "database backend not enabled".to_string(),
            )),
        }
    }

    pub fn appeal_store(&self) -> Arc<dyn AppealStore> {
        self.appeal_store.clone()
    }

    pub fn analytics_store(&self) -> Arc<dyn AnalyticsStore> {
        self.analytics_store.clone()
    }

    pub fn member_stats_store(&self) -> Arc<dyn MemberStatsStore> {
        self.member_stats_store.clone()
    }

    pub fn content_store(&self) -> Arc<dyn ContentStore> {
        self.content_store.clone()
    }

    pub fn event_store(&self) -> Arc<dyn EventStore> {
        self.event_store.clone()
    }

    pub fn audit_log_store(&self) -> Arc<dyn AuditLogStore> {
        self.audit_log_store.clone()
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::DatabaseManager;
    use crate::config::DatabaseConfig;
    use crate::db::{
        AppealKind, AppealStatus, ContentBlock, MemberStats, NewAppeal, NewCommunityEvent,
    };

    async fn sqlite_manager(file: &NamedTempFile) -> DatabaseManager {
        let config = DatabaseConfig {
            url: None,
            filename: Some(file.path().to_string_lossy().to_string()),
            max_connections: Some(1),
            min_connections: Some(1),
        };
        let manager = DatabaseManager::new(&config).await.expect("db manager");
        manager.migrate().await.expect("migrate");
        manager
    }

    fn ban_appeal(discord_id: &str) -> NewAppeal {
        NewAppeal {
            kind: AppealKind::Ban,
            discord_id: Some(discord_id.to_string()),
            discord_username: Some("wanderer".to_string()),
            reason: "spam".to_string(),
            appeal_text: "I was hacked and the account posted links.".to_string(),
            contact_email: None,
        }
    }

    #[tokio::test]
    async fn sqlite_appeal_lifecycle() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = sqlite_manager(&file).await;
        let store = manager.appeal_store();

        let now = Utc::now();
        let created = store
            .create_appeal(&ban_appeal("123456789012345678"), now)
            .await
            .expect("create appeal");
        assert!(created.id > 0);
        assert_eq!(created.status, AppealStatus::Pending);

        let latest = store
            .latest_for_discord_id("123456789012345678", false)
            .await
            .expect("latest")
            .expect("appeal exists");
        assert_eq!(latest.id, created.id);
        assert!(
            store
                .latest_for_discord_id("123456789012345678", true)
                .await
                .expect("latest complaint")
                .is_none()
        );

        let updated = store
            .update_appeal_status(created.id, AppealStatus::Approved, now + Duration::minutes(5))
            .await
            .expect("update")
            .expect("appeal still exists");
        assert_eq!(updated.status, AppealStatus::Approved);
        assert!(updated.updated_at > updated.created_at);

        assert!(
            store
                .update_appeal_status(9_999, AppealStatus::Denied, now)
                .await
                .expect("update missing")
                .is_none()
        );

        let pending = store
            .list_appeals(Some(AppealStatus::Pending), 50, 0)
            .await
            .expect("list pending");
        assert!(pending.is_empty());
        let all = store.list_appeals(None, 50, 0).await.expect("list all");
        assert_eq!(all.len(), 1);

        // Data survives a reopen of the same file.
        let reopened = sqlite_manager(&file).await;
        let persisted = reopened
            .appeal_store()
            .get_appeal(created.id)
            .await
            .expect("get after reopen")
            .expect("appeal persisted");
        assert_eq!(persisted.status, AppealStatus::Approved);
    }

    #[tokio::test]
    async fn sqlite_latest_appeal_is_newest() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = sqlite_manager(&file).await.appeal_store();

        let first = Utc::now() - Duration::hours(30);
        store
            .create_appeal(&ban_appeal("42"), first)
            .await
            .expect("first");
        let second = store
            .create_appeal(&ban_appeal("42"), first + Duration::hours(29))
            .await
            .expect("second");

        let latest = store
            .latest_for_discord_id("42", false)
            .await
            .expect("latest")
            .expect("exists");
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn sqlite_analytics_counts_window() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = sqlite_manager(&file).await.analytics_store();

        let now = Utc::now();
        let meta = json!({"path": "/"});
        store
            .record_event("page_view", &meta, now - Duration::days(10))
            .await
            .expect("old event");
        store.record_event("page_view", &meta, now).await.expect("event");
        store.record_event("page_view", &meta, now).await.expect("event");
        store
            .record_event("quiz_completed", &json!({}), now)
            .await
            .expect("event");

        let counts = store
            .count_by_type(now - Duration::days(7))
            .await
            .expect("counts");
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].event_type, "page_view");
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].count, 1);

        let recent = store.recent_events(2).await.expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, "quiz_completed");
    }

    #[tokio::test]
    async fn sqlite_member_stats_upsert_and_leaderboard() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = sqlite_manager(&file).await.member_stats_store();

        let now = Utc::now();
        for (user_id, xp) in [("1", 400), ("2", 2_500), ("3", 900)] {
            store
                .upsert_stats(&MemberStats {
                    user_id: user_id.to_string(),
                    xp,
                    level: MemberStats::level_for_xp(xp),
                    roles: vec![],
                    updated_at: now,
                })
                .await
                .expect("upsert");
        }

        store
            .upsert_stats(&MemberStats {
                user_id: "1".to_string(),
                xp: 10_000,
                level: MemberStats::level_for_xp(10_000),
                roles: vec!["555".to_string()],
                updated_at: now,
            })
            .await
            .expect("overwrite");

        let stats = store.get_stats("1").await.expect("get").expect("exists");
        assert_eq!(stats.level, 10);
        assert_eq!(stats.roles, vec!["555"]);

        let board = store.leaderboard(2).await.expect("leaderboard");
        let order: Vec<_> = board.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(order, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn sqlite_content_and_events() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = sqlite_manager(&file).await;
        let now = Utc::now();

        let content = manager.content_store();
        let mut block = ContentBlock {
            key: "home.hero".to_string(),
            title: "Welcome".to_string(),
            body: "Find your pathway.".to_string(),
            updated_by: "admin".to_string(),
            updated_at: now,
        };
        content.upsert_content(&block).await.expect("insert content");
        block.body = "Find your people.".to_string();
        content.upsert_content(&block).await.expect("update content");
        let stored = content
            .get_content("home.hero")
            .await
            .expect("get content")
            .expect("content exists");
        assert_eq!(stored.body, "Find your people.");
        assert_eq!(content.list_content().await.expect("list").len(), 1);

        let events = manager.event_store();
        let past = events
            .create_event(
                &NewCommunityEvent {
                    title: "Last week's raid".to_string(),
                    description: String::new(),
                    pathway: Some("gaming".to_string()),
                    starts_at: now - Duration::days(7),
                    ends_at: None,
                    location: None,
                },
                now,
            )
            .await
            .expect("past event");
        let upcoming = events
            .create_event(
                &NewCommunityEvent {
                    title: "Lore night".to_string(),
                    description: "Bring a character.".to_string(),
                    pathway: Some("lorebound".to_string()),
                    starts_at: now + Duration::days(2),
                    ends_at: Some(now + Duration::days(2) + Duration::hours(2)),
                    location: Some("#stage".to_string()),
                },
                now,
            )
            .await
            .expect("upcoming event");

        let listed = events.upcoming_events(now, 10).await.expect("upcoming");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, upcoming.id);

        assert!(events.delete_event(past.id).await.expect("delete"));
        assert!(!events.delete_event(past.id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn sqlite_audit_logs_newest_first() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = sqlite_manager(&file).await.audit_log_store();
        let now = Utc::now();

        store
            .append_mod_log("ban", "111", "admin", Some("raiding"), None, now)
            .await
            .expect("ban log");
        let timeout = store
            .append_mod_log("timeout", "222", "admin", None, Some(60), now)
            .await
            .expect("timeout log");
        assert_eq!(timeout.duration_minutes, Some(60));

        let logs = store.list_mod_logs(10, 0).await.expect("mod logs");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action, "timeout");
        assert_eq!(logs[1].reason.as_deref(), Some("raiding"));

        store
            .append_admin_log("admin", "content.update", &json!({"key": "home.hero"}), now)
            .await
            .expect("admin log");
        let admin = store.list_admin_logs(10, 0).await.expect("admin logs");
        assert_eq!(admin[0].details["key"], "home.hero");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sqlite_concurrent_writes_wait_for_the_lock() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = sqlite_manager(&file).await;
        let now = Utc::now();

        let writes: Vec<_> = (0..8)
            .map(|i| {
                let store = manager.analytics_store();
                tokio::spawn(async move {
                    store
                        .record_event("page_view", &json!({ "n": i }), now)
                        .await
                })
            })
            .collect();
        for write in writes {
            write.await.expect("join").expect("record event");
        }

        let counts = manager
            .analytics_store()
            .count_by_type(now - Duration::minutes(1))
            .await
            .expect("counts");
        assert_eq!(counts[0].count, 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sqlite_cooldown_insert_admits_one_concurrent_submission() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager = sqlite_manager(&file).await;
        let now = Utc::now();
        let since = now - Duration::hours(24);

        let attempts: Vec<_> = (0..6)
            .map(|_| {
                let store = manager.appeal_store();
                tokio::spawn(async move {
                    store
                        .create_unless_recent(&ban_appeal("123456789012345678"), since, now)
                        .await
                })
            })
            .collect();

        let mut created = 0;
        let mut refused = 0;
        for attempt in attempts {
            match attempt.await.expect("join").expect("store call") {
                Ok(_) => created += 1,
                Err(previous) => {
                    assert_eq!(previous.discord_id.as_deref(), Some("123456789012345678"));
                    refused += 1;
                }
            }
        }
        assert_eq!((created, refused), (1, 5));

        // A complaint from the same account is a separate family.
        let complaint = NewAppeal {
            kind: AppealKind::Complaint,
            ..ban_appeal("123456789012345678")
        };
        assert!(
            manager
                .appeal_store()
                .create_unless_recent(&complaint, since, now)
                .await
                .expect("complaint")
                .is_ok()
        );

        // Outside the window the old submission no longer blocks.
        let later = now + Duration::hours(25);
        assert!(
            manager
                .appeal_store()
                .create_unless_recent(&ban_appeal("123456789012345678"), later - Duration::hours(24), later)
                .await
                .expect("after cooldown")
                .is_ok()
        );
    }
}
