#![cfg(feature = "sqlite")]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};
use serde_json::{Value, json};
use serenity::all::Permissions;
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::db::DatabaseManager;
use crate::discord::{DiscordError, GuildDirectory, GuildMember, GuildSummary};
use crate::web::AppState;
use crate::web::routes::create_router;

const MEMBER_ID: &str = "111111111111111111";
const STRANGER_ID: &str = "222222222222222222";
const GAMING_ROLE: u64 = 900000000000000001;
const STAFF_ROLE: u64 = 900000000000000009;
const ADMIN_TOKEN: &str = "s3cret";
const BASE: &str = "http://127.0.0.1:5800";

/// In-memory guild with a single member whose roles can change.
#[derive(Default)]
struct FakeDirectory {
    members: Mutex<HashMap<String, GuildMember>>,
    actions: Mutex<Vec<String>>,
    permission_lookups: AtomicUsize,
}

impl FakeDirectory {
    fn with_member(user_id: &str, roles: Vec<u64>) -> Self {
        let directory = Self::default();
        directory.members.lock().insert(
            user_id.to_string(),
            GuildMember {
                user_id: user_id.to_string(),
                username: "wanderer".into(),
                global_name: Some("Wanderer".into()),
                nick: None,
                avatar_url: None,
                roles,
                joined_at: None,
                timed_out_until: None,
            },
        );
        directory
    }

    fn record(&self, action: String) {
        self.actions.lock().push(action);
    }
}

#[async_trait]
impl GuildDirectory for FakeDirectory {
    fn is_configured(&self) -> bool {
        true
    }

    async fn check_guild_membership(&self, user_id: &str) -> Result<bool, DiscordError> {
        Ok(self.members.lock().contains_key(user_id))
    }

    async fn get_member(&self, user_id: &str) -> Result<Option<GuildMember>, DiscordError> {
        Ok(self.members.lock().get(user_id).cloned())
    }

    async fn member_permissions(&self, _member: &GuildMember) -> Result<Permissions, DiscordError> {
        self.permission_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(Permissions::SEND_MESSAGES)
    }

    async fn guild_summary(&self) -> Result<GuildSummary, DiscordError> {
        Ok(GuildSummary {
            id: "123456789012345678".into(),
            name: "The Conclave".into(),
            icon_url: None,
            member_count: Some(self.members.lock().len() as u64),
            online_count: None,
        })
    }

    async fn add_role(&self, user_id: &str, role_id: u64, _reason: &str) -> Result<(), DiscordError> {
        let mut members = self.members.lock();
        let member = members.get_mut(user_id).ok_or(DiscordError::NotFound)?;
        member.roles.push(role_id);
        Ok(())
    }

    async fn remove_role(
        &self,
        user_id: &str,
        role_id: u64,
        _reason: &str,
    ) -> Result<(), DiscordError> {
        let mut members = self.members.lock();
        let member = members.get_mut(user_id).ok_or(DiscordError::NotFound)?;
        member.roles.retain(|role| *role != role_id);
        Ok(())
    }

    async fn ban(&self, user_id: &str, days: u8, _reason: &str) -> Result<(), DiscordError> {
        self.record(format!("ban {user_id} {days}"));
        Ok(())
    }

    async fn unban(&self, user_id: &str) -> Result<(), DiscordError> {
        self.record(format!("unban {user_id}"));
        Ok(())
    }

    async fn timeout(&self, user_id: &str, minutes: u32, _reason: &str) -> Result<(), DiscordError> {
        self.record(format!("timeout {user_id} {minutes}"));
        Ok(())
    }

    async fn remove_timeout(&self, user_id: &str) -> Result<(), DiscordError> {
        self.record(format!("untimeout {user_id}"));
        Ok(())
    }

    async fn kick(&self, user_id: &str, _reason: &str) -> Result<(), DiscordError> {
        self.record(format!("kick {user_id}"));
        Ok(())
    }
}

struct Harness {
    service: Service,
    directory: Arc<FakeDirectory>,
    _db_file: NamedTempFile,
}

async fn harness(max_requests: u32) -> Harness {
    let db_file = NamedTempFile::new().expect("temp sqlite file");
    let yaml = format!(
        r#"
server:
  admin_token: "{ADMIN_TOKEN}"
discord:
  bot_token: "bot-token"
  guild_id: "123456789012345678"
database:
  filename: "{}"
rate_limit:
  window_secs: 60
  max_requests: {max_requests}
roles:
  pathways:
    gaming: {GAMING_ROLE}
  staff: [{STAFF_ROLE}]
"#,
        db_file.path().display()
    );
    let config: Config = serde_yaml::from_str(&yaml).expect("test config");

    let db = DatabaseManager::new(&config.database)
        .await
        .expect("db manager");
    db.migrate().await.expect("migrate");

    let directory = Arc::new(FakeDirectory::with_member(MEMBER_ID, Vec::new()));
    let state = AppState::new(Arc::new(config), Arc::new(db), directory.clone());

    Harness {
        service: Service::new(create_router(Arc::new(state))),
        directory,
        _db_file: db_file,
    }
}

fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

fn ban_appeal(discord_id: &str) -> Value {
    json!({
        "type": "ban",
        "discordId": discord_id,
        "discordUsername": "wanderer",
        "reason": "spamming links",
        "appealText": "My account was compromised and I have since secured it.",
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let h = harness(10).await;
    let mut res = TestClient::get(url("/health")).send(&h.service).await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_reports_database_backend() {
    let h = harness(10).await;
    let mut res = TestClient::get(url("/status")).send(&h.service).await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["database"]["reachable"], true);
    assert_eq!(body["discordConfigured"], true);
}

#[tokio::test]
async fn second_appeal_within_cooldown_is_rejected() {
    let h = harness(10).await;

    let mut first = TestClient::post(url("/api/appeals"))
        .json(&ban_appeal(MEMBER_ID))
        .send(&h.service)
        .await;
    assert_eq!(first.status_code, Some(StatusCode::CREATED));
    let body: Value = first.take_json().await.expect("json body");
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "pending");

    let mut second = TestClient::post(url("/api/appeals"))
        .json(&ban_appeal(MEMBER_ID))
        .send(&h.service)
        .await;
    assert_eq!(second.status_code, Some(StatusCode::TOO_MANY_REQUESTS));
    assert!(second.headers().contains_key("retry-after"));
    let body: Value = second.take_json().await.expect("json body");
    assert!(body["retryAfter"].as_u64().unwrap_or(0) > 0);
}

#[tokio::test]
async fn appeal_with_bad_discord_id_is_rejected() {
    let h = harness(10).await;
    let res = TestClient::post(url("/api/appeals"))
        .json(&ban_appeal("not-a-snowflake"))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn anonymous_complaint_is_accepted() {
    let h = harness(10).await;
    let res = TestClient::post(url("/api/complaints"))
        .json(&json!({
            "category": "harassment",
            "description": "Someone keeps sending me unwanted messages in DMs.",
        }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::CREATED));
}

#[tokio::test]
async fn non_member_verification() {
    let h = harness(10).await;
    let mut res = TestClient::post(url("/api/discord/verify-membership"))
        .json(&json!({ "discordId": STRANGER_ID }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["isMember"], false);
    assert_eq!(body["pathways"], json!([]));
}

#[tokio::test]
async fn member_verification_and_profile() {
    let h = harness(10).await;
    let mut res = TestClient::post(url("/api/discord/verify-membership"))
        .json(&json!({ "discordId": MEMBER_ID }))
        .send(&h.service)
        .await;
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["isMember"], true);
    assert_eq!(body["username"], "Wanderer");

    let missing = TestClient::get(url(&format!("/api/discord/members/{STRANGER_ID}")))
        .send(&h.service)
        .await;
    assert_eq!(missing.status_code, Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn staff_role_skips_the_permission_lookup() {
    let h = harness(10).await;

    let mut res = TestClient::post(url("/api/discord/verify-membership"))
        .json(&json!({ "discordId": MEMBER_ID }))
        .send(&h.service)
        .await;
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["isStaff"], false);
    assert_eq!(h.directory.permission_lookups.load(Ordering::SeqCst), 1);

    h.directory
        .members
        .lock()
        .get_mut(MEMBER_ID)
        .expect("seeded member")
        .roles
        .push(STAFF_ROLE);

    let mut res = TestClient::post(url("/api/discord/verify-membership"))
        .json(&json!({ "discordId": MEMBER_ID }))
        .send(&h.service)
        .await;
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["isStaff"], true);
    assert_eq!(h.directory.permission_lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn profile_reports_role_ids_as_strings() {
    let h = harness(10).await;
    h.directory
        .members
        .lock()
        .get_mut(MEMBER_ID)
        .expect("seeded member")
        .roles
        .push(GAMING_ROLE);

    let mut res = TestClient::get(url(&format!("/api/discord/members/{MEMBER_ID}")))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["member"]["roles"], json!([GAMING_ROLE.to_string()]));
    assert_eq!(body["isStaff"], false);
    assert_eq!(body["permissions"], json!([]));
}

#[tokio::test]
async fn admin_routes_require_token() {
    let h = harness(10).await;

    let res = TestClient::get(url("/api/admin/appeals"))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

    let res = TestClient::get(url("/api/admin/appeals"))
        .bearer_auth("wrong")
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));

    let mut res = TestClient::get(url("/api/admin/appeals"))
        .bearer_auth(ADMIN_TOKEN)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["appeals"], json!([]));
}

#[tokio::test]
async fn pathway_join_then_conflict() {
    let h = harness(20).await;
    let change = json!({ "discordId": MEMBER_ID, "pathway": "gaming" });

    let res = TestClient::post(url("/api/pathways/join"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&change)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));

    let again = TestClient::post(url("/api/pathways/join"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&change)
        .send(&h.service)
        .await;
    assert_eq!(again.status_code, Some(StatusCode::CONFLICT));

    let stranger = TestClient::post(url("/api/pathways/join"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&json!({ "discordId": STRANGER_ID, "pathway": "gaming" }))
        .send(&h.service)
        .await;
    assert_eq!(stranger.status_code, Some(StatusCode::FORBIDDEN));

    let unknown = TestClient::post(url("/api/pathways/join"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&json!({ "discordId": MEMBER_ID, "pathway": "cooking" }))
        .send(&h.service)
        .await;
    assert_eq!(unknown.status_code, Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn kick_requires_guild_membership() {
    let h = harness(20).await;

    let res = TestClient::post(url("/api/admin/moderation"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&json!({ "action": "kick", "discordId": STRANGER_ID }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

    let mut res = TestClient::post(url("/api/admin/moderation"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&json!({
            "action": "timeout",
            "discordId": MEMBER_ID,
            "durationMinutes": 30,
            "moderator": "mod-ana",
        }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["logEntry"]["moderator"], "mod-ana");
    assert_eq!(
        h.directory.actions.lock().as_slice(),
        [format!("timeout {MEMBER_ID} 30")]
    );
}

#[tokio::test]
async fn analytics_rejects_bad_event_type() {
    let h = harness(10).await;

    let res = TestClient::post(url("/api/analytics"))
        .json(&json!({ "eventType": "Page View" }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

    let res = TestClient::post(url("/api/analytics"))
        .json(&json!({ "eventType": "page_view", "metadata": { "path": "/" } }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::ACCEPTED));
}

#[tokio::test]
async fn quiz_scores_answers() {
    let h = harness(10).await;

    let mut res = TestClient::get(url("/api/quiz")).send(&h.service).await;
    let body: Value = res.take_json().await.expect("json body");
    let questions = body["questions"].as_array().map(Vec::len).unwrap_or(0);
    assert!(questions > 0);

    let mut res = TestClient::post(url("/api/quiz"))
        .json(&json!({ "answers": vec![0; questions] }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.expect("json body");
    assert!(body["result"]["pathway"]["slug"].is_string());

    let res = TestClient::post(url("/api/quiz"))
        .json(&json!({ "answers": [0] }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn content_round_trip_through_admin() {
    let h = harness(10).await;

    let missing = TestClient::get(url("/api/content/about"))
        .send(&h.service)
        .await;
    assert_eq!(missing.status_code, Some(StatusCode::NOT_FOUND));

    let res = TestClient::put(url("/api/admin/content/about"))
        .bearer_auth(ADMIN_TOKEN)
        .json(&json!({ "title": "About", "body": "We are The Conclave.", "actor": "ana" }))
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));

    let mut res = TestClient::get(url("/api/content/about"))
        .send(&h.service)
        .await;
    let body: Value = res.take_json().await.expect("json body");
    assert_eq!(body["content"]["title"], "About");
    assert_eq!(body["content"]["updatedBy"], "ana");
}

#[tokio::test]
async fn posts_are_rate_limited() {
    let h = harness(2).await;
    let event = json!({ "eventType": "page_view" });

    for _ in 0..2 {
        let res = TestClient::post(url("/api/analytics"))
            .json(&event)
            .send(&h.service)
            .await;
        assert_eq!(res.status_code, Some(StatusCode::ACCEPTED));
    }

    let res = TestClient::post(url("/api/analytics"))
        .json(&event)
        .send(&h.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::TOO_MANY_REQUESTS));

    let res = TestClient::get(url("/api/pathways")).send(&h.service).await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
}
