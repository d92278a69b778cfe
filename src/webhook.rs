use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WebhooksConfig;
use crate::db::{Appeal, AppealKind, ModLogEntry};
use crate::web::metrics::Metrics;

const EMBED_DESCRIPTION_LIMIT: usize = 4096;
const EMBED_FIELD_LIMIT: usize = 1024;

const COLOR_APPEAL: u32 = 0x5865F2;
const COLOR_COMPLAINT: u32 = 0xED4245;
const COLOR_MODERATION: u32 = 0xFEE75C;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
    timestamp: DateTime<Utc>,
    footer: EmbedFooter,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn field(name: &'static str, value: impl AsRef<str>, inline: bool) -> EmbedField {
    let value = value.as_ref().trim();
    EmbedField {
        name,
        value: if value.is_empty() {
            "n/a".to_string()
        } else {
            truncate(value, EMBED_FIELD_LIMIT)
        },
        inline,
    }
}

fn appeal_embed(appeal: &Appeal) -> Embed {
    let (title, color) = match appeal.kind {
        AppealKind::Complaint => ("New complaint".to_string(), COLOR_COMPLAINT),
        kind => (format!("New {kind} appeal"), COLOR_APPEAL),
    };

    let mut fields = vec![
        field(
            "Discord user",
            match (&appeal.discord_username, &appeal.discord_id) {
                (Some(name), Some(id)) => format!("{name} (`{id}`)"),
                (None, Some(id)) => format!("`{id}`"),
                (Some(name), None) => name.clone(),
                (None, None) => "anonymous".to_string(),
            },
            true,
        ),
        field(
            if appeal.kind == AppealKind::Complaint {
                "Category"
            } else {
                "Original reason"
            },
            &appeal.reason,
            true,
        ),
    ];
    if let Some(email) = &appeal.contact_email {
        fields.push(field("Contact", email, true));
    }

    Embed {
        title,
        description: truncate(&appeal.appeal_text, EMBED_DESCRIPTION_LIMIT),
        color,
        fields,
        timestamp: appeal.created_at,
        footer: EmbedFooter {
            text: format!("#{} · {}", appeal.id, appeal.status.as_str()),
        },
    }
}

fn moderation_embed(entry: &ModLogEntry) -> Embed {
    let mut fields = vec![
        field("Target", format!("`{}`", entry.target_id), true),
        field("Moderator", &entry.moderator, true),
    ];
    if let Some(minutes) = entry.duration_minutes {
        fields.push(field("Duration", format!("{minutes} minutes"), true));
    }

    Embed {
        title: format!("Moderation: {}", entry.action),
        description: truncate(
            entry.reason.as_deref().unwrap_or("No reason provided"),
            EMBED_DESCRIPTION_LIMIT,
        ),
        color: COLOR_MODERATION,
        fields,
        timestamp: entry.created_at,
        footer: EmbedFooter {
            text: format!("case #{}", entry.id),
        },
    }
}

/// Forwards submissions and moderation actions to Discord webhooks.
/// Delivery is best effort: failures are logged and counted, never returned.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    config: WebhooksConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhooksConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|err| {
                warn!("falling back to default webhook client: {err}");
                Client::new()
            });
        Self { client, config }
    }

    pub async fn notify_appeal(&self, appeal: &Appeal) {
        self.deliver("appeals", self.config.appeals.as_deref(), appeal_embed(appeal))
            .await;
    }

    pub async fn notify_complaint(&self, complaint: &Appeal) {
        self.deliver(
            "complaints",
            self.config.complaints.as_deref(),
            appeal_embed(complaint),
        )
        .await;
    }

    pub async fn notify_moderation(&self, entry: &ModLogEntry) {
        self.deliver(
            "mod_log",
            self.config.mod_log.as_deref(),
            moderation_embed(entry),
        )
        .await;
    }

    async fn deliver(&self, channel: &str, url: Option<&str>, embed: Embed) {
        let Some(url) = url else {
            debug!(channel, "no webhook configured; skipping notification");
            return;
        };

        let payload = WebhookPayload {
            username: &self.config.username,
            embeds: vec![embed],
        };

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(channel, "webhook notification delivered");
            }
            Ok(response) => {
                Metrics::webhook_failed();
                warn!(channel, status = %response.status(), "webhook rejected notification");
            }
            Err(err) => {
                Metrics::webhook_failed();
                warn!(channel, "webhook delivery failed: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::db::AppealStatus;

    fn appeal(kind: AppealKind) -> Appeal {
        let now = Utc::now();
        Appeal {
            id: 12,
            kind,
            discord_id: Some("123456789012345678".to_string()),
            discord_username: Some("wanderer".to_string()),
            reason: "spam".to_string(),
            appeal_text: "x".repeat(5000),
            contact_email: None,
            status: AppealStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn appeal_embed_truncates_long_text() {
        let embed = appeal_embed(&appeal(AppealKind::Ban));
        assert_eq!(embed.title, "New ban appeal");
        assert_eq!(embed.description.chars().count(), EMBED_DESCRIPTION_LIMIT);
        assert!(embed.description.ends_with('…'));
        assert_eq!(embed.fields[0].value, "wanderer (`123456789012345678`)");
        assert_eq!(embed.footer.text, "#12 · pending");
    }

    #[test]
    fn anonymous_complaint_embed() {
        let mut complaint = appeal(AppealKind::Complaint);
        complaint.discord_id = None;
        complaint.discord_username = None;
        complaint.contact_email = Some("someone@example.com".to_string());

        let embed = appeal_embed(&complaint);
        assert_eq!(embed.color, COLOR_COMPLAINT);
        assert_eq!(embed.fields[0].value, "anonymous");
        assert_eq!(embed.fields[1].name, "Category");
        assert_eq!(embed.fields.len(), 3);
    }

    #[test]
    fn payload_matches_discord_shape() {
        let entry = ModLogEntry {
            id: 4,
            action: "timeout".to_string(),
            target_id: "42".to_string(),
            moderator: "admin".to_string(),
            reason: None,
            duration_minutes: Some(30),
            created_at: Utc::now(),
        };
        let payload = WebhookPayload {
            username: "The Conclave",
            embeds: vec![moderation_embed(&entry)],
        };
        let value: Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["username"], "The Conclave");
        assert_eq!(value["embeds"][0]["title"], "Moderation: timeout");
        assert_eq!(value["embeds"][0]["description"], "No reason provided");
        assert_eq!(value["embeds"][0]["fields"][2]["value"], "30 minutes");
        assert!(value["embeds"][0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn missing_url_is_skipped() {
        let notifier = WebhookNotifier::new(WebhooksConfig::default());
        notifier.notify_appeal(&appeal(AppealKind::Ban)).await;
    }
}
