use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::config::AppealsConfig;
use crate::db::{Appeal, AppealKind, NewAppeal};
use crate::discord::parse_snowflake;

pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MAX_REASON_LENGTH: usize = 200;
const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("unknown appeal type '{0}'")]
    UnknownKind(String),
    #[error("complaints are submitted through /api/complaints")]
    ComplaintKind,
    #[error("discordId must be a Discord user id")]
    InvalidDiscordId,
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("contactEmail is not a valid email address")]
    InvalidEmail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppealSubmission {
    #[serde(rename = "type")]
    pub kind: String,
    pub discord_id: String,
    pub discord_username: String,
    pub reason: String,
    pub appeal_text: String,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintSubmission {
    #[serde(default)]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub discord_username: Option<String>,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub contact_email: Option<String>,
}

fn required<'a>(value: &'a str, field: &'static str, max: usize) -> Result<&'a str, SubmissionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SubmissionError::Missing { field });
    }
    if value.chars().count() > max {
        return Err(SubmissionError::TooLong { field, max });
    }
    Ok(value)
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_text(text: &str, field: &'static str, config: &AppealsConfig) -> Result<String, SubmissionError> {
    let text = text.trim();
    let length = text.chars().count();
    if length == 0 {
        return Err(SubmissionError::Missing { field });
    }
    if length < config.min_text_length {
        return Err(SubmissionError::TooShort {
            field,
            min: config.min_text_length,
        });
    }
    if length > config.max_text_length {
        return Err(SubmissionError::TooLong {
            field,
            max: config.max_text_length,
        });
    }
    Ok(text.to_string())
}

fn check_email(email: Option<&str>) -> Result<Option<String>, SubmissionError> {
    match optional(email) {
        None => Ok(None),
        Some(email) if email.len() <= MAX_EMAIL_LENGTH && EMAIL_RE.is_match(email) => {
            Ok(Some(email.to_string()))
        }
        Some(_) => Err(SubmissionError::InvalidEmail),
    }
}

fn check_discord_id(raw: &str) -> Result<String, SubmissionError> {
    parse_snowflake(raw)
        .map(|id| id.to_string())
        .map_err(|_| SubmissionError::InvalidDiscordId)
}

impl AppealSubmission {
    pub fn validate(&self, config: &AppealsConfig) -> Result<NewAppeal, SubmissionError> {
        let kind = match self.kind.trim().to_ascii_lowercase().parse::<AppealKind>() {
            Ok(AppealKind::Complaint) => return Err(SubmissionError::ComplaintKind),
            Ok(kind) => kind,
            Err(_) => return Err(SubmissionError::UnknownKind(self.kind.clone())),
        };

        Ok(NewAppeal {
            kind,
            discord_id: Some(check_discord_id(&self.discord_id)?),
            discord_username: Some(
                required(&self.discord_username, "discordUsername", MAX_USERNAME_LENGTH)?
                    .to_string(),
            ),
            reason: required(&self.reason, "reason", MAX_REASON_LENGTH)?.to_string(),
            appeal_text: check_text(&self.appeal_text, "appealText", config)?,
            contact_email: check_email(self.contact_email.as_deref())?,
        })
    }
}

impl ComplaintSubmission {
    /// Anonymous complaints are allowed; a given id must still be valid.
    pub fn validate(&self, config: &AppealsConfig) -> Result<NewAppeal, SubmissionError> {
        let discord_id = optional(self.discord_id.as_deref())
            .map(check_discord_id)
            .transpose()?;
        let discord_username = match optional(self.discord_username.as_deref()) {
            Some(name) => Some(required(name, "discordUsername", MAX_USERNAME_LENGTH)?.to_string()),
            None => None,
        };

        Ok(NewAppeal {
            kind: AppealKind::Complaint,
            discord_id,
            discord_username,
            reason: required(&self.category, "category", MAX_REASON_LENGTH)?.to_string(),
            appeal_text: check_text(&self.description, "description", config)?,
            contact_email: check_email(self.contact_email.as_deref())?,
        })
    }
}

/// Time left before `previous`'s author may submit again, if any.
pub fn cooldown_remaining(
    previous: Option<&Appeal>,
    now: DateTime<Utc>,
    cooldown_hours: i64,
) -> Option<Duration> {
    let previous = previous?;
    let ends_at = previous.created_at + Duration::hours(cooldown_hours);
    (ends_at > now).then(|| ends_at - now)
}

/// Whole seconds for a `Retry-After` header, rounded up and at least one.
pub fn retry_after_secs(remaining: Duration) -> u64 {
    let millis = remaining.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}

/// Human wording for a wait, in whole hours once it reaches an hour.
pub fn describe_wait(remaining: Duration) -> String {
    let minutes = (remaining.num_seconds().max(0) as u64).div_ceil(60).max(1);
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    plural(minutes.div_ceil(60), "hour")
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AppealStatus;

    fn submission() -> AppealSubmission {
        AppealSubmission {
            kind: "ban".to_string(),
            discord_id: "123456789012345678".to_string(),
            discord_username: "wanderer".to_string(),
            reason: "Posting invite links".to_string(),
            appeal_text: "My account was compromised and I have since secured it.".to_string(),
            contact_email: None,
        }
    }

    #[test]
    fn valid_submission_becomes_new_appeal() {
        let appeal = submission().validate(&AppealsConfig::default()).unwrap();
        assert_eq!(appeal.kind, AppealKind::Ban);
        assert_eq!(appeal.discord_id.as_deref(), Some("123456789012345678"));
        assert!(appeal.contact_email.is_none());
    }

    #[test]
    fn mute_is_accepted_as_timeout() {
        let mut mute = submission();
        mute.kind = "Mute".to_string();
        assert_eq!(
            mute.validate(&AppealsConfig::default()).unwrap().kind,
            AppealKind::Timeout
        );
    }

    #[test]
    fn rejects_bad_fields() {
        let config = AppealsConfig::default();

        let mut bad = submission();
        bad.kind = "exile".to_string();
        assert_eq!(
            bad.validate(&config).unwrap_err(),
            SubmissionError::UnknownKind("exile".to_string())
        );

        let mut bad = submission();
        bad.kind = "complaint".to_string();
        assert_eq!(bad.validate(&config).unwrap_err(), SubmissionError::ComplaintKind);

        let mut bad = submission();
        bad.discord_id = "wanderer#0001".to_string();
        assert_eq!(bad.validate(&config).unwrap_err(), SubmissionError::InvalidDiscordId);

        let mut bad = submission();
        bad.discord_username = "x".repeat(65);
        assert_eq!(
            bad.validate(&config).unwrap_err(),
            SubmissionError::TooLong {
                field: "discordUsername",
                max: 64
            }
        );

        let mut bad = submission();
        bad.reason = "  ".to_string();
        assert_eq!(
            bad.validate(&config).unwrap_err(),
            SubmissionError::Missing { field: "reason" }
        );

        let mut bad = submission();
        bad.appeal_text = "sorry".to_string();
        assert_eq!(
            bad.validate(&config).unwrap_err(),
            SubmissionError::TooShort {
                field: "appealText",
                min: 20
            }
        );

        let mut bad = submission();
        bad.contact_email = Some("not-an-email".to_string());
        assert_eq!(bad.validate(&config).unwrap_err(), SubmissionError::InvalidEmail);
    }

    #[test]
    fn blank_email_is_treated_as_absent() {
        let mut appeal = submission();
        appeal.contact_email = Some("   ".to_string());
        assert!(
            appeal
                .validate(&AppealsConfig::default())
                .unwrap()
                .contact_email
                .is_none()
        );
    }

    #[test]
    fn anonymous_complaint_is_valid() {
        let complaint = ComplaintSubmission {
            discord_id: None,
            discord_username: Some(String::new()),
            category: "harassment".to_string(),
            description: "A member keeps sending unwanted DMs after being asked to stop.".to_string(),
            contact_email: Some("reporter@example.com".to_string()),
        };
        let appeal = complaint.validate(&AppealsConfig::default()).unwrap();
        assert_eq!(appeal.kind, AppealKind::Complaint);
        assert!(appeal.discord_id.is_none());
        assert!(appeal.discord_username.is_none());
        assert_eq!(appeal.reason, "harassment");
    }

    #[test]
    fn cooldown_covers_the_configured_window() {
        let now = Utc::now();
        let previous = Appeal {
            id: 1,
            kind: AppealKind::Ban,
            discord_id: Some("123456789012345678".to_string()),
            discord_username: None,
            reason: "spam".to_string(),
            appeal_text: "text".to_string(),
            contact_email: None,
            status: AppealStatus::Pending,
            created_at: now - Duration::hours(23),
            updated_at: now,
        };

        let remaining = cooldown_remaining(Some(&previous), now, 24).unwrap();
        assert_eq!(remaining, Duration::hours(1));
        assert_eq!(retry_after_secs(remaining), 3600);

        assert!(cooldown_remaining(Some(&previous), now + Duration::hours(1), 24).is_none());
        assert!(cooldown_remaining(None, now, 24).is_none());
    }

    #[test]
    fn waits_read_naturally() {
        assert_eq!(describe_wait(Duration::seconds(20)), "1 minute");
        assert_eq!(describe_wait(Duration::minutes(45)), "45 minutes");
        assert_eq!(describe_wait(Duration::minutes(60)), "1 hour");
        assert_eq!(describe_wait(Duration::minutes(90)), "2 hours");
        assert_eq!(describe_wait(Duration::hours(23)), "23 hours");
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::milliseconds(1)), 1);
        assert_eq!(retry_after_secs(Duration::milliseconds(1500)), 2);
        assert_eq!(retry_after_secs(Duration::zero()), 1);
    }
}
