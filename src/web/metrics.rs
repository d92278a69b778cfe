use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use once_cell::sync::Lazy;
use salvo::http::header::{CONTENT_TYPE, HeaderValue};
use salvo::prelude::*;

static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

static APPEALS_SUBMITTED: AtomicU64 = AtomicU64::new(0);
static COMPLAINTS_SUBMITTED: AtomicU64 = AtomicU64::new(0);
static MEMBERSHIP_CHECKS: AtomicU64 = AtomicU64::new(0);
static RATE_LIMITED_REQUESTS: AtomicU64 = AtomicU64::new(0);
static WEBHOOK_FAILURES: AtomicU64 = AtomicU64::new(0);
static DISCORD_ERRORS: AtomicU64 = AtomicU64::new(0);
static MODERATION_ACTIONS: AtomicU64 = AtomicU64::new(0);

/// Process-wide counters exported on `/metrics`.
pub struct Metrics;

impl Metrics {
    /// Pins the uptime origin; call once at startup.
    pub fn start_clock() {
        Lazy::force(&STARTED_AT);
    }

    pub fn uptime_secs() -> u64 {
        STARTED_AT.elapsed().as_secs()
    }

    pub fn appeal_submitted() {
        APPEALS_SUBMITTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn complaint_submitted() {
        COMPLAINTS_SUBMITTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn membership_checked() {
        MEMBERSHIP_CHECKS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rate_limited() {
        RATE_LIMITED_REQUESTS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn webhook_failed() {
        WEBHOOK_FAILURES.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discord_error() {
        DISCORD_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn moderation_action() {
        MODERATION_ACTIONS.fetch_add(1, Ordering::Relaxed);
    }
}

fn write_metric(out: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    out.push_str(&format!(
        "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n\n"
    ));
}

pub fn format_prometheus() -> String {
    let mut out = String::new();
    write_metric(
        &mut out,
        "conclave_uptime_seconds",
        "gauge",
        "Number of seconds the service has been running",
        Metrics::uptime_secs(),
    );
    for (name, help, counter) in [
        (
            "conclave_appeals_submitted_total",
            "Appeals accepted by the public endpoint",
            &APPEALS_SUBMITTED,
        ),
        (
            "conclave_complaints_submitted_total",
            "Complaints accepted by the public endpoint",
            &COMPLAINTS_SUBMITTED,
        ),
        (
            "conclave_membership_checks_total",
            "Guild membership verifications performed",
            &MEMBERSHIP_CHECKS,
        ),
        (
            "conclave_rate_limited_requests_total",
            "Requests rejected by the rate limiter",
            &RATE_LIMITED_REQUESTS,
        ),
        (
            "conclave_webhook_failures_total",
            "Webhook deliveries that failed",
            &WEBHOOK_FAILURES,
        ),
        (
            "conclave_discord_errors_total",
            "Discord API calls that failed",
            &DISCORD_ERRORS,
        ),
        (
            "conclave_moderation_actions_total",
            "Moderation actions applied by staff",
            &MODERATION_ACTIONS,
        ),
    ] {
        write_metric(&mut out, name, "counter", help, counter.load(Ordering::Relaxed));
    }
    out
}

#[handler]
pub async fn metrics_endpoint(res: &mut Response) {
    res.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    res.body(format_prometheus());
}
