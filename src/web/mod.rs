use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use salvo::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::community::RoleDirectory;
use crate::config::Config;
use crate::db::DatabaseManager;
use crate::discord::GuildDirectory;
use crate::rate_limit::FixedWindowLimiter;
use crate::webhook::WebhookNotifier;

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;

pub use self::error::ApiError;
use self::routes::create_router;

/// Everything a handler needs, injected into the depot once per request.
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<DatabaseManager>,
    pub directory: Arc<dyn GuildDirectory>,
    pub roles: RoleDirectory,
    pub notifier: WebhookNotifier,
    pub limiter: Arc<FixedWindowLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        db: Arc<DatabaseManager>,
        directory: Arc<dyn GuildDirectory>,
    ) -> Self {
        Self {
            roles: RoleDirectory::from_config(&config.roles),
            notifier: WebhookNotifier::new(config.webhooks.clone()),
            limiter: Arc::new(FixedWindowLimiter::from_config(&config.rate_limit)),
            started_at: Instant::now(),
            config,
            db,
            directory,
        }
    }

    /// Records an analytics event; failures are logged and dropped.
    pub async fn track(&self, event_type: &str, metadata: Value, now: DateTime<Utc>) {
        if let Err(err) = self
            .db
            .analytics_store()
            .record_event(event_type, &metadata, now)
            .await
        {
            warn!(event_type, "failed to record analytics event: {err}");
        }
    }

    /// Appends to the admin audit log; failures are logged and dropped.
    pub async fn audit(&self, actor: &str, action: &str, details: Value) {
        if let Err(err) = self
            .db
            .audit_log_store()
            .append_admin_log(actor, action, &details, Utc::now())
            .await
        {
            warn!(actor, action, "failed to write admin log: {err}");
        }
    }
}

pub fn app_state(depot: &Depot) -> Result<Arc<AppState>, ApiError> {
    depot
        .obtain::<Arc<AppState>>()
        .cloned()
        .map_err(|_| ApiError::Internal("application state missing from depot".into()))
}

pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Periodically drops expired rate-limit windows.
    pub fn spawn_limiter_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.state.limiter.clone();
        let every = Duration::from_secs(self.state.config.rate_limit.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep(Instant::now());
            }
        })
    }

    pub async fn start(&self) -> Result<()> {
        let server = &self.state.config.server;
        let bind_addr = format!("{}:{}", server.bind_address, server.port);
        info!("starting web server on {}", bind_addr);
        if let Some(public_url) = &server.public_url {
            info!("public url: {}", public_url);
        }
        info!(
            window_secs = self.state.limiter.window().as_secs(),
            max_requests = self.state.limiter.max_requests(),
            "rate limiting POST /api requests"
        );

        let acceptor = TcpListener::new(bind_addr).bind().await;
        Server::new(acceptor)
            .serve(create_router(self.state.clone()))
            .await;

        Ok(())
    }
}
