//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::email::EmailService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Outgoing mail is enabled when the configuration carries SMTP settings
    /// and the relay can be set up; otherwise reset links are only logged.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        let email = config
            .email
            .as_ref()
            .and_then(|email_config| match EmailService::new(email_config) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to configure SMTP, email disabled");
                    None
                }
            });

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}
