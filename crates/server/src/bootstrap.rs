use std::sync::Arc;

use axum::{middleware, Router};
use loadline_core::config::{AppConfig, ConfigError, LoadOptions};
use loadline_core::negotiation::RatePolicy;
use loadline_db::repositories::{
    SqlCallRepository, SqlConversationRepository, SqlLoadRepository,
};
use loadline_db::{connect_with_settings, migrations, DbPool};
use loadline_fmcsa::{CarrierVerifier, FmcsaClient, StaticCarrierDirectory};
use thiserror::Error;
use tracing::info;

use crate::auth::{self, ApiKeyState};
use crate::calls::{self, CallsState};
use crate::negotiation::{self, NegotiationState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub policy: Arc<RatePolicy>,
    pub verifier: Arc<dyn CarrierVerifier>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("carrier registry client failed to initialize: {0}")]
    Fmcsa(#[source] loadline_fmcsa::FmcsaError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        call_id = "unknown",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        call_id = "unknown",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        call_id = "unknown",
        "database migrations applied"
    );

    let verifier = build_verifier(&config)?;
    let policy = Arc::new(RatePolicy::new(config.negotiation.clone()));

    Ok(Application { config, db_pool, policy, verifier })
}

fn build_verifier(config: &AppConfig) -> Result<Arc<dyn CarrierVerifier>, BootstrapError> {
    if config.fmcsa.enabled {
        let web_key = config.fmcsa.web_key.clone().unwrap_or_else(|| String::new().into());
        let client = FmcsaClient::new(&config.fmcsa.base_url, web_key, config.fmcsa.timeout_secs)
            .map_err(BootstrapError::Fmcsa)?;
        Ok(Arc::new(client))
    } else {
        Ok(Arc::new(StaticCarrierDirectory::with_demo_carriers()))
    }
}

/// Full authenticated API surface for the voice-agent webhooks.
pub fn api_router(app: &Application) -> Router {
    let negotiation_state = NegotiationState { policy: app.policy.clone() };
    let calls_state = CallsState {
        policy: app.policy.clone(),
        verifier: app.verifier.clone(),
        loads: Arc::new(SqlLoadRepository::new(app.db_pool.clone())),
        calls: Arc::new(SqlCallRepository::new(app.db_pool.clone())),
        conversations: Arc::new(SqlConversationRepository::new(app.db_pool.clone())),
    };
    let api_key_state = ApiKeyState::new(app.config.server.api_key.clone());

    Router::new()
        .merge(negotiation::router(negotiation_state))
        .merge(calls::router(calls_state))
        .layer(middleware::from_fn_with_state(api_key_state, auth::require_api_key))
}

#[cfg(test)]
mod tests {
    use loadline_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn memory_options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_builds_policy() {
        let app = bootstrap(memory_options("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('load', 'call', 'conversation', 'negotiation_event')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose baseline call-path tables");

        assert_eq!(app.config.negotiation.max_rounds, 3);
        assert!(!app.config.fmcsa.enabled, "demo directory should be the default verifier");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_fmcsa_enabled_without_web_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                fmcsa_enabled: Some(true),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("fmcsa.web_key"));
    }
}
