use std::sync::Arc;
use std::time::Duration;

use admin::{ActionRegistry, UserAdmin};
use anyhow::Result;
use moka::future::Cache;
use sea_orm::Database;
use serde::Deserialize;

use crate::schemas::{AppState, CachedData};

/// Service settings, layered from defaults, `.env` and `HOUSEPARK_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    /// Lifetime of cached change-list aggregates
    pub facet_cache_ttl_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        config::Config::builder()
            .set_default("database_url", "sqlite://housepark.db?mode=rwc")?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("facet_cache_ttl_secs", 60_i64)?
            .add_source(config::Environment::with_prefix("HOUSEPARK").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

pub fn build_cache(ttl: Duration) -> Cache<String, CachedData> {
    Cache::builder().max_capacity(100).time_to_live(ttl).build()
}

/// Build the application state around a fresh connection to `database_url`.
pub async fn initialize_app_state_with_url(database_url: &str, settings: &Settings) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    let actions = ActionRegistry::user_actions();
    let admin = UserAdmin::with_actions(&actions);

    Ok(AppState {
        db,
        cache: build_cache(Duration::from_secs(settings.facet_cache_ttl_secs)),
        admin: Arc::new(admin),
        actions: Arc::new(actions),
    })
}
