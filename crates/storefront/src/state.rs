//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::RepositoryError;
use crate::db::settings::{get_settings, save_settings};
use crate::models::StoreSettings;
use crate::services::events::{EventBus, StoreEvent};
use crate::services::pix::{PixClient, PixError};

/// How long store settings are served from memory.
const SETTINGS_TTL: Duration = Duration::from_secs(60);

/// Single cache slot for [`StoreSettings`].
const SETTINGS_KEY: &str = "store_settings";

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    pix: PixClient,
    events: EventBus,
    settings: Cache<&'static str, StoreSettings>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `PixError` if the PIX HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, PixError> {
        let pix = PixClient::new(&config.pix)?;
        let settings = Cache::builder()
            .max_capacity(1)
            .time_to_live(SETTINGS_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                pix,
                events: EventBus::default(),
                settings,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn pix(&self) -> &PixClient {
        &self.inner.pix
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Current store settings, cached for up to a minute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the settings cannot be loaded.
    pub async fn settings(&self) -> Result<StoreSettings, RepositoryError> {
        if let Some(cached) = self.inner.settings.get(SETTINGS_KEY).await {
            return Ok(cached);
        }
        let settings = get_settings(&self.inner.pool).await?;
        self.inner.settings.insert(SETTINGS_KEY, settings).await;
        Ok(settings)
    }

    /// Persist new settings, refresh the cache and notify open sessions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the settings cannot be saved.
    pub async fn set_settings(&self, settings: StoreSettings) -> Result<(), RepositoryError> {
        save_settings(&self.inner.pool, &settings).await?;
        self.inner.settings.insert(SETTINGS_KEY, settings).await;
        self.inner
            .events
            .publish(StoreEvent::SettingsChanged { settings });
        Ok(())
    }

    /// Seed the settings cache without touching the database.
    pub async fn prime_settings(&self, settings: StoreSettings) {
        self.inner.settings.insert(SETTINGS_KEY, settings).await;
    }
}
