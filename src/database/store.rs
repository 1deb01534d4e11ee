//! Facade over the store repositories
//!
//! Writes go through a single async mutex so concurrent workflow tasks never
//! interleave read-modify-write sequences on SQLite; reads are not serialized.

use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::Database;
use super::repositories::{
    FavoriteSeaOrmRepository, SettingsSeaOrmRepository, UsageStatsSeaOrmRepository,
};
use crate::errors::{StoreError, StoreResult};
use crate::models::{Favorite, SaveFavoriteRequest, Settings, UsageDelta, UsageStat};

#[derive(Clone)]
pub struct PersistentStore {
    settings: SettingsSeaOrmRepository,
    favorites: FavoriteSeaOrmRepository,
    usage: UsageStatsSeaOrmRepository,
    write_lock: Arc<Mutex<()>>,
}

impl PersistentStore {
    pub fn new(database: &Database) -> Self {
        let connection = database.connection();
        Self {
            settings: SettingsSeaOrmRepository::new(connection.clone()),
            favorites: FavoriteSeaOrmRepository::new(connection.clone()),
            usage: UsageStatsSeaOrmRepository::new(connection),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    // Settings

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.settings.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.settings.set(key, value).await
    }

    pub async fn load_settings(&self) -> StoreResult<Settings> {
        self.settings.load().await
    }

    pub async fn save_settings(&self, settings: &Settings) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.settings.save(settings).await
    }

    // Favorites

    pub async fn upsert_favorite(&self, request: SaveFavoriteRequest) -> StoreResult<Favorite> {
        let _guard = self.write_lock.lock().await;
        debug!("Saving favorite '{}'", request.name);
        self.favorites.upsert(request).await
    }

    /// Favorites, newest first
    pub async fn list_favorites(&self) -> StoreResult<Vec<Favorite>> {
        self.favorites.list().await
    }

    pub async fn get_favorite(&self, url: &str) -> StoreResult<Favorite> {
        self.favorites
            .find_by_url(url)
            .await?
            .ok_or_else(|| StoreError::not_found("favorites", "url", url))
    }

    pub async fn delete_favorite(&self, url: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.favorites.delete(url).await
    }

    // Usage statistics

    /// Add `delta` to today's counters
    pub async fn record_usage(&self, delta: UsageDelta) -> StoreResult<()> {
        self.record_usage_on(Utc::now().date_naive(), delta).await
    }

    pub async fn record_usage_on(&self, date: NaiveDate, delta: UsageDelta) -> StoreResult<()> {
        if delta.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        self.usage.add(date, delta).await
    }

    pub async fn usage_for(&self, date: NaiveDate) -> StoreResult<Option<UsageStat>> {
        self.usage.find_by_date(date).await
    }

    /// Days with activity among the last `days` days including today, newest first
    pub async fn recent_usage(&self, days: u32) -> StoreResult<Vec<UsageStat>> {
        let today = Utc::now().date_naive();
        let since = today - Duration::days(i64::from(days.saturating_sub(1)));
        self.usage.since(since).await
    }

    pub async fn usage_totals(&self) -> StoreResult<UsageDelta> {
        self.usage.totals().await
    }
}
