//! Key/value settings repository

use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::str::FromStr;
use std::sync::Arc;

use crate::entities::{prelude::Settings as SettingsEntity, settings};
use crate::errors::{StoreError, StoreResult};
use crate::models::Settings;

#[derive(Clone)]
pub struct SettingsSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl SettingsSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Read a raw setting
    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let model = SettingsEntity::find_by_id(key.to_string())
            .one(&*self.connection)
            .await?;
        Ok(model.map(|m| m.value))
    }

    /// Insert or replace a raw setting
    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let active_model = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
        };
        SettingsEntity::insert(active_model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_column(settings::Column::Value)
                    .to_owned(),
            )
            .exec(&*self.connection)
            .await?;
        Ok(())
    }

    /// Read every known setting into a typed record
    ///
    /// Missing keys take their default; unparsable values are an error.
    pub async fn load(&self) -> StoreResult<Settings> {
        let mut settings = Settings::default();
        for model in SettingsEntity::find().all(&*self.connection).await? {
            let value = model.value.as_str();
            match model.key.as_str() {
                Settings::KEY_THEME => settings.theme = value.to_string(),
                Settings::KEY_TEST_MODE => settings.test_mode = parse_value(&model.key, value)?,
                Settings::KEY_FORMAT => settings.format = parse_value(&model.key, value)?,
                Settings::KEY_DEDUPE => settings.dedupe = parse_value(&model.key, value)?,
                Settings::KEY_TIMEOUT_SECONDS => {
                    settings.timeout_seconds = parse_value(&model.key, value)?
                }
                _ => {}
            }
        }
        Ok(settings)
    }

    pub async fn save(&self, settings: &Settings) -> StoreResult<()> {
        for (key, value) in settings.to_pairs() {
            self.set(key, &value).await?;
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> StoreResult<T> {
    value.trim().parse().map_err(|_| StoreError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
