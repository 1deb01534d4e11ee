//! Favorite playlist links

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;

use crate::entities::{favorites, prelude::*};
use crate::errors::{StoreError, StoreResult};
use crate::models::{Favorite, SaveFavoriteRequest};

#[derive(Clone)]
pub struct FavoriteSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl FavoriteSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Create a favorite, or refresh name, expiry and count of an existing one
    ///
    /// The creation time of an existing favorite is kept.
    pub async fn upsert(&self, request: SaveFavoriteRequest) -> StoreResult<Favorite> {
        let active_model = favorites::ActiveModel {
            url: Set(request.url.clone()),
            name: Set(request.name),
            expiry: Set(request.expiry),
            channel_count: Set(request.channel_count),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        Favorites::insert(active_model)
            .on_conflict(
                OnConflict::column(favorites::Column::Url)
                    .update_columns([
                        favorites::Column::Name,
                        favorites::Column::Expiry,
                        favorites::Column::ChannelCount,
                    ])
                    .to_owned(),
            )
            .exec(&*self.connection)
            .await?;

        self.find_by_url(&request.url)
            .await?
            .ok_or_else(|| StoreError::not_found("favorites", "url", request.url))
    }

    pub async fn find_by_url(&self, url: &str) -> StoreResult<Option<Favorite>> {
        let model = Favorites::find()
            .filter(favorites::Column::Url.eq(url))
            .one(&*self.connection)
            .await?;
        Ok(model.map(model_to_domain))
    }

    /// All favorites, newest first
    pub async fn list(&self) -> StoreResult<Vec<Favorite>> {
        let models = Favorites::find()
            .order_by_desc(favorites::Column::CreatedAt)
            .order_by_desc(favorites::Column::Id)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    pub async fn delete(&self, url: &str) -> StoreResult<()> {
        let result = Favorites::delete_many()
            .filter(favorites::Column::Url.eq(url))
            .exec(&*self.connection)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::not_found("favorites", "url", url));
        }
        Ok(())
    }
}

fn model_to_domain(model: favorites::Model) -> Favorite {
    Favorite {
        url: model.url,
        name: model.name,
        expiry: model.expiry,
        channel_count: model.channel_count,
        created_at: model.created_at,
    }
}
