//! Per-day usage counters

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;

use crate::entities::{daily_stats, prelude::*};
use crate::errors::StoreResult;
use crate::models::{UsageDelta, UsageStat};

#[derive(Clone)]
pub struct UsageStatsSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

#[derive(Debug, FromQueryResult)]
struct Totals {
    tested: Option<i64>,
    working: Option<i64>,
    channels: Option<i64>,
    files: Option<i64>,
}

impl UsageStatsSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Add `delta` to the counters of `date`, creating the row if needed
    pub async fn add(&self, date: NaiveDate, delta: UsageDelta) -> StoreResult<()> {
        let active_model = daily_stats::ActiveModel {
            date: Set(date),
            tested_count: Set(delta.tested),
            working_count: Set(delta.working),
            channel_count: Set(delta.channels),
            file_count: Set(delta.files),
            ..Default::default()
        };

        DailyStats::insert(active_model)
            .on_conflict(
                OnConflict::column(daily_stats::Column::Date)
                    .value(
                        daily_stats::Column::TestedCount,
                        Expr::col(daily_stats::Column::TestedCount).add(delta.tested),
                    )
                    .value(
                        daily_stats::Column::WorkingCount,
                        Expr::col(daily_stats::Column::WorkingCount).add(delta.working),
                    )
                    .value(
                        daily_stats::Column::ChannelCount,
                        Expr::col(daily_stats::Column::ChannelCount).add(delta.channels),
                    )
                    .value(
                        daily_stats::Column::FileCount,
                        Expr::col(daily_stats::Column::FileCount).add(delta.files),
                    )
                    .to_owned(),
            )
            .exec(&*self.connection)
            .await?;
        Ok(())
    }

    pub async fn find_by_date(&self, date: NaiveDate) -> StoreResult<Option<UsageStat>> {
        let model = DailyStats::find()
            .filter(daily_stats::Column::Date.eq(date))
            .one(&*self.connection)
            .await?;
        Ok(model.map(model_to_domain))
    }

    /// Rows on or after `since`, newest first
    pub async fn since(&self, since: NaiveDate) -> StoreResult<Vec<UsageStat>> {
        let models = DailyStats::find()
            .filter(daily_stats::Column::Date.gte(since))
            .order_by_desc(daily_stats::Column::Date)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    /// Sum of every counter over all days
    pub async fn totals(&self) -> StoreResult<UsageDelta> {
        let totals = DailyStats::find()
            .select_only()
            .column_as(daily_stats::Column::TestedCount.sum(), "tested")
            .column_as(daily_stats::Column::WorkingCount.sum(), "working")
            .column_as(daily_stats::Column::ChannelCount.sum(), "channels")
            .column_as(daily_stats::Column::FileCount.sum(), "files")
            .into_model::<Totals>()
            .one(&*self.connection)
            .await?;

        Ok(totals
            .map(|t| UsageDelta {
                tested: t.tested.unwrap_or(0),
                working: t.working.unwrap_or(0),
                channels: t.channels.unwrap_or(0),
                files: t.files.unwrap_or(0),
            })
            .unwrap_or_default())
    }
}

fn model_to_domain(model: daily_stats::Model) -> UsageStat {
    UsageStat {
        date: model.date,
        tested: model.tested_count,
        working: model.working_count,
        channels: model.channel_count,
        files: model.file_count,
    }
}
