//! Seed the settings table with the default user preferences

use sea_orm_migration::prelude::*;

use super::m20261001_000001_initial_schema::Settings;

#[derive(DeriveMigrationName)]
pub struct Migration;

const DEFAULT_SETTINGS: [(&str, &str); 5] = [
    ("theme", "dark"),
    ("test_mode", "quick"),
    ("format", "m3u"),
    ("dedupe", "false"),
    ("timeout_seconds", "10"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (key, value) in DEFAULT_SETTINGS {
            manager
                .exec_stmt(
                    Query::insert()
                        .into_table(Settings::Table)
                        .columns([Settings::Key, Settings::Value])
                        .values_panic([key.into(), value.into()])
                        .on_conflict(OnConflict::column(Settings::Key).do_nothing().to_owned())
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Settings::Table)
                    .and_where(
                        Expr::col(Settings::Key)
                            .is_in(DEFAULT_SETTINGS.iter().map(|(key, _)| *key)),
                    )
                    .to_owned(),
            )
            .await
    }
}
