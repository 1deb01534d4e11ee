//! SeaORM migrations for the settings, favorites and usage store

use sea_orm_migration::prelude::*;

pub mod m20261001_000001_initial_schema;
pub mod m20261001_000002_insert_defaults;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_initial_schema::Migration),
            Box::new(m20261001_000002_insert_defaults::Migration),
        ]
    }
}
