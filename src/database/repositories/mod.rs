//! SeaORM repository implementations for the persistent store

pub mod favorites;
pub mod settings;
pub mod usage_stats;

pub use favorites::FavoriteSeaOrmRepository;
pub use settings::SettingsSeaOrmRepository;
pub use usage_stats::UsageStatsSeaOrmRepository;
