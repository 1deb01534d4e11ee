pub use super::daily_stats::Entity as DailyStats;
pub use super::favorites::Entity as Favorites;
pub use super::settings::Entity as Settings;
