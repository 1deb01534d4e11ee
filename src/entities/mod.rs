//! SeaORM entity definitions for the persistent store

pub mod prelude;

pub mod daily_stats;
pub mod favorites;
pub mod settings;
