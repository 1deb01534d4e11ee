//! m3u-sieve: IPTV playlist testing, country classification and filtered export

pub mod config;
pub mod database;
pub mod entities;
pub mod errors;
pub mod models;
pub mod playlist;
pub mod services;
pub mod utils;
