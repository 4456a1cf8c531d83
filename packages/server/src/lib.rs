// Vehicle Export Marketplace - scraper orchestration core
//
// Launches external scraper processes, tracks them until they exit and keeps the
// scraper_jobs table in step with what actually happened.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
