pub mod scraper_job;

pub use scraper_job::*;
