//! Scraper jobs domain - launching, supervising and cancelling scraper processes

pub mod actions;
pub mod effects;
pub mod error;
pub mod models;

pub use effects::{CleanExitPolicy, JobOutcome, ProcessExit};
pub use error::{ProcessFailure, ScraperJobError, ScraperJobResult};
pub use models::{JobStatus, NewScraperJob, ScraperJob, ScraperJobSummary};
