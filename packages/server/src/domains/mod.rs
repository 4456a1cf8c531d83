// Business domains
pub mod catalog;
pub mod scraper_jobs;
