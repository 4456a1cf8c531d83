//! Kernel module - server infrastructure and dependencies.

pub mod child_output;
pub mod deps;
pub mod process_registry;
pub mod scraper_command;
pub mod store;
pub mod stream_hub;
pub mod test_dependencies;
pub mod traits;

pub use child_output::OutputLines;
pub use deps::ServerDeps;
pub use process_registry::{ActiveProcess, ProcessRegistry, RegistryEntry};
pub use scraper_command::{validate_scrape_url, CommandError, ScraperCommand};
pub use store::PostgresStore;
pub use stream_hub::{JobLogEvent, JobLogHub};
pub use test_dependencies::InMemoryStore;
pub use traits::*;
