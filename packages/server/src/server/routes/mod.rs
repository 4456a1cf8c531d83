// HTTP routes
pub mod health;
pub mod scraper_jobs;
pub mod stream;
pub mod vehicles;

pub use health::*;
pub use scraper_jobs::*;
pub use stream::*;
pub use vehicles::*;
