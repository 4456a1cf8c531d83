//! Catalog domain - manufacturers, models and vehicle listings referenced by scraper jobs

pub mod models;

pub use models::{Manufacturer, Vehicle, VehicleModel};
