//! Typed ID definitions for all domain entities.
//!
//! ```rust
//! use marketplace_core::common::{ManufacturerId, ModelId};
//!
//! let manufacturer_id = ManufacturerId::new(1);
//! let model_id = ModelId::new(1);
//!
//! // Same raw key, incompatible types:
//! // let wrong: ModelId = manufacturer_id;
//! # let _ = (manufacturer_id, model_id);
//! ```

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Manufacturer entities (Toyota, Nissan, ...).
pub struct Manufacturer;

/// Marker type for vehicle Model entities (scoped to a manufacturer).
pub struct VehicleModel;

/// Marker type for Vehicle listings.
pub struct Vehicle;

/// Marker type for ScraperJob entities.
pub struct ScraperJob;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Manufacturer entities.
pub type ManufacturerId = Id<Manufacturer>;

/// Typed ID for Model entities.
pub type ModelId = Id<VehicleModel>;

/// Typed ID for Vehicle entities.
pub type VehicleId = Id<Vehicle>;

/// Typed ID for ScraperJob entities.
pub type ScraperJobId = Id<ScraperJob>;
