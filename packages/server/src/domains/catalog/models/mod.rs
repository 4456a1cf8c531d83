pub mod manufacturer;
pub mod vehicle;
pub mod vehicle_model;

pub use manufacturer::*;
pub use vehicle::*;
pub use vehicle_model::*;
