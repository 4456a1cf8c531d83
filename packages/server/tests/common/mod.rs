// Common test utilities
#![allow(dead_code)]

pub mod harness;
pub mod scripts;

pub use harness::*;
pub use scripts::*;
