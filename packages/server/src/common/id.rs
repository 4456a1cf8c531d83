//! Typed integer id wrappers for compile-time type safety.
//!
//! This module provides `Id<T>`, a typed wrapper around the `SERIAL` primary keys
//! used by every table in the marketplace schema. It prevents accidentally mixing
//! up different id types (e.g., passing a `ModelId` where a `ManufacturerId` was
//! expected) while staying a plain `i32` on the wire and in the database.
//!
//! # Example
//!
//! ```rust
//! use marketplace_core::common::Id;
//!
//! pub struct Manufacturer;
//! pub struct Model;
//!
//! pub type ManufacturerId = Id<Manufacturer>;
//! pub type ModelId = Id<Model>;
//!
//! let toyota = ManufacturerId::new(1);
//! assert_eq!(toyota.as_i32(), 1);
//!
//! // This would be a compile error:
//! // let wrong: ModelId = toyota;
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::num::ParseIntError;
use std::str::FromStr;

/// A typed wrapper around an `i32` surrogate key.
///
/// IDs with different `T` parameters are incompatible at compile time:
///
/// ```compile_fail
/// use marketplace_core::common::Id;
///
/// struct Vehicle;
/// struct Model;
///
/// let vehicle_id: Id<Vehicle> = Id::new(7);
/// let model_id: Id<Model> = vehicle_id; // Compile error!
/// ```
#[repr(transparent)]
pub struct Id<T>(i32, PhantomData<fn() -> T>);

// ============================================================================
// Core implementations
// ============================================================================

impl<T> Id<T> {
    /// Wraps a raw key, e.g. one assigned by the database on insert.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw, PhantomData)
    }

    /// Returns the inner key.
    #[inline]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// Parses an `Id` from a path segment or CLI argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid integer.
    #[inline]
    pub fn parse(s: &str) -> Result<Self, ParseIntError> {
        Ok(Self(s.trim().parse()?, PhantomData))
    }
}

// ============================================================================
// Standard trait implementations
// ============================================================================

impl<T> Clone for Id<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        f.debug_tuple(&format!("Id<{}>", short))
            .field(&self.0)
            .finish()
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for Id<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> From<i32> for Id<T> {
    #[inline]
    fn from(raw: i32) -> Self {
        Self::new(raw)
    }
}

impl<T> From<Id<T>> for i32 {
    #[inline]
    fn from(id: Id<T>) -> Self {
        id.0
    }
}

impl<T> FromStr for Id<T> {
    type Err = ParseIntError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Serde support
// ============================================================================

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i32::deserialize(deserializer).map(Self::new)
    }
}

// ============================================================================
// sqlx support
// ============================================================================

use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgHasArrayType, PgTypeInfo, PgValueRef, Postgres};
use sqlx::{Decode, Encode, Type};

impl<T> Type<Postgres> for Id<T> {
    fn type_info() -> PgTypeInfo {
        <i32 as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <i32 as Type<Postgres>>::compatible(ty)
    }
}

impl<T> PgHasArrayType for Id<T> {
    fn array_type_info() -> PgTypeInfo {
        <i32 as PgHasArrayType>::array_type_info()
    }
}

impl<T> Encode<'_, Postgres> for Id<T> {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <i32 as Encode<Postgres>>::encode_by_ref(&self.0, buf)
    }
}

impl<T> Decode<'_, Postgres> for Id<T> {
    fn decode(value: PgValueRef<'_>) -> Result<Self, BoxDynError> {
        <i32 as Decode<Postgres>>::decode(value).map(Self::new)
    }
}

// ============================================================================
// Tests
// ============================================================================
