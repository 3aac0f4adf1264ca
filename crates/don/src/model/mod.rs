//! Data model types for DON.
//!
//! This module contains the core types for representing DON data:
//! - Values (the in-memory tree) and frames
//! - Arbitrary-precision numbers
//! - Type descriptors, constraints and schemas
//! - The total order used by bounds and sorting

pub mod number;
pub mod order;
pub mod schema;
pub mod value;

pub use number::{BigInt, Decimal, NumberParseError};
pub use order::compare_values;
pub use schema::{
    ArrayType, Column, Constraints, EnumType, EnumVariant, Field, FrameType, IntWidth, ObjectType,
    Pattern, Schema, SchemaBuilder, SortOrder, TypeDescriptor,
};
pub use value::{Frame, FrameColumn, Object, Value};
