//! Core types for Cartwright.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use id::*;
pub use price::Price;
pub use quantity::{Quantity, QuantityError};
pub use status::*;
