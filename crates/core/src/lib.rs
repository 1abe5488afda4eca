//! Cartwright Core - Shared types library.
//!
//! This crate provides the domain vocabulary used by every Cartwright component:
//! - `api` - JSON API and the inventory-aware order/cart engine
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database access,
//! no HTTP. Database codecs are compiled in only with the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, quantities, prices, and order/payment statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
