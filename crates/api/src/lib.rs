//! Cartwright API library.
//!
//! The inventory-aware cart and order engine plus its JSON routes, exposed as
//! a library so the binary, the CLI, and the integration tests share one
//! implementation.
//!
//! # Layers
//!
//! - [`routes`] - axum handlers and the router
//! - [`services`] - cart, checkout, stock ledger, catalog cache
//! - [`db`] - storage seam with `PostgreSQL` and in-memory stores
//! - [`models`] - domain records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
