//! Domain models for the order engine.
//!
//! These types represent validated domain objects separate from database row types.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;

pub use address::ShippingDetails;
pub use cart::CartLine;
pub use order::{NewOrderLine, Order, OrderDetails, OrderLine, OrderPatch, Payment, PlacedOrder};
pub use product::{Page, Product};
