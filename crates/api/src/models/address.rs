//! Shipping details supplied by the address resolver.

use serde::{Deserialize, Serialize};

/// Shipping and contact fields copied onto an order when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
    pub email: String,
}
