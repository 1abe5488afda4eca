//! Order, order line, and payment types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartwright_core::{
    OrderId, OrderLineId, OrderStatus, PaymentStatus, Price, ProductId, Quantity,
    StatusTransitionError, TransactionId, UserId,
};

use super::ShippingDetails;

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Opaque ID minted at creation. Immutable.
    pub order_id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Shipping fields snapshotted from the resolved address.
    #[serde(flatten)]
    pub shipping: ShippingDetails,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// When the order was committed.
    pub created_at: DateTime<Utc>,
}

/// An order line as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    /// Unit price observed under the row lock when the order was placed.
    pub cost: Price,
}

impl OrderLine {
    /// `quantity * cost`.
    #[must_use]
    pub fn total(&self) -> Price {
        self.cost.times(self.quantity)
    }
}

/// An order line that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub cost: Price,
}

/// The payment stub created alongside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub transaction_id: TransactionId,
    pub order_id: OrderId,
    /// Sum of `quantity * cost` over the order's lines.
    pub amount: Price,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Result of a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub transaction_id: TransactionId,
    pub amount: Price,
}

/// An order with its lines and payment, as returned to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub payment: Option<Payment>,
}

/// Whitelisted mutable fields of an order. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
    pub email: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderPatch {
    /// Apply the patch to `order`.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` if the requested status change is not
    /// allowed; `order` is left untouched in that case.
    pub fn apply(self, order: &mut Order) -> Result<(), StatusTransitionError> {
        if let Some(status) = self.status {
            order.status = order.status.transition_to(status)?;
        }

        let shipping = &mut order.shipping;
        let fields = [
            (self.first_name, &mut shipping.first_name),
            (self.last_name, &mut shipping.last_name),
            (self.street_address, &mut shipping.street_address),
            (self.city, &mut shipping.city),
            (self.state, &mut shipping.state),
            (self.country, &mut shipping.country),
            (self.zip_code, &mut shipping.zip_code),
            (self.email, &mut shipping.email),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }

        Ok(())
    }

    /// Whether any shipping field is present and blank.
    #[must_use]
    pub fn has_blank_field(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.street_address,
            &self.city,
            &self.state,
            &self.country,
            &self.zip_code,
            &self.email,
        ]
        .into_iter()
        .flatten()
        .any(|v| v.trim().is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            order_id: OrderId::generate(),
            user_id: UserId::new(1),
            shipping: ShippingDetails {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                street_address: "12 Analytical Way".to_string(),
                city: "London".to_string(),
                state: "LDN".to_string(),
                country: "GB".to_string(),
                zip_code: "N1".to_string(),
                email: "ada@example.com".to_string(),
            },
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_patch_updates_only_present_fields() {
        let mut order = order();
        let patch = OrderPatch {
            city: Some("Cambridge".to_string()),
            ..OrderPatch::default()
        };
        patch.apply(&mut order).unwrap();
        assert_eq!(order.shipping.city, "Cambridge");
        assert_eq!(order.shipping.street_address, "12 Analytical Way");
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_patch_rejects_reopening_and_leaves_order_untouched() {
        let mut order = order();
        order.status = OrderStatus::Cancelled;
        let patch = OrderPatch {
            city: Some("Paris".to_string()),
            status: Some(OrderStatus::Pending),
            ..OrderPatch::default()
        };
        assert!(patch.apply(&mut order).is_err());
        assert_eq!(order.shipping.city, "London");
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_blank_field_detection() {
        let patch = OrderPatch {
            zip_code: Some("  ".to_string()),
            ..OrderPatch::default()
        };
        assert!(patch.has_blank_field());
        assert!(!OrderPatch::default().has_blank_field());
    }

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            id: OrderLineId::new(1),
            order_id: OrderId::generate(),
            product_id: ProductId::new(1),
            quantity: Quantity::new(3).unwrap(),
            cost: Price::from_cents(250),
        };
        assert_eq!(line.total(), Price::from_cents(750));
    }
}
