use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::DomainError;

/// Lifecycle state of an order. Persisted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn code(self) -> i32 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Cancelled => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: i32,
    pub price_per_item: f64,
}

impl OrderItemInput {
    pub fn new(product_id: impl Into<String>, quantity: i32, price_per_item: f64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            price_per_item,
        }
    }

    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.price_per_item
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub item_id: i32,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub price_per_item: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub items: Vec<OrderItem>,
}

/// Sum of quantity × unit price over the items, fixed when the order is placed.
pub fn total_amount(items: &[OrderItemInput]) -> f64 {
    items.iter().map(OrderItemInput::subtotal).sum()
}

pub fn validate_order(user_id: &str, items: &[OrderItemInput]) -> Result<(), DomainError> {
    if user_id.trim().is_empty() {
        return Err(DomainError::invalid("user_id must not be empty"));
    }
    for (i, item) in items.iter().enumerate() {
        if item.product_id.trim().is_empty() {
            return Err(DomainError::invalid(format!("item {i}: product_id must not be empty")));
        }
        if item.quantity <= 0 {
            return Err(DomainError::invalid(format!(
                "item {i}: quantity must be positive, got {}",
                item.quantity
            )));
        }
        if !item.price_per_item.is_finite() || item.price_per_item < 0.0 {
            return Err(DomainError::invalid(format!(
                "item {i}: price_per_item must be a non-negative number, got {}",
                item.price_per_item
            )));
        }
    }
    let total = total_amount(items);
    if !total.is_finite() {
        return Err(DomainError::invalid(format!(
            "total_amount must be a finite number, got {total}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_sum_of_quantity_times_price() {
        let items = vec![
            OrderItemInput::new("p1", 2, 10.0),
            OrderItemInput::new("p2", 1, 5.0),
        ];
        assert_eq!(total_amount(&items), 25.0);
    }

    #[test]
    fn order_whose_total_overflows_is_rejected() {
        let items = vec![OrderItemInput::new("p1", 2, 1e308)];
        let err = validate_order("user-1", &items).unwrap_err();
        assert!(matches!(&err, DomainError::InvalidInput(m) if m.contains("total_amount")));

        let items = vec![
            OrderItemInput::new("p1", 1, f64::MAX),
            OrderItemInput::new("p2", 1, f64::MAX),
        ];
        assert!(validate_order("user-1", &items).is_err());
    }

    #[test]
    fn total_of_no_items_is_zero() {
        assert_eq!(total_amount(&[]), 0.0);
    }

    #[test]
    fn status_codes_roundtrip_and_pending_is_zero() {
        assert_eq!(OrderStatus::Pending.code(), 0);
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(OrderStatus::from_code(5), None);
        assert_eq!(OrderStatus::from_code(-1), None);
    }

    #[test]
    fn status_serializes_as_upper_case_name() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Shipped).unwrap(),
            "\"SHIPPED\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
    }

    #[test]
    fn unknown_status_name_or_code_is_rejected() {
        assert!(serde_json::from_str::<OrderStatus>("\"LOST\"").is_err());
        assert!(serde_json::from_str::<OrderStatus>("7").is_err());
    }

    #[test]
    fn validate_order_rejects_bad_items() {
        assert!(validate_order("u1", &[OrderItemInput::new("p1", 1, 1.0)]).is_ok());
        assert!(validate_order("", &[]).is_err());
        assert!(validate_order("u1", &[OrderItemInput::new("", 1, 1.0)]).is_err());
        assert!(validate_order("u1", &[OrderItemInput::new("p1", 0, 1.0)]).is_err());
        assert!(validate_order("u1", &[OrderItemInput::new("p1", 1, -2.0)]).is_err());
    }
}
