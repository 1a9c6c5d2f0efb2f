//! Inbound order-creation request and its validation.

use common::CustomerId;
use domain::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::{FulfillmentError, Result};

/// One requested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderItemRequest {
    #[serde(rename = "productID", default)]
    pub product_id: String,
    pub quantity: u32,
}

impl CreateOrderItemRequest {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Request to create an order, as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "customerID", default)]
    pub customer_id: String,

    #[serde(default)]
    pub items: Vec<CreateOrderItemRequest>,

    #[serde(rename = "shippingAddress", default)]
    pub shipping_address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A requested line after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
    pub shipping_address: String,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    pub fn new(customer_id: CustomerId, shipping_address: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            items: Vec::new(),
            shipping_address: shipping_address.into(),
            notes: None,
        }
    }

    pub fn item(mut self, product_id: impl Into<String>, quantity: u32) -> Self {
        self.items
            .push(CreateOrderItemRequest::new(product_id, quantity));
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the request shape. Does not touch any store.
    pub fn validate(&self) -> Result<ValidatedOrder> {
        if self.customer_id.trim().is_empty() {
            return Err(FulfillmentError::bad_request("customer ID is required"));
        }
        let customer_id = CustomerId::parse(&self.customer_id)
            .map_err(|err| FulfillmentError::bad_request(err.to_string()))?;

        if self.items.is_empty() {
            return Err(FulfillmentError::bad_request(
                "order must contain at least one item",
            ));
        }

        let lines = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let product_id = ProductId::new(item.product_id.trim());
                if product_id.is_blank() {
                    return Err(FulfillmentError::bad_request(format!(
                        "items[{index}]: product ID is required"
                    )));
                }
                if item.quantity == 0 {
                    return Err(FulfillmentError::bad_request(format!(
                        "items[{index}]: quantity must be greater than 0"
                    )));
                }
                Ok(OrderLine {
                    product_id,
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let shipping_address = self.shipping_address.trim();
        if shipping_address.is_empty() {
            return Err(FulfillmentError::bad_request("shipping address is required"));
        }

        Ok(ValidatedOrder {
            customer_id,
            lines,
            shipping_address: shipping_address.to_string(),
            notes: self
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|notes| !notes.is_empty())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn valid_request() -> CreateOrderRequest {
        CreateOrderRequest::new(CustomerId::new(), "1 Main St")
            .item("SKU-001", 2)
            .item("SKU-002", 1)
    }

    fn message_of(request: &CreateOrderRequest) -> String {
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        err.to_string()
    }

    #[test]
    fn test_valid_request() {
        let validated = valid_request().notes("  gift  ").validate().unwrap();

        assert_eq!(validated.lines.len(), 2);
        assert_eq!(validated.lines[0].product_id.as_str(), "SKU-001");
        assert_eq!(validated.lines[0].quantity, 2);
        assert_eq!(validated.notes.as_deref(), Some("gift"));
    }

    #[test]
    fn test_missing_customer() {
        let mut request = valid_request();
        request.customer_id = "  ".to_string();
        assert_eq!(message_of(&request), "customer ID is required");
    }

    #[test]
    fn test_malformed_customer() {
        let mut request = valid_request();
        request.customer_id = "not-a-uuid".to_string();
        assert!(message_of(&request).contains("invalid customer ID"));
    }

    #[test]
    fn test_no_items() {
        let mut request = valid_request();
        request.items.clear();
        assert_eq!(message_of(&request), "order must contain at least one item");
    }

    #[test]
    fn test_zero_quantity() {
        let request = valid_request().item("SKU-003", 0);
        assert_eq!(
            message_of(&request),
            "items[2]: quantity must be greater than 0"
        );
    }

    #[test]
    fn test_blank_product() {
        let request = valid_request().item(" ", 1);
        assert_eq!(message_of(&request), "items[2]: product ID is required");
    }

    #[test]
    fn test_blank_shipping_address() {
        let mut request = valid_request();
        request.shipping_address = String::new();
        assert_eq!(message_of(&request), "shipping address is required");
    }

    #[test]
    fn test_wire_field_names() {
        let customer = CustomerId::new();
        let json = serde_json::json!({
            "customerID": customer.to_string(),
            "items": [{"productID": "SKU-001", "quantity": 3}],
            "shippingAddress": "1 Main St",
        });

        let request: CreateOrderRequest = serde_json::from_value(json).unwrap();

        assert_eq!(request.customer_id, customer.to_string());
        assert_eq!(request.items, vec![CreateOrderItemRequest::new("SKU-001", 3)]);
        assert!(request.notes.is_none());
    }

    #[test]
    fn test_negative_quantity_is_rejected_by_deserialization() {
        let json = serde_json::json!({
            "customerID": CustomerId::new().to_string(),
            "items": [{"productID": "SKU-001", "quantity": -1}],
            "shippingAddress": "1 Main St",
        });
        assert!(serde_json::from_value::<CreateOrderRequest>(json).is_err());
    }
}
