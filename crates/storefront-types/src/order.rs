//! Order record types for the storefront.
//!
//! This module defines the persisted order record and the payload used to
//! place a new one. The status attribute is governed by the rules in
//! [`crate::status`].

use serde::{Deserialize, Serialize};

use crate::OrderStatus;

/// A customer purchase as persisted by the order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Numeric identifier allocated at creation.
	pub id: u64,
	/// Human-facing order reference, e.g. `ORD-000042`.
	pub order_number: String,
	pub customer_name: String,
	pub customer_email: String,
	pub customer_phone: String,
	/// Delivery address.
	pub address: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selected_size: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selected_color: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delivery_preferences: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Line items.
	#[serde(default)]
	pub items: Vec<OrderItem>,
	/// Order total in minor currency units.
	pub total_cents: u64,
	/// Unix timestamp of creation.
	pub created_at: u64,
	/// Unix timestamp of the last write.
	pub updated_at: u64,
}

/// A single line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	pub product_id: u64,
	pub product_name: String,
	pub quantity: u32,
	/// Unit price in minor currency units.
	pub price_cents: u64,
}

impl OrderItem {
	/// Price of the line, `quantity * price_cents`.
	pub fn subtotal_cents(&self) -> u64 {
		self.price_cents.saturating_mul(u64::from(self.quantity))
	}
}

/// Payload for placing an order. Status and identifiers are assigned by the
/// order store; every new order starts as [`OrderStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
	pub customer_name: String,
	pub customer_email: String,
	pub customer_phone: String,
	pub address: String,
	#[serde(default)]
	pub selected_size: Option<String>,
	#[serde(default)]
	pub selected_color: Option<String>,
	#[serde(default)]
	pub delivery_preferences: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
	pub items: Vec<OrderItem>,
}

impl NewOrder {
	/// Sum of all line subtotals.
	pub fn total_cents(&self) -> u64 {
		self.items
			.iter()
			.fold(0u64, |acc, item| acc.saturating_add(item.subtotal_cents()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(quantity: u32, price_cents: u64) -> OrderItem {
		OrderItem {
			product_id: 1,
			product_name: "Linen shirt".to_string(),
			quantity,
			price_cents,
		}
	}

	#[test]
	fn test_total_sums_line_subtotals() {
		let order = NewOrder {
			customer_name: "Abebe".to_string(),
			customer_email: "abebe@example.com".to_string(),
			customer_phone: "+251911000000".to_string(),
			address: "Bole, Addis Ababa".to_string(),
			selected_size: None,
			selected_color: None,
			delivery_preferences: None,
			notes: None,
			items: vec![item(2, 150_000), item(1, 99_900)],
		};

		assert_eq!(order.total_cents(), 399_900);
	}

	#[test]
	fn test_order_wire_format() {
		let order = Order {
			id: 7,
			order_number: "ORD-000007".to_string(),
			customer_name: "Sara".to_string(),
			customer_email: "sara@example.com".to_string(),
			customer_phone: "+251922000000".to_string(),
			address: "Piassa".to_string(),
			selected_size: Some("M".to_string()),
			selected_color: None,
			delivery_preferences: None,
			notes: None,
			status: OrderStatus::Paid,
			items: vec![item(1, 5_000)],
			total_cents: 5_000,
			created_at: 1_700_000_000,
			updated_at: 1_700_000_100,
		};

		let json = serde_json::to_value(&order).unwrap();
		assert_eq!(json["status"], "paid");
		assert_eq!(json["orderNumber"], "ORD-000007");
		assert_eq!(json["selectedSize"], "M");
		assert!(json.get("selectedColor").is_none());

		let back: Order = serde_json::from_value(json).unwrap();
		assert_eq!(back, order);
	}
}
