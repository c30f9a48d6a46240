//! Order API implementation.
//!
//! Order lookups, creation and status changes for the admin dashboard.
//! Status strings are parsed here, at the edge, so everything past this
//! module works with [`OrderStatus`] only.

use serde_json::json;
use storefront_core::{OrderStateError, ShopEngine};
use storefront_types::{
	APIError, NewOrder, OrderListResponse, OrderResponse, OrderStatus, StatusView,
	TransitionsResponse, UpdateOrderStatusRequest,
};
use tracing::{info, warn};

/// Handles GET /api/orders.
pub async fn list_orders(engine: &ShopEngine) -> Result<OrderListResponse, APIError> {
	let orders: Vec<OrderResponse> = engine
		.orders()
		.list_orders()
		.await
		.map_err(to_api_error)?
		.into_iter()
		.map(OrderResponse::from)
		.collect();

	Ok(OrderListResponse {
		total: orders.len(),
		orders,
	})
}

/// Handles GET /api/orders/{id}.
pub async fn get_order_by_id(id: &str, engine: &ShopEngine) -> Result<OrderResponse, APIError> {
	let order_id = parse_order_id(id)?;
	let order = engine
		.orders()
		.get_order(order_id)
		.await
		.map_err(to_api_error)?;
	Ok(order.into())
}

/// Handles POST /api/orders.
pub async fn create_order(
	request: NewOrder,
	engine: &ShopEngine,
) -> Result<OrderResponse, APIError> {
	let order = engine
		.orders()
		.create_order(request)
		.await
		.map_err(to_api_error)?;
	Ok(order.into())
}

/// Handles GET /api/orders/{id}/transitions.
///
/// Options come from the stored status, not from whatever the client last
/// rendered.
pub async fn get_transitions(
	id: &str,
	engine: &ShopEngine,
) -> Result<TransitionsResponse, APIError> {
	let order_id = parse_order_id(id)?;
	let (status, _) = engine
		.orders()
		.allowed_transitions(order_id)
		.await
		.map_err(to_api_error)?;

	Ok(TransitionsResponse {
		order_id,
		current: StatusView::from(status),
	})
}

/// Handles PATCH /api/orders/{id}/status.
pub async fn update_order_status(
	id: &str,
	request: UpdateOrderStatusRequest,
	engine: &ShopEngine,
) -> Result<OrderResponse, APIError> {
	let order_id = parse_order_id(id)?;
	let next = parse_status(&request.status)?;
	let expected = request
		.expected_status
		.as_deref()
		.map(parse_status)
		.transpose()?;

	info!(order_id, to = %next, "Status change requested");
	let order = engine
		.orders()
		.transition_order_status(order_id, expected, next)
		.await
		.map_err(to_api_error)?;
	Ok(order.into())
}

/// Order ids are plain decimal digits; `u64::from_str` alone would also
/// take a leading `+`.
fn parse_order_id(id: &str) -> Result<u64, APIError> {
	let invalid = || APIError::BadRequest {
		error_type: "INVALID_ORDER_ID".to_string(),
		message: format!("Order ID must be a positive integer: {}", id),
		details: None,
	};

	if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
		return Err(invalid());
	}
	id.parse().map_err(|_| invalid())
}

fn parse_status(value: &str) -> Result<OrderStatus, APIError> {
	value.parse().map_err(|_| {
		warn!("Rejected unknown status value {:?}", value);
		APIError::BadRequest {
			error_type: "INVALID_STATUS".to_string(),
			message: "Invalid status".to_string(),
			details: Some(json!({
				"status": value,
				"validStatuses": OrderStatus::ALL,
			})),
		}
	})
}

/// Maps order state errors onto HTTP error responses.
fn to_api_error(error: OrderStateError) -> APIError {
	match error {
		OrderStateError::OrderNotFound(id) => APIError::NotFound {
			error_type: "ORDER_NOT_FOUND".to_string(),
			message: format!("Order {} not found", id),
		},
		OrderStateError::Transition(e) => APIError::UnprocessableEntity {
			error_type: e.reason().as_str().to_string(),
			message: e.to_string(),
			details: Some(json!({
				"currentStatus": e.current(),
				"attemptedStatus": e.attempted(),
				"allowedStatuses": e.current().allowed_statuses(),
			})),
		},
		OrderStateError::StaleStatus {
			expected, actual, ..
		} => APIError::Conflict {
			error_type: "STATUS_CONFLICT".to_string(),
			message: error.to_string(),
			details: Some(json!({
				"expectedStatus": expected,
				"currentStatus": actual,
			})),
		},
		OrderStateError::Conflict(_) => APIError::Conflict {
			error_type: "STATUS_CONFLICT".to_string(),
			message: error.to_string(),
			details: None,
		},
		OrderStateError::InvalidOrder(message) => APIError::BadRequest {
			error_type: "INVALID_ORDER".to_string(),
			message,
			details: None,
		},
		OrderStateError::Storage(message) => {
			warn!("Storage failure: {}", message);
			APIError::InternalServerError {
				error_type: "STORAGE_ERROR".to_string(),
				message: "Order storage is unavailable".to_string(),
			}
		},
	}
}
