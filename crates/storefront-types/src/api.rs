//! API types for the storefront admin HTTP API.
//!
//! Request and response payloads for the order management endpoints, plus
//! the structured error type the handlers return.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{allowed_statuses, is_terminal_status, Order, OrderStatus};

/// An option in a status selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOption {
	pub status: OrderStatus,
	pub label: String,
}

impl From<OrderStatus> for StatusOption {
	fn from(status: OrderStatus) -> Self {
		Self {
			status,
			label: status.label().to_string(),
		}
	}
}

/// Display projection of a status: its metadata and the choices a selector
/// should offer. A terminal status has no choices and renders as a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
	pub status: OrderStatus,
	pub label: String,
	pub color: String,
	pub description: String,
	pub terminal: bool,
	pub allowed_statuses: Vec<StatusOption>,
}

impl From<OrderStatus> for StatusView {
	fn from(status: OrderStatus) -> Self {
		Self {
			status,
			label: status.label().to_string(),
			color: status.color().to_string(),
			description: status.description().to_string(),
			terminal: is_terminal_status(status),
			allowed_statuses: allowed_statuses(status)
				.iter()
				.copied()
				.map(StatusOption::from)
				.collect(),
		}
	}
}

/// An order together with the view of its current status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
	#[serde(flatten)]
	pub order: Order,
	pub status_view: StatusView,
}

impl From<Order> for OrderResponse {
	fn from(order: Order) -> Self {
		let status_view = StatusView::from(order.status);
		Self { order, status_view }
	}
}

/// Response for GET /api/orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
	pub orders: Vec<OrderResponse>,
	pub total: usize,
}

/// Request body for PATCH /api/orders/{id}/status.
///
/// Statuses arrive as raw strings and are parsed at the boundary, so an
/// unknown value is reported as an invalid status rather than a generic
/// deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
	/// Requested next status.
	pub status: String,
	/// Status the caller saw when it offered the choice. When present the
	/// update is rejected if the stored status has moved on.
	#[serde(default)]
	pub expected_status: Option<String>,
}

/// Response for GET /api/orders/{id}/transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionsResponse {
	pub order_id: u64,
	pub current: StatusView,
}

/// Response for GET /api/order-statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResponse {
	pub statuses: Vec<StatusView>,
}

impl WorkflowResponse {
	/// The full workflow, one entry per status in declaration order.
	pub fn current() -> Self {
		Self {
			statuses: OrderStatus::all().map(StatusView::from).collect(),
		}
	}
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Bad request with validation errors (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Resource does not exist (404)
	NotFound { error_type: String, message: String },
	/// Request body exceeds the configured limit (413)
	PayloadTooLarge { error_type: String, message: String },
	/// Write lost a race with another writer (409)
	Conflict {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Unprocessable entity for business rule failures (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::PayloadTooLarge { .. } => 413,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message, details) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			}
			| APIError::Conflict {
				error_type,
				message,
				details,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => (error_type, message, details.clone()),
			APIError::NotFound {
				error_type,
				message,
			}
			| APIError::PayloadTooLarge {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message, None),
		};

		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			details,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::PayloadTooLarge { message, .. } => {
				write!(f, "Payload Too Large: {}", message)
			},
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
