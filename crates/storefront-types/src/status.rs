//! Order status workflow rules.
//!
//! Defines the six order lifecycle states, the table of legal single-step
//! transitions between them, and the display metadata the admin surface
//! renders for each state. Everything here is pure: no storage, no locking,
//! safe to call from any number of tasks.
//!
//! ```text
//! pending   -> paid, cancelled, failed
//! paid      -> completed, refunded, cancelled
//! completed -> refunded
//! cancelled -> (terminal)
//! refunded  -> (terminal)
//! failed    -> pending
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of an order.
///
/// The lowercase variant names are the wire and storage representation and
/// must not change; existing records encode these literal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Order placed, awaiting payment confirmation.
	Pending,
	/// Payment confirmed.
	Paid,
	/// Order fulfilled and delivered.
	Completed,
	/// Order cancelled by customer or admin.
	Cancelled,
	/// Payment returned to the customer.
	Refunded,
	/// Payment failed.
	Failed,
}

/// Error returned when a string does not name one of the six statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status: {0}")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
	/// Every status, in declaration order.
	pub const ALL: [OrderStatus; 6] = [
		OrderStatus::Pending,
		OrderStatus::Paid,
		OrderStatus::Completed,
		OrderStatus::Cancelled,
		OrderStatus::Refunded,
		OrderStatus::Failed,
	];

	/// Returns an iterator over all status variants.
	pub fn all() -> impl Iterator<Item = Self> {
		Self::ALL.into_iter()
	}

	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Paid => "paid",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
			OrderStatus::Refunded => "refunded",
			OrderStatus::Failed => "failed",
		}
	}

	/// Human-readable label.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pending",
			OrderStatus::Paid => "Paid",
			OrderStatus::Completed => "Completed",
			OrderStatus::Cancelled => "Cancelled",
			OrderStatus::Refunded => "Refunded",
			OrderStatus::Failed => "Failed",
		}
	}

	/// CSS classes used to render the status badge.
	pub fn color(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "bg-blue-100 text-blue-800",
			OrderStatus::Paid => "bg-green-100 text-green-800",
			OrderStatus::Completed => "bg-purple-100 text-purple-800",
			OrderStatus::Cancelled => "bg-red-100 text-red-800",
			OrderStatus::Refunded => "bg-orange-100 text-orange-800",
			OrderStatus::Failed => "bg-gray-100 text-gray-800",
		}
	}

	/// One-line description shown next to the status.
	pub fn description(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Order placed, awaiting payment confirmation",
			OrderStatus::Paid => "Payment confirmed, preparing for shipment",
			OrderStatus::Completed => "Order fulfilled and delivered",
			OrderStatus::Cancelled => "Order cancelled by customer or admin",
			OrderStatus::Refunded => "Payment refunded to customer",
			OrderStatus::Failed => "Payment failed, customer can retry",
		}
	}

	/// Statuses reachable from this one in a single step.
	pub fn allowed_statuses(self) -> &'static [OrderStatus] {
		allowed_statuses(self)
	}

	/// Whether this status has no outgoing transitions.
	pub fn is_terminal(self) -> bool {
		is_terminal_status(self)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"paid" => Ok(Self::Paid),
			"completed" => Ok(Self::Completed),
			"cancelled" => Ok(Self::Cancelled),
			"refunded" => Ok(Self::Refunded),
			"failed" => Ok(Self::Failed),
			other => Err(UnknownStatus(other.to_string())),
		}
	}
}

/// Returns the ordered list of statuses an order may move to from `current`.
///
/// The order is the one options are presented in, not a preference ranking.
pub fn allowed_statuses(current: OrderStatus) -> &'static [OrderStatus] {
	use OrderStatus::*;

	match current {
		Pending => &[Paid, Cancelled, Failed],
		Paid => &[Completed, Refunded, Cancelled],
		Completed => &[Refunded],
		Cancelled => &[],
		Refunded => &[],
		// Payment retry.
		Failed => &[Pending],
	}
}

/// Iterates the whole transition table, one entry per status.
pub fn transition_table() -> impl Iterator<Item = (OrderStatus, &'static [OrderStatus])> {
	OrderStatus::all().map(|status| (status, allowed_statuses(status)))
}

/// Checks if an order in `current` may move to `next`.
///
/// A self-transition is never legal, whatever the table says.
pub fn can_transition_to(current: OrderStatus, next: OrderStatus) -> bool {
	check_transition(allowed_statuses(current), current, next).is_ok()
}

/// Returns true if no transition leaves `status`.
pub fn is_terminal_status(status: OrderStatus) -> bool {
	allowed_statuses(status).is_empty()
}

/// Machine-readable reason a transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionRejection {
	/// The order is already in the requested status.
	SameStatus,
	/// The requested status is not reachable from the current one.
	IllegalTransition,
}

impl TransitionRejection {
	/// Returns the code string used in API payloads.
	pub fn as_str(&self) -> &'static str {
		match self {
			TransitionRejection::SameStatus => "SAME_STATUS",
			TransitionRejection::IllegalTransition => "ILLEGAL_TRANSITION",
		}
	}
}

/// A rejected status transition.
///
/// Both variants carry the statuses involved so callers can build their own
/// message from [`OrderStatus::label`]; `Display` gives the stock one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
	#[error("Order is already in this status")]
	SameStatus { status: OrderStatus },
	#[error("Cannot change status from \"{}\" to \"{}\"", .from.label(), .to.label())]
	IllegalTransition { from: OrderStatus, to: OrderStatus },
}

impl TransitionError {
	/// The rejection code for this error.
	pub fn reason(&self) -> TransitionRejection {
		match self {
			TransitionError::SameStatus { .. } => TransitionRejection::SameStatus,
			TransitionError::IllegalTransition { .. } => TransitionRejection::IllegalTransition,
		}
	}

	/// Status the order was in when the transition was attempted.
	pub fn current(&self) -> OrderStatus {
		match self {
			TransitionError::SameStatus { status } => *status,
			TransitionError::IllegalTransition { from, .. } => *from,
		}
	}

	/// Status the caller asked for.
	pub fn attempted(&self) -> OrderStatus {
		match self {
			TransitionError::SameStatus { status } => *status,
			TransitionError::IllegalTransition { to, .. } => *to,
		}
	}
}

/// Validates a status transition.
///
/// This is the gate every status-changing path must pass immediately before
/// committing, evaluated against the freshest known `current`.
pub fn validate_status_transition(
	current: OrderStatus,
	next: OrderStatus,
) -> Result<(), TransitionError> {
	check_transition(allowed_statuses(current), current, next)
}

/// Same-status check first, then membership in `allowed`.
fn check_transition(
	allowed: &[OrderStatus],
	current: OrderStatus,
	next: OrderStatus,
) -> Result<(), TransitionError> {
	if current == next {
		return Err(TransitionError::SameStatus { status: current });
	}

	if !allowed.contains(&next) {
		return Err(TransitionError::IllegalTransition {
			from: current,
			to: next,
		});
	}

	Ok(())
}

/// Serializable outcome of a transition check, for API payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransitionCheck {
	pub valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<TransitionRejection>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl From<Result<(), TransitionError>> for StatusTransitionCheck {
	fn from(result: Result<(), TransitionError>) -> Self {
		match result {
			Ok(()) => Self {
				valid: true,
				reason: None,
				error: None,
			},
			Err(e) => Self {
				valid: false,
				reason: Some(e.reason()),
				error: Some(e.to_string()),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;
	use super::OrderStatus::*;

	#[test]
	fn test_self_transition_is_never_allowed() {
		for status in OrderStatus::all() {
			assert!(!can_transition_to(status, status), "{status} -> {status}");
			assert_eq!(
				validate_status_transition(status, status),
				Err(TransitionError::SameStatus { status })
			);
		}
	}

	#[test]
	fn test_allowed_statuses_are_distinct_and_exclude_self() {
		for (status, allowed) in transition_table() {
			let unique: HashSet<_> = allowed.iter().collect();
			assert_eq!(unique.len(), allowed.len(), "duplicates for {status}");
			assert!(!allowed.contains(&status), "self-loop for {status}");
			assert!(allowed.iter().all(|s| OrderStatus::ALL.contains(s)));
		}
	}

	#[test]
	fn test_table_matches_workflow() {
		assert_eq!(allowed_statuses(Pending), &[Paid, Cancelled, Failed]);
		assert_eq!(allowed_statuses(Paid), &[Completed, Refunded, Cancelled]);
		assert_eq!(allowed_statuses(Completed), &[Refunded]);
		assert!(allowed_statuses(Cancelled).is_empty());
		assert!(allowed_statuses(Refunded).is_empty());
		assert_eq!(allowed_statuses(Failed), &[Pending]);
		assert_eq!(transition_table().count(), 6);
	}

	#[test]
	fn test_terminal_statuses() {
		assert!(is_terminal_status(Cancelled));
		assert!(is_terminal_status(Refunded));
		for status in [Pending, Paid, Completed, Failed] {
			assert!(!is_terminal_status(status), "{status} should not be terminal");
			assert!(!status.is_terminal());
		}
	}

	#[test]
	fn test_metadata_present_for_every_status() {
		for status in OrderStatus::all() {
			assert!(!status.label().is_empty());
			assert!(!status.color().is_empty());
			assert!(!status.description().is_empty());
		}
	}

	#[test]
	fn test_pending_cannot_skip_payment() {
		let err = validate_status_transition(Pending, Completed).unwrap_err();
		assert_eq!(err.reason(), TransitionRejection::IllegalTransition);
		assert_eq!(
			err.to_string(),
			"Cannot change status from \"Pending\" to \"Completed\""
		);
		assert_eq!(err.current(), Pending);
		assert_eq!(err.attempted(), Completed);
	}

	#[test]
	fn test_valid_transitions() {
		assert_eq!(validate_status_transition(Pending, Paid), Ok(()));
		assert_eq!(validate_status_transition(Failed, Pending), Ok(()));
		assert_eq!(validate_status_transition(Completed, Refunded), Ok(()));
	}

	#[test]
	fn test_completed_cannot_go_back() {
		let err = validate_status_transition(Completed, Paid).unwrap_err();
		assert_eq!(err.reason(), TransitionRejection::IllegalTransition);
	}

	#[test]
	fn test_terminal_state_rejects_everything() {
		for next in OrderStatus::all() {
			assert!(validate_status_transition(Cancelled, next).is_err());
			assert!(validate_status_transition(Refunded, next).is_err());
		}
		assert_eq!(
			validate_status_transition(Cancelled, Pending).unwrap_err().reason(),
			TransitionRejection::IllegalTransition
		);
	}

	#[test]
	fn test_same_status_checked_before_table() {
		let err = validate_status_transition(Paid, Paid).unwrap_err();
		assert_eq!(err.reason(), TransitionRejection::SameStatus);
		assert_eq!(err.to_string(), "Order is already in this status");

		// Even a table with a self-loop must not let it through.
		let with_self_loop = [Paid, Completed, Refunded, Cancelled];
		assert_eq!(
			check_transition(&with_self_loop, Paid, Paid),
			Err(TransitionError::SameStatus { status: Paid })
		);
		assert_eq!(check_transition(&with_self_loop, Paid, Completed), Ok(()));
	}

	#[test]
	fn test_wire_strings() {
		for status in OrderStatus::all() {
			assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
			assert_eq!(
				serde_json::to_string(&status).unwrap(),
				format!("\"{}\"", status.as_str())
			);
		}
		assert_eq!(
			"Paid".parse::<OrderStatus>(),
			Err(UnknownStatus("Paid".to_string()))
		);
		assert!(serde_json::from_str::<OrderStatus>("\"shipped\"").is_err());
	}

	#[test]
	fn test_transition_check_payload() {
		let ok = StatusTransitionCheck::from(validate_status_transition(Pending, Paid));
		assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!({ "valid": true }));

		let rejected = StatusTransitionCheck::from(validate_status_transition(Paid, Paid));
		assert_eq!(
			serde_json::to_value(&rejected).unwrap(),
			serde_json::json!({
				"valid": false,
				"reason": "SAME_STATUS",
				"error": "Order is already in this status"
			})
		);
	}
}
