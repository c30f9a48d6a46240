//! Order status workflow endpoint.
//!
//! Exposes the transition table with display metadata so clients render
//! status selectors from the same data the server validates against.

use storefront_types::WorkflowResponse;

/// Handles GET /api/order-statuses.
pub fn get_workflow() -> WorkflowResponse {
	WorkflowResponse::current()
}

#[cfg(test)]
mod tests {
	use super::*;
	use storefront_types::OrderStatus;

	#[test]
	fn test_workflow_matches_policy() {
		let workflow = get_workflow();
		for view in &workflow.statuses {
			let expected: Vec<_> = view.status.allowed_statuses().to_vec();
			let offered: Vec<_> = view.allowed_statuses.iter().map(|o| o.status).collect();
			assert_eq!(offered, expected);
			assert_eq!(view.terminal, expected.is_empty());
		}
		assert_eq!(workflow.statuses[0].status, OrderStatus::Pending);
	}
}
