//! Order state machine implementation.
//!
//! Owns the authoritative order records. Status changes are validated
//! against the freshest stored status and written with compare-and-swap, so
//! an update decided on a stale view can never overwrite a newer status.

use std::sync::Arc;

use storefront_config::ShopConfig;
use storefront_storage::{StorageError, StorageService, Versioned};
use storefront_types::{
	allowed_statuses, validate_status_transition, NewOrder, Order, OrderStatus, StorageKey,
	TransitionError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Attempts at bumping the id sequence before giving up.
const SEQUENCE_ATTEMPTS: usize = 32;
/// Sequence id used for order ids.
const ORDER_SEQUENCE: &str = "orders";

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Order not found: {0}")]
	OrderNotFound(u64),
	#[error(transparent)]
	Transition(#[from] TransitionError),
	/// The caller decided on a status that is no longer current.
	#[error(
		"Order {order_id} is now \"{}\", not \"{}\"; reload and try again",
		.actual.label(),
		.expected.label()
	)]
	StaleStatus {
		order_id: u64,
		expected: OrderStatus,
		actual: OrderStatus,
	},
	/// Every compare-and-swap attempt lost to a concurrent write.
	#[error("Order {0} was modified concurrently; try again")]
	Conflict(u64),
	#[error("Invalid order: {0}")]
	InvalidOrder(String),
}

impl From<StorageError> for OrderStateError {
	fn from(e: StorageError) -> Self {
		OrderStateError::Storage(e.to_string())
	}
}

/// Manages order creation, lookups and status transitions.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
	order_number_prefix: String,
	max_update_retries: u32,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>, config: &ShopConfig) -> Self {
		Self {
			storage,
			order_number_prefix: config.order_number_prefix.clone(),
			max_update_retries: config.max_update_retries,
		}
	}

	/// Places a new order. Every order starts as [`OrderStatus::Pending`].
	pub async fn create_order(&self, new_order: NewOrder) -> Result<Order, OrderStateError> {
		validate_new_order(&new_order)?;

		let id = self.next_order_id().await?;
		let now = now();
		let order = Order {
			id,
			order_number: format!("{}-{:06}", self.order_number_prefix, id),
			total_cents: new_order.total_cents(),
			customer_name: new_order.customer_name,
			customer_email: new_order.customer_email,
			customer_phone: new_order.customer_phone,
			address: new_order.address,
			selected_size: new_order.selected_size,
			selected_color: new_order.selected_color,
			delivery_preferences: new_order.delivery_preferences,
			notes: new_order.notes,
			status: OrderStatus::Pending,
			items: new_order.items,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.compare_and_swap(StorageKey::Orders.as_str(), &id.to_string(), None, &order)
			.await?;

		info!(
			order_id = order.id,
			order_number = %order.order_number,
			total_cents = order.total_cents,
			"Created order"
		);
		Ok(order)
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: u64) -> Result<Order, OrderStateError> {
		Ok(self.read_order(order_id).await?.value)
	}

	/// Lists all orders, oldest first.
	pub async fn list_orders(&self) -> Result<Vec<Order>, OrderStateError> {
		let mut orders: Vec<Order> = self
			.storage
			.retrieve_all(StorageKey::Orders.as_str())
			.await?
			.into_iter()
			.map(|(_, order)| order)
			.collect();
		orders.sort_by_key(|order: &Order| order.id);
		Ok(orders)
	}

	/// Current stored status of an order and the statuses it may move to.
	pub async fn allowed_transitions(
		&self,
		order_id: u64,
	) -> Result<(OrderStatus, &'static [OrderStatus]), OrderStateError> {
		let status = self.get_order(order_id).await?.status;
		Ok((status, allowed_statuses(status)))
	}

	/// Transitions an order to a new status.
	///
	/// The transition is validated against the stored status at commit time.
	/// When `expected` is given, the update is also refused if the stored
	/// status differs from it, i.e. the caller chose `next` while looking at
	/// an out-of-date status.
	pub async fn transition_order_status(
		&self,
		order_id: u64,
		expected: Option<OrderStatus>,
		next: OrderStatus,
	) -> Result<Order, OrderStateError> {
		let mut from = None;
		let result = self
			.update_order_with(order_id, |order| {
				if let Some(expected) = expected {
					if order.status != expected {
						return Err(OrderStateError::StaleStatus {
							order_id,
							expected,
							actual: order.status,
						});
					}
				}
				validate_status_transition(order.status, next)?;
				from = Some(order.status);
				order.status = next;
				Ok(())
			})
			.await;

		match &result {
			Ok(_) => {
				if let Some(from) = from {
					info!(order_id, %from, to = %next, "Order status changed");
				}
			},
			Err(e) => warn!(order_id, to = %next, "Order status change rejected: {}", e),
		}
		result
	}

	/// Applies `updater` to the freshest copy of an order and persists it
	/// with compare-and-swap.
	///
	/// If another write lands between the read and the swap, the order is
	/// re-read and `updater` runs again on the new copy, up to the configured
	/// retry budget. An error from `updater` aborts without writing, and so
	/// does a status change the transition table does not allow.
	async fn update_order_with<F>(
		&self,
		order_id: u64,
		mut updater: F,
	) -> Result<Order, OrderStateError>
	where
		F: FnMut(&mut Order) -> Result<(), OrderStateError>,
	{
		let id = order_id.to_string();

		for attempt in 0..=self.max_update_retries {
			let current = self.read_order(order_id).await?;
			let mut order = current.value.clone();
			updater(&mut order)?;
			if order.status != current.value.status {
				validate_status_transition(current.value.status, order.status)?;
			}
			order.updated_at = now();

			match self
				.storage
				.compare_and_swap(StorageKey::Orders.as_str(), &id, Some(current.raw()), &order)
				.await
			{
				Ok(()) => return Ok(order),
				Err(StorageError::Conflict) => {
					debug!(order_id, attempt, "Order changed during update, re-reading");
				},
				Err(e) => return Err(e.into()),
			}
		}

		Err(OrderStateError::Conflict(order_id))
	}

	async fn read_order(&self, order_id: u64) -> Result<Versioned<Order>, OrderStateError> {
		self.storage
			.retrieve_versioned(StorageKey::Orders.as_str(), &order_id.to_string())
			.await
			.map_err(|e| match e {
				StorageError::NotFound => OrderStateError::OrderNotFound(order_id),
				other => other.into(),
			})
	}

	/// Allocates the next order id from the persisted sequence.
	async fn next_order_id(&self) -> Result<u64, OrderStateError> {
		let namespace = StorageKey::Sequences.as_str();

		for _ in 0..SEQUENCE_ATTEMPTS {
			let current = match self
				.storage
				.retrieve_versioned::<u64>(namespace, ORDER_SEQUENCE)
				.await
			{
				Ok(current) => Some(current),
				Err(StorageError::NotFound) => None,
				Err(e) => return Err(e.into()),
			};

			let next = current.as_ref().map_or(0, |c| c.value) + 1;
			let expected = current.as_ref().map(|c| c.raw());
			match self
				.storage
				.compare_and_swap(namespace, ORDER_SEQUENCE, expected, &next)
				.await
			{
				Ok(()) => return Ok(next),
				Err(StorageError::Conflict) => continue,
				Err(e) => return Err(e.into()),
			}
		}

		Err(OrderStateError::Storage(
			"Could not allocate an order id: sequence is under heavy contention".into(),
		))
	}
}

fn now() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

fn validate_new_order(order: &NewOrder) -> Result<(), OrderStateError> {
	let invalid = |msg: &str| Err(OrderStateError::InvalidOrder(msg.to_string()));

	if order.customer_name.trim().is_empty() {
		return invalid("customer name is required");
	}
	if !order.customer_email.contains('@') {
		return invalid("customer email is not valid");
	}
	if order.address.trim().is_empty() {
		return invalid("address is required");
	}
	if order.items.is_empty() {
		return invalid("order has no items");
	}
	if order.items.iter().any(|item| item.quantity == 0) {
		return invalid("item quantity must be at least 1");
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use storefront_config::ConfigBuilder;
	use storefront_storage::implementations::memory::MemoryStorage;
	use storefront_types::{OrderItem, TransitionRejection};

	fn machine() -> (OrderStateMachine, Arc<StorageService>) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let config = ConfigBuilder::new().build();
		(
			OrderStateMachine::new(Arc::clone(&storage), &config.shop),
			storage,
		)
	}

	fn new_order() -> NewOrder {
		NewOrder {
			customer_name: "Hana Tesfaye".to_string(),
			customer_email: "hana@example.com".to_string(),
			customer_phone: "+251911223344".to_string(),
			address: "Kazanchis, Addis Ababa".to_string(),
			selected_size: Some("L".to_string()),
			selected_color: Some("Black".to_string()),
			delivery_preferences: None,
			notes: None,
			items: vec![OrderItem {
				product_id: 3,
				product_name: "Hoodie".to_string(),
				quantity: 2,
				price_cents: 250_000,
			}],
		}
	}

	#[tokio::test]
	async fn test_new_orders_start_pending() {
		let (machine, _) = machine();

		let first = machine.create_order(new_order()).await.unwrap();
		let second = machine.create_order(new_order()).await.unwrap();

		assert_eq!(first.status, OrderStatus::Pending);
		assert_eq!(first.id, 1);
		assert_eq!(first.order_number, "ORD-000001");
		assert_eq!(first.total_cents, 500_000);
		assert_eq!(second.id, 2);

		let listed = machine.list_orders().await.unwrap();
		assert_eq!(
			listed.iter().map(|o| o.id).collect::<Vec<_>>(),
			vec![1, 2]
		);
	}

	#[tokio::test]
	async fn test_create_rejects_empty_order() {
		let (machine, _) = machine();
		let mut order = new_order();
		order.items.clear();

		let result = machine.create_order(order).await;
		assert!(matches!(result, Err(OrderStateError::InvalidOrder(_))));
		assert!(machine.list_orders().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_payment_then_completion() {
		let (machine, _) = machine();
		let order = machine.create_order(new_order()).await.unwrap();

		let paid = machine
			.transition_order_status(order.id, Some(OrderStatus::Pending), OrderStatus::Paid)
			.await
			.unwrap();
		assert_eq!(paid.status, OrderStatus::Paid);

		let completed = machine
			.transition_order_status(order.id, None, OrderStatus::Completed)
			.await
			.unwrap();
		assert_eq!(completed.status, OrderStatus::Completed);
		assert_eq!(
			machine.get_order(order.id).await.unwrap().status,
			OrderStatus::Completed
		);
	}

	#[tokio::test]
	async fn test_illegal_transition_leaves_order_untouched() {
		let (machine, _) = machine();
		let order = machine.create_order(new_order()).await.unwrap();

		let err = machine
			.transition_order_status(order.id, None, OrderStatus::Completed)
			.await
			.unwrap_err();
		match err {
			OrderStateError::Transition(e) => {
				assert_eq!(e.reason(), TransitionRejection::IllegalTransition)
			},
			other => panic!("unexpected error: {other}"),
		}

		assert_eq!(machine.get_order(order.id).await.unwrap(), order);
	}

	#[tokio::test]
	async fn test_same_status_rejected() {
		let (machine, _) = machine();
		let order = machine.create_order(new_order()).await.unwrap();

		let err = machine
			.transition_order_status(order.id, None, OrderStatus::Pending)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderStateError::Transition(TransitionError::SameStatus { .. })
		));
	}

	#[tokio::test]
	async fn test_stale_expected_status_rejected() {
		let (machine, _) = machine();
		let order = machine.create_order(new_order()).await.unwrap();

		// Another admin cancels while this one is deciding.
		machine
			.transition_order_status(order.id, Some(OrderStatus::Pending), OrderStatus::Cancelled)
			.await
			.unwrap();

		let err = machine
			.transition_order_status(order.id, Some(OrderStatus::Pending), OrderStatus::Paid)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderStateError::StaleStatus {
				expected: OrderStatus::Pending,
				actual: OrderStatus::Cancelled,
				..
			}
		));
		assert_eq!(
			machine.get_order(order.id).await.unwrap().status,
			OrderStatus::Cancelled
		);
	}

	#[tokio::test]
	async fn test_revalidates_against_fresh_status() {
		let (machine, _) = machine();
		let order = machine.create_order(new_order()).await.unwrap();
		machine
			.transition_order_status(order.id, None, OrderStatus::Failed)
			.await
			.unwrap();

		// Decided on "pending" without saying so; fresh status is "failed".
		let err = machine
			.transition_order_status(order.id, None, OrderStatus::Paid)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderStateError::Transition(TransitionError::IllegalTransition {
				from: OrderStatus::Failed,
				to: OrderStatus::Paid
			})
		));

		// Retry loop.
		let retried = machine
			.transition_order_status(order.id, Some(OrderStatus::Failed), OrderStatus::Pending)
			.await
			.unwrap();
		assert_eq!(retried.status, OrderStatus::Pending);
	}

	#[tokio::test]
	async fn test_retries_after_unrelated_write() {
		let (machine, storage) = machine();
		let order = machine.create_order(new_order()).await.unwrap();

		let mut calls = 0;
		let updated = machine
			.update_order_with(order.id, |o| {
				calls += 1;
				if calls == 1 {
					// Simulate a concurrent note edit landing after our read.
					let mut other = o.clone();
					other.notes = Some("gift wrap".to_string());
					let storage = Arc::clone(&storage);
					let handle = std::thread::spawn(move || {
						tokio::runtime::Runtime::new()
							.unwrap()
							.block_on(storage.store("orders", &other.id.to_string(), &other))
					});
					handle.join().unwrap().unwrap();
				}
				o.status = OrderStatus::Paid;
				Ok(())
			})
			.await
			.unwrap();

		assert_eq!(calls, 2);
		assert_eq!(updated.status, OrderStatus::Paid);
		assert_eq!(updated.notes.as_deref(), Some("gift wrap"));
	}

	#[tokio::test]
	async fn test_updater_cannot_bypass_transition_table() {
		let (machine, _) = machine();
		let order = machine.create_order(new_order()).await.unwrap();

		let err = machine
			.update_order_with(order.id, |o| {
				o.status = OrderStatus::Completed;
				Ok(())
			})
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderStateError::Transition(TransitionError::IllegalTransition {
				from: OrderStatus::Pending,
				to: OrderStatus::Completed
			})
		));
		assert_eq!(machine.get_order(order.id).await.unwrap(), order);

		// Edits that leave the status alone still go through.
		let noted = machine
			.update_order_with(order.id, |o| {
				o.notes = Some("call before delivery".to_string());
				Ok(())
			})
			.await
			.unwrap();
		assert_eq!(noted.status, OrderStatus::Pending);
		assert_eq!(noted.notes.as_deref(), Some("call before delivery"));
	}

	#[tokio::test]
	async fn test_gives_up_after_retry_budget() {
		let (machine, storage) = machine();
		let order = machine.create_order(new_order()).await.unwrap();

		let mut calls = 0u32;
		let result = machine
			.update_order_with(order.id, |o| {
				calls += 1;
				let mut other = o.clone();
				other.notes = Some(format!("edit {}", calls));
				let storage = Arc::clone(&storage);
				std::thread::spawn(move || {
					tokio::runtime::Runtime::new()
						.unwrap()
						.block_on(storage.store("orders", &other.id.to_string(), &other))
				})
				.join()
				.unwrap()
				.unwrap();
				Ok(())
			})
			.await;

		assert!(matches!(result, Err(OrderStateError::Conflict(id)) if id == order.id));
		assert_eq!(calls, 4);
	}

	#[tokio::test]
	async fn test_terminal_order_has_no_transitions() {
		let (machine, _) = machine();
		let order = machine.create_order(new_order()).await.unwrap();
		machine
			.transition_order_status(order.id, None, OrderStatus::Cancelled)
			.await
			.unwrap();

		let (status, allowed) = machine.allowed_transitions(order.id).await.unwrap();
		assert_eq!(status, OrderStatus::Cancelled);
		assert!(allowed.is_empty());

		let err = machine
			.transition_order_status(order.id, None, OrderStatus::Pending)
			.await
			.unwrap_err();
		assert!(matches!(err, OrderStateError::Transition(_)));
	}

	#[tokio::test]
	async fn test_missing_order() {
		let (machine, _) = machine();
		assert!(matches!(
			machine.get_order(42).await,
			Err(OrderStateError::OrderNotFound(42))
		));
		assert!(matches!(
			machine
				.transition_order_status(42, None, OrderStatus::Paid)
				.await,
			Err(OrderStateError::OrderNotFound(42))
		));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_transitions_single_winner() {
		let (machine, _) = machine();
		let machine = Arc::new(machine);
		let order = machine.create_order(new_order()).await.unwrap();

		let mut handles = Vec::new();
		for next in [OrderStatus::Paid, OrderStatus::Cancelled, OrderStatus::Failed] {
			let machine = Arc::clone(&machine);
			handles.push(tokio::spawn(async move {
				machine
					.transition_order_status(order.id, Some(OrderStatus::Pending), next)
					.await
			}));
		}

		let mut succeeded = Vec::new();
		for handle in handles {
			if let Ok(order) = handle.await.unwrap() {
				succeeded.push(order.status);
			}
		}

		assert_eq!(succeeded.len(), 1);
		assert_eq!(
			machine.get_order(order.id).await.unwrap().status,
			succeeded[0]
		);
	}
}
