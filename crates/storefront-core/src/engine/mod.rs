//! Shop engine holding the long-lived services.

use crate::state::OrderStateMachine;
use std::sync::Arc;
use storefront_config::Config;
use storefront_storage::StorageService;

/// Main engine shared by every request handler.
#[derive(Clone)]
pub struct ShopEngine {
	/// Shop configuration.
	config: Config,
	/// Order state machine
	orders: Arc<OrderStateMachine>,
}

impl ShopEngine {
	/// Creates a new engine on top of an already constructed storage service.
	pub fn new(config: Config, storage: Arc<StorageService>) -> Self {
		let orders = Arc::new(OrderStateMachine::new(storage, &config.shop));
		Self { config, orders }
	}

	/// Returns a reference to the shop configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the order state machine.
	pub fn orders(&self) -> &Arc<OrderStateMachine> {
		&self.orders
	}
}
