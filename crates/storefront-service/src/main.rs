//! Main entry point for the storefront order service.
//!
//! Loads configuration, builds the shop engine on the configured storage
//! backend and serves the admin API.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use storefront_config::Config;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the storefront service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	// RUST_LOG wins over --log-level when set.
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started storefront");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.shop.id);

	let api_config = config.api.clone().filter(|api| api.enabled);
	let engine = Arc::new(factory_registry::build_shop_from_config(config)?);

	match api_config {
		Some(api_config) => server::start_server(api_config, engine).await?,
		None => {
			tracing::info!("API disabled; nothing to serve, waiting for shutdown");
			tokio::signal::ctrl_c().await?;
		},
	}

	tracing::info!("Stopped storefront");
	Ok(())
}
