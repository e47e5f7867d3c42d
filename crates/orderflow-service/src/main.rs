//! Main entry point for the ordering backend service.
//!
//! This binary wires the pluggable implementations into the engine,
//! starts the bot event loop and, when enabled, the HTTP API server.

use clap::Parser;
use orderflow_config::Config;
use orderflow_core::EngineBuilder;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

// Import implementations from individual crates
use orderflow_bot::implementations::telegram::create_updates;
use orderflow_notify::implementations::memory::create_channel as create_memory_channel;
use orderflow_notify::implementations::telegram::create_channel as create_telegram_channel;
use orderflow_storage::implementations::file::create_storage as create_file_storage;
use orderflow_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the ordering backend.
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

/// Main entry point for the ordering backend.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine with all implementations
/// 5. Runs the engine (and the API server) until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.init();

	tracing::info!("Started ordering backend");

	// Load configuration
	let config = Config::from_file_async(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	// Build the engine with implementations
	let engine = EngineBuilder::new(config.clone())
		.with_storage_factory("file", create_file_storage)
		.with_storage_factory("memory", create_memory_storage)
		.with_channel_factory("telegram", create_telegram_channel)
		.with_channel_factory("memory", create_memory_channel)
		.with_update_factory("telegram", create_updates)
		.build()?;
	let engine = Arc::new(engine);

	// Check if the API server should be started
	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);

	if api_enabled {
		let api_config = config.api.clone().unwrap();
		let api_engine = Arc::clone(&engine);

		let engine_task = engine.run();
		let api_task = server::start_server(api_config, api_engine);

		tokio::select! {
			result = engine_task => {
				tracing::info!("Engine finished");
				result?;
			}
			result = api_task => {
				tracing::info!("API server finished");
				result?;
			}
		}
	} else {
		tracing::info!("Starting engine only");
		engine.run().await?;
	}

	tracing::info!("Stopped ordering backend");
	Ok(())
}
