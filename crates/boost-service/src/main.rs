//! Main entry point for the boost storefront service.
//!
//! This binary wires the complete storefront: it loads configuration,
//! resolves the configured storage, provider and chat implementations
//! through factory maps, builds the engine and runs it until interrupted.

use boost_config::Config;
use boost_core::StorefrontEngine;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

mod server;

// Import implementations from individual crates
use boost_chat::implementations::http::create_chat as create_http_chat;
use boost_chat::implementations::mock::create_chat as create_mock_chat;
use boost_provider::implementations::http::create_provider as create_http_provider;
use boost_provider::implementations::mock::create_provider as create_mock_provider;
use boost_storage::implementations::file::create_storage as create_file_storage;
use boost_storage::implementations::memory::create_storage as create_memory_storage;

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

/// Resolves the primary implementation of a component through its factory
/// map, using the TOML section configured for it.
fn resolve<I: ?Sized, E: std::fmt::Display>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<&'static str, fn(&toml::Value) -> Result<Box<I>, E>>,
) -> Result<Box<I>, Box<dyn std::error::Error>> {
	let factory = factories.get(primary).ok_or_else(|| {
		format!("unknown {} implementation '{}'", component, primary)
	})?;
	let config = implementations
		.get(primary)
		.ok_or_else(|| format!("missing configuration for {} '{}'", component, primary))?;
	let built = factory(config)
		.map_err(|e| format!("failed to create {} '{}': {}", component, primary, e))?;
	tracing::info!(component = %component, implementation = %primary, "Loaded");
	Ok(built)
}

/// Main entry point for the storefront service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine with the configured implementations
/// 5. Runs the engine (and the health server, if enabled) until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started boost storefront");

	// Load configuration; a broken config is the one fatal error class.
	let config = Config::from_file(&args.config)?;
	tracing::info!("Loaded configuration [{}]", config.store.id);

	let engine = build_engine(config.clone())?;
	let engine = Arc::new(engine);

	// Check if the health server should be started
	if let Some(api_config) = config.api.clone().filter(|api| api.enabled) {
		let store_id = config.store.id.clone();

		// Run the engine and the health server concurrently
		tokio::select! {
			result = engine.run() => {
				tracing::info!("Engine finished");
				result?;
			}
			result = server::start_server(api_config, store_id) => {
				tracing::info!("Health server finished");
				result?;
			}
		}
	} else {
		engine.run().await?;
	}

	tracing::info!("Stopped boost storefront");
	Ok(())
}

/// Builds the storefront engine with all configured implementations.
fn build_engine(config: Config) -> Result<StorefrontEngine, Box<dyn std::error::Error>> {
	let storage_factories: HashMap<&'static str, boost_storage::StorageFactory> =
		HashMap::from([
			("memory", create_memory_storage as boost_storage::StorageFactory),
			("file", create_file_storage as boost_storage::StorageFactory),
		]);
	let provider_factories: HashMap<&'static str, boost_provider::ProviderFactory> =
		HashMap::from([
			("http", create_http_provider as boost_provider::ProviderFactory),
			("mock", create_mock_provider as boost_provider::ProviderFactory),
		]);
	let chat_factories: HashMap<&'static str, boost_chat::ChatFactory> = HashMap::from([
		("http", create_http_chat as boost_chat::ChatFactory),
		("mock", create_mock_chat as boost_chat::ChatFactory),
	]);

	let storage = resolve(
		"storage",
		&config.storage.primary,
		&config.storage.implementations,
		&storage_factories,
	)?;
	let provider = resolve(
		"provider",
		&config.provider.primary,
		&config.provider.implementations,
		&provider_factories,
	)?;
	let chat = resolve(
		"chat",
		&config.chat.primary,
		&config.chat.implementations,
		&chat_factories,
	)?;

	Ok(StorefrontEngine::new(config, storage, provider, chat))
}
