//! Main entry point for the tailor service.
//!
//! Loads the configuration, builds the workflow engine over the configured
//! storage backend and serves the HTTP API.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tailor_config::Config;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the tailor service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "TAILOR_CONFIG", default_value = "config/tailor.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the tailor service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the workflow engine
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started tailor");

	let config_path = args.config.to_string_lossy();
	let config = Config::from_file(&config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(factory_registry::build_engine_from_config(config.clone())?);

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			tokio::select! {
				result = server::start_server(api_config, engine) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Received shutdown signal");
				}
			}
		},
		None => {
			tracing::warn!("API is disabled in configuration; nothing to serve");
		},
	}

	tracing::info!("Stopped tailor");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_args_default_values() {
		let args = Args::try_parse_from(["tailor"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config/tailor.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args =
			Args::try_parse_from(["tailor", "--config", "custom.toml", "-l", "debug"]).unwrap();
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_build_engine_from_file_config() {
		let dir = tempfile::tempdir().unwrap();
		let data_dir = dir.path().join("data");
		let config_path = dir.path().join("tailor.toml");
		let mut file = std::fs::File::create(&config_path).unwrap();
		write!(
			file,
			r#"
[service]
id = "file-config-test"

[storage]
primary = "file"

[storage.implementations.file]
storage_path = "{}"

[workflow]
max_page_size = 50

[api]
enabled = false
"#,
			data_dir.display()
		)
		.unwrap();

		let config = Config::from_file(&config_path.to_string_lossy())
			.await
			.unwrap();
		assert_eq!(config.workflow.max_page_size, 50);

		let engine = factory_registry::build_engine_from_config(config).unwrap();
		assert_eq!(engine.config().service.id, "file-config-test");
		assert!(data_dir.exists());
	}
}
