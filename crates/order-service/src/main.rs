//! Main entry point for `orderctl`.
//!
//! Loads the configuration, builds the storage backend and dispatcher, and
//! runs a single subcommand against them. A lifecycle listener logs every
//! notification the dispatcher publishes while the command runs.

use clap::{Parser, Subcommand};
use order_config::Config;
use order_core::DispatcherBuilder;
use order_storage::StorageFactory;
use order_types::OrderEvent;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod commands;

use commands::{spawn_listener, App};

/// Command-line arguments for the order lifecycle tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// Store a new order record with no status
	Create {
		/// Order id, a random UUID when omitted
		#[arg(long)]
		order_id: Option<String>,
	},
	/// Deliver an event to an order and print its new status
	Dispatch {
		#[arg(long)]
		order_id: String,
		/// PAYMENT_SUCCESSFUL, THIRD_PARTIES_RETURN_SUCCESS, THIRD_PARTIES_RETURN_FAILED or CANCEL
		#[arg(long)]
		event: OrderEvent,
	},
	/// Print the current status of an order
	Status {
		#[arg(long)]
		order_id: String,
	},
	/// Replay the sample order run
	Demo,
}

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
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.machine.id);

	let app = build_app(config)?;
	tracing::debug!(machine = app.dispatcher.machine_id(), "Dispatcher ready");
	let listener = spawn_listener(app.dispatcher.event_bus());

	let result = run(&app, args.command).await;

	// Closing the bus lets the listener drain and exit
	drop(app);
	if let Ok(seen) = listener.await {
		tracing::debug!(notifications = seen, "Lifecycle listener stopped");
	}

	result
}

/// Builds storage and the dispatcher from configuration.
fn build_app(config: Config) -> Result<App, Box<dyn std::error::Error>> {
	let storage_factories: HashMap<String, StorageFactory> =
		order_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect();

	let timeout = Duration::from_secs(config.dispatcher.timeout_seconds);
	let builder = DispatcherBuilder::new(config);
	let storage = builder.build_storage(&storage_factories)?;
	let dispatcher = builder.build(storage.clone())?;

	Ok(App {
		dispatcher: Arc::new(dispatcher),
		storage,
		timeout,
	})
}

async fn run(app: &App, command: Command) -> Result<(), Box<dyn std::error::Error>> {
	match command {
		Command::Create { order_id } => {
			let order = app.create_order(order_id).await?;
			println!("{}", order.id);
		},
		Command::Dispatch { order_id, event } => {
			let status = app.dispatch(&order_id, event).await?;
			println!("{}", status);
		},
		Command::Status { order_id } => {
			let status = app.status(&order_id).await?;
			println!("{}", status);
		},
		Command::Demo => {
			for (order_id, status) in app.demo().await? {
				println!("{}: {}", order_id, status);
			}
		},
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_types::OrderStatus;
	use tempfile::tempdir;

	#[test]
	fn test_args_defaults() {
		let args = Args::try_parse_from(["orderctl", "demo"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
		assert_eq!(args.command, Command::Demo);
	}

	#[test]
	fn test_dispatch_args_parse_event() {
		let args = Args::try_parse_from([
			"orderctl",
			"--config",
			"custom.toml",
			"dispatch",
			"--order-id",
			"123",
			"--event",
			"THIRD_PARTIES_RETURN_FAILED",
		])
		.unwrap();
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(
			args.command,
			Command::Dispatch {
				order_id: "123".into(),
				event: OrderEvent::ThirdPartiesReturnFailed,
			}
		);
	}

	#[test]
	fn test_unknown_event_rejected() {
		let result = Args::try_parse_from([
			"orderctl",
			"dispatch",
			"--order-id",
			"123",
			"--event",
			"payment_successful",
		]);
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn test_file_config_round_trip() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("config.toml");
		let storage_path = dir.path().join("orders");
		let config_content = format!(
			r#"
[machine]
id = "orderStateMachine"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"

[dispatcher]
timeout_seconds = 5
"#,
			storage_path.display()
		);
		std::fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file(&config_path).await.unwrap();
		let app = build_app(config).unwrap();
		assert_eq!(app.timeout, Duration::from_secs(5));

		run(&app, Command::Create { order_id: Some("456".into()) })
			.await
			.unwrap();
		run(
			&app,
			Command::Dispatch {
				order_id: "456".into(),
				event: OrderEvent::Cancel,
			},
		)
		.await
		.unwrap();
		assert_eq!(app.status("456").await.unwrap(), OrderStatus::Cancel);
		assert!(storage_path.exists());
	}
}
