//! Slipway - Entry Point
//!
//! A content-deployment orchestrator daemon: triggers hosted-platform
//! deployments via an outbound webhook and streams progress to the
//! management console.

use std::collections::HashMap;
use std::env;

use slipway::app::options::AppOptions;
use slipway::app::run::run;
use slipway::logs::{init_logging, LogOptions};
use slipway::storage::layout::StorageLayout;
use slipway::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("Failed to render version info: {}", e),
        }
        return;
    }

    // Assemble options from defaults and CLI overrides
    let mut options = AppOptions::default();
    if let Some(host) = cli_args.get("host") {
        options.server.host = host.clone();
    }
    if let Some(port) = cli_args.get("port") {
        match port.parse() {
            Ok(port) => options.server.port = port,
            Err(_) => {
                println!("Invalid port: {}", port);
                return;
            }
        }
    }
    if let Some(dir) = cli_args.get("data-dir") {
        options.storage = StorageLayout::new(dir);
    }
    if let Some(environment) = cli_args.get("environment") {
        options.environment = environment.clone();
    }
    if let Some(base) = cli_args.get("status-api") {
        options.status_api_base = base.clone();
    }

    // Initialize logging
    let mut log_options = LogOptions {
        json_format: cli_args.contains_key("json-logs"),
        log_to_file: cli_args.contains_key("log-to-file"),
        log_dir: options.storage.logs_dir(),
        ..Default::default()
    };
    if let Some(level) = cli_args.get("log-level") {
        match level.parse() {
            Ok(level) => log_options.log_level = level,
            Err(e) => {
                println!("{}", e);
                return;
            }
        }
    }

    // The guard keeps the file writer alive for the process lifetime
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    info!("Running slipway with options: {:?}", options);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run slipway: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(signal) => signal,
            Err(e) => {
                error!("Failed to install SIGINT handler: {e}");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
