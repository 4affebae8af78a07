//! Lifeline - Entry Point
//!
//! Runs the lifecycle event server by default. With `--wait`, acts as
//! a client that blocks until a tracked deployment completes, offering
//! to keep waiting when the timeout expires.

use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::time::Duration;

use lifelined::app::options::AppOptions;
use lifelined::app::run::run;
use lifelined::client::latch::{wait_with_continuation, LatchOptions, LifecycleEventsLatch};
use lifelined::client::rest::RestClient;
use lifelined::errors::LifelineError;
use lifelined::logs::{init_logging, LogLevel, LogOptions};

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

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
    if cli_args.contains_key("version") {
        println!("lifelined {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    // Initialize logging
    let log_level = cli_args
        .get("log-level")
        .and_then(|level| LogLevel::from_str(level).ok())
        .unwrap_or_default();
    let log_options = LogOptions {
        log_level,
        json_format: cli_args.contains_key("json-logs"),
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Client wait mode
    if cli_args.contains_key("wait") {
        if let Err(e) = wait_mode(&cli_args).await {
            error!("Wait failed: {e}");
            std::process::exit(1);
        }
        return;
    }

    // Run the server starting here
    let mut options = AppOptions::default();
    if let Some(host) = cli_args.get("host") {
        options.server.host = host.clone();
    }
    if let Some(port) = cli_args.get("port").and_then(|p| p.parse().ok()) {
        options.server.port = port;
    }
    if let Some(url) = cli_args.get("orchestrator-url") {
        options.orchestrator_base_url = url.clone();
    }
    if let Some(timeout) = cli_args.get("default-timeout").and_then(|t| t.parse().ok()) {
        options.default_deployment_timeout = Duration::from_secs(timeout);
    }

    info!("Running lifeline server with options: {:?}", options);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the server: {e}");
    }
}

/// Wait for a tracked deployment to complete, prompting to continue
/// after each timeout unless `--non-interactive` is set
async fn wait_mode(cli_args: &HashMap<String, String>) -> Result<(), LifelineError> {
    let server = cli_args
        .get("server")
        .cloned()
        .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());
    let app_name = required_arg(cli_args, "app")?;
    let service_name = required_arg(cli_args, "service")?;
    let deployment_id = required_arg(cli_args, "deployment")?;
    let deployment_id = Uuid::parse_str(&deployment_id)
        .map_err(|e| LifelineError::ValidationError(format!("invalid deployment id: {e}")))?;
    let timeout = cli_args
        .get("timeout")
        .and_then(|t| t.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(300));
    let interactive = !cli_args.contains_key("non-interactive");

    let client = RestClient::new(&server)?;
    let handle = client.deployment_handle(&app_name, &service_name, deployment_id);
    let mut latch = LifecycleEventsLatch::new(Arc::new(handle), LatchOptions::default());

    wait_with_continuation(&mut latch, timeout, interactive, || {
        prompt_continue(timeout)
    })
    .await?;

    println!(
        "Deployment {} completed ({} events)",
        deployment_id,
        latch.observed_events().len()
    );
    Ok(())
}

fn required_arg(cli_args: &HashMap<String, String>, key: &str) -> Result<String, LifelineError> {
    cli_args
        .get(key)
        .cloned()
        .ok_or_else(|| LifelineError::ValidationError(format!("missing required --{key}= argument")))
}

fn prompt_continue(timeout: Duration) -> bool {
    print!(
        "Timed out after {:?} waiting for lifecycle events. Continue waiting? [y/n] ",
        timeout
    );
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
