use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::AppState;
use crate::config::Config;
use crate::inference::session::OnnxClassifier;
use crate::telemetry::{init_telemetry, shutdown_telemetry};

#[macro_export]
macro_rules! exit_err {
    ($code:expr, $fmt:expr $(, $arg:expr)*) => {
        {
            error!($fmt $(, $arg)*);
            std::process::exit($code);
        }
    };
}

mod api;
mod config;
mod error;
mod inference;
mod telemetry;

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

const DEFAULT_CONFIG_FILE: &str = "classifier_server.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_error) = match Config::from_toml(&args.config_file) {
        Ok(conf) => (conf.merge(args.opt_config), None),
        Err(err) => {
            // Only a config file that was asked for explicitly has to exist
            let err = (args.config_file != DEFAULT_CONFIG_FILE).then_some(err);
            (Config::default().merge(args.opt_config), err)
        }
    };

    init_telemetry(config.otlp_endpoint(), config.console)?;
    if let Some(err) = config_error {
        exit_err!(
            1,
            "Failed to read configuration file {} with error: {}",
            args.config_file,
            err
        );
    }

    let model_path = config.model_path();
    let classifier = match OnnxClassifier::load(
        &model_path,
        config.output_selector(),
        config.intra_threads,
    ) {
        Ok(classifier) => classifier,
        Err(err) => exit_err!(1, "Failed to start without a model: {:#}", err),
    };

    let state = AppState {
        classifier: Arc::new(classifier),
        error_policy: config.error_policy(),
        max_body_bytes: config.max_body_bytes,
    };
    let router = api::router(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_telemetry(config.otlp_endpoint());
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
