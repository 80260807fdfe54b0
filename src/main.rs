#![allow(non_snake_case)]

mod cli;

use std::env;

use eatoutBot::config::{AppConfig, Settings};
use eatoutBot::runtime;
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_RUN_MODE: &str = "api";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            error!(error = %err, "ignoring unreadable config file");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };

    let settings = match Settings::from_config(&config) {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let run_mode = config
        .lookup("RUN_MODE")
        .unwrap_or(DEFAULT_RUN_MODE.to_string());
    let result = match run_mode.as_str() {
        "api" => runtime::run_api(settings).await,
        "cli" => cli::cli(settings).await,
        other => {
            error!(run_mode = other, "invalid run mode");
            std::process::exit(2);
        }
    };
    if let Err(err) = result {
        error!(error = %err, "exiting");
        std::process::exit(1);
    }
}
