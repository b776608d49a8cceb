// erasure/src/commands/execute.rs
//
// USE CASE: Run one action from the command line, as the catalog would trigger it.

use anyhow::Context;
use std::io::Read;
use std::path::{Path, PathBuf};

use erasure_core::application::{LiveServices, execute_action};
use erasure_core::domain::{ActionRequest, ActionStatus};
use erasure_core::infrastructure::config::load_app_config;

use crate::logging::{self, Console};

pub async fn execute(config_path: PathBuf, request_path: PathBuf) -> anyhow::Result<()> {
    let config = load_app_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;
    logging::init(&config.server.log_path, Console::Stderr)?;

    let request = read_request(&request_path)?;
    let services = LiveServices::new(config.clone());
    let response = execute_action(&request, &services, &config).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    if response.status_enum != ActionStatus::Completed {
        // Exit with error code for schedulers
        std::process::exit(1);
    }
    Ok(())
}

fn read_request(path: &Path) -> anyhow::Result<ActionRequest> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read trigger from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read trigger {:?}", path))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid trigger JSON in {:?}", path))
}
