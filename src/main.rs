//! Check a directory configuration, and optionally look a user up.
//!
//! Usage: `CONFIG_PATH=config.yaml authorize-ldap-check [username]`

use std::process::ExitCode;

use authorize_ldap::AuthenticationStrategy;
use authorize_ldap::config::{Configuration, DEFAULT_CONFIG_PATH};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn print(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "cannot serialize output"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let config = match Configuration::default().path(path).read() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "cannot read configuration");
            return ExitCode::FAILURE;
        },
    };

    let strategy = AuthenticationStrategy::new(config.settings());
    let report = strategy.validate_settings().await;
    print(&report);
    if !report.is_healthy() {
        return ExitCode::FAILURE;
    }

    if let Some(username) = std::env::args().nth(1) {
        match strategy.get_user(&config.query(username)).await {
            Ok(identity) => print(&identity),
            Err(err) => {
                tracing::error!(error = %err, "lookup failed");
                return ExitCode::FAILURE;
            },
        }
    }

    ExitCode::SUCCESS
}
