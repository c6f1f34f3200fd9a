//! Configuration health check.

use serde::Serialize;

use crate::ldap::{Connection, Connector};
use crate::settings::{ServiceBind, ServiceSettings};

/// Outcome of [`validate_settings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsReport {
    pub connected: bool,
    /// `false` when the service bind failed or was skipped (passthrough).
    pub authenticated: bool,
    pub errors: Vec<String>,
    /// RFC 3339 time of the check.
    pub checked_at: String,
}

impl SettingsReport {
    /// Returns `true` when no error was found.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Try to connect and bind with `settings`.
///
/// Never fails: every problem lands in [`SettingsReport::errors`].
#[tracing::instrument(skip_all, fields(url = %settings.connection_url))]
pub async fn validate_settings<K: Connector>(
    connector: &K,
    settings: &ServiceSettings,
) -> SettingsReport {
    let mut report = SettingsReport {
        checked_at: chrono::Utc::now().to_rfc3339(),
        ..Default::default()
    };

    let url = match settings.ldap_url() {
        Ok(url) => url,
        Err(err) => {
            report.errors.push(format!("invalid connection url: {err}"));
            return report;
        },
    };

    if let Err(err) = settings.check_authorization() {
        report.errors.push(err.to_string());
    }

    let mut conn = match connector.connect(&url, &settings.options).await {
        Ok(conn) => {
            report.connected = true;
            conn
        },
        Err(err) => {
            report.errors.push(format!("cannot connect to {url}: {err}"));
            return report;
        },
    };

    match settings.service_bind() {
        Ok(ServiceBind::Simple { dn, password }) => {
            match conn.bind(dn, password.expose()).await {
                Ok(true) => report.authenticated = true,
                Ok(false) => report
                    .errors
                    .push(format!("service credentials rejected for {dn}")),
                Err(err) => report.errors.push(format!("service bind failed: {err}")),
            }
        },
        Ok(ServiceBind::Skip) => {
            tracing::info!("passthrough mode, service bind not checked");
        },
        Err(err) => report.errors.push(err.to_string()),
    }

    if let Err(err) = conn.unbind().await {
        tracing::debug!(error = %err, "unbind failed");
    }

    tracing::info!(
        connected = report.connected,
        authenticated = report.authenticated,
        errors = report.errors.len(),
        "settings checked"
    );
    report
}
