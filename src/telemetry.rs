//! Telemetry logic.
//! Login outcomes go to `tracing` events and `metrics` counters, the host
//! decides which recorder and subscriber to install.

use metrics::counter;

/// Record a successful login.
pub fn record_login_success(method: &'static str) {
    tracing::info!(method, "authentication successful");
    counter!("ldap_logins_total", "method" => method).increment(1);
}

/// Record a failed login.
pub fn record_login_failure(reason: &'static str) {
    tracing::info!(reason, "authentication failed");
    counter!("ldap_login_failures_total", "reason" => reason).increment(1);
}
