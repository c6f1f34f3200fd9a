//! Authorize-LDAP authenticates users against a directory server and returns
//! a normalized identity.
//!
//! ```no_run
//! use authorize_ldap::{AuthenticationStrategy, LoginRequest, ServiceSettings, UserQuery};
//!
//! # async fn run() -> authorize_ldap::Result<()> {
//! let settings = ServiceSettings::new("ldap.example.com", "cn=svc,dc=example,dc=com", "svcpw")
//!     .with_port(389)
//!     .with_authorization_attribute("employeeType")
//!     .with_allowed_attributes(["staff,contractor"]);
//! let strategy = AuthenticationStrategy::new(settings);
//!
//! let query = UserQuery::new("jdoe")
//!     .with_search_filter("(sAMAccountName={username})")
//!     .with_search_base("dc=example,dc=com")
//!     .with_field("id", "sAMAccountName")
//!     .with_field("display_name", "dn")
//!     .with_field("username", "sAMAccountName")
//!     .with_field("email", "mail")
//!     .with_field("firstname", "givenName")
//!     .with_field("lastname", "sn");
//! let identity = strategy.login(&LoginRequest::new(query, "secret")).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod ldap;
mod secret;
mod settings;
pub mod strategy;
pub mod telemetry;

pub use error::{AuthError, Result};
pub use ldap::{DirectoryEntry, DirectorySession};
pub use secret::Secret;
pub use settings::{ServiceBind, ServiceSettings};
pub use strategy::{
    AuthenticationStrategy, Identity, LoginRequest, SettingsReport, UserQuery,
    validate_settings,
};
