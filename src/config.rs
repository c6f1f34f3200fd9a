//! Configuration manager.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::secret::Secret;
use crate::settings::ServiceSettings;
use crate::strategy::UserQuery;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Error raised while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Configuration {
    /// Related to the directory server.
    pub connection: Connection,
    /// Related to the service account and the search.
    pub application: Application,
    /// Identity field name to directory attribute.
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(skip)]
    path: PathBuf,
}

/// Directory server location.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Connection {
    /// Hostname or `ldap://`/`ldaps://` URL.
    pub url: String,
    pub port: Option<u16>,
    /// Timeout in seconds.
    pub timeout: Option<u64>,
    #[serde(default)]
    pub starttls: bool,
}

/// Service account, search defaults and authorization.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Application {
    /// Service account DN.
    pub username: String,
    pub password: Option<Secret>,
    /// Default filter template, e.g. `(sAMAccountName={username})`.
    pub search_filter: Option<String>,
    /// Default search base.
    pub search_base: Option<String>,
    #[serde(default)]
    pub allowed_attributes: AllowedAttributes,
    /// Attribute holding plain authorization tags, e.g. `employeeType`.
    /// Required with `allowed_attributes`.
    pub authorization_attribute: Option<String>,
    /// Enable NTLM passthrough.
    #[serde(default)]
    pub ntlm: bool,
}

/// Allow-list, either a YAML list or a comma separated string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AllowedAttributes {
    List(Vec<String>),
    Joined(String),
}

impl Default for AllowedAttributes {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl AllowedAttributes {
    fn values(&self) -> Vec<&str> {
        match self {
            Self::List(values) => values.iter().map(String::as_str).collect(),
            Self::Joined(value) => vec![value.as_str()],
        }
    }
}

impl Configuration {
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Self, ConfigError> {
        let file_path = if self.path.as_os_str().is_empty() {
            PathBuf::from(DEFAULT_CONFIG_PATH)
        } else {
            self.path
        };

        let file = File::open(&file_path).map_err(|source| ConfigError::Io {
            path: file_path.clone(),
            source,
        })?;
        let mut config: Configuration = serde_yaml::from_reader(file)?;
        config.path = file_path;

        Ok(config)
    }

    /// Parse a YAML document.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Build the [`ServiceSettings`].
    pub fn settings(&self) -> ServiceSettings {
        let app = &self.application;
        let mut settings = ServiceSettings::new(
            self.connection.url.clone(),
            app.username.clone(),
            app.password.clone().unwrap_or_default(),
        )
        .with_allowed_attributes(app.allowed_attributes.values())
        .with_ntlm_passthrough(app.ntlm)
        .with_starttls(self.connection.starttls);

        if let Some(name) = &app.authorization_attribute {
            settings = settings.with_authorization_attribute(name.clone());
        }
        if app.password.is_none() {
            settings = settings.without_password();
        }
        if let Some(port) = self.connection.port {
            settings = settings.with_port(port);
        }
        if let Some(timeout) = self.connection.timeout {
            settings = settings.with_timeout(Duration::from_secs(timeout));
        }

        settings
    }

    /// Build a [`UserQuery`] for `username` from the configured search
    /// defaults and field map.
    pub fn query(&self, username: impl Into<String>) -> UserQuery {
        UserQuery {
            username: username.into(),
            search_filter: self.application.search_filter.clone().unwrap_or_default(),
            search_base: self.application.search_base.clone().unwrap_or_default(),
            field_map: self.fields.clone(),
        }
    }
}
