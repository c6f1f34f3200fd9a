//! Service level settings shared by every login call.

use std::time::Duration;

use url::Url;

use crate::error::{AuthError, Result};
use crate::ldap::ConnectOptions;
use crate::secret::Secret;

const DEFAULT_SCHEME: &str = "ldap";

/// Immutable settings used to reach the directory server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// Hostname or `ldap://`/`ldaps://` URL of the directory server.
    pub connection_url: String,
    /// Port overriding the one of the URL, if any.
    pub connection_port: Option<u16>,
    /// DN used for the privileged search bind.
    pub service_username: String,
    pub service_password: Option<Secret>,
    /// Allowed authorization tags. Empty means everybody is allowed.
    pub allowed_attributes: Vec<String>,
    /// Entry attribute holding the authorization tags. Required as soon as
    /// `allowed_attributes` is not empty.
    pub authorization_attribute: Option<String>,
    /// Trust an upstream transport (NTLM, Kerberos) instead of re-binding.
    pub ntlm_passthrough: bool,
    pub options: ConnectOptions,
}

/// How the service connection authenticates itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceBind<'a> {
    Simple { dn: &'a str, password: &'a Secret },
    /// Passthrough mode without service password: connectivity is trusted.
    Skip,
}

impl ServiceSettings {
    /// Create a new [`ServiceSettings`] with a service account.
    pub fn new(
        connection_url: impl Into<String>,
        service_username: impl Into<String>,
        service_password: impl Into<Secret>,
    ) -> Self {
        Self {
            connection_url: connection_url.into(),
            connection_port: None,
            service_username: service_username.into(),
            service_password: Some(service_password.into()),
            allowed_attributes: Vec::new(),
            authorization_attribute: None,
            ntlm_passthrough: false,
            options: ConnectOptions::default(),
        }
    }

    /// Update `connection_port`.
    pub fn with_port(mut self, port: u16) -> Self {
        self.connection_port = Some(port);
        self
    }

    /// Remove the service password.
    pub fn without_password(mut self) -> Self {
        self.service_password = None;
        self
    }

    /// Replace the allow-list.
    ///
    /// Every value is split on commas, so `["staff,contractor"]` and
    /// `["staff", "contractor"]` are the same list.
    pub fn with_allowed_attributes<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_attributes.clear();
        for value in values {
            for tag in split_tags(value.as_ref()) {
                if !self.allowed_attributes.iter().any(|a| a == tag) {
                    self.allowed_attributes.push(tag.to_owned());
                }
            }
        }
        self
    }

    /// Update `authorization_attribute`.
    pub fn with_authorization_attribute(mut self, name: impl Into<String>) -> Self {
        self.authorization_attribute = Some(name.into());
        self
    }

    /// Update `ntlm_passthrough`.
    pub fn with_ntlm_passthrough(mut self, enabled: bool) -> Self {
        self.ntlm_passthrough = enabled;
        self
    }

    /// Update connect and operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Enable or disable StartTLS.
    pub fn with_starttls(mut self, enabled: bool) -> Self {
        self.options.starttls = enabled;
        self
    }

    /// Build the connection URL, adding the `ldap` scheme when none is set
    /// and applying `connection_port`.
    pub fn ldap_url(&self) -> std::result::Result<Url, url::ParseError> {
        let url = self.connection_url.trim();
        let with_scheme = if url.contains("://") {
            url.to_owned()
        } else {
            format!("{DEFAULT_SCHEME}://{url}")
        };

        let mut parsed = Url::parse(&with_scheme)?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(url::ParseError::EmptyHost);
        }
        if let Some(port) = self.connection_port {
            parsed
                .set_port(Some(port))
                .map_err(|_| url::ParseError::InvalidPort)?;
        }

        Ok(parsed)
    }

    /// Service bind to perform right after connecting.
    pub fn service_bind(&self) -> Result<ServiceBind<'_>> {
        match &self.service_password {
            Some(password) if !password.is_empty() => Ok(ServiceBind::Simple {
                dn: &self.service_username,
                password,
            }),
            _ if self.ntlm_passthrough => Ok(ServiceBind::Skip),
            _ => Err(AuthError::configuration("missing service password")),
        }
    }

    /// Check the allow-list can be applied.
    ///
    /// Tags are split on commas, so a DN-valued allow-list entry
    /// (`CN=Admins,OU=Groups,...`) would fall apart into components shared
    /// by every group of the domain. Such entries are refused.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfiguration`] when the allow-list is set
    /// without an authorization attribute, or holds a DN component.
    pub fn check_authorization(&self) -> Result<()> {
        if self.allowed_attributes.is_empty() {
            return Ok(());
        }

        if self
            .authorization_attribute
            .as_deref()
            .is_none_or(|name| name.trim().is_empty())
        {
            return Err(AuthError::configuration(
                "allowed_attributes requires an authorization_attribute",
            ));
        }
        if let Some(tag) = self.allowed_attributes.iter().find(|tag| tag.contains('=')) {
            return Err(AuthError::configuration(format!(
                "allowed attribute `{tag}` looks like a DN component, \
                 use plain tags"
            )));
        }

        Ok(())
    }

    /// Whether the authorization tags of an entry pass the allow-list.
    pub fn allows<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        if self.allowed_attributes.is_empty() {
            return true;
        }

        tags.iter()
            .flat_map(|value| split_tags(value.as_ref()))
            .any(|tag| self.allowed_attributes.iter().any(|a| a == tag))
    }
}

fn split_tags(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|tag| !tag.is_empty())
}
