//! Directory authentication strategy.
//!
//! A login goes through `validated -> resolved -> authorized -> verified`,
//! any failure ends the call. Every call owns its own [`DirectorySession`],
//! closed before returning whatever the outcome.

mod diagnostic;
mod fields;
mod identity;
mod request;

use std::sync::Arc;

pub use diagnostic::{SettingsReport, validate_settings};
pub use fields::{AttributeSource, CanonicalField, DN_SENTINEL, FieldMap};
pub use identity::{ACCESS_TOKEN_MARKER, Identity};
pub use request::{
    LoginRequest, UserQuery, ValidatedLogin, ValidatedQuery, Verification,
};

use crate::error::{AuthError, Result};
use crate::ldap::{
    Connector, DirectoryEntry, DirectorySession, Ldap3Connector, filter,
};
use crate::settings::ServiceSettings;
use crate::telemetry;

/// Attribute always requested, so an account name is available even if the
/// field map does not ask for it.
pub const DEFAULT_REQUESTED_ATTRIBUTES: &[&str] = &["sAMAccountName"];

/// Authenticate users against a directory server.
#[derive(Debug, Clone)]
pub struct AuthenticationStrategy<K = Ldap3Connector> {
    settings: Arc<ServiceSettings>,
    connector: K,
}

impl AuthenticationStrategy<Ldap3Connector> {
    /// Create a new [`AuthenticationStrategy`] using [`ldap3`].
    pub fn new(settings: ServiceSettings) -> Self {
        Self::with_connector(settings, Ldap3Connector)
    }
}

impl<K: Connector> AuthenticationStrategy<K> {
    /// Create a new [`AuthenticationStrategy`] over any [`Connector`].
    pub fn with_connector(settings: ServiceSettings, connector: K) -> Self {
        Self {
            settings: Arc::new(settings),
            connector,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Check a login request before any network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingArguments`] naming every faulty field.
    pub fn validate_request<'a>(
        &self,
        req: &'a LoginRequest,
    ) -> Result<ValidatedLogin<'a>> {
        let query = req.query.validated();
        let verification = match &req.credential {
            Some(secret) => Ok(Verification::Bind(secret)),
            None if self.settings.ntlm_passthrough => {
                Ok(Verification::Passthrough)
            },
            None => Err(AuthError::missing("credential")),
        };

        match (query, verification) {
            (Ok(query), Ok(verification)) => Ok(ValidatedLogin {
                query,
                verification,
            }),
            (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
            (
                Err(AuthError::MissingArguments { mut fields }),
                Err(AuthError::MissingArguments { fields: credential }),
            ) => {
                fields.extend(credential);
                Err(AuthError::MissingArguments { fields })
            },
            (Err(err), Err(_)) => Err(err),
        }
    }

    /// Find the single entry matching `query`, map it and check the
    /// allow-list.
    ///
    /// # Errors
    ///
    /// - [`AuthError::DirectorySearch`] if the search itself fails.
    /// - [`AuthError::UserNotFound`] on zero or several matches, or when the
    ///   display name ends up empty.
    /// - [`AuthError::Authorization`] if no authorization tag is allowed.
    #[tracing::instrument(skip_all, fields(username = %query.username))]
    pub async fn resolve_user(
        &self,
        session: &mut DirectorySession<K::Connection>,
        query: &ValidatedQuery<'_>,
    ) -> Result<(DirectoryEntry, Identity)> {
        let search_filter = filter::render(query.search_filter, query.username);
        let authorization_attribute =
            self.settings.authorization_attribute.as_deref();
        let attributes = query.fields.requested_attributes(
            DEFAULT_REQUESTED_ATTRIBUTES
                .iter()
                .copied()
                .chain(authorization_attribute),
        );

        let entries = session
            .search(query.search_base, &search_filter, &attributes)
            .await?;

        // Several matches are as bad as none: never pick one.
        let count = entries.len();
        let Ok([entry]) = <[DirectoryEntry; 1]>::try_from(entries) else {
            tracing::debug!(matches = count, "no unique entry");
            return Err(AuthError::UserNotFound);
        };

        let identity = Identity::from_entry(&entry, &query.fields);
        if identity.display_name.is_empty() || entry.dn.is_empty() {
            tracing::debug!(dn = %entry.dn, "entry without display name");
            return Err(AuthError::UserNotFound);
        }

        for name in attributes.iter().filter(|name| entry.is_binary(name)) {
            tracing::debug!(
                dn = %entry.dn,
                attribute = %name,
                "binary attribute not mapped"
            );
        }

        let tags = authorization_attribute
            .map(|name| entry.values(name))
            .unwrap_or_default();
        if !self.settings.allows(tags) {
            tracing::debug!(dn = %entry.dn, "no allowed authorization tag");
            return Err(AuthError::Authorization);
        }

        Ok((entry, identity))
    }

    /// Look a user up without verifying any credential.
    pub async fn get_user(&self, query: &UserQuery) -> Result<Identity> {
        let query = query.validated()?;
        let mut session =
            DirectorySession::open(&self.connector, &self.settings).await?;

        let resolved = self.resolve_user(&mut session, &query).await;
        session.close().await;

        resolved.map(|(_, identity)| identity)
    }

    /// Authenticate a user and return its identity.
    #[tracing::instrument(skip_all, fields(username = %req.query.username))]
    pub async fn login(&self, req: &LoginRequest) -> Result<Identity> {
        let result = self.try_login(req).await;

        match &result {
            Ok(_) => telemetry::record_login_success(match req.credential {
                Some(_) => "bind",
                None => "passthrough",
            }),
            Err(err) => telemetry::record_login_failure(err.reason()),
        }

        result
    }

    async fn try_login(&self, req: &LoginRequest) -> Result<Identity> {
        let validated = self.validate_request(req)?;
        let mut session =
            DirectorySession::open(&self.connector, &self.settings).await?;

        let resolved = self.resolve_user(&mut session, &validated.query).await;
        let (entry, identity) = match resolved {
            Ok(resolved) => resolved,
            Err(err) => {
                session.close().await;
                return Err(err);
            },
        };

        let verified = match validated.verification {
            Verification::Bind(secret) => {
                session.rebind(&entry.dn, secret).await
            },
            Verification::Passthrough => {
                session.close().await;
                self.settings.ntlm_passthrough
            },
        };

        if !verified {
            return Err(AuthError::Authentication);
        }

        Ok(identity)
    }

    /// Probe the settings of this strategy. See [`validate_settings`].
    pub async fn validate_settings(&self) -> SettingsReport {
        validate_settings(&self.connector, &self.settings).await
    }
}
