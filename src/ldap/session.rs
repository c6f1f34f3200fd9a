//! One authenticated connection to the directory server.

use crate::error::{AuthError, Result};
use crate::secret::Secret;
use crate::settings::{ServiceBind, ServiceSettings};

use super::connection::{Connection, Connector};
use super::entry::DirectoryEntry;

/// Connection bound with the service account.
///
/// A session is owned by exactly one call. Re-binding as the end user
/// consumes it, so nothing privileged can run afterwards.
#[derive(Debug)]
pub struct DirectorySession<C: Connection> {
    conn: Option<C>,
}

impl<C: Connection> DirectorySession<C> {
    /// Connect and perform the service bind.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfiguration`] when the server cannot be
    /// reached or refuses the service credentials.
    #[tracing::instrument(skip_all, fields(url = %settings.connection_url))]
    pub async fn open<K>(connector: &K, settings: &ServiceSettings) -> Result<Self>
    where
        K: Connector<Connection = C>,
    {
        let url = settings
            .ldap_url()
            .map_err(|err| AuthError::configuration(format!("invalid connection url: {err}")))?;
        let bind = settings.service_bind()?;
        settings.check_authorization()?;

        let conn = connector.connect(&url, &settings.options).await.map_err(|err| {
            tracing::error!(error = %err, "cannot connect to directory");
            AuthError::configuration(format!("cannot connect to {url}"))
        })?;
        let mut session = Self { conn: Some(conn) };

        match bind {
            ServiceBind::Skip => {
                tracing::debug!("passthrough mode, service bind skipped");
            },
            ServiceBind::Simple { dn, password } => {
                let outcome = match session.conn.as_mut() {
                    Some(conn) => conn.bind(dn, password.expose()).await,
                    None => return Err(AuthError::SessionClosed),
                };

                match outcome {
                    Ok(true) => tracing::debug!(dn, "service bind succeeded"),
                    Ok(false) => {
                        session.close().await;
                        return Err(AuthError::configuration(
                            "service credentials rejected",
                        ));
                    },
                    Err(err) => {
                        tracing::error!(error = %err, "service bind failed");
                        session.close().await;
                        return Err(AuthError::configuration("service bind failed"));
                    },
                }
            },
        }

        Ok(session)
    }

    /// Subtree search under `base`.
    ///
    /// No match is a valid, empty outcome.
    #[tracing::instrument(skip(self, attributes))]
    pub async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>> {
        let conn = self.conn.as_mut().ok_or(AuthError::SessionClosed)?;

        let entries = conn
            .search(base, filter, attributes)
            .await
            .map_err(AuthError::DirectorySearch)?;
        tracing::debug!(matches = entries.len(), "directory search done");

        Ok(entries)
    }

    /// Bind as `dn` and close the session.
    ///
    /// Any failure, an empty credential included, is `false`. An empty
    /// password would be an unauthenticated bind that servers accept.
    pub async fn rebind(mut self, dn: &str, credential: &Secret) -> bool {
        let verified = match self.conn.as_mut() {
            Some(_) if dn.is_empty() || credential.is_empty() => {
                tracing::debug!("refusing bind with empty dn or credential");
                false
            },
            Some(conn) => match conn.bind(dn, credential.expose()).await {
                Ok(verified) => verified,
                Err(err) => {
                    tracing::warn!(error = %err, "user bind failed");
                    false
                },
            },
            None => false,
        };

        self.close().await;
        verified
    }

    /// Release the connection. Calling it twice is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(err) = conn.unbind().await {
                tracing::debug!(error = %err, "unbind failed");
            }
        }
    }

    /// Returns `true` until [`Self::close`] runs.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::testing::MemoryDirectory;

    fn settings() -> ServiceSettings {
        ServiceSettings::new(
            "ldap.example.com",
            "cn=svc,dc=example,dc=com",
            "svcpw",
        )
        .with_port(389)
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .with_account("cn=svc,dc=example,dc=com", "svcpw")
            .with_account("cn=John Doe,dc=example,dc=com", "secret")
    }

    #[tokio::test]
    async fn test_open_binds_service_account() {
        let directory = directory();
        let session = DirectorySession::open(&directory, &settings()).await.unwrap();

        assert!(session.is_open());
        assert_eq!(directory.binds(), ["cn=svc,dc=example,dc=com"]);
    }

    #[tokio::test]
    async fn test_open_rejected_credentials() {
        let directory = directory();
        let settings =
            ServiceSettings::new("ldap.example.com", "cn=svc,dc=example,dc=com", "wrong");

        let err = DirectorySession::open(&directory, &settings).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidConfiguration { .. }));
        assert!(!err.to_string().contains("wrong"));
        assert_eq!(directory.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_open_unreachable() {
        let directory = directory().unreachable();

        let err = DirectorySession::open(&directory, &settings()).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidConfiguration { .. }));
        assert!(!err.to_string().contains("svcpw"));
    }

    #[tokio::test]
    async fn test_open_passthrough_skips_bind() {
        let directory = directory();
        let settings = settings().without_password().with_ntlm_passthrough(true);

        let session = DirectorySession::open(&directory, &settings).await.unwrap();

        assert!(session.is_open());
        assert!(directory.binds().is_empty());
    }

    #[tokio::test]
    async fn test_rebind_closes_session() {
        let directory = directory();

        let session = DirectorySession::open(&directory, &settings()).await.unwrap();
        assert!(session.rebind("cn=John Doe,dc=example,dc=com", &"secret".into()).await);
        assert_eq!(directory.open_connections(), 0);

        let session = DirectorySession::open(&directory, &settings()).await.unwrap();
        assert!(!session.rebind("cn=John Doe,dc=example,dc=com", &"nope".into()).await);
        assert_eq!(directory.open_connections(), 0);

        let session = DirectorySession::open(&directory, &settings()).await.unwrap();
        assert!(!session.rebind("cn=John Doe,dc=example,dc=com", &"".into()).await);
        assert_eq!(directory.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let directory = directory();
        let mut session = DirectorySession::open(&directory, &settings()).await.unwrap();

        session.close().await;
        session.close().await;

        assert!(!session.is_open());
        assert_eq!(directory.unbinds(), 1);
        assert!(matches!(
            session.search("dc=example,dc=com", "(uid=jdoe)", &[]).await,
            Err(AuthError::SessionClosed)
        ));
    }
}
