//! Directory protocol primitives and their `ldap3` adapter.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use url::Url;

use super::entry::DirectoryEntry;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport options applied when opening a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Timeout of the connect step and of every operation.
    pub timeout: Duration,
    /// Upgrade a plain `ldap://` connection with StartTLS.
    pub starttls: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            starttls: false,
        }
    }
}

/// Port opening connections to a directory server.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Connection;

    /// Open a new, unauthenticated connection.
    async fn connect(
        &self,
        url: &Url,
        options: &ConnectOptions,
    ) -> Result<Self::Connection, LdapError>;
}

/// One live connection to a directory server.
#[async_trait]
pub trait Connection: Send {
    /// Simple bind.
    ///
    /// `Ok(false)` means the server refused the credential, `Err` is kept for
    /// transport failures.
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<bool, LdapError>;

    /// Subtree search under `base`.
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>, LdapError>;

    /// Release the connection.
    async fn unbind(&mut self) -> Result<(), LdapError>;
}

/// [`Connector`] backed by [`ldap3`].
///
/// `ldap3` only speaks LDAPv3 and never chases referrals: a referral comes
/// back as a non-zero result code and fails the operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

#[async_trait]
impl Connector for Ldap3Connector {
    type Connection = Ldap3Connection;

    async fn connect(
        &self,
        url: &Url,
        options: &ConnectOptions,
    ) -> Result<Ldap3Connection, LdapError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(options.timeout)
            .set_starttls(options.starttls);

        let (handle, conn) =
            LdapConnAsync::with_settings(settings, url.as_str()).await?;
        ldap3::drive!(handle);

        Ok(Ldap3Connection {
            conn,
            timeout: options.timeout,
        })
    }
}

/// [`Connection`] backed by [`ldap3::Ldap`].
#[derive(Debug)]
pub struct Ldap3Connection {
    conn: Ldap,
    timeout: Duration,
}

#[async_trait]
impl Connection for Ldap3Connection {
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<bool, LdapError> {
        let result = self
            .conn
            .with_timeout(self.timeout)
            .simple_bind(dn, secret)
            .await?;

        if result.rc != 0 {
            tracing::debug!(rc = result.rc, "bind refused");
        }

        Ok(result.rc == 0)
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>, LdapError> {
        let (entries, _res) = self
            .conn
            .with_timeout(self.timeout)
            .search(base, Scope::Subtree, filter, attributes)
            .await?
            .success()?;

        // Continuation references point to other servers, ignore them.
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_ref())
            .map(|entry| SearchEntry::construct(entry).into())
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), LdapError> {
        self.conn.unbind().await
    }
}
