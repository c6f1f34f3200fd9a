//! In-memory directory used by tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ldap3::LdapError;
use url::Url;

use super::connection::{ConnectOptions, Connection, Connector};
use super::entry::DirectoryEntry;

#[derive(Debug, Default)]
struct State {
    unreachable: bool,
    failing_searches: bool,
    accounts: HashMap<String, String>,
    entries: Vec<DirectoryEntry>,
    next_id: usize,
    open: HashSet<usize>,
    urls: Vec<String>,
    binds: Vec<String>,
    searches: Vec<(String, String, Vec<String>)>,
    unbinds: usize,
}

/// Fake directory server recording every operation.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bindable DN.
    pub fn with_account(self, dn: &str, password: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(dn.to_owned(), password.to_owned());
        self
    }

    /// Add a searchable entry.
    pub fn with_entry(self, entry: DirectoryEntry) -> Self {
        self.state.lock().unwrap().entries.push(entry);
        self
    }

    /// Refuse every connection.
    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    /// Fail every search.
    pub fn failing_searches(self) -> Self {
        self.state.lock().unwrap().failing_searches = true;
        self
    }

    /// Connections not unbound yet.
    pub fn open_connections(&self) -> usize {
        self.state.lock().unwrap().open.len()
    }

    /// Connections opened so far.
    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().next_id
    }

    /// URLs used to connect.
    pub fn urls(&self) -> Vec<String> {
        self.state.lock().unwrap().urls.clone()
    }

    /// DNs of successful binds.
    pub fn binds(&self) -> Vec<String> {
        self.state.lock().unwrap().binds.clone()
    }

    /// Searches as `(base, filter, attributes)`.
    pub fn searches(&self) -> Vec<(String, String, Vec<String>)> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn unbinds(&self) -> usize {
        self.state.lock().unwrap().unbinds
    }
}

#[async_trait]
impl Connector for MemoryDirectory {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        url: &Url,
        _options: &ConnectOptions,
    ) -> Result<MemoryConnection, LdapError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )
            .into());
        }

        let id = state.next_id;
        state.next_id += 1;
        state.open.insert(id);
        state.urls.push(url.to_string());

        Ok(MemoryConnection {
            id,
            state: Arc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct MemoryConnection {
    id: usize,
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<bool, LdapError> {
        let mut state = self.state.lock().unwrap();
        let verified = state.accounts.get(dn).is_some_and(|pwd| pwd == secret);
        if verified {
            state.binds.push(dn.to_owned());
        }
        Ok(verified)
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>, LdapError> {
        let mut state = self.state.lock().unwrap();
        state
            .searches
            .push((base.to_owned(), filter.to_owned(), attributes.to_vec()));

        if state.failing_searches {
            return Err(LdapError::FilterParsing);
        }
        let (name, value) = parse_equality(filter).ok_or(LdapError::FilterParsing)?;

        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.dn.ends_with(base))
            .filter(|entry| entry.values(&name).iter().any(|v| *v == value))
            .cloned()
            .collect())
    }

    async fn unbind(&mut self) -> Result<(), LdapError> {
        let mut state = self.state.lock().unwrap();
        state.open.remove(&self.id);
        state.unbinds += 1;
        Ok(())
    }
}

/// Parse `(name=value)` and unescape `\XX` sequences of the value.
fn parse_equality(filter: &str) -> Option<(String, String)> {
    let inner = filter.strip_prefix('(')?.strip_suffix(')')?;
    let (name, raw) = inner.split_once('=')?;
    if name.is_empty() || raw.contains(['(', ')', '*']) {
        return None;
    }

    let mut bytes = Vec::with_capacity(raw.len());
    let mut chars = raw.bytes();
    while let Some(b) = chars.next() {
        if b == b'\\' {
            let hex = [chars.next()?, chars.next()?];
            bytes.push(u8::from_str_radix(std::str::from_utf8(&hex).ok()?, 16).ok()?);
        } else {
            bytes.push(b);
        }
    }

    Some((name.to_owned(), String::from_utf8(bytes).ok()?))
}
