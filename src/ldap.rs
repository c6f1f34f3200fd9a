//! LDAP support.
//!
//! [`Connector`] and [`Connection`] are the protocol primitives,
//! [`DirectorySession`] builds the service bind, search and user re-bind on
//! top of them.

mod connection;
mod entry;
pub mod filter;
mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use connection::{
    ConnectOptions, Connection, Connector, Ldap3Connection, Ldap3Connector,
};
pub use entry::DirectoryEntry;
pub use session::DirectorySession;
