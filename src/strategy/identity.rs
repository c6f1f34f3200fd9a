use std::collections::BTreeMap;

use serde::Serialize;

use super::fields::{CanonicalField, FieldMap};
use crate::ldap::DirectoryEntry;

/// Placeholder access token: the user was authenticated by a directory bind,
/// no real token is minted here.
pub const ACCESS_TOKEN_MARKER: &str = "ldap";

/// Normalized identity built from a directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    /// `None` when the mapped attribute is absent, unlike an empty value.
    pub username: Option<String>,
    /// `None` when the mapped attribute is absent, unlike an empty value.
    pub email: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub access_token: String,
    pub custom: BTreeMap<String, String>,
}

impl Identity {
    /// Map `entry` with `fields`.
    pub fn from_entry(entry: &DirectoryEntry, fields: &FieldMap) -> Self {
        let value = |field| fields.get(field).resolve(entry).map(str::to_owned);

        Self {
            id: value(CanonicalField::Id).unwrap_or_default(),
            display_name: value(CanonicalField::DisplayName).unwrap_or_default(),
            username: value(CanonicalField::Username),
            email: value(CanonicalField::Email),
            firstname: value(CanonicalField::Firstname).unwrap_or_default(),
            lastname: value(CanonicalField::Lastname).unwrap_or_default(),
            access_token: ACCESS_TOKEN_MARKER.to_owned(),
            custom: fields
                .custom()
                .iter()
                .map(|(name, source)| {
                    let value = source.resolve(entry).unwrap_or_default();
                    (name.clone(), value.to_owned())
                })
                .collect(),
        }
    }
}
