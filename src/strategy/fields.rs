//! Mapping from identity fields to directory attributes.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AuthError, Result};
use crate::ldap::DirectoryEntry;

/// Field value meaning "use the distinguished name of the entry".
pub const DN_SENTINEL: &str = "dn";

/// Fields every identity has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    Id,
    DisplayName,
    Username,
    Email,
    Firstname,
    Lastname,
}

impl CanonicalField {
    pub const ALL: [Self; 6] = [
        Self::Id,
        Self::DisplayName,
        Self::Username,
        Self::Email,
        Self::Firstname,
        Self::Lastname,
    ];

    /// Key of the field in a raw field map.
    pub fn key(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::DisplayName => "display_name",
            Self::Username => "username",
            Self::Email => "email",
            Self::Firstname => "firstname",
            Self::Lastname => "lastname",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

/// Where the value of a field comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSource {
    /// Distinguished name of the entry.
    Dn,
    /// First value of the named attribute.
    Attribute(String),
}

impl AttributeSource {
    /// Read the value on `entry`.
    pub fn resolve<'a>(&'a self, entry: &'a DirectoryEntry) -> Option<&'a str> {
        match self {
            Self::Dn => Some(&entry.dn),
            Self::Attribute(name) => entry.first(name),
        }
    }

    /// Attribute to request on search, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::Dn => None,
            Self::Attribute(name) => Some(name),
        }
    }
}

impl From<&str> for AttributeSource {
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case(DN_SENTINEL) {
            Self::Dn
        } else {
            Self::Attribute(value.trim().to_owned())
        }
    }
}

/// Typed field map: six canonical fields plus custom ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    canonical: [AttributeSource; 6],
    custom: BTreeMap<String, AttributeSource>,
}

impl FieldMap {
    /// Source of a canonical field.
    pub fn get(&self, field: CanonicalField) -> &AttributeSource {
        &self.canonical[field as usize]
    }

    /// Custom fields, by name.
    pub fn custom(&self) -> &BTreeMap<String, AttributeSource> {
        &self.custom
    }

    /// Every attribute to request, without duplicates, `defaults` last.
    pub fn requested_attributes<'a>(
        &'a self,
        defaults: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut attributes: Vec<String> = Vec::new();
        let names = self
            .canonical
            .iter()
            .chain(self.custom.values())
            .filter_map(AttributeSource::attribute)
            .chain(defaults);

        for name in names {
            if !attributes.iter().any(|a| a.eq_ignore_ascii_case(name)) {
                attributes.push(name.to_owned());
            }
        }
        attributes
    }
}

impl TryFrom<&HashMap<String, String>> for FieldMap {
    type Error = AuthError;

    /// Parse a raw field map.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingArguments`] listing every canonical key
    /// that is absent or empty.
    fn try_from(raw: &HashMap<String, String>) -> Result<Self> {
        let lookup = |field: CanonicalField| {
            raw.get(field.key())
                .filter(|value| !value.trim().is_empty())
                .map(|value| AttributeSource::from(value.as_str()))
        };

        let missing: Vec<String> = CanonicalField::ALL
            .into_iter()
            .filter(|field| lookup(*field).is_none())
            .map(|field| format!("field_map.{}", field.key()))
            .collect();
        if !missing.is_empty() {
            return Err(AuthError::MissingArguments { fields: missing });
        }

        let canonical = CanonicalField::ALL
            .map(|field| lookup(field).unwrap_or(AttributeSource::Dn));
        let custom = raw
            .iter()
            .filter(|(key, _)| CanonicalField::from_key(key).is_none())
            .map(|(key, value)| (key.clone(), AttributeSource::from(value.as_str())))
            .collect();

        Ok(Self { canonical, custom })
    }
}
