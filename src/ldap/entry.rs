use std::collections::HashMap;

use ldap3::SearchEntry;

/// A single directory entry returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute name to values, in server order.
    pub attrs: HashMap<String, Vec<String>>,
    /// Attributes whose values are not UTF-8 (`objectGUID`, `objectSid`).
    /// Only their names are kept.
    pub binary: Vec<String>,
}

impl DirectoryEntry {
    /// Create a new [`DirectoryEntry`] without attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
            binary: Vec::new(),
        }
    }

    /// Add `values` for attribute `name`.
    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Every value of an attribute.
    ///
    /// Attribute names are case-insensitive, servers do not always answer
    /// with the spelling that was requested.
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .get(name)
            .or_else(|| {
                self.attrs
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, values)| values)
            })
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether the server answered `name` with non UTF-8 values.
    pub fn is_binary(&self, name: &str) -> bool {
        self.binary.iter().any(|key| key.eq_ignore_ascii_case(name))
    }

    /// First value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
            binary: entry.bin_attrs.into_keys().collect(),
        }
    }
}
