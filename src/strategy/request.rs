//! Caller supplied requests and their validated form.

use std::collections::HashMap;

use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use super::fields::FieldMap;
use crate::error::{AuthError, Result};
use crate::secret::Secret;

/// Everything needed to find a user in the directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct UserQuery {
    #[validate(length(min = 1))]
    pub username: String,
    /// Filter template with a `{username}` placeholder.
    #[serde(default)]
    #[validate(contains(pattern = "{username}"))]
    pub search_filter: String,
    /// Root of the subtree search.
    #[serde(default)]
    #[validate(length(min = 1))]
    pub search_base: String,
    /// Identity field name to attribute name.
    #[serde(default)]
    pub field_map: HashMap<String, String>,
}

impl UserQuery {
    /// Create a new [`UserQuery`] for `username`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    /// Update `search_filter`.
    pub fn with_search_filter(mut self, template: impl Into<String>) -> Self {
        self.search_filter = template.into();
        self
    }

    /// Update `search_base`.
    pub fn with_search_base(mut self, base: impl Into<String>) -> Self {
        self.search_base = base.into();
        self
    }

    /// Map identity field `name` to directory attribute `attribute`.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.field_map.insert(name.into(), attribute.into());
        self
    }

    /// Check every argument and parse the field map.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingArguments`] naming every faulty field.
    pub fn validated(&self) -> Result<ValidatedQuery<'_>> {
        let mut missing = self
            .validate()
            .err()
            .map(|errors| invalid_fields(&errors))
            .unwrap_or_default();

        let fields = match FieldMap::try_from(&self.field_map) {
            Ok(fields) => Some(fields),
            Err(AuthError::MissingArguments { fields }) => {
                missing.extend(fields);
                None
            },
            Err(err) => return Err(err),
        };

        match fields {
            Some(fields) if missing.is_empty() => Ok(ValidatedQuery {
                username: &self.username,
                search_filter: &self.search_filter,
                search_base: &self.search_base,
                fields,
            }),
            _ => Err(AuthError::MissingArguments { fields: missing }),
        }
    }
}

/// Login attempt: a [`UserQuery`] and the credential to verify.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoginRequest {
    #[serde(flatten)]
    pub query: UserQuery,
    /// Absent only when the transport already authenticated the user.
    #[serde(default)]
    pub credential: Option<Secret>,
}

impl LoginRequest {
    /// Create a new [`LoginRequest`] with a password.
    pub fn new(query: UserQuery, credential: impl Into<Secret>) -> Self {
        Self {
            query,
            credential: Some(credential.into()),
        }
    }

    /// Create a new [`LoginRequest`] relying on NTLM passthrough.
    pub fn passthrough(query: UserQuery) -> Self {
        Self {
            query,
            credential: None,
        }
    }
}

/// [`UserQuery`] whose arguments were all checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery<'a> {
    pub username: &'a str,
    pub search_filter: &'a str,
    pub search_base: &'a str,
    pub fields: FieldMap,
}

/// How the user credential is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification<'a> {
    /// Bind as the user with this password.
    Bind(&'a Secret),
    /// Trust the transport. Only chosen when settings enable passthrough.
    Passthrough,
}

/// [`LoginRequest`] ready to hit the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLogin<'a> {
    pub query: ValidatedQuery<'a>,
    pub verification: Verification<'a>,
}

fn invalid_fields(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    fields
}
