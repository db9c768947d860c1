//! # Resource Identifiers
//!
//! Namespaced identifiers used for registry keys, registry entries, and
//! payload type tags.
//!
//! A resource id is a `namespace:path` pair. Both halves are restricted to
//! a conservative character set so ids stay printable, case-insensitive
//! ambiguity free, and safe to embed in log lines and file names.
//!
//! Static ids (payload type tags) are backed by `Cow::Borrowed` so routing
//! on well-known ids never allocates.

use crate::error::{constants, ProtocolError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Namespace assumed when parsing an id without an explicit `namespace:` part.
pub const DEFAULT_NAMESPACE: &str = "registry";

/// A namespaced identifier, globally unique within one registry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    namespace: Cow<'static, str>,
    path: Cow<'static, str>,
}

impl ResourceId {
    /// Create an id from owned parts, validating both halves.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidResourceId` if either half is empty
    /// or contains a character outside its allowed set.
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let path = path.into();
        validate_namespace(&namespace)?;
        validate_path(&path)?;
        Ok(Self {
            namespace: Cow::Owned(namespace),
            path: Cow::Owned(path),
        })
    }

    /// Create an id from static string literals without allocating.
    ///
    /// Intended for well-known payload type tags declared in source.
    /// Validity is checked in debug builds only.
    pub fn from_static(namespace: &'static str, path: &'static str) -> Self {
        debug_assert!(validate_namespace(namespace).is_ok());
        debug_assert!(validate_path(path).is_ok());
        Self {
            namespace: Cow::Borrowed(namespace),
            path: Cow::Borrowed(path),
        }
    }

    /// Parse `"namespace:path"`, or `"path"` with [`DEFAULT_NAMESPACE`].
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidResourceId` on empty input, an empty
    /// half, or an invalid character.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(ProtocolError::InvalidResourceId(
                constants::ERR_EMPTY_RESOURCE_ID.to_string(),
            ));
        }
        match s.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, s),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Namespace characters: lowercase alphanumerics plus `_`, `-`, `.`.
fn valid_namespace_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.')
}

/// Path characters: the namespace set plus `/` for hierarchy.
fn valid_path_char(c: char) -> bool {
    valid_namespace_char(c) || c == '/'
}

fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(ProtocolError::InvalidResourceId(
            constants::ERR_EMPTY_RESOURCE_ID.to_string(),
        ));
    }
    if let Some(c) = namespace.chars().find(|c| !valid_namespace_char(*c)) {
        return Err(ProtocolError::InvalidResourceId(format!(
            "{}: '{c}' in '{namespace}'",
            constants::ERR_BAD_NAMESPACE
        )));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ProtocolError::InvalidResourceId(
            constants::ERR_EMPTY_RESOURCE_ID.to_string(),
        ));
    }
    if let Some(c) = path.chars().find(|c| !valid_path_char(*c)) {
        return Err(ProtocolError::InvalidResourceId(format!(
            "{}: '{c}' in '{path}'",
            constants::ERR_BAD_PATH
        )));
    }
    Ok(())
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({}:{})", self.namespace, self.path)
    }
}

impl FromStr for ResourceId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ResourceId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
