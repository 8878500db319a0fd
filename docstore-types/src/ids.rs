//! Identifier types for stored entities.
//!
//! Every entity carries two independently generated identifiers: the
//! logical [`EntityId`] callers look records up by, and the [`HashKey`]
//! the backing store partitions on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const HASH_KEY_PREFIX: &str = "hk";
const HASH_KEY_HEX_LEN: usize = 32;

/// Logical identifier of a stored entity.
///
/// Backed by a UUID v7, so ids sort by creation time. Table scans return
/// rows in id order, which is what makes `Query::skip` and `Query::take`
/// page through a table deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new entity ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses an entity ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Physical partition key of a stored entity.
///
/// Generated from its own random UUID, so it never correlates with the
/// entity's [`EntityId`]. Rendered as `hk` followed by 32 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashKey(String);

impl HashKey {
    /// Generates a fresh, random hash key.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{HASH_KEY_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Parses a hash key, validating its shape.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let hex = s
            .strip_prefix(HASH_KEY_PREFIX)
            .ok_or_else(|| crate::Error::InvalidHashKey(format!("missing prefix: {s}")))?;
        if hex.len() != HASH_KEY_HEX_LEN
            || !hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(crate::Error::InvalidHashKey(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HashKey {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HashKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for HashKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
