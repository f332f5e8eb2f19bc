//! Hierarchical item identifiers
//!
//! Identifiers are dot-separated tags such as `Item.Weapon.Sword`. Each
//! segment is a non-empty run of ASCII letters, digits or underscores. A tag
//! matches any of its segment-aligned prefixes, which is how category queries
//! work: `Item.Weapon.Sword` matches `Item.Weapon` and `Item`, but not
//! `Item.Weap`.

use crate::error::{InventoryError, InventoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '.';

/// Globally unique, immutable item identifier
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    /// Parse and validate a tag
    pub fn new(tag: impl Into<String>) -> InventoryResult<Self> {
        let tag = tag.into();
        if Self::is_valid(&tag) {
            Ok(Self(tag))
        } else {
            Err(InventoryError::InvalidItemId(tag))
        }
    }

    fn is_valid(tag: &str) -> bool {
        !tag.is_empty()
            && tag.split(SEPARATOR).all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
            })
    }

    /// Tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate the tag segments, root first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Enclosing category, if this is not a root tag
    pub fn parent(&self) -> Option<ItemId> {
        self.0
            .rfind(SEPARATOR)
            .map(|idx| ItemId(self.0[..idx].to_string()))
    }

    /// True if `category` is this tag or a segment-aligned prefix of it
    pub fn matches(&self, category: &ItemId) -> bool {
        match self.0.strip_prefix(category.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with(SEPARATOR),
            None => false,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl FromStr for ItemId {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ItemId {
    type Error = InventoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ItemId {
    type Error = InventoryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
