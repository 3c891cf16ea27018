//! Domain identifier types with validation
//!
//! Newtype wrappers for entity identifiers and type keys. Each type
//! validates its content once at construction so that store operations can
//! fail synchronously, before any network call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters Cosmos DB does not accept inside a document id
const FORBIDDEN_ID_CHARS: [char; 4] = ['/', '\\', '?', '#'];

/// Entity identifier newtype wrapper
///
/// Unique within one entity type. Stored as the document `id`.
///
/// # Examples
///
/// ```
/// use entity_store::domain::ids::EntityId;
/// use std::str::FromStr;
///
/// let id = EntityId::from_str("order-42").unwrap();
/// assert_eq!(id.as_str(), "order-42");
/// assert!(EntityId::new("").is_err());
/// assert!(EntityId::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new EntityId from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty/blank or contains a character
    /// the document store rejects in ids.
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Entity ID cannot be empty".to_string());
        }
        if let Some(c) = id.chars().find(|c| FORBIDDEN_ID_CHARS.contains(c)) {
            return Err(format!("Entity ID '{id}' contains forbidden character '{c}'"));
        }
        Ok(Self(id))
    }

    /// Returns the entity ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Type key newtype wrapper
///
/// The partition-key value of every document of one entity type. Also acts
/// as the discriminator between types sharing the collection.
///
/// # Examples
///
/// ```
/// use entity_store::domain::ids::TypeKey;
///
/// let key = TypeKey::new("order").unwrap();
/// assert_eq!(key.as_str(), "order");
/// assert_eq!(TypeKey::from_tag("Sales.OrderLine").as_str(), "sales_orderline");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeKey(String);

impl TypeKey {
    /// Creates a new TypeKey from a string
    pub fn new(key: impl Into<String>) -> Result<Self, String> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err("Type key cannot be empty".to_string());
        }
        Ok(Self(key))
    }

    /// Derives a key from an entity type tag
    ///
    /// Lowercases the tag and replaces every non alphanumeric character
    /// with `_`, so `Sales::Order` and `Sales.Order` map to `sales_order`.
    pub fn from_tag(tag: &str) -> Self {
        let mut key = String::with_capacity(tag.len());
        let mut last_sep = false;
        for c in tag.chars() {
            if c.is_ascii_alphanumeric() {
                key.push(c.to_ascii_lowercase());
                last_sep = false;
            } else if !last_sep && !key.is_empty() {
                key.push('_');
                last_sep = true;
            }
        }
        while key.ends_with('_') {
            key.pop();
        }
        if key.is_empty() {
            key.push_str("entity");
        }
        Self(key)
    }

    /// Returns the type key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
