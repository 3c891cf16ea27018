//! Entity contract for records kept in the store
//!
//! Every record type exposes its id and its type key. The type key doubles
//! as the partition key, so a record written under one key is invisible to
//! reads scoped to another.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Document field holding the entity id
pub const ID_FIELD: &str = "id";

/// Document field holding the type key; also the collection partition key
pub const ENTITY_TYPE_FIELD: &str = "entity_type";

/// Partition key path of the collection
pub const PARTITION_KEY_PATH: &str = "/entity_type";

/// A record type the entity store can persist
///
/// `TYPE_TAG` names the type in the [`TypeKeyCache`](crate::core::TypeKeyCache);
/// the registry maps it to the partition key the store reads and writes with.
///
/// # Examples
///
/// ```
/// use entity_store::domain::Entity;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Order {
///     entity_id: String,
///     entity_type: String,
///     total_cents: i64,
/// }
///
/// impl Entity for Order {
///     const TYPE_TAG: &'static str = "Order";
///
///     fn entity_id(&self) -> &str {
///         &self.entity_id
///     }
///
///     fn entity_type(&self) -> &str {
///         &self.entity_type
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Registry tag of the type
    const TYPE_TAG: &'static str;

    /// Id of this record, unique within its type
    fn entity_id(&self) -> &str;

    /// Type key carried by this record
    ///
    /// Must equal the registered key of `TYPE_TAG`. An empty value is
    /// accepted and stamped with the registered key on write.
    fn entity_type(&self) -> &str;
}
