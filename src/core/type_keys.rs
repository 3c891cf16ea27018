//! Entity type to partition key registry

use crate::domain::entity::Entity;
use crate::domain::errors::EntityStoreError;
use crate::domain::ids::TypeKey;
use crate::domain::result::Result;
use std::collections::HashMap;

/// Maps an entity's `TYPE_TAG` to its [`TypeKey`]
///
/// Populated once at startup and shared read-only afterwards. Lookups never
/// touch the network.
///
/// # Examples
///
/// ```
/// use entity_store::core::TypeKeyCache;
/// use entity_store::domain::{Entity, TypeKey};
/// # #[derive(serde::Serialize, serde::Deserialize)]
/// # struct Order { entity_id: String, entity_type: String }
/// # impl Entity for Order {
/// #     const TYPE_TAG: &'static str = "Sales.Order";
/// #     fn entity_id(&self) -> &str { &self.entity_id }
/// #     fn entity_type(&self) -> &str { &self.entity_type }
/// # }
///
/// let mut keys = TypeKeyCache::new();
/// keys.register::<Order>();
/// assert_eq!(keys.key_for::<Order>().unwrap().as_str(), "sales_order");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeKeyCache {
    keys: HashMap<&'static str, TypeKey>,
}

impl TypeKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under the key derived from its tag
    pub fn register<T: Entity>(&mut self) -> &mut Self {
        self.keys.insert(T::TYPE_TAG, TypeKey::from_tag(T::TYPE_TAG));
        self
    }

    /// Registers `T` under an explicit key
    pub fn register_as<T: Entity>(&mut self, key: TypeKey) -> &mut Self {
        self.keys.insert(T::TYPE_TAG, key);
        self
    }

    /// Key of `T`
    ///
    /// # Errors
    ///
    /// Returns [`EntityStoreError::UnregisteredEntityType`] if `T` was never
    /// registered.
    pub fn key_for<T: Entity>(&self) -> Result<TypeKey> {
        self.keys
            .get(T::TYPE_TAG)
            .cloned()
            .ok_or_else(|| EntityStoreError::UnregisteredEntityType(T::TYPE_TAG.to_string()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
