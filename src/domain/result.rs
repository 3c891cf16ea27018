//! Result type alias for the entity store

use super::errors::EntityStoreError;

/// Result type alias for entity store operations
///
/// # Examples
///
/// ```
/// use entity_store::domain::result::Result;
/// use entity_store::domain::errors::EntityStoreError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(EntityStoreError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, EntityStoreError>;
