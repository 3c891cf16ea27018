//! CLI command implementations

pub mod clear;
pub mod init;
pub mod provision;
pub mod status;
pub mod validate;

use crate::domain::{CosmosDbError, EntityStoreError};

/// Process exit code for a failed store call
///
/// `2` configuration, `4` connection or account access, `5` anything else.
pub(crate) fn exit_code_for(error: &EntityStoreError) -> i32 {
    match error {
        EntityStoreError::Configuration(_) => 2,
        EntityStoreError::CosmosDb(
            CosmosDbError::ConnectionFailed(_)
            | CosmosDbError::AuthenticationFailed(_)
            | CosmosDbError::Timeout(_),
        ) => 4,
        _ => 5,
    }
}
