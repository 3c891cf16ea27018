//! Document database abstraction layer
//!
//! Trait-based seam that lets the entity store run against Azure Cosmos DB or
//! the in-memory backend.

pub mod continuation;
pub mod factory;
pub mod traits;

pub use continuation::{decode_continuation, encode_continuation};
pub use factory::create_client_factory;
pub use traits::{DocumentClient, DocumentClientFactory, PageRequest, QueryPage, WriteResponse};
