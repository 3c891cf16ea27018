//! In-memory backend
//!
//! Emulates the partition, throttling and continuation behavior of Cosmos DB
//! for tests and local development.

pub mod evaluator;
pub mod store;

pub use store::{InMemoryAccount, InMemoryClientFactory, InMemoryDocumentClient};
