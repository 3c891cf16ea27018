//! Azure Cosmos DB integration
//!
//! Document client backed by `azure_data_cosmos` with key authentication.

pub mod client;

pub use client::{CosmosClientFactory, CosmosDocumentClient};
