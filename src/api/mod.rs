//! API client module for the MSP gateway.
//!
//! Provides the HTTP client with API key header injection, the error taxonomy
//! every call is normalised into, and CRUD operations on the managed
//! collection.

pub mod client;
pub mod credential;
pub mod error;
pub mod resource;
pub mod types;

#[cfg(test)]
pub mod test_server;

pub use client::{ApiClient, ClientOptions};
pub use credential::Credential;
pub use error::ClientError;
pub use resource::ResourceClient;
pub use types::NewRecord;
