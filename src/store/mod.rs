//! Listing store contract.
//!
//! The store is an external service reached over HTTP; the pipeline only
//! needs four operations, so they form a trait with an in-memory twin for
//! tests and dry runs. Note the deliberate absence of a delete operation:
//! duplicates are expired, never removed.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::Listing;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error {status}")]
    Http { status: reqwest::StatusCode },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("listing not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// All listings currently marked active, most recent first.
    async fn query_active(&self) -> Result<Vec<Listing>, StoreError>;

    /// The active listing with this source link, if one exists.
    async fn find_by_link(&self, link: &str) -> Result<Option<Listing>, StoreError>;

    /// Persist a new listing; returns the store-assigned id.
    async fn create(&self, listing: &Listing) -> Result<String, StoreError>;

    /// Flip a listing's status to expired, keeping it for audit.
    async fn mark_expired(&self, id: &str) -> Result<(), StoreError>;
}
