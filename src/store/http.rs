//! REST adapter for the listing store.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{ListingStore, StoreError};
use crate::entities::Listing;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
});

pub struct HttpListingStore {
    base_url: String,
    api_key: String,
    database_id: String,
}

/// Query responses wrap the listings in a `results` page.
#[derive(Debug, Deserialize)]
struct ListingPage {
    results: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
struct CreatedListing {
    id: String,
}

impl HttpListingStore {
    pub fn new(base_url: &str, api_key: &str, database_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            database_id: database_id.to_string(),
        }
    }

    fn listings_url(&self) -> String {
        format!("{}/databases/{}/listings", self.base_url, self.database_id)
    }

    fn check_status(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Http { status });
        }
        Ok(response)
    }
}

#[async_trait]
impl ListingStore for HttpListingStore {
    #[instrument(skip_all)]
    async fn query_active(&self) -> Result<Vec<Listing>, StoreError> {
        let response = HTTP_CLIENT
            .get(self.listings_url())
            .query(&[("status", "active")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        let page: ListingPage = Self::check_status(response)?
            .json()
            .await
            .map_err(|err| StoreError::MalformedResponse(err.to_string()))?;
        Ok(page.results)
    }

    #[instrument(skip_all, fields(link = %link))]
    async fn find_by_link(&self, link: &str) -> Result<Option<Listing>, StoreError> {
        let response = HTTP_CLIENT
            .get(self.listings_url())
            .query(&[("status", "active"), ("link", link)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        let page: ListingPage = Self::check_status(response)?
            .json()
            .await
            .map_err(|err| StoreError::MalformedResponse(err.to_string()))?;
        Ok(page.results.into_iter().next())
    }

    #[instrument(skip_all, fields(link = %listing.link))]
    async fn create(&self, listing: &Listing) -> Result<String, StoreError> {
        let response = HTTP_CLIENT
            .post(self.listings_url())
            .bearer_auth(&self.api_key)
            .json(listing)
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        let created: CreatedListing = Self::check_status(response)?
            .json()
            .await
            .map_err(|err| StoreError::MalformedResponse(err.to_string()))?;
        Ok(created.id)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn mark_expired(&self, id: &str) -> Result<(), StoreError> {
        let response = HTTP_CLIENT
            .patch(format!("{}/listings/{}", self.base_url, id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "status": "expired" }))
            .send()
            .await
            .map_err(|err| StoreError::Transport(err.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Self::check_status(response)?;
        Ok(())
    }
}
