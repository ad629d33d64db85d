//! In-memory listing store backing tests and dry runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ListingStore, StoreError};
use crate::entities::{Listing, ListingStatus};

#[derive(Default)]
pub struct MemoryListingStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    listings: Vec<Listing>,
    next_id: usize,
}

impl MemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store; listings without an id get one assigned.
    pub fn seeded(listings: Vec<Listing>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap();
            for mut listing in listings {
                inner.next_id += 1;
                if listing.id.is_none() {
                    listing.id = Some(format!("mem-{}", inner.next_id));
                }
                inner.listings.push(listing);
            }
        }
        store
    }

    /// Everything the store holds, regardless of status.
    pub fn snapshot(&self) -> Vec<Listing> {
        self.inner.lock().unwrap().listings.clone()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn query_active(&self) -> Result<Vec<Listing>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut active: Vec<Listing> = inner
            .listings
            .iter()
            .filter(|l| l.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_time.cmp(&a.created_time));
        Ok(active)
    }

    async fn find_by_link(&self, link: &str) -> Result<Option<Listing>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .listings
            .iter()
            .find(|l| l.is_active() && l.link == link)
            .cloned())
    }

    async fn create(&self, listing: &Listing) -> Result<String, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("mem-{}", inner.next_id);
        let mut stored = listing.clone();
        stored.id = Some(id.clone());
        inner.listings.push(stored);
        Ok(id)
    }

    async fn mark_expired(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .listings
            .iter_mut()
            .find(|l| l.id.as_deref() == Some(id))
        {
            Some(listing) => {
                listing.status = ListingStatus::Expired;
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}
