use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Expired,
}

/// A rental-ad listing as held by the listing store.
///
/// The `link` is the natural key: at most one `Active` listing exists per
/// link. Duplicates are never deleted, only flipped to `Expired`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Store-assigned identifier, absent until `create` returns.
    #[serde(default)]
    pub id: Option<String>,
    pub link: String,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub rooms: Option<String>,
    /// Raw zone text as written in the ad.
    pub zone: String,
    /// Inferred macro-zone label, if any.
    #[serde(default)]
    pub macro_zone: Option<String>,
    /// Classifier confidence that the ad is genuine, 0-5.
    pub reliability: f64,
    #[serde(default)]
    pub rating_reason: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_time: DateTime<Utc>,
    pub status: ListingStatus,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Listing {
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

/// One RSS entry after upstream extraction: title, source link and the
/// plain-text body. Image URLs, when the extractor found any, ride along.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Classifier verdict for a single post, positionally aligned with the
/// submitted batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub relevant: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub rooms: Option<String>,
    #[serde(default)]
    pub reliability: f64,
    #[serde(default)]
    pub rating_reason: String,
    /// ISO-8601 publication date as reported by the model; parsed leniently.
    #[serde(default)]
    pub published_at: Option<String>,
}

impl Classification {
    /// Publication timestamp, when the model produced a parseable one.
    pub fn published_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.published_at.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}
