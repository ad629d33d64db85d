//! Batch orchestration.
//!
//! One run takes the raw posts of a feed sweep through the full sequence:
//! skip what is already stored or already rejected, classify in shrinking
//! batches, censor contact data, infer the macro-zone, then deduplicate
//! against the active corpus with a newest-wins policy. Everything after
//! classification is local CPU work; the store and the classifier are the
//! only awaited collaborators.

pub mod backoff;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::censor::Censor;
use crate::classifier::Classifier;
use crate::config::Config;
use crate::dedup::SimilarityEngine;
use crate::entities::{Classification, Listing, ListingStatus, RawPost};
use crate::rejected::RejectedUrlCache;
use crate::store::ListingStore;
use crate::zones::{self, ZoneMap};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Posts per classification request; shrinks toward `min_batch` on
    /// failure because smaller prompts parse more reliably.
    pub max_batch: usize,
    pub min_batch: usize,
    /// Pause between successful classification batches, for rate limits.
    pub batch_pause: Duration,
    /// Base for the classification retry backoff.
    pub retry_base_secs: u32,
    /// Similarity score at or above which a listing replaces its duplicate.
    pub duplicate_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_batch: 3,
            min_batch: 1,
            batch_pause: Duration::from_secs(32),
            retry_base_secs: 2,
            duplicate_threshold: 0.85,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            duplicate_threshold: config.duplicate_threshold(),
            ..Self::default()
        }
    }
}

/// What one run did, for the closing log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub received: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub created: usize,
    pub expired: usize,
}

pub struct Pipeline {
    store: Arc<dyn ListingStore>,
    classifier: Arc<dyn Classifier>,
    censor: Censor,
    zones: ZoneMap,
    similarity: SimilarityEngine,
    rejected: RejectedUrlCache,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ListingStore>,
        classifier: Arc<dyn Classifier>,
        zones: ZoneMap,
        rejected: RejectedUrlCache,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            classifier,
            censor: Censor::new(),
            zones,
            similarity: SimilarityEngine::new(),
            rejected,
            settings,
        }
    }

    /// Process one sweep of raw posts. Individual post failures are logged
    /// and skipped; only an unreachable listing store aborts the run.
    pub async fn run(&mut self, posts: Vec<RawPost>) -> Result<RunSummary> {
        let mut summary = RunSummary {
            received: posts.len(),
            ..Default::default()
        };

        let mut active = self
            .store
            .query_active()
            .await
            .context("listing store unavailable")?;
        info!(
            posts = posts.len(),
            active = active.len(),
            "starting feed batch"
        );

        let mut pending = Vec::new();
        for post in posts {
            if Url::parse(&post.link).is_err() {
                warn!(link = %post.link, "malformed link, skipping");
                summary.skipped += 1;
            } else if active.iter().any(|l| l.link == post.link) {
                debug!(link = %post.link, "already stored, skipping");
                summary.skipped += 1;
            } else if self.rejected.is_rejected(&post.link) {
                debug!(link = %post.link, "previously rejected, skipping");
                summary.skipped += 1;
            } else {
                pending.push(post);
            }
        }

        let max_batch = self.settings.max_batch.max(1);
        let min_batch = self.settings.min_batch.max(1);
        let mut batch_size = max_batch;
        let mut attempt: u32 = 0;
        let mut idx = 0;
        while idx < pending.len() {
            let end = (idx + batch_size).min(pending.len());
            let batch = &pending[idx..end];
            let outcome = self.classifier.classify(batch).await;
            match outcome {
                Ok(verdicts) => {
                    self.apply_batch(batch, &verdicts, &mut active, &mut summary)
                        .await;
                    idx = end;
                    batch_size = max_batch;
                    attempt = 0;
                    if idx < pending.len() && !self.settings.batch_pause.is_zero() {
                        sleep(self.settings.batch_pause).await;
                    }
                }
                Err(err) if err.should_retry() && batch.len() > min_batch => {
                    // Shrink from what was actually sent, not the nominal
                    // size, or a short tail batch would retry at its own size.
                    batch_size = batch.len() - 1;
                    attempt += 1;
                    warn!(error = %err, batch_size, "classification failed, shrinking batch");
                    sleep(backoff::retry_delay(attempt, self.settings.retry_base_secs)).await;
                }
                Err(err) => {
                    warn!(error = %err, skipped = batch.len(),
                          "classification exhausted, skipping batch");
                    summary.skipped += batch.len();
                    idx = end;
                    batch_size = max_batch;
                    attempt = 0;
                }
            }
        }

        info!(?summary, "feed batch finished");
        Ok(summary)
    }

    async fn apply_batch(
        &mut self,
        posts: &[RawPost],
        verdicts: &[Classification],
        active: &mut Vec<Listing>,
        summary: &mut RunSummary,
    ) {
        for (post, verdict) in posts.iter().zip(verdicts) {
            if !verdict.relevant {
                let reason = if verdict.rating_reason.is_empty() {
                    "not a rental listing"
                } else {
                    verdict.rating_reason.as_str()
                };
                info!(link = %post.link, reason, "post rejected by classifier");
                self.rejected.add_rejected(&post.link, reason);
                summary.rejected += 1;
                continue;
            }

            let inference = self
                .zones
                .infer(&verdict.zone, &verdict.title, &verdict.description);
            let mut macro_zone = inference.as_ref().map(|m| m.macro_zone.clone());
            if zones::needs_fallback(&verdict.zone, &inference) {
                let ad_text = format!(
                    "{}\n{}\nzone: {}",
                    verdict.title, verdict.description, verdict.zone
                );
                match self
                    .classifier
                    .classify_zone(&ad_text, &self.zones.zone_names())
                    .await
                {
                    Ok(zone) => macro_zone = zone,
                    Err(err) => warn!(link = %post.link, error = %err, "zone fallback failed"),
                }
            }

            let listing = self.build_listing(post, verdict, macro_zone);

            // Best duplicate among the listings that are active right now,
            // including ones created earlier in this very run.
            let duplicate = self
                .similarity
                .find_best_duplicate(
                    active,
                    &listing.description,
                    self.settings.duplicate_threshold,
                )
                .filter(|(_, score)| *score >= self.settings.duplicate_threshold)
                .map(|(hit, score)| (hit.id.clone(), hit.link.clone(), score));

            let created_id = self.store.create(&listing).await;
            match created_id {
                Ok(id) => {
                    summary.created += 1;
                    let mut created = listing;
                    created.id = Some(id);
                    info!(link = %created.link, zone = ?created.macro_zone, "listing created");

                    if let Some((old_id, old_link, score)) = duplicate {
                        info!(score, old = %old_link, new = %created.link,
                              "newer duplicate replaces older listing");
                        match old_id {
                            Some(old_id) => match self.store.mark_expired(&old_id).await {
                                Ok(()) => summary.expired += 1,
                                Err(err) => {
                                    warn!(error = %err, id = %old_id,
                                          "failed to expire duplicate")
                                }
                            },
                            None => {
                                warn!(link = %old_link,
                                      "duplicate carries no store id, cannot expire")
                            }
                        }
                        active.retain(|l| l.link != old_link);
                    }
                    active.push(created);
                }
                Err(err) => {
                    warn!(error = %err, link = %listing.link,
                          "failed to persist listing, continuing");
                }
            }
        }
    }

    /// Turn a verdict into a listing: censor the free text, fall back to the
    /// raw post where the model left a field empty.
    fn build_listing(
        &self,
        post: &RawPost,
        verdict: &Classification,
        macro_zone: Option<String>,
    ) -> Listing {
        let title = if verdict.title.is_empty() {
            &post.title
        } else {
            &verdict.title
        };
        let description = if verdict.description.is_empty() {
            &post.summary
        } else {
            &verdict.description
        };
        Listing {
            id: None,
            link: post.link.clone(),
            title: self.censor.censor_text(title),
            overview: verdict
                .overview
                .as_deref()
                .map(|o| self.censor.censor_text(o)),
            description: self.censor.censor_text(description),
            price: verdict.price.clone(),
            rooms: verdict.rooms.clone(),
            zone: verdict.zone.clone(),
            macro_zone,
            reliability: verdict.reliability.clamp(0.0, 5.0),
            rating_reason: verdict.rating_reason.clone(),
            published_at: verdict.published_at_utc(),
            created_time: Utc::now(),
            status: ListingStatus::Active,
            images: post.images.clone(),
        }
    }
}
