use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use roomsieve::censor::{MESSAGING_PLACEHOLDER, PHONE_PLACEHOLDER};
use roomsieve::classifier::{Classifier, ClassifyError};
use roomsieve::config::cities::barcelona_zone_table;
use roomsieve::entities::{Classification, Listing, ListingStatus, RawPost};
use roomsieve::pipeline::{Pipeline, PipelineSettings};
use roomsieve::rejected::RejectedUrlCache;
use roomsieve::store::memory::MemoryListingStore;
use roomsieve::store::ListingStore;
use roomsieve::zones::ZoneMap;

/// Scripted classifier: verdicts are looked up by link so every test is
/// deterministic without a network. Optionally fails any batch larger than a
/// limit, to exercise the shrinking-batch retry.
struct ScriptedClassifier {
    verdicts: HashMap<String, Classification>,
    zone_fallback: Option<String>,
    fail_batches_larger_than: Option<usize>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl ScriptedClassifier {
    fn new() -> Self {
        Self {
            verdicts: HashMap::new(),
            zone_fallback: None,
            fail_batches_larger_than: None,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    fn relevant(mut self, link: &str, description: &str, zone: &str) -> Self {
        self.verdicts.insert(
            link.to_string(),
            Classification {
                relevant: true,
                title: "Habitación en piso compartido".to_string(),
                overview: None,
                description: description.to_string(),
                price: "400".to_string(),
                zone: zone.to_string(),
                rooms: Some("1".to_string()),
                reliability: 4.0,
                rating_reason: "complete ad with contact details".to_string(),
                published_at: None,
            },
        );
        self
    }

    fn irrelevant(mut self, link: &str, reason: &str) -> Self {
        self.verdicts.insert(
            link.to_string(),
            Classification {
                relevant: false,
                title: String::new(),
                overview: None,
                description: String::new(),
                price: String::new(),
                zone: String::new(),
                rooms: None,
                reliability: 0.0,
                rating_reason: reason.to_string(),
                published_at: None,
            },
        );
        self
    }

    fn with_zone_fallback(mut self, zone: &str) -> Self {
        self.zone_fallback = Some(zone.to_string());
        self
    }

    fn failing_above(mut self, limit: usize) -> Self {
        self.fail_batches_larger_than = Some(limit);
        self
    }

    fn seen_batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, posts: &[RawPost]) -> Result<Vec<Classification>, ClassifyError> {
        self.batch_sizes.lock().unwrap().push(posts.len());
        if let Some(limit) = self.fail_batches_larger_than {
            if posts.len() > limit {
                return Err(ClassifyError::MalformedResponse(
                    "model output truncated".to_string(),
                ));
            }
        }
        Ok(posts
            .iter()
            .map(|post| {
                self.verdicts
                    .get(&post.link)
                    .unwrap_or_else(|| panic!("unscripted link {}", post.link))
                    .clone()
            })
            .collect())
    }

    async fn classify_zone(
        &self,
        _text: &str,
        zones: &[String],
    ) -> Result<Option<String>, ClassifyError> {
        Ok(self
            .zone_fallback
            .as_ref()
            .filter(|z| zones.contains(z))
            .cloned())
    }
}

fn post(link: &str, summary: &str) -> RawPost {
    RawPost {
        title: "Alquilo habitación".to_string(),
        link: link.to_string(),
        summary: summary.to_string(),
        images: Vec::new(),
    }
}

fn seeded_listing(link: &str, description: &str) -> Listing {
    Listing {
        id: None,
        link: link.to_string(),
        title: "Habitación doble".to_string(),
        overview: None,
        description: description.to_string(),
        price: "400".to_string(),
        rooms: None,
        zone: "Gràcia".to_string(),
        macro_zone: Some("Gràcia".to_string()),
        reliability: 4.0,
        rating_reason: String::new(),
        published_at: None,
        created_time: Utc::now(),
        status: ListingStatus::Active,
        images: Vec::new(),
    }
}

fn test_settings() -> PipelineSettings {
    PipelineSettings {
        max_batch: 3,
        min_batch: 1,
        batch_pause: Duration::ZERO,
        retry_base_secs: 0,
        duplicate_threshold: 0.85,
    }
}

fn pipeline(
    store: Arc<MemoryListingStore>,
    classifier: Arc<ScriptedClassifier>,
    cache_dir: &TempDir,
) -> Pipeline {
    Pipeline::new(
        store,
        classifier,
        ZoneMap::from_table(&barcelona_zone_table()),
        RejectedUrlCache::new(cache_dir.path().join("rejected_urls_cache_test.json")),
        test_settings(),
    )
}

#[tokio::test]
async fn test_relevant_post_is_censored_zoned_and_stored() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryListingStore::new());
    let classifier = Arc::new(ScriptedClassifier::new().relevant(
        "https://ads.test/1",
        "Habitación luminosa en vila de gracia, 400€ gastos incluidos, \
         para mas informacion escriba solo al whatsApp 632338093",
        "Gràcia",
    ));

    let summary = pipeline(store.clone(), classifier, &dir)
        .run(vec![post("https://ads.test/1", "resumen original")])
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.expired, 0);

    let stored = store.snapshot();
    assert_eq!(stored.len(), 1);
    let listing = &stored[0];
    assert_eq!(listing.status, ListingStatus::Active);
    assert_eq!(listing.macro_zone.as_deref(), Some("Gràcia"));
    assert!(listing.description.contains(MESSAGING_PLACEHOLDER));
    assert!(!listing.description.contains(PHONE_PLACEHOLDER));
    assert!(!listing.description.contains("632338093"));
    assert!(listing.description.contains("400€"));
}

#[tokio::test]
async fn test_rejected_post_is_remembered_across_runs() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryListingStore::new());

    let first = Arc::new(
        ScriptedClassifier::new().irrelevant("https://ads.test/seek", "someone looking for a room"),
    );
    let summary = pipeline(store.clone(), first.clone(), &dir)
        .run(vec![post("https://ads.test/seek", "busco habitación")])
        .await
        .unwrap();
    assert_eq!(summary.rejected, 1);
    assert_eq!(first.seen_batch_sizes(), vec![1]);

    // Second sweep sees the same entry; the cache short-circuits it before
    // the classifier is ever consulted.
    let second = Arc::new(ScriptedClassifier::new());
    let summary = pipeline(store.clone(), second.clone(), &dir)
        .run(vec![post("https://ads.test/seek", "busco habitación")])
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.rejected, 0);
    assert!(second.seen_batch_sizes().is_empty());
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_duplicate_expires_older_listing() {
    let dir = TempDir::new().unwrap();
    let description_old = "Se alquila habitacion doble con balcon cerca del metro y del \
                           mercado, gastos incluidos en el precio, disponible septiembre";
    let description_new = "Gastos incluidos en el precio, disponible septiembre. Se alquila \
                           habitacion doble con balcon cerca del metro y del mercado";
    let store = Arc::new(MemoryListingStore::seeded(vec![seeded_listing(
        "https://ads.test/old",
        description_old,
    )]));
    let classifier = Arc::new(ScriptedClassifier::new().relevant(
        "https://ads.test/new",
        description_new,
        "Gràcia",
    ));

    let summary = pipeline(store.clone(), classifier, &dir)
        .run(vec![post("https://ads.test/new", description_new)])
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.expired, 1);

    let stored = store.snapshot();
    assert_eq!(stored.len(), 2);
    let old = stored
        .iter()
        .find(|l| l.link == "https://ads.test/old")
        .unwrap();
    let new = stored
        .iter()
        .find(|l| l.link == "https://ads.test/new")
        .unwrap();
    assert_eq!(old.status, ListingStatus::Expired);
    assert_eq!(new.status, ListingStatus::Active);

    // Newest wins: exactly one active listing remains.
    assert_eq!(store.query_active().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_link_never_reaches_the_classifier() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryListingStore::new());
    let classifier = Arc::new(ScriptedClassifier::new());

    let summary = pipeline(store.clone(), classifier.clone(), &dir)
        .run(vec![post("not a url", "habitacion sin enlace")])
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.created, 0);
    assert!(classifier.seen_batch_sizes().is_empty());
}

#[tokio::test]
async fn test_already_stored_link_never_reclassified() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryListingStore::seeded(vec![seeded_listing(
        "https://ads.test/known",
        "habitacion doble luminosa cerca del metro fondo",
    )]));
    let classifier = Arc::new(ScriptedClassifier::new());

    let summary = pipeline(store.clone(), classifier.clone(), &dir)
        .run(vec![post("https://ads.test/known", "whatever")])
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.created, 0);
    assert!(classifier.seen_batch_sizes().is_empty());
}

#[tokio::test]
async fn test_batch_shrinks_until_it_fits() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryListingStore::new());
    let classifier = Arc::new(
        ScriptedClassifier::new()
            .failing_above(1)
            .relevant("https://ads.test/1", "habitacion uno con terraza grande", "")
            .relevant("https://ads.test/2", "habitacion dos con balcon pequeno", "")
            .relevant("https://ads.test/3", "habitacion tres interior tranquila", ""),
    );

    let summary = pipeline(store.clone(), classifier.clone(), &dir)
        .run(vec![
            post("https://ads.test/1", "uno"),
            post("https://ads.test/2", "dos"),
            post("https://ads.test/3", "tres"),
        ])
        .await
        .unwrap();

    assert_eq!(summary.created, 3);
    // 3 fails, 2 fails, 1 succeeds; then the size resets and the remaining
    // posts go through the same shrink.
    assert_eq!(classifier.seen_batch_sizes(), vec![3, 2, 1, 2, 1, 1]);
}

#[tokio::test]
async fn test_zone_fallback_when_local_inference_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryListingStore::new());
    let classifier = Arc::new(
        ScriptedClassifier::new()
            .with_zone_fallback("Badalona")
            .relevant(
                "https://ads.test/1",
                "habitacion grande cerca de la playa y el puerto",
                "Montgat",
            ),
    );

    pipeline(store.clone(), classifier, &dir)
        .run(vec![post("https://ads.test/1", "resumen")])
        .await
        .unwrap();

    let stored = store.snapshot();
    assert_eq!(stored[0].macro_zone.as_deref(), Some("Badalona"));
    // The raw zone text is preserved alongside the inferred label.
    assert_eq!(stored[0].zone, "Montgat");
}
