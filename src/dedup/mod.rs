//! Fuzzy duplicate detection for listing descriptions.
//!
//! The same ad gets reposted with reshuffled sentences, different spacing and
//! a fresh link, so equality checks are useless. Scoring is a token-set ratio
//! over normalized text: identical vocabularies score 1.0 regardless of
//! sentence order, and partial overlap degrades smoothly. Normalized strings
//! and pairwise scores are memoized because one batch compares every candidate
//! against the whole active corpus.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::Listing;

/// Normalized strings shorter than this carry too little signal to compare.
const MIN_COMPARABLE_CHARS: usize = 10;

/// Bonus for near-identical lengths, typical of copy-pasted listings.
const LENGTH_BONUS: f64 = 0.05;

/// Relative length difference under which the bonus applies.
const LENGTH_BONUS_BAND: f64 = 0.10;

/// Both memoization maps are cleared wholesale past this many entries.
pub const DEFAULT_CACHE_LIMIT: usize = 1000;

static URL_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static NON_WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// Lowercase, drop URL tokens, squash every non-word run to a single space.
pub fn normalize_listing_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_urls = URL_TOKEN.replace_all(&lowered, " ");
    let collapsed = NON_WORD_RUN.replace_all(&without_urls, " ");
    collapsed.trim().to_string()
}

/// Similarity scorer with bounded memoization of normalizations and pairwise
/// scores. One engine instance lives per batch run; both caches are cleared
/// wholesale when they outgrow the limit rather than tracking recency.
pub struct SimilarityEngine {
    cache_limit: usize,
    normalized: HashMap<String, String>,
    scores: HashMap<(String, String), f64>,
}

impl SimilarityEngine {
    pub fn new() -> Self {
        Self::with_cache_limit(DEFAULT_CACHE_LIMIT)
    }

    pub fn with_cache_limit(cache_limit: usize) -> Self {
        Self {
            cache_limit: cache_limit.max(1),
            normalized: HashMap::new(),
            scores: HashMap::new(),
        }
    }

    /// Token-set similarity of two raw descriptions, in `[0, 1]`. Symmetric;
    /// cached by the unordered pair of raw inputs.
    pub fn similarity(&mut self, a: &str, b: &str) -> f64 {
        let key = pair_key(a, b);
        if let Some(score) = self.scores.get(&key) {
            return *score;
        }

        let na = self.normalized(a);
        let nb = self.normalized(b);
        let score = score_normalized(&na, &nb);

        if self.scores.len() >= self.cache_limit {
            self.scores.clear();
        }
        self.scores.insert(key, score);
        score
    }

    /// Scan the corpus most-recent-first and return the best match with its
    /// score. Exits at the first score at or above `threshold`: any such match
    /// already triggers the duplicate action, so a marginally better older one
    /// is not worth the remaining comparisons.
    pub fn find_best_duplicate<'a>(
        &mut self,
        corpus: &'a [Listing],
        candidate: &str,
        threshold: f64,
    ) -> Option<(&'a Listing, f64)> {
        let mut by_recency: Vec<&Listing> = corpus.iter().collect();
        by_recency.sort_by(|x, y| y.created_time.cmp(&x.created_time));

        let mut best: Option<(&Listing, f64)> = None;
        for listing in by_recency {
            let score = self.similarity(candidate, &listing.description);
            if score <= 0.0 {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((listing, score));
            }
            if score >= threshold {
                break;
            }
        }
        best
    }

    /// Cached entries across both maps, for bound checks.
    pub fn cached_entries(&self) -> (usize, usize) {
        (self.normalized.len(), self.scores.len())
    }

    fn normalized(&mut self, raw: &str) -> String {
        if let Some(cached) = self.normalized.get(raw) {
            return cached.clone();
        }
        let normalized = normalize_listing_text(raw);
        if self.normalized.len() >= self.cache_limit {
            self.normalized.clear();
        }
        self.normalized.insert(raw.to_string(), normalized.clone());
        normalized
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn score_normalized(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a < MIN_COMPARABLE_CHARS || len_b < MIN_COMPARABLE_CHARS {
        return 0.0;
    }

    let mut score = token_set_ratio(a, b);

    let longer = len_a.max(len_b) as f64;
    let diff = len_a.abs_diff(len_b) as f64;
    if diff < longer * LENGTH_BONUS_BAND {
        score = (score + LENGTH_BONUS).min(1.0);
    }
    score
}

/// Fuzzy ratio over token sets: the sorted intersection string is compared
/// against each side's intersection-plus-remainder string, and the best of
/// the three pairings wins. Identical vocabularies come out at 1.0 even when
/// sentence order differs completely.
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let base = common.join(" ");
    let with_a = join_parts(&base, &only_a);
    let with_b = join_parts(&base, &only_b);

    seq_ratio(&base, &with_a)
        .max(seq_ratio(&base, &with_b))
        .max(seq_ratio(&with_a, &with_b))
}

fn join_parts(base: &str, rest: &[&str]) -> String {
    if rest.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return rest.join(" ");
    }
    format!("{} {}", base, rest.join(" "))
}

/// Normalized edit-distance similarity of two strings.
fn seq_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let chars_a: Vec<char> = a.chars().collect();
    let chars_b: Vec<char> = b.chars().collect();
    let longest = chars_a.len().max(chars_b.len());
    1.0 - levenshtein(&chars_a, &chars_b) as f64 / longest as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
