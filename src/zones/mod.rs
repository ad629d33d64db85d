//! Macro-zone inference.
//!
//! Ads reference neighborhoods loosely ("al lado del metro Fondo", "zona
//! Gracia"), so each city carries an ordered table mapping macro-zones to the
//! lowercase, accent-stripped tokens that identify them. Scoring is plain
//! token containment: a hit in the ad's own zone field counts double a hit
//! buried in the title or description, because an explicit zone field is the
//! stronger signal.

use once_cell::sync::Lazy;
use regex::Regex;

/// Weight of a token found in the raw zone field.
const ZONE_FIELD_WEIGHT: u32 = 2;
/// Weight of a token found in the title+description corpus.
const PROSE_WEIGHT: u32 = 1;

static NON_WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// A successful inference: the winning macro-zone, the token that produced
/// the best single increment, and the cumulative score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMatch {
    pub macro_zone: String,
    pub token: String,
    pub score: u32,
}

/// Ordered macro-zone table for one city. Iteration follows declaration
/// order, so ties resolve deterministically to the earlier entry.
pub struct ZoneMap {
    zones: Vec<(String, Vec<String>)>,
}

impl ZoneMap {
    pub fn from_table(table: &[(String, Vec<String>)]) -> Self {
        Self {
            zones: table.to_vec(),
        }
    }

    /// Macro-zone names in declaration order.
    pub fn zone_names(&self) -> Vec<String> {
        self.zones.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Infer the macro-zone for an ad. Returns `None` when no token matches
    /// anywhere, which callers treat as "defer to the fallback classifier",
    /// not as an error.
    pub fn infer(&self, raw_zone: &str, title: &str, description: &str) -> Option<ZoneMatch> {
        let zone_text = normalize_zone_text(raw_zone);
        let prose = normalize_zone_text(&format!("{title} {description}"));

        let mut best: Option<ZoneMatch> = None;
        for (name, tokens) in &self.zones {
            let mut score = 0u32;
            let mut top_token: Option<(&str, u32)> = None;
            for token in tokens {
                let mut increment = 0u32;
                if !zone_text.is_empty() && zone_text.contains(token.as_str()) {
                    increment += ZONE_FIELD_WEIGHT;
                }
                if !prose.is_empty() && prose.contains(token.as_str()) {
                    increment += PROSE_WEIGHT;
                }
                if increment == 0 {
                    continue;
                }
                score += increment;
                if top_token.map_or(true, |(_, best_inc)| increment > best_inc) {
                    top_token = Some((token, increment));
                }
            }
            if score == 0 {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                let (token, _) = top_token.expect("scored zone has a top token");
                best = Some(ZoneMatch {
                    macro_zone: name.clone(),
                    token: token.to_string(),
                    score,
                });
            }
        }
        best
    }
}

/// True when local inference came up empty on an ad that does carry a zone
/// field, i.e. when the external classifier is worth asking.
pub fn needs_fallback(raw_zone: &str, result: &Option<ZoneMatch>) -> bool {
    !raw_zone.trim().is_empty() && result.is_none()
}

/// Lowercase, fold accents to ASCII, squash every non-word run (apostrophes
/// included) to a single space.
pub fn normalize_zone_text(text: &str) -> String {
    let folded: String = text.chars().map(fold_char).collect();
    let lowered = folded.to_lowercase();
    NON_WORD_RUN.replace_all(&lowered, " ").trim().to_string()
}

/// ASCII fold for the Latin repertoire the zone tables actually use.
fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        '·' => ' ',
        _ => c,
    }
}
