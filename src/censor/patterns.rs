//! Phone-number pattern generation.
//!
//! The redaction rules for phone numbers accumulate easily: every spacing
//! habit, country-prefix style and digit grouping wants its own regex. Instead
//! of hand-writing that union, each regional numbering scheme is declared once
//! and expanded into a grouped form (separator runs between digit groups) plus
//! one compact form per supported total length. Every generated pattern
//! requires at least 8 significant digits, which is what keeps prices and
//! other short numeric tokens out of reach.

/// Separator run between digit groups: spaces, dots or hyphens, singly or
/// repeated, in any mix.
const GROUP_SEP: &str = r"[\s.\-]*";

/// Keywords that introduce a messaging-app contact.
const MESSAGING_KEYWORDS: &str = "whatsapp|telegram|wa|tg";

/// One regional mobile-numbering scheme.
pub(crate) struct PhoneScheme {
    /// Country calling code accepted as an optional prefix.
    pub country_code: &'static str,
    /// Digits a subscriber number may start with, as a character-class body.
    pub mobile_prefixes: &'static str,
    /// Digit-group layout of the separated form; the first group includes the
    /// leading mobile-prefix digit.
    pub groups: &'static [usize],
    /// Total digit counts accepted in the compact, separator-free form.
    pub compact_lengths: &'static [usize],
}

/// The two numbering schemes the feeds actually carry: "3"-prefix mobiles
/// (+39, 9-10 digits) and "6"/"7"-prefix mobiles (+34, 9 digits). Every city
/// shares the same table.
pub(crate) const PHONE_SCHEMES: &[PhoneScheme] = &[
    PhoneScheme {
        country_code: "39",
        mobile_prefixes: "3",
        groups: &[3, 3, 4],
        compact_lengths: &[9, 10],
    },
    PhoneScheme {
        country_code: "34",
        mobile_prefixes: "67",
        groups: &[3, 3, 3],
        compact_lengths: &[9],
    },
];

impl PhoneScheme {
    /// Optional country-code prefix, tolerating a leading `+` and parentheses.
    fn country_prefix(&self) -> String {
        format!(r"(?:\(?\+?{}\)?[\s.\-]*)?", self.country_code)
    }

    /// Subscriber number split into digit groups joined by separator runs.
    fn grouped(&self) -> String {
        let mut parts = Vec::with_capacity(self.groups.len());
        for (i, len) in self.groups.iter().enumerate() {
            if i == 0 {
                parts.push(format!(r"[{}]\d{{{}}}", self.mobile_prefixes, len - 1));
            } else {
                parts.push(format!(r"\d{{{}}}", len));
            }
        }
        parts.join(GROUP_SEP)
    }

    /// Subscriber number as one uninterrupted digit run.
    fn compact(&self, total_digits: usize) -> String {
        format!(r"[{}]\d{{{}}}", self.mobile_prefixes, total_digits - 1)
    }

    /// Bare phone patterns for this scheme, broadest (grouped) first.
    pub(crate) fn phone_patterns(&self) -> Vec<String> {
        let prefix = self.country_prefix();
        let mut patterns = vec![format!(r"(?i){}{}\b", prefix, self.grouped())];
        for total in self.compact_lengths {
            patterns.push(format!(r"(?i){}{}\b", prefix, self.compact(*total)));
        }
        patterns
    }

    /// Messaging-contact pattern: keyword, optional colon, then any number
    /// form this scheme accepts. Applied before the bare phone pass so the
    /// keyword and the number are consumed together.
    pub(crate) fn messaging_pattern(&self) -> String {
        let mut forms = vec![self.grouped()];
        for total in self.compact_lengths {
            forms.push(self.compact(*total));
        }
        format!(
            r"(?i)\b(?:{keywords})\s*:?\s*{prefix}(?:{forms})\b",
            keywords = MESSAGING_KEYWORDS,
            prefix = self.country_prefix(),
            forms = forms.join("|"),
        )
    }
}
