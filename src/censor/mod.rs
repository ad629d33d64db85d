//! Contact-data redaction.
//!
//! Ad descriptions routinely carry phone numbers, messaging-app handles,
//! emails and fiscal identifiers that must never reach the public listing
//! store. Redaction is an ordered pipeline of five category passes, each
//! rewriting the working copy before the next. The ordering is load-bearing:
//! messaging contacts run before the bare phone pass so the keyword and the
//! number are consumed as one phrase, and phones run last so they cannot see
//! digits inside earlier placeholders (which also makes redaction idempotent).

mod patterns;

use once_cell::sync::Lazy;
use regex::Regex;

use patterns::PHONE_SCHEMES;

pub const MESSAGING_PLACEHOLDER: &str = "[MESSAGING CONTACT CENSORED]";
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL CENSORED]";
pub const FISCAL_CODE_PLACEHOLDER: &str = "[FISCAL CODE CENSORED]";
pub const VAT_PLACEHOLDER: &str = "[VAT NUMBER CENSORED]";
pub const PHONE_PLACEHOLDER: &str = "[PHONE NUMBER CENSORED]";

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

/// 16-character fiscal code: 6 letters, 2 digits, letter, 2 digits, letter,
/// 3 digits, letter. Case-sensitive on purpose; lowercase runs are prose.
const FISCAL_CODE_PATTERN: &str = r"\b[A-Z]{6}\d{2}[A-Z]\d{2}[A-Z]\d{3}[A-Z]\b";

/// Standalone 11-digit runs. Runs with a mobile-prefix leading digit are
/// filtered per match instead of via lookahead, which the regex engine does
/// not support; those runs belong to the phone pass.
const VAT_PATTERN: &str = r"\b\d{11}\b";

/// Per-category match counts for one piece of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CensorStats {
    pub messaging_contacts: usize,
    pub phone_numbers: usize,
    pub emails: usize,
    pub fiscal_codes: usize,
    pub vat_numbers: usize,
}

impl CensorStats {
    pub fn total(&self) -> usize {
        self.messaging_contacts
            + self.phone_numbers
            + self.emails
            + self.fiscal_codes
            + self.vat_numbers
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

pub struct Censor {
    messaging: Vec<Regex>,
    phones: Vec<Regex>,
    email: Regex,
    fiscal_code: Regex,
    vat: Regex,
}

impl Censor {
    /// Compile every pattern table. A built-in pattern that fails to compile
    /// is a programming error and panics here, never at match time.
    pub fn new() -> Self {
        Self {
            messaging: PHONE_SCHEMES
                .iter()
                .map(|s| compile(&s.messaging_pattern()))
                .collect(),
            phones: PHONE_SCHEMES
                .iter()
                .flat_map(|s| s.phone_patterns())
                .map(|p| compile(&p))
                .collect(),
            email: compile(EMAIL_PATTERN),
            fiscal_code: compile(FISCAL_CODE_PATTERN),
            vat: compile(VAT_PATTERN),
        }
    }

    /// Redact all sensitive contact data. Best effort, never fails; empty
    /// input comes back unchanged.
    pub fn censor_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut working = text.to_string();

        // 1. Messaging contacts, so the bare phone pass cannot split the
        //    keyword+number phrase.
        for re in &self.messaging {
            working = re.replace_all(&working, MESSAGING_PLACEHOLDER).into_owned();
        }

        // 2.-4. Emails, fiscal codes, VAT numbers; disjoint by construction.
        working = self.email.replace_all(&working, EMAIL_PLACEHOLDER).into_owned();
        working = self
            .fiscal_code
            .replace_all(&working, FISCAL_CODE_PLACEHOLDER)
            .into_owned();
        working = self.censor_vat(&working);

        // 5. Bare phone numbers last; placeholders contain no digits. A
        //    replacement can expose an adjacent digit run to an earlier
        //    pattern in the union, so the pass repeats until nothing matches.
        loop {
            let mut changed = false;
            for re in &self.phones {
                if re.is_match(&working) {
                    working = re.replace_all(&working, PHONE_PLACEHOLDER).into_owned();
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        working
    }

    /// Whether a censoring pass would change anything.
    pub fn has_sensitive_data(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.messaging.iter().any(|re| re.is_match(text))
            || self.phones.iter().any(|re| re.is_match(text))
            || self.email.is_match(text)
            || self.fiscal_code.is_match(text)
            || self
                .vat
                .find_iter(text)
                .any(|m| !has_mobile_prefix(m.as_str()))
    }

    /// Count matches per category without touching the input.
    pub fn stats(&self, text: &str) -> CensorStats {
        if text.is_empty() {
            return CensorStats::default();
        }
        let mut stats = CensorStats::default();

        for re in &self.messaging {
            stats.messaging_contacts += re.find_iter(text).count();
        }

        // Strip messaging matches from a scratch copy first so a number that
        // belongs to a messaging phrase is not also counted as a bare phone.
        let mut scratch = text.to_string();
        for re in &self.messaging {
            scratch = re.replace_all(&scratch, "").into_owned();
        }
        // Consume progressively, the way the censoring passes would, so the
        // overlapping patterns in the union cannot count one number twice.
        for re in &self.phones {
            stats.phone_numbers += re.find_iter(&scratch).count();
            scratch = re.replace_all(&scratch, " ").into_owned();
        }

        stats.emails = self.email.find_iter(text).count();
        stats.fiscal_codes = self.fiscal_code.find_iter(text).count();
        stats.vat_numbers = self
            .vat
            .find_iter(text)
            .filter(|m| !has_mobile_prefix(m.as_str()))
            .count();
        stats
    }

    fn censor_vat(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in self.vat.find_iter(text) {
            if has_mobile_prefix(m.as_str()) {
                continue;
            }
            out.push_str(&text[last..m.start()]);
            out.push_str(VAT_PLACEHOLDER);
            last = m.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

impl Default for Censor {
    fn default() -> Self {
        Self::new()
    }
}

/// An 11-digit run starting like a mobile number is phone territory, not VAT.
fn has_mobile_prefix(digits: &str) -> bool {
    digits.starts_with(['3', '6', '7'])
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern)
        .unwrap_or_else(|err| panic!("built-in censor pattern failed to compile: {pattern}: {err}"))
}

static CENSOR: Lazy<Censor> = Lazy::new(Censor::new);

/// Redact sensitive contact data using the shared instance.
pub fn censor_text(text: &str) -> String {
    CENSOR.censor_text(text)
}

/// Check for sensitive contact data using the shared instance.
pub fn has_sensitive_data(text: &str) -> bool {
    CENSOR.has_sensitive_data(text)
}

/// Per-category match counts using the shared instance.
pub fn censorship_stats(text: &str) -> CensorStats {
    CENSOR.stats(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEPARATOR_STYLES: &[&str] = &["", " ", ".", "-", "  ", "..", " - ", ". "];

    #[test]
    fn test_empty_input_is_identity() {
        let censor = Censor::new();
        assert_eq!(censor.censor_text(""), "");
        assert!(!censor.has_sensitive_data(""));
        assert!(censor.stats("").is_empty());
    }

    #[test]
    fn test_three_prefix_mobiles_all_separator_styles() {
        let censor = Censor::new();
        for country in ["", "+39 ", "39 ", "(+39) "] {
            for sep in SEPARATOR_STYLES {
                let number = format!("{country}333{sep}123{sep}4567");
                let text = format!("Llamar al {number} por la tarde");
                let censored = censor.censor_text(&text);
                assert!(
                    censored.contains(PHONE_PLACEHOLDER),
                    "not censored: {text:?} -> {censored:?}"
                );
                assert!(!censored.contains("4567"), "digits left in {censored:?}");
                assert!(censor.has_sensitive_data(&text), "not detected: {text:?}");
            }
        }
    }

    #[test]
    fn test_six_seven_prefix_mobiles_all_separator_styles() {
        let censor = Censor::new();
        for country in ["", "+34 ", "34 "] {
            for first in ["632", "712"] {
                for sep in SEPARATOR_STYLES {
                    let number = format!("{country}{first}{sep}338{sep}093");
                    let text = format!("mas info {number} gracias");
                    let censored = censor.censor_text(&text);
                    assert!(
                        censored.contains(PHONE_PLACEHOLDER),
                        "not censored: {text:?} -> {censored:?}"
                    );
                    assert!(censor.has_sensitive_data(&text));
                }
            }
        }
    }

    #[test]
    fn test_compact_nine_digit_three_prefix() {
        let censor = Censor::new();
        let censored = censor.censor_text("chiamami 333123456 dopo le 18");
        assert!(censored.contains(PHONE_PLACEHOLDER));
        assert!(!censored.contains("333123456"));
    }

    #[test]
    fn test_prices_and_short_numbers_untouched() {
        let censor = Censor::new();
        for text in [
            "precio 400 todo incluido",
            "400€ con todos los gastos incluidos",
            "350€ al mes, fianza 700",
            "habitacion en planta 3, puerta 12",
            "disponible desde el 01/09/2025",
            "contrato de 6 meses, 1234567 visitas",
        ] {
            assert_eq!(censor.censor_text(text), text, "over-redacted: {text:?}");
            assert!(!censor.has_sensitive_data(text), "false positive: {text:?}");
        }
    }

    #[test]
    fn test_messaging_contact_consumes_keyword_and_number() {
        let censor = Censor::new();
        let text = "Hola buenas tengo una habitacion disponible para el mes de \
                    septiembre precio 400 todo incluido, para mas informacion \
                    escriba solo al whatsApp 632338093";
        let censored = censor.censor_text(text);
        assert_eq!(censored.matches(MESSAGING_PLACEHOLDER).count(), 1);
        assert_eq!(censored.matches(PHONE_PLACEHOLDER).count(), 0);
        assert!(!censored.contains("whatsApp"));
        assert!(!censored.contains("632338093"));
        assert!(censored.contains("precio 400"));
    }

    #[test]
    fn test_messaging_variants() {
        let censor = Censor::new();
        for text in [
            "whatsapp: 632338093",
            "WhatsApp 333 123 4567",
            "telegram +34 632 338 093",
            "wa: 3331234567",
            "tg 632.338.093",
        ] {
            let censored = censor.censor_text(text);
            assert_eq!(
                censored.matches(MESSAGING_PLACEHOLDER).count(),
                1,
                "bad messaging redaction: {text:?} -> {censored:?}"
            );
            assert_eq!(censored.matches(PHONE_PLACEHOLDER).count(), 0);
        }
    }

    #[test]
    fn test_messaging_stats_not_double_counted() {
        let stats =
            censorship_stats("Hola... para mas informacion escriba solo al whatsApp 632338093");
        assert_eq!(stats.messaging_contacts, 1);
        assert_eq!(stats.phone_numbers, 0);
        assert_eq!(stats.emails, 0);
    }

    #[test]
    fn test_email_redaction() {
        let censor = Censor::new();
        let text = "Contact me at mario.rossi@gmail.com or call +39 333 123 4567";
        let censored = censor.censor_text(text);
        assert!(censored.contains(EMAIL_PLACEHOLDER));
        assert!(censored.contains(PHONE_PLACEHOLDER));
        assert!(!censored.contains("mario.rossi"));

        let stats = censor.stats(text);
        assert_eq!(stats.emails, 1);
        assert_eq!(stats.phone_numbers, 1);
        assert_eq!(stats.messaging_contacts, 0);
    }

    #[test]
    fn test_fiscal_code_redaction() {
        let censor = Censor::new();
        let censored = censor.censor_text("intestato a RSSMRA85T10A562S, grazie");
        assert!(censored.contains(FISCAL_CODE_PLACEHOLDER));
        assert!(!censored.contains("RSSMRA85T10A562S"));
        // Lowercase look-alikes are prose, not codes.
        assert!(!censor.has_sensitive_data("rssmra85t10a562s"));
    }

    #[test]
    fn test_vat_redaction_excludes_mobile_prefixes() {
        let censor = Censor::new();
        let censored = censor.censor_text("partita iva 01234567890");
        assert!(censored.contains(VAT_PLACEHOLDER));

        // 11-digit runs that start like a mobile number are not VAT numbers.
        for text in ["cod 33312345678", "cod 63312345678", "cod 73312345678"] {
            assert!(!censor.censor_text(text).contains(VAT_PLACEHOLDER));
        }
        let stats = censor.stats("partita iva 01234567890 e 93312345678");
        assert_eq!(stats.vat_numbers, 2);
    }

    #[test]
    fn test_censoring_is_idempotent() {
        let censor = Censor::new();
        for text in [
            "whatsapp 632338093 o chiama 333 123 4567",
            "mail mario.rossi@gmail.com iva 01234567890 cf RSSMRA85T10A562S",
            "Se alquila habitación individual, 400€, 641919781 solo llamadas.",
            "",
        ] {
            let once = censor.censor_text(text);
            let twice = censor.censor_text(&once);
            assert_eq!(once, twice, "not idempotent for {text:?}");
        }
    }

    #[test]
    fn test_real_feed_samples() {
        let censor = Censor::new();

        let text = "Se alquila habitación individual a chica, en Badalona línea L2 \
                    del metro. 400€ con todos los gastos incluidos. 641919781 solo llamadas.";
        let censored = censor.censor_text(text);
        assert!(censored.contains(PHONE_PLACEHOLDER));
        assert!(censored.contains("400€"));
        assert!(!censored.contains("641919781"));

        let text = "Alquilo habitación en igualada, sitio amplio y tranquilo 603597082";
        assert!(censor.censor_text(text).contains(PHONE_PLACEHOLDER));
    }

    #[test]
    fn test_shared_instance_helpers() {
        assert!(has_sensitive_data("llama al 632338093"));
        assert_eq!(
            censor_text("llama al 632338093"),
            format!("llama al {PHONE_PLACEHOLDER}")
        );
        assert_eq!(censorship_stats("llama al 632338093").phone_numbers, 1);
    }

    #[cfg(feature = "fuzz")]
    mod fuzz {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_censor_never_panics(text in ".*") {
                let censor = Censor::new();
                let _ = censor.censor_text(&text);
                let _ = censor.has_sensitive_data(&text);
                let _ = censor.stats(&text);
            }

            #[test]
            fn test_censor_idempotent(text in ".*") {
                let censor = Censor::new();
                let once = censor.censor_text(&text);
                prop_assert_eq!(censor.censor_text(&once), once.clone());
            }

            #[test]
            fn test_short_digit_runs_survive(digits in "[0-9]{1,7}") {
                let censor = Censor::new();
                let text = format!("precio {digits} euros");
                prop_assert_eq!(censor.censor_text(&text), text);
            }
        }
    }
}
