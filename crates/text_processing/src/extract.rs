//! Slot extraction
//!
//! Rule-based extraction of exactly the field(s) a dialog step needs from a
//! transcript. Patterns are compiled once at program start with
//! `once_cell::sync::Lazy`.
//!
//! Two modes are exposed:
//!
//! - [`SlotExtractor::extract_field`], strict: only the active step's
//!   declared field is looked for. This is the only mode that may feed an
//!   active step.
//! - [`SlotExtractor::extract_any`], opportunistic: pull anything
//!   recognizable. Used solely for initial flow selection; feeding an active
//!   step from it would let one answer bleed into unrelated slots.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use dhvani_core::Language;

use crate::digits::translate_spoken_digits;

/// Field types a flow step can collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Phone,
    Pincode,
    Email,
    Name,
    Address,
    Model,
    Budget,
}

impl FieldType {
    /// Canonical field name used as the collected-data key
    pub fn key(&self) -> &'static str {
        match self {
            FieldType::Phone => "phone",
            FieldType::Pincode => "pincode",
            FieldType::Email => "email",
            FieldType::Name => "name",
            FieldType::Address => "address",
            FieldType::Model => "model",
            FieldType::Budget => "budget",
        }
    }
}

// Phone: optional +91/91/0 prefix, Indian mobile starts 6-9
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:\+?91[-\s]?)([6-9]\d{9})\b").unwrap(),
        Regex::new(r"\b0?([6-9]\d{9})\b").unwrap(),
    ]
});

// Pincode: 6 digits, context keyword raises priority over the bare form
static PINCODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:pincode|pin\s*code|pin|पिनकोड|पिन)\s*(?:is|hai|है)?\s*(\d{6})\b").unwrap(),
        Regex::new(r"\b([1-9]\d{5})\b").unwrap(),
    ]
});

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap());

// Name: English and Hinglish introduction phrasings
static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:my\s+name\s+is|i\s+am|i'm|this\s+is|myself)\s+([A-Za-z]+(?:\s+[A-Za-z]+){0,2})").unwrap(),
        Regex::new(r"(?i)(?:mera\s+)?(?:naam|नाम)\s+([A-Za-z\u{0900}-\u{097F}]+(?:\s+[A-Za-z\u{0900}-\u{097F}]+){0,2}?)\s*(?:hai|है|$)").unwrap(),
    ]
});

static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:address|पता|pata)\s*(?:is|:|hai|है)?\s*(.{8,})").unwrap()
});

// Model: "model X200" phrasing first, then a bare alphanumeric model code
static MODEL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)model\s*(?:is|:|number)?\s*([A-Za-z0-9][A-Za-z0-9\- ]{1,20}[A-Za-z0-9])").unwrap(),
        Regex::new(r"\b([A-Za-z]{1,4}[-]?\d{2,4}[A-Za-z0-9]*)\b").unwrap(),
    ]
});

// Budget: Indian scale multipliers, then rupee-marked, then bare amounts
static BUDGET_PATTERNS: Lazy<Vec<(Regex, f64)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:crore|cr|करोड़|करोड)\b").unwrap(), 10_000_000.0),
        (Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:lakh|lac|lakhs|l|लाख)\b").unwrap(), 100_000.0),
        (Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:thousand|hazar|hazaar|k|हज़ार|हजार)\b").unwrap(), 1_000.0),
        (Regex::new(r"(?:₹|(?i:rs\.?|rupees?|रुपये))\s*(\d+(?:,\d+)*)").unwrap(), 1.0),
        (Regex::new(r"\b(\d{4,9})\b").unwrap(), 1.0),
    ]
});

/// Rule-based slot extractor
///
/// Stateless; all patterns are module-level statics, so construction is free.
#[derive(Debug, Clone, Default)]
pub struct SlotExtractor;

impl SlotExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Strict mode: extract only the declared field of the active step.
    ///
    /// Returns the raw candidate; callers validate it independently via
    /// [`crate::validate::validate`].
    pub fn extract_field(
        &self,
        utterance: &str,
        field: FieldType,
        language: Language,
    ) -> Option<String> {
        let text = translate_spoken_digits(utterance, language);

        match field {
            FieldType::Phone => first_capture(&PHONE_PATTERNS, &text),
            FieldType::Pincode => first_capture(&PINCODE_PATTERNS, &text),
            FieldType::Email => EMAIL_PATTERN
                .captures(&text)
                .map(|c| c[1].to_string()),
            FieldType::Name => first_capture(&NAME_PATTERNS, &text)
                .map(|n| n.trim().to_string())
                // A bare reply to "what is your name" is the name itself
                .or_else(|| bare_name(utterance)),
            FieldType::Address => ADDRESS_PATTERN
                .captures(&text)
                .map(|c| c[1].trim().to_string())
                .or_else(|| bare_address(&text)),
            FieldType::Model => first_capture(&MODEL_PATTERNS, &text),
            FieldType::Budget => extract_amount(&text).map(|v| format!("{}", v as i64)),
        }
    }

    /// Opportunistic mode: extract anything recognizable.
    ///
    /// For initial flow selection only; never use this to advance an
    /// already-active step.
    pub fn extract_any(&self, utterance: &str, language: Language) -> HashMap<FieldType, String> {
        let mut found = HashMap::new();

        for field in [
            FieldType::Phone,
            FieldType::Pincode,
            FieldType::Email,
            FieldType::Budget,
            FieldType::Name,
        ] {
            if let Some(value) = self.extract_field(utterance, field, language) {
                // A 10-digit phone match swallows any 6-digit pincode inside it
                if field == FieldType::Pincode {
                    if let Some(phone) = found.get(&FieldType::Phone) {
                        if phone.contains(value.as_str()) {
                            continue;
                        }
                    }
                }
                found.insert(field, value);
            }
        }

        found
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(text).map(|c| c[1].to_string()))
}

/// Parse an amount with Indian-scale multipliers, skipping phone-shaped
/// numbers
fn extract_amount(text: &str) -> Option<f64> {
    for (pattern, multiplier) in BUDGET_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let raw = caps[1].replace(',', "");
            if raw.len() == 10 && raw.starts_with(['6', '7', '8', '9']) {
                tracing::debug!(value = %raw, "skipping amount candidate that looks like a phone number");
                continue;
            }
            if let Ok(n) = raw.parse::<f64>() {
                let amount = n * multiplier;
                if amount > 1_000_000_000.0 {
                    tracing::debug!(amount, "skipping implausibly large amount");
                    continue;
                }
                return Some(amount);
            }
        }
    }
    None
}

/// Whole-utterance name fallback: short, letters only, no filler verbs
fn bare_name(utterance: &str) -> Option<String> {
    let trimmed = utterance.trim().trim_matches(|c: char| c.is_ascii_punctuation());
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.is_empty() || words.len() > 3 {
        return None;
    }
    let all_wordy = words
        .iter()
        .all(|w| w.chars().all(|c| c.is_alphabetic()));
    if !all_wordy {
        return None;
    }
    let lower = trimmed.to_lowercase();
    const FILLERS: &[&str] = &["yes", "no", "haan", "nahi", "ok", "okay", "hello", "hi"];
    if FILLERS.iter().any(|f| lower == *f) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Whole-utterance address fallback for direct replies to an address step
fn bare_address(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() >= 12 && trimmed.split_whitespace().count() >= 3 {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SlotExtractor {
        SlotExtractor::new()
    }

    #[test]
    fn test_phone_extraction() {
        let e = extractor();
        assert_eq!(
            e.extract_field("my number is 9876543210", FieldType::Phone, Language::Hindi),
            Some("9876543210".to_string())
        );
        assert_eq!(
            e.extract_field("call me at +91-8765432109", FieldType::Phone, Language::Hindi),
            Some("8765432109".to_string())
        );
        // Digit-run collapsing repairs STT's grouped readout
        assert_eq!(
            e.extract_field("call me at +91 87654 32109", FieldType::Phone, Language::Hindi),
            Some("8765432109".to_string())
        );
    }

    #[test]
    fn test_phone_from_spoken_digits() {
        let e = extractor();
        assert_eq!(
            e.extract_field(
                "nine eight seven six five four three two one zero",
                FieldType::Phone,
                Language::Hindi
            ),
            Some("9876543210".to_string())
        );
    }

    #[test]
    fn test_pincode_extraction() {
        let e = extractor();
        assert_eq!(
            e.extract_field("pincode is 305001", FieldType::Pincode, Language::Hindi),
            Some("305001".to_string())
        );
        assert_eq!(
            e.extract_field("my pincode is 3 0 5 0 0 1", FieldType::Pincode, Language::Hindi),
            Some("305001".to_string())
        );
    }

    #[test]
    fn test_email_extraction() {
        let e = extractor();
        assert_eq!(
            e.extract_field("it is rahul.k@example.com ok", FieldType::Email, Language::English),
            Some("rahul.k@example.com".to_string())
        );
    }

    #[test]
    fn test_name_phrasings() {
        let e = extractor();
        assert_eq!(
            e.extract_field("my name is Rahul Sharma", FieldType::Name, Language::Hindi),
            Some("Rahul Sharma".to_string())
        );
        assert_eq!(
            e.extract_field("mera naam Rahul hai", FieldType::Name, Language::Hindi),
            Some("Rahul".to_string())
        );
        // Bare reply
        assert_eq!(
            e.extract_field("Rahul Sharma", FieldType::Name, Language::Hindi),
            Some("Rahul Sharma".to_string())
        );
        // Filler words are not names
        assert_eq!(e.extract_field("haan", FieldType::Name, Language::Hindi), None);
    }

    #[test]
    fn test_budget_lakh() {
        let e = extractor();
        assert_eq!(
            e.extract_field("around 5 lakh", FieldType::Budget, Language::Hindi),
            Some("500000".to_string())
        );
        assert_eq!(
            e.extract_field("budget 50L", FieldType::Budget, Language::English),
            Some("5000000".to_string())
        );
    }

    #[test]
    fn test_budget_skips_phone_shaped_numbers() {
        let e = extractor();
        assert_eq!(
            e.extract_field("9876543210", FieldType::Budget, Language::Hindi),
            None
        );
    }

    #[test]
    fn test_model_extraction() {
        let e = extractor();
        assert_eq!(
            e.extract_field("model is Splendor Plus", FieldType::Model, Language::English),
            Some("Splendor Plus".to_string())
        );
        assert_eq!(
            e.extract_field("I want the RX100", FieldType::Model, Language::English),
            Some("RX100".to_string())
        );
    }

    #[test]
    fn test_opportunistic_mode() {
        let e = extractor();
        let found = e.extract_any(
            "I am Rahul, pincode 305001, call 9876543210",
            Language::Hindi,
        );
        assert_eq!(found.get(&FieldType::Pincode).map(String::as_str), Some("305001"));
        assert_eq!(found.get(&FieldType::Phone).map(String::as_str), Some("9876543210"));
    }

    #[test]
    fn test_opportunistic_does_not_mistake_phone_for_pincode() {
        let e = extractor();
        let found = e.extract_any("call me on 9876543210", Language::Hindi);
        assert!(found.contains_key(&FieldType::Phone));
        // The first six digits of the phone number must not leak into pincode
        assert!(!found.contains_key(&FieldType::Pincode));
    }
}
