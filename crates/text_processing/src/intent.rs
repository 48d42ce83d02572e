//! Intent classification
//!
//! Keyword-table classification used only for flow selection and interrupt
//! handling, never for step advancement. The table maps an intent name to
//! multi-locale keywords and a priority; the highest-priority match wins and
//! ties break on word-overlap score. Anything below threshold while a step is
//! active classifies as [`CONTINUE`]: the utterance is data for the step, not
//! a change of intent.

use unicode_segmentation::UnicodeSegmentation;

/// Label returned when the utterance should be treated as step data
pub const CONTINUE: &str = "continue";
/// Label returned when nothing matched and no step is active
pub const UNKNOWN: &str = "unknown";
/// Built-in interrupt: caller wants a human
pub const ESCALATE: &str = "escalate";
/// Built-in interrupt: caller wants to start over
pub const RESET: &str = "reset";

/// Score below which a match is not believed. A single keyword in a
/// ten-word utterance scores 0.4, so this is the floor where one real
/// keyword still counts.
const CONFIDENCE_THRESHOLD: f32 = 0.4;

/// One intent in the keyword table
#[derive(Debug, Clone)]
pub struct IntentDef {
    pub name: String,
    /// Keywords across locales; multi-word entries match as phrases
    pub keywords: Vec<String>,
    /// Higher priority wins regardless of score
    pub priority: u8,
}

impl IntentDef {
    pub fn new(name: impl Into<String>, keywords: &[&str], priority: u8) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            priority,
        }
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: String,
    pub confidence: f32,
}

/// Outcome of strict yes/no classification on a confirm step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Unclear,
}

// Strict allow-lists. No inference: a word is either here or the answer is
// unclear and the step retries.
const YES_WORDS: &[&str] = &[
    "haan", "haanji", "han", "ji", "yes", "yeah", "yep", "ok", "okay", "theek", "bilkul",
    "sahi", "correct", "right", "sure", "हाँ", "हां", "जी", "ठीक", "बिल्कुल", "सही",
];
const NO_WORDS: &[&str] = &[
    "nahi", "nahin", "na", "no", "nope", "nah", "galat", "wrong", "नहीं", "नही", "ना", "गलत",
];

/// Keyword-table intent classifier
pub struct IntentClassifier {
    intents: Vec<IntentDef>,
    threshold: f32,
}

impl IntentClassifier {
    /// Build a classifier from a custom table
    pub fn new(intents: Vec<IntentDef>) -> Self {
        Self {
            intents,
            threshold: CONFIDENCE_THRESHOLD,
        }
    }

    /// Classifier with the built-in interrupt intents only
    pub fn with_defaults() -> Self {
        Self::new(vec![
            IntentDef::new(
                ESCALATE,
                &[
                    "human",
                    "agent",
                    "real person",
                    "customer care",
                    "manager",
                    "complaint",
                    "shikayat",
                    "baat karao",
                    "insaan",
                    "शिकायत",
                    "इंसान से",
                    "एजेंट",
                ],
                10,
            ),
            IntentDef::new(
                RESET,
                &[
                    "start over",
                    "start again",
                    "restart",
                    "reset",
                    "shuru se",
                    "dobara shuru",
                    "शुरू से",
                    "दोबारा शुरू",
                ],
                8,
            ),
        ])
    }

    /// Add flow-specific intents on top of the built-ins
    pub fn extend(&mut self, intents: Vec<IntentDef>) {
        self.intents.extend(intents);
    }

    /// Classify an utterance.
    ///
    /// `has_active_step` decides what a non-match means: with a step waiting
    /// for an answer it is [`CONTINUE`] (treat as data), otherwise
    /// [`UNKNOWN`].
    pub fn classify(&self, utterance: &str, has_active_step: bool) -> Classification {
        let text = utterance.to_lowercase();
        let utterance_words = text.unicode_words().count().max(1);

        let mut best: Option<(&IntentDef, f32)> = None;
        for intent in &self.intents {
            for keyword in &intent.keywords {
                if !keyword_matches(&text, keyword) {
                    continue;
                }
                let keyword_words = keyword.unicode_words().count().max(1);
                let score =
                    (keyword_words as f32 / utterance_words as f32 + 0.3).min(1.0);

                let better = match best {
                    None => true,
                    Some((current, current_score)) => {
                        intent.priority > current.priority
                            || (intent.priority == current.priority && score > current_score)
                    }
                };
                if better {
                    best = Some((intent, score));
                }
            }
        }

        match best {
            Some((intent, score)) if score >= self.threshold => Classification {
                intent: intent.name.clone(),
                confidence: score,
            },
            _ if has_active_step => Classification {
                intent: CONTINUE.to_string(),
                confidence: 1.0,
            },
            _ => Classification {
                intent: UNKNOWN.to_string(),
                confidence: 0.0,
            },
        }
    }

    /// Strict yes/no classification for confirm steps.
    ///
    /// While a confirm step is active this is the only authoritative
    /// outcome, regardless of what the keyword table would say.
    pub fn classify_confirmation(&self, utterance: &str) -> Confirmation {
        let text = utterance.to_lowercase();
        let words: Vec<&str> = text.unicode_words().collect();

        let yes = words.iter().any(|w| YES_WORDS.contains(w));
        let no = words.iter().any(|w| NO_WORDS.contains(w));

        match (yes, no) {
            (true, false) => Confirmation::Yes,
            (false, true) => Confirmation::No,
            _ => Confirmation::Unclear,
        }
    }
}

/// Phrase keywords match as substrings over word boundaries; single words
/// match whole tokens only (so "no" never fires inside "now").
fn keyword_matches(text: &str, keyword: &str) -> bool {
    if keyword.contains(' ') {
        text.contains(keyword)
    } else {
        text.unicode_words().any(|w| w == keyword)
    }
}
