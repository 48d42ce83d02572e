//! Closed-label intent fallback
//!
//! Consulted only when no flow is active yet or an explicit interrupt
//! pattern matched, never during normal step handling. Whatever the model
//! answers is accepted only if it is one of the allowed labels; anything
//! else is discarded as `unknown`. The fallback can therefore widen
//! recognition but can never invent an intent.

use dhvani_core::PhraseRenderer;

/// Validate a model's intent guess against a closed label set
pub struct IntentFallback {
    labels: Vec<String>,
}

impl IntentFallback {
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Ask the renderer to pick a label for the utterance.
    ///
    /// Any failure or out-of-set answer yields `None` ("unknown"), and the
    /// caller falls back to its keyword classification.
    pub async fn classify(
        &self,
        renderer: &dyn PhraseRenderer,
        utterance: &str,
    ) -> Option<String> {
        let template = format!(
            "Pick exactly one label for the caller utterance, or 'unknown'. \
             Labels: {}. Answer with the label only.",
            self.labels.join(", ")
        );
        let context = serde_json::json!({ "utterance": utterance });

        let answer = match renderer.render(&template, &context).await {
            Ok(answer) => answer.trim().to_lowercase(),
            Err(e) => {
                tracing::debug!(error = %e, "intent fallback unavailable");
                return None;
            }
        };

        self.validate(&answer)
    }

    /// Keep only answers that are exactly one of the allowed labels
    pub fn validate(&self, answer: &str) -> Option<String> {
        self.labels
            .iter()
            .find(|label| label.eq_ignore_ascii_case(answer))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dhvani_core::Result;

    struct FixedRenderer(String);

    #[async_trait]
    impl PhraseRenderer for FixedRenderer {
        async fn render(&self, _template: &str, _context: &serde_json::Value) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl PhraseRenderer for FailingRenderer {
        async fn render(&self, _template: &str, _context: &serde_json::Value) -> Result<String> {
            Err(dhvani_core::Error::Render("offline".into()))
        }
    }

    #[tokio::test]
    async fn test_in_set_answer_accepted() {
        let fallback = IntentFallback::new(["sales", "support"]);
        let renderer = FixedRenderer("Sales".into());
        assert_eq!(
            fallback.classify(&renderer, "I want to buy").await,
            Some("sales".to_string())
        );
    }

    #[tokio::test]
    async fn test_out_of_set_answer_discarded() {
        let fallback = IntentFallback::new(["sales", "support"]);
        let renderer = FixedRenderer("definitely billing, I think".into());
        assert_eq!(fallback.classify(&renderer, "bill please").await, None);
    }

    #[tokio::test]
    async fn test_renderer_failure_is_unknown() {
        let fallback = IntentFallback::new(["sales"]);
        assert_eq!(fallback.classify(&FailingRenderer, "hi").await, None);
    }

    #[test]
    fn test_validate_is_case_insensitive() {
        let fallback = IntentFallback::new(["Support"]);
        assert_eq!(fallback.validate("support"), Some("Support".to_string()));
        assert_eq!(fallback.validate("supportive"), None);
    }
}
