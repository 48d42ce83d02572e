//! Dialog state controller
//!
//! `process_turn` is the brain of a call: given the flow graph, the persisted
//! conversation record and the caller's utterance, it returns the patch for
//! this turn. It is synchronous, deterministic and side-effect-free: every
//! output is fully determined by `(step definition, collected data, this
//! utterance)`. Classification can short-circuit to escalation or reset but
//! never silently advances a step; only validated step handling does that.

use std::collections::HashMap;

use dhvani_core::{ConversationRecord, ConversationStatus, Language, TurnPatch};
use dhvani_text_processing::intent::{ESCALATE, RESET};
use dhvani_text_processing::{
    validate, IntentClassifier, IntentDef, SlotExtractor, Verbalizer,
};

use crate::error::{DialogError, Result};
use crate::graph::{FlowGraph, Step, StepKind};

/// Upper bound on auto-advancing hops in one turn; anything deeper is a
/// cycle in the flow document.
const MAX_HOPS: usize = 16;

/// Stateless turn processor, shared across all call sessions
#[derive(Debug, Default)]
pub struct DialogController {
    extractor: SlotExtractor,
    verbalizer: Verbalizer,
}

/// Result of walking auto-advancing steps until the flow waits or ends
struct PromptRun {
    texts: Vec<String>,
    landing: String,
    status: ConversationStatus,
    terminal: bool,
}

impl DialogController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one turn.
    ///
    /// `user_text = None` is the first turn: the caller hears the current
    /// step's prompt. Subsequent turns classify, extract and dispatch on the
    /// current step's kind.
    pub fn process_turn(
        &self,
        flow: &FlowGraph,
        record: &ConversationRecord,
        user_text: Option<&str>,
    ) -> Result<TurnPatch> {
        self.process_turn_hinted(flow, record, user_text, None)
    }

    /// [`Self::process_turn`] with an optional externally supplied intent
    /// label for `intent` steps. The hint widens recognition only: it is
    /// re-validated against the step's branch set and consulted only when
    /// keyword classification produced no branch. It never overrides a
    /// keyword match and never advances any other step kind.
    pub fn process_turn_hinted(
        &self,
        flow: &FlowGraph,
        record: &ConversationRecord,
        user_text: Option<&str>,
        intent_hint: Option<&str>,
    ) -> Result<TurnPatch> {
        if record.status.is_terminal() {
            return Err(DialogError::ConversationClosed);
        }

        let Some(text) = user_text else {
            let run = self.prompt_run(flow, &record.current_step_id, record.language)?;
            return Ok(self.patch_from_run(run, record, HashMap::new(), Vec::new(), 0));
        };

        let step = flow.step(&record.current_step_id)?;

        // Interrupt classification. Skipped on confirm steps: there, only
        // yes/no outcomes are authoritative regardless of other matches.
        if step.kind != StepKind::Confirm {
            let classifier = self.classifier_for(flow);
            let classification = classifier.classify(text, true);
            match classification.intent.as_str() {
                ESCALATE => return self.escalate(flow, record),
                RESET => {
                    let run = self.prompt_run(flow, &flow.start_step, record.language)?;
                    return Ok(self.patch_from_run(run, record, HashMap::new(), Vec::new(), 0));
                }
                _ => {}
            }
        }

        match step.kind {
            StepKind::Message | StepKind::Action => {
                self.advance_to(flow, record, step.next.as_deref(), HashMap::new(), Vec::new())
            }
            StepKind::Input => self.handle_input(flow, step, record, text),
            StepKind::Confirm => self.handle_confirm(flow, step, record, text),
            StepKind::Choice => self.handle_choice(flow, step, record, text),
            StepKind::Intent => self.handle_intent(flow, step, record, text, intent_hint),
            StepKind::Handoff => Ok(TurnPatch {
                output_text: self.render(step.text_for(record.language.code()), record, &HashMap::new()),
                next_step_id: record.current_step_id.clone(),
                data: HashMap::new(),
                clear_fields: Vec::new(),
                retry_count: record.retry_count,
                status: ConversationStatus::Handoff,
                terminal: true,
            }),
            StepKind::End => Ok(TurnPatch {
                output_text: self.render(step.text_for(record.language.code()), record, &HashMap::new()),
                next_step_id: record.current_step_id.clone(),
                data: HashMap::new(),
                clear_fields: Vec::new(),
                retry_count: record.retry_count,
                status: ConversationStatus::Completed,
                terminal: true,
            }),
        }
    }

    fn handle_input(
        &self,
        flow: &FlowGraph,
        step: &Step,
        record: &ConversationRecord,
        text: &str,
    ) -> Result<TurnPatch> {
        let field = step.field.ok_or_else(|| DialogError::InvalidFlow {
            flow: flow.id.clone(),
            reason: format!("input step {:?} has no field", record.current_step_id),
        })?;

        let validated = self
            .extractor
            .extract_field(text, field, record.language)
            .and_then(|candidate| validate(field, &candidate).ok());

        match validated {
            Some(value) => {
                tracing::debug!(field = field.key(), value = %value, "input accepted");
                let data = HashMap::from([(field.key().to_string(), value)]);
                self.advance_to(flow, record, step.next.as_deref(), data, Vec::new())
            }
            None => {
                tracing::debug!(field = field.key(), "input rejected");
                self.retry_or_escalate(flow, step, record)
            }
        }
    }

    fn handle_confirm(
        &self,
        flow: &FlowGraph,
        step: &Step,
        record: &ConversationRecord,
        text: &str,
    ) -> Result<TurnPatch> {
        use dhvani_text_processing::Confirmation;

        let classifier = self.classifier_for(flow);
        match classifier.classify_confirmation(text) {
            Confirmation::Yes => {
                self.advance_to(flow, record, step.confirm_next.as_deref(), HashMap::new(), Vec::new())
            }
            Confirmation::No => self.advance_to(
                flow,
                record,
                step.deny_next.as_deref(),
                HashMap::new(),
                step.clear_on_deny.clone(),
            ),
            Confirmation::Unclear => self.retry_or_escalate(flow, step, record),
        }
    }

    fn handle_choice(
        &self,
        flow: &FlowGraph,
        step: &Step,
        record: &ConversationRecord,
        text: &str,
    ) -> Result<TurnPatch> {
        let lowered = text.to_lowercase();

        // Most specific matching keyword wins; branch name order breaks
        // exact ties so the outcome never depends on map iteration order.
        let mut branches: Vec<(&String, &Vec<String>)> = step.keywords.iter().collect();
        branches.sort_by_key(|(name, _)| name.as_str());

        let mut best: Option<(&str, usize)> = None;
        for (branch, keywords) in branches {
            for keyword in keywords {
                if keyword_in(&lowered, keyword) {
                    let specificity = keyword.chars().count();
                    if best.map_or(true, |(_, s)| specificity > s) {
                        best = Some((branch.as_str(), specificity));
                    }
                }
            }
        }

        let branch = best
            .map(|(b, _)| b)
            .or(step.default_branch.as_deref());

        match branch.and_then(|b| step.branches.get(b)) {
            Some(target) => {
                self.advance_to(flow, record, Some(target.as_str()), HashMap::new(), Vec::new())
            }
            None => self.retry_or_escalate(flow, step, record),
        }
    }

    fn handle_intent(
        &self,
        flow: &FlowGraph,
        step: &Step,
        record: &ConversationRecord,
        text: &str,
        hint: Option<&str>,
    ) -> Result<TurnPatch> {
        let classifier = self.classifier_for(flow);
        let classification = classifier.classify(text, true);

        // Keyword match first; the hint only widens recognition and must
        // itself name a declared branch.
        let branch = if step.branches.contains_key(&classification.intent) {
            Some(classification.intent.as_str())
        } else if let Some(hint) = hint.filter(|h| step.branches.contains_key(*h)) {
            Some(hint)
        } else {
            step.default_branch.as_deref()
        };

        match branch.and_then(|b| step.branches.get(b)) {
            Some(target) => {
                self.advance_to(flow, record, Some(target.as_str()), HashMap::new(), Vec::new())
            }
            None => self.retry_or_escalate(flow, step, record),
        }
    }

    /// Advance to `next` (or finish if there is none), collecting the prompt
    /// text of everything up to and including the step the flow lands on.
    fn advance_to(
        &self,
        flow: &FlowGraph,
        record: &ConversationRecord,
        next: Option<&str>,
        data: HashMap<String, String>,
        clear_fields: Vec<String>,
    ) -> Result<TurnPatch> {
        match next {
            Some(next) => {
                let run = self.prompt_run(flow, next, record.language)?;
                Ok(self.patch_from_run(run, record, data, clear_fields, 0))
            }
            // No outgoing transition: the conversation completed here
            None => Ok(TurnPatch {
                output_text: String::new(),
                next_step_id: record.current_step_id.clone(),
                data,
                clear_fields,
                retry_count: 0,
                status: ConversationStatus::Completed,
                terminal: true,
            }),
        }
    }

    /// Failed answer on the current step: one more retry, or escalation to
    /// the handoff step once `max_retries` consecutive failures are reached.
    fn retry_or_escalate(
        &self,
        flow: &FlowGraph,
        step: &Step,
        record: &ConversationRecord,
    ) -> Result<TurnPatch> {
        let attempts = record.retry_count + 1;
        if attempts >= record.max_retries {
            return self.escalate(flow, record);
        }

        let text = step.retry_text_for(record.language.code());
        Ok(TurnPatch::stay(
            record.current_step_id.clone(),
            self.render(text, record, &HashMap::new()),
            attempts,
        ))
    }

    fn escalate(&self, flow: &FlowGraph, record: &ConversationRecord) -> Result<TurnPatch> {
        let (next_step_id, output_text) = match flow.handoff_step_id() {
            Some(id) => {
                let step = flow.step(id)?;
                (
                    id.to_string(),
                    self.render(step.text_for(record.language.code()), record, &HashMap::new()),
                )
            }
            None => (record.current_step_id.clone(), String::new()),
        };

        Ok(TurnPatch {
            output_text,
            next_step_id,
            data: HashMap::new(),
            clear_fields: Vec::new(),
            retry_count: record.retry_count,
            status: ConversationStatus::Handoff,
            terminal: true,
        })
    }

    /// Walk auto-advancing steps from `start` until the flow waits for input
    /// or terminates.
    fn prompt_run(&self, flow: &FlowGraph, start: &str, language: Language) -> Result<PromptRun> {
        let locale = language.code();
        let mut texts = Vec::new();
        let mut id = start.to_string();

        for _ in 0..MAX_HOPS {
            let step = flow.step(&id)?;
            let text = step.text_for(locale);
            if !text.is_empty() {
                texts.push(text.to_string());
            }

            match step.kind {
                StepKind::Message | StepKind::Action => match &step.next {
                    Some(next) => id = next.clone(),
                    None => {
                        return Ok(PromptRun {
                            texts,
                            landing: id,
                            status: ConversationStatus::Completed,
                            terminal: true,
                        })
                    }
                },
                StepKind::Handoff => {
                    return Ok(PromptRun {
                        texts,
                        landing: id,
                        status: ConversationStatus::Handoff,
                        terminal: true,
                    })
                }
                StepKind::End => {
                    return Ok(PromptRun {
                        texts,
                        landing: id,
                        status: ConversationStatus::Completed,
                        terminal: true,
                    })
                }
                _ => {
                    return Ok(PromptRun {
                        texts,
                        landing: id,
                        status: ConversationStatus::Active,
                        terminal: false,
                    })
                }
            }
        }

        Err(DialogError::InvalidFlow {
            flow: flow.id.clone(),
            reason: format!("auto-advance cycle starting at {start:?}"),
        })
    }

    fn patch_from_run(
        &self,
        run: PromptRun,
        record: &ConversationRecord,
        data: HashMap<String, String>,
        clear_fields: Vec<String>,
        retry_count: u32,
    ) -> TurnPatch {
        let output_text = self.render(&run.texts.join(" "), record, &data);
        TurnPatch {
            output_text,
            next_step_id: run.landing,
            data,
            clear_fields,
            retry_count,
            status: run.status,
            terminal: run.terminal,
        }
    }

    /// Fill `{field}` placeholders from collected + just-learned data, then
    /// verbalize for speech synthesis.
    fn render(&self, text: &str, record: &ConversationRecord, new_data: &HashMap<String, String>) -> String {
        let mut filled = text.to_string();
        for (key, value) in record.collected_data.iter().chain(new_data.iter()) {
            filled = filled.replace(&format!("{{{key}}}"), value);
        }
        self.verbalizer.normalize(&filled, record.language)
    }

    fn classifier_for(&self, flow: &FlowGraph) -> IntentClassifier {
        let mut classifier = IntentClassifier::with_defaults();
        if !flow.intents.is_empty() {
            classifier.extend(
                flow.intents
                    .iter()
                    .map(|def| IntentDef {
                        name: def.name.clone(),
                        keywords: def.keywords.clone(),
                        priority: def.priority,
                    })
                    .collect(),
            );
        }
        classifier
    }
}

/// Phrase keywords match as substrings; single words match whole tokens.
fn keyword_in(text: &str, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    if keyword.contains(' ') {
        text.contains(&keyword)
    } else {
        text.split_whitespace()
            .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()))
            .any(|w| w == keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pincode_flow() -> FlowGraph {
        let flow: FlowGraph = serde_json::from_str(
            r#"{
                "id": "sales",
                "start_step": "welcome",
                "steps": {
                    "welcome": {
                        "type": "message",
                        "text": {"hi": "नमस्ते!", "en": "Welcome!"},
                        "next": "ask_pincode"
                    },
                    "ask_pincode": {
                        "type": "input",
                        "field": "pincode",
                        "text": {"hi": "अपना पिनकोड बताइये", "en": "Please tell me your pincode"},
                        "retry_text": {"hi": "पिनकोड छह अंकों का होता है, दोबारा बताइये", "en": "A pincode has six digits, please repeat"},
                        "next": "confirm_pincode"
                    },
                    "confirm_pincode": {
                        "type": "confirm",
                        "text": {"hi": "आपका पिनकोड {pincode} है, सही?", "en": "Your pincode is {pincode}, correct?"},
                        "confirm_next": "done",
                        "deny_next": "ask_pincode",
                        "clear_on_deny": ["pincode"]
                    },
                    "agent_handoff": {
                        "type": "handoff",
                        "text": {"hi": "आपको एजेंट से जोड़ रहे हैं", "en": "Connecting you to an agent"}
                    },
                    "done": {
                        "type": "end",
                        "text": {"hi": "धन्यवाद!", "en": "Thank you!"}
                    }
                }
            }"#,
        )
        .unwrap();
        flow.validate().unwrap();
        flow
    }

    fn record(flow: &FlowGraph) -> ConversationRecord {
        ConversationRecord::new("call-1", &flow.id, &flow.start_step, Language::English)
    }

    #[test]
    fn test_first_turn_runs_through_message_to_input() {
        let flow = pincode_flow();
        let rec = record(&flow);

        let patch = DialogController::new()
            .process_turn(&flow, &rec, None)
            .unwrap();

        assert_eq!(patch.next_step_id, "ask_pincode");
        assert!(patch.output_text.contains("Welcome!"));
        assert!(patch.output_text.contains("pincode"));
        assert!(!patch.terminal);
    }

    #[test]
    fn test_valid_input_advances_and_resets_retries() {
        let flow = pincode_flow();
        let mut rec = record(&flow);
        rec.current_step_id = "ask_pincode".into();
        rec.retry_count = 1;

        let patch = DialogController::new()
            .process_turn(&flow, &rec, Some("my pincode is 3 0 5 0 0 1"))
            .unwrap();

        assert_eq!(patch.data.get("pincode").map(String::as_str), Some("305001"));
        assert_eq!(patch.retry_count, 0);
        assert_eq!(patch.next_step_id, "confirm_pincode");
        // Placeholder filled and read digit-by-digit for TTS
        assert!(patch.output_text.contains("three zero five zero zero one"));
    }

    #[test]
    fn test_invalid_input_returns_retry_text() {
        let flow = pincode_flow();
        let mut rec = record(&flow);
        rec.current_step_id = "ask_pincode".into();

        let patch = DialogController::new()
            .process_turn(&flow, &rec, Some("umm I don't remember"))
            .unwrap();

        assert_eq!(patch.retry_count, 1);
        assert_eq!(patch.next_step_id, "ask_pincode");
        assert!(patch.output_text.contains("six digits"));
        assert_eq!(patch.status, ConversationStatus::Active);
    }

    #[test]
    fn test_retries_escalate_to_handoff_exactly_at_max() {
        let flow = pincode_flow();
        let controller = DialogController::new();
        let mut rec = record(&flow);
        rec.current_step_id = "ask_pincode".into();
        assert_eq!(rec.max_retries, 2);

        // First invalid answer: retry
        let patch = controller
            .process_turn(&flow, &rec, Some("no idea"))
            .unwrap();
        assert_eq!(patch.retry_count, 1);
        assert!(!patch.terminal);
        rec.apply(&patch);

        // Second invalid answer: handoff, never a third retry
        let patch = controller
            .process_turn(&flow, &rec, Some("still no idea"))
            .unwrap();
        assert_eq!(patch.status, ConversationStatus::Handoff);
        assert!(patch.terminal);
        assert_eq!(patch.next_step_id, "agent_handoff");
        assert!(patch.output_text.contains("agent"));
    }

    #[test]
    fn test_confirm_yes_no_unclear() {
        let flow = pincode_flow();
        let controller = DialogController::new();
        let mut rec = record(&flow);
        rec.current_step_id = "confirm_pincode".into();
        rec.collected_data.insert("pincode".into(), "305001".into());

        let yes = controller.process_turn(&flow, &rec, Some("haan")).unwrap();
        assert_eq!(yes.next_step_id, "done");
        assert_eq!(yes.status, ConversationStatus::Completed);
        assert!(yes.terminal);

        let no = controller.process_turn(&flow, &rec, Some("nahi")).unwrap();
        assert_eq!(no.next_step_id, "ask_pincode");
        assert_eq!(no.clear_fields, vec!["pincode".to_string()]);

        let unclear = controller.process_turn(&flow, &rec, Some("maybe")).unwrap();
        assert_eq!(unclear.next_step_id, "confirm_pincode");
        assert_eq!(unclear.retry_count, 1);
    }

    #[test]
    fn test_confirm_step_ignores_other_intents() {
        let flow = pincode_flow();
        let mut rec = record(&flow);
        rec.current_step_id = "confirm_pincode".into();

        // "start over" would normally reset, but on a confirm step only
        // yes/no are authoritative; this is an unclear answer.
        let patch = DialogController::new()
            .process_turn(&flow, &rec, Some("start over"))
            .unwrap();
        assert_eq!(patch.next_step_id, "confirm_pincode");
        assert_eq!(patch.retry_count, 1);
    }

    #[test]
    fn test_escalation_intent_short_circuits() {
        let flow = pincode_flow();
        let mut rec = record(&flow);
        rec.current_step_id = "ask_pincode".into();

        let patch = DialogController::new()
            .process_turn(&flow, &rec, Some("I want to talk to a human"))
            .unwrap();

        assert_eq!(patch.status, ConversationStatus::Handoff);
        assert_eq!(patch.next_step_id, "agent_handoff");
        assert!(patch.terminal);
    }

    #[test]
    fn test_reset_intent_restarts_flow() {
        let flow = pincode_flow();
        let mut rec = record(&flow);
        rec.current_step_id = "ask_pincode".into();
        rec.retry_count = 1;

        let patch = DialogController::new()
            .process_turn(&flow, &rec, Some("please start over"))
            .unwrap();

        assert_eq!(patch.next_step_id, "ask_pincode");
        assert!(patch.output_text.contains("Welcome!"));
        assert_eq!(patch.retry_count, 0);
    }

    #[test]
    fn test_terminal_record_rejected() {
        let flow = pincode_flow();
        let mut rec = record(&flow);
        rec.status = ConversationStatus::Completed;

        let err = DialogController::new().process_turn(&flow, &rec, Some("hello"));
        assert!(matches!(err, Err(DialogError::ConversationClosed)));
    }

    #[test]
    fn test_choice_step_branches_and_default() {
        let flow: FlowGraph = serde_json::from_str(
            r#"{
                "id": "c",
                "start_step": "pick",
                "steps": {
                    "pick": {
                        "type": "choice",
                        "text": {"en": "New bike or service?"},
                        "branches": {"buy": "buy_step", "service": "service_step", "other": "other_step"},
                        "default_branch": "other",
                        "keywords": {
                            "buy": ["new bike", "buy", "खरीदना"],
                            "service": ["service", "servicing", "सर्विस"]
                        }
                    },
                    "buy_step": {"type": "end", "text": {"en": "Great, buying."}},
                    "service_step": {"type": "end", "text": {"en": "Booking service."}},
                    "other_step": {"type": "end", "text": {"en": "Let me help."}}
                }
            }"#,
        )
        .unwrap();
        flow.validate().unwrap();

        let controller = DialogController::new();
        let mut rec = ConversationRecord::new("c1", "c", "pick", Language::English);
        rec.current_step_id = "pick".into();

        let buy = controller
            .process_turn(&flow, &rec, Some("I want a new bike"))
            .unwrap();
        assert_eq!(buy.next_step_id, "buy_step");

        let fallback = controller
            .process_turn(&flow, &rec, Some("something else entirely"))
            .unwrap();
        assert_eq!(fallback.next_step_id, "other_step");
    }

    #[test]
    fn test_intent_step_uses_flow_intents() {
        let flow: FlowGraph = serde_json::from_str(
            r#"{
                "id": "i",
                "start_step": "route",
                "intents": [
                    {"name": "price_inquiry", "keywords": ["price", "kitna", "कीमत"], "priority": 5}
                ],
                "steps": {
                    "route": {
                        "type": "intent",
                        "text": {"en": "How can I help?"},
                        "branches": {"price_inquiry": "price_step", "continue": "fallback_step"},
                        "default_branch": "continue"
                    },
                    "price_step": {"type": "end", "text": {"en": "Price is 50L"}},
                    "fallback_step": {"type": "end", "text": {"en": "Let me connect you."}}
                }
            }"#,
        )
        .unwrap();
        flow.validate().unwrap();

        let controller = DialogController::new();
        let rec = ConversationRecord::new("c1", "i", "route", Language::English);

        let price = controller
            .process_turn(&flow, &rec, Some("what is the price"))
            .unwrap();
        assert_eq!(price.next_step_id, "price_step");
        // Verbalizer ran over the controller output
        assert!(price.output_text.contains("fifty lakh rupees"));

        let fallback = controller
            .process_turn(&flow, &rec, Some("gibberish entirely"))
            .unwrap();
        assert_eq!(fallback.next_step_id, "fallback_step");
    }

    #[test]
    fn test_intent_hint_widens_but_never_overrides() {
        let flow: FlowGraph = serde_json::from_str(
            r#"{
                "id": "h",
                "start_step": "route",
                "intents": [
                    {"name": "price_inquiry", "keywords": ["price"], "priority": 5}
                ],
                "steps": {
                    "route": {
                        "type": "intent",
                        "text": {"en": "How can I help?"},
                        "branches": {"price_inquiry": "price_step", "support": "support_step"},
                        "default_branch": "support"
                    },
                    "price_step": {"type": "end", "text": {"en": "Pricing."}},
                    "support_step": {"type": "end", "text": {"en": "Support."}}
                }
            }"#,
        )
        .unwrap();
        flow.validate().unwrap();

        let controller = DialogController::new();
        let rec = ConversationRecord::new("c1", "h", "route", Language::English);

        // No keyword match: an in-set hint decides the branch
        let hinted = controller
            .process_turn_hinted(&flow, &rec, Some("how much does it run me"), Some("price_inquiry"))
            .unwrap();
        assert_eq!(hinted.next_step_id, "price_step");

        // Out-of-set hints are discarded
        let discarded = controller
            .process_turn_hinted(&flow, &rec, Some("how much does it run me"), Some("billing"))
            .unwrap();
        assert_eq!(discarded.next_step_id, "support_step");

        // A keyword match beats a contradicting hint
        let keyword_wins = controller
            .process_turn_hinted(&flow, &rec, Some("price please"), Some("support"))
            .unwrap();
        assert_eq!(keyword_wins.next_step_id, "price_step");
    }
}
