//! Flow graph document model
//!
//! Flows are JSON documents: a `start_step` plus a map of steps keyed by id.
//! Structural soundness is checked once at load time by
//! [`FlowGraph::validate`]; after that the controller can follow `next`
//! targets without re-checking existence.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use dhvani_text_processing::FieldType;

use crate::error::{DialogError, Result};

/// Step variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Speak and auto-advance
    Message,
    /// Collect and validate one field
    Input,
    /// Strict yes/no gate
    Confirm,
    /// Branch on keyword-matched options
    Choice,
    /// Branch on classified intent
    Intent,
    /// Side effect hook, auto-advance
    Action,
    /// Hand the call to a human
    Handoff,
    /// Terminal step
    End,
}

impl StepKind {
    /// Steps that speak and move on without caller input
    pub fn auto_advances(&self) -> bool {
        matches!(self, StepKind::Message | StepKind::Action)
    }

    /// Steps that wait for the caller before advancing
    pub fn waits_for_input(&self) -> bool {
        matches!(
            self,
            StepKind::Input | StepKind::Confirm | StepKind::Choice | StepKind::Intent
        )
    }
}

/// One node in a flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub kind: StepKind,

    /// Locale code -> caller-facing text
    #[serde(default)]
    pub text: HashMap<String, String>,

    /// Locale code -> retry phrasing; falls back to `text`
    #[serde(default)]
    pub retry_text: HashMap<String, String>,

    /// Single outgoing transition
    #[serde(default)]
    pub next: Option<String>,

    /// Field an `input` step collects
    #[serde(default)]
    pub field: Option<FieldType>,

    /// `confirm`: outcome targets
    #[serde(default)]
    pub confirm_next: Option<String>,
    #[serde(default)]
    pub deny_next: Option<String>,
    /// Fields a deny answer invalidates (only the relevant ones, never all)
    #[serde(default)]
    pub clear_on_deny: Vec<String>,

    /// `choice`/`intent`: branch name -> target step
    #[serde(default)]
    pub branches: HashMap<String, String>,
    /// Branch taken when nothing matches
    #[serde(default)]
    pub default_branch: Option<String>,
    /// `choice`: branch name -> keywords that select it
    #[serde(default)]
    pub keywords: HashMap<String, Vec<String>>,
}

impl Step {
    /// Localized text with sensible fallbacks: requested locale, Hindi, any.
    pub fn text_for(&self, locale: &str) -> &str {
        lookup_locale(&self.text, locale)
    }

    /// Localized retry text, falling back to the regular text
    pub fn retry_text_for(&self, locale: &str) -> &str {
        let retry = lookup_locale(&self.retry_text, locale);
        if retry.is_empty() {
            self.text_for(locale)
        } else {
            retry
        }
    }

    /// All step ids this step can transition to
    fn targets(&self) -> Vec<&String> {
        let mut out = Vec::new();
        out.extend(self.next.as_ref());
        out.extend(self.confirm_next.as_ref());
        out.extend(self.deny_next.as_ref());
        out.extend(self.branches.values());
        out
    }
}

fn lookup_locale<'a>(map: &'a HashMap<String, String>, locale: &str) -> &'a str {
    map.get(locale)
        .or_else(|| map.get("hi"))
        .or_else(|| map.values().next())
        .map(String::as_str)
        .unwrap_or("")
}

/// Per-flow intent definition feeding the classifier table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowIntentDef {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_intent_priority")]
    pub priority: u8,
}

fn default_intent_priority() -> u8 {
    5
}

/// A complete flow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraph {
    pub id: String,
    pub start_step: String,
    pub steps: HashMap<String, Step>,
    /// Flow-specific intents layered over the built-in interrupts
    #[serde(default)]
    pub intents: Vec<FlowIntentDef>,
    /// Explicit escalation target; defaults to the first `handoff` step
    #[serde(default)]
    pub handoff_step: Option<String>,
}

impl FlowGraph {
    /// Check structural invariants once at load time.
    ///
    /// Every non-terminal step's targets must resolve to an existing step,
    /// `input` steps must declare a field, and `confirm` steps need both
    /// outcome targets.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| DialogError::InvalidFlow {
            flow: self.id.clone(),
            reason,
        };

        if !self.steps.contains_key(&self.start_step) {
            return Err(invalid(format!("start step {:?} does not exist", self.start_step)));
        }
        if let Some(handoff) = &self.handoff_step {
            if !self.steps.contains_key(handoff) {
                return Err(invalid(format!("handoff step {handoff:?} does not exist")));
            }
        }

        for (id, step) in &self.steps {
            for target in step.targets() {
                if !self.steps.contains_key(target) {
                    return Err(invalid(format!("step {id:?} points at missing step {target:?}")));
                }
            }

            match step.kind {
                StepKind::Input if step.field.is_none() => {
                    return Err(invalid(format!("input step {id:?} declares no field")));
                }
                StepKind::Confirm if step.confirm_next.is_none() || step.deny_next.is_none() => {
                    return Err(invalid(format!("confirm step {id:?} is missing an outcome target")));
                }
                StepKind::Choice | StepKind::Intent => {
                    if step.branches.is_empty() {
                        return Err(invalid(format!("{:?} step {id:?} has no branches", step.kind)));
                    }
                    if let Some(default) = &step.default_branch {
                        if !step.branches.contains_key(default) {
                            return Err(invalid(format!(
                                "step {id:?} default branch {default:?} is not a branch"
                            )));
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn step(&self, id: &str) -> Result<&Step> {
        self.steps.get(id).ok_or_else(|| DialogError::UnknownStep {
            flow: self.id.clone(),
            step: id.to_string(),
        })
    }

    /// Escalation target: the declared handoff step, or the first step of
    /// kind `handoff` in id order so the choice is deterministic.
    pub fn handoff_step_id(&self) -> Option<&str> {
        if let Some(id) = &self.handoff_step {
            return Some(id);
        }
        let mut handoffs: Vec<&String> = self
            .steps
            .iter()
            .filter(|(_, s)| s.kind == StepKind::Handoff)
            .map(|(id, _)| id)
            .collect();
        handoffs.sort();
        handoffs.first().map(|s| s.as_str())
    }
}
