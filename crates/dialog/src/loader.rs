//! Flow loading and DID resolution
//!
//! Flows are JSON documents in a directory, one file per flow, loaded and
//! validated once at startup. Callers resolve a flow either by id or by the
//! dialed number (DID); the cache is owned here, not by the controller.

use dashmap::DashMap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DialogError, Result};
use crate::graph::FlowGraph;

/// Read access to loaded flow graphs
pub trait FlowRepository: Send + Sync {
    /// Fetch a flow by id
    fn get(&self, flow_id: &str) -> Option<Arc<FlowGraph>>;

    /// Resolve the flow for a dialed number, falling back to the configured
    /// default. `None` means even the default is missing, a setup error
    /// that must terminate the call.
    fn resolve_did(&self, called_number: &str) -> Option<Arc<FlowGraph>>;
}

/// Directory-backed flow store
pub struct FlowStore {
    flows: DashMap<String, Arc<FlowGraph>>,
    did_map: HashMap<String, String>,
    default_flow: String,
}

impl FlowStore {
    /// Load and validate every `*.json` flow in a directory.
    pub fn load_dir(
        dir: &Path,
        did_map: HashMap<String, String>,
        default_flow: impl Into<String>,
    ) -> Result<Self> {
        let store = Self {
            flows: DashMap::new(),
            did_map,
            default_flow: default_flow.into(),
        };

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)?;
            let flow: FlowGraph = serde_json::from_str(&raw)?;
            flow.validate()?;

            tracing::info!(flow_id = %flow.id, path = %path.display(), steps = flow.steps.len(), "loaded flow");
            store.flows.insert(flow.id.clone(), Arc::new(flow));
        }

        if store.flows.is_empty() {
            return Err(DialogError::InvalidFlow {
                flow: String::new(),
                reason: format!("no flow documents found in {}", dir.display()),
            });
        }

        Ok(store)
    }

    /// Build a store from already-parsed flows (tests, embedded defaults)
    pub fn from_flows(
        flows: Vec<FlowGraph>,
        did_map: HashMap<String, String>,
        default_flow: impl Into<String>,
    ) -> Result<Self> {
        let store = Self {
            flows: DashMap::new(),
            did_map,
            default_flow: default_flow.into(),
        };
        for flow in flows {
            flow.validate()?;
            store.flows.insert(flow.id.clone(), Arc::new(flow));
        }
        Ok(store)
    }

    pub fn flow_ids(&self) -> Vec<String> {
        self.flows.iter().map(|e| e.key().clone()).collect()
    }
}

impl FlowRepository for FlowStore {
    fn get(&self, flow_id: &str) -> Option<Arc<FlowGraph>> {
        self.flows.get(flow_id).map(|e| e.value().clone())
    }

    fn resolve_did(&self, called_number: &str) -> Option<Arc<FlowGraph>> {
        let flow_id = self
            .did_map
            .get(called_number)
            .map(String::as_str)
            .unwrap_or(&self.default_flow);

        let resolved = self.get(flow_id);
        if resolved.is_none() {
            tracing::warn!(called_number, flow_id, "no flow resolvable for dialed number");
        }
        resolved
    }
}
