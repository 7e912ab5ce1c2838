//! Collaboration context store.
//!
//! Shared design state keyed by component name, plus a turn-based mailbox
//! between specialists. The store is a cheap clonable handle; clones share
//! the same state. Consumers poll and clear, nothing blocks.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Readiness of one side of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessFlag {
    Markup,
    Logic,
    Style,
    Schema,
}

/// Shared design state for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentContext {
    pub name: String,

    /// Variables the markup expects the logic to provide
    pub variables: Vec<String>,

    /// Tags/helpers used by the markup
    pub tags: Vec<String>,

    /// Named structural fragments (partials, blocks)
    pub fragments: Vec<String>,

    /// Sides that have declared themselves ready
    pub ready: BTreeSet<ReadinessFlag>,

    /// Free-form shared values
    pub shared: BTreeMap<String, Value>,

    pub updated_at: DateTime<Utc>,
}

impl ComponentContext {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variables: Vec::new(),
            tags: Vec::new(),
            fragments: Vec::new(),
            ready: BTreeSet::new(),
            shared: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Partial update for a [`ComponentContext`]; `None` fields are untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextPatch {
    pub variables: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub fragments: Option<Vec<String>>,
    pub shared: Option<BTreeMap<String, Value>>,
}

/// Addressee of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipient {
    Agent(String),
    All,
}

impl Recipient {
    pub fn agent(name: impl Into<String>) -> Self {
        Self::Agent(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
    Update,
    Error,
}

/// A mailbox entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: Recipient,
    pub kind: MessageKind,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(from: impl Into<String>, to: Recipient, kind: MessageKind, payload: Value) -> Self {
        Self { from: from.into(), to, kind, payload, timestamp: Utc::now() }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    contexts: BTreeMap<String, ComponentContext>,
    mailbox: Vec<Message>,
}

/// Handle to the shared collaboration state.
#[derive(Debug, Clone, Default)]
pub struct CollaborationStore {
    inner: Arc<Mutex<StoreState>>,
}

impl CollaborationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the context for `name` if absent and return a snapshot.
    pub fn create(&self, name: &str) -> ComponentContext {
        let mut state = self.inner.lock();
        state.contexts.entry(name.to_string()).or_insert_with(|| ComponentContext::new(name)).clone()
    }

    /// Snapshot of the context for `name`.
    pub fn get(&self, name: &str) -> Option<ComponentContext> {
        self.inner.lock().contexts.get(name).cloned()
    }

    /// Names of all known components.
    pub fn components(&self) -> Vec<String> {
        self.inner.lock().contexts.keys().cloned().collect()
    }

    /// Apply a partial update, creating the context if needed.
    pub fn update(&self, name: &str, patch: ContextPatch) -> ComponentContext {
        self.with_context(name, |ctx| {
            if let Some(variables) = patch.variables {
                ctx.variables = variables;
            }
            if let Some(tags) = patch.tags {
                ctx.tags = tags;
            }
            if let Some(fragments) = patch.fragments {
                ctx.fragments = fragments;
            }
            if let Some(shared) = patch.shared {
                ctx.shared.extend(shared);
            }
        })
    }

    pub fn register_variable(&self, name: &str, variable: &str) {
        self.with_context(name, |ctx| push_unique(&mut ctx.variables, variable));
    }

    pub fn register_tag(&self, name: &str, tag: &str) {
        self.with_context(name, |ctx| push_unique(&mut ctx.tags, tag));
    }

    pub fn register_fragment(&self, name: &str, fragment: &str) {
        self.with_context(name, |ctx| push_unique(&mut ctx.fragments, fragment));
    }

    pub fn set_ready(&self, name: &str, flag: ReadinessFlag) {
        self.with_context(name, |ctx| {
            ctx.ready.insert(flag);
        });
    }

    pub fn is_ready(&self, name: &str, flag: ReadinessFlag) -> bool {
        self.inner.lock().contexts.get(name).is_some_and(|ctx| ctx.ready.contains(&flag))
    }

    /// Queue a message.
    pub fn send(&self, message: Message) {
        tracing::debug!(from = %message.from, kind = ?message.kind, "Collaboration message queued");
        self.inner.lock().mailbox.push(message);
    }

    /// Messages addressed to `agent` plus broadcasts, in send order.
    pub fn receive(&self, agent: &str) -> Vec<Message> {
        self.inner
            .lock()
            .mailbox
            .iter()
            .filter(|m| match &m.to {
                Recipient::Agent(name) => name == agent,
                Recipient::All => true,
            })
            .cloned()
            .collect()
    }

    /// Drop messages addressed exactly to `recipient`.
    ///
    /// Clearing an agent leaves broadcasts in place; clearing
    /// [`Recipient::All`] removes only broadcasts.
    pub fn clear(&self, recipient: &Recipient) {
        self.inner.lock().mailbox.retain(|m| &m.to != recipient);
    }

    fn with_context(
        &self,
        name: &str,
        apply: impl FnOnce(&mut ComponentContext),
    ) -> ComponentContext {
        let mut state = self.inner.lock();
        let ctx = state.contexts.entry(name.to_string()).or_insert_with(|| ComponentContext::new(name));
        apply(ctx);
        ctx.updated_at = Utc::now();
        ctx.clone()
    }
}

fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}
