//! 变更通知：迁移使能翻转与库所令牌数变化。
use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::ElementId;
use crate::net::structure::Tokens;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NetEvent {
    TransitionStateChanged { id: ElementId, enabled: bool },
    TokensChanged { id: ElementId, tokens: Tokens },
}

impl NetEvent {
    pub fn id(&self) -> &ElementId {
        match self {
            NetEvent::TransitionStateChanged { id, .. } | NetEvent::TokensChanged { id, .. } => id,
        }
    }
}

/// Events produced by one low-level mutation, in emission order.
pub type EventBatch = SmallVec<[NetEvent; 4]>;

/// Receives every event the engine raises, synchronously.
pub trait NetObserver {
    fn notify(&mut self, event: &NetEvent);
}

impl<F> NetObserver for F
where
    F: FnMut(&NetEvent),
{
    fn notify(&mut self, event: &NetEvent) {
        (*self)(event)
    }
}

/// Shared event log; clones observe the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<NetEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<NetEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn state_changes(&self) -> Vec<(ElementId, bool)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                NetEvent::TransitionStateChanged { id, enabled } => Some((id.clone(), *enabled)),
                NetEvent::TokensChanged { .. } => None,
            })
            .collect()
    }

    pub fn token_changes(&self) -> Vec<(ElementId, Tokens)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                NetEvent::TokensChanged { id, tokens } => Some((id.clone(), *tokens)),
                NetEvent::TransitionStateChanged { .. } => None,
            })
            .collect()
    }
}

impl NetObserver for EventRecorder {
    fn notify(&mut self, event: &NetEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
