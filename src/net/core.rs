//! 运行时: 网容器、公共变更/查询接口与事件分发.
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::net::arc::{Arc, ArcDirection};
use crate::net::events::{EventBatch, NetEvent, NetObserver};
use crate::net::factory::{DefaultFactory, ElementFactory};
use crate::net::firing::{
    all_predecessors_marked, change_token_count, inverse_transition_tokens, transition_tokens,
};
use crate::net::ids::ElementId;
use crate::net::structure::{Coordinates, Node, NodeTable, Tokens};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("element identifier must not be empty")]
    EmptyId,
    #[error("coordinates ({x}, {y}) must not be negative")]
    NegativeCoordinate { x: i32, y: i32 },
    #[error("identifier {0} is already in use")]
    DuplicateId(ElementId),
    #[error("arc {arc} would connect {from} and {to}, which are both {kind}s")]
    SameKind {
        arc: ElementId,
        from: ElementId,
        to: ElementId,
        kind: &'static str,
    },
    #[error("arc endpoint {0} does not exist")]
    UnknownEndpoint(ElementId),
    #[error("arc {existing} already connects {from} to {to}")]
    ParallelArc {
        existing: ElementId,
        from: ElementId,
        to: ElementId,
    },
    #[error("place {place} cannot hold {count} tokens")]
    NegativeTokens { place: ElementId, count: i64 },
    #[error("place {place} has no token to give when firing {transition}")]
    InsufficientTokens {
        place: ElementId,
        transition: ElementId,
    },
    #[error("place {0} cannot take another token")]
    TokenOverflow(ElementId),
    #[error("transition {0} is not enabled")]
    TransitionDisabled(ElementId),
    #[error("unknown node {0}")]
    UnknownNode(ElementId),
    #[error("unknown arc {0}")]
    UnknownArc(ElementId),
    #[error("{0} is not a place")]
    NotAPlace(ElementId),
    #[error("{0} is not a transition")]
    NotATransition(ElementId),
    #[error("node {node} is not an endpoint of arc {arc}")]
    NotIncident { node: ElementId, arc: ElementId },
    #[error("element factory returned {produced} when asked for {expected} {requested}")]
    FactoryMismatch {
        requested: ElementId,
        expected: &'static str,
        produced: String,
    },
}

/// Coarse classification of [`NetError`] for callers that only branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    DuplicateId,
    InvalidStructure,
    InvalidState,
    UnknownId,
}

impl NetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::EmptyId
            | NetError::NegativeCoordinate { .. }
            | NetError::FactoryMismatch { .. } => ErrorKind::InvalidArgument,
            NetError::DuplicateId(_) => ErrorKind::DuplicateId,
            NetError::SameKind { .. }
            | NetError::UnknownEndpoint(_)
            | NetError::ParallelArc { .. } => ErrorKind::InvalidStructure,
            NetError::NegativeTokens { .. }
            | NetError::InsufficientTokens { .. }
            | NetError::TokenOverflow(_)
            | NetError::TransitionDisabled(_) => ErrorKind::InvalidState,
            NetError::UnknownNode(_)
            | NetError::UnknownArc(_)
            | NetError::NotAPlace(_)
            | NetError::NotATransition(_)
            | NetError::NotIncident { .. } => ErrorKind::UnknownId,
        }
    }
}

/// The net container: sole owner of every node and arc and sole emitter of events.
pub struct Net {
    pub(crate) nodes: NodeTable,
    pub(crate) arcs: IndexMap<ElementId, Arc>,
    factory: Box<dyn ElementFactory>,
    observers: Vec<Box<dyn NetObserver>>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("nodes", &self.nodes)
            .field("arcs", &self.arcs)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::new()
    }
}

impl Net {
    pub fn new() -> Self {
        Self::with_factory(Box::new(DefaultFactory))
    }

    pub fn with_factory(factory: Box<dyn ElementFactory>) -> Self {
        Self {
            nodes: NodeTable::new(),
            arcs: IndexMap::new(),
            factory,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl NetObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn dispatch(&mut self, events: EventBatch) {
        for event in &events {
            log::trace!("event {:?}", event);
            for observer in self.observers.iter_mut() {
                observer.notify(event);
            }
        }
    }

    fn fresh_id(&self, raw: &str) -> Result<ElementId, NetError> {
        let id = ElementId::new(raw)?;
        if self.contains(raw) {
            return Err(NetError::DuplicateId(id));
        }
        Ok(id)
    }

    pub fn add_place(&mut self, x: i32, y: i32, id: &str) -> Result<(), NetError> {
        let id = self.fresh_id(id)?;
        let place = self.factory.place(id.clone(), x, y)?;
        check_factory_node(&id, "place", &place)?;
        log::debug!("add place {} at ({}, {})", id, x, y);
        self.nodes.insert(id, place);
        Ok(())
    }

    pub fn add_transition(&mut self, x: i32, y: i32, id: &str) -> Result<(), NetError> {
        let id = self.fresh_id(id)?;
        let transition = self.factory.transition(id.clone(), x, y)?;
        check_factory_node(&id, "transition", &transition)?;
        log::debug!("add transition {} at ({}, {})", id, x, y);
        self.nodes.insert(id, transition);
        Ok(())
    }

    pub fn add_arc(&mut self, source: &str, target: &str, id: &str) -> Result<(), NetError> {
        let id = self.fresh_id(id)?;
        let from = self
            .nodes
            .get(source)
            .ok_or_else(|| NetError::UnknownEndpoint(unchecked_id(source)))?;
        let to = self
            .nodes
            .get(target)
            .ok_or_else(|| NetError::UnknownEndpoint(unchecked_id(target)))?;
        if let Some(existing) = self.arc_between(source, target) {
            return Err(NetError::ParallelArc {
                existing,
                from: from.id().clone(),
                to: to.id().clone(),
            });
        }
        let arc = self.factory.arc(id.clone(), from, to)?;
        let direction = if from.is_place() {
            ArcDirection::PlaceToTransition
        } else {
            ArcDirection::TransitionToPlace
        };
        if arc.id() != &id
            || arc.source() != from.id()
            || arc.target() != to.id()
            || arc.direction() != direction
        {
            return Err(NetError::FactoryMismatch {
                requested: id,
                expected: "arc",
                produced: format!("arc {} from {} to {}", arc.id(), arc.source(), arc.target()),
            });
        }
        let events = arc.attach(&mut self.nodes)?;
        self.arcs.insert(id, arc);
        self.dispatch(events);
        Ok(())
    }

    /// Removes a node together with its incident arcs. Absent ids are ignored.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        for arc in node.arc_list() {
            self.remove_arc(arc.as_str());
        }
        log::debug!("remove node {}", id);
        self.nodes.shift_remove(id).is_some()
    }

    /// Removes an arc. Absent ids are ignored.
    pub fn remove_arc(&mut self, id: &str) -> bool {
        let Some(arc) = self.arcs.shift_remove(id) else {
            return false;
        };
        let events = arc.detach(&mut self.nodes);
        self.dispatch(events);
        true
    }

    pub fn change_name(&mut self, id: &str, name: &str) -> Result<(), NetError> {
        self.node_mut(id)?.set_name(name);
        Ok(())
    }

    pub fn change_position(&mut self, id: &str, x: i32, y: i32) -> Result<(), NetError> {
        let position = Coordinates::new(x, y)?;
        self.node_mut(id)?.set_position(position);
        Ok(())
    }

    pub fn change_tokens(&mut self, id: &str, count: i64) -> Result<(), NetError> {
        let node = self.node(id)?;
        let current = node
            .tokens()
            .ok_or_else(|| NetError::NotAPlace(node.id().clone()))?;
        let place = node.id().clone();
        let count = Tokens::try_from(count).map_err(|_| NetError::NegativeTokens {
            place: place.clone(),
            count,
        })?;
        if count == current {
            return Ok(());
        }
        log::debug!("place {} tokens {} -> {}", place, current, count);
        let mut events = change_token_count(&mut self.nodes, &place, count);
        events.push(NetEvent::TokensChanged {
            id: place,
            tokens: count,
        });
        self.dispatch(events);
        Ok(())
    }

    pub fn perform_transition(&mut self, id: &str) -> Result<(), NetError> {
        let transition = self.node(id)?.id().clone();
        let events = transition_tokens(&mut self.nodes, &transition)?;
        self.dispatch(events);
        Ok(())
    }

    pub fn inverse_transition(&mut self, id: &str) -> Result<(), NetError> {
        let transition = self.node(id)?.id().clone();
        let events = inverse_transition_tokens(&mut self.nodes, &transition)?;
        self.dispatch(events);
        Ok(())
    }

    /// Drops every node and arc. Observers stay registered.
    pub fn reinitialize(&mut self) {
        log::debug!(
            "reinitialize: dropping {} nodes and {} arcs",
            self.nodes.len(),
            self.arcs.len()
        );
        self.nodes.clear();
        self.arcs.clear();
    }

    pub fn node(&self, id: &str) -> Result<&Node, NetError> {
        self.nodes
            .get(id)
            .ok_or_else(|| NetError::UnknownNode(unchecked_id(id)))
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, NetError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| NetError::UnknownNode(unchecked_id(id)))
    }

    pub fn arc(&self, id: &str) -> Result<&Arc, NetError> {
        self.arcs
            .get(id)
            .ok_or_else(|| NetError::UnknownArc(unchecked_id(id)))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.values()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.is_node(id) || self.is_arc(id)
    }

    pub fn is_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_arc(&self, id: &str) -> bool {
        self.arcs.contains_key(id)
    }

    pub fn is_place(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(Node::is_place)
    }

    pub fn is_source(&self, arc: &str, node: &str) -> Result<bool, NetError> {
        Ok(self.arc(arc)?.source() == node)
    }

    pub fn coordinates(&self, id: &str) -> Result<Coordinates, NetError> {
        Ok(self.node(id)?.position())
    }

    pub fn name(&self, id: &str) -> Result<&str, NetError> {
        Ok(self.node(id)?.name())
    }

    pub fn token_count(&self, id: &str) -> Result<Tokens, NetError> {
        let node = self.node(id)?;
        node.tokens()
            .ok_or_else(|| NetError::NotAPlace(node.id().clone()))
    }

    pub fn state(&self, id: &str) -> Result<bool, NetError> {
        let node = self.node(id)?;
        node.enabled()
            .ok_or_else(|| NetError::NotATransition(node.id().clone()))
    }

    pub fn arcs_for_node(&self, id: &str) -> Result<Vec<ElementId>, NetError> {
        Ok(self.node(id)?.arc_list())
    }

    /// Arcs ending at `id`, in attach order.
    pub fn incoming_arcs(&self, id: &str) -> Result<Vec<ElementId>, NetError> {
        self.incident_arcs(id, |arc, node| arc.target() == node)
    }

    /// Arcs starting at `id`, in attach order.
    pub fn outgoing_arcs(&self, id: &str) -> Result<Vec<ElementId>, NetError> {
        self.incident_arcs(id, |arc, node| arc.source() == node)
    }

    fn incident_arcs(
        &self,
        id: &str,
        keep: impl Fn(&Arc, &str) -> bool,
    ) -> Result<Vec<ElementId>, NetError> {
        let node = self.node(id)?;
        Ok(node
            .arcs()
            .filter_map(|arc| self.arcs.get(arc))
            .filter(|arc| keep(*arc, id))
            .map(|arc| arc.id().clone())
            .collect())
    }

    /// `(source, target)` of an arc.
    pub fn nodes_for_arc(&self, id: &str) -> Result<(ElementId, ElementId), NetError> {
        let arc = self.arc(id)?;
        Ok((arc.source().clone(), arc.target().clone()))
    }

    pub fn connected_node(&self, node: &str, arc: &str) -> Result<ElementId, NetError> {
        self.node(node)?;
        let found = self.arc(arc)?;
        found
            .other_end(node)
            .cloned()
            .ok_or_else(|| NetError::NotIncident {
                node: unchecked_id(node),
                arc: found.id().clone(),
            })
    }

    pub fn arc_between(&self, source: &str, target: &str) -> Option<ElementId> {
        let node = self.nodes.get(source)?;
        node.arcs()
            .filter_map(|arc| self.arcs.get(arc))
            .find(|arc| arc.source() == source && arc.target() == target)
            .map(|arc| arc.id().clone())
    }

    pub fn places_len(&self) -> usize {
        self.nodes.values().filter(|node| node.is_place()).count()
    }

    pub fn transitions_len(&self) -> usize {
        self.nodes.values().filter(|node| node.is_transition()).count()
    }

    pub fn arcs_len(&self) -> usize {
        self.arcs.len()
    }

    pub fn node_ids(&self) -> Vec<ElementId> {
        self.nodes.keys().cloned().collect()
    }

    pub fn arc_ids(&self) -> Vec<ElementId> {
        self.arcs.keys().cloned().collect()
    }

    pub fn enabled_transitions(&self) -> Vec<ElementId> {
        self.nodes
            .values()
            .filter(|node| node.enabled() == Some(true))
            .map(|node| node.id().clone())
            .collect()
    }

    pub fn marking(&self) -> IndexMap<ElementId, Tokens> {
        self.nodes
            .values()
            .filter_map(|node| node.tokens().map(|tokens| (node.id().clone(), tokens)))
            .collect()
    }

    /// 全量重算使能规则，返回存储状态与规则不一致的迁移（正常情况下为空）。
    pub fn verify_enablement(&self) -> Vec<ElementId> {
        self.nodes
            .values()
            .filter(|node| {
                node.enabled()
                    .is_some_and(|enabled| enabled != all_predecessors_marked(&self.nodes, node.id()))
            })
            .map(|node| node.id().clone())
            .collect()
    }
}

/// A factory product must be a bare node of the requested kind under the requested id.
/// Without inputs a transition has to start enabled.
fn check_factory_node(
    requested: &ElementId,
    expected: &'static str,
    node: &Node,
) -> Result<(), NetError> {
    let bare = node.arcs().next().is_none()
        && node.predecessors().next().is_none()
        && node.successors().next().is_none();
    if node.id() != requested
        || node.kind().label() != expected
        || !bare
        || node.enabled() == Some(false)
    {
        return Err(NetError::FactoryMismatch {
            requested: requested.clone(),
            expected,
            produced: format!("{} {}", node.kind().label(), node.id()),
        });
    }
    Ok(())
}

fn unchecked_id(raw: &str) -> ElementId {
    ElementId::unchecked(raw)
}
