//! 弧：连接一个库所与一个迁移的有向边，负责挂接/摘除时的邻接维护与一次性使能检查。
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::net::core::NetError;
use crate::net::events::{EventBatch, NetEvent};
use crate::net::firing::all_predecessors_marked;
use crate::net::ids::ElementId;
use crate::net::structure::{Node, NodeTable};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

#[derive(Clone)]
pub struct Arc {
    id: ElementId,
    source: ElementId,
    target: ElementId,
    direction: ArcDirection,
}

impl Arc {
    /// Builds an arc between two existing nodes of different variants.
    pub fn new(id: ElementId, source: &Node, target: &Node) -> Result<Self, NetError> {
        if source.kind().same_variant(target.kind()) {
            return Err(NetError::SameKind {
                arc: id,
                from: source.id().clone(),
                to: target.id().clone(),
                kind: source.kind().label(),
            });
        }
        let direction = if source.is_place() {
            ArcDirection::PlaceToTransition
        } else {
            ArcDirection::TransitionToPlace
        };
        Ok(Self {
            id,
            source: source.id().clone(),
            target: target.id().clone(),
            direction,
        })
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub fn source(&self) -> &ElementId {
        &self.source
    }

    pub fn target(&self) -> &ElementId {
        &self.target
    }

    pub fn direction(&self) -> ArcDirection {
        self.direction
    }

    pub fn place(&self) -> &ElementId {
        match self.direction {
            ArcDirection::PlaceToTransition => &self.source,
            ArcDirection::TransitionToPlace => &self.target,
        }
    }

    pub fn transition(&self) -> &ElementId {
        match self.direction {
            ArcDirection::PlaceToTransition => &self.target,
            ArcDirection::TransitionToPlace => &self.source,
        }
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint at all.
    pub fn other_end(&self, node: &str) -> Option<&ElementId> {
        if self.source == node {
            Some(&self.target)
        } else if self.target == node {
            Some(&self.source)
        } else {
            None
        }
    }

    /// 挂接到两个端点。零令牌的前驱库所只会收紧目标迁移的使能条件。
    pub(crate) fn attach(&self, nodes: &mut NodeTable) -> Result<EventBatch, NetError> {
        if !nodes.contains_key(&self.source) {
            return Err(NetError::UnknownEndpoint(self.source.clone()));
        }
        if !nodes.contains_key(&self.target) {
            return Err(NetError::UnknownEndpoint(self.target.clone()));
        }

        let mut source_tokens = None;
        if let Some(source) = nodes.get_mut(&self.source) {
            source.add_successor(&self.target);
            source.add_arc(&self.id);
            source_tokens = source.tokens();
        }

        let mut events = EventBatch::new();
        if let Some(target) = nodes.get_mut(&self.target) {
            target.add_predecessor(&self.source);
            target.add_arc(&self.id);
            if source_tokens == Some(0) && target.enabled() == Some(true) {
                target.set_enabled(false);
                events.push(NetEvent::TransitionStateChanged {
                    id: self.target.clone(),
                    enabled: false,
                });
            }
        }
        log::debug!("arc {} attached: {} -> {}", self.id, self.source, self.target);
        Ok(events)
    }

    /// 从两个端点摘除。移除零令牌前驱后，若剩余前驱全部有令牌则重新使能。
    /// 迁移到库所的弧不影响任何使能状态，不做检查。
    pub(crate) fn detach(&self, nodes: &mut NodeTable) -> EventBatch {
        let mut source_tokens = None;
        if let Some(source) = nodes.get_mut(&self.source) {
            source.remove_successor(&self.target);
            source.remove_arc(&self.id);
            source_tokens = source.tokens();
        }

        let mut recheck = false;
        if let Some(target) = nodes.get_mut(&self.target) {
            target.remove_predecessor(&self.source);
            target.remove_arc(&self.id);
            recheck = source_tokens == Some(0) && target.enabled() == Some(false);
        }

        let mut events = EventBatch::new();
        if recheck && all_predecessors_marked(nodes, &self.target) {
            if let Some(target) = nodes.get_mut(&self.target) {
                target.set_enabled(true);
            }
            events.push(NetEvent::TransitionStateChanged {
                id: self.target.clone(),
                enabled: true,
            });
        }
        log::debug!("arc {} detached: {} -> {}", self.id, self.source, self.target);
        events
    }
}

impl PartialEq for Arc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Arc {}

impl Hash for Arc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arc")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("direction", &self.direction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ElementId {
        ElementId::new(raw).unwrap()
    }

    fn table(nodes: Vec<Node>) -> NodeTable {
        nodes.into_iter().map(|node| (node.id().clone(), node)).collect()
    }

    #[test]
    fn same_variant_endpoints_are_rejected() {
        let p0 = Node::place(id("p0"), 0, 0).unwrap();
        let p1 = Node::place(id("p1"), 0, 0).unwrap();
        let err = Arc::new(id("a"), &p0, &p1).unwrap_err();
        assert!(matches!(err, NetError::SameKind { kind: "place", .. }));
    }

    #[test]
    fn direction_follows_the_place_endpoint() {
        let p = Node::place(id("p"), 0, 0).unwrap();
        let t = Node::transition(id("t"), 0, 0).unwrap();
        let consuming = Arc::new(id("a0"), &p, &t).unwrap();
        let producing = Arc::new(id("a1"), &t, &p).unwrap();

        assert_eq!(consuming.direction(), ArcDirection::PlaceToTransition);
        assert_eq!(producing.direction(), ArcDirection::TransitionToPlace);
        assert_eq!(producing.place(), &id("p"));
        assert_eq!(producing.transition(), &id("t"));
        assert_eq!(consuming.other_end("t"), Some(&id("p")));
        assert_eq!(consuming.other_end("x"), None);
    }

    #[test]
    fn attaching_empty_place_disables_transition() {
        let p = Node::place(id("p"), 0, 0).unwrap();
        let t = Node::transition(id("t"), 0, 0).unwrap();
        let arc = Arc::new(id("a"), &p, &t).unwrap();
        let mut nodes = table(vec![p, t]);

        let events = arc.attach(&mut nodes).unwrap();
        assert_eq!(
            events.as_slice(),
            &[NetEvent::TransitionStateChanged {
                id: id("t"),
                enabled: false
            }]
        );
        assert_eq!(nodes["t"].enabled(), Some(false));
        assert_eq!(nodes["p"].successors().collect::<Vec<_>>(), vec![&id("t")]);
        assert_eq!(nodes["t"].arc_list(), vec![id("a")]);
    }

    #[test]
    fn attaching_marked_place_changes_nothing() {
        let p = Node::place_with_tokens(id("p"), 0, 0, 1).unwrap();
        let t = Node::transition(id("t"), 0, 0).unwrap();
        let arc = Arc::new(id("a"), &p, &t).unwrap();
        let mut nodes = table(vec![p, t]);

        assert!(arc.attach(&mut nodes).unwrap().is_empty());
        assert_eq!(nodes["t"].enabled(), Some(true));
    }

    #[test]
    fn detaching_last_empty_predecessor_reenables() {
        let p0 = Node::place(id("p0"), 0, 0).unwrap();
        let p1 = Node::place_with_tokens(id("p1"), 0, 0, 2).unwrap();
        let t = Node::transition(id("t"), 0, 0).unwrap();
        let a0 = Arc::new(id("a0"), &p0, &t).unwrap();
        let a1 = Arc::new(id("a1"), &p1, &t).unwrap();
        let mut nodes = table(vec![p0, p1, t]);
        a0.attach(&mut nodes).unwrap();
        a1.attach(&mut nodes).unwrap();

        let events = a0.detach(&mut nodes);
        assert_eq!(events.len(), 1);
        assert_eq!(nodes["t"].enabled(), Some(true));
        assert!(nodes["p0"].arc_list().is_empty());
    }

    #[test]
    fn detaching_keeps_disabled_when_another_empty_predecessor_remains() {
        let p0 = Node::place(id("p0"), 0, 0).unwrap();
        let p1 = Node::place(id("p1"), 0, 0).unwrap();
        let t = Node::transition(id("t"), 0, 0).unwrap();
        let a0 = Arc::new(id("a0"), &p0, &t).unwrap();
        let a1 = Arc::new(id("a1"), &p1, &t).unwrap();
        let mut nodes = table(vec![p0, p1, t]);
        a0.attach(&mut nodes).unwrap();
        a1.attach(&mut nodes).unwrap();

        assert!(a0.detach(&mut nodes).is_empty());
        assert_eq!(nodes["t"].enabled(), Some(false));
    }

    #[test]
    fn detaching_producing_arc_never_rechecks() {
        let p = Node::place(id("p"), 0, 0).unwrap();
        let t = Node::transition(id("t"), 0, 0).unwrap();
        let arc = Arc::new(id("a"), &t, &p).unwrap();
        let mut nodes = table(vec![p, t]);
        assert!(arc.attach(&mut nodes).unwrap().is_empty());
        assert!(arc.detach(&mut nodes).is_empty());
        assert_eq!(nodes["t"].enabled(), Some(true));
        assert!(nodes["p"].predecessors().next().is_none());
    }
}
