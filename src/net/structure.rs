//! P/T 网静态结构元素：节点公共部分（坐标、名称、邻接关系）与库所/迁移两种变体。
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::net::core::NetError;
use crate::net::ids::ElementId;

pub type Tokens = u64;

/// 引擎持有的节点表，按标识符索引。
pub(crate) type NodeTable = IndexMap<ElementId, Node>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u32,
    pub y: u32,
}

impl Coordinates {
    /// Validates a signed coordinate pair coming from the caller layer.
    pub fn new(x: i32, y: i32) -> Result<Self, NetError> {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => Ok(Self { x, y }),
            _ => Err(NetError::NegativeCoordinate { x, y }),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fields shared by places and transitions.
#[derive(Debug, Clone)]
pub struct NodeCore {
    id: ElementId,
    position: Coordinates,
    name: String,
    predecessors: IndexSet<ElementId>,
    successors: IndexSet<ElementId>,
    arcs: IndexSet<ElementId>,
}

impl NodeCore {
    fn new(id: ElementId, position: Coordinates) -> Self {
        Self {
            id,
            position,
            name: String::new(),
            predecessors: IndexSet::new(),
            successors: IndexSet::new(),
            arcs: IndexSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Place { tokens: Tokens },
    Transition { enabled: bool },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Place { .. } => "place",
            NodeKind::Transition { .. } => "transition",
        }
    }

    pub fn same_variant(&self, other: &NodeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Clone)]
pub struct Node {
    core: NodeCore,
    kind: NodeKind,
}

impl Node {
    pub fn place(id: ElementId, x: i32, y: i32) -> Result<Self, NetError> {
        Self::place_with_tokens(id, x, y, 0)
    }

    pub fn place_with_tokens(
        id: ElementId,
        x: i32,
        y: i32,
        tokens: Tokens,
    ) -> Result<Self, NetError> {
        Ok(Self {
            core: NodeCore::new(id, Coordinates::new(x, y)?),
            kind: NodeKind::Place { tokens },
        })
    }

    /// 新建迁移没有前驱，因此默认可发生。
    pub fn transition(id: ElementId, x: i32, y: i32) -> Result<Self, NetError> {
        Ok(Self {
            core: NodeCore::new(id, Coordinates::new(x, y)?),
            kind: NodeKind::Transition { enabled: true },
        })
    }

    pub fn id(&self) -> &ElementId {
        &self.core.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_place(&self) -> bool {
        matches!(self.kind, NodeKind::Place { .. })
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.kind, NodeKind::Transition { .. })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.core.name = name.into();
    }

    pub fn position(&self) -> Coordinates {
        self.core.position
    }

    pub fn set_position(&mut self, position: Coordinates) {
        self.core.position = position;
    }

    /// Token count, `None` for transitions.
    pub fn tokens(&self) -> Option<Tokens> {
        match self.kind {
            NodeKind::Place { tokens } => Some(tokens),
            NodeKind::Transition { .. } => None,
        }
    }

    /// Enabled flag, `None` for places.
    pub fn enabled(&self) -> Option<bool> {
        match self.kind {
            NodeKind::Transition { enabled } => Some(enabled),
            NodeKind::Place { .. } => None,
        }
    }

    pub(crate) fn set_tokens(&mut self, count: Tokens) {
        if let NodeKind::Place { tokens } = &mut self.kind {
            *tokens = count;
        }
    }

    pub(crate) fn set_enabled(&mut self, value: bool) {
        if let NodeKind::Transition { enabled } = &mut self.kind {
            *enabled = value;
        }
    }

    pub fn predecessors(&self) -> impl Iterator<Item = &ElementId> {
        self.core.predecessors.iter()
    }

    pub fn successors(&self) -> impl Iterator<Item = &ElementId> {
        self.core.successors.iter()
    }

    pub fn has_predecessors(&self) -> bool {
        !self.core.predecessors.is_empty()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &ElementId> {
        self.core.arcs.iter()
    }

    /// Snapshot of the incident arcs in attach order.
    pub fn arc_list(&self) -> Vec<ElementId> {
        self.core.arcs.iter().cloned().collect()
    }

    pub fn add_arc(&mut self, arc: &ElementId) {
        if !self.core.arcs.contains(arc) {
            self.core.arcs.insert(arc.clone());
        }
    }

    pub fn remove_arc(&mut self, arc: &ElementId) -> bool {
        self.core.arcs.shift_remove(arc)
    }

    pub fn add_predecessor(&mut self, node: &ElementId) {
        if !self.core.predecessors.contains(node) {
            self.core.predecessors.insert(node.clone());
        }
    }

    pub fn remove_predecessor(&mut self, node: &ElementId) -> bool {
        self.core.predecessors.shift_remove(node)
    }

    pub fn add_successor(&mut self, node: &ElementId) {
        if !self.core.successors.contains(node) {
            self.core.successors.insert(node.clone());
        }
    }

    pub fn remove_successor(&mut self, node: &ElementId) -> bool {
        self.core.successors.shift_remove(node)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.core.id == other.core.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.core.id)
            .field("kind", &self.kind)
            .field("position", &self.core.position)
            .field("predecessors", &self.core.predecessors)
            .field("successors", &self.core.successors)
            .finish()
    }
}
