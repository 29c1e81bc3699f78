//! 元素构造器：引擎通过注入的工厂创建库所、迁移与弧，便于测试替换。
use crate::net::arc::Arc;
use crate::net::core::NetError;
use crate::net::ids::ElementId;
use crate::net::structure::Node;

/// Builds the elements the engine inserts into its tables.
///
/// Every method has a default that applies the standard construction checks,
/// so a substitute only overrides what it needs.
pub trait ElementFactory {
    fn place(&self, id: ElementId, x: i32, y: i32) -> Result<Node, NetError> {
        Node::place(id, x, y)
    }

    fn transition(&self, id: ElementId, x: i32, y: i32) -> Result<Node, NetError> {
        Node::transition(id, x, y)
    }

    fn arc(&self, id: ElementId, source: &Node, target: &Node) -> Result<Arc, NetError> {
        Arc::new(id, source, target)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactory;

impl ElementFactory for DefaultFactory {}
