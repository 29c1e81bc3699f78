//! 令牌语义：库所令牌变更的增量使能传播，以及迁移的发生与逆发生。
//!
//! 使能规则：迁移 `t` 可发生当且仅当 `∀p ∈ •t: M[p] > 0`（无前驱时恒成立）。
//! 每次单个库所的令牌数变化后只重新检查该库所的后继迁移，且仅在使能状态
//! 真正翻转时产生事件。
use crate::net::core::NetError;
use crate::net::events::{EventBatch, NetEvent};
use crate::net::ids::ElementId;
use crate::net::structure::{NodeTable, Tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Consume,
    Produce,
}

/// Whether every predecessor of `transition` currently holds a token.
pub(crate) fn all_predecessors_marked(nodes: &NodeTable, transition: &ElementId) -> bool {
    let Some(node) = nodes.get(transition) else {
        return false;
    };
    node.predecessors().all(|place| {
        nodes
            .get(place)
            .and_then(|node| node.tokens())
            .is_some_and(|tokens| tokens > 0)
    })
}

/// Sets the token count of `place` and flips the successor transitions whose
/// enablement depends on it crossing zero.
pub(crate) fn change_token_count(
    nodes: &mut NodeTable,
    place: &ElementId,
    count: Tokens,
) -> EventBatch {
    let mut events = EventBatch::new();
    let successors = match nodes.get_mut(place) {
        Some(node) => {
            node.set_tokens(count);
            node.successors().cloned().collect::<Vec<_>>()
        }
        None => return events,
    };

    let activating = count != 0;
    for transition in successors {
        let Some(enabled) = nodes.get(&transition).and_then(|node| node.enabled()) else {
            continue;
        };
        // 同一原因不可能再翻转
        if enabled == activating {
            continue;
        }
        if activating && !all_predecessors_marked(nodes, &transition) {
            continue;
        }
        if let Some(node) = nodes.get_mut(&transition) {
            node.set_enabled(activating);
        }
        events.push(NetEvent::TransitionStateChanged {
            id: transition,
            enabled: activating,
        });
    }
    events
}

/// 正向发生：先消耗全部前驱库所的令牌，再向全部后继库所产生令牌。
pub(crate) fn transition_tokens(
    nodes: &mut NodeTable,
    transition: &ElementId,
) -> Result<EventBatch, NetError> {
    let (predecessors, successors) = adjacent_places(nodes, transition)?;
    if nodes.get(transition).and_then(|node| node.enabled()) == Some(false) {
        return Err(NetError::TransitionDisabled(transition.clone()));
    }
    ensure_feasible(nodes, transition, &predecessors, &successors)?;

    let mut events = EventBatch::new();
    for place in &predecessors {
        shift(nodes, place, Step::Consume, &mut events);
    }
    for place in &successors {
        shift(nodes, place, Step::Produce, &mut events);
    }
    log::debug!("fired {}", transition);
    Ok(events)
}

/// 逆发生：先回收后继库所的令牌，再归还给前驱库所。
pub(crate) fn inverse_transition_tokens(
    nodes: &mut NodeTable,
    transition: &ElementId,
) -> Result<EventBatch, NetError> {
    let (predecessors, successors) = adjacent_places(nodes, transition)?;
    ensure_feasible(nodes, transition, &successors, &predecessors)?;

    let mut events = EventBatch::new();
    for place in &successors {
        shift(nodes, place, Step::Consume, &mut events);
    }
    for place in &predecessors {
        shift(nodes, place, Step::Produce, &mut events);
    }
    log::debug!("reverse-fired {}", transition);
    Ok(events)
}

fn adjacent_places(
    nodes: &NodeTable,
    transition: &ElementId,
) -> Result<(Vec<ElementId>, Vec<ElementId>), NetError> {
    let node = nodes
        .get(transition)
        .ok_or_else(|| NetError::UnknownNode(transition.clone()))?;
    if !node.is_transition() {
        return Err(NetError::NotATransition(transition.clone()));
    }
    Ok((
        node.predecessors().cloned().collect(),
        node.successors().cloned().collect(),
    ))
}

/// Checks the whole step up front so a failed firing leaves every place untouched.
fn ensure_feasible(
    nodes: &NodeTable,
    transition: &ElementId,
    consumed: &[ElementId],
    produced: &[ElementId],
) -> Result<(), NetError> {
    for place in consumed {
        let tokens = tokens_of(nodes, place);
        if tokens == 0 {
            return Err(NetError::InsufficientTokens {
                place: place.clone(),
                transition: transition.clone(),
            });
        }
    }
    for place in produced {
        // a self-loop place gives its token back before receiving one
        let tokens = tokens_of(nodes, place);
        let refunded = if consumed.contains(place) { tokens - 1 } else { tokens };
        if refunded == Tokens::MAX {
            return Err(NetError::TokenOverflow(place.clone()));
        }
    }
    Ok(())
}

fn tokens_of(nodes: &NodeTable, place: &ElementId) -> Tokens {
    nodes
        .get(place)
        .and_then(|node| node.tokens())
        .unwrap_or_default()
}

fn shift(nodes: &mut NodeTable, place: &ElementId, step: Step, events: &mut EventBatch) {
    let current = tokens_of(nodes, place);
    let next = match step {
        Step::Consume => current.saturating_sub(1),
        Step::Produce => current.saturating_add(1),
    };
    events.extend(change_token_count(nodes, place, next));
    events.push(NetEvent::TokensChanged {
        id: place.clone(),
        tokens: next,
    });
}
