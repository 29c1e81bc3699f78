//! 端到端场景：通过公共接口驱动网引擎并观察事件序列。
use pn_engine::net::{Arc, ElementFactory, ElementId, ErrorKind, EventRecorder, Net, NetEvent, NetError, Node};

fn id(raw: &str) -> ElementId {
    ElementId::new(raw).unwrap()
}

fn observed() -> (Net, EventRecorder) {
    let mut net = Net::new();
    let recorder = EventRecorder::new();
    net.subscribe(recorder.clone());
    (net, recorder)
}

#[test]
fn join_enables_when_last_input_is_marked() {
    let (mut net, recorder) = observed();
    net.add_place(0, 0, "P1").unwrap();
    net.add_place(0, 10, "P2").unwrap();
    net.add_transition(10, 5, "T").unwrap();
    net.change_tokens("P1", 1).unwrap();
    net.add_arc("P1", "T", "a1").unwrap();
    net.add_arc("P2", "T", "a2").unwrap();
    assert!(!net.state("T").unwrap());

    recorder.take();
    net.change_tokens("P2", 1).unwrap();
    assert_eq!(recorder.state_changes(), vec![(id("T"), true)]);
    assert!(net.state("T").unwrap());
}

#[test]
fn lone_place_lifecycle() {
    let (mut net, _) = observed();
    net.add_place(4, 4, "P").unwrap();
    net.change_tokens("P", 5).unwrap();
    assert_eq!(net.token_count("P").unwrap(), 5);

    assert!(net.remove_node("P"));
    assert!(!net.contains("P"));
    assert!(!net.remove_node("P"));
}

#[test]
fn firing_moves_one_token_along_each_arc() {
    let (mut net, recorder) = observed();
    net.add_place(0, 0, "P1").unwrap();
    net.add_transition(1, 0, "T").unwrap();
    net.add_place(2, 0, "P2").unwrap();
    net.change_tokens("P1", 1).unwrap();
    net.add_arc("P1", "T", "in").unwrap();
    net.add_arc("T", "P2", "out").unwrap();
    recorder.take();

    net.perform_transition("T").unwrap();
    assert_eq!(net.token_count("P1").unwrap(), 0);
    assert_eq!(net.token_count("P2").unwrap(), 1);
    assert_eq!(recorder.token_changes(), vec![(id("P1"), 0), (id("P2"), 1)]);
}

#[test]
fn arc_between_places_is_rejected_without_side_effects() {
    let (mut net, recorder) = observed();
    net.add_place(0, 0, "P1").unwrap();
    net.add_place(0, 0, "P2").unwrap();

    let err = net.add_arc("P1", "P2", "bad").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);
    assert!(!net.contains("bad"));
    assert!(net.arcs_for_node("P1").unwrap().is_empty());
    assert!(net.arcs_for_node("P2").unwrap().is_empty());
    assert!(net.node("P1").unwrap().successors().next().is_none());
    assert!(net.node("P2").unwrap().predecessors().next().is_none());
    assert!(recorder.is_empty());

    net.add_transition(0, 0, "T1").unwrap();
    net.add_transition(0, 0, "T2").unwrap();
    assert!(matches!(
        net.add_arc("T1", "T2", "bad").unwrap_err(),
        NetError::SameKind {
            kind: "transition",
            ..
        }
    ));
}

#[test]
fn firing_with_empty_input_changes_nothing() {
    let (mut net, recorder) = observed();
    net.add_place(0, 0, "P0").unwrap();
    net.add_place(0, 0, "P1").unwrap();
    net.add_place(0, 0, "P2").unwrap();
    net.add_transition(0, 0, "T").unwrap();
    net.change_tokens("P1", 2).unwrap();
    net.add_arc("P0", "T", "a0").unwrap();
    net.add_arc("P1", "T", "a1").unwrap();
    net.add_arc("T", "P2", "a2").unwrap();
    recorder.take();

    let err = net.perform_transition("T").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(net.token_count("P0").unwrap(), 0);
    assert_eq!(net.token_count("P1").unwrap(), 2);
    assert_eq!(net.token_count("P2").unwrap(), 0);
    assert!(recorder.is_empty());
}

#[test]
fn crossing_zero_is_the_only_source_of_flips() {
    let (mut net, recorder) = observed();
    net.add_place(0, 0, "P").unwrap();
    net.add_transition(0, 0, "T").unwrap();
    net.change_tokens("P", 3).unwrap();
    net.add_arc("P", "T", "a").unwrap();
    recorder.take();

    net.change_tokens("P", 5).unwrap();
    assert_eq!(
        recorder.take(),
        vec![NetEvent::TokensChanged {
            id: id("P"),
            tokens: 5
        }]
    );
}

#[test]
fn inverse_firing_undoes_a_fork() {
    let (mut net, recorder) = observed();
    net.add_place(0, 0, "src").unwrap();
    net.add_place(0, 0, "left").unwrap();
    net.add_place(0, 0, "right").unwrap();
    net.add_transition(0, 0, "fork").unwrap();
    net.add_transition(0, 0, "join").unwrap();
    net.change_tokens("src", 1).unwrap();
    for (arc, from, to) in [
        ("a0", "src", "fork"),
        ("a1", "fork", "left"),
        ("a2", "fork", "right"),
        ("a3", "left", "join"),
        ("a4", "right", "join"),
        ("a5", "join", "src"),
    ] {
        net.add_arc(from, to, arc).unwrap();
    }
    let before = net.marking();
    assert!(!net.state("join").unwrap());
    recorder.take();

    net.perform_transition("fork").unwrap();
    assert!(net.state("join").unwrap());
    assert!(!net.state("fork").unwrap());

    net.inverse_transition("fork").unwrap();
    assert_eq!(net.marking(), before);
    assert!(net.state("fork").unwrap());
    assert!(!net.state("join").unwrap());
    assert_eq!(
        recorder.state_changes(),
        vec![
            (id("fork"), false),
            (id("join"), true),
            (id("join"), false),
            (id("fork"), true),
        ]
    );
    assert!(net.verify_enablement().is_empty());
}

struct Stocked;

impl ElementFactory for Stocked {
    fn place(&self, id: ElementId, x: i32, y: i32) -> Result<Node, NetError> {
        Node::place_with_tokens(id, x, y, 1)
    }
}

#[test]
fn injected_factory_seeds_places() {
    let mut net = Net::with_factory(Box::new(Stocked));
    net.add_place(0, 0, "P").unwrap();
    net.add_transition(0, 0, "T").unwrap();
    net.add_arc("P", "T", "a").unwrap();
    assert_eq!(net.token_count("P").unwrap(), 1);
    assert!(net.state("T").unwrap());
    net.perform_transition("T").unwrap();
    assert!(!net.state("T").unwrap());
}

/// Hands back elements that do not match what the net asked for.
struct Misbuilt;

impl ElementFactory for Misbuilt {
    fn place(&self, id: ElementId, x: i32, y: i32) -> Result<Node, NetError> {
        Node::transition(id, x, y)
    }

    fn transition(&self, _id: ElementId, x: i32, y: i32) -> Result<Node, NetError> {
        Node::transition(ElementId::new("other")?, x, y)
    }
}

#[test]
fn misbuilt_elements_are_refused() {
    let mut net = Net::with_factory(Box::new(Misbuilt));
    let recorder = EventRecorder::new();
    net.subscribe(recorder.clone());

    let err = net.add_place(0, 0, "p").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(matches!(err, NetError::FactoryMismatch { expected: "place", .. }));
    assert!(!net.contains("p"));

    let err = net.add_transition(0, 0, "t").unwrap_err();
    assert_eq!(
        err,
        NetError::FactoryMismatch {
            requested: id("t"),
            expected: "transition",
            produced: "transition other".to_string(),
        }
    );
    assert!(!net.contains("t"));
    assert!(!net.contains("other"));
    assert_eq!(net.places_len() + net.transitions_len(), 0);
    assert!(recorder.is_empty());
}

struct Rewired;

impl ElementFactory for Rewired {
    fn arc(&self, id: ElementId, source: &Node, target: &Node) -> Result<Arc, NetError> {
        let place = Node::place(source.id().clone(), 0, 0)?;
        let transition = Node::transition(target.id().clone(), 0, 0)?;
        // swaps the direction of transition -> place requests
        if source.is_transition() {
            Arc::new(id, &place, &transition)
        } else {
            Arc::new(id, source, target)
        }
    }
}

#[test]
fn rewired_arc_is_refused_and_net_unchanged() {
    let mut net = Net::with_factory(Box::new(Rewired));
    let recorder = EventRecorder::new();
    net.subscribe(recorder.clone());
    net.add_place(0, 0, "p").unwrap();
    net.add_transition(0, 0, "t").unwrap();

    let err = net.add_arc("t", "p", "a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(!net.contains("a"));
    assert!(net.arcs_for_node("t").unwrap().is_empty());
    assert!(net.node("p").unwrap().predecessors().next().is_none());
    assert!(net.state("t").unwrap());
    assert!(recorder.is_empty());

    net.add_arc("p", "t", "b").unwrap();
    assert!(!net.state("t").unwrap());
}
