//! Hostile-input behavior: unbounded nesting must not exhaust the stack.

use std::rc::Rc;

use serde_json::{json, Value};

use jsonapi_hydrator::metadata::{
    constructor, setter, DataType, Metadata, ObjectMetadata, PropertyMetadata, ScalarKind,
};
use jsonapi_hydrator::{options, DataParser, Error, MetadataRegistry, Options};

#[derive(Debug, Default)]
struct Node {
    depth: i64,
    child: Option<Box<Node>>,
}

/// Self-referential metadata: `Node.child` is itself a `Node`.
fn node_registry() -> Rc<MetadataRegistry> {
    let mut registry = MetadataRegistry::new();
    registry
        .register(Metadata::Object(
            ObjectMetadata::new("Node", constructor::<Node>())
                .with_property(PropertyMetadata::new(
                    "Node",
                    "depth",
                    DataType::Scalar(ScalarKind::Int),
                    setter(|node: &mut Node, value| {
                        node.depth = value.into_int()?.unwrap_or_default();
                        Ok(())
                    }),
                ))
                .with_property(PropertyMetadata::new(
                    "Node",
                    "child",
                    DataType::Object("Node".into()),
                    setter(|node: &mut Node, value| {
                        node.child = value.into_object::<Node>()?;
                        Ok(())
                    }),
                )),
        ))
        .unwrap();
    registry.validate().unwrap();
    Rc::new(registry)
}

fn nested_nodes(levels: usize) -> Value {
    let mut tree = json!({"depth": 0});
    for depth in 1..levels {
        tree = json!({"depth": depth, "child": tree});
    }
    tree
}

#[test]
fn shallow_chains_decode_fine() {
    let mut p = DataParser::new(node_registry(), Options::default());
    let node = p
        .parse_object(&nested_nodes(10), "", "Node")
        .unwrap()
        .into_object::<Node>()
        .unwrap()
        .expect("a node");
    assert_eq!(node.depth, 9);
    assert_eq!(node.child.as_ref().unwrap().depth, 8);
}

#[test]
fn runaway_nesting_hits_the_depth_limit() {
    // Far deeper than the default limit of 128; the guard stops the walk
    // before the recursion can threaten the thread stack.
    let hostile = nested_nodes(2_000);
    let mut p = DataParser::new(node_registry(), Options::default());
    let err = p.parse_object(&hostile, "", "Node").unwrap_err();
    match &err {
        Error::DepthLimit { limit, pointer } => {
            assert_eq!(*limit, 128);
            assert!(pointer.starts_with("/child/child/"), "pointer: {pointer}");
        }
        other => panic!("expected a depth limit breach, got {other}"),
    }
    assert_eq!(err.status(), 400);
    assert_eq!(err.code(), "depth-limit");
}

#[test]
fn depth_limit_is_configurable() {
    let options = options! {
        max_depth: 4,
    };
    let mut p = DataParser::new(node_registry(), options);
    assert!(p.parse_object(&nested_nodes(3), "", "Node").is_ok());
    let err = p.parse_object(&nested_nodes(16), "", "Node").unwrap_err();
    assert!(matches!(err, Error::DepthLimit { limit: 4, .. }));
}

#[test]
fn parser_survives_a_depth_breach() {
    let mut p = DataParser::new(node_registry(), Options::default());
    p.parse_object(&nested_nodes(2_000), "", "Node").unwrap_err();

    // Pointer bookkeeping is balanced even along the error path.
    let tree = json!({"depth": "not a number"});
    let err = p.parse_object(&tree, "", "Node").unwrap_err();
    assert_eq!(err.pointer(), Some("/depth"));
}

#[test]
fn wide_documents_are_not_limited() {
    // Width costs memory the caller already paid for the tree; only depth
    // threatens the stack.
    let values: Vec<i64> = (0..10_000).collect();
    let tree = json!({"items": values});
    let mut p = DataParser::new(Rc::new(MetadataRegistry::new()), Options::default());
    let decoded = p
        .parse_array(&tree, "items", &DataType::Scalar(ScalarKind::Int))
        .unwrap();
    assert_eq!(decoded.into_array().unwrap().unwrap().len(), 10_000);
}
