//! Sequence decoding: order preservation, associative trees, nested elements.

use std::rc::Rc;

use serde_json::json;

use jsonapi_hydrator::metadata::{
    callback, constructor, setter, DataType, Metadata, ObjectMetadata, PropertyMetadata,
    ScalarKind,
};
use jsonapi_hydrator::{ArrayKey, DataParser, Decoded, Error, MetadataRegistry, Options};

fn parser() -> DataParser {
    DataParser::new(Rc::new(MetadataRegistry::new()), Options::default())
}

fn int_elements(decoded: Decoded) -> Vec<(ArrayKey, i64)> {
    decoded
        .into_array()
        .unwrap()
        .expect("array")
        .into_iter()
        .map(|(key, element)| (key, element.into_int().unwrap().expect("int")))
        .collect()
}

#[test]
fn json_arrays_keep_index_order() {
    let tree = json!({"items": [10, 20, 30]});
    let mut p = parser();
    let decoded = p
        .parse_array(&tree, "items", &DataType::Scalar(ScalarKind::Int))
        .unwrap();
    assert_eq!(
        int_elements(decoded),
        vec![
            (ArrayKey::Index(0), 10),
            (ArrayKey::Index(1), 20),
            (ArrayKey::Index(2), 30),
        ]
    );
}

#[test]
fn associative_trees_keep_insertion_order() {
    // Deliberately not alphabetical; `preserve_order` keeps it as written.
    let tree = json!({"scores": {"zebra": 1, "apple": 2, "mango": 3}});
    let mut p = parser();
    let decoded = p
        .parse_array(&tree, "scores", &DataType::Scalar(ScalarKind::Int))
        .unwrap();
    assert_eq!(
        int_elements(decoded),
        vec![
            (ArrayKey::from("zebra"), 1),
            (ArrayKey::from("apple"), 2),
            (ArrayKey::from("mango"), 3),
        ]
    );
}

#[test]
fn elements_coerce_like_scalars() {
    let tree = json!({"items": ["1", 2, 3.9]});
    let mut p = parser();
    let decoded = p
        .parse_array(&tree, "items", &DataType::Scalar(ScalarKind::Int))
        .unwrap();
    let values: Vec<i64> = int_elements(decoded).into_iter().map(|(_, v)| v).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn null_elements_stay_null() {
    let tree = json!({"items": [1, null, 3]});
    let mut p = parser();
    let elements = p
        .parse_array(&tree, "items", &DataType::Scalar(ScalarKind::Int))
        .unwrap()
        .into_array()
        .unwrap()
        .unwrap();
    assert!(elements[1].1.is_null());
}

#[test]
fn nested_arrays_recurse() {
    let tree = json!({"grid": [[1, 2], [3]]});
    let mut p = parser();
    let element = DataType::Array(Box::new(DataType::Scalar(ScalarKind::Int)));
    let rows = p
        .parse_array(&tree, "grid", &element)
        .unwrap()
        .into_array()
        .unwrap()
        .unwrap();
    assert_eq!(rows.len(), 2);
    let (_, first_row) = rows.into_iter().next().unwrap();
    assert_eq!(
        int_elements(first_row),
        vec![(ArrayKey::Index(0), 1), (ArrayKey::Index(1), 2)]
    );
}

#[test]
fn raw_elements_pass_through() {
    let tree = json!({"items": [{"a": 1}, [2]]});
    let mut p = parser();
    let elements = p
        .parse_array(&tree, "items", &DataType::Raw)
        .unwrap()
        .into_array()
        .unwrap()
        .unwrap();
    let raw: Vec<_> = elements
        .into_iter()
        .map(|(_, e)| e.into_raw().unwrap().unwrap())
        .collect();
    assert_eq!(raw, vec![json!({"a": 1}), json!([2])]);
}

#[derive(Debug, Default, PartialEq)]
struct Store {
    name: String,
}

fn store_registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    registry
        .register(Metadata::Object(
            ObjectMetadata::new("Store", constructor::<Store>()).with_property(
                PropertyMetadata::new(
                    "Store",
                    "name",
                    DataType::Scalar(ScalarKind::String),
                    setter(|store: &mut Store, value| {
                        store.name = value.into_string()?.unwrap_or_default();
                        Ok(())
                    }),
                ),
            ),
        ))
        .unwrap();
    registry.validate().unwrap();
    registry
}

#[test]
fn object_elements_decode_into_typed_instances() {
    let tree = json!({"stores": [{"name": "PetShop"}, {"name": "FishWorld"}]});
    let mut p = DataParser::new(Rc::new(store_registry()), Options::default());
    let decoded = p
        .parse_array(&tree, "stores", &DataType::Object("Store".into()))
        .unwrap();
    let stores = decoded.into_objects::<Store>().unwrap().unwrap();
    assert_eq!(
        stores,
        vec![
            Store { name: "PetShop".into() },
            Store { name: "FishWorld".into() },
        ]
    );
}

#[test]
fn element_failure_points_at_the_element() {
    let tree = json!({"items": [1, 2, {"x": 1}]});
    let mut p = parser();
    let err = p
        .parse_array(&tree, "items", &DataType::Scalar(ScalarKind::Int))
        .unwrap_err();
    assert_eq!(err.pointer(), Some("/items/2"));
    assert_eq!(err.status(), 400);
}

#[test]
fn non_sequence_is_a_type_mismatch() {
    let tree = json!({"items": "not an array"});
    let mut p = parser();
    let err = p
        .parse_array(&tree, "items", &DataType::Scalar(ScalarKind::Int))
        .unwrap_err();
    assert!(
        matches!(&err, Error::TypeMismatch { expected, actual, .. }
            if *expected == "array" && actual == "string"),
        "got {err}"
    );
}

#[test]
fn absent_and_null_sequences_are_null() {
    let tree = json!({"items": null});
    let mut p = parser();
    let element = DataType::Scalar(ScalarKind::Int);
    assert!(p.parse_array(&tree, "items", &element).unwrap().is_null());
    assert!(p.parse_array(&tree, "missing", &element).unwrap().is_null());
}

#[test]
fn custom_element_types_are_rejected() {
    #[derive(Default)]
    struct Holder;
    let tree = json!({"items": [1]});
    let mut p = parser();
    let element = DataType::Custom(callback(|_: &mut Holder, _| Ok(Decoded::Null)));
    let err = p.parse_array(&tree, "items", &element).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn empty_sequences_decode_to_empty_arrays() {
    let tree = json!({"items": []});
    let mut p = parser();
    let elements = p
        .parse_array(&tree, "items", &DataType::Scalar(ScalarKind::Int))
        .unwrap()
        .into_array()
        .unwrap()
        .unwrap();
    assert!(elements.is_empty());
}
