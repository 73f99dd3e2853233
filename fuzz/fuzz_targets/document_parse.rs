#![no_main]

use std::rc::Rc;

use libfuzzer_sys::fuzz_target;
use serde_json::json;

use jsonapi_hydrator::metadata::{
    constructor, setter, DataType, DocumentMetadata, Metadata, PropertyMetadata, ResourceMetadata,
    ScalarKind,
};
use jsonapi_hydrator::{DataParser, MetadataRegistry, Options};

#[derive(Debug, Default)]
struct Pet {
    id: String,
    name: String,
    age: i64,
}

#[derive(Debug, Default)]
struct PetDocument {
    data: Option<Pet>,
}

fn registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    registry
        .register(Metadata::Resource(
            ResourceMetadata::new("Pet", "pets", constructor::<Pet>())
                .with_id(PropertyMetadata::new(
                    "Pet",
                    "id",
                    DataType::Scalar(ScalarKind::String),
                    setter(|pet: &mut Pet, value| {
                        pet.id = value.into_string()?.unwrap_or_default();
                        Ok(())
                    }),
                ))
                .with_attribute(PropertyMetadata::new(
                    "Pet",
                    "name",
                    DataType::Scalar(ScalarKind::String),
                    setter(|pet: &mut Pet, value| {
                        pet.name = value.into_string()?.unwrap_or_default();
                        Ok(())
                    }),
                ))
                .with_attribute(PropertyMetadata::new(
                    "Pet",
                    "age",
                    DataType::Scalar(ScalarKind::Int),
                    setter(|pet: &mut Pet, value| {
                        pet.age = value.into_int()?.unwrap_or_default();
                        Ok(())
                    }),
                )),
        ))
        .expect("register Pet");
    registry
        .register(Metadata::Document(DocumentMetadata::new(
            "PetDocument",
            constructor::<PetDocument>(),
            PropertyMetadata::new(
                "PetDocument",
                "data",
                DataType::Object("Pet".into()),
                setter(|doc: &mut PetDocument, value| {
                    doc.data = value.into_object::<Pet>()?.map(|boxed| *boxed);
                    Ok(())
                }),
            ),
        )))
        .expect("register PetDocument");
    registry.validate().expect("registry is consistent");
    registry
}

// This fuzzer parses whole documents. Arbitrary JSON trees go straight in;
// non-JSON bytes are embedded into a well-formed document as member values.
// Every failure must come back as a structured error envelope, never a panic.
fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let mut parser = DataParser::new(Rc::new(registry()), Options::default());

    if let Ok(tree) = serde_json::from_slice::<serde_json::Value>(data) {
        let _ = parser.parse_document_as::<PetDocument>(&tree, "PetDocument");
        let _ = parser.parse_document_as::<PetDocument>(&json!({"data": tree}), "PetDocument");
    }

    let text = String::from_utf8_lossy(data);
    let embedded = json!({
        "data": {
            "type": "pets",
            "id": text,
            "attributes": {"name": text, "age": text}
        }
    });
    let _ = parser.parse_document_as::<PetDocument>(&embedded, "PetDocument");

    // The bytes as the resource type must either match or yield a conflict.
    let typed = json!({"data": {"type": text, "id": "1"}});
    let _ = parser.parse_document_as::<PetDocument>(&typed, "PetDocument");
});
