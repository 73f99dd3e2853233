#![no_main]

use std::rc::Rc;

use libfuzzer_sys::fuzz_target;
use serde_json::json;

use jsonapi_hydrator::metadata::ScalarKind;
use jsonapi_hydrator::{DataParser, MetadataRegistry, Options};

// This fuzzer drives the scalar coercion table and the timestamp parser with
// arbitrary strings, both as JSON string nodes and as whole JSON trees. Every
// outcome must be a value or an error carrying a pointer.
fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }
    let text = String::from_utf8_lossy(data);
    let mut parser = DataParser::new(Rc::new(MetadataRegistry::new()), Options::default());

    let kinds = [
        ScalarKind::Bool,
        ScalarKind::Int,
        ScalarKind::Float,
        ScalarKind::String,
    ];

    // 1) The input as a string node under a key.
    let tree = json!({"v": text});
    for kind in kinds {
        let _ = parser.parse_scalar(&tree, "v", kind);
    }
    let _ = parser.parse_datetime(&tree, "v", None);

    // 2) The input split into a format half and a value half; chrono must
    //    reject hostile formats without panicking.
    if let Some(mid) = text.char_indices().map(|(i, _)| i).nth(text.chars().count() / 2) {
        let (format, value) = text.split_at(mid);
        let tree = json!({"at": value});
        let _ = parser.parse_datetime(&tree, "at", Some(format));
    }

    // 3) The input as a whole JSON tree, coerced at the root.
    if let Ok(parsed) = serde_json::from_slice::<serde_json::Value>(data) {
        for kind in kinds {
            let _ = parser.parse_scalar(&parsed, "", kind);
        }
        let _ = parser.parse_datetime(&parsed, "", None);
        let _ = parser.parse_raw(&parsed, "");
    }
});
