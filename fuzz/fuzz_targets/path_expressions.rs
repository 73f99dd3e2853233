#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::json;

// This fuzzer throws arbitrary byte soup at the path expression parser and
// resolves whatever survives against a fixed tree. Malformed expressions and
// unreachable locations must surface as errors, never as panics.
fuzz_target!(|data: &[u8]| {
    if data.len() > 4 * 1024 {
        return;
    }
    let path = String::from_utf8_lossy(data);

    let tree = json!({
        "data": {
            "type": "pets",
            "id": "1",
            "attributes": {"name": "Rex", "tags": ["small", "brown"]},
            "relationships": {"store": {"data": {"type": "stores", "id": "2"}}}
        },
        "items": [1, 2, 3],
        "meta": {"count": 3}
    });

    let _ = jsonapi_hydrator::accessor::has_path(&tree, &path);
    let _ = jsonapi_hydrator::accessor::get_path(&tree, &path);

    // The bytes may also be valid JSON; then walk that tree with fixed paths.
    if let Ok(parsed) = serde_json::from_slice::<serde_json::Value>(data) {
        for expr in ["data.attributes.name", "items[0]", "[key]", "a.b.c"] {
            let _ = jsonapi_hydrator::accessor::get_path(&parsed, expr);
        }
    }
});
