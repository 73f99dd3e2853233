#![forbid(unsafe_code)]

use std::process::exit;

use serde_json::Value;

use jsonapi_hydrator::accessor;

/// Read a JSON file and resolve a dotted/bracketed path expression inside it,
/// printing the value found. Without an expression the tool just validates
/// the JSON. First parameter is the file name, optional second parameter is
/// the path expression (e.g. `data.attributes.name` or `items[2].id`).
fn main() {
    let mut args = std::env::args().skip(1);
    let path = match args.next().ok_or(
        "This program resolves a path expression like data.attributes.name or \
        items[2].id inside a JSON file, can also be used as a JSON validator. \
        Expected a path to a JSON file as the first argument",
    ) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("{err}");
            exit(1);
        }
    };
    let expression = args.next();

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Failed to read {path}: {err}");
            exit(2);
        }
    };

    let tree: Value = match serde_json::from_str(&content) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("{path} invalid:\n{err}");
            exit(3);
        }
    };

    let Some(expression) = expression else {
        println!("{path} is valid JSON");
        return;
    };

    match accessor::get_path(&tree, &expression) {
        Ok(value) => match serde_json::to_string_pretty(value) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("Failed to render value: {err}");
                exit(4);
            }
        },
        Err(err) => {
            eprintln!("{err}");
            exit(4);
        }
    }
}
