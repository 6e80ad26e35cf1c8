//! End-to-end scenarios over the string API.

use serde_json::{json, Value};
use ts2schema::{parse_declarations, to_json_schema, to_json_schemas, ConvertOptions};

fn convert(source: &str, options: &ConvertOptions) -> Value {
    let schema = to_json_schema(source, options).expect("conversion failed");
    serde_json::to_value(schema).expect("serialization failed")
}

fn bare() -> ConvertOptions {
    ConvertOptions {
        include_schema: false,
        ..ConvertOptions::default()
    }
}

fn with_root(name: &str) -> ConvertOptions {
    ConvertOptions {
        root_type: Some(name.to_string()),
        ..bare()
    }
}

#[test]
fn primitives_and_optionals() {
    let value = convert(
        "interface User { name: string; age?: number; active: boolean; }",
        &with_root("User"),
    );
    assert_eq!(
        value,
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "number"},
                "active": {"type": "boolean"}
            },
            "required": ["name", "active"]
        })
    );
}

#[test]
fn string_literal_union() {
    let value = convert("type Status = \"a\" | \"b\" | \"c\";", &bare());
    assert_eq!(value, json!({"type": "string", "enum": ["a", "b", "c"]}));
}

#[test]
fn recursive_self_reference() {
    let value = convert("interface T { v: string; kids: T[]; }", &with_root("T"));
    assert_eq!(value["$ref"], json!("#/$defs/T"));
    assert_eq!(
        value["$defs"]["T"]["properties"]["kids"],
        json!({"type": "array", "items": {"$ref": "#/$defs/T"}})
    );
    assert_eq!(value["$defs"]["T"]["required"], json!(["v", "kids"]));
}

#[test]
fn omit_in_extends_with_jsdoc_tag() {
    let source = r#"
interface Pet { _id: string; name: string; }
/** @additionalProperties false */
export interface PostPetReq extends Omit<Pet, "_id"> {}
"#;
    let value = convert(source, &bare());
    assert_eq!(value["type"], json!("object"));
    assert_eq!(value["properties"], json!({"name": {"type": "string"}}));
    assert_eq!(value["required"], json!(["name"]));
    assert_eq!(value["additionalProperties"], json!(false));
}

#[test]
fn jsdoc_numeric_constraints_and_suppression() {
    let source = "interface Cfg { /** @minimum 1 @maximum 50 @default 10 */ size: number; }";
    let value = convert(source, &bare());
    assert_eq!(
        value["properties"]["size"],
        json!({"type": "number", "minimum": 1.0, "maximum": 50.0, "default": 10})
    );

    let stripped = convert(
        source,
        &ConvertOptions {
            include_jsdoc: false,
            ..bare()
        },
    );
    assert_eq!(stripped["properties"]["size"], json!({"type": "number"}));
}

#[test]
fn schema_header_present_by_default() {
    let value = convert("type T = string;", &ConvertOptions::default());
    assert_eq!(
        value["$schema"],
        json!("https://json-schema.org/draft/2020-12/schema")
    );
}

#[test]
fn flattening_idempotence() {
    let nested = convert("type S = (\"a\" | \"b\") | (\"c\" | (\"d\" | \"e\"));", &bare());
    let flat = convert("type S = \"a\" | \"b\" | \"c\" | \"d\" | \"e\";", &bare());
    assert_eq!(nested, flat);
}

#[test]
fn pick_omit_duality() {
    let source = r#"
interface T { a: string; b: number; c: boolean; d: string[]; }
type Picked = Pick<T, "a" | "c">;
type Omitted = Omit<T, "a" | "c">;
"#;
    let picked = convert(source, &with_root("Picked"));
    let omitted = convert(source, &with_root("Omitted"));
    let picked_keys: Vec<&str> = picked["properties"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    let omitted_keys: Vec<&str> = omitted["properties"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(picked_keys, ["a", "c"]);
    assert_eq!(omitted_keys, ["b", "d"]);
}

#[test]
fn non_recursive_root_is_inlined_and_removed_from_defs() {
    let value = convert(
        "interface Leaf { x: string }\nexport interface Root { leaf: Leaf }",
        &with_root("Root"),
    );
    assert!(value.get("$ref").is_none());
    assert_eq!(value["properties"]["leaf"], json!({"$ref": "#/$defs/Leaf"}));
    assert!(value["$defs"].get("Root").is_none());
}

#[test]
fn name_transform_bijection_over_output() {
    let options = ConvertOptions {
        name_transform: Some(std::sync::Arc::new(
            |name: &str, _: &ts2schema::Declaration| Ok(format!("X{name}")),
        )),
        ..bare()
    };
    let source = "interface A { b: B }\ninterface B { c: C[] }\ninterface C { n: number }";
    let value = convert(source, &ConvertOptions {
        root_type: Some("A".to_string()),
        ..options
    });

    let declared: Vec<String> = parse_declarations(source)
        .unwrap()
        .iter()
        .map(|declaration| format!("#/$defs/X{}", declaration.name()))
        .collect();
    let mut refs = Vec::new();
    collect_refs(&value, &mut refs);
    assert!(!refs.is_empty());
    for pointer in refs {
        assert!(declared.contains(&pointer), "unexpected ref {pointer}");
    }
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(pointer)) = map.get("$ref") {
                out.push(pointer.clone());
            }
            for nested in map.values() {
                collect_refs(nested, out);
            }
        }
        Value::Array(values) => {
            for nested in values {
                collect_refs(nested, out);
            }
        }
        _ => {}
    }
}

#[test]
fn tokenizer_robustness_over_junk_inputs() {
    // Junk must never panic; well-formed declarations inside still
    // parse when the junk is outside the subset grammar.
    let inputs = [
        "",
        "\u{0}\u{1}\u{2}",
        "interface",
        "@@@@ ???",
        "/** unclosed",
        "type T = ;",
        "🦀🦀🦀",
    ];
    for input in inputs {
        let _ = parse_declarations(input);
    }
}

#[test]
fn batch_output_shapes() {
    let schemas = to_json_schemas(
        "interface Pet { name: string }\ninterface Owner { pet: Pet }",
        &bare(),
    )
    .expect("batch conversion failed");
    assert_eq!(schemas.len(), 2);

    let owner = serde_json::to_value(&schemas["Owner"]).unwrap();
    assert_eq!(
        owner["properties"]["pet"],
        json!({"$ref": "#/definitions/Pet"})
    );
    assert!(owner["definitions"]["Pet"].is_object());

    let pet = serde_json::to_value(&schemas["Pet"]).unwrap();
    assert!(pet.get("definitions").is_none());
}

#[test]
fn enum_and_date_and_nullable() {
    let source = r#"
enum Color { Red = "red", Green = "green" }
export interface Item {
    color: Color;
    created: Date;
    note: string | null;
}
"#;
    let value = convert(source, &bare());
    assert_eq!(value["properties"]["color"], json!({"$ref": "#/$defs/Color"}));
    assert_eq!(
        value["$defs"]["Color"],
        json!({"type": "string", "enum": ["red", "green"]})
    );
    assert_eq!(
        value["properties"]["created"],
        json!({"type": "string", "format": "date-time"})
    );
    assert_eq!(value["properties"]["note"], json!({"type": ["string", "null"]}));
}

#[test]
fn duplicate_declarations_in_one_source() {
    let source = "interface A { x: string }\ninterface A { y: string }";
    let err = to_json_schema(source, &bare()).expect_err("duplicate should fail");
    assert!(matches!(err, ts2schema::Error::DuplicateDeclaration { .. }));

    let silent = ConvertOptions {
        on_duplicate: ts2schema::DuplicatePolicy::Silent,
        ..bare()
    };
    let value = convert(source, &silent);
    assert_eq!(value["properties"], json!({"x": {"type": "string"}}));
}

#[test]
fn parse_error_positions_surface() {
    let err = to_json_schema("interface X {\n  name string;\n}", &bare())
        .expect_err("missing colon should fail");
    let ts2schema::Error::Parse(parse_error) = err else {
        panic!("expected a parse error");
    };
    assert_eq!(parse_error.line, 2);
}
