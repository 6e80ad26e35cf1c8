//! The JSON Schema value model and its serializer.
//!
//! One struct covers the output vocabulary of both emission modes:
//! draft 2020-12 keywords (`$defs`, `prefixItems`) for single-document
//! output and the draft-07 `definitions` key used by batch output for
//! wide validator compatibility. Absent fields are skipped entirely, so
//! an empty schema serializes as `{}` (the "accepts anything" schema).
//!
//! Property and definition maps are insertion-ordered; source order is
//! part of the output contract.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// The `type` keyword: a single type name or a list (used for the
/// `["string", "null"]` nullable shorthand).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Many(Vec<String>),
}

impl SchemaType {
    pub fn single(name: impl Into<String>) -> Self {
        SchemaType::Single(name.into())
    }

    /// The type name when this is a single type.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            SchemaType::Single(name) => Some(name),
            SchemaType::Many(_) => None,
        }
    }
}

/// The `additionalProperties` keyword: a boolean or a full schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<JsonSchema>),
}

/// A JSON Schema document or sub-schema.
///
/// Field order here is serialization order, chosen so that documents
/// read naturally: identity keywords first, shape keywords next,
/// constraints and annotations after, named sub-schemas last.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JsonSchema {
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(rename = "$id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<SchemaType>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, JsonSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    #[serde(rename = "prefixItems", skip_serializing_if = "Option::is_none")]
    pub prefix_items: Option<Vec<JsonSchema>>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(rename = "anyOf", skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<JsonSchema>>,
    #[serde(rename = "allOf", skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<JsonSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<JsonSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "$defs", skip_serializing_if = "Option::is_none")]
    pub defs: Option<IndexMap<String, JsonSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<IndexMap<String, JsonSchema>>,
}

impl JsonSchema {
    /// The empty schema `{}`, which accepts any value.
    pub fn any() -> Self {
        JsonSchema::default()
    }

    /// The schema `{"not": {}}`, which accepts nothing.
    pub fn never() -> Self {
        JsonSchema {
            not: Some(Box::new(JsonSchema::any())),
            ..JsonSchema::default()
        }
    }

    pub fn of_type(name: &str) -> Self {
        JsonSchema {
            ty: Some(SchemaType::single(name)),
            ..JsonSchema::default()
        }
    }

    pub fn reference(pointer: impl Into<String>) -> Self {
        JsonSchema {
            reference: Some(pointer.into()),
            ..JsonSchema::default()
        }
    }

    pub fn constant(value: Value) -> Self {
        JsonSchema {
            const_value: Some(value),
            ..JsonSchema::default()
        }
    }

    /// True when no field is set (`{}`).
    pub fn is_empty(&self) -> bool {
        *self == JsonSchema::default()
    }

    /// Serialize with two-space indentation, the output format of the
    /// CLI.
    pub fn to_pretty_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_schema_serializes_as_empty_object() {
        let value = serde_json::to_value(JsonSchema::any()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn never_schema() {
        let value = serde_json::to_value(JsonSchema::never()).unwrap();
        assert_eq!(value, json!({"not": {}}));
    }

    #[test]
    fn keyword_renames() {
        let schema = JsonSchema {
            schema: Some("https://example.com/draft".to_string()),
            reference: Some("#/$defs/Pet".to_string()),
            ty: Some(SchemaType::Many(vec![
                "string".to_string(),
                "null".to_string(),
            ])),
            read_only: Some(true),
            min_length: Some(1),
            ..JsonSchema::default()
        };
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "$schema": "https://example.com/draft",
                "$ref": "#/$defs/Pet",
                "type": ["string", "null"],
                "readOnly": true,
                "minLength": 1
            })
        );
    }

    #[test]
    fn properties_preserve_insertion_order() {
        let mut properties = IndexMap::new();
        properties.insert("zebra".to_string(), JsonSchema::of_type("string"));
        properties.insert("apple".to_string(), JsonSchema::of_type("number"));
        let schema = JsonSchema {
            ty: Some(SchemaType::single("object")),
            properties: Some(properties),
            ..JsonSchema::default()
        };
        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.find("zebra").unwrap() < text.find("apple").unwrap());
    }

    #[test]
    fn additional_properties_bool_and_schema() {
        let bool_form = JsonSchema {
            additional_properties: Some(AdditionalProperties::Bool(false)),
            ..JsonSchema::default()
        };
        assert_eq!(
            serde_json::to_value(&bool_form).unwrap(),
            json!({"additionalProperties": false})
        );
        let schema_form = JsonSchema {
            additional_properties: Some(AdditionalProperties::Schema(Box::new(
                JsonSchema::of_type("number"),
            ))),
            ..JsonSchema::default()
        };
        assert_eq!(
            serde_json::to_value(&schema_form).unwrap(),
            json!({"additionalProperties": {"type": "number"}})
        );
    }

    #[test]
    fn pretty_output_uses_two_space_indent() {
        let schema = JsonSchema::of_type("string");
        let text = schema.to_pretty_string().unwrap();
        assert_eq!(text, "{\n  \"type\": \"string\"\n}");
    }
}
