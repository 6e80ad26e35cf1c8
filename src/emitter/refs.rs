//! `$ref` graph utilities.
//!
//! Emitted definitions reference each other through `#/$defs/<Name>`
//! pointers. This module walks a schema tree to collect those pointers,
//! computes reachability over the definition map (the transitive
//! self-reference test and batch-mode dependency sets), and rewrites
//! pointers when batch output moves definitions to the draft-07
//! `definitions` key or replaces them with external `$id`s.

use crate::schema::{AdditionalProperties, JsonSchema};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

pub(super) const DEFS_PREFIX: &str = "#/$defs/";

/// Collect every `$ref` pointer in a schema tree.
pub(super) fn collect_refs<'s>(schema: &'s JsonSchema, out: &mut Vec<&'s str>) {
    if let Some(pointer) = &schema.reference {
        out.push(pointer);
    }
    let nested_boxes = [&schema.items, &schema.not];
    for nested in nested_boxes.into_iter().flatten() {
        collect_refs(nested, out);
    }
    if let Some(AdditionalProperties::Schema(nested)) = &schema.additional_properties {
        collect_refs(nested, out);
    }
    let nested_lists = [&schema.prefix_items, &schema.any_of, &schema.all_of];
    for list in nested_lists.into_iter().flatten() {
        for nested in list {
            collect_refs(nested, out);
        }
    }
    let nested_maps = [&schema.properties, &schema.defs, &schema.definitions];
    for map in nested_maps.into_iter().flatten() {
        for nested in map.values() {
            collect_refs(nested, out);
        }
    }
}

/// Names of definitions referenced directly by `schema`.
pub(super) fn referenced_defs(schema: &JsonSchema) -> Vec<String> {
    let mut pointers = Vec::new();
    collect_refs(schema, &mut pointers);
    pointers
        .into_iter()
        .filter_map(|pointer| pointer.strip_prefix(DEFS_PREFIX))
        .map(str::to_string)
        .collect()
}

/// Definitions transitively reachable from `start`'s own references.
/// `start` itself appears in the result only when a reference path
/// leads back to it - the transitive self-reference test.
pub(super) fn reachable_defs(
    defs: &IndexMap<String, JsonSchema>,
    start: &str,
) -> FxHashSet<String> {
    let mut reached = FxHashSet::default();
    let mut queue: Vec<String> = match defs.get(start) {
        Some(schema) => referenced_defs(schema),
        None => Vec::new(),
    };
    while let Some(name) = queue.pop() {
        if !reached.insert(name.clone()) {
            continue;
        }
        if let Some(schema) = defs.get(&name) {
            queue.extend(referenced_defs(schema));
        }
    }
    reached
}

/// Rewrite every `$ref` with `map`; pointers mapped to `None` are kept
/// as-is.
pub(super) fn rewrite_refs(schema: &mut JsonSchema, map: &impl Fn(&str) -> Option<String>) {
    if let Some(pointer) = &schema.reference {
        if let Some(rewritten) = map(pointer) {
            schema.reference = Some(rewritten);
        }
    }
    let nested_boxes = [&mut schema.items, &mut schema.not];
    for nested in nested_boxes.into_iter().flatten() {
        rewrite_refs(nested, map);
    }
    if let Some(AdditionalProperties::Schema(nested)) = &mut schema.additional_properties {
        rewrite_refs(nested, map);
    }
    let nested_lists = [
        &mut schema.prefix_items,
        &mut schema.any_of,
        &mut schema.all_of,
    ];
    for list in nested_lists.into_iter().flatten() {
        for nested in list {
            rewrite_refs(nested, map);
        }
    }
    let nested_maps = [
        &mut schema.properties,
        &mut schema.defs,
        &mut schema.definitions,
    ];
    for nested_map in nested_maps.into_iter().flatten() {
        for nested in nested_map.values_mut() {
            rewrite_refs(nested, map);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaType;

    fn def(reference: Option<&str>) -> JsonSchema {
        match reference {
            Some(pointer) => JsonSchema::reference(format!("{DEFS_PREFIX}{pointer}")),
            None => JsonSchema::of_type("string"),
        }
    }

    #[test]
    fn direct_self_reference_is_reachable() {
        let mut defs = IndexMap::new();
        defs.insert("T".to_string(), def(Some("T")));
        assert!(reachable_defs(&defs, "T").contains("T"));
    }

    #[test]
    fn mutual_recursion_is_reachable() {
        let mut defs = IndexMap::new();
        defs.insert("A".to_string(), def(Some("B")));
        defs.insert("B".to_string(), def(Some("A")));
        let reached = reachable_defs(&defs, "A");
        assert!(reached.contains("A"));
        assert!(reached.contains("B"));
    }

    #[test]
    fn acyclic_target_is_not_self_reachable() {
        let mut defs = IndexMap::new();
        defs.insert("A".to_string(), def(Some("B")));
        defs.insert("B".to_string(), def(None));
        let reached = reachable_defs(&defs, "A");
        assert!(!reached.contains("A"));
        assert!(reached.contains("B"));
    }

    #[test]
    fn refs_collected_from_nested_positions() {
        let schema = JsonSchema {
            ty: Some(SchemaType::single("object")),
            properties: Some(
                [(
                    "kids".to_string(),
                    JsonSchema {
                        ty: Some(SchemaType::single("array")),
                        items: Some(Box::new(def(Some("T")))),
                        ..JsonSchema::default()
                    },
                )]
                .into_iter()
                .collect(),
            ),
            any_of: Some(vec![def(Some("U"))]),
            ..JsonSchema::default()
        };
        let mut names = referenced_defs(&schema);
        names.sort();
        assert_eq!(names, vec!["T".to_string(), "U".to_string()]);
    }

    #[test]
    fn rewrite_changes_prefix() {
        let mut schema = def(Some("Pet"));
        rewrite_refs(&mut schema, &|pointer: &str| {
            pointer
                .strip_prefix(DEFS_PREFIX)
                .map(|name| format!("#/definitions/{name}"))
        });
        assert_eq!(schema.reference.as_deref(), Some("#/definitions/Pet"));
    }
}
