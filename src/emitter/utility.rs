//! Built-in utility type resolution.
//!
//! The fixed set of generic names whose semantics the emitter knows.
//! Shape-rewriting utilities (`Partial`, `Required`, `Pick`, `Omit`)
//! resolve their argument to a property list and emit a rewritten
//! object; container utilities (`Set`, `Map`, `ReadonlyArray`) map to
//! schema keywords directly. When an argument cannot be resolved
//! statically - a non-literal key set, a shapeless base - the base type
//! is emitted unchanged.

use super::generics::ObjectShape;
use super::Emitter;
use crate::ast::TypeNode;
use crate::error::Result;
use crate::schema::{AdditionalProperties, JsonSchema};
use rustc_hash::FxHashSet;

impl<'a> Emitter<'a> {
    /// Try to emit `name<args>` as a utility type. `Ok(None)` means the
    /// name is not a utility and ordinary reference handling applies.
    pub(super) fn emit_utility(
        &self,
        name: &str,
        args: &[TypeNode],
    ) -> Result<Option<JsonSchema>> {
        let schema = match (name, args) {
            ("Partial" | "Required" | "Pick" | "Omit" | "Readonly" | "NonNullable", [base, ..]) => {
                let mut visiting = FxHashSet::default();
                match self.utility_shape(name, args, &mut visiting)? {
                    Some(shape) => Some(self.emit_object(&shape, None, None)?),
                    // Pass-through when the base has no resolvable shape.
                    None => Some(self.emit_type(base)?),
                }
            }
            ("Set", [element]) => Some(JsonSchema {
                ty: Some(crate::schema::SchemaType::single("array")),
                items: Some(Box::new(self.emit_type(element)?)),
                unique_items: Some(true),
                ..JsonSchema::default()
            }),
            ("Map", [_, value]) => Some(JsonSchema {
                ty: Some(crate::schema::SchemaType::single("object")),
                additional_properties: Some(AdditionalProperties::Schema(Box::new(
                    self.emit_type(value)?,
                ))),
                ..JsonSchema::default()
            }),
            ("ReadonlyArray" | "Array", [element]) => Some(JsonSchema {
                ty: Some(crate::schema::SchemaType::single("array")),
                items: Some(Box::new(self.emit_type(element)?)),
                ..JsonSchema::default()
            }),
            // The parser unwraps `Promise<T>`; substitution can
            // reintroduce it.
            ("Promise", [inner]) => Some(self.emit_type(inner)?),
            ("Exclude", [base, removed]) => self.emit_literal_set_op(base, removed, false)?,
            ("Extract", [base, kept]) => self.emit_literal_set_op(base, kept, true)?,
            _ => None,
        };
        Ok(schema)
    }

    /// Shape-rewriting utilities, shared with `extends` resolution so
    /// `interface X extends Partial<Y>` flattens like any other base.
    pub(super) fn utility_shape(
        &self,
        name: &str,
        args: &[TypeNode],
        visiting: &mut FxHashSet<String>,
    ) -> Result<Option<ObjectShape>> {
        let shape = match (name, args) {
            ("Partial", [base]) => self.object_shape(base, visiting)?.map(|mut shape| {
                for property in &mut shape.properties {
                    property.optional = true;
                }
                shape
            }),
            ("Required", [base]) => self.object_shape(base, visiting)?.map(|mut shape| {
                for property in &mut shape.properties {
                    property.optional = false;
                }
                shape
            }),
            ("Readonly" | "NonNullable", [base]) => self.object_shape(base, visiting)?,
            ("Pick", [base, keys]) => match self.literal_string_keys(keys) {
                Some(keys) => self.object_shape(base, visiting)?.map(|mut shape| {
                    shape.properties.retain(|property| {
                        keys.iter().any(|key| key == &property.name)
                    });
                    shape
                }),
                // Keys not statically known: the base passes through.
                None => self.object_shape(base, visiting)?,
            },
            ("Omit", [base, keys]) => match self.literal_string_keys(keys) {
                Some(keys) => self.object_shape(base, visiting)?.map(|mut shape| {
                    shape.properties.retain(|property| {
                        !keys.iter().any(|key| key == &property.name)
                    });
                    shape
                }),
                None => self.object_shape(base, visiting)?,
            },
            _ => None,
        };
        Ok(shape)
    }

    /// `Exclude` / `Extract` over statically known literal unions; the
    /// base is emitted unchanged when either side is not literal.
    fn emit_literal_set_op(
        &self,
        base: &TypeNode,
        operand: &TypeNode,
        keep_matching: bool,
    ) -> Result<Option<JsonSchema>> {
        let (Some(base_members), Some(operand_members)) =
            (self.literal_members(base), self.literal_members(operand))
        else {
            return Ok(Some(self.emit_type(base)?));
        };
        let mut remaining: Vec<TypeNode> = base_members
            .into_iter()
            .filter(|member| operand_members.contains(member) == keep_matching)
            .collect();
        let schema = match remaining.len() {
            0 => JsonSchema::never(),
            1 => self.emit_type(&remaining.remove(0))?,
            _ => self.emit_type(&TypeNode::Union { members: remaining })?,
        };
        Ok(Some(schema))
    }
}
