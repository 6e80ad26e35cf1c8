//! Schema emission.
//!
//! Turns a merged declaration list into JSON Schema. Two output shapes
//! exist:
//!
//! - [`emit`] produces one document: a root schema with every other
//!   declaration under draft 2020-12 `$defs`. A transitively
//!   self-referential root stays inside `$defs` and the document root
//!   becomes a bare `$ref`, which is what draft-2020-12 validators need
//!   for recursion.
//! - [`emit_all`] produces a map of self-contained schemas, each
//!   carrying only its transitive dependencies under the draft-07
//!   `definitions` key (deliberately, for wide validator
//!   compatibility). With an id provider the map keys and inter-schema
//!   references become external `$id`s and `definitions` is omitted.
//!
//! The two drafts are intentionally not unified; see the module docs on
//! both functions before changing either.

mod generics;
mod refs;
mod utility;

use crate::ast::{
    Declaration, DeclarationBase, EnumValue, IndexSignature, PrimitiveKind, TupleElement, TypeNode,
};
use crate::error::{Error, Result};
use crate::options::ConvertOptions;
use crate::schema::{AdditionalProperties, JsonSchema, SchemaType};
use generics::{build_subst, substitute, ObjectShape, Subst};
use indexmap::IndexMap;
use refs::{reachable_defs, rewrite_refs, DEFS_PREFIX};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::trace;

/// Emit a single schema document (mode A).
pub fn emit(declarations: &[Declaration], options: &ConvertOptions) -> Result<JsonSchema> {
    Emitter::new(declarations, options)?.emit_document()
}

/// Emit one self-contained schema per declaration (mode B).
pub fn emit_all(
    declarations: &[Declaration],
    options: &ConvertOptions,
) -> Result<IndexMap<String, JsonSchema>> {
    Emitter::new(declarations, options)?.emit_batch()
}

pub(crate) struct Emitter<'a> {
    declarations: &'a [Declaration],
    options: &'a ConvertOptions,
    /// Declarations by original name.
    by_name: FxHashMap<&'a str, &'a Declaration>,
    /// Original name → transformed name, in declaration order.
    names: IndexMap<String, String>,
    /// Names of declarations that get their own definition. Generic
    /// declarations are inlined at instantiation sites and appear here
    /// only when something references them without type arguments.
    emitted: FxHashSet<String>,
}

impl<'a> Emitter<'a> {
    fn new(declarations: &'a [Declaration], options: &'a ConvertOptions) -> Result<Self> {
        let mut by_name = FxHashMap::default();
        for declaration in declarations {
            by_name.entry(declaration.name()).or_insert(declaration);
        }

        let mut names = IndexMap::new();
        let mut reverse: FxHashMap<String, String> = FxHashMap::default();
        for declaration in declarations {
            let original = declaration.name().to_string();
            let transformed = match &options.name_transform {
                Some(transform) => {
                    transform(&original, declaration).map_err(|message| Error::Callback {
                        type_name: original.clone(),
                        message,
                    })?
                }
                None => original.clone(),
            };
            if let Some(first) = reverse.get(&transformed) {
                if first != &original {
                    return Err(Error::NameCollision {
                        transformed,
                        first: first.clone(),
                        second: original,
                    });
                }
            }
            reverse.insert(transformed.clone(), original.clone());
            names.insert(original, transformed);
        }

        let argumentless = argumentless_references(declarations);
        let emitted = declarations
            .iter()
            .filter(|declaration| {
                !declaration.is_generic() || argumentless.contains(declaration.name())
            })
            .map(|declaration| declaration.name().to_string())
            .collect();

        Ok(Emitter {
            declarations,
            options,
            by_name,
            names,
            emitted,
        })
    }

    fn ref_name(&self, original: &str) -> String {
        self.names
            .get(original)
            .cloned()
            .unwrap_or_else(|| original.to_string())
    }

    fn def_pointer(&self, original: &str) -> String {
        format!("{DEFS_PREFIX}{}", self.ref_name(original))
    }

    // =========================================================================
    // Document assembly
    // =========================================================================

    /// The declaration emitted at the document root: the requested
    /// `root_type` when it names an emitted declaration, otherwise the
    /// first exported declaration, otherwise the first declaration.
    fn root_declaration(&self) -> Option<&'a Declaration> {
        if let Some(requested) = &self.options.root_type {
            if self.emitted.contains(requested.as_str()) {
                return self.by_name.get(requested.as_str()).copied();
            }
        }
        let candidates = self
            .declarations
            .iter()
            .filter(|declaration| self.emitted.contains(declaration.name()));
        candidates
            .clone()
            .find(|declaration| declaration.exported())
            .or_else(|| candidates.clone().next())
    }

    fn emit_definitions(&self) -> Result<IndexMap<String, JsonSchema>> {
        let mut defs = IndexMap::new();
        for declaration in self.declarations {
            if !self.emitted.contains(declaration.name()) {
                continue;
            }
            trace!(name = declaration.name(), "emitting declaration");
            defs.insert(
                self.ref_name(declaration.name()).to_string(),
                self.emit_declaration(declaration)?,
            );
        }
        Ok(defs)
    }

    fn emit_document(&self) -> Result<JsonSchema> {
        let mut defs = self.emit_definitions()?;
        let mut document = match self.root_declaration() {
            None => JsonSchema::default(),
            Some(root) => {
                let transformed = self.ref_name(root.name()).to_string();
                let self_referential = reachable_defs(&defs, &transformed).contains(&transformed);
                if self_referential {
                    // Recursion requires the root to stay addressable
                    // under $defs; the document root is a bare $ref.
                    JsonSchema::reference(format!("{DEFS_PREFIX}{transformed}"))
                } else {
                    defs.shift_remove(&transformed).unwrap_or_default()
                }
            }
        };
        if !defs.is_empty() {
            document.defs = Some(defs);
        }
        if self.options.include_schema {
            document.schema = Some(self.options.schema_version.clone());
        }
        Ok(document)
    }

    fn emit_batch(&self) -> Result<IndexMap<String, JsonSchema>> {
        let defs = self.emit_definitions()?;
        let ids = self.batch_ids()?;
        let mut output = IndexMap::new();

        for declaration in self.declarations {
            if !self.emitted.contains(declaration.name()) {
                continue;
            }
            let transformed = self.ref_name(declaration.name()).to_string();
            let mut entry = match defs.get(&transformed) {
                Some(schema) => schema.clone(),
                None => continue,
            };

            match &ids {
                Some(ids) => {
                    rewrite_refs(&mut entry, &|pointer: &str| {
                        pointer
                            .strip_prefix(DEFS_PREFIX)
                            .and_then(|name| ids.get(name).cloned())
                    });
                    let id = match ids.get(&transformed) {
                        Some(id) => id.clone(),
                        None => continue,
                    };
                    entry.id = Some(id.clone());
                    if self.options.include_schema {
                        entry.schema = Some(self.options.schema_version.clone());
                    }
                    output.insert(id, entry);
                }
                None => {
                    // Only the entry's transitive dependencies travel
                    // with it; the entry itself joins them when it is
                    // self-referential.
                    let reachable = reachable_defs(&defs, &transformed);
                    let mut definitions = IndexMap::new();
                    for (name, schema) in &defs {
                        if reachable.contains(name) {
                            let mut dependency = schema.clone();
                            rewrite_to_definitions(&mut dependency);
                            definitions.insert(name.clone(), dependency);
                        }
                    }
                    rewrite_to_definitions(&mut entry);
                    if !definitions.is_empty() {
                        entry.definitions = Some(definitions);
                    }
                    if self.options.include_schema {
                        entry.schema = Some(self.options.schema_version.clone());
                    }
                    output.insert(transformed, entry);
                }
            }
        }
        Ok(output)
    }

    /// Transformed name → external id, when an id provider is set.
    fn batch_ids(&self) -> Result<Option<IndexMap<String, String>>> {
        let Some(provider) = &self.options.id_provider else {
            return Ok(None);
        };
        let mut ids = IndexMap::new();
        let mut first_owner: FxHashMap<String, String> = FxHashMap::default();
        for declaration in self.declarations {
            if !self.emitted.contains(declaration.name()) {
                continue;
            }
            let original = declaration.name().to_string();
            let id = provider(&original, declaration).map_err(|message| Error::Callback {
                type_name: original.clone(),
                message,
            })?;
            if let Some(first) = first_owner.get(&id) {
                return Err(Error::DuplicateId {
                    id,
                    first: first.clone(),
                    second: original,
                });
            }
            first_owner.insert(id.clone(), original.clone());
            ids.insert(self.ref_name(&original).to_string(), id);
        }
        Ok(Some(ids))
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn emit_declaration(&self, declaration: &Declaration) -> Result<JsonSchema> {
        // A generic declaration only gets a standalone definition when
        // referenced argumentless; its parameters erase to `any`.
        let erased: Subst = declaration
            .type_params()
            .iter()
            .map(|param| {
                (
                    param.clone(),
                    TypeNode::primitive(PrimitiveKind::Any),
                )
            })
            .collect();

        match declaration {
            Declaration::Interface(_) => {
                let mut visiting = FxHashSet::default();
                visiting.insert(declaration.name().to_string());
                let args: Vec<TypeNode> = declaration
                    .type_params()
                    .iter()
                    .map(|_| TypeNode::primitive(PrimitiveKind::Any))
                    .collect();
                let shape = self.interface_shape(declaration, &args, &mut visiting)?;
                self.emit_object(&shape, self.declaration_ap_tag(declaration.base()), Some(declaration.base()))
            }
            Declaration::TypeAlias(alias) => {
                let body = if erased.is_empty() {
                    alias.ty.clone()
                } else {
                    substitute(&alias.ty, &erased)
                };
                if matches!(body.unparenthesized(), TypeNode::Object { .. }) {
                    let mut visiting = FxHashSet::default();
                    let shape = self
                        .object_shape(&body, &mut visiting)?
                        .unwrap_or_default();
                    self.emit_object(&shape, self.declaration_ap_tag(&alias.base), Some(&alias.base))
                } else {
                    let mut schema = self.emit_type(&body)?;
                    self.apply_declaration_doc(&mut schema, &alias.base);
                    Ok(schema)
                }
            }
            Declaration::Enum(decl) => {
                let mut schema = self.emit_enum(&decl.members);
                self.apply_declaration_doc(&mut schema, &decl.base);
                Ok(schema)
            }
        }
    }

    fn emit_enum(&self, members: &[crate::ast::EnumMember]) -> JsonSchema {
        let values: Vec<Value> = members
            .iter()
            .map(|member| match &member.value {
                EnumValue::String(text) => Value::String(text.clone()),
                EnumValue::Number(number) => number_value(*number),
            })
            .collect();
        let all_strings = members
            .iter()
            .all(|member| matches!(member.value, EnumValue::String(_)));
        let all_numbers = members
            .iter()
            .all(|member| matches!(member.value, EnumValue::Number(_)));
        let ty = if members.is_empty() {
            None
        } else if all_strings {
            Some(SchemaType::single("string"))
        } else if all_numbers {
            Some(SchemaType::single("number"))
        } else {
            None
        };
        JsonSchema {
            ty,
            enum_values: Some(values),
            ..JsonSchema::default()
        }
    }

    fn declaration_ap_tag(&self, base: &DeclarationBase) -> Option<bool> {
        if !self.options.include_jsdoc {
            return None;
        }
        ap_tag_of(&base.tags)
    }

    fn apply_declaration_doc(&self, schema: &mut JsonSchema, base: &DeclarationBase) {
        if !self.options.include_jsdoc {
            return;
        }
        if let Some(description) = &base.description {
            schema.description = Some(description.clone());
        }
        apply_tags(schema, &base.tags);
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn emit_type(&self, node: &TypeNode) -> Result<JsonSchema> {
        match node {
            TypeNode::Primitive { primitive } => Ok(emit_primitive(*primitive)),
            TypeNode::LiteralString { value } => {
                Ok(JsonSchema::constant(Value::String(value.clone())))
            }
            TypeNode::LiteralNumber { value } => Ok(JsonSchema::constant(number_value(*value))),
            TypeNode::LiteralBoolean { value } => Ok(JsonSchema::constant(Value::Bool(*value))),
            TypeNode::Object { .. } => {
                let mut visiting = FxHashSet::default();
                let shape = self.object_shape(node, &mut visiting)?.unwrap_or_default();
                self.emit_object(&shape, None, None)
            }
            TypeNode::Array { element } => Ok(JsonSchema {
                ty: Some(SchemaType::single("array")),
                items: Some(Box::new(self.emit_type(element)?)),
                ..JsonSchema::default()
            }),
            TypeNode::Tuple { elements } => self.emit_tuple(elements),
            TypeNode::Union { members } => self.emit_union(members),
            TypeNode::Intersection { members } => {
                if members.len() == 1 {
                    return self.emit_type(&members[0]);
                }
                let schemas = members
                    .iter()
                    .map(|member| self.emit_type(member))
                    .collect::<Result<Vec<_>>>()?;
                Ok(JsonSchema {
                    all_of: Some(schemas),
                    ..JsonSchema::default()
                })
            }
            TypeNode::Reference { name, type_args } => {
                self.emit_reference(name, type_args.as_deref())
            }
            TypeNode::Parenthesized { inner } => self.emit_type(inner),
            TypeNode::Record { key, value } => self.emit_record(key, value),
            // Best effort: template literals are strings, mapped types
            // are objects.
            TypeNode::TemplateLiteral { .. } => Ok(JsonSchema::of_type("string")),
            TypeNode::Mapped { .. } => Ok(JsonSchema::of_type("object")),
        }
    }

    fn emit_reference(&self, name: &str, type_args: Option<&[TypeNode]>) -> Result<JsonSchema> {
        let Some(args) = type_args else {
            if name == "Date" {
                return Ok(JsonSchema {
                    ty: Some(SchemaType::single("string")),
                    format: Some("date-time".to_string()),
                    ..JsonSchema::default()
                });
            }
            return Ok(JsonSchema::reference(self.def_pointer(name)));
        };

        if let Some(schema) = self.emit_utility(name, args)? {
            return Ok(schema);
        }

        match self.by_name.get(name).copied() {
            Some(declaration @ Declaration::Interface(_)) => {
                let mut visiting = FxHashSet::default();
                visiting.insert(name.to_string());
                let shape = self.interface_shape(declaration, args, &mut visiting)?;
                self.emit_object(
                    &shape,
                    self.declaration_ap_tag(declaration.base()),
                    Some(declaration.base()),
                )
            }
            Some(Declaration::TypeAlias(alias)) => {
                let body = substitute(&alias.ty, &build_subst(&alias.type_params, args));
                let mut schema = self.emit_type(&body)?;
                self.apply_declaration_doc(&mut schema, &alias.base);
                Ok(schema)
            }
            // Unknown target or an enum with arguments: keep the
            // reference, arguments have nothing to bind to.
            _ => Ok(JsonSchema::reference(self.def_pointer(name))),
        }
    }

    fn emit_record(&self, key: &TypeNode, value: &TypeNode) -> Result<JsonSchema> {
        if let Some(keys) = self.literal_string_keys(key) {
            let mut properties = IndexMap::new();
            for name in &keys {
                properties.insert(name.clone(), self.emit_type(value)?);
            }
            return Ok(JsonSchema {
                ty: Some(SchemaType::single("object")),
                properties: Some(properties),
                required: Some(keys),
                additional_properties: self.decide_additional_properties(None, None)?,
                ..JsonSchema::default()
            });
        }
        Ok(JsonSchema {
            ty: Some(SchemaType::single("object")),
            additional_properties: Some(AdditionalProperties::Schema(Box::new(
                self.emit_type(value)?,
            ))),
            ..JsonSchema::default()
        })
    }

    fn emit_tuple(&self, elements: &[TupleElement]) -> Result<JsonSchema> {
        let (rest, prefix): (Vec<&TupleElement>, Vec<&TupleElement>) =
            elements.iter().partition(|element| element.rest);

        let mut prefix_items = Vec::with_capacity(prefix.len());
        for element in &prefix {
            prefix_items.push(self.emit_type(&element.ty)?);
        }
        let min_items = prefix.iter().filter(|element| !element.optional).count() as u64;

        // The rest element is written as an array type; its element
        // schema becomes `items`.
        let items = match rest.first() {
            Some(element) => Some(Box::new(match element.ty.unparenthesized() {
                TypeNode::Array { element } => self.emit_type(element)?,
                other => self.emit_type(other)?,
            })),
            None => None,
        };

        Ok(JsonSchema {
            ty: Some(SchemaType::single("array")),
            prefix_items: (!prefix_items.is_empty()).then_some(prefix_items),
            items,
            min_items: Some(min_items),
            max_items: rest.is_empty().then_some(prefix.len() as u64),
            ..JsonSchema::default()
        })
    }

    fn emit_union(&self, members: &[TypeNode]) -> Result<JsonSchema> {
        let mut flat = Vec::new();
        flatten_union(members, &mut flat);

        if flat
            .iter()
            .all(|member| matches!(member, TypeNode::LiteralString { .. }))
        {
            let values = flat
                .iter()
                .map(|member| match member {
                    TypeNode::LiteralString { value } => Value::String(value.clone()),
                    _ => Value::Null,
                })
                .collect();
            return Ok(JsonSchema {
                ty: Some(SchemaType::single("string")),
                enum_values: Some(values),
                ..JsonSchema::default()
            });
        }
        if flat
            .iter()
            .all(|member| matches!(member, TypeNode::LiteralNumber { .. }))
        {
            let values = flat
                .iter()
                .map(|member| match member {
                    TypeNode::LiteralNumber { value } => number_value(*value),
                    _ => Value::Null,
                })
                .collect();
            return Ok(JsonSchema {
                ty: Some(SchemaType::single("number")),
                enum_values: Some(values),
                ..JsonSchema::default()
            });
        }

        let (nullish, rest): (Vec<&TypeNode>, Vec<&TypeNode>) = flat
            .iter()
            .copied()
            .partition(|member| member.is_null_or_undefined());

        if !nullish.is_empty() {
            if rest.is_empty() {
                return Ok(JsonSchema::of_type("null"));
            }
            if rest.len() == 1 {
                let mut schema = self.emit_type(rest[0])?;
                // The `["T", "null"]` shorthand only works for a plain
                // single-type member; composites get an anyOf.
                if let Some(single) = schema.ty.as_ref().and_then(SchemaType::as_single) {
                    schema.ty = Some(SchemaType::Many(vec![
                        single.to_string(),
                        "null".to_string(),
                    ]));
                    return Ok(schema);
                }
                return Ok(JsonSchema {
                    any_of: Some(vec![schema, JsonSchema::of_type("null")]),
                    ..JsonSchema::default()
                });
            }
        }

        let mut schemas = Vec::with_capacity(rest.len() + 1);
        for member in rest {
            schemas.push(self.emit_type(member)?);
        }
        if !nullish.is_empty() {
            schemas.push(JsonSchema::of_type("null"));
        }
        Ok(JsonSchema {
            any_of: Some(schemas),
            ..JsonSchema::default()
        })
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Emit an object schema from a resolved shape. `ap_tag` is the
    /// `@additionalProperties` doc tag attached to the declaration or
    /// property this object came from; `base` carries declaration-level
    /// docs.
    fn emit_object(
        &self,
        shape: &ObjectShape,
        ap_tag: Option<bool>,
        base: Option<&DeclarationBase>,
    ) -> Result<JsonSchema> {
        let mut properties = IndexMap::new();
        let mut required = Vec::new();

        for property in &shape.properties {
            let mut schema = match property.ty.unparenthesized() {
                // Inline object types pick up a property-level
                // @additionalProperties tag.
                TypeNode::Object { .. } => {
                    let mut visiting = FxHashSet::default();
                    let inner = self
                        .object_shape(&property.ty, &mut visiting)?
                        .unwrap_or_default();
                    let tag = if self.options.include_jsdoc {
                        ap_tag_of(&property.tags)
                    } else {
                        None
                    };
                    self.emit_object(&inner, tag, None)?
                }
                _ => self.emit_type(&property.ty)?,
            };
            if property.readonly {
                schema.read_only = Some(true);
            }
            if self.options.include_jsdoc {
                if let Some(description) = &property.description {
                    schema.description = Some(description.clone());
                }
                apply_tags(&mut schema, &property.tags);
            }
            if !property.optional {
                required.push(property.name.clone());
            }
            properties.insert(property.name.clone(), schema);
        }

        let mut schema = JsonSchema {
            ty: Some(SchemaType::single("object")),
            properties: (!properties.is_empty()).then_some(properties),
            required: (!required.is_empty()).then_some(required),
            additional_properties: self
                .decide_additional_properties(shape.index_signature.as_ref(), ap_tag)?,
            ..JsonSchema::default()
        };
        if let Some(base) = base {
            self.apply_declaration_doc(&mut schema, &base.clone_without_ap_tag());
        }
        Ok(schema)
    }

    /// The `additionalProperties` decision, concentrated in one place.
    /// Strict precedence, first match wins: index signature, doc tag,
    /// `strict_objects`, the `additional_properties` option, absent.
    fn decide_additional_properties(
        &self,
        index_signature: Option<&IndexSignature>,
        tag: Option<bool>,
    ) -> Result<Option<AdditionalProperties>> {
        if let Some(signature) = index_signature {
            return Ok(Some(AdditionalProperties::Schema(Box::new(
                self.emit_type(&signature.value_type)?,
            ))));
        }
        if let Some(value) = tag {
            return Ok(Some(AdditionalProperties::Bool(value)));
        }
        if self.options.strict_objects {
            return Ok(Some(AdditionalProperties::Bool(false)));
        }
        if let Some(value) = self.options.additional_properties {
            return Ok(Some(AdditionalProperties::Bool(value)));
        }
        Ok(None)
    }
}

impl DeclarationBase {
    /// The additionalProperties tag routes through the precedence
    /// helper; the generic tag application must not see it again.
    fn clone_without_ap_tag(&self) -> DeclarationBase {
        let mut base = self.clone();
        base.tags
            .retain(|key, _| !key.eq_ignore_ascii_case("additionalProperties"));
        base
    }
}

fn rewrite_to_definitions(schema: &mut JsonSchema) {
    rewrite_refs(schema, &|pointer: &str| {
        pointer
            .strip_prefix(DEFS_PREFIX)
            .map(|name| format!("#/definitions/{name}"))
    });
}

fn emit_primitive(primitive: PrimitiveKind) -> JsonSchema {
    match primitive {
        PrimitiveKind::String => JsonSchema::of_type("string"),
        PrimitiveKind::Number => JsonSchema::of_type("number"),
        PrimitiveKind::Boolean => JsonSchema::of_type("boolean"),
        PrimitiveKind::Null => JsonSchema::of_type("null"),
        PrimitiveKind::Object => JsonSchema::of_type("object"),
        PrimitiveKind::BigInt => JsonSchema::of_type("integer"),
        PrimitiveKind::Never => JsonSchema::never(),
        PrimitiveKind::Undefined
        | PrimitiveKind::Void
        | PrimitiveKind::Any
        | PrimitiveKind::Unknown => JsonSchema::any(),
    }
}

/// Flatten nested unions (through parentheses) into one member list.
fn flatten_union<'n>(members: &'n [TypeNode], out: &mut Vec<&'n TypeNode>) {
    for member in members {
        match member.unparenthesized() {
            TypeNode::Union { members } => flatten_union(members, out),
            other => out.push(other),
        }
    }
}

/// Names referenced without type arguments anywhere in the declaration
/// set; generic declarations outside this set are never emitted
/// standalone.
fn argumentless_references(declarations: &[Declaration]) -> FxHashSet<String> {
    let mut found = FxHashSet::default();
    let mut walk = |node: &TypeNode| collect_argumentless(node, &mut found);
    for declaration in declarations {
        match declaration {
            Declaration::Interface(interface) => {
                for base in &interface.extends {
                    walk(base);
                }
                for property in &interface.properties {
                    walk(&property.ty);
                }
                if let Some(signature) = &interface.index_signature {
                    walk(&signature.key_type);
                    walk(&signature.value_type);
                }
            }
            Declaration::TypeAlias(alias) => walk(&alias.ty),
            Declaration::Enum(_) => {}
        }
    }
    found
}

fn collect_argumentless(node: &TypeNode, out: &mut FxHashSet<String>) {
    match node {
        TypeNode::Reference {
            name,
            type_args: None,
        } => {
            out.insert(name.clone());
        }
        TypeNode::Reference {
            name: _,
            type_args: Some(args),
        } => {
            for arg in args {
                collect_argumentless(arg, out);
            }
        }
        TypeNode::Object {
            properties,
            index_signature,
        } => {
            for property in properties {
                collect_argumentless(&property.ty, out);
            }
            if let Some(signature) = index_signature {
                collect_argumentless(&signature.key_type, out);
                collect_argumentless(&signature.value_type, out);
            }
        }
        TypeNode::Array { element } => collect_argumentless(element, out),
        TypeNode::Tuple { elements } => {
            for element in elements {
                collect_argumentless(&element.ty, out);
            }
        }
        TypeNode::Union { members } | TypeNode::Intersection { members } => {
            for member in members {
                collect_argumentless(member, out);
            }
        }
        TypeNode::Parenthesized { inner } => collect_argumentless(inner, out),
        TypeNode::Record { key, value } => {
            collect_argumentless(key, out);
            collect_argumentless(value, out);
        }
        TypeNode::Mapped {
            constraint, value, ..
        } => {
            collect_argumentless(constraint, out);
            collect_argumentless(value, out);
        }
        _ => {}
    }
}

/// Whole numbers serialize as integers, everything else as floats.
fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.is_finite() && number.abs() < i64::MAX as f64 {
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Parse the `@additionalProperties` tag value, case-insensitively.
fn ap_tag_of(tags: &IndexMap<String, String>) -> Option<bool> {
    let value = tags
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("additionalProperties"))
        .map(|(_, value)| value.trim())?;
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Apply JSDoc tags to an emitted schema. `additionalProperties` is
/// deliberately absent here; it participates in the precedence decision
/// instead.
fn apply_tags(schema: &mut JsonSchema, tags: &IndexMap<String, String>) {
    for (tag, raw) in tags {
        let raw = raw.trim();
        match tag.as_str() {
            "minimum" => schema.minimum = raw.parse().ok().or(schema.minimum),
            "maximum" => schema.maximum = raw.parse().ok().or(schema.maximum),
            "multipleOf" => schema.multiple_of = raw.parse().ok().or(schema.multiple_of),
            "minLength" => schema.min_length = raw.parse().ok().or(schema.min_length),
            "maxLength" => schema.max_length = raw.parse().ok().or(schema.max_length),
            "pattern" => schema.pattern = Some(raw.to_string()),
            "format" => schema.format = Some(raw.to_string()),
            "title" => schema.title = Some(raw.to_string()),
            "default" => schema.default = Some(parse_tag_value(raw)),
            "deprecated" => schema.deprecated = Some(true),
            "example" => schema
                .examples
                .get_or_insert_with(Vec::new)
                .push(parse_tag_value(raw)),
            "examples" => match parse_tag_value(raw) {
                Value::Array(values) => schema
                    .examples
                    .get_or_insert_with(Vec::new)
                    .extend(values),
                value => schema.examples.get_or_insert_with(Vec::new).push(value),
            },
            _ => {}
        }
    }
}

/// Tag values are JSON when they parse as JSON, text otherwise.
fn parse_tag_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_resolver::merge_declarations;
    use crate::options::DuplicatePolicy;
    use crate::parser;
    use crate::tokenizer::tokenize;
    use serde_json::json;

    fn declarations(source: &str) -> Vec<Declaration> {
        let parsed = parser::parse(tokenize(source)).expect("parse failed");
        merge_declarations(parsed, DuplicatePolicy::Error).expect("merge failed")
    }

    fn emit_value(source: &str, options: &ConvertOptions) -> Value {
        let schema = emit(&declarations(source), options).expect("emit failed");
        serde_json::to_value(schema).expect("serialize failed")
    }

    fn bare_options() -> ConvertOptions {
        ConvertOptions {
            include_schema: false,
            ..ConvertOptions::default()
        }
    }

    #[test]
    fn primitives_and_optional_properties() {
        let value = emit_value(
            "interface User { name: string; age?: number; active: boolean; }",
            &ConvertOptions {
                root_type: Some("User".to_string()),
                ..bare_options()
            },
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
    fn string_literal_union_becomes_enum() {
        let value = emit_value("type Status = \"a\" | \"b\" | \"c\";", &bare_options());
        assert_eq!(value, json!({"type": "string", "enum": ["a", "b", "c"]}));
    }

    #[test]
    fn number_literal_union_becomes_enum() {
        let value = emit_value("type Level = 1 | 2 | 3;", &bare_options());
        assert_eq!(value, json!({"type": "number", "enum": [1, 2, 3]}));
    }

    #[test]
    fn union_of_unions_flattens() {
        let nested = emit_value("type AB = (\"a\" | \"b\") | (\"c\" | \"d\");", &bare_options());
        let flat = emit_value("type AB = \"a\" | \"b\" | \"c\" | \"d\";", &bare_options());
        assert_eq!(nested, flat);
    }

    #[test]
    fn nullable_single_type_uses_type_array() {
        let value = emit_value("type N = string | null;", &bare_options());
        assert_eq!(value, json!({"type": ["string", "null"]}));
        let undef = emit_value("type N = string | undefined;", &bare_options());
        assert_eq!(undef, json!({"type": ["string", "null"]}));
    }

    #[test]
    fn nullable_composite_uses_any_of() {
        let value = emit_value(
            "interface A { x: string }\ntype N = A | null;",
            &ConvertOptions {
                root_type: Some("N".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(
            value["anyOf"],
            json!([{"$ref": "#/$defs/A"}, {"type": "null"}])
        );
    }

    #[test]
    fn mixed_union_uses_any_of() {
        let value = emit_value("type M = string | number;", &bare_options());
        assert_eq!(
            value,
            json!({"anyOf": [{"type": "string"}, {"type": "number"}]})
        );
    }

    #[test]
    fn intersection_becomes_all_of() {
        let value = emit_value(
            "interface A { x: string }\ninterface B { y: number }\ntype C = A & B;",
            &ConvertOptions {
                root_type: Some("C".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(
            value["allOf"],
            json!([{"$ref": "#/$defs/A"}, {"$ref": "#/$defs/B"}])
        );
    }

    #[test]
    fn self_referential_root_stays_in_defs() {
        let value = emit_value(
            "interface T { v: string; kids: T[]; }",
            &ConvertOptions {
                root_type: Some("T".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(value["$ref"], json!("#/$defs/T"));
        assert_eq!(
            value["$defs"]["T"]["properties"]["kids"],
            json!({"type": "array", "items": {"$ref": "#/$defs/T"}})
        );
    }

    #[test]
    fn mutually_recursive_roots_stay_in_defs() {
        let value = emit_value(
            "interface A { b: B }\ninterface B { a: A }",
            &ConvertOptions {
                root_type: Some("A".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(value["$ref"], json!("#/$defs/A"));
        assert!(value["$defs"]["A"].is_object());
        assert!(value["$defs"]["B"].is_object());
    }

    #[test]
    fn non_recursive_root_is_inlined() {
        let value = emit_value(
            "interface Pet { name: string }\nexport interface Req { pet: Pet }",
            &bare_options(),
        );
        assert_eq!(value["type"], json!("object"));
        assert_eq!(value["properties"]["pet"], json!({"$ref": "#/$defs/Pet"}));
        assert!(value["$defs"]["Pet"].is_object());
        assert!(value["$defs"].get("Req").is_none());
    }

    #[test]
    fn omit_in_extends_with_ap_tag() {
        let value = emit_value(
            "interface Pet { _id: string; name: string; }\n/** @additionalProperties false */\nexport interface PostPetReq extends Omit<Pet, \"_id\"> {}",
            &bare_options(),
        );
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"],
                "additionalProperties": false,
                "$defs": {
                    "Pet": {
                        "type": "object",
                        "properties": {
                            "_id": {"type": "string"},
                            "name": {"type": "string"}
                        },
                        "required": ["_id", "name"]
                    }
                }
            })
        );
    }

    #[test]
    fn pick_and_omit_duality() {
        let source = "interface T { a: string; b: number; c: boolean; }\ntype P = Pick<T, \"a\" | \"b\">;\ntype O = Omit<T, \"a\" | \"b\">;";
        let picked = emit_value(
            source,
            &ConvertOptions {
                root_type: Some("P".to_string()),
                ..bare_options()
            },
        );
        let keys: Vec<&str> = picked["properties"]
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["a", "b"]);

        let omitted = emit_value(
            source,
            &ConvertOptions {
                root_type: Some("O".to_string()),
                ..bare_options()
            },
        );
        let keys: Vec<&str> = omitted["properties"]
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["c"]);
    }

    #[test]
    fn partial_and_required_rewrite_optionality() {
        let source = "interface T { a: string; b?: number; }\ntype P = Partial<T>;\ntype R = Required<T>;";
        let partial = emit_value(
            source,
            &ConvertOptions {
                root_type: Some("P".to_string()),
                ..bare_options()
            },
        );
        assert!(partial.get("required").is_none());
        let required = emit_value(
            source,
            &ConvertOptions {
                root_type: Some("R".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(required["required"], json!(["a", "b"]));
    }

    #[test]
    fn record_forms() {
        let keyed = emit_value("type R = Record<\"a\" | \"b\", number>;", &bare_options());
        assert_eq!(
            keyed,
            json!({
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a", "b"]
            })
        );
        let open = emit_value("type R = Record<string, number>;", &bare_options());
        assert_eq!(
            open,
            json!({"type": "object", "additionalProperties": {"type": "number"}})
        );
    }

    #[test]
    fn set_map_and_date() {
        let value = emit_value(
            "interface X { tags: Set<string>; counts: Map<string, number>; at: Date; }",
            &bare_options(),
        );
        assert_eq!(
            value["properties"]["tags"],
            json!({"type": "array", "items": {"type": "string"}, "uniqueItems": true})
        );
        assert_eq!(
            value["properties"]["counts"],
            json!({"type": "object", "additionalProperties": {"type": "number"}})
        );
        assert_eq!(
            value["properties"]["at"],
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[test]
    fn exclude_and_extract_on_literal_unions() {
        let source = "type All = \"a\" | \"b\" | \"c\";\ntype Rest = Exclude<All, \"a\">;\ntype Only = Extract<All, \"a\" | \"b\">;";
        let rest = emit_value(
            source,
            &ConvertOptions {
                root_type: Some("Rest".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(rest, json!({"type": "string", "enum": ["b", "c"]}));
        let only = emit_value(
            source,
            &ConvertOptions {
                root_type: Some("Only".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(only, json!({"type": "string", "enum": ["a", "b"]}));
    }

    #[test]
    fn tuples() {
        let fixed = emit_value("type T = [string, number?];", &bare_options());
        assert_eq!(
            fixed,
            json!({
                "type": "array",
                "prefixItems": [{"type": "string"}, {"type": "number"}],
                "minItems": 1,
                "maxItems": 2
            })
        );
        let rest = emit_value("type T = [string, ...number[]];", &bare_options());
        assert_eq!(
            rest,
            json!({
                "type": "array",
                "prefixItems": [{"type": "string"}],
                "items": {"type": "number"},
                "minItems": 1
            })
        );
    }

    #[test]
    fn generic_instantiation_inline() {
        let value = emit_value(
            "type Wrapper<T> = { value: T; at: number };\ntype S = Wrapper<string>;",
            &ConvertOptions {
                root_type: Some("S".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(
            value["properties"]["value"],
            json!({"type": "string"}),
        );
        assert!(value.get("$defs").is_none(), "generic must not be declared");
    }

    #[test]
    fn generic_interface_in_extends() {
        let value = emit_value(
            "interface Box<T> { value: T }\nexport interface StringBox extends Box<string> { label: string }",
            &bare_options(),
        );
        assert_eq!(value["properties"]["value"], json!({"type": "string"}));
        assert_eq!(value["properties"]["label"], json!({"type": "string"}));
        assert_eq!(value["required"], json!(["value", "label"]));
    }

    #[test]
    fn conventional_param_names_when_unrecorded() {
        // The substitution map also carries the positional table, so a
        // body written against `T`/`U` resolves either way.
        let value = emit_value(
            "type Pair<T, U> = [T, U];\ntype P = Pair<string, number>;",
            &ConvertOptions {
                root_type: Some("P".to_string()),
                ..bare_options()
            },
        );
        assert_eq!(
            value["prefixItems"],
            json!([{"type": "string"}, {"type": "number"}])
        );
    }

    #[test]
    fn additional_properties_precedence() {
        // Index signature beats tag, strictObjects, and the option.
        let source = "/** @additionalProperties true */\ninterface X { [k: string]: number }";
        let options = ConvertOptions {
            strict_objects: true,
            additional_properties: Some(false),
            ..bare_options()
        };
        let value = emit_value(source, &options);
        assert_eq!(value["additionalProperties"], json!({"type": "number"}));

        // Tag beats strictObjects and the option.
        let source = "/** @additionalProperties true */\ninterface X { a: string }";
        let value = emit_value(source, &options);
        assert_eq!(value["additionalProperties"], json!(true));

        // strictObjects beats the option.
        let source = "interface X { a: string }";
        let value = emit_value(source, &options);
        assert_eq!(value["additionalProperties"], json!(false));

        // The option applies last.
        let options = ConvertOptions {
            additional_properties: Some(true),
            ..bare_options()
        };
        let value = emit_value(source, &options);
        assert_eq!(value["additionalProperties"], json!(true));

        // Nothing set: field absent.
        let value = emit_value(source, &bare_options());
        assert!(value.get("additionalProperties").is_none());
    }

    #[test]
    fn jsdoc_constraints_and_suppression() {
        let source =
            "interface X { /** The count. @minimum 1 @maximum 50 @default 10 */ n: number; }";
        let with = emit_value(source, &bare_options());
        assert_eq!(
            with["properties"]["n"],
            json!({
                "type": "number",
                "description": "The count.",
                "minimum": 1.0,
                "maximum": 50.0,
                "default": 10
            })
        );

        let without = emit_value(
            source,
            &ConvertOptions {
                include_jsdoc: false,
                ..bare_options()
            },
        );
        assert_eq!(without["properties"]["n"], json!({"type": "number"}));
    }

    #[test]
    fn readonly_properties_and_index_signatures_survive_jsdoc_suppression() {
        let source = "/** Doc. */\ninterface X { readonly id: string; [k: string]: string }";
        let value = emit_value(
            source,
            &ConvertOptions {
                include_jsdoc: false,
                ..bare_options()
            },
        );
        assert!(value.get("description").is_none());
        assert_eq!(value["properties"]["id"]["readOnly"], json!(true));
        assert_eq!(value["additionalProperties"], json!({"type": "string"}));
    }

    #[test]
    fn enum_declarations() {
        let strings = emit_value(
            "enum Color { Red = \"red\", Blue = \"blue\" }",
            &bare_options(),
        );
        assert_eq!(strings, json!({"type": "string", "enum": ["red", "blue"]}));
        let numbers = emit_value("enum N { A, B, C = 10, D }", &bare_options());
        assert_eq!(numbers, json!({"type": "number", "enum": [0, 1, 10, 11]}));
    }

    #[test]
    fn name_transform_rewrites_defs_and_refs() {
        let options = ConvertOptions {
            name_transform: Some(std::sync::Arc::new(|name: &str, _: &Declaration| {
                Ok(format!("My{name}"))
            })),
            ..bare_options()
        };
        let value = emit_value(
            "interface Pet { name: string }\nexport interface Req { pet: Pet }",
            &options,
        );
        assert_eq!(value["properties"]["pet"], json!({"$ref": "#/$defs/MyPet"}));
        assert!(value["$defs"]["MyPet"].is_object());
    }

    #[test]
    fn name_transform_collision_fails() {
        let options = ConvertOptions {
            name_transform: Some(std::sync::Arc::new(|_: &str, _: &Declaration| {
                Ok("Same".to_string())
            })),
            ..bare_options()
        };
        let err = emit(
            &declarations("interface A { x: string }\ninterface B { y: string }"),
            &options,
        )
        .expect_err("collision expected");
        assert!(matches!(err, Error::NameCollision { .. }), "{err}");
    }

    #[test]
    fn callback_error_is_wrapped_with_type_name() {
        let options = ConvertOptions {
            name_transform: Some(std::sync::Arc::new(|_: &str, _: &Declaration| {
                Err("boom".to_string())
            })),
            ..bare_options()
        };
        let err = emit(&declarations("interface A { x: string }"), &options)
            .expect_err("callback failure expected");
        match err {
            Error::Callback { type_name, message } => {
                assert_eq!(type_name, "A");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn batch_carries_transitive_definitions() {
        let schemas = emit_all(
            &declarations(
                "interface Leaf { x: string }\ninterface Mid { leaf: Leaf }\ninterface Top { mid: Mid }",
            ),
            &bare_options(),
        )
        .expect("emit_all failed");
        let top = serde_json::to_value(&schemas["Top"]).expect("serialize");
        assert_eq!(top["properties"]["mid"], json!({"$ref": "#/definitions/Mid"}));
        let definitions = top["definitions"].as_object().expect("definitions");
        assert!(definitions.contains_key("Mid"));
        assert!(definitions.contains_key("Leaf"));
        assert!(!definitions.contains_key("Top"));

        let leaf = serde_json::to_value(&schemas["Leaf"]).expect("serialize");
        assert!(leaf.get("definitions").is_none());
    }

    #[test]
    fn batch_self_referential_entry_keeps_itself_in_definitions() {
        let schemas = emit_all(
            &declarations("interface Node { kids: Node[] }"),
            &bare_options(),
        )
        .expect("emit_all failed");
        let node = serde_json::to_value(&schemas["Node"]).expect("serialize");
        assert_eq!(
            node["properties"]["kids"]["items"],
            json!({"$ref": "#/definitions/Node"})
        );
        assert!(node["definitions"]["Node"].is_object());
    }

    #[test]
    fn batch_with_id_provider_uses_external_refs() {
        let options = ConvertOptions {
            id_provider: Some(std::sync::Arc::new(|name: &str, _: &Declaration| {
                Ok(format!("https://example.com/{name}.json"))
            })),
            ..bare_options()
        };
        let schemas = emit_all(
            &declarations("interface Pet { name: string }\ninterface Req { pet: Pet }"),
            &options,
        )
        .expect("emit_all failed");
        let req = serde_json::to_value(&schemas["https://example.com/Req.json"]).expect("serialize");
        assert_eq!(req["$id"], json!("https://example.com/Req.json"));
        assert_eq!(
            req["properties"]["pet"],
            json!({"$ref": "https://example.com/Pet.json"})
        );
        assert!(req.get("definitions").is_none());
    }

    #[test]
    fn duplicate_ids_fail() {
        let options = ConvertOptions {
            id_provider: Some(std::sync::Arc::new(|_: &str, _: &Declaration| {
                Ok("same-id".to_string())
            })),
            ..bare_options()
        };
        let err = emit_all(
            &declarations("interface A { x: string }\ninterface B { y: string }"),
            &options,
        )
        .expect_err("duplicate id expected");
        assert!(matches!(err, Error::DuplicateId { .. }), "{err}");
    }

    #[test]
    fn include_schema_prepends_version() {
        let value = emit_value("type T = string;", &ConvertOptions::default());
        assert_eq!(
            value["$schema"],
            json!("https://json-schema.org/draft/2020-12/schema")
        );
    }

    #[test]
    fn round_trip_property_counts() {
        let source = "interface Wide { a: string; b?: number; c: boolean[]; d: string; [k: string]: unknown }";
        let value = emit_value(source, &bare_options());
        assert_eq!(value["properties"].as_object().expect("object").len(), 4);
        assert_eq!(value["required"], json!(["a", "c", "d"]));
        assert!(value.get("additionalProperties").is_some());
    }
}
