//! Object-shape resolution and monomorphic generic instantiation.
//!
//! The emitter frequently needs the property list behind a type
//! expression: interface `extends` clauses are flattened, and the
//! shape-rewriting utility types (`Partial`, `Pick`, ...) operate on
//! properties rather than schemas. [`Emitter::object_shape`] resolves a
//! `TypeNode` to that property list, chasing references through the
//! declaration map and instantiating generics on the way.
//!
//! Instantiation substitutes argument trees for parameter names into a
//! fresh `TypeNode`; declared trees are never mutated. Parameter names
//! come from the declaration when the parser recorded them, with the
//! conventional positional table as a fallback.

use super::Emitter;
use crate::ast::{Declaration, IndexSignature, Property, TypeNode};
use crate::error::Result;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

/// Positional fallback names for generic parameters.
const PARAM_NAME_TABLE: &[&str] = &["T", "U", "V", "W", "K", "TKey", "TValue"];

/// A parameter-to-argument substitution.
pub(super) type Subst = FxHashMap<String, TypeNode>;

/// The resolved property list of an object-like type.
#[derive(Debug, Clone, Default)]
pub(super) struct ObjectShape {
    pub properties: Vec<Property>,
    pub index_signature: Option<IndexSignature>,
}

impl ObjectShape {
    /// Merge `other` on top of `self`: overriding properties replace in
    /// place, new ones append, a later index signature wins.
    fn absorb(&mut self, other: ObjectShape) {
        for property in other.properties {
            match self
                .properties
                .iter_mut()
                .find(|existing| existing.name == property.name)
            {
                Some(existing) => *existing = property,
                None => self.properties.push(property),
            }
        }
        if other.index_signature.is_some() {
            self.index_signature = other.index_signature;
        }
    }
}

/// Build the substitution for a declaration instantiated with `args`.
pub(super) fn build_subst(params: &[String], args: &[TypeNode]) -> Subst {
    let mut subst = Subst::default();
    for (position, arg) in args.iter().enumerate() {
        let name = params
            .get(position)
            .map(String::as_str)
            .or_else(|| PARAM_NAME_TABLE.get(position).copied());
        if let Some(name) = name {
            subst.insert(name.to_string(), arg.clone());
        }
    }
    subst
}

/// Produce a fresh tree with parameter references replaced.
pub(super) fn substitute(node: &TypeNode, subst: &Subst) -> TypeNode {
    match node {
        TypeNode::Reference {
            name,
            type_args: None,
        } => match subst.get(name) {
            Some(replacement) => replacement.clone(),
            None => node.clone(),
        },
        TypeNode::Reference {
            name,
            type_args: Some(args),
        } => TypeNode::Reference {
            name: name.clone(),
            type_args: Some(args.iter().map(|arg| substitute(arg, subst)).collect()),
        },
        TypeNode::Object {
            properties,
            index_signature,
        } => TypeNode::Object {
            properties: properties
                .iter()
                .map(|property| substitute_property(property, subst))
                .collect(),
            index_signature: index_signature
                .as_ref()
                .map(|signature| Box::new(substitute_signature(signature, subst))),
        },
        TypeNode::Array { element } => TypeNode::Array {
            element: Box::new(substitute(element, subst)),
        },
        TypeNode::Tuple { elements } => TypeNode::Tuple {
            elements: elements
                .iter()
                .map(|element| crate::ast::TupleElement {
                    ty: substitute(&element.ty, subst),
                    optional: element.optional,
                    label: element.label.clone(),
                    rest: element.rest,
                })
                .collect(),
        },
        TypeNode::Union { members } => TypeNode::Union {
            members: members
                .iter()
                .map(|member| substitute(member, subst))
                .collect(),
        },
        TypeNode::Intersection { members } => TypeNode::Intersection {
            members: members
                .iter()
                .map(|member| substitute(member, subst))
                .collect(),
        },
        TypeNode::Parenthesized { inner } => TypeNode::Parenthesized {
            inner: Box::new(substitute(inner, subst)),
        },
        TypeNode::Record { key, value } => TypeNode::Record {
            key: Box::new(substitute(key, subst)),
            value: Box::new(substitute(value, subst)),
        },
        TypeNode::Mapped {
            param,
            constraint,
            value,
            optional,
        } => TypeNode::Mapped {
            param: param.clone(),
            constraint: Box::new(substitute(constraint, subst)),
            value: Box::new(substitute(value, subst)),
            optional: *optional,
        },
        other => other.clone(),
    }
}

pub(super) fn substitute_property(property: &Property, subst: &Subst) -> Property {
    Property {
        name: property.name.clone(),
        ty: substitute(&property.ty, subst),
        optional: property.optional,
        readonly: property.readonly,
        description: property.description.clone(),
        tags: property.tags.clone(),
    }
}

fn substitute_signature(signature: &IndexSignature, subst: &Subst) -> IndexSignature {
    IndexSignature {
        key_type: substitute(&signature.key_type, subst),
        value_type: substitute(&signature.value_type, subst),
    }
}

impl<'a> Emitter<'a> {
    /// Resolve a type expression to its property list, or `None` when
    /// it is not object-like. `visiting` breaks reference cycles.
    pub(super) fn object_shape(
        &self,
        node: &TypeNode,
        visiting: &mut FxHashSet<String>,
    ) -> Result<Option<ObjectShape>> {
        match node.unparenthesized() {
            TypeNode::Object {
                properties,
                index_signature,
            } => Ok(Some(ObjectShape {
                properties: properties.clone(),
                index_signature: index_signature.as_deref().cloned(),
            })),
            TypeNode::Record { key, value } => {
                // A literal-keyed record is a plain object; anything
                // else is an index signature.
                if let Some(keys) = self.literal_string_keys(key) {
                    let properties = keys
                        .into_iter()
                        .map(|name| Property::new(name, (**value).clone()))
                        .collect();
                    Ok(Some(ObjectShape {
                        properties,
                        index_signature: None,
                    }))
                } else {
                    Ok(Some(ObjectShape {
                        properties: Vec::new(),
                        index_signature: Some(IndexSignature {
                            key_type: (**key).clone(),
                            value_type: (**value).clone(),
                        }),
                    }))
                }
            }
            TypeNode::Intersection { members } => {
                let mut merged: Option<ObjectShape> = None;
                for member in members {
                    if let Some(shape) = self.object_shape(member, visiting)? {
                        merged.get_or_insert_with(ObjectShape::default).absorb(shape);
                    }
                }
                Ok(merged)
            }
            TypeNode::Reference { name, type_args } => {
                let args = type_args.as_deref().unwrap_or(&[]);
                if let Some(shape) = self.utility_shape(name, args, visiting)? {
                    return Ok(Some(shape));
                }
                let Some(declaration) = self.by_name.get(name.as_str()).copied() else {
                    return Ok(None);
                };
                if !visiting.insert(name.clone()) {
                    return Ok(None);
                }
                let shape = match declaration {
                    Declaration::Interface(_) => {
                        Some(self.interface_shape(declaration, args, visiting)?)
                    }
                    Declaration::TypeAlias(alias) => {
                        let body = if args.is_empty() {
                            alias.ty.clone()
                        } else {
                            substitute(&alias.ty, &build_subst(&alias.type_params, args))
                        };
                        self.object_shape(&body, visiting)?
                    }
                    Declaration::Enum(_) => None,
                };
                visiting.remove(name);
                Ok(shape)
            }
            _ => Ok(None),
        }
    }

    /// The full property list of an interface: flattened `extends`
    /// bases first (in clause order), own members last, overriding by
    /// name.
    pub(super) fn interface_shape(
        &self,
        declaration: &Declaration,
        args: &[TypeNode],
        visiting: &mut FxHashSet<String>,
    ) -> Result<ObjectShape> {
        let Declaration::Interface(interface) = declaration else {
            return Ok(ObjectShape::default());
        };
        let subst = build_subst(&interface.type_params, args);

        let mut shape = ObjectShape::default();
        for base in &interface.extends {
            let base = if subst.is_empty() {
                base.clone()
            } else {
                substitute(base, &subst)
            };
            if let Some(base_shape) = self.object_shape(&base, visiting)? {
                shape.absorb(base_shape);
            }
        }

        let own = ObjectShape {
            properties: interface
                .properties
                .iter()
                .map(|property| {
                    if subst.is_empty() {
                        property.clone()
                    } else {
                        substitute_property(property, &subst)
                    }
                })
                .collect(),
            index_signature: interface.index_signature.as_deref().map(|signature| {
                if subst.is_empty() {
                    signature.clone()
                } else {
                    substitute_signature(signature, &subst)
                }
            }),
        };
        shape.absorb(own);
        Ok(shape)
    }

    /// Resolve a reference chain to the string-literal keys of a key
    /// type, used by `Record`, `Pick` and `Omit`.
    pub(super) fn literal_string_keys(&self, node: &TypeNode) -> Option<Vec<String>> {
        let mut visiting = FxHashSet::default();
        self.literal_string_keys_inner(node, &mut visiting)
    }

    fn literal_string_keys_inner(
        &self,
        node: &TypeNode,
        visiting: &mut FxHashSet<String>,
    ) -> Option<Vec<String>> {
        match node.unparenthesized() {
            TypeNode::LiteralString { value } => Some(vec![value.clone()]),
            TypeNode::Union { members } => {
                let mut keys = Vec::new();
                for member in members {
                    keys.extend(self.literal_string_keys_inner(member, visiting)?);
                }
                Some(keys)
            }
            TypeNode::Reference {
                name,
                type_args: None,
            } => {
                let Declaration::TypeAlias(alias) = self.by_name.get(name.as_str()).copied()?
                else {
                    return None;
                };
                if !visiting.insert(name.clone()) {
                    return None;
                }
                let keys = self.literal_string_keys_inner(&alias.ty, visiting);
                visiting.remove(name);
                keys
            }
            _ => None,
        }
    }

    /// Resolve a reference chain to a flat list of literal members,
    /// used by the `Exclude`/`Extract` set operations.
    pub(super) fn literal_members(&self, node: &TypeNode) -> Option<Vec<TypeNode>> {
        let mut visiting = FxHashSet::default();
        self.literal_members_inner(node, &mut visiting)
    }

    fn literal_members_inner(
        &self,
        node: &TypeNode,
        visiting: &mut FxHashSet<String>,
    ) -> Option<Vec<TypeNode>> {
        match node.unparenthesized() {
            literal @ (TypeNode::LiteralString { .. }
            | TypeNode::LiteralNumber { .. }
            | TypeNode::LiteralBoolean { .. }) => Some(vec![literal.clone()]),
            TypeNode::Union { members } => {
                let mut literals = Vec::new();
                for member in members {
                    literals.extend(self.literal_members_inner(member, visiting)?);
                }
                Some(literals)
            }
            TypeNode::Reference {
                name,
                type_args: None,
            } => {
                let Declaration::TypeAlias(alias) = self.by_name.get(name.as_str()).copied()?
                else {
                    return None;
                };
                if !visiting.insert(name.clone()) {
                    return None;
                }
                let literals = self.literal_members_inner(&alias.ty, visiting);
                visiting.remove(name);
                literals
            }
            _ => None,
        }
    }
}
