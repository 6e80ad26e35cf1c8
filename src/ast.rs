//! The declaration data model produced by the parser.
//!
//! A source file parses into an ordered list of [`Declaration`]s, each
//! an interface, a type alias, or an enum. Type expressions are
//! [`TypeNode`] trees with owned children; cross-declaration cycles are
//! only ever expressed through [`TypeNode::Reference`] by name and are
//! resolved by the emitter against the declaration list.
//!
//! All nodes are immutable once parsed. Generic instantiation in the
//! emitter substitutes into fresh trees and never mutates these.

use crate::jsdoc::JsDoc;
use serde::Serialize;
use std::path::PathBuf;

/// Built-in primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    Null,
    Undefined,
    Any,
    Unknown,
    Never,
    Void,
    Object,
    BigInt,
}

impl PrimitiveKind {
    /// Map a primitive token value; boolean literals are not primitives
    /// and return `None` so the parser can build literal nodes.
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "string" => PrimitiveKind::String,
            "number" => PrimitiveKind::Number,
            "boolean" => PrimitiveKind::Boolean,
            "null" => PrimitiveKind::Null,
            "undefined" => PrimitiveKind::Undefined,
            "any" => PrimitiveKind::Any,
            "unknown" => PrimitiveKind::Unknown,
            "never" => PrimitiveKind::Never,
            "void" => PrimitiveKind::Void,
            "object" => PrimitiveKind::Object,
            "bigint" => PrimitiveKind::BigInt,
            _ => return None,
        })
    }
}

/// A type expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeNode {
    Primitive {
        primitive: PrimitiveKind,
    },
    LiteralString {
        value: String,
    },
    LiteralNumber {
        value: f64,
    },
    LiteralBoolean {
        value: bool,
    },
    Object {
        properties: Vec<Property>,
        index_signature: Option<Box<IndexSignature>>,
    },
    Array {
        element: Box<TypeNode>,
    },
    Tuple {
        elements: Vec<TupleElement>,
    },
    /// Invariant: at least two members; singletons unwrap at parse time.
    Union {
        members: Vec<TypeNode>,
    },
    Intersection {
        members: Vec<TypeNode>,
    },
    /// A named reference to another declaration (or an unknown name).
    /// `type_args`, when present, is non-empty.
    Reference {
        name: String,
        type_args: Option<Vec<TypeNode>>,
    },
    Parenthesized {
        inner: Box<TypeNode>,
    },
    Record {
        key: Box<TypeNode>,
        value: Box<TypeNode>,
    },
    /// Literal chunks of a template literal type; interpolations are
    /// not retained.
    TemplateLiteral {
        parts: Vec<String>,
    },
    Mapped {
        param: String,
        constraint: Box<TypeNode>,
        value: Box<TypeNode>,
        optional: bool,
    },
}

impl TypeNode {
    pub fn primitive(primitive: PrimitiveKind) -> Self {
        TypeNode::Primitive { primitive }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeNode::Reference {
            name: name.into(),
            type_args: None,
        }
    }

    /// Strip parenthesization.
    pub fn unparenthesized(&self) -> &TypeNode {
        match self {
            TypeNode::Parenthesized { inner } => inner.unparenthesized(),
            other => other,
        }
    }

    pub fn is_null_or_undefined(&self) -> bool {
        matches!(
            self.unparenthesized(),
            TypeNode::Primitive {
                primitive: PrimitiveKind::Null | PrimitiveKind::Undefined
            }
        )
    }
}

/// A named member of an interface or object type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeNode,
    pub optional: bool,
    pub readonly: bool,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "indexmap::IndexMap::is_empty", default)]
    pub tags: indexmap::IndexMap<String, String>,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: TypeNode) -> Self {
        Property {
            name: name.into(),
            ty,
            optional: false,
            readonly: false,
            description: None,
            tags: indexmap::IndexMap::new(),
        }
    }
}

/// One element of a tuple type. A `rest` element is unique and last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TupleElement {
    #[serde(rename = "type")]
    pub ty: TypeNode,
    pub optional: bool,
    pub label: Option<String>,
    pub rest: bool,
}

/// An `[key: K]: V` index signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSignature {
    pub key_type: TypeNode,
    pub value_type: TypeNode,
}

/// A member of an `enum` declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: String,
    pub value: EnumValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnumValue {
    String(String),
    Number(f64),
}

/// Fields shared by every declaration kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeclarationBase {
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "indexmap::IndexMap::is_empty", default)]
    pub tags: indexmap::IndexMap<String, String>,
    pub exported: bool,
    /// Absolute path of the file this declaration came from; `None`
    /// for string inputs. Used by the name-transform callback.
    pub source_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceDeclaration {
    #[serde(flatten)]
    pub base: DeclarationBase,
    pub type_params: Vec<String>,
    pub extends: Vec<TypeNode>,
    pub properties: Vec<Property>,
    pub index_signature: Option<Box<IndexSignature>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAliasDeclaration {
    #[serde(flatten)]
    pub base: DeclarationBase,
    pub type_params: Vec<String>,
    #[serde(rename = "type")]
    pub ty: TypeNode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDeclaration {
    #[serde(flatten)]
    pub base: DeclarationBase,
    pub members: Vec<EnumMember>,
}

/// A named top-level entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Declaration {
    Interface(InterfaceDeclaration),
    TypeAlias(TypeAliasDeclaration),
    Enum(EnumDeclaration),
}

impl Declaration {
    pub fn base(&self) -> &DeclarationBase {
        match self {
            Declaration::Interface(decl) => &decl.base,
            Declaration::TypeAlias(decl) => &decl.base,
            Declaration::Enum(decl) => &decl.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut DeclarationBase {
        match self {
            Declaration::Interface(decl) => &mut decl.base,
            Declaration::TypeAlias(decl) => &mut decl.base,
            Declaration::Enum(decl) => &mut decl.base,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn exported(&self) -> bool {
        self.base().exported
    }

    pub fn source_file(&self) -> Option<&PathBuf> {
        self.base().source_file.as_ref()
    }

    /// Declared generic parameter names; empty for enums and for
    /// non-generic declarations.
    pub fn type_params(&self) -> &[String] {
        match self {
            Declaration::Interface(decl) => &decl.type_params,
            Declaration::TypeAlias(decl) => &decl.type_params,
            Declaration::Enum(_) => &[],
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params().is_empty()
    }

    /// Attach the doc payload parsed just before this declaration.
    pub fn attach_doc(&mut self, doc: JsDoc) {
        let base = self.base_mut();
        if !doc.description.is_empty() {
            base.description = Some(doc.description);
        }
        base.tags = doc.tags;
    }
}
