//! Conversion options.
//!
//! One options value drives the whole pipeline: the resolver reads the
//! follow mode and duplicate policy, the emitter reads everything else.
//! Callbacks are shared closures so the same options can serve several
//! conversions; a conversion itself never stores state between calls.

use crate::ast::Declaration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default `$schema` URL for single-document output.
pub const DEFAULT_SCHEMA_VERSION: &str = "https://json-schema.org/draft/2020-12/schema";

/// Whether the module resolver descends into imported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowImports {
    /// Never follow imports.
    #[default]
    None,
    /// Follow relative imports (`./`, `../`); skip bare specifiers.
    Local,
    /// Follow relative imports and resolve bare specifiers through
    /// `node_modules`.
    All,
}

impl FollowImports {
    pub fn name(&self) -> &'static str {
        match self {
            FollowImports::None => "none",
            FollowImports::Local => "local",
            FollowImports::All => "all",
        }
    }
}

/// What to do when two files declare the same top-level name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail the conversion naming both files.
    #[default]
    Error,
    /// Keep the first declaration and log a diagnostic.
    Warn,
    /// Keep the first declaration silently.
    Silent,
}

/// Renames a declaration for `$defs`/`definitions` keys and `$ref`
/// pointers. An `Err` aborts the conversion as a callback failure.
pub type NameTransform =
    Arc<dyn Fn(&str, &Declaration) -> Result<String, String> + Send + Sync>;

/// Produces an external `$id` for a declaration in batch mode.
pub type IdProvider = Arc<dyn Fn(&str, &Declaration) -> Result<String, String> + Send + Sync>;

/// Options accepted by every public conversion entry point.
#[derive(Clone)]
pub struct ConvertOptions {
    /// Prepend `$schema` to the root schema. Default `true`.
    pub include_schema: bool,
    /// URL used for `$schema`.
    pub schema_version: String,
    /// Set `additionalProperties: false` on object schemas where
    /// nothing more specific applies.
    pub strict_objects: bool,
    /// Fallback `additionalProperties` when no index signature, doc tag
    /// or `strict_objects` decides.
    pub additional_properties: Option<bool>,
    /// Name of the declaration to emit as the document root. When
    /// unset, the first exported declaration (or the first declaration)
    /// is the root.
    pub root_type: Option<String>,
    /// Apply descriptions and JSDoc-derived constraints. Default
    /// `true`; when `false` only structural fields are emitted.
    pub include_jsdoc: bool,
    /// Collision policy for duplicate top-level names.
    pub on_duplicate: DuplicatePolicy,
    /// Import follow mode for the file entry points. String inputs
    /// have no file context and never follow imports.
    pub follow_imports: FollowImports,
    /// Base directory for resolving relative entry paths; defaults to
    /// the process working directory.
    pub base_dir: Option<PathBuf>,
    /// Rename declarations in `$defs`/`definitions` and `$ref`s.
    pub name_transform: Option<NameTransform>,
    /// External `$id` provider; batch output keys on the id and turns
    /// inter-schema references into absolute `$ref`s.
    pub id_provider: Option<IdProvider>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            include_schema: true,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            strict_objects: false,
            additional_properties: None,
            root_type: None,
            include_jsdoc: true,
            on_duplicate: DuplicatePolicy::default(),
            follow_imports: FollowImports::default(),
            base_dir: None,
            name_transform: None,
            id_provider: None,
        }
    }
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("include_schema", &self.include_schema)
            .field("schema_version", &self.schema_version)
            .field("strict_objects", &self.strict_objects)
            .field("additional_properties", &self.additional_properties)
            .field("root_type", &self.root_type)
            .field("include_jsdoc", &self.include_jsdoc)
            .field("on_duplicate", &self.on_duplicate)
            .field("follow_imports", &self.follow_imports)
            .field("base_dir", &self.base_dir)
            .field("name_transform", &self.name_transform.as_ref().map(|_| ".."))
            .field("id_provider", &self.id_provider.as_ref().map(|_| ".."))
            .finish()
    }
}
