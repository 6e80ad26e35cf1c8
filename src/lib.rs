//! Convert TypeScript type declarations to JSON Schema.
//!
//! `ts2schema` reads a practical subset of TypeScript declaration
//! syntax - interfaces, type aliases, enums, JSDoc annotations - and
//! emits JSON Schema (draft 2020-12) without running a type checker.
//! The pipeline is three pure phases, tokenize → parse → emit, plus a
//! module resolver that assembles declarations across files for the
//! file-based entry points.
//!
//! ```
//! use ts2schema::{to_json_schema, ConvertOptions};
//!
//! let source = r#"
//!     interface User {
//!         name: string;
//!         /** @minimum 0 */
//!         age?: number;
//!     }
//! "#;
//! let schema = to_json_schema(source, &ConvertOptions::default()).unwrap();
//! assert!(schema.to_pretty_string().unwrap().contains("\"name\""));
//! ```
//!
//! The conversion is synchronous and allocates per call; no state is
//! shared between calls, so conversions on disjoint inputs may run in
//! parallel freely.

pub mod ast;
pub mod cli;
pub mod emitter;
pub mod error;
pub mod files;
pub mod imports;
pub mod jsdoc;
pub mod module_resolver;
pub mod options;
pub mod parser;
pub mod schema;
pub mod tokenizer;

pub use ast::{Declaration, Property, TypeNode};
pub use error::{Error, ParseError, Result};
pub use files::FileEntries;
pub use options::{ConvertOptions, DuplicatePolicy, FollowImports};
pub use schema::JsonSchema;

use indexmap::IndexMap;
use module_resolver::{merge_declarations, ModuleResolver, OsFileReader};
use std::path::{Path, PathBuf};

/// Convert one source string to a single schema document.
///
/// String inputs have no file context; imports are never followed.
pub fn to_json_schema(source: &str, options: &ConvertOptions) -> Result<JsonSchema> {
    let declarations = merged_declarations(source, options)?;
    emitter::emit(&declarations, options)
}

/// Convert one source string to a map of self-contained schemas, one
/// per declaration.
pub fn to_json_schemas(
    source: &str,
    options: &ConvertOptions,
) -> Result<IndexMap<String, JsonSchema>> {
    let declarations = merged_declarations(source, options)?;
    emitter::emit_all(&declarations, options)
}

/// Convert an entry file (following imports per
/// [`ConvertOptions::follow_imports`]) to a single schema document.
pub fn to_json_schema_from_file(
    entry: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<JsonSchema> {
    let declarations = declarations_from_files(&[entry.as_ref().to_path_buf()], options)?;
    emitter::emit(&declarations, options)
}

/// Convert an entry file to a map of self-contained schemas.
pub fn to_json_schemas_from_file(
    entry: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<IndexMap<String, JsonSchema>> {
    let declarations = declarations_from_files(&[entry.as_ref().to_path_buf()], options)?;
    emitter::emit_all(&declarations, options)
}

/// Convert several entry files - an explicit list or a glob pattern -
/// to one merged map of self-contained schemas.
pub fn to_json_schemas_from_files(
    entries: &FileEntries,
    options: &ConvertOptions,
) -> Result<IndexMap<String, JsonSchema>> {
    let base = base_dir(options);
    let paths = files::expand_entries(entries, &base)?;
    let declarations = declarations_from_files(&paths, options)?;
    emitter::emit_all(&declarations, options)
}

/// Parse a source string and expose the declaration list for
/// inspection.
pub fn parse_declarations(source: &str) -> Result<Vec<Declaration>> {
    Ok(parser::parse(tokenizer::tokenize(source))?)
}

fn merged_declarations(source: &str, options: &ConvertOptions) -> Result<Vec<Declaration>> {
    let declarations = parse_declarations(source)?;
    merge_declarations(declarations, options.on_duplicate)
}

fn declarations_from_files(
    paths: &[PathBuf],
    options: &ConvertOptions,
) -> Result<Vec<Declaration>> {
    let reader = OsFileReader;
    let base = base_dir(options);
    let mut resolver = ModuleResolver::new(&reader, options.follow_imports);
    for path in paths {
        resolver.add_entry(path, &base)?;
    }
    merge_declarations(resolver.into_declarations(), options.on_duplicate)
}

/// Relative entry paths resolve against `base_dir`, defaulting to the
/// process working directory.
fn base_dir(options: &ConvertOptions) -> PathBuf {
    options
        .base_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}
