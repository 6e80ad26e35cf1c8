//! Cross-file module resolution.
//!
//! Given an entry file, walks `import`/`export ... from` statements to
//! assemble one declaration list spanning every transitively reachable
//! source file. The walk is depth-first; a visited set makes import
//! cycles terminate with each file read exactly once.
//!
//! Follow modes:
//! - `none`: imports are never followed.
//! - `local`: relative specifiers (`./`, `../`) are followed, bare
//!   specifiers are skipped.
//! - `all`: bare specifiers additionally resolve through a Node-style
//!   `node_modules` walk (package.json `types`/`typings`, conditional
//!   `exports` with a `types` condition, `main` with a sibling `.d.ts`,
//!   then `index.d.ts`).
//!
//! A specifier that should be followed but cannot be resolved is a hard
//! error. A specifier skipped by the follow mode is silently ignored.

use crate::ast::Declaration;
use crate::error::{Error, Result};
use crate::imports::extract_imports;
use crate::options::{DuplicatePolicy, FollowImports};
use crate::parser;
use crate::tokenizer::tokenize;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Extensions tried, in order, after the exact path.
const EXTENSION_CANDIDATES: &[&str] = &[".ts", ".tsx", ".d.ts"];

/// Index files tried, in order, when the path is a directory.
const INDEX_CANDIDATES: &[&str] = &["index.ts", "index.tsx", "index.d.ts"];

/// Filesystem access used by the resolver, abstracted so tests can run
/// against in-memory trees.
pub trait FileReader {
    fn read(&self, path: &Path) -> io::Result<String>;
    fn is_file(&self, path: &Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileReader;

impl FileReader for OsFileReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Walks the file graph and collects declarations in discovery order.
pub struct ModuleResolver<'a> {
    reader: &'a dyn FileReader,
    follow: FollowImports,
    visited: FxHashSet<PathBuf>,
    declarations: Vec<Declaration>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(reader: &'a dyn FileReader, follow: FollowImports) -> Self {
        ModuleResolver {
            reader,
            follow,
            visited: FxHashSet::default(),
            declarations: Vec::new(),
        }
    }

    /// Walk from one entry file. May be called repeatedly to merge
    /// several entries into one declaration list.
    pub fn add_entry(&mut self, entry: &Path, base_dir: &Path) -> Result<()> {
        let absolute = if entry.is_absolute() {
            normalize_path(entry)
        } else {
            normalize_path(&base_dir.join(entry))
        };
        self.visit(absolute)
    }

    /// The collected declarations, in discovery order and not yet
    /// deduplicated; pass them through [`merge_declarations`].
    pub fn into_declarations(self) -> Vec<Declaration> {
        self.declarations
    }

    fn visit(&mut self, path: PathBuf) -> Result<()> {
        if !self.visited.insert(path.clone()) {
            return Ok(());
        }
        debug!(file = %path.display(), "reading module");

        let source = self.reader.read(&path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?;
        let tokens = tokenize(&source);
        let imports = extract_imports(&tokens);
        let mut declarations = parser::parse(tokens)?;
        for declaration in &mut declarations {
            declaration.base_mut().source_file = Some(path.clone());
        }
        self.declarations.extend(declarations);

        for import in imports {
            match self.resolve_specifier(&import.module_path, &path)? {
                Some(resolved) => self.visit(resolved)?,
                None => debug!(
                    specifier = %import.module_path,
                    "import skipped by follow mode"
                ),
            }
        }
        Ok(())
    }

    /// Resolve one specifier. `Ok(None)` means the follow mode skips
    /// it; an unresolvable followed specifier is an error.
    fn resolve_specifier(&self, specifier: &str, importer: &Path) -> Result<Option<PathBuf>> {
        let importer_dir = importer.parent().unwrap_or_else(|| Path::new("/"));
        let is_relative = specifier.starts_with("./") || specifier.starts_with("../");

        let resolved = if is_relative || Path::new(specifier).is_absolute() {
            if self.follow == FollowImports::None {
                return Ok(None);
            }
            let candidate = if is_relative {
                normalize_path(&importer_dir.join(specifier))
            } else {
                normalize_path(Path::new(specifier))
            };
            self.probe_extensions(&candidate)
        } else {
            if self.follow != FollowImports::All {
                return Ok(None);
            }
            self.resolve_bare(specifier, importer_dir)
        };

        match resolved {
            Some(path) => Ok(Some(path)),
            None => Err(Error::Resolution {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
            }),
        }
    }

    /// TypeScript-style extension probing: the exact path, then
    /// appended extensions, then index files.
    fn probe_extensions(&self, candidate: &Path) -> Option<PathBuf> {
        if self.reader.is_file(candidate) {
            return Some(candidate.to_path_buf());
        }
        for extension in EXTENSION_CANDIDATES {
            let with_extension = append_to_file_name(candidate, extension);
            if self.reader.is_file(&with_extension) {
                return Some(with_extension);
            }
        }
        for index in INDEX_CANDIDATES {
            let nested = candidate.join(index);
            if self.reader.is_file(&nested) {
                return Some(nested);
            }
        }
        None
    }

    /// Node-style resolution for bare specifiers: ascend parent
    /// directories looking for `node_modules/<pkg>`.
    fn resolve_bare(&self, specifier: &str, importer_dir: &Path) -> Option<PathBuf> {
        let (package, subpath) = split_package_specifier(specifier);
        let mut current = Some(importer_dir);
        while let Some(dir) = current {
            let package_dir = dir.join("node_modules").join(package);
            let resolved = if subpath.is_empty() {
                self.resolve_package_entry(&package_dir)
            } else {
                self.resolve_package_subpath(&package_dir, subpath)
            };
            if let Some(path) = resolved {
                debug!(specifier, resolved = %path.display(), "bare specifier resolved");
                return Some(path);
            }
            current = dir.parent();
        }
        None
    }

    /// Resolve the root import of a package directory.
    fn resolve_package_entry(&self, package_dir: &Path) -> Option<PathBuf> {
        if let Some(manifest) = self.read_manifest(package_dir) {
            for field in ["types", "typings"] {
                if let Some(types) = manifest.get(field).and_then(Value::as_str) {
                    if let Some(path) = self.probe_extensions(&package_dir.join(types)) {
                        return Some(path);
                    }
                }
            }
            if let Some(exports) = manifest.get("exports") {
                let entry = match exports {
                    Value::Object(map) if map.contains_key(".") => map.get("."),
                    other => Some(other),
                };
                if let Some(target) = entry.and_then(export_types_target) {
                    if let Some(path) = self.probe_export_target(package_dir, &target) {
                        return Some(path);
                    }
                }
            }
            if let Some(main) = manifest.get("main").and_then(Value::as_str) {
                let sibling = swap_js_for_dts(&package_dir.join(main));
                if self.reader.is_file(&sibling) {
                    return Some(sibling);
                }
            }
        }
        let index = package_dir.join("index.d.ts");
        self.reader.is_file(&index).then_some(index)
    }

    /// Resolve `pkg/sub` through the `exports` map, falling back to
    /// extension probing inside the package directory.
    fn resolve_package_subpath(&self, package_dir: &Path, subpath: &str) -> Option<PathBuf> {
        if let Some(manifest) = self.read_manifest(package_dir) {
            if let Some(Value::Object(exports)) = manifest.get("exports") {
                let key = format!("./{subpath}");
                if let Some(target) = exports.get(key.as_str()).and_then(export_types_target) {
                    if let Some(path) = self.probe_export_target(package_dir, &target) {
                        return Some(path);
                    }
                }
            }
        }
        self.probe_extensions(&package_dir.join(subpath))
    }

    /// An exports target frequently points at the JavaScript artifact;
    /// probe the declared path first, then its `.d.ts` sibling.
    fn probe_export_target(&self, package_dir: &Path, target: &str) -> Option<PathBuf> {
        let candidate = normalize_path(&package_dir.join(target));
        if self.reader.is_file(&candidate) {
            return Some(candidate);
        }
        let sibling = swap_js_for_dts(&candidate);
        if self.reader.is_file(&sibling) {
            return Some(sibling);
        }
        self.probe_extensions(&candidate)
    }

    fn read_manifest(&self, package_dir: &Path) -> Option<Value> {
        let text = self.reader.read(&package_dir.join("package.json")).ok()?;
        serde_json::from_str(&text).ok()
    }
}

/// Deduplicate a merged declaration list by top-level name.
pub fn merge_declarations(
    declarations: Vec<Declaration>,
    policy: DuplicatePolicy,
) -> Result<Vec<Declaration>> {
    let mut seen: FxHashMap<String, Option<PathBuf>> = FxHashMap::default();
    let mut merged = Vec::with_capacity(declarations.len());
    for declaration in declarations {
        let name = declaration.name().to_string();
        if let Some(first) = seen.get(&name) {
            match policy {
                DuplicatePolicy::Error => {
                    return Err(Error::DuplicateDeclaration {
                        name,
                        first: first.clone(),
                        second: declaration.base().source_file.clone(),
                    });
                }
                DuplicatePolicy::Warn => {
                    warn!(
                        name = %name,
                        kept = ?first.as_ref().map(|p| p.display().to_string()),
                        "duplicate declaration discarded"
                    );
                }
                DuplicatePolicy::Silent => {}
            }
            continue;
        }
        seen.insert(name, declaration.base().source_file.clone());
        merged.push(declaration);
    }
    Ok(merged)
}

/// Lexically normalize a path: fold `.` and `..` without touching the
/// filesystem (resolution must work against virtual readers).
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// `pkg/sub/path` → (`pkg`, `sub/path`); scoped packages keep their
/// first two segments.
fn split_package_specifier(specifier: &str) -> (&str, &str) {
    if specifier.starts_with('@') {
        let mut indices = specifier.match_indices('/').map(|(index, _)| index);
        let _scope_slash = indices.next();
        match indices.next() {
            Some(second_slash) => (
                &specifier[..second_slash],
                &specifier[second_slash + 1..],
            ),
            None => (specifier, ""),
        }
    } else {
        match specifier.split_once('/') {
            Some((package, rest)) => (package, rest),
            None => (specifier, ""),
        }
    }
}

fn append_to_file_name(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// `lib/index.js` → `lib/index.d.ts`; paths without a `.js`-family
/// extension gain `.d.ts`.
fn swap_js_for_dts(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    for js in [".js", ".mjs", ".cjs"] {
        if let Some(stem) = text.strip_suffix(js) {
            return PathBuf::from(format!("{stem}.d.ts"));
        }
    }
    append_to_file_name(path, ".d.ts")
}

/// Pick a conditional-exports target, preferring the `types` condition.
fn export_types_target(entry: &Value) -> Option<String> {
    match entry {
        Value::String(target) => Some(target.clone()),
        Value::Object(map) => {
            for condition in ["types", "import", "require", "default"] {
                if let Some(nested) = map.get(condition) {
                    if let Some(target) = export_types_target(nested) {
                        return Some(target);
                    }
                }
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    /// In-memory reader for pure resolution tests.
    #[derive(Default)]
    struct MemoryReader {
        files: FxHashMap<PathBuf, String>,
    }

    impl MemoryReader {
        fn with(files: &[(&str, &str)]) -> Self {
            let mut reader = MemoryReader::default();
            for (path, text) in files {
                reader.files.insert(PathBuf::from(path), text.to_string());
            }
            reader
        }
    }

    impl FileReader for MemoryReader {
        fn read(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "not found"))
        }

        fn is_file(&self, path: &Path) -> bool {
            self.files.contains_key(path)
        }
    }

    fn resolve(
        reader: &MemoryReader,
        follow: FollowImports,
        entry: &str,
    ) -> Result<Vec<Declaration>> {
        let mut resolver = ModuleResolver::new(reader, follow);
        resolver.add_entry(Path::new(entry), Path::new("/"))?;
        Ok(resolver.into_declarations())
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d.ts")),
            PathBuf::from("/a/c/d.ts")
        );
    }

    #[test]
    fn split_specifiers() {
        assert_eq!(split_package_specifier("lodash"), ("lodash", ""));
        assert_eq!(split_package_specifier("lodash/fp"), ("lodash", "fp"));
        assert_eq!(split_package_specifier("@scope/pkg"), ("@scope/pkg", ""));
        assert_eq!(
            split_package_specifier("@scope/pkg/sub/deep"),
            ("@scope/pkg", "sub/deep")
        );
    }

    #[test]
    fn relative_import_resolves_with_extension() {
        let reader = MemoryReader::with(&[
            (
                "/src/api.ts",
                r#"import { Pet } from "./pet"; interface Req { pet: Pet }"#,
            ),
            ("/src/pet.ts", "export interface Pet { name: string }"),
        ]);
        let declarations = resolve(&reader, FollowImports::Local, "/src/api.ts").unwrap();
        let names: Vec<_> = declarations.iter().map(Declaration::name).collect();
        assert_eq!(names, vec!["Req", "Pet"]);
        assert_eq!(
            declarations[1].source_file(),
            Some(&PathBuf::from("/src/pet.ts"))
        );
    }

    #[test]
    fn follow_none_skips_everything() {
        let reader = MemoryReader::with(&[(
            "/src/api.ts",
            r#"import { Pet } from "./missing"; interface Req { x: string }"#,
        )]);
        let declarations = resolve(&reader, FollowImports::None, "/src/api.ts").unwrap();
        assert_eq!(declarations.len(), 1);
    }

    #[test]
    fn local_mode_skips_bare_specifiers() {
        let reader = MemoryReader::with(&[(
            "/src/api.ts",
            r#"import { X } from "somepkg"; interface Req { x: string }"#,
        )]);
        let declarations = resolve(&reader, FollowImports::Local, "/src/api.ts").unwrap();
        assert_eq!(declarations.len(), 1);
    }

    #[test]
    fn unresolved_relative_import_is_hard_error() {
        let reader = MemoryReader::with(&[(
            "/src/api.ts",
            r#"import { Pet } from "./missing"; interface Req { x: string }"#,
        )]);
        let err = resolve(&reader, FollowImports::Local, "/src/api.ts").unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }), "{err}");
    }

    #[test]
    fn import_cycle_visits_each_file_once() {
        let reader = MemoryReader::with(&[
            (
                "/a.ts",
                r#"import { B } from "./b"; export interface A { b: B }"#,
            ),
            (
                "/b.ts",
                r#"import { A } from "./a"; export interface B { a: A }"#,
            ),
        ]);
        let declarations = resolve(&reader, FollowImports::Local, "/a.ts").unwrap();
        let names: Vec<_> = declarations.iter().map(Declaration::name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn index_file_resolution() {
        let reader = MemoryReader::with(&[
            ("/src/main.ts", r#"import { U } from "./utils"; type T = U;"#),
            ("/src/utils/index.ts", "export type U = string;"),
        ]);
        let declarations = resolve(&reader, FollowImports::Local, "/src/main.ts").unwrap();
        assert_eq!(declarations.len(), 2);
    }

    #[test]
    fn bare_specifier_via_types_field() {
        let reader = MemoryReader::with(&[
            ("/app/src/main.ts", r#"import { P } from "pkg"; type T = P;"#),
            (
                "/app/node_modules/pkg/package.json",
                r#"{"name":"pkg","types":"dist/main.d.ts"}"#,
            ),
            (
                "/app/node_modules/pkg/dist/main.d.ts",
                "export type P = string;",
            ),
        ]);
        let declarations = resolve(&reader, FollowImports::All, "/app/src/main.ts").unwrap();
        assert_eq!(declarations.len(), 2);
    }

    #[test]
    fn bare_specifier_via_exports_types_condition() {
        let reader = MemoryReader::with(&[
            ("/app/main.ts", r#"import { P } from "pkg"; type T = P;"#),
            (
                "/app/node_modules/pkg/package.json",
                r#"{"exports":{".":{"types":"./lib/index.d.ts","default":"./lib/index.js"}}}"#,
            ),
            (
                "/app/node_modules/pkg/lib/index.d.ts",
                "export type P = string;",
            ),
        ]);
        let declarations = resolve(&reader, FollowImports::All, "/app/main.ts").unwrap();
        assert_eq!(declarations.len(), 2);
    }

    #[test]
    fn bare_specifier_via_main_sibling_dts() {
        let reader = MemoryReader::with(&[
            ("/app/main.ts", r#"import { P } from "pkg"; type T = P;"#),
            (
                "/app/node_modules/pkg/package.json",
                r#"{"main":"lib/index.js"}"#,
            ),
            (
                "/app/node_modules/pkg/lib/index.d.ts",
                "export type P = string;",
            ),
        ]);
        let declarations = resolve(&reader, FollowImports::All, "/app/main.ts").unwrap();
        assert_eq!(declarations.len(), 2);
    }

    #[test]
    fn bare_specifier_subpath() {
        let reader = MemoryReader::with(&[
            (
                "/app/main.ts",
                r#"import { P } from "pkg/models"; type T = P;"#,
            ),
            ("/app/node_modules/pkg/package.json", r#"{"name":"pkg"}"#),
            ("/app/node_modules/pkg/models.d.ts", "export type P = string;"),
        ]);
        let declarations = resolve(&reader, FollowImports::All, "/app/main.ts").unwrap();
        assert_eq!(declarations.len(), 2);
    }

    #[test]
    fn scoped_package_resolution() {
        let reader = MemoryReader::with(&[
            (
                "/app/main.ts",
                r#"import { P } from "@scope/pkg"; type T = P;"#,
            ),
            (
                "/app/node_modules/@scope/pkg/package.json",
                r#"{"types":"index.d.ts"}"#,
            ),
            (
                "/app/node_modules/@scope/pkg/index.d.ts",
                "export type P = string;",
            ),
        ]);
        let declarations = resolve(&reader, FollowImports::All, "/app/main.ts").unwrap();
        assert_eq!(declarations.len(), 2);
    }

    #[test]
    fn merge_policies() {
        let reader = MemoryReader::with(&[
            (
                "/a.ts",
                r#"import { Pet } from "./b"; interface Pet { x: string }"#,
            ),
            ("/b.ts", "export interface Pet { y: string }"),
        ]);
        let declarations = resolve(&reader, FollowImports::Local, "/a.ts").unwrap();

        let err = merge_declarations(declarations.clone(), DuplicatePolicy::Error).unwrap_err();
        assert!(matches!(err, Error::DuplicateDeclaration { .. }));

        let kept = merge_declarations(declarations.clone(), DuplicatePolicy::Warn).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source_file(), Some(&PathBuf::from("/a.ts")));

        let silent = merge_declarations(declarations, DuplicatePolicy::Silent).unwrap();
        assert_eq!(silent.len(), 1);
    }
}
