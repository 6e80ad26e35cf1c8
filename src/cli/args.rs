use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::options::{ConvertOptions, FollowImports};

/// CLI arguments for the ts2schema binary.
#[derive(Parser, Debug)]
#[command(
    name = "ts2schema",
    version,
    about = "Convert TypeScript type declarations to JSON Schema"
)]
pub struct CliArgs {
    /// TypeScript file to convert.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Declaration to emit as the document root.
    #[arg(short = 'r', long = "rootType", alias = "root-type", value_name = "NAME")]
    pub root_type: Option<String>,

    /// Prepend $schema to the root schema.
    #[arg(
        short = 's',
        long = "includeSchema",
        alias = "include-schema",
        value_name = "BOOL"
    )]
    pub include_schema: Option<bool>,

    /// URL to use for $schema.
    #[arg(long = "schemaVersion", alias = "schema-version", value_name = "URL")]
    pub schema_version: Option<String>,

    /// Set additionalProperties: false where nothing else decides it.
    #[arg(long = "strictObjects", alias = "strict-objects")]
    pub strict_objects: bool,

    /// Fallback additionalProperties value.
    #[arg(
        long = "additionalProperties",
        alias = "additional-properties",
        value_name = "BOOL"
    )]
    pub additional_properties: Option<bool>,

    /// Apply JSDoc descriptions and constraints.
    #[arg(long = "includeJSDoc", alias = "include-jsdoc", value_name = "BOOL")]
    pub include_jsdoc: Option<bool>,

    /// How far to follow imports from the entry file.
    #[arg(
        long = "followImports",
        alias = "follow-imports",
        value_enum,
        default_value_t = FollowMode::Local,
        value_name = "MODE"
    )]
    pub follow_imports: FollowMode,

    /// Base directory for resolving the input path.
    #[arg(long = "baseDir", alias = "base-dir", value_name = "PATH")]
    pub base_dir: Option<PathBuf>,

    /// Write a diagnostic report instead of a schema and exit 0.
    #[arg(long)]
    pub doctor: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum FollowMode {
    None,
    Local,
    All,
}

impl FollowMode {
    pub fn to_follow_imports(self) -> FollowImports {
        match self {
            FollowMode::None => FollowImports::None,
            FollowMode::Local => FollowImports::Local,
            FollowMode::All => FollowImports::All,
        }
    }
}

impl CliArgs {
    /// Resolve the flag surface into library options.
    pub fn to_options(&self) -> ConvertOptions {
        let defaults = ConvertOptions::default();
        ConvertOptions {
            include_schema: self.include_schema.unwrap_or(defaults.include_schema),
            schema_version: self
                .schema_version
                .clone()
                .unwrap_or(defaults.schema_version),
            strict_objects: self.strict_objects,
            additional_properties: self.additional_properties,
            root_type: self.root_type.clone(),
            include_jsdoc: self.include_jsdoc.unwrap_or(defaults.include_jsdoc),
            follow_imports: self.follow_imports.to_follow_imports(),
            base_dir: self.base_dir.clone(),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn camel_case_and_kebab_aliases() {
        let camel = parse(&["ts2schema", "api.ts", "--rootType", "Req"]);
        let kebab = parse(&["ts2schema", "api.ts", "--root-type", "Req"]);
        assert_eq!(camel.root_type.as_deref(), Some("Req"));
        assert_eq!(kebab.root_type.as_deref(), Some("Req"));
    }

    #[test]
    fn bool_valued_flags() {
        let args = parse(&[
            "ts2schema",
            "api.ts",
            "--includeSchema",
            "false",
            "--includeJSDoc",
            "true",
            "--additionalProperties",
            "false",
        ]);
        assert_eq!(args.include_schema, Some(false));
        assert_eq!(args.include_jsdoc, Some(true));
        assert_eq!(args.additional_properties, Some(false));
    }

    #[test]
    fn follow_imports_defaults_to_local() {
        let args = parse(&["ts2schema", "api.ts"]);
        assert_eq!(args.follow_imports, FollowMode::Local);
        let all = parse(&["ts2schema", "api.ts", "--followImports", "all"]);
        assert_eq!(all.follow_imports, FollowMode::All);
    }

    #[test]
    fn short_forms() {
        let args = parse(&["ts2schema", "api.ts", "-r", "Req", "-s", "false"]);
        assert_eq!(args.root_type.as_deref(), Some("Req"));
        assert_eq!(args.include_schema, Some(false));
    }

    #[test]
    fn options_inherit_library_defaults() {
        let args = parse(&["ts2schema", "api.ts"]);
        let options = args.to_options();
        assert!(options.include_schema);
        assert!(options.include_jsdoc);
        assert_eq!(options.follow_imports, FollowImports::Local);
        assert_eq!(options.additional_properties, None);
    }
}
