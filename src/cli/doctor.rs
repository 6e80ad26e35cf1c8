//! The `--doctor` diagnostic report.
//!
//! Replaces normal output with one JSON document describing the
//! environment, the input file, the resolved options, and the outcome
//! of an attempted conversion. Doctor runs never fail the process: a
//! missing input file or a conversion error is recorded inside the
//! document and the exit code stays 0.

use crate::cli::args::CliArgs;
use crate::to_json_schema_from_file;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Build and print the diagnostic document.
pub fn run(args: &CliArgs) -> anyhow::Result<()> {
    let document = build_report(args);
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn build_report(args: &CliArgs) -> Value {
    let cwd = std::env::current_dir().unwrap_or_default();
    let base = args.base_dir.clone().unwrap_or_else(|| cwd.clone());
    let absolute = if args.file.is_absolute() {
        args.file.clone()
    } else {
        base.join(&args.file)
    };

    let mut document = json!({
        "timestamp": epoch_millis(SystemTime::now()),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": {
            "platform": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "cwd": cwd.display().to_string(),
        },
        "input": input_report(args, &absolute),
        "options": options_report(args),
    });

    match std::fs::metadata(&absolute) {
        Ok(_) => {
            let conversion = match to_json_schema_from_file(&absolute, &args.to_options()) {
                Ok(schema) => json!({
                    "success": true,
                    "schema": serde_json::to_value(&schema).unwrap_or(Value::Null),
                }),
                Err(err) => json!({
                    "success": false,
                    "error": { "message": err.to_string() },
                }),
            };
            document["conversionResult"] = conversion;
        }
        Err(err) => {
            document["readError"] = json!({ "message": err.to_string() });
        }
    }
    document
}

fn input_report(args: &CliArgs, absolute: &Path) -> Value {
    let mut input = json!({
        "filePath": args.file.display().to_string(),
        "absolutePath": absolute.display().to_string(),
        "fileExists": absolute.is_file(),
    });
    if let Ok(metadata) = std::fs::metadata(absolute) {
        input["fileSize"] = json!(metadata.len());
        if let Ok(modified) = metadata.modified() {
            input["modified"] = json!(epoch_millis(modified));
        }
    }
    if let Ok(source) = std::fs::read_to_string(absolute) {
        input["sourceLength"] = json!(source.len());
        input["sourceLines"] = json!(source.lines().count());
        input["source"] = json!(source);
    }
    input
}

fn options_report(args: &CliArgs) -> Value {
    let options = args.to_options();
    json!({
        "includeSchema": options.include_schema,
        "schemaVersion": options.schema_version,
        "strictObjects": options.strict_objects,
        "additionalProperties": options.additional_properties,
        "rootType": options.root_type,
        "includeJSDoc": options.include_jsdoc,
        "followImports": options.follow_imports.name(),
        "baseDir": args.base_dir.as_ref().map(|path| path.display().to_string()),
    })
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}
