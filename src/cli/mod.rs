//! Native CLI support for the ts2schema binary.

pub mod args;
pub mod doctor;

use anyhow::Context;
use args::CliArgs;

/// Run one CLI invocation: convert the input file and print the schema,
/// or produce the doctor report. Errors bubble to the binary, which
/// prints them to stderr and exits 1; doctor runs always succeed.
pub fn run(args: &CliArgs) -> anyhow::Result<()> {
    if args.doctor {
        return doctor::run(args);
    }

    let options = args.to_options();
    let schema = crate::to_json_schema_from_file(&args.file, &options)
        .with_context(|| format!("failed to convert '{}'", args.file.display()))?;
    let text = schema
        .to_pretty_string()
        .context("failed to serialize schema")?;
    println!("{text}");
    Ok(())
}
