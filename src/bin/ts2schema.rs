use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;

use ts2schema::cli::{self, args::CliArgs};

fn main() -> Result<()> {
    // RUST_LOG=debug for resolver traces, RUST_LOG=trace for everything.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse_from(preprocess_args(std::env::args_os().collect()));
    cli::run(&args)
}

/// `-v` means version here (clap reserves `-V`).
fn preprocess_args(args: Vec<OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| if arg == "-v" { OsString::from("-V") } else { arg })
        .collect()
}
