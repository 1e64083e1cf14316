//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - builds the device (synthetic, or logged in with `--real`)
//! - fetches one data type over a window
//! - prints it and writes the optional export

use std::io::{self, Write};

use clap::Parser;

use crate::cli::{Command, GetArgs, OutputFormat, TypesArgs};
use crate::domain::{DeviceKind, Record};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `wear` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Types(args) => handle_types(&args),
        Command::Get(args) => handle_get(&args),
    }
}

fn handle_types(args: &TypesArgs) -> Result<(), AppError> {
    let devices = match args.device {
        Some(device) => vec![device],
        None => DeviceKind::ALL.to_vec(),
    };
    print!("{}", crate::report::format_types(&devices));
    Ok(())
}

fn handle_get(args: &GetArgs) -> Result<(), AppError> {
    let run = pipeline::run_get(args)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Table => write_text(&mut out, &crate::report::format_table(&run.records, args.limit))?,
        OutputFormat::Summary => {
            let summary = crate::report::summarize(run.data_type, &run.records);
            let text = crate::report::format_summary(&summary, run.device.kind(), run.device.source());
            write_text(&mut out, &text)?;
        }
        OutputFormat::Json => crate::io::write_json(&mut out, limited(&run.records, args.limit))?,
        OutputFormat::Csv => crate::io::write_csv(&mut out, limited(&run.records, args.limit))?,
    }

    // Exports always carry the full result.
    if let Some(path) = &args.export {
        crate::io::export_records(path, &run.records)?;
    }
    Ok(())
}

fn limited(records: &[Record], limit: Option<usize>) -> &[Record] {
    &records[..limit.unwrap_or(records.len()).min(records.len())]
}

fn write_text(out: &mut impl Write, text: &str) -> Result<(), AppError> {
    out.write_all(text.as_bytes())
        .map_err(|e| AppError::Io(format!("Failed to write output: {e}")))
}
