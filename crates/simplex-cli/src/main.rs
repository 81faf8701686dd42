//! Command-line entry point for the Simplex interpreter.

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use log::info;
use simplex::{DiscardWriter, FsWriter, Runner, SimplexError};

/// Evaluate a Simplex model and write its product artifacts.
#[derive(Debug, Parser)]
#[command(name = "simplex", version, about)]
struct Cli {
    /// The model source file.
    file: PathBuf,

    /// Prefix for artifact file names: each product writes
    /// `<prefix>-<name>.stl` and/or `<prefix>-<name>.txt`.
    #[arg(short = 'o', long, default_value = "out")]
    prefix: String,

    /// Product to render (repeatable). All products when omitted.
    #[arg(short = 'p', long = "product")]
    products: Vec<String>,

    /// Parse and type-check only; evaluate nothing, write nothing.
    #[arg(long)]
    check: bool,

    /// Evaluate products but discard artifacts instead of writing files.
    #[arg(long)]
    dry_run: bool,

    /// Emit diagnostics as JSON on stderr instead of plain text.
    #[arg(long)]
    json_errors: bool,
}

fn report_errors(errors: &[SimplexError], json: bool) {
    if json {
        match serde_json::to_string_pretty(errors) {
            Ok(rendered) => eprintln!("{rendered}"),
            Err(err) => eprintln!("cannot render diagnostics as JSON: {err}"),
        }
    } else {
        for error in errors {
            eprintln!("{error}");
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("cannot read {}: {err}", cli.file.display());
            return ExitCode::FAILURE;
        }
    };
    let source_name = cli.file.display().to_string();

    let runner = match Runner::parse(&source, &source_name) {
        Ok(runner) => runner,
        Err(err) => {
            report_errors(std::slice::from_ref(&err), cli.json_errors);
            return ExitCode::FAILURE;
        }
    };

    let mut program = match runner.analyze() {
        Ok(program) => program,
        Err(errors) => {
            report_errors(&errors, cli.json_errors);
            return ExitCode::FAILURE;
        }
    };
    if cli.check {
        info!("{source_name}: analysis passed");
        return ExitCode::SUCCESS;
    }

    let requested = if cli.products.is_empty() {
        None
    } else {
        Some(cli.products.as_slice())
    };
    let report = if cli.dry_run {
        program.execute(requested, &cli.prefix, &mut DiscardWriter)
    } else {
        program.execute(requested, &cli.prefix, &mut FsWriter)
    };

    for product in &report.products {
        for file in &product.files {
            println!("{file}");
        }
    }
    if report.success() {
        ExitCode::SUCCESS
    } else {
        let errors: Vec<SimplexError> = report.errors().cloned().collect();
        report_errors(&errors, cli.json_errors);
        ExitCode::FAILURE
    }
}
