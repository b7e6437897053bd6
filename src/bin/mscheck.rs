//! CLI tool for checking mission scripts.

use anyhow::{Context, Result};
use clap::Parser;
use missionscript::{Interpreter, ScriptError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mscheck")]
#[command(author, version, about = "Interpret and validate a mission script", long_about = None)]
struct Args {
    /// Input mission script
    input: PathBuf,

    /// Stop at the first error instead of reporting every problem
    #[arg(long)]
    fail_fast: bool,

    /// Directory searched for function files
    #[arg(long)]
    function_path: Option<PathBuf>,

    /// Write the regenerated script to this file
    #[arg(short, long)]
    regenerate: Option<PathBuf>,

    /// List the configured objects after loading
    #[arg(short, long)]
    list: bool,

    /// Log interpreter progress (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    if !args.input.exists() {
        eprintln!("Error: Input file '{}' does not exist", args.input.display());
        std::process::exit(1);
    }

    let mut builder = Interpreter::builder().continue_on_error(!args.fail_fast);
    if let Some(dir) = &args.function_path {
        builder = builder.function_path(dir).check_function_files(true);
    }
    let mut interpreter = builder.build();

    println!("Checking {}...", args.input.display());
    let outcome = interpreter.interpret_file(&args.input);

    for warning in interpreter.workspace().warnings() {
        eprintln!("warning: {}", warning);
    }

    if args.list {
        let config = interpreter.workspace().config();
        println!("\n{} configured objects:", config.len());
        for object in config.items() {
            println!("  {:<20} {}", object.type_name(), object.name());
        }
        println!("{} mission commands", interpreter.workspace().sequence().len());
    }

    if let Some(path) = &args.regenerate {
        std::fs::write(path, interpreter.generating_string())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    match outcome {
        Ok(()) => {
            println!("✓ No problems found");
            Ok(())
        }
        Err(err) => {
            let problems = match err {
                ScriptError::Multiple(errors) => errors,
                other => vec![other],
            };
            for problem in &problems {
                eprintln!("error: {}", problem);
            }
            eprintln!("{} problem(s) found", problems.len());
            std::process::exit(1);
        }
    }
}
