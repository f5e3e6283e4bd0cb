//! Replays an operation script against a persistent tree.
//!
//! ```bash
//! # answers to stdout
//! pbst ops.txt
//!
//! # answers to a file, as JSON lines, with debug logging
//! pbst ops.txt -o answers.jsonl --format json -v
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use persistent_bst::io::{Executor, OutputFormat, ResultWriter, Summary};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replays INC/REM/SUC/IMP operations against a persistent binary search tree
#[derive(Parser, Debug)]
#[command(name = "pbst", version, about)]
struct Args {
    /// Operation script, one operation per line
    #[arg(value_name = "FILE", env = "PBST_INPUT")]
    input: PathBuf,

    /// Where to write query answers (stdout when omitted)
    #[arg(short = 'o', long, value_name = "FILE", env = "PBST_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "text",
        env = "PBST_FORMAT"
    )]
    format: OutputFormatArg,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Operation line followed by its answer
    Text,
    /// One JSON object per line
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let script = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut executor = Executor::new();
    let queued = executor.enqueue_script(&script)?;
    info!(queued, input = %args.input.display(), "script loaded");

    let format = args.format.into();
    let summary = match &args.output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating {}", path.display()))?;
            execute(&mut executor, BufWriter::new(file), format)?
        }
        None => execute(&mut executor, io::stdout().lock(), format)?,
    };

    info!(
        inserted = summary.inserted,
        removed = summary.removed,
        missed_removes = summary.missed_removes,
        answered = summary.answered,
        "done"
    );
    Ok(())
}

fn execute<W: Write>(executor: &mut Executor, out: W, format: OutputFormat) -> Result<Summary> {
    let mut writer = ResultWriter::new(out, format);
    let summary = executor.execute(&mut writer)?;
    writer.flush()?;
    info!(written = writer.written(), "answers flushed");
    Ok(summary)
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("pbst=debug,persistent_bst=debug")
        } else {
            EnvFilter::new("pbst=warn,persistent_bst=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}
