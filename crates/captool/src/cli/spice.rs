//! The `captool spice` command for scoring a caption batch.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use captool_core::{Config, MetricOutput, SampleScores, Spice};
use clap::Args;
use serde::{Deserialize, Serialize};

/// Arguments for the `spice` command.
#[derive(Args, Debug)]
pub struct SpiceArgs {
    /// Batch file: {"candidates": [[...]], "references": [[...]]}
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pub pretty: bool,

    /// Directory holding the SPICE jar (overrides config)
    #[arg(long, env = "CAPTOOL_SPICE_DIR")]
    pub spice_dir: Option<PathBuf>,

    /// Kill the scorer after this many milliseconds (overrides config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Candidate and reference captions, index-aligned.
#[derive(Debug, Deserialize)]
pub struct BatchFile {
    pub candidates: Vec<Vec<String>>,
    pub references: Vec<Vec<String>>,
}

/// JSON report written by the command. NaN scores serialize as `null`.
#[derive(Debug, Serialize)]
pub struct SpiceReport<'a> {
    pub method: &'a str,
    pub average: f64,
    pub per_sample: &'a [SampleScores],
}

impl<'a> SpiceReport<'a> {
    fn new(method: &'a str, output: &'a MetricOutput) -> Self {
        Self {
            method,
            average: output.average,
            per_sample: &output.per_sample,
        }
    }
}

/// Execute the spice command.
pub async fn execute(args: SpiceArgs, config: Config) -> anyhow::Result<()> {
    let batch = read_batch(&args.input)?;

    let mut spice_config = config.spice;
    if let Some(dir) = &args.spice_dir {
        spice_config.install_dir = super::expand(dir);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        spice_config.timeout_ms = timeout_ms;
    }

    tracing::info!(
        "Scoring {} samples with SPICE ({})",
        batch.candidates.len(),
        spice_config.jar_path().display()
    );

    let spice = Spice::new(spice_config)?;
    let spinner = create_spinner(batch.candidates.len())?;
    let result = spice.compute_score(&batch.candidates, &batch.references).await;
    spinner.finish_and_clear();
    let output = result?;
    let method = spice.method();

    let report = SpiceReport::new(method, &output);
    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_report(&mut writer, &report, args.pretty)?;
            writer.flush()?;
            tracing::info!("Wrote SPICE scores to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_report(&mut stdout.lock(), &report, args.pretty)?;
        }
    }

    spice.close()?;
    tracing::info!("SPICE average: {:.4}", output.average);
    Ok(())
}

fn read_batch(path: &Path) -> anyhow::Result<BatchFile> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open batch file {}: {e}", path.display()))?;
    let batch: BatchFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| anyhow::anyhow!("Invalid batch file {}: {e}", path.display()))?;
    Ok(batch)
}

fn write_report<W: Write>(
    writer: &mut W,
    report: &SpiceReport<'_>,
    pretty: bool,
) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, report)?;
    } else {
        serde_json::to_writer(&mut *writer, report)?;
    }
    writeln!(writer)?;
    Ok(())
}

fn create_spinner(samples: usize) -> anyhow::Result<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.set_message(format!("running SPICE on {samples} samples..."));
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}
