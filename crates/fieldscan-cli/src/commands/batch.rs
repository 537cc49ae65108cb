//! Batch processing command for multiple documents.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use fieldscan_core::models::{BatchReport, DocumentOutcome};
use fieldscan_core::schema::FieldSchema;
use fieldscan_core::{BatchRunner, CancellationToken, Extractor};

use super::process::{self, OutputFormat};
use super::source::{self, FileSource};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input files
    #[arg(required = true)]
    input: String,

    /// Output directory for per-document results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each document
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write a per-field summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers (overrides config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Per-document time bound in milliseconds (overrides config)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

pub async fn run(
    args: BatchArgs,
    config_path: Option<&str>,
    schema_path: Option<&Path>,
) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = source::load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.batch.jobs = jobs;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.batch.document_timeout_ms = timeout_ms;
    }
    let schema = source::load_schema(schema_path, &config)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && source::is_supported(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let sources: Vec<FileSource> = files.into_iter().map(FileSource::new).collect();

    let extractor = Arc::new(Extractor::new(schema.clone(), config.extraction.clone()));
    let token = CancellationToken::new();
    let runner = BatchRunner::new(extractor, &config.batch).with_cancellation(token.clone());

    let watcher = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing documents in flight");
                token.cancel();
            }
        }
    });

    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
            )?
            .progress_chars("=>-"),
    );

    let report = {
        let pb = pb.clone();
        tokio::task::spawn_blocking(move || runner.run_with_progress(&sources, |_| pb.inc(1)))
            .await??
    };
    watcher.abort();

    pb.finish_with_message("Complete");

    if let Some(ref output_dir) = args.output_dir {
        write_outputs(&report, &schema, output_dir, args.format)?;
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &report)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.documents.len(),
        start.elapsed()
    );
    println!(
        "   {} extracted, {} failed, {} cancelled",
        style(report.extracted).green(),
        style(report.failed).red(),
        style(report.cancelled).yellow()
    );

    let failed: Vec<_> = report
        .documents
        .iter()
        .filter_map(|d| match &d.outcome {
            DocumentOutcome::Failed { reason } => Some((&d.document, reason)),
            _ => None,
        })
        .collect();

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for (document, reason) in failed {
            println!("  - {}: {}", document, reason);
        }
    }

    if report.was_cancelled() {
        anyhow::bail!(
            "Batch cancelled; {} documents were not processed",
            report.cancelled
        );
    }

    Ok(())
}

fn write_outputs(
    report: &BatchReport,
    schema: &FieldSchema,
    output_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut names = OutputNames::default();
    for doc in &report.documents {
        let Some(result) = doc.outcome.result() else {
            continue;
        };

        let output_name = names.claim(&doc.document, format.extension());
        let output_path = output_dir.join(output_name);

        let content = process::format_result(&doc.document, result, schema, format, false)?;
        fs::write(&output_path, content)?;
        debug!("Wrote output to {}", output_path.display());
    }
    Ok(())
}

/// Hands out one output file name per document, unique within a batch.
#[derive(Default)]
struct OutputNames {
    used: HashSet<String>,
}

impl OutputNames {
    /// `<stem>.<ext>`, or `<stem>-N.<ext>` when an earlier document took the stem.
    fn claim(&mut self, document: &str, extension: &str) -> String {
        let stem = Path::new(document)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");

        let mut name = format!("{}.{}", stem, extension);
        let mut n = 1;
        // Case-insensitive filesystems treat A.json and a.json as one file.
        while !self.used.insert(name.to_lowercase()) {
            n += 1;
            name = format!("{}-{}.{}", stem, n, extension);
        }
        if n > 1 {
            warn!("Output name for {} taken, writing {}", document, name);
        }
        name
    }
}

fn write_summary(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "field",
        "found",
        "missing",
        "found_rate",
        "average_confidence",
        "min_confidence",
        "max_confidence",
    ])?;

    for (field, stats) in &report.fields {
        wtr.write_record([
            field.as_str(),
            &stats.found.to_string(),
            &stats.missing.to_string(),
            &format!("{:.2}", stats.found_rate()),
            &format!("{:.2}", stats.average_confidence),
            &stats.min_confidence.map(|c| format!("{:.2}", c)).unwrap_or_default(),
            &stats.max_confidence.map(|c| format!("{:.2}", c)).unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
