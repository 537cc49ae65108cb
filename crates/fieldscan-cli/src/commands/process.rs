//! Process command - extract fields from a single document.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use fieldscan_core::models::{Candidate, ExtractionResult, Provenance};
use fieldscan_core::schema::FieldSchema;
use fieldscan_core::{DocumentSource, Extractor};

use super::source::{self, FileSource};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Include every surviving candidate, not just the winners
    #[arg(long)]
    audit: bool,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per field
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Winning value of one field as written to reports.
#[derive(Serialize)]
struct FieldOutput<'a> {
    value: &'a str,
    confidence: f32,
    provenance: Provenance,
    page: u32,
}

#[derive(Serialize)]
struct DocumentOutput<'a> {
    document: &'a str,
    fields: BTreeMap<&'a str, FieldOutput<'a>>,
    missing: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    candidates: Option<&'a [Candidate]>,
}

pub async fn run(
    args: ProcessArgs,
    config_path: Option<&str>,
    schema_path: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = source::load_config(config_path)?;
    let schema = source::load_schema(schema_path, &config)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if !source::is_supported(&args.input) {
        anyhow::bail!(
            "Unsupported file format: {}",
            source::extension_of(&args.input)
        );
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    pb.set_message("Loading document...");
    let file = FileSource::new(&args.input);
    let doc = file.load()?;
    debug!("Loaded {} lines on {} pages", doc.len(), doc.page_count());

    pb.set_message("Extracting fields...");
    let extractor = Extractor::new(schema.clone(), config.extraction.clone());
    let result = extractor.extract(&doc)?;

    pb.finish_and_clear();

    let id = file.id();
    let output = format_result(&id, &result, &schema, args.format, args.audit)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        eprintln!();
        eprintln!(
            "{} Fields found: {}/{}",
            style("ℹ").for_stderr().blue(),
            result.found_count(),
            schema.len()
        );
        eprintln!(
            "{} Average confidence: {:.1}%",
            style("ℹ").for_stderr().blue(),
            result.average_confidence() * 100.0
        );
        for (provenance, count) in result.provenance_counts() {
            eprintln!("   {}: {}", provenance, count);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Render one document's result in the requested format.
pub fn format_result(
    document: &str,
    result: &ExtractionResult,
    schema: &FieldSchema,
    format: OutputFormat,
    audit: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => format_json(document, result, audit),
        OutputFormat::Csv => format_csv(result, schema, audit),
        OutputFormat::Text => Ok(format_text(result, schema, audit)),
    }
}

fn format_json(document: &str, result: &ExtractionResult, audit: bool) -> anyhow::Result<String> {
    let fields = result
        .fields
        .iter()
        .map(|(id, winner)| {
            (
                id.as_str(),
                FieldOutput {
                    value: &winner.value,
                    confidence: winner.confidence,
                    provenance: winner.provenance,
                    page: winner.page,
                },
            )
        })
        .collect();

    let output = DocumentOutput {
        document,
        fields,
        missing: &result.missing,
        candidates: audit.then_some(result.candidates.as_slice()),
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

fn format_csv(
    result: &ExtractionResult,
    schema: &FieldSchema,
    audit: bool,
) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    if audit {
        wtr.write_record([
            "field",
            "value",
            "raw",
            "confidence",
            "provenance",
            "page",
            "winner",
            "context",
        ])?;
        for field in schema.fields() {
            let winner = result.get(&field.id);
            for candidate in result.candidates_for(&field.id) {
                wtr.write_record([
                    candidate.field.as_str(),
                    &candidate.value,
                    &candidate.raw,
                    &format!("{:.2}", candidate.confidence),
                    candidate.provenance.as_str(),
                    &candidate.page.to_string(),
                    if winner == Some(candidate) { "yes" } else { "no" },
                    &candidate.context,
                ])?;
            }
        }
    } else {
        wtr.write_record(["field", "value", "confidence", "provenance", "page"])?;
        for field in schema.fields() {
            match result.get(&field.id) {
                Some(winner) => wtr.write_record([
                    field.id.as_str(),
                    &winner.value,
                    &format!("{:.2}", winner.confidence),
                    winner.provenance.as_str(),
                    &winner.page.to_string(),
                ])?,
                None => wtr.write_record([field.id.as_str(), "", "", "", ""])?,
            }
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult, schema: &FieldSchema, audit: bool) -> String {
    let width = schema.fields().iter().map(|f| f.name.len()).max().unwrap_or(0);
    let mut output = String::new();

    for field in schema.fields() {
        match result.get(&field.id) {
            Some(winner) => {
                output.push_str(&format!(
                    "{:width$}  {}  ({}, {:.2})\n",
                    field.name,
                    winner.value,
                    winner.provenance,
                    winner.confidence,
                    width = width
                ));
                if audit && !winner.context.is_empty() {
                    output.push_str(&format!(
                        "{:width$}    near: {}\n",
                        "",
                        winner.context,
                        width = width
                    ));
                }
            }
            None => {
                output.push_str(&format!("{:width$}  -\n", field.name, width = width));
            }
        }

        if audit {
            for candidate in result.candidates_for(&field.id) {
                if result.get(&field.id) == Some(candidate) {
                    continue;
                }
                output.push_str(&format!(
                    "{:width$}    also: {}  ({}, {:.2}, page {})\n",
                    "",
                    candidate.value,
                    candidate.provenance,
                    candidate.confidence,
                    candidate.page,
                    width = width
                ));
                if !candidate.context.is_empty() {
                    output.push_str(&format!(
                        "{:width$}      near: {}\n",
                        "",
                        candidate.context,
                        width = width
                    ));
                }
            }
        }
    }

    output.push_str(&format!(
        "\n{} of {} fields found\n",
        result.found_count(),
        schema.len()
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscan_core::models::{ExtractionConfig, RawDocument};
    use std::sync::Arc;

    fn extract(text: &str) -> (Arc<FieldSchema>, ExtractionResult) {
        let schema = Arc::new(FieldSchema::builtin().unwrap());
        let extractor = Extractor::new(schema.clone(), ExtractionConfig::default());
        let result = extractor.extract(&RawDocument::from_text(text)).unwrap();
        (schema, result)
    }

    #[test]
    fn test_json_lists_winner_and_missing() {
        let (_, result) = extract("Policy No: ABC12345");
        let json = format_json("doc.txt", &result, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["fields"]["policy_no"]["value"], "ABC12345");
        assert_eq!(value["fields"]["policy_no"]["provenance"], "direct");
        assert!(value["missing"].as_array().unwrap().len() > 0);
        assert!(value.get("candidates").is_none());
    }

    #[test]
    fn test_csv_has_row_per_field() {
        let (schema, result) = extract("Policy No: ABC12345");
        let csv = format_csv(&result, &schema, false).unwrap();

        assert_eq!(csv.lines().count(), schema.len() + 1);
        assert!(csv.contains("policy_no,ABC12345,"));
    }

    #[test]
    fn test_text_marks_missing_fields() {
        let (schema, result) = extract("Policy No: ABC12345");
        let text = format_text(&result, &schema, true);

        assert!(text.contains("ABC12345"));
        assert!(text.contains(&format!("1 of {} fields found", schema.len())));
    }

    #[test]
    fn test_audit_includes_context() {
        let (schema, result) = extract("Policy No: ABC12345\nInsured Name: John Doe");

        let csv = format_csv(&result, &schema, true).unwrap();
        assert!(csv.starts_with("field,value,raw,confidence,provenance,page,winner,context\n"));
        assert!(csv.contains(",yes,Policy No: ABC12345 Insured Name: John Doe\n"));

        let text = format_text(&result, &schema, true);
        assert!(text.contains("near: Policy No: ABC12345 Insured Name: John Doe"));

        let json = format_json("doc.txt", &result, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let candidates = value["candidates"].as_array().unwrap();
        assert!(candidates.iter().all(|c| c["context"].as_str().is_some()));
    }
}
