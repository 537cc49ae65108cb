//! Schema command - inspect and validate field schemas.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use fieldscan_core::schema::FieldSchema;

use super::source;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    command: SchemaCommand,
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// Print the active schema as JSON
    Show,

    /// List fields with their type, aliases and pattern counts
    Fields,

    /// Validate a schema file
    Check {
        /// Schema file to validate
        file: PathBuf,
    },
}

pub async fn run(
    args: SchemaArgs,
    config_path: Option<&str>,
    schema_path: Option<&Path>,
) -> anyhow::Result<()> {
    match args.command {
        SchemaCommand::Show => {
            let schema = active_schema(config_path, schema_path)?;
            println!("{}", serde_json::to_string_pretty(&schema.to_spec())?);
            Ok(())
        }
        SchemaCommand::Fields => {
            let schema = active_schema(config_path, schema_path)?;
            list_fields(&schema);
            Ok(())
        }
        SchemaCommand::Check { file } => check_schema(&file),
    }
}

fn active_schema(
    config_path: Option<&str>,
    schema_path: Option<&Path>,
) -> anyhow::Result<std::sync::Arc<FieldSchema>> {
    let config = source::load_config(config_path)?;
    source::load_schema(schema_path, &config)
}

fn list_fields(schema: &FieldSchema) {
    let width = schema.fields().iter().map(|f| f.id.len()).max().unwrap_or(0);

    for field in schema.fields() {
        println!(
            "{:width$}  {:5}  {} aliases, {} patterns  ({})",
            field.id,
            field.value_type,
            field.aliases.len(),
            field.patterns.len(),
            field.name,
            width = width
        );
    }
    println!();
    println!("{} {} fields", style("ℹ").blue(), schema.len());
}

fn check_schema(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("Schema file not found: {}", path.display());
    }

    let schema = FieldSchema::from_file(path)?;

    println!(
        "{} {} is valid: {} fields, {} aliases",
        style("✓").green(),
        path.display(),
        schema.len(),
        schema.aliases().entries().len()
    );

    Ok(())
}
