//! Loading documents from disk and resolving config and schema.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::Document;
use tracing::debug;

use fieldscan_core::error::DocumentError;
use fieldscan_core::models::config::FieldscanConfig;
use fieldscan_core::models::RawDocument;
use fieldscan_core::schema::FieldSchema;
use fieldscan_core::DocumentSource;

/// File extensions the CLI knows how to read.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "text", "pdf"];

/// A document backed by a file on disk.
///
/// Plain text is split into pages on form feeds; PDFs contribute one page
/// per PDF page from their embedded text layer.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn extension(&self) -> String {
        extension_of(&self.path)
    }
}

impl DocumentSource for FileSource {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RawDocument, DocumentError> {
        let data = fs::read(&self.path)
            .map_err(|e| DocumentError::Unreadable(format!("{}: {}", self.path.display(), e)))?;

        match self.extension().as_str() {
            "pdf" => load_pdf(&data),
            "txt" | "text" => {
                let text = String::from_utf8_lossy(&data);
                Ok(RawDocument::from_text(&text))
            }
            other => Err(DocumentError::Unreadable(format!(
                "unsupported file format: {}",
                other
            ))),
        }
    }
}

/// Lowercased extension of a path, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(path).as_str())
}

fn load_pdf(data: &[u8]) -> Result<RawDocument, DocumentError> {
    let mut doc =
        Document::load_mem(data).map_err(|e| DocumentError::Unreadable(e.to_string()))?;

    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|_| DocumentError::Unreadable("PDF is password protected".to_string()))?;
        debug!("Decrypted PDF with empty password");
    }

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(DocumentError::Unreadable("PDF has no pages".to_string()));
    }

    let mut texts = Vec::with_capacity(pages.len());
    for page in pages.keys() {
        let text = doc
            .extract_text(&[*page])
            .map_err(|e| DocumentError::Unreadable(format!("page {}: {}", page, e)))?;
        texts.push(text);
    }
    debug!("Extracted text from {} PDF pages", texts.len());

    Ok(RawDocument::from_pages(texts))
}

/// Load configuration from an explicit path, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FieldscanConfig> {
    match config_path {
        Some(path) => Ok(FieldscanConfig::from_file(Path::new(path))?),
        None => Ok(FieldscanConfig::default()),
    }
}

/// Resolve the schema: `--schema` wins over the config file, then the built-in.
pub fn load_schema(
    schema_path: Option<&Path>,
    config: &FieldscanConfig,
) -> anyhow::Result<Arc<FieldSchema>> {
    let schema = match schema_path.or(config.schema.path.as_deref()) {
        Some(path) => {
            debug!("Loading schema from {}", path.display());
            FieldSchema::from_file(path)?
        }
        None => FieldSchema::builtin()?,
    };
    Ok(Arc::new(schema))
}
