//! Raw layer reader
//!
//! Loads movie catalog JSON from a file or a directory and flattens the
//! top-level `movie` array into one [`RawRecord`] per movie.

use movieshop_common::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::cast;

/// Top-level array field holding the movie records
pub const DEFAULT_ARRAY_FIELD: &str = "movie";

/// One movie exactly as ingested; no invariants are assumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Value);

/// Reads raw JSON documents from local storage
#[derive(Debug, Clone)]
pub struct RawReader {
    array_field: String,
}

impl Default for RawReader {
    fn default() -> Self {
        Self {
            array_field: DEFAULT_ARRAY_FIELD.to_string(),
        }
    }
}

impl RawReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a different top-level array field
    pub fn with_array_field(mut self, field: impl Into<String>) -> Self {
        self.array_field = field.into();
        self
    }

    /// Read every record under `location`
    ///
    /// `location` may be a single file or a directory, in which case all
    /// `*.json` files are read in name order. Each file may contain one
    /// multi-line document, an array of documents, or newline-delimited
    /// documents. A `file://` prefix is accepted.
    #[instrument(skip(self), fields(location = %location.display()))]
    pub async fn read(&self, location: &Path) -> Result<Vec<RawRecord>> {
        let location = strip_scheme(location);
        let label = location.display().to_string();

        let metadata = tokio::fs::metadata(&location)
            .await
            .map_err(|e| EtlError::ingestion(&label, e.to_string()))?;

        let files = if metadata.is_dir() {
            list_json_files(&location).await?
        } else {
            vec![location.clone()]
        };

        if files.is_empty() {
            return Err(EtlError::ingestion(label, "no JSON files found"));
        }

        let mut records = Vec::new();
        let mut documents = 0usize;

        for file in &files {
            let file_label = file.display().to_string();
            let content = tokio::fs::read_to_string(file)
                .await
                .map_err(|e| EtlError::ingestion(&file_label, e.to_string()))?;

            let docs = parse_documents(&content)
                .map_err(|e| EtlError::ingestion(&file_label, format!("invalid JSON: {}", e)))?;
            debug!(file = %file_label, documents = docs.len(), "Parsed raw file");

            documents += docs.len();
            for doc in docs {
                self.explode(doc, &file_label, &mut records)?;
            }
        }

        if documents == 0 {
            return Err(EtlError::ingestion(label, "contains no parseable JSON"));
        }

        info!(files = files.len(), records = records.len(), "Read raw records");
        Ok(records)
    }

    fn explode(&self, doc: Value, file: &str, out: &mut Vec<RawRecord>) -> Result<()> {
        match cast::field(&doc, &self.array_field) {
            Some(Value::Array(items)) => {
                out.extend(items.iter().cloned().map(RawRecord));
                Ok(())
            },
            None | Some(Value::Null) => {
                debug!(file, field = %self.array_field, "Document has no records");
                Ok(())
            },
            Some(_) => Err(EtlError::ingestion(
                file,
                format!("field '{}' is not an array", self.array_field),
            )),
        }
    }
}

fn strip_scheme(location: &Path) -> PathBuf {
    let text = location.to_string_lossy();
    match text.strip_prefix("file://") {
        Some(rest) => PathBuf::from(rest),
        None => location.to_path_buf(),
    }
}

async fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let label = dir.display().to_string();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| EtlError::ingestion(&label, e.to_string()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| EtlError::ingestion(&label, e.to_string()))?
    {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json && !name.starts_with('.') && !name.starts_with('_') && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Split file content into JSON documents; a top-level array yields its elements
fn parse_documents(content: &str) -> serde_json::Result<Vec<Value>> {
    let mut docs = Vec::new();
    for doc in serde_json::Deserializer::from_str(content).into_iter::<Value>() {
        match doc? {
            Value::Array(items) => docs.extend(items),
            other => docs.push(other),
        }
    }
    Ok(docs)
}
