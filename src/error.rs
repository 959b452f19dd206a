use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AnnotateError {
    #[error("invalid strand: {0}")]
    InvalidStrand(String),

    #[error("invalid ENCODE file accession: {0}")]
    InvalidAccession(String),

    #[error("no metadata row for file accession: {0}")]
    MetadataNotFound(String),

    #[error("{file}: {detail}")]
    Parse { file: String, detail: String },

    #[error("metadata table {file} is missing required column: {column}")]
    MissingColumn { file: String, column: String },

    #[error("ENCODE request failed: {0}")]
    EncodeHttp(String),

    #[error("ENCODE returned status {status}: {message}")]
    EncodeStatus { status: u16, message: String },

    #[error("annotation file not present in store: {0}")]
    AnnotationNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl AnnotateError {
    /// Parse error tied to a specific input file.
    pub fn parse(file: impl Into<String>, detail: impl Into<String>) -> Self {
        AnnotateError::Parse {
            file: file.into(),
            detail: detail.into(),
        }
    }
}
