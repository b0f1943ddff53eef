use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    Initialization(String),

    #[error("Failed to process image: {0}")]
    Processing(String),

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("Input file is not supported: {path}. Supported file types are: {supported}")]
    UnsupportedFormat { path: PathBuf, supported: String },

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("No pages could be rendered from {0}")]
    EmptyDocument(PathBuf),

    #[error("Invalid tesseract config: {0}")]
    InvalidConfig(String),

    #[error("Unknown preprocess '{name}'. Preprocesses available are: {available}")]
    InvalidPreprocess { name: String, available: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{engine} engine does not support {operation}")]
    Unsupported {
        engine: &'static str,
        operation: &'static str,
    },

    #[error("page {page} of {total}: {source}")]
    Page {
        page: usize,
        total: usize,
        #[source]
        source: Box<OcrError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
