//! Error types for markup parsing and conversion

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("Malformed markup: {0}")]
    Parse(String),

    #[error("Document model error: {0}")]
    DocModel(#[from] doc_model::DocModelError),
}

pub type Result<T> = std::result::Result<T, MarkupError>;
