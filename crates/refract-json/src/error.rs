//! Error types for metadata documents

use refract_core::ReflectError;
use thiserror::Error;

/// Result type for metadata document reading
pub type JsonMetaResult<T> = Result<T, JsonMetaError>;

/// Errors that can occur while reading a metadata document
#[derive(Debug, Error)]
pub enum JsonMetaError {
    /// Failed to read the document file
    #[error("Failed to read metadata file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON, or a document not shaped like metadata
    #[error("Failed to parse metadata: {0}")]
    Parse(#[from] serde_json::Error),

    /// A method's argument names and types differ in length
    #[error(
        "Method {class}::{method} has {names} argument names but {types} argument types"
    )]
    ArgumentLengthMismatch {
        /// Declaring type
        class: String,
        /// Method name
        method: String,
        /// Number of argument names
        names: usize,
        /// Number of argument types
        types: usize,
    },

    /// An annotation has a null value
    #[error("Annotation {annotation} on {owner} has a null value")]
    NullAnnotation {
        /// Annotated type or member
        owner: String,
        /// Annotation name
        annotation: String,
    },

    /// The described type is rejected by the meta model
    #[error("Invalid type description: {0}")]
    Invalid(#[from] ReflectError),
}
