//! Error types for the derivative generator.
//!
//! One enum covers the whole run; variants correspond to the stage that
//! failed rather than to the underlying library error.

/// Result type alias for derivative operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while producing derivatives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or inconsistent configuration, detected before any work begins
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Required input (image directory, METS file) is missing
    #[error("Missing input: {0}")]
    InputMissing(String),

    /// Malformed METS/MODS/ALTO
    #[error("Failed to parse {source_file}: {reason}")]
    Parse {
        /// File that failed to parse
        source_file: String,
        /// Reason for the parse failure
        reason: String,
    },

    /// Unresolvable logical structure (broken structLink, missing ORDER)
    #[error("Structure mapping failed: {0}")]
    Structure(String),

    /// Image decode, scale or encode failure
    #[error("Image error: {0}")]
    Image(String),

    /// PDF composition failure
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Enriched METS could not be serialized or written
    #[error("METS write error: {0}")]
    MetsWrite(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
