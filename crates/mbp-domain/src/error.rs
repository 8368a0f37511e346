//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the MegaBrain parsing engine
#[derive(Error, Debug)]
pub enum Error {
    /// Caller contract violated; the only error kind that escapes `parse`
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// An extractor emitted a chunk that violates the chunk invariants
    #[error("Invalid chunk: {message}")]
    InvalidChunk {
        /// Which invariant was violated
        message: String,
    },

    /// I/O operation error (simple form)
    #[error("I/O error: {source}")]
    IoSimple {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// I/O operation error (with context)
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Upstream grammar fetch failed after retries
    #[error("Download failed: {message}")]
    Download {
        /// Description of the download failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Downloaded file is empty, truncated or fails hash verification
    #[error("Integrity failure: {message}")]
    Integrity {
        /// Description of the integrity failure
        message: String,
    },

    /// Library loads but the grammar entry symbol is missing or unusable
    #[error("Grammar incompatible: {message}")]
    GrammarIncompatible {
        /// Description of the incompatibility
        message: String,
    },

    /// Underlying parser produced no tree or threw
    #[error("Parse failed: {message}")]
    ParseFailed {
        /// Description of the parse failure
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create an invalid-argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an invalid-chunk error
    pub fn invalid_chunk<S: Into<String>>(message: S) -> Self {
        Self::InvalidChunk {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create a download error
    pub fn download<S: Into<String>>(message: S) -> Self {
        Self::Download {
            message: message.into(),
            source: None,
        }
    }

    /// Create a download error with a source
    pub fn download_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Download {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an integrity-failure error
    pub fn integrity<S: Into<String>>(message: S) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Create a grammar-incompatible error
    pub fn grammar_incompatible<S: Into<String>>(message: S) -> Self {
        Self::GrammarIncompatible {
            message: message.into(),
        }
    }

    /// Create a parse-failed error
    pub fn parse_failed<S: Into<String>>(message: S) -> Self {
        Self::ParseFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }
}
