//! Error types for codec operations
//!
//! Provides the crate error type with automatic conversions from common error
//! sources using the thiserror crate for ergonomic error handling throughout
//! the library.

use std::io;
use thiserror::Error;

/// Main error type for peslib operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read would cross the end of the input buffer
    #[error("Truncated input: {needed} byte(s) at offset {offset}")]
    Truncated {
        /// Offset of the failed read
        offset: usize,
        /// Number of bytes the read required
        needed: usize,
    },

    /// Unexpected format tag or section marker
    #[error("Marker mismatch: {0}")]
    Marker(String),

    /// A value is outside its permitted range
    #[error("Range violation: {0}")]
    Range(String),

    /// A sink or iteration callback returned false
    #[error("Aborted by callback")]
    Aborted,

    /// XML syntax error with source position
    #[error("XML error at {row}:{column}: {message}")]
    Xml {
        /// Row of the offending token, 1-based
        row: usize,
        /// Column of the offending token, 1-based
        column: usize,
        /// Description of the syntax error
        message: String,
    },

    /// Semantic SVG embroidery error with source position
    #[error("SVG error at {row}:{column}: {message}")]
    Svg {
        /// Row of the offending token, 1-based
        row: usize,
        /// Column of the offending token, 1-based
        column: usize,
        /// Description of the semantic error
        message: String,
    },

    /// Unsupported operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for peslib operations
pub type Result<T> = std::result::Result<T, Error>;
