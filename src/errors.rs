//! Unified error types for the storage engine and the console.
//!
//! Every fallible operation in the crate returns [`Result`]. Database failures of any
//! kind (connect, schema, query, commit) are folded into [`Error::Transaction`] so the
//! caller sees one error kind per backend medium.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the entity model, the storage backends and the configuration layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A type tag that does not name any known entity kind
    #[error("Unknown entity type: {name}")]
    UnknownType {
        /// The offending type name
        name: String,
    },

    /// A timestamp, field value or literal could not be parsed into its typed form
    #[error("Parse error: {message}")]
    Parse {
        /// What failed to parse
        message: String,
    },

    /// The JSON document of the file backend could not be read or written
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The relational backend failed to run or commit a unit of work
    #[error("Transaction error: {message}")]
    Transaction {
        /// Database error description
        message: String,
    },

    /// A composite key is absent from the working set
    #[error("No instance found: {key}")]
    NotFound {
        /// The `TypeName.id` key that was looked up
        key: String,
    },

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::Transaction {
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
