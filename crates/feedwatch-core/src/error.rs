use std::fmt;

use thiserror::Error;

/// The column of a changefeed row that failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Table,
    Keys,
    Value,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeStage::Table => "table",
            DecodeStage::Keys => "keys",
            DecodeStage::Value => "value",
        };
        f.write_str(name)
    }
}

/// Errors raised while decoding a raw changefeed row.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("table column is not valid UTF-8: {0}")]
    Table(#[source] std::string::FromUtf8Error),

    #[error("keys column is not a JSON array of strings: {0}")]
    Keys(#[source] serde_json::Error),

    #[error("value column is not a valid changefeed JSON object: {0}")]
    Value(#[source] serde_json::Error),
}

impl DecodeError {
    /// The column that could not be decoded.
    pub fn stage(&self) -> DecodeStage {
        match self {
            DecodeError::Table(_) => DecodeStage::Table,
            DecodeError::Keys(_) => DecodeStage::Keys,
            DecodeError::Value(_) => DecodeStage::Value,
        }
    }
}

/// Errors raised when a string is not a usable cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("cursor is empty")]
    Empty,

    #[error("invalid cursor '{0}': expected a decimal timestamp like 1586782034314054700.0000000000")]
    Invalid(String),
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
