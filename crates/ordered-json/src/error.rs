//! Error types for the ordered JSON codec.
//!
//! Decoding reports syntax errors with the byte offset of the offending
//! character; type mismatches carry the offset and the record field path.

use thiserror::Error;

/// Errors produced by the ordered JSON codec.
#[derive(Error, Debug)]
pub enum JsonError {
    /// Malformed input bytes.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A well-formed value that does not fit the decode target.
    #[error("cannot unmarshal {value} into {}", describe_target(.target, .field))]
    UnmarshalType {
        value: String,
        target: String,
        offset: usize,
        field: Option<String>,
    },

    /// A value with no JSON representation: NaN, infinities, cycles and
    /// map keys that are neither strings nor text hooks.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    /// The `string` field option met an input it cannot interpret.
    #[error("invalid use of ,string struct tag, trying to unmarshal {value} into {target}")]
    StringTag { value: String, target: String },

    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// A user hook failed or produced invalid JSON.
    #[error("error calling {method} for type {type_name}: {source}")]
    Hook {
        method: &'static str,
        type_name: String,
        #[source]
        source: Box<JsonError>,
    },

    #[error("illegal base64 data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The stream reader reached the end of its input between values.
    #[error("EOF")]
    Eof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl JsonError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        JsonError::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Free-form error for use inside user hooks.
    pub fn custom(message: impl std::fmt::Display) -> Self {
        JsonError::Custom(message.to_string())
    }

    /// Byte offset of the failure, for errors that carry one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            JsonError::Syntax { offset, .. }
            | JsonError::UnmarshalType { offset, .. }
            | JsonError::InvalidUtf8 { offset } => Some(*offset),
            _ => None,
        }
    }
}

fn describe_target(target: &str, field: &Option<String>) -> String {
    match field {
        Some(field) => format!("record field {field} of type {target}"),
        None => format!("value of type {target}"),
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, JsonError>;
