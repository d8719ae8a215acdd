//! Encoder and decoder settings.

use serde::{Deserialize, Serialize};

use crate::scan::MAX_DEPTH;

/// Settings for the encode direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Escape `<`, `>`, `&`, `'`, `+` and backtick inside strings.
    pub escape_html: bool,
    /// Break the output into lines even when `prefix` and `indent` are
    /// both empty.
    pub indented: bool,
    /// Line prefix of indented output.
    pub prefix: String,
    /// Per-level indentation; a non-empty value turns indentation on.
    pub indent: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            escape_html: true,
            indented: false,
            prefix: String::new(),
            indent: String::new(),
        }
    }
}

impl EncodeOptions {
    pub fn indented(prefix: &str, indent: &str) -> Self {
        EncodeOptions {
            indented: true,
            prefix: prefix.to_string(),
            indent: indent.to_string(),
            ..EncodeOptions::default()
        }
    }

    pub(crate) fn is_indented(&self) -> bool {
        self.indented || !self.prefix.is_empty() || !self.indent.is_empty()
    }
}

/// Settings for the decode direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Report object keys that match no record field.
    pub disallow_unknown_fields: bool,
    /// Accept fraction/exponent literals with an integral value, such as
    /// `1e3`, for integer targets.
    pub integral_exponents: bool,
    /// Maximum container nesting.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            disallow_unknown_fields: false,
            integral_exponents: false,
            max_depth: MAX_DEPTH,
        }
    }
}
