use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::CodecError;

/// How instance-identifier values are spelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IidDialect {
    /// A module prefix only where the module changes along the path.
    #[default]
    Rfc7951,
    /// A module prefix on every step.
    Lhotka02,
}

/// How a codec factory remembers the codecs it has built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    None,
    #[default]
    Lazy,
    Eager,
    Shared,
}

/// Settings for one encoder/decoder setup, usually read from a JSON file.
///
/// ```
/// use yang_json_codec::{CachePolicy, CodecOptions, IidDialect};
///
/// let options = CodecOptions::from_json(r#"{"dialect": "lhotka02", "lenient": true}"#).unwrap();
/// assert_eq!(options.dialect, IidDialect::Lhotka02);
/// assert_eq!(options.cache, CachePolicy::Lazy);
/// assert!(options.lenient && !options.pretty);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecOptions {
    pub dialect:       IidDialect,
    pub cache:         CachePolicy,
    pub lenient:       bool,
    pub pretty:        bool,
    pub intern_values: bool,
}

impl CodecOptions {
    pub fn from_json(text: &str) -> Result<CodecOptions, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<CodecOptions, CodecError> {
        let text = fs::read_to_string(path)?;
        CodecOptions::from_json(&text).map_err(|e| CodecError::Syntax {
            msg:    format!("{}: {}", path.display(), e),
            line:   e.line(),
            column: e.column(),
        })
    }
}
