use serde_json::error::Category;
use std::io::Read;

use yang_json_schema::JsonValue;

use crate::error::CodecError;

/// Parses a complete JSON document. Blank input is "no data", not an error.
pub fn parse_str(text: &str) -> Result<Option<JsonValue>, CodecError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some).map_err(map_error)
}

/// Reads `reader` to the end and parses what it produced.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<Option<JsonValue>, CodecError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_str(&text)
}

fn map_error(error: serde_json::Error) -> CodecError {
    let msg = error.to_string();
    match error.classify() {
        Category::Io => CodecError::Io(error.into()),
        _ if msg.starts_with("recursion limit exceeded") => CodecError::ResourceExhaustion(msg),
        _ => CodecError::Syntax {
            line:   error.line(),
            column: error.column(),
            msg,
        },
    }
}
