use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use yang_json_schema::{BinaryType, Bit, BitsType, EnumType, LengthRange, StringType, Value, ValueKind};

use super::JsonScalar;
use crate::error::ValueError;

fn check_length(length: u64, ranges: &[LengthRange]) -> Result<(), ValueError> {
    if ranges.is_empty() || ranges.iter().any(|r| r.min <= length && length <= r.max) {
        Ok(())
    } else {
        Err(ValueError::Length(length))
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    regex:  Regex,
    invert: bool,
}

/// Codec for `string`: length in characters, then every pattern in order.
#[derive(Debug, Clone)]
pub struct StringCodec {
    length:   Vec<LengthRange>,
    patterns: Vec<Pattern>,
}

impl StringCodec {
    pub fn new(type_def: &StringType) -> Result<StringCodec, ValueError> {
        let patterns = type_def
            .patterns
            .iter()
            .map(|p| {
                // YANG patterns are implicitly anchored.
                let regex = Regex::new(&format!("^(?:{})$", p.regex))
                    .map_err(|e| ValueError::Unsupported(format!("pattern {:?}: {}", p.regex, e)))?;
                Ok(Pattern { source: p.regex.clone(), regex, invert: p.invert_match })
            })
            .collect::<Result<Vec<_>, ValueError>>()?;
        Ok(StringCodec { length: type_def.length.clone(), patterns })
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        self.check(text)?;
        Ok(Value::String(text.to_owned()))
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        match value {
            Value::String(text) => {
                self.check(text)?;
                Ok(JsonScalar::String(text.clone()))
            }
            other => Err(ValueError::wrong_kind(ValueKind::String, other.kind())),
        }
    }

    fn check(&self, text: &str) -> Result<(), ValueError> {
        check_length(text.chars().count() as u64, &self.length)?;
        for pattern in &self.patterns {
            if pattern.regex.is_match(text) == pattern.invert {
                return Err(ValueError::Pattern { text: text.to_owned(), pattern: pattern.source.clone() });
            }
        }
        Ok(())
    }
}

/// Codec for `binary`: base64 text, length counted in octets.
#[derive(Debug, Clone)]
pub struct BinaryCodec {
    length: Vec<LengthRange>,
}

impl BinaryCodec {
    pub fn new(type_def: &BinaryType) -> BinaryCodec {
        BinaryCodec { length: type_def.length.clone() }
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|_| ValueError::lexical(text, "base64 binary"))?;
        check_length(bytes.len() as u64, &self.length)?;
        Ok(Value::Binary(bytes))
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        match value {
            Value::Binary(bytes) => {
                check_length(bytes.len() as u64, &self.length)?;
                Ok(JsonScalar::String(STANDARD.encode(bytes)))
            }
            other => Err(ValueError::wrong_kind(ValueKind::Binary, other.kind())),
        }
    }
}

/// Codec for `bits`: space-separated bit names, canonically in position order.
#[derive(Debug, Clone)]
pub struct BitsCodec {
    bits: Vec<Bit>,
}

impl BitsCodec {
    pub fn new(type_def: &BitsType) -> BitsCodec {
        let mut bits = type_def.bits.clone();
        bits.sort_by_key(|b| b.position);
        BitsCodec { bits }
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        let names: Vec<&str> = text.split_whitespace().collect();
        Ok(Value::Bits(self.canonical(&names)?))
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        match value {
            Value::Bits(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                Ok(JsonScalar::String(self.canonical(&names)?.join(" ")))
            }
            other => Err(ValueError::wrong_kind(ValueKind::Bits, other.kind())),
        }
    }

    fn canonical(&self, names: &[&str]) -> Result<Vec<String>, ValueError> {
        for (i, name) in names.iter().enumerate() {
            if !self.bits.iter().any(|b| b.name == *name) {
                return Err(ValueError::UnknownBit(name.to_string()));
            }
            if names[..i].contains(name) {
                return Err(ValueError::DuplicateBit(name.to_string()));
            }
        }
        Ok(self
            .bits
            .iter()
            .filter(|b| names.contains(&b.name.as_str()))
            .map(|b| b.name.clone())
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct EnumCodec {
    names: Vec<String>,
}

impl EnumCodec {
    pub fn new(type_def: &EnumType) -> EnumCodec {
        EnumCodec { names: type_def.enums.iter().map(|e| e.name.clone()).collect() }
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        if self.names.iter().any(|n| n == text) {
            Ok(Value::Enumeration(text.to_owned()))
        } else {
            Err(ValueError::UnknownEnum(text.to_owned()))
        }
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        match value {
            Value::Enumeration(name) if self.names.contains(name) => Ok(JsonScalar::String(name.clone())),
            Value::Enumeration(name) => Err(ValueError::UnknownEnum(name.clone())),
            other => Err(ValueError::wrong_kind(ValueKind::Enumeration, other.kind())),
        }
    }
}
