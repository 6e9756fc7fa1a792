use std::io::{self, Write};

use yang_json_schema::JsonValue;

use crate::codecs::JsonScalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Object,
    Array,
}

struct Level {
    scope: Scope,
    empty: bool,
}

/// A streaming JSON token writer with optional two-space indentation.
///
/// The writer only inserts separators and indentation; callers are
/// responsible for a well-formed token order.
pub struct JsonWriter<W: Write> {
    out:        W,
    pretty:     bool,
    levels:     Vec<Level>,
    after_name: bool,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(out: W) -> JsonWriter<W> {
        JsonWriter { out, pretty: false, levels: Vec::new(), after_name: false }
    }

    pub fn pretty(out: W) -> JsonWriter<W> {
        JsonWriter { pretty: true, ..JsonWriter::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn begin_object(&mut self) -> io::Result<()> {
        self.before_value()?;
        self.out.write_all(b"{")?;
        self.levels.push(Level { scope: Scope::Object, empty: true });
        Ok(())
    }

    pub fn end_object(&mut self) -> io::Result<()> {
        self.close(Scope::Object, b"}")
    }

    pub fn begin_array(&mut self) -> io::Result<()> {
        self.before_value()?;
        self.out.write_all(b"[")?;
        self.levels.push(Level { scope: Scope::Array, empty: true });
        Ok(())
    }

    pub fn end_array(&mut self) -> io::Result<()> {
        self.close(Scope::Array, b"]")
    }

    /// Writes an object member name; the next token is its value.
    pub fn name(&mut self, name: &str) -> io::Result<()> {
        self.separate()?;
        self.write_string(name)?;
        self.out.write_all(if self.pretty { b": " } else { b":" })?;
        self.after_name = true;
        Ok(())
    }

    pub fn string(&mut self, value: &str) -> io::Result<()> {
        self.before_value()?;
        self.write_string(value)
    }

    /// Writes a number token verbatim; `text` must already be a JSON number.
    pub fn number(&mut self, text: &str) -> io::Result<()> {
        self.before_value()?;
        self.out.write_all(text.as_bytes())
    }

    pub fn boolean(&mut self, value: bool) -> io::Result<()> {
        self.before_value()?;
        self.out.write_all(if value { b"true" } else { b"false" })
    }

    pub fn null(&mut self) -> io::Result<()> {
        self.before_value()?;
        self.out.write_all(b"null")
    }

    pub fn scalar(&mut self, scalar: &JsonScalar) -> io::Result<()> {
        match scalar {
            JsonScalar::Boolean(value) => self.boolean(*value),
            JsonScalar::Number(text)   => self.number(text),
            JsonScalar::String(text)   => self.string(text),
            JsonScalar::Empty => {
                self.begin_array()?;
                self.null()?;
                self.end_array()
            }
        }
    }

    pub fn value(&mut self, value: &JsonValue) -> io::Result<()> {
        match value {
            JsonValue::Null         => self.null(),
            JsonValue::Bool(v)      => self.boolean(*v),
            JsonValue::Number(text) => self.number(text),
            JsonValue::String(text) => self.string(text),
            JsonValue::Array(items) => {
                self.begin_array()?;
                for item in items {
                    self.value(item)?;
                }
                self.end_array()
            }
            JsonValue::Object(members) => {
                self.begin_object()?;
                for (name, member) in members {
                    self.name(name)?;
                    self.value(member)?;
                }
                self.end_object()
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn write_string(&mut self, text: &str) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, text).map_err(io::Error::from)
    }

    fn before_value(&mut self) -> io::Result<()> {
        if self.after_name {
            self.after_name = false;
            return Ok(());
        }
        self.separate()
    }

    fn separate(&mut self) -> io::Result<()> {
        let depth = self.levels.len();
        if let Some(level) = self.levels.last_mut() {
            if !level.empty {
                self.out.write_all(b",")?;
            }
            level.empty = false;
            if self.pretty {
                self.newline(depth)?;
            }
        }
        Ok(())
    }

    fn close(&mut self, scope: Scope, token: &[u8]) -> io::Result<()> {
        let level = match self.levels.pop() {
            Some(level) if level.scope == scope => level,
            _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "unbalanced JSON nesting")),
        };
        if self.pretty && !level.empty {
            self.newline(self.levels.len())?;
        }
        self.out.write_all(token)
    }

    fn newline(&mut self, depth: usize) -> io::Result<()> {
        self.out.write_all(b"\n")?;
        for _ in 0..depth {
            self.out.write_all(b"  ")?;
        }
        Ok(())
    }
}
