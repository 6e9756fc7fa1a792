use yang_json_schema::{Decimal64, DecimalRange, DecimalType, IntRange, IntegerKind, IntegerType, Value, ValueKind};

use super::JsonScalar;
use crate::error::ValueError;

/// Codec for the eight integer types. 64-bit values travel as JSON strings,
/// the others as bare numbers.
#[derive(Debug, Clone)]
pub struct IntegerCodec {
    kind:  IntegerKind,
    range: Vec<IntRange>,
}

impl IntegerCodec {
    pub fn new(type_def: &IntegerType) -> IntegerCodec {
        IntegerCodec { kind: type_def.kind, range: type_def.range.clone() }
    }

    pub fn kind(&self) -> IntegerKind {
        self.kind
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        let digits = text.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValueError::lexical(text, self.kind.name()));
        }
        let number: i128 = text
            .parse()
            .map_err(|_| ValueError::out_of_range(text, self.kind.name()))?;
        self.check(number)?;
        Ok(self.to_value(number))
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        let number = match value.as_i128() {
            Some(number) if value.kind() == self.kind.value_kind() => number,
            _ => return Err(ValueError::wrong_kind(self.kind.name(), value.kind())),
        };
        self.check(number)?;
        Ok(if self.kind.is_64bit() {
            JsonScalar::String(number.to_string())
        } else {
            JsonScalar::Number(number.to_string())
        })
    }

    fn check(&self, number: i128) -> Result<(), ValueError> {
        let in_type = self.kind.min() <= number && number <= self.kind.max();
        let in_range = self.range.is_empty() || self.range.iter().any(|r| r.contains(number));
        if in_type && in_range {
            Ok(())
        } else {
            Err(ValueError::out_of_range(number, self.kind.name()))
        }
    }

    // Callers have checked the bounds of `kind` already.
    fn to_value(&self, n: i128) -> Value {
        match self.kind {
            IntegerKind::Int8   => Value::Int8(n as i8),
            IntegerKind::Int16  => Value::Int16(n as i16),
            IntegerKind::Int32  => Value::Int32(n as i32),
            IntegerKind::Int64  => Value::Int64(n as i64),
            IntegerKind::Uint8  => Value::Uint8(n as u8),
            IntegerKind::Uint16 => Value::Uint16(n as u16),
            IntegerKind::Uint32 => Value::Uint32(n as u32),
            IntegerKind::Uint64 => Value::Uint64(n as u64),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecimalCodec {
    fraction_digits: u8,
    range:           Vec<DecimalRange>,
}

impl DecimalCodec {
    pub fn new(type_def: &DecimalType) -> DecimalCodec {
        DecimalCodec { fraction_digits: type_def.fraction_digits, range: type_def.range.clone() }
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        let value = Decimal64::parse(text, self.fraction_digits).map_err(|_| {
            ValueError::lexical(text, format!("decimal64 with {} fraction digits", self.fraction_digits))
        })?;
        self.check(value)?;
        Ok(Value::Decimal64(value))
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        let decimal = match value {
            Value::Decimal64(d) => *d,
            other => return Err(ValueError::wrong_kind(ValueKind::Decimal64, other.kind())),
        };
        let text = decimal.to_string();
        // Re-scaling rejects values with more precision than the type allows.
        let scaled = Decimal64::parse(&text, self.fraction_digits)
            .map_err(|_| ValueError::out_of_range(&text, "decimal64"))?;
        self.check(scaled)?;
        Ok(JsonScalar::String(text))
    }

    fn check(&self, value: Decimal64) -> Result<(), ValueError> {
        if self.range.is_empty() || self.range.iter().any(|r| r.min <= value && value <= r.max) {
            Ok(())
        } else {
            Err(ValueError::out_of_range(value, "decimal64"))
        }
    }
}
