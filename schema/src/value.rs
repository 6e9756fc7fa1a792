use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::qname::QName;

/// This type holds one typed YANG scalar.
///
/// Values are what leaves and leaf-list entries carry, what list keys are made
/// of, and what the value codecs produce and consume. They always satisfy the
/// constraints of the type they were parsed against.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Decimal64(Decimal64),
    String(String),
    Binary(Vec<u8>),
    /// Set bit names, in bit-position order.
    Bits(Vec<String>),
    Enumeration(String),
    Identityref(QName),
    InstanceIdentifier(InstanceIdentifier),
    Empty,
}

/// Discriminates [Value] variants without carrying a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    String,
    Binary,
    Bits,
    Enumeration,
    Identityref,
    InstanceIdentifier,
    Empty,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueKind::Boolean            => "boolean",
            ValueKind::Int8               => "int8",
            ValueKind::Int16              => "int16",
            ValueKind::Int32              => "int32",
            ValueKind::Int64              => "int64",
            ValueKind::Uint8              => "uint8",
            ValueKind::Uint16             => "uint16",
            ValueKind::Uint32             => "uint32",
            ValueKind::Uint64             => "uint64",
            ValueKind::Decimal64          => "decimal64",
            ValueKind::String             => "string",
            ValueKind::Binary             => "binary",
            ValueKind::Bits               => "bits",
            ValueKind::Enumeration        => "enumeration",
            ValueKind::Identityref        => "identityref",
            ValueKind::InstanceIdentifier => "instance-identifier",
            ValueKind::Empty              => "empty",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Boolean(_)            => ValueKind::Boolean,
            Value::Int8(_)               => ValueKind::Int8,
            Value::Int16(_)              => ValueKind::Int16,
            Value::Int32(_)              => ValueKind::Int32,
            Value::Int64(_)              => ValueKind::Int64,
            Value::Uint8(_)              => ValueKind::Uint8,
            Value::Uint16(_)             => ValueKind::Uint16,
            Value::Uint32(_)             => ValueKind::Uint32,
            Value::Uint64(_)             => ValueKind::Uint64,
            Value::Decimal64(_)          => ValueKind::Decimal64,
            Value::String(_)             => ValueKind::String,
            Value::Binary(_)             => ValueKind::Binary,
            Value::Bits(_)               => ValueKind::Bits,
            Value::Enumeration(_)        => ValueKind::Enumeration,
            Value::Identityref(_)        => ValueKind::Identityref,
            Value::InstanceIdentifier(_) => ValueKind::InstanceIdentifier,
            Value::Empty                 => ValueKind::Empty,
        }
    }

    /// A convenience method to extract the value out of a [Boolean](#variant.Boolean).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Boolean(value) => value,
            _ => false,
        }
    }

    /// A convenience method to widen any integer variant.
    /// Returns `None` for other value kinds.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            Value::Int8(v)   => v as i128,
            Value::Int16(v)  => v as i128,
            Value::Int32(v)  => v as i128,
            Value::Int64(v)  => v as i128,
            Value::Uint8(v)  => v as i128,
            Value::Uint16(v) => v as i128,
            Value::Uint32(v) => v as i128,
            Value::Uint64(v) => v as i128,
            _ => return None,
        })
    }

    /// A convenience method to extract the text out of a [String](#variant.String)
    /// or an [Enumeration](#variant.Enumeration). Returns `""` for other value kinds.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::String(ref value) | Value::Enumeration(ref value) => value.as_str(),
            _ => "",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int32(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Value {
        Value::Uint32(value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Boolean(v)            => v.fmt(f),
            Value::Int8(v)               => write!(f, "{}i8", v),
            Value::Int16(v)              => write!(f, "{}i16", v),
            Value::Int32(v)              => write!(f, "{}i32", v),
            Value::Int64(v)              => write!(f, "{}i64", v),
            Value::Uint8(v)              => write!(f, "{}u8", v),
            Value::Uint16(v)             => write!(f, "{}u16", v),
            Value::Uint32(v)             => write!(f, "{}u32", v),
            Value::Uint64(v)             => write!(f, "{}u64", v),
            Value::Decimal64(v)          => write!(f, "{}d", v),
            Value::String(v)             => v.fmt(f),
            Value::Binary(v)             => write!(f, "binary[{}]", v.len()),
            Value::Bits(v)               => write!(f, "bits{:?}", v),
            Value::Enumeration(v)        => write!(f, "enum({})", v),
            Value::Identityref(v)        => write!(f, "identity{}", v),
            Value::InstanceIdentifier(v) => v.fmt(f),
            Value::Empty                 => f.write_str("empty"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(v) | Value::Enumeration(v) => f.write_str(v),
            Value::Bits(v) => f.write_str(&v.join(" ")),
            Value::Identityref(v) => write!(f, "{}", v),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A decimal64 number: an unscaled 64-bit integer and the number of
/// fraction digits it is scaled by.
///
/// Equality, ordering and hashing are by numeric value, so `1.0` and `1.00`
/// compare equal.
#[derive(Clone, Copy)]
pub struct Decimal64 {
    unscaled:        i64,
    fraction_digits: u8,
}

const MAX_FRACTION_DIGITS: u8 = 18;

impl Decimal64 {
    pub fn new(unscaled: i64, fraction_digits: u8) -> Decimal64 {
        Decimal64 { unscaled, fraction_digits: fraction_digits.min(MAX_FRACTION_DIGITS) }
    }

    pub fn unscaled(&self) -> i64 {
        self.unscaled
    }

    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }

    /// Parses `text` and scales it to exactly `fraction_digits` digits.
    /// Fails when the text is not a decimal number, carries more fraction
    /// digits than allowed, or overflows 64 bits once scaled.
    pub fn parse(text: &str, fraction_digits: u8) -> Result<Decimal64, String> {
        let (negative, int_part, frac_part) = split_decimal(text)?;
        if frac_part.len() > fraction_digits as usize {
            return Err(format!(
                "{:?} has more than {} fraction digits",
                text, fraction_digits
            ));
        }
        let mut digits = String::with_capacity(int_part.len() + fraction_digits as usize);
        digits.push_str(int_part);
        digits.push_str(frac_part);
        for _ in frac_part.len()..fraction_digits as usize {
            digits.push('0');
        }
        let magnitude: i128 = digits
            .parse()
            .map_err(|_| format!("{:?} is out of range for decimal64", text))?;
        let signed = if negative { -magnitude } else { magnitude };
        let unscaled = i64::try_from(signed)
            .map_err(|_| format!("{:?} is out of range for decimal64", text))?;
        Ok(Decimal64::new(unscaled, fraction_digits))
    }

    /// Parses `text` keeping exactly the fraction digits it was written with.
    pub fn parse_exact(text: &str) -> Result<Decimal64, String> {
        let (_, _, frac_part) = split_decimal(text)?;
        if frac_part.len() > MAX_FRACTION_DIGITS as usize {
            return Err(format!("{:?} has too many fraction digits", text));
        }
        Decimal64::parse(text, frac_part.len() as u8)
    }

    fn scaled_to(&self, fraction_digits: u8) -> i128 {
        self.unscaled as i128 * 10i128.pow((fraction_digits - self.fraction_digits) as u32)
    }

    fn normalized(&self) -> (i64, u8) {
        let mut unscaled = self.unscaled;
        let mut digits = self.fraction_digits;
        while digits > 0 && unscaled % 10 == 0 {
            unscaled /= 10;
            digits -= 1;
        }
        (unscaled, digits)
    }
}

fn split_decimal(text: &str) -> Result<(bool, &str, &str), String> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty()
        || !all_digits(int_part)
        || !all_digits(frac_part)
        || (body.contains('.') && frac_part.is_empty())
    {
        return Err(format!("{:?} is not a decimal number", text));
    }
    Ok((negative, int_part, frac_part))
}

impl PartialEq for Decimal64 {
    fn eq(&self, other: &Decimal64) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal64 {}

impl PartialOrd for Decimal64 {
    fn partial_cmp(&self, other: &Decimal64) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal64 {
    fn cmp(&self, other: &Decimal64) -> Ordering {
        let digits = self.fraction_digits.max(other.fraction_digits);
        self.scaled_to(digits).cmp(&other.scaled_to(digits))
    }
}

impl Hash for Decimal64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Decimal64 {
    /// Canonical form: no leading zeros, no trailing zeros beyond the first
    /// fraction digit.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let scale = 10i128.pow(self.fraction_digits as u32);
        let value = self.unscaled as i128;
        let int_part = value.abs() / scale;
        let frac_part = value.abs() % scale;
        if value < 0 {
            f.write_str("-")?;
        }
        let mut frac = format!("{:0width$}", frac_part, width = self.fraction_digits as usize);
        while frac.len() > 1 && frac.ends_with('0') {
            frac.pop();
        }
        if frac.is_empty() {
            frac.push('0');
        }
        write!(f, "{}.{}", int_part, frac)
    }
}

impl fmt::Debug for Decimal64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for Decimal64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Decimal64, D::Error> {
        let text = String::deserialize(deserializer)?;
        Decimal64::parse_exact(&text).map_err(de::Error::custom)
    }
}

/// A node's identity within its parent.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathArgument {
    /// A plain node: container, choice, leaf, list, leaf-list, anydata, anyxml.
    Node(QName),
    /// A list entry, identified by its key leaf values in key order. Entries of
    /// a keyless list carry no keys.
    Entry { name: QName, keys: Vec<(QName, Value)> },
    /// A leaf-list entry, identified by its value.
    Value { name: QName, value: Value },
}

impl PathArgument {
    pub fn name(&self) -> &QName {
        match self {
            PathArgument::Node(name)
            | PathArgument::Entry { name, .. }
            | PathArgument::Value { name, .. } => name,
        }
    }

    /// Identifiers of keyless list entries are positional, not unique.
    pub fn is_unique(&self) -> bool {
        !matches!(self, PathArgument::Entry { keys, .. } if keys.is_empty())
    }
}

impl From<QName> for PathArgument {
    fn from(name: QName) -> PathArgument {
        PathArgument::Node(name)
    }
}

impl fmt::Debug for PathArgument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for PathArgument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathArgument::Node(name) => write!(f, "{}", name),
            PathArgument::Entry { name, keys } => {
                write!(f, "{}", name)?;
                for (key, value) in keys {
                    write!(f, "[{}={:?}]", key.local_name(), value)?;
                }
                Ok(())
            }
            PathArgument::Value { name, value } => write!(f, "{}[.={:?}]", name, value),
        }
    }
}

/// A path from the data tree root to one node, as carried by
/// `instance-identifier` values.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceIdentifier(pub Vec<PathArgument>);

impl InstanceIdentifier {
    pub fn steps(&self) -> &[PathArgument] {
        &self.0
    }
}

impl fmt::Debug for InstanceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for step in &self.0 {
            write!(f, "/{}", step)?;
        }
        Ok(())
    }
}
