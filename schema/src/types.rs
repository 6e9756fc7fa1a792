use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::value::{Decimal64, ValueKind};

/// The resolved type of a leaf or leaf-list, with its restrictions.
///
/// Restrictions are stored as already-merged effective constraints: the
/// builder that derives a type from its typedef chain is not part of this
/// crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "base", rename_all = "kebab-case")]
pub enum TypeDefinition {
    Boolean,
    Integer(IntegerType),
    Decimal64(DecimalType),
    String(StringType),
    Binary(BinaryType),
    Bits(BitsType),
    Enumeration(EnumType),
    Identityref(IdentityrefType),
    InstanceIdentifier(InstanceIdentifierType),
    Empty,
    Union(UnionType),
    Leafref(LeafrefType),
}

impl TypeDefinition {
    pub fn integer(kind: IntegerKind) -> TypeDefinition {
        TypeDefinition::Integer(IntegerType { kind, range: vec![] })
    }

    pub fn string() -> TypeDefinition {
        TypeDefinition::String(StringType::default())
    }

    pub fn decimal64(fraction_digits: u8) -> TypeDefinition {
        TypeDefinition::Decimal64(DecimalType { fraction_digits, range: vec![] })
    }

    pub fn union(members: Vec<TypeDefinition>) -> TypeDefinition {
        TypeDefinition::Union(UnionType { members })
    }

    pub fn leafref(path: &str) -> TypeDefinition {
        TypeDefinition::Leafref(LeafrefType { path: path.to_owned(), require_instance: true })
    }

    pub fn identityref(bases: &[&str]) -> TypeDefinition {
        TypeDefinition::Identityref(IdentityrefType {
            bases: bases.iter().map(|b| b.to_string()).collect(),
        })
    }

    pub fn enumeration(names: &[&str]) -> TypeDefinition {
        TypeDefinition::Enumeration(EnumType {
            enums: names
                .iter()
                .enumerate()
                .map(|(i, name)| EnumMember { name: name.to_string(), value: i as i32 })
                .collect(),
        })
    }

    pub fn bits(names: &[&str]) -> TypeDefinition {
        TypeDefinition::Bits(BitsType {
            bits: names
                .iter()
                .enumerate()
                .map(|(i, name)| Bit { name: name.to_string(), position: i as u32 })
                .collect(),
        })
    }

    /// The runtime value kind this type produces, if it is not a union or a
    /// leafref whose target is only known once the schema is consulted.
    pub fn value_kind(&self) -> Option<ValueKind> {
        Some(match self {
            TypeDefinition::Boolean               => ValueKind::Boolean,
            TypeDefinition::Integer(t)            => t.kind.value_kind(),
            TypeDefinition::Decimal64(_)          => ValueKind::Decimal64,
            TypeDefinition::String(_)             => ValueKind::String,
            TypeDefinition::Binary(_)             => ValueKind::Binary,
            TypeDefinition::Bits(_)               => ValueKind::Bits,
            TypeDefinition::Enumeration(_)        => ValueKind::Enumeration,
            TypeDefinition::Identityref(_)        => ValueKind::Identityref,
            TypeDefinition::InstanceIdentifier(_) => ValueKind::InstanceIdentifier,
            TypeDefinition::Empty                 => ValueKind::Empty,
            TypeDefinition::Union(_) | TypeDefinition::Leafref(_) => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegerKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl IntegerKind {
    pub fn min(self) -> i128 {
        match self {
            IntegerKind::Int8   => i8::MIN as i128,
            IntegerKind::Int16  => i16::MIN as i128,
            IntegerKind::Int32  => i32::MIN as i128,
            IntegerKind::Int64  => i64::MIN as i128,
            IntegerKind::Uint8 | IntegerKind::Uint16 | IntegerKind::Uint32 | IntegerKind::Uint64 => 0,
        }
    }

    pub fn max(self) -> i128 {
        match self {
            IntegerKind::Int8   => i8::MAX as i128,
            IntegerKind::Int16  => i16::MAX as i128,
            IntegerKind::Int32  => i32::MAX as i128,
            IntegerKind::Int64  => i64::MAX as i128,
            IntegerKind::Uint8  => u8::MAX as i128,
            IntegerKind::Uint16 => u16::MAX as i128,
            IntegerKind::Uint32 => u32::MAX as i128,
            IntegerKind::Uint64 => u64::MAX as i128,
        }
    }

    /// 64-bit kinds cannot travel as bare JSON numbers without losing
    /// precision in common JSON implementations.
    pub fn is_64bit(self) -> bool {
        matches!(self, IntegerKind::Int64 | IntegerKind::Uint64)
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegerKind::Int8   => "int8",
            IntegerKind::Int16  => "int16",
            IntegerKind::Int32  => "int32",
            IntegerKind::Int64  => "int64",
            IntegerKind::Uint8  => "uint8",
            IntegerKind::Uint16 => "uint16",
            IntegerKind::Uint32 => "uint32",
            IntegerKind::Uint64 => "uint64",
        }
    }

    pub fn value_kind(self) -> ValueKind {
        match self {
            IntegerKind::Int8   => ValueKind::Int8,
            IntegerKind::Int16  => ValueKind::Int16,
            IntegerKind::Int32  => ValueKind::Int32,
            IntegerKind::Int64  => ValueKind::Int64,
            IntegerKind::Uint8  => ValueKind::Uint8,
            IntegerKind::Uint16 => ValueKind::Uint16,
            IntegerKind::Uint32 => ValueKind::Uint32,
            IntegerKind::Uint64 => ValueKind::Uint64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegerType {
    pub kind:  IntegerKind,
    #[serde(default)]
    pub range: Vec<IntRange>,
}

/// An inclusive integer interval, written as `"min..max"` in schema
/// documents so that the full uint64 domain survives the round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i128,
    pub max: i128,
}

impl IntRange {
    pub fn new(min: i128, max: i128) -> IntRange {
        IntRange { min, max }
    }

    pub fn contains(&self, value: i128) -> bool {
        self.min <= value && value <= self.max
    }
}

impl Serialize for IntRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{}..{}", self.min, self.max))
    }
}

impl<'de> Deserialize<'de> for IntRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<IntRange, D::Error> {
        let text = String::deserialize(deserializer)?;
        let (min, max) = match text.split_once("..") {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (text.trim(), text.trim()),
        };
        let bound = |s: &str| -> Result<i128, D::Error> {
            s.parse().map_err(|_| de::Error::custom(format!("bad range bound {:?}", s)))
        };
        Ok(IntRange { min: bound(min)?, max: bound(max)? })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimalType {
    pub fraction_digits: u8,
    #[serde(default)]
    pub range:           Vec<DecimalRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecimalRange {
    pub min: Decimal64,
    pub max: Decimal64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringType {
    #[serde(default)]
    pub length:   Vec<LengthRange>,
    #[serde(default)]
    pub patterns: Vec<PatternConstraint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryType {
    #[serde(default)]
    pub length: Vec<LengthRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternConstraint {
    pub regex:        String,
    #[serde(default)]
    pub invert_match: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitsType {
    pub bits: Vec<Bit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bit {
    pub name:     String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub enums: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name:  String,
    pub value: i32,
}

/// Bases are written as `module-name:identity-name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityrefType {
    pub bases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceIdentifierType {
    #[serde(default = "default_true")]
    pub require_instance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionType {
    pub members: Vec<TypeDefinition>,
}

/// A leafref path such as `/if:interfaces/if:interface/if:name` or
/// `../name`. Step prefixes are module prefixes; predicates are ignored for
/// type resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafrefType {
    pub path:             String,
    #[serde(default = "default_true")]
    pub require_instance: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_bounds() {
        assert_eq!(IntegerKind::Int8.min(), -128);
        assert_eq!(IntegerKind::Uint32.max(), 4294967295);
        assert_eq!(IntegerKind::Uint64.max(), u64::MAX as i128);
        assert!(IntegerKind::Int64.is_64bit());
        assert!(!IntegerKind::Uint32.is_64bit());
    }

    #[test]
    fn int_range_from_text() {
        let ty: IntegerType = serde_json::from_str(
            r#"{"kind": "uint64", "range": ["10..18446744073709551615", "3"]}"#,
        )
        .unwrap();
        assert_eq!(ty.range[0], IntRange::new(10, u64::MAX as i128));
        assert_eq!(ty.range[1], IntRange::new(3, 3));
        assert!(ty.range[0].contains(11));
    }

    #[test]
    fn type_definition_from_json() {
        let value: serde_json::Value = serde_json::from_str(
            r#"{"base": "union", "members": [
                {"base": "integer", "kind": "int32"},
                {"base": "decimal64", "fraction_digits": 2},
                {"base": "string", "patterns": [{"regex": "[a-z]+"}]}
            ]}"#,
        )
        .unwrap();
        let ty: TypeDefinition = serde_json::from_value(value).unwrap();
        match ty {
            TypeDefinition::Union(u) => {
                assert_eq!(u.members.len(), 3);
                assert_eq!(u.members[0], TypeDefinition::integer(IntegerKind::Int32));
                assert_eq!(u.members[1], TypeDefinition::decimal64(2));
            }
            other => panic!("unexpected type {:?}", other),
        }
    }
}
