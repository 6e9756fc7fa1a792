//! The value codec layer: one converter per resolved leaf type, turning
//! lexical JSON text into typed [Value]s and back.
//!
//! Codecs are pure and immutable once built. They are created by the codec
//! factory, which resolves leafref indirection before calling [JsonCodec::build].

use std::sync::Arc;

use yang_json_schema::{NodeId, SchemaContext, TypeDefinition, Value, ValueKind};

use crate::error::ValueError;
use crate::options::IidDialect;

mod identity;
mod iid;
mod number;
mod text;
mod union;

pub use identity::IdentityrefCodec;
pub use iid::InstanceIdentifierCodec;
pub use number::{DecimalCodec, IntegerCodec};
pub use text::{BinaryCodec, BitsCodec, EnumCodec, StringCodec};
pub use union::UnionCodec;

/// Leafref chains longer than this are treated as cycles.
const MAX_LEAFREF_DEPTH: usize = 32;

/// A JSON scalar token as produced by a codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonScalar {
    Boolean(bool),
    /// An unquoted number, in its lexical form.
    Number(String),
    String(String),
    /// The `[null]` token of the `empty` type.
    Empty,
}

impl JsonScalar {
    /// The lexical text of the token, as used inside instance-identifier
    /// predicates.
    pub fn text(&self) -> &str {
        match self {
            JsonScalar::Boolean(true) => "true",
            JsonScalar::Boolean(false) => "false",
            JsonScalar::Number(text) | JsonScalar::String(text) => text,
            JsonScalar::Empty => "",
        }
    }
}

#[derive(Debug, Clone)]
pub enum JsonCodec {
    Boolean,
    Integer(IntegerCodec),
    Decimal64(DecimalCodec),
    String(StringCodec),
    Binary(BinaryCodec),
    Bits(BitsCodec),
    Enumeration(EnumCodec),
    Identityref(IdentityrefCodec),
    InstanceIdentifier(InstanceIdentifierCodec),
    Empty,
    Union(UnionCodec),
}

impl JsonCodec {
    /// Builds the codec for the leaf or leaf-list `node`, following leafrefs
    /// to their target's type.
    pub fn build(context: &Arc<SchemaContext>, dialect: IidDialect, node: NodeId) -> Result<JsonCodec, ValueError> {
        let type_def = context.node(node).type_def().ok_or_else(|| {
            ValueError::Unsupported(format!("{} is not a leaf or leaf-list", context.node(node).qname()))
        })?;
        JsonCodec::for_type(context, dialect, node, node, type_def, 0)
    }

    /// `owner` declares `type_def` and anchors relative paths; `leaf` is the
    /// node the values belong to.
    fn for_type(
        context: &Arc<SchemaContext>,
        dialect: IidDialect,
        leaf: NodeId,
        owner: NodeId,
        type_def: &TypeDefinition,
        depth: usize,
    ) -> Result<JsonCodec, ValueError> {
        Ok(match type_def {
            TypeDefinition::Boolean               => JsonCodec::Boolean,
            TypeDefinition::Empty                 => JsonCodec::Empty,
            TypeDefinition::Integer(t)            => JsonCodec::Integer(IntegerCodec::new(t)),
            TypeDefinition::Decimal64(t)          => JsonCodec::Decimal64(DecimalCodec::new(t)),
            TypeDefinition::String(t)             => JsonCodec::String(StringCodec::new(t)?),
            TypeDefinition::Binary(t)             => JsonCodec::Binary(BinaryCodec::new(t)),
            TypeDefinition::Bits(t)               => JsonCodec::Bits(BitsCodec::new(t)),
            TypeDefinition::Enumeration(t)        => JsonCodec::Enumeration(EnumCodec::new(t)),
            TypeDefinition::Identityref(t)        => JsonCodec::Identityref(IdentityrefCodec::new(context, leaf, owner, t)?),
            TypeDefinition::InstanceIdentifier(_) => JsonCodec::InstanceIdentifier(InstanceIdentifierCodec::new(context, dialect)),
            TypeDefinition::Union(t) => {
                let members = t
                    .members
                    .iter()
                    .map(|member| JsonCodec::for_type(context, dialect, leaf, owner, member, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                JsonCodec::Union(UnionCodec::new(members))
            }
            TypeDefinition::Leafref(t) => {
                let bad_path = |msg: &str| ValueError::BadPath { path: t.path.clone(), msg: msg.to_owned() };
                if depth >= MAX_LEAFREF_DEPTH {
                    return Err(bad_path("leafref chain is too long or circular"));
                }
                let target = context
                    .resolve_path(owner, &t.path)
                    .ok_or_else(|| bad_path("target not found"))?;
                let target_type = context
                    .node(target)
                    .type_def()
                    .ok_or_else(|| bad_path("target is not a leaf or leaf-list"))?;
                JsonCodec::for_type(context, dialect, leaf, target, target_type, depth + 1)?
            }
        })
    }

    /// Parses the lexical text of a JSON string, number or boolean token.
    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        match self {
            JsonCodec::Boolean => match text {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(ValueError::lexical(text, "boolean")),
            },
            JsonCodec::Empty                 => Err(ValueError::lexical(text, "empty value, written as [null]")),
            JsonCodec::Integer(c)            => c.parse(text),
            JsonCodec::Decimal64(c)          => c.parse(text),
            JsonCodec::String(c)             => c.parse(text),
            JsonCodec::Binary(c)             => c.parse(text),
            JsonCodec::Bits(c)               => c.parse(text),
            JsonCodec::Enumeration(c)        => c.parse(text),
            JsonCodec::Identityref(c)        => c.parse(text),
            JsonCodec::InstanceIdentifier(c) => c.parse(text),
            JsonCodec::Union(c)              => c.parse(text),
        }
    }

    /// Parses the `[null]` token.
    pub fn parse_empty(&self) -> Result<Value, ValueError> {
        match self {
            JsonCodec::Empty => Ok(Value::Empty),
            JsonCodec::Union(c) => c.parse_empty(),
            _ => Err(ValueError::lexical("[null]", self.describe())),
        }
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        match (self, value) {
            (JsonCodec::Boolean, Value::Boolean(v)) => Ok(JsonScalar::Boolean(*v)),
            (JsonCodec::Empty, Value::Empty)        => Ok(JsonScalar::Empty),
            (JsonCodec::Integer(c), _)              => c.write(value),
            (JsonCodec::Decimal64(c), _)            => c.write(value),
            (JsonCodec::String(c), _)               => c.write(value),
            (JsonCodec::Binary(c), _)               => c.write(value),
            (JsonCodec::Bits(c), _)                 => c.write(value),
            (JsonCodec::Enumeration(c), _)          => c.write(value),
            (JsonCodec::Identityref(c), _)          => c.write(value),
            (JsonCodec::InstanceIdentifier(c), _)   => c.write(value),
            (JsonCodec::Union(c), _)                => c.write(value),
            _ => Err(ValueError::wrong_kind(self.describe(), value.kind())),
        }
    }

    /// Whether `value` belongs to the value domain of this codec, regardless
    /// of constraints.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            JsonCodec::Union(c) => c.accepts(value),
            _ => self.value_kind() == Some(value.kind()),
        }
    }

    /// The value kind produced by this codec; `None` for unions.
    pub fn value_kind(&self) -> Option<ValueKind> {
        Some(match self {
            JsonCodec::Boolean               => ValueKind::Boolean,
            JsonCodec::Empty                 => ValueKind::Empty,
            JsonCodec::Integer(c)            => c.kind().value_kind(),
            JsonCodec::Decimal64(_)          => ValueKind::Decimal64,
            JsonCodec::String(_)             => ValueKind::String,
            JsonCodec::Binary(_)             => ValueKind::Binary,
            JsonCodec::Bits(_)               => ValueKind::Bits,
            JsonCodec::Enumeration(_)        => ValueKind::Enumeration,
            JsonCodec::Identityref(_)        => ValueKind::Identityref,
            JsonCodec::InstanceIdentifier(_) => ValueKind::InstanceIdentifier,
            JsonCodec::Union(c)              => return c.value_kind(),
        })
    }

    fn describe(&self) -> String {
        match self.value_kind() {
            Some(kind) => kind.to_string(),
            None => "union".to_owned(),
        }
    }
}
