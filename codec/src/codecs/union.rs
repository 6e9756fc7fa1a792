use yang_json_schema::{Value, ValueKind};

use super::{JsonCodec, JsonScalar};
use crate::error::ValueError;

/// Codec for `union`. Members are tried in declaration order and the first
/// one that succeeds wins, even when a later member would also accept the
/// input.
#[derive(Debug, Clone)]
pub struct UnionCodec {
    members: Vec<JsonCodec>,
}

impl UnionCodec {
    pub fn new(members: Vec<JsonCodec>) -> UnionCodec {
        UnionCodec { members }
    }

    pub fn members(&self) -> &[JsonCodec] {
        &self.members
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        self.members
            .iter()
            .find_map(|member| member.parse(text).ok())
            .ok_or_else(|| ValueError::NoApplicableCodec(format!("{:?}", text)))
    }

    pub fn parse_empty(&self) -> Result<Value, ValueError> {
        self.members
            .iter()
            .find_map(|member| member.parse_empty().ok())
            .ok_or_else(|| ValueError::NoApplicableCodec("[null]".to_owned()))
    }

    /// Writes with the first member whose value domain covers `value` and
    /// whose constraints it satisfies.
    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        self.members
            .iter()
            .filter(|member| member.accepts(value))
            .find_map(|member| member.write(value).ok())
            .ok_or_else(|| ValueError::NoApplicableCodec(format!("{:?}", value)))
    }

    pub fn accepts(&self, value: &Value) -> bool {
        self.members.iter().any(|member| member.accepts(value))
    }

    /// The value kind shared by every member, if they agree on one.
    pub fn value_kind(&self) -> Option<ValueKind> {
        let first = self.members.first()?.value_kind()?;
        self.members
            .iter()
            .all(|member| member.value_kind() == Some(first))
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{IntegerCodec, StringCodec};
    use yang_json_schema::{IntegerKind, IntegerType, LengthRange, PatternConstraint, StringType};

    fn int32() -> JsonCodec {
        JsonCodec::Integer(IntegerCodec::new(&IntegerType { kind: IntegerKind::Int32, range: vec![] }))
    }

    fn string(patterns: &[&str], max: u64) -> JsonCodec {
        JsonCodec::String(
            StringCodec::new(&StringType {
                length:   vec![LengthRange { min: 0, max }],
                patterns: patterns
                    .iter()
                    .map(|p| PatternConstraint { regex: p.to_string(), invert_match: false })
                    .collect(),
            })
            .unwrap(),
        )
    }

    #[test]
    fn first_member_wins_on_parse() {
        let union = UnionCodec::new(vec![int32(), string(&[], 100)]);
        assert_eq!(union.parse("42").unwrap(), Value::Int32(42));
        assert_eq!(union.parse("forty-two").unwrap(), Value::from("forty-two"));
        assert_eq!(union.value_kind(), None);

        let reversed = UnionCodec::new(vec![string(&[], 100), int32()]);
        assert_eq!(reversed.parse("42").unwrap(), Value::from("42"));
    }

    #[test]
    fn write_skips_members_that_do_not_apply() {
        let union = UnionCodec::new(vec![string(&["[a-z]+"], 100), int32(), string(&["[0-9]+"], 3)]);
        assert_eq!(union.write(&Value::Int32(-5)).unwrap(), JsonScalar::Number("-5".into()));
        assert_eq!(union.write(&Value::from("abc")).unwrap(), JsonScalar::String("abc".into()));
        assert_eq!(union.write(&Value::from("123")).unwrap(), JsonScalar::String("123".into()));
        assert!(matches!(union.write(&Value::from("1234")), Err(ValueError::NoApplicableCodec(_))));
        assert!(matches!(union.write(&Value::Boolean(true)), Err(ValueError::NoApplicableCodec(_))));
        assert!(matches!(union.parse("ABC"), Err(ValueError::NoApplicableCodec(_))));
    }

    #[test]
    fn empty_member() {
        let union = UnionCodec::new(vec![int32(), JsonCodec::Empty]);
        assert_eq!(union.parse_empty().unwrap(), Value::Empty);
        assert_eq!(union.write(&Value::Empty).unwrap(), JsonScalar::Empty);
    }
}
