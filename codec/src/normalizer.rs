//! Entry points for request bodies whose shape is fixed by the caller: a
//! whole datastore wrapped in a single container member, exactly one data
//! resource, or exactly one child resource of a known parent.

use yang_json_schema::{JsonValue, NodeId, NormalizationResult, NormalizedNode, PathArgument, QName, SchemaNodeKind};

use crate::decoder::JsonDecoder;
use crate::error::CodecError;
use crate::factory::CodecProvider;
use crate::json::parse_str;

/// One child resource and the identifiers leading to it from the parent:
/// the choices it sits under and, for a list entry, the list itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildData {
    pub prefix: Vec<PathArgument>,
    pub result: NormalizationResult,
}

impl ChildData {
    pub fn data(&self) -> Option<&NormalizedNode> {
        self.result.data.first()
    }
}

impl<'a> JsonDecoder<'a> {
    /// Decodes `{"<module>:<name>": { ... }}`, a datastore wrapped in the
    /// container `container` of module `module` (`ietf-restconf:data` for
    /// RESTCONF). The result holds that container with every top-level data
    /// node as its children.
    pub fn parse_datastore(&self, text: &str, container: &QName, module: &str) -> Result<NormalizationResult, CodecError> {
        let expected = format!("{}:{}", module, container.local_name());
        let document = parse_str(text)?.ok_or_else(|| CodecError::malformed(format!("expected '{}', got an empty document", expected)))?;
        let (name, body) = single_member(&document, &expected)?;
        if name != expected {
            return Err(CodecError::malformed(format!("expected name '{}', got '{}'", expected, name)));
        }
        if !matches!(body, JsonValue::Object(_)) {
            return Err(CodecError::malformed(format!("expected an object under '{}', got {}", expected, body.kind_name())));
        }

        let inner = normalize_document(&self.unrooted(), body)?;
        Ok(NormalizationResult {
            data:         vec![NormalizedNode::Container { name: container.clone(), children: inner.data }],
            metadata:     inner.metadata,
            mount_points: inner.mount_points,
        })
    }

    /// Decodes a body holding exactly the data resource `node`, named by its
    /// qualified name at the top level.
    pub fn parse_data(&self, node: NodeId, text: &str) -> Result<NormalizationResult, CodecError> {
        let context = self.codecs().context();
        let target = context.try_node(node)?;
        if matches!(target.kind(), SchemaNodeKind::Choice | SchemaNodeKind::Case) {
            return Err(CodecError::mismatch(target.qname(), "choices and cases are not data resources"));
        }
        let expected = target.qname().clone();

        let mut result = self.normalize_below(context.data_parent(node), text)?;
        let found = take_single(&mut result, || format!("no payload for {}", expected))?;
        let (_, found) = strip_choices(found)?;
        if *found.name() != expected {
            return Err(CodecError::malformed(format!(
                "payload name {} is different from identifier name {}",
                found.name(),
                expected
            )));
        }
        result.data = vec![found];
        Ok(result)
    }

    /// Decodes a body holding exactly one child resource of `parent` (the
    /// schema root when `None`). A list or leaf-list child must carry
    /// exactly one entry, which becomes the returned data.
    pub fn parse_child_data(&self, parent: Option<NodeId>, text: &str) -> Result<ChildData, CodecError> {
        let mut result = self.normalize_below(parent, text)?;
        let node = take_single(&mut result, || "exactly one child is required, 0 supplied".to_owned())?;
        let (mut prefix, node) = strip_choices(node)?;

        let node = match node {
            NormalizedNode::List { name, mut entries } | NormalizedNode::LeafList { name, mut entries } => {
                if entries.len() != 1 {
                    return Err(CodecError::malformed(format!(
                        "exactly one instance of {} is required, {} supplied",
                        name,
                        entries.len()
                    )));
                }
                prefix.push(PathArgument::Node(name));
                entries.remove(0)
            }
            other => other,
        };

        result.data = vec![node];
        Ok(ChildData { prefix, result })
    }

    fn normalize_below(&self, parent: Option<NodeId>, text: &str) -> Result<NormalizationResult, CodecError> {
        let decoder = match parent {
            Some(parent) => self.unrooted().rooted_at(parent)?,
            None => self.unrooted(),
        };
        match parse_str(text)? {
            Some(document) => normalize_document(&decoder, &document),
            None => Ok(NormalizationResult::default()),
        }
    }
}

fn normalize_document(decoder: &JsonDecoder, document: &JsonValue) -> Result<NormalizationResult, CodecError> {
    let mut builder = decoder.builder();
    decoder.decode_value(document, &mut builder)?;
    builder.finish()
}

fn single_member<'v>(document: &'v JsonValue, expected: &str) -> Result<(&'v str, &'v JsonValue), CodecError> {
    match document {
        JsonValue::Object(members) if members.len() == 1 => Ok((members[0].0.as_str(), &members[0].1)),
        JsonValue::Object(members) => Err(CodecError::malformed(format!(
            "expected the single member '{}', got {} members",
            expected,
            members.len()
        ))),
        other => Err(CodecError::malformed(format!("expected an object, got {}", other.kind_name()))),
    }
}

fn take_single(result: &mut NormalizationResult, empty: impl FnOnce() -> String) -> Result<NormalizedNode, CodecError> {
    match result.data.len() {
        0 => Err(CodecError::malformed(empty())),
        1 => Ok(result.data.remove(0)),
        n => Err(CodecError::malformed(format!("exactly one child is required, {} supplied", n))),
    }
}

/// Unwraps the choice nodes above a single data node, returning their
/// identifiers outermost first.
fn strip_choices(mut node: NormalizedNode) -> Result<(Vec<PathArgument>, NormalizedNode), CodecError> {
    let mut prefix = Vec::new();
    while let NormalizedNode::Choice { name, mut children } = node {
        if children.len() != 1 {
            return Err(CodecError::malformed(format!(
                "exactly one child is required, {} supplied under {}",
                children.len(),
                name
            )));
        }
        prefix.push(PathArgument::Node(name));
        node = children.remove(0);
    }
    Ok((prefix, node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::JsonCodecFactory;
    use crate::options::IidDialect;
    use yang_json_schema::*;

    fn context() -> std::sync::Arc<SchemaContext> {
        SchemaDocument::new(vec![Module::new("foo", "foo", "foo")])
            .node(NodeDef::container("foo").in_module("foo").child(NodeDef::leaf("str", TypeDefinition::string())))
            .node(
                NodeDef::container("bar")
                    .in_module("foo")
                    .child(NodeDef::leaf("uint", TypeDefinition::integer(IntegerKind::Uint32))),
            )
            .node(
                NodeDef::list("baz", &["one", "two"])
                    .in_module("foo")
                    .child(NodeDef::leaf("one", TypeDefinition::Boolean))
                    .child(NodeDef::leaf("two", TypeDefinition::string())),
            )
            .node(
                NodeDef::choice("ch1")
                    .in_module("foo")
                    .child(NodeDef::case("plain").child(NodeDef::leaf("word", TypeDefinition::string()))),
            )
            .build()
            .unwrap()
    }

    fn foo(local: &str) -> QName {
        QName::new("foo", local)
    }

    #[test]
    fn datastore_is_wrapped() {
        let ctx = context();
        let codecs = JsonCodecFactory::lazy(ctx, IidDialect::Rfc7951);
        let data = QName::new("urn:ietf:params:xml:ns:yang:ietf-restconf", "data");
        let result = JsonDecoder::new(&codecs)
            .parse_datastore(
                r#"{"ietf-restconf:data": {"foo:foo": {"str": "str"}, "foo:bar": {"uint": 2}}}"#,
                &data,
                "ietf-restconf",
            )
            .unwrap();

        assert_eq!(result.data.len(), 1);
        let root = &result.data[0];
        assert_eq!(root.name(), &data);
        assert_eq!(root.children().len(), 2);
        let bar = root.child_named(&foo("bar")).unwrap();
        assert_eq!(bar.child_named(&foo("uint")).unwrap().value(), Some(&Value::Uint32(2)));

        let decoder = JsonDecoder::new(&codecs);
        assert!(matches!(decoder.parse_datastore(r#"{"foo:foo": {}}"#, &data, "ietf-restconf"), Err(CodecError::Malformed(_))));
        assert!(matches!(decoder.parse_datastore(r#"{"ietf-restconf:data": 1}"#, &data, "ietf-restconf"), Err(CodecError::Malformed(_))));
        assert!(matches!(decoder.parse_datastore("", &data, "ietf-restconf"), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn data_resource() {
        let ctx = context();
        let codecs = JsonCodecFactory::lazy(ctx.clone(), IidDialect::Rfc7951);
        let target = ctx.find_data_child(None, &foo("foo")).unwrap()[0];
        let decoder = JsonDecoder::new(&codecs);

        let result = decoder.parse_data(target, r#"{"foo:foo": {"str": "str"}}"#).unwrap();
        assert_eq!(result.data, vec![NormalizedNode::container(foo("foo"), vec![NormalizedNode::leaf(foo("str"), Value::from("str"))])]);

        match decoder.parse_data(target, r#"{"foo:bar": {"uint": 23}}"#) {
            Err(CodecError::Malformed(msg)) => assert!(msg.contains("is different from identifier name")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nested_data_resource() {
        let ctx = context();
        let codecs = JsonCodecFactory::lazy(ctx.clone(), IidDialect::Rfc7951);
        let top = ctx.find_data_child(None, &foo("bar")).unwrap()[0];
        let uint = ctx.child(Some(top), &foo("uint")).unwrap();

        let result = JsonDecoder::new(&codecs).parse_data(uint, r#"{"foo:uint": 7}"#).unwrap();
        assert_eq!(result.data, vec![NormalizedNode::leaf(foo("uint"), Value::Uint32(7))]);
    }

    #[test]
    fn child_data_through_choices() {
        let ctx = context();
        let codecs = JsonCodecFactory::lazy(ctx, IidDialect::Rfc7951);
        let child = JsonDecoder::new(&codecs).parse_child_data(None, r#"{"foo:word": "str"}"#).unwrap();
        assert_eq!(child.prefix, vec![PathArgument::Node(foo("ch1"))]);
        assert_eq!(child.data(), Some(&NormalizedNode::leaf(foo("word"), Value::from("str"))));
    }

    #[test]
    fn child_data_list_entry() {
        let ctx = context();
        let codecs = JsonCodecFactory::lazy(ctx, IidDialect::Rfc7951);
        let decoder = JsonDecoder::new(&codecs);

        let child = decoder.parse_child_data(None, r#"{"foo:baz": [{"one": true, "two": "two"}]}"#).unwrap();
        assert_eq!(child.prefix, vec![PathArgument::Node(foo("baz"))]);
        let entry = child.data().unwrap();
        assert_eq!(
            entry.identifier(),
            PathArgument::Entry {
                name: foo("baz"),
                keys: vec![(foo("one"), Value::Boolean(true)), (foo("two"), Value::from("two"))],
            }
        );

        // A bare object is taken as the single entry
        let bare = decoder.parse_child_data(None, r#"{"foo:baz": {"one": true, "two": "two"}}"#).unwrap();
        assert_eq!(bare, child);
    }

    #[test]
    fn child_data_needs_exactly_one_instance() {
        let ctx = context();
        let codecs = JsonCodecFactory::lazy(ctx, IidDialect::Rfc7951);
        let decoder = JsonDecoder::new(&codecs);

        match decoder.parse_child_data(None, r#"{"foo:foo": {"str": "a"}, "foo:bar": {"uint": 1}}"#) {
            Err(CodecError::Malformed(msg)) => assert_eq!(msg, "exactly one child is required, 2 supplied"),
            other => panic!("unexpected {:?}", other),
        }

        let two = r#"{"foo:baz": [{"one": false, "two": "two"}, {"one": true, "two": "two"}]}"#;
        match decoder.parse_child_data(None, two) {
            Err(CodecError::Malformed(msg)) => assert_eq!(msg, "exactly one instance of (foo)baz is required, 2 supplied"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(decoder.parse_child_data(None, "{}"), Err(CodecError::Malformed(_))));
    }
}
