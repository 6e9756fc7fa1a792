//! RFC 7951 JSON decoder.
//!
//! Decoding is schema-driven recursive descent over a parsed document. The
//! document is first resolved into an intermediate tree, which catches
//! duplicates and choice conflicts before any event is produced, and then
//! replayed as protocol events into the caller's writer.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::Arc;

use tracing::debug;
use yang_json_schema::{
    AnydataValue, JsonValue, Namespace, NodeId, NormalizationResult, NormalizedAnydata, PathArgument, QName,
    SchemaContext, SchemaNodeKind, Value,
};

use crate::anyxml;
use crate::builder::TreeBuilder;
use crate::error::CodecError;
use crate::factory::CodecProvider;
use crate::json::{parse_reader, parse_str};
use crate::stream::{NodeKind, NormalizedNodeStreamWriter, Scalar};

/// Nesting deeper than this is rejected before the stack is at risk.
const MAX_DEPTH: usize = 256;

struct DataNode {
    kind:     NodeKind,
    id:       PathArgument,
    schema:   NodeId,
    /// The selected case, for choice nodes.
    case:     Option<NodeId>,
    children: Vec<DataNode>,
    scalar:   Option<Scalar>,
    mount:    Option<MountedData>,
}

impl DataNode {
    fn new(kind: NodeKind, id: PathArgument, schema: NodeId) -> DataNode {
        DataNode { kind, id, schema, case: None, children: Vec::new(), scalar: None, mount: None }
    }

    fn scalar(kind: NodeKind, name: QName, schema: NodeId, value: Scalar) -> DataNode {
        DataNode { scalar: Some(value), ..DataNode::new(kind, PathArgument::Node(name), schema) }
    }
}

struct MountedData {
    label:    String,
    context:  Arc<SchemaContext>,
    children: Vec<DataNode>,
}

/// Per-call state: the namespace stack and nesting depth.
struct Scope {
    namespaces: Vec<Namespace>,
    depth:      usize,
}

impl Scope {
    fn current(&self) -> Option<&Namespace> {
        self.namespaces.last()
    }
}

/// Decodes RFC 7951 JSON into protocol events.
///
/// ```
/// use yang_json_codec::{IidDialect, JsonCodecFactory, JsonDecoder};
/// use yang_json_schema::*;
///
/// let context = SchemaDocument::new(vec![Module::new("ex", "urn:ex", "ex")])
///     .node(NodeDef::container("top").in_module("ex").child(NodeDef::leaf("port", TypeDefinition::integer(IntegerKind::Uint16))))
///     .build()
///     .unwrap();
/// let codecs = JsonCodecFactory::lazy(context, IidDialect::Rfc7951);
///
/// let result = JsonDecoder::new(&codecs).normalize(r#"{"ex:top": {"port": 830}}"#).unwrap();
/// let top = result.node(&QName::new("urn:ex", "top")).unwrap();
/// assert_eq!(top.child_named(&QName::new("urn:ex", "port")).unwrap().value(), Some(&Value::Uint16(830)));
/// ```
pub struct JsonDecoder<'a> {
    codecs:        &'a dyn CodecProvider,
    root:          Option<NodeId>,
    lenient:       bool,
    intern_values: bool,
    mounts:        HashMap<String, Arc<SchemaContext>>,
}

impl<'a> JsonDecoder<'a> {
    pub fn new(codecs: &'a dyn CodecProvider) -> JsonDecoder<'a> {
        JsonDecoder { codecs, root: None, lenient: false, intern_values: false, mounts: HashMap::new() }
    }

    /// In lenient mode members that match no schema node are skipped
    /// instead of failing the call.
    pub fn lenient(mut self, lenient: bool) -> JsonDecoder<'a> {
        self.lenient = lenient;
        self
    }

    pub fn intern_values(mut self, intern: bool) -> JsonDecoder<'a> {
        self.intern_values = intern;
        self
    }

    /// Decodes documents whose top level is the content of `node` rather
    /// than the schema root. Only containers and lists qualify.
    pub fn rooted_at(mut self, node: NodeId) -> Result<JsonDecoder<'a>, CodecError> {
        let schema = self.codecs.context().try_node(node)?;
        if !matches!(schema.kind(), SchemaNodeKind::Container { .. } | SchemaNodeKind::List { .. }) {
            return Err(CodecError::mismatch(schema.qname(), "only containers and lists can root a decoder"));
        }
        self.root = Some(node);
        Ok(self)
    }

    /// Registers the schema of mount points labelled `label`. Objects of
    /// such mount points are decoded against `context`.
    pub fn with_mount_point(mut self, label: &str, context: Arc<SchemaContext>) -> JsonDecoder<'a> {
        self.mounts.insert(label.to_owned(), context);
        self
    }

    pub fn decode_str(&self, text: &str, writer: &mut dyn NormalizedNodeStreamWriter) -> Result<(), CodecError> {
        match parse_str(text)? {
            Some(document) => self.decode_value(&document, writer),
            None => Ok(()),
        }
    }

    pub fn decode_reader<R: Read>(&self, reader: R, writer: &mut dyn NormalizedNodeStreamWriter) -> Result<(), CodecError> {
        match parse_reader(reader)? {
            Some(document) => self.decode_value(&document, writer),
            None => Ok(()),
        }
    }

    pub fn decode_value(&self, document: &JsonValue, writer: &mut dyn NormalizedNodeStreamWriter) -> Result<(), CodecError> {
        let members = match document {
            JsonValue::Object(members) => members,
            other => {
                return Err(CodecError::mismatch(
                    self.describe(self.codecs.context(), self.root),
                    format!("expected an object at the top level, found {}", other.kind_name()),
                ))
            }
        };
        let context = self.codecs.context();
        let mut scope = Scope { namespaces: Vec::new(), depth: 0 };
        if let Some(root) = self.root {
            scope.namespaces.push(context.node(root).qname().namespace().clone());
        }

        let mut nodes = Vec::new();
        self.read_members(self.codecs, self.root, members, &mut scope, &mut nodes)?;
        for node in &nodes {
            emit(node, writer)?;
        }
        Ok(())
    }

    /// Decodes `text` into a finished tree.
    pub fn normalize(&self, text: &str) -> Result<NormalizationResult, CodecError> {
        let mut builder = self.builder();
        self.decode_str(text, &mut builder)?;
        builder.finish()
    }

    pub fn normalize_reader<R: Read>(&self, reader: R) -> Result<NormalizationResult, CodecError> {
        let mut builder = self.builder();
        self.decode_reader(reader, &mut builder)?;
        builder.finish()
    }

    /// Normalizes an opaque anydata payload against its own schema.
    pub fn normalize_anydata(&self, value: &AnydataValue, context: Arc<SchemaContext>) -> Result<NormalizedAnydata, CodecError> {
        match value {
            AnydataValue::Json(json) => {
                let codecs = self.codecs.rebase(context.clone());
                let decoder = JsonDecoder {
                    codecs:        &codecs,
                    root:          None,
                    lenient:       self.lenient,
                    intern_values: self.intern_values,
                    mounts:        self.mounts.clone(),
                };
                let mut builder = decoder.builder();
                decoder.decode_value(json, &mut builder)?;
                Ok(NormalizedAnydata { context, data: builder.finish()?.data })
            }
            AnydataValue::Normalized(normalized) if normalized.context.id() == context.id() => Ok(normalized.clone()),
            AnydataValue::Normalized(normalized) => Err(CodecError::mismatch(
                "anydata",
                format!("payload is normalized against schema {}, not {}", normalized.context.id(), context.id()),
            )),
        }
    }

    /// A decoder with the same settings that starts at the schema root.
    pub(crate) fn unrooted(&self) -> JsonDecoder<'a> {
        JsonDecoder {
            codecs:        self.codecs,
            root:          None,
            lenient:       self.lenient,
            intern_values: self.intern_values,
            mounts:        self.mounts.clone(),
        }
    }

    pub(crate) fn codecs(&self) -> &'a dyn CodecProvider {
        self.codecs
    }

    pub(crate) fn builder(&self) -> TreeBuilder {
        if self.intern_values {
            TreeBuilder::interning()
        } else {
            TreeBuilder::new()
        }
    }

    fn describe(&self, context: &SchemaContext, node: Option<NodeId>) -> String {
        match node {
            Some(id) => context.node(id).qname().to_string(),
            None => "the root".to_owned(),
        }
    }

    fn read_members(
        &self,
        codecs: &dyn CodecProvider,
        parent: Option<NodeId>,
        members: &[(String, JsonValue)],
        scope: &mut Scope,
        out: &mut Vec<DataNode>,
    ) -> Result<(), CodecError> {
        let context = codecs.context();
        scope.depth += 1;
        if scope.depth > MAX_DEPTH {
            return Err(CodecError::ResourceExhaustion(format!("nesting deeper than {} levels", MAX_DEPTH)));
        }

        let mut seen = HashSet::new();
        for (member, value) in members {
            if !seen.insert(member.as_str()) {
                return Err(CodecError::Duplicate { node: member.clone(), parent: self.describe(context, parent) });
            }
            let path = match self.resolve(context, parent, member, scope.current())? {
                Some(path) => path,
                None => {
                    debug!(member = %member, parent = %self.describe(context, parent), "skipping unknown member");
                    continue;
                }
            };
            let target = self.attach(context, parent, &path, out)?;

            let data = match path.last() {
                Some(&data) => data,
                None => continue,
            };
            let qname = context.node(data).qname().clone();
            if target.iter().any(|sibling| sibling.schema == data) {
                return Err(CodecError::Duplicate { node: qname.to_string(), parent: self.describe(context, parent) });
            }

            scope.namespaces.push(qname.namespace().clone());
            let node = self.read_node(codecs, data, member, value, scope)?;
            scope.namespaces.pop();
            target.push(node);
        }

        scope.depth -= 1;
        Ok(())
    }

    /// Resolves a member name to the schema path of its data node, choice and
    /// case levels included. `None` means the member is skipped.
    fn resolve(
        &self,
        context: &SchemaContext,
        parent: Option<NodeId>,
        member: &str,
        current: Option<&Namespace>,
    ) -> Result<Option<Vec<NodeId>>, CodecError> {
        let (prefix, local) = match member.rsplit_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, member),
        };

        let namespace = match prefix.and_then(|prefix| context.module_by_name(prefix)) {
            Some(module) => module.namespace.clone(),
            None => {
                let mut candidates: Vec<&Namespace> = context
                    .data_children(parent)
                    .into_iter()
                    .map(|id| context.node(id).qname())
                    .filter(|qname| qname.local_name() == local)
                    .map(QName::namespace)
                    .collect();
                candidates.sort();
                candidates.dedup();

                match (current, candidates.as_slice()) {
                    (Some(current), _) if candidates.contains(&current) => current.clone(),
                    (_, [only]) => (*only).clone(),
                    (_, []) => return self.unknown(context, parent, member, "no such node in the schema"),
                    (_, many) => {
                        let modules: Vec<&str> = many
                            .iter()
                            .filter_map(|ns| context.module_by_namespace(ns))
                            .map(|module| module.name.as_str())
                            .collect();
                        let msg = format!("ambiguous name, qualify it with one of: {}", modules.join(", "));
                        return self.unknown(context, parent, member, &msg);
                    }
                }
            }
        };

        match context.find_data_child(parent, &QName::new(namespace, local)) {
            Some(path) => Ok(Some(path)),
            None => self.unknown(context, parent, member, "no such node in the schema"),
        }
    }

    fn unknown(
        &self,
        context: &SchemaContext,
        parent: Option<NodeId>,
        member: &str,
        msg: &str,
    ) -> Result<Option<Vec<NodeId>>, CodecError> {
        if self.lenient {
            return Ok(None);
        }
        Err(CodecError::mismatch(format!("{} in {}", member, self.describe(context, parent)), msg))
    }

    /// Walks the choice/case levels of `path`, reusing choices already
    /// present in `out`, and returns the child list the data node belongs to.
    fn attach<'n>(
        &self,
        context: &SchemaContext,
        parent: Option<NodeId>,
        path: &[NodeId],
        out: &'n mut Vec<DataNode>,
    ) -> Result<&'n mut Vec<DataNode>, CodecError> {
        let mut target = out;
        for pair in path[..path.len().saturating_sub(1)].chunks(2) {
            let (choice, case) = match *pair {
                [choice, case] => (choice, case),
                _ => return Err(CodecError::mismatch(self.describe(context, parent), "malformed choice path")),
            };
            let index = match target.iter().position(|node| node.kind == NodeKind::Choice && node.schema == choice) {
                Some(index) => {
                    if target[index].case != Some(case) {
                        return Err(CodecError::mismatch(
                            context.node(choice).qname(),
                            format!(
                                "data from case {} conflicts with data from another case",
                                context.node(case).qname().local_name()
                            ),
                        ));
                    }
                    index
                }
                None => {
                    let id = PathArgument::Node(context.node(choice).qname().clone());
                    target.push(DataNode { case: Some(case), ..DataNode::new(NodeKind::Choice, id, choice) });
                    target.len() - 1
                }
            };
            target = &mut target[index].children;
        }
        Ok(target)
    }

    fn read_node(
        &self,
        codecs: &dyn CodecProvider,
        schema: NodeId,
        member: &str,
        value: &JsonValue,
        scope: &mut Scope,
    ) -> Result<DataNode, CodecError> {
        let context = codecs.context();
        let node = context.node(schema);
        let name = node.qname().clone();

        match node.kind() {
            SchemaNodeKind::Container { .. } => {
                let members = expect_object(&name, value)?;
                let mut container = DataNode::new(NodeKind::Container, PathArgument::Node(name), schema);
                match node.mount_point().and_then(|label| self.mounts.get(label).map(|ctx| (label, ctx))) {
                    Some((label, mounted)) => {
                        let mounted_codecs = codecs.rebase(mounted.clone());
                        let mut children = Vec::new();
                        self.read_members(&mounted_codecs, None, members, scope, &mut children)?;
                        container.mount =
                            Some(MountedData { label: label.to_owned(), context: mounted.clone(), children });
                    }
                    None => self.read_members(codecs, Some(schema), members, scope, &mut container.children)?,
                }
                Ok(container)
            }
            SchemaNodeKind::List { keys, .. } => {
                let items: Vec<&JsonValue> = match value {
                    JsonValue::Array(items) => items.iter().collect(),
                    // a single entry written without its array
                    JsonValue::Object(_) => vec![value],
                    other => {
                        return Err(CodecError::mismatch(&name, format!("expected an array, found {}", other.kind_name())))
                    }
                };
                let mut list = DataNode::new(NodeKind::List, PathArgument::Node(name.clone()), schema);
                for item in items {
                    let members = expect_object(&name, item)?;
                    let mut children = Vec::new();
                    self.read_members(codecs, Some(schema), members, scope, &mut children)?;
                    let id = PathArgument::Entry { name: name.clone(), keys: entry_keys(&name, keys, &children)? };
                    if id.is_unique() && list.children.iter().any(|entry| entry.id == id) {
                        return Err(CodecError::Duplicate { node: id.to_string(), parent: name.to_string() });
                    }
                    list.children.push(DataNode { children, ..DataNode::new(NodeKind::ListEntry, id, schema) });
                }
                Ok(list)
            }
            SchemaNodeKind::LeafList { .. } => {
                let items = match value {
                    JsonValue::Array(items) => items,
                    other => {
                        return Err(CodecError::mismatch(&name, format!("expected an array, found {}", other.kind_name())))
                    }
                };
                let mut leaf_list = DataNode::new(NodeKind::LeafList, PathArgument::Node(name.clone()), schema);
                for item in items {
                    let value = self.parse_scalar(codecs, schema, &name, item)?;
                    let id = PathArgument::Value { name: name.clone(), value: value.clone() };
                    if leaf_list.children.iter().any(|entry| entry.id == id) {
                        return Err(CodecError::Duplicate { node: id.to_string(), parent: name.to_string() });
                    }
                    leaf_list.children.push(DataNode {
                        scalar: Some(Scalar::Value(value)),
                        ..DataNode::new(NodeKind::LeafListEntry, id, schema)
                    });
                }
                Ok(leaf_list)
            }
            SchemaNodeKind::Leaf { .. } => {
                let value = self.parse_scalar(codecs, schema, &name, value)?;
                Ok(DataNode::scalar(NodeKind::Leaf, name, schema, Scalar::Value(value)))
            }
            SchemaNodeKind::Anydata => {
                let value = AnydataValue::Json(value.clone());
                Ok(DataNode::scalar(NodeKind::Anydata, name, schema, Scalar::Anydata(value)))
            }
            SchemaNodeKind::Anyxml => {
                let namespace = scope.current().cloned().unwrap_or_else(|| name.namespace().clone());
                let element = anyxml::read_xml(member, namespace, value);
                Ok(DataNode::scalar(NodeKind::Anyxml, name, schema, Scalar::Anyxml(element)))
            }
            SchemaNodeKind::Choice | SchemaNodeKind::Case => {
                Err(CodecError::mismatch(&name, "choices and cases have no JSON member of their own"))
            }
        }
    }

    fn parse_scalar(&self, codecs: &dyn CodecProvider, schema: NodeId, name: &QName, value: &JsonValue) -> Result<Value, CodecError> {
        let codec = codecs.codec_for(schema)?;
        let (input, parsed) = match value {
            JsonValue::String(text) | JsonValue::Number(text) => (text.clone(), codec.parse(text)),
            JsonValue::Bool(flag) => {
                let text = flag.to_string();
                let parsed = codec.parse(&text);
                (text, parsed)
            }
            empty if empty.is_empty_marker() => ("[null]".to_owned(), codec.parse_empty()),
            JsonValue::Null => return Err(CodecError::mismatch(name, "null is only valid inside [null]")),
            other => return Err(CodecError::mismatch(name, format!("expected a scalar, found {}", other.kind_name()))),
        };
        parsed.map_err(|source| CodecError::Value { node: name.to_string(), input, source })
    }
}

fn expect_object<'v>(name: &QName, value: &'v JsonValue) -> Result<&'v [(String, JsonValue)], CodecError> {
    match value {
        JsonValue::Object(members) => Ok(members),
        other => Err(CodecError::mismatch(name, format!("expected an object, found {}", other.kind_name()))),
    }
}

fn entry_keys(list: &QName, keys: &[QName], children: &[DataNode]) -> Result<Vec<(QName, Value)>, CodecError> {
    keys.iter()
        .map(|key| {
            children
                .iter()
                .find(|child| child.kind == NodeKind::Leaf && child.id.name() == key)
                .and_then(|child| match &child.scalar {
                    Some(Scalar::Value(value)) => Some((key.clone(), value.clone())),
                    _ => None,
                })
                .ok_or_else(|| CodecError::mismatch(list, format!("list entry is missing key {}", key.local_name())))
        })
        .collect()
}

fn emit(node: &DataNode, writer: &mut dyn NormalizedNodeStreamWriter) -> Result<(), CodecError> {
    writer.enter(node.kind, node.id.clone(), Some(node.children.len()))?;
    if let Some(scalar) = &node.scalar {
        writer.scalar_value(scalar.clone())?;
    }
    for child in &node.children {
        emit(child, writer)?;
    }
    if let Some(mount) = &node.mount {
        writer.start_mount_point(&mount.label, mount.context.clone())?;
        for child in &mount.children {
            emit(child, writer)?;
        }
        writer.end_mount_point()?;
    }
    writer.end()
}
