//! Materializes an immutable [NormalizationResult] from protocol events.
//!
//! One event stream is fanned out to three independent stacks: the data tree,
//! the metadata side tree and the mount-point side tree. Each stack only
//! knows its own concern, and the side trees keep levels only when something
//! below them carries content.

use std::collections::HashMap;
use std::sync::Arc;

use yang_json_schema::{
    Annotations, ContextRef, MountPointData, NormalizationResult, NormalizedMetadata, NormalizedMountPoints,
    NormalizedNode, PathArgument, QName, SchemaContext, Value, ValueKind,
};

use crate::error::CodecError;
use crate::stream::{NodeKind, NormalizedNodeStreamWriter, ProtocolTracker, Scalar};

const MAX_PREALLOCATED_CHILDREN: usize = 256;

struct DataLevel {
    kind:     NodeKind,
    id:       PathArgument,
    children: Vec<NormalizedNode>,
    scalar:   Option<Scalar>,
}

/// Builds data nodes. The bottom entry of `levels` is never popped and
/// collects the top-level nodes.
struct DataStack {
    roots:  Vec<NormalizedNode>,
    levels: Vec<DataLevel>,
}

impl DataStack {
    fn new() -> DataStack {
        DataStack { roots: Vec::new(), levels: Vec::new() }
    }

    fn enter(&mut self, kind: NodeKind, id: PathArgument, size_hint: Option<usize>) {
        let capacity = size_hint.unwrap_or(0).min(MAX_PREALLOCATED_CHILDREN);
        self.levels.push(DataLevel { kind, id, children: Vec::with_capacity(capacity), scalar: None });
    }

    fn scalar(&mut self, value: Scalar) -> Result<(), CodecError> {
        let level = self.levels.last_mut().ok_or_else(|| CodecError::protocol("scalar value at the root"))?;
        level.scalar = Some(value);
        Ok(())
    }

    fn end(&mut self, interner: Option<&mut ValueInterner>) -> Result<(), CodecError> {
        let level = self.levels.pop().ok_or_else(|| CodecError::protocol("end() without an open node"))?;
        let node = into_node(level, interner)?;
        match self.levels.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
        Ok(())
    }
}

fn into_node(level: DataLevel, interner: Option<&mut ValueInterner>) -> Result<NormalizedNode, CodecError> {
    let DataLevel { kind, id, children, scalar } = level;
    let name = id.name().clone();
    let missing = || CodecError::protocol(format!("{} {} ended without a matching value", kind, id));

    Ok(match (kind, scalar) {
        (NodeKind::Container, _) => NormalizedNode::Container { name, children },
        (NodeKind::Choice, _) => NormalizedNode::Choice { name, children },
        (NodeKind::List, _) => NormalizedNode::List { name, entries: children },
        (NodeKind::ListEntry, _) => NormalizedNode::ListEntry { id, children },
        (NodeKind::LeafList, _) => NormalizedNode::LeafList { name, entries: children },
        (NodeKind::Leaf, Some(Scalar::Value(value))) => {
            let value = intern(interner, &name, value);
            NormalizedNode::Leaf { name, value }
        }
        (NodeKind::LeafListEntry, Some(Scalar::Value(value))) => {
            if let PathArgument::Value { value: expected, .. } = &id {
                if *expected != value {
                    return Err(CodecError::protocol(format!("leaf-list entry {} carries value {:?}", id, value)));
                }
            }
            let value = intern(interner, &name, value);
            NormalizedNode::LeafListEntry { name, value }
        }
        (NodeKind::Anydata, Some(Scalar::Anydata(value))) => NormalizedNode::Anydata { name, value },
        (NodeKind::Anyxml, Some(Scalar::Anyxml(value))) => NormalizedNode::Anyxml { name, value },
        _ => return Err(missing()),
    })
}

fn intern(interner: Option<&mut ValueInterner>, name: &QName, value: Value) -> Arc<Value> {
    match interner {
        Some(interner) => interner.intern(name, value),
        None => Arc::new(value),
    }
}

/// Deduplicates values with a small domain so that repeated identical values
/// share one allocation. Tables are kept per leaf.
#[derive(Debug, Default)]
pub struct ValueInterner {
    tables: HashMap<QName, HashMap<Value, Arc<Value>>>,
}

impl ValueInterner {
    pub fn new() -> ValueInterner {
        ValueInterner::default()
    }

    pub fn intern(&mut self, leaf: &QName, value: Value) -> Arc<Value> {
        if !is_internable(value.kind()) {
            return Arc::new(value);
        }
        let table = self.tables.entry(leaf.clone()).or_default();
        if let Some(shared) = table.get(&value) {
            return shared.clone();
        }
        let shared = Arc::new(value.clone());
        table.insert(value, shared.clone());
        shared
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_internable(kind: ValueKind) -> bool {
    matches!(kind, ValueKind::Boolean | ValueKind::Enumeration | ValueKind::Identityref | ValueKind::Empty)
}

#[derive(Default)]
struct MetadataLevel {
    annotations: Annotations,
    children:    Vec<(PathArgument, NormalizedMetadata)>,
}

/// Builds the metadata side tree, pruning levels with nothing annotated.
struct MetadataStack {
    levels: Vec<(Option<PathArgument>, MetadataLevel)>,
}

impl MetadataStack {
    fn new() -> MetadataStack {
        MetadataStack { levels: vec![(None, MetadataLevel::default())] }
    }

    fn enter(&mut self, id: &PathArgument) {
        self.levels.push((Some(id.clone()), MetadataLevel::default()));
    }

    fn annotate(&mut self, annotations: Annotations) {
        if let Some((_, level)) = self.levels.last_mut() {
            level.annotations.extend(annotations);
        }
    }

    fn end(&mut self) {
        if self.levels.len() < 2 {
            return;
        }
        if let Some((Some(id), level)) = self.levels.pop() {
            let metadata = NormalizedMetadata { annotations: level.annotations, children: level.children };
            if metadata.is_empty() {
                return;
            }
            if let Some((_, parent)) = self.levels.last_mut() {
                parent.children.push((id, metadata));
            }
        }
    }

    fn finish(mut self) -> Option<NormalizedMetadata> {
        let (_, root) = self.levels.pop()?;
        let metadata = NormalizedMetadata { annotations: root.annotations, children: root.children };
        (!metadata.is_empty()).then_some(metadata)
    }
}

/// A mount point whose content is still being received.
struct OpenMount {
    label:   String,
    context: Arc<SchemaContext>,
    builder: TreeBuilder,
}

#[derive(Default)]
struct MountLevel {
    mount_point: Option<MountPointData>,
    children:    Vec<(PathArgument, NormalizedMountPoints)>,
}

/// Builds the mount-point side tree. Content inside an open mount point is
/// handed to a nested builder bound to the mounted schema.
struct MountStack {
    levels: Vec<(Option<PathArgument>, MountLevel)>,
    open:   Option<Box<OpenMount>>,
}

impl MountStack {
    fn new() -> MountStack {
        MountStack { levels: vec![(None, MountLevel::default())], open: None }
    }

    fn enter(&mut self, id: &PathArgument) {
        self.levels.push((Some(id.clone()), MountLevel::default()));
    }

    fn end(&mut self) {
        if self.levels.len() < 2 {
            return;
        }
        if let Some((Some(id), level)) = self.levels.pop() {
            let mounts = NormalizedMountPoints { mount_point: level.mount_point, children: level.children };
            if mounts.is_empty() {
                return;
            }
            if let Some((_, parent)) = self.levels.last_mut() {
                parent.children.push((id, mounts));
            }
        }
    }

    fn attach(&mut self, mount: OpenMount) -> Result<(), CodecError> {
        let OpenMount { label, context, builder } = mount;
        let result = builder.finish()?;
        let level = match self.levels.last_mut() {
            Some((Some(_), level)) => level,
            _ => return Err(CodecError::protocol(format!("mount point \"{}\" closed at the root", label))),
        };
        if level.mount_point.is_some() {
            return Err(CodecError::protocol(format!("a second mount point \"{}\" in the same node", label)));
        }
        level.mount_point = Some(MountPointData {
            label,
            context: ContextRef(context),
            data: result.data,
            metadata: result.metadata,
        });
        Ok(())
    }

    fn finish(mut self) -> Option<NormalizedMountPoints> {
        let (_, root) = self.levels.pop()?;
        let mounts = NormalizedMountPoints { mount_point: root.mount_point, children: root.children };
        (!mounts.is_empty()).then_some(mounts)
    }
}

/// A [NormalizedNodeStreamWriter] that builds trees.
///
/// ```
/// use yang_json_codec::{NodeKind, NormalizedNodeStreamWriter, TreeBuilder};
/// use yang_json_schema::{PathArgument, QName, Value};
///
/// let top = QName::new("urn:ex", "top");
/// let mut builder = TreeBuilder::new();
/// builder.enter(NodeKind::Container, PathArgument::Node(top.clone()), None).unwrap();
/// builder.leaf(top.sibling("port"), Value::Uint16(830)).unwrap();
/// builder.end().unwrap();
///
/// let result = builder.finish().unwrap();
/// let port = result.node(&top).unwrap().child_named(&top.sibling("port")).unwrap();
/// assert_eq!(port.value(), Some(&Value::Uint16(830)));
/// ```
pub struct TreeBuilder {
    tracker:  ProtocolTracker,
    data:     DataStack,
    metadata: MetadataStack,
    mounts:   MountStack,
    interner: Option<ValueInterner>,
}

impl Default for TreeBuilder {
    fn default() -> TreeBuilder {
        TreeBuilder::new()
    }
}

impl TreeBuilder {
    pub fn new() -> TreeBuilder {
        TreeBuilder {
            tracker:  ProtocolTracker::new(),
            data:     DataStack::new(),
            metadata: MetadataStack::new(),
            mounts:   MountStack::new(),
            interner: None,
        }
    }

    /// A builder that shares instances of repeated boolean, enumeration,
    /// identityref and empty values.
    pub fn interning() -> TreeBuilder {
        TreeBuilder { interner: Some(ValueInterner::new()), ..TreeBuilder::new() }
    }

    pub fn interner(&self) -> Option<&ValueInterner> {
        self.interner.as_ref()
    }

    /// Returns the finished result. Fails if any node or mount point is
    /// still open.
    pub fn finish(self) -> Result<NormalizationResult, CodecError> {
        if let Some(open) = &self.mounts.open {
            return Err(CodecError::protocol(format!("mount point \"{}\" is still open", open.label)));
        }
        self.tracker.finish()?;
        Ok(NormalizationResult {
            data:         self.data.roots,
            metadata:     self.metadata.finish(),
            mount_points: self.mounts.finish(),
        })
    }

    fn mounted(&mut self) -> Option<&mut TreeBuilder> {
        self.mounts.open.as_mut().map(|open| &mut open.builder)
    }
}

impl NormalizedNodeStreamWriter for TreeBuilder {
    fn enter(&mut self, kind: NodeKind, id: PathArgument, size_hint: Option<usize>) -> Result<(), CodecError> {
        if let Some(nested) = self.mounted() {
            return nested.enter(kind, id, size_hint);
        }
        self.tracker.enter(kind, &id)?;
        self.metadata.enter(&id);
        self.mounts.enter(&id);
        self.data.enter(kind, id, size_hint);
        Ok(())
    }

    fn scalar_value(&mut self, value: Scalar) -> Result<(), CodecError> {
        if let Some(nested) = self.mounted() {
            return nested.scalar_value(value);
        }
        self.tracker.scalar(&value)?;
        self.data.scalar(value)
    }

    fn end(&mut self) -> Result<(), CodecError> {
        if let Some(nested) = self.mounted() {
            return nested.end();
        }
        self.tracker.end()?;
        self.data.end(self.interner.as_mut())?;
        self.metadata.end();
        self.mounts.end();
        Ok(())
    }

    fn metadata(&mut self, annotations: Annotations) -> Result<(), CodecError> {
        if let Some(nested) = self.mounted() {
            return nested.metadata(annotations);
        }
        self.metadata.annotate(annotations);
        Ok(())
    }

    fn start_mount_point(&mut self, label: &str, context: Arc<SchemaContext>) -> Result<(), CodecError> {
        if let Some(nested) = self.mounted() {
            return nested.start_mount_point(label, context);
        }
        self.tracker.start_mount(label)?;
        self.tracker.end_mount()?;
        let builder = match self.interner {
            Some(_) => TreeBuilder::interning(),
            None => TreeBuilder::new(),
        };
        self.mounts.open = Some(Box::new(OpenMount { label: label.to_owned(), context, builder }));
        Ok(())
    }

    fn end_mount_point(&mut self) -> Result<(), CodecError> {
        match self.mounts.open.take() {
            Some(mut open) if open.builder.mounts.open.is_some() => {
                let result = open.builder.end_mount_point();
                self.mounts.open = Some(open);
                result
            }
            Some(open) => self.mounts.attach(*open),
            None => Err(CodecError::protocol("end_mount_point() without an open mount point")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yang_json_schema::{AnydataValue, JsonValue, Module, SchemaDocument, XmlElement};

    fn name(local: &str) -> QName {
        QName::new("urn:t", local)
    }

    fn node(local: &str) -> PathArgument {
        PathArgument::Node(name(local))
    }

    #[test]
    fn builds_nested_tree() {
        let mut b = TreeBuilder::new();
        b.enter(NodeKind::Container, node("c"), Some(2)).unwrap();
        b.enter(NodeKind::LeafList, node("tags"), None).unwrap();
        for tag in ["a", "b"] {
            b.enter(NodeKind::LeafListEntry, PathArgument::Value { name: name("tags"), value: Value::from(tag) }, None)
                .unwrap();
            b.scalar_value(Scalar::Value(Value::from(tag))).unwrap();
            b.end().unwrap();
        }
        b.end().unwrap();
        b.enter(NodeKind::Anydata, node("blob"), None).unwrap();
        b.scalar_value(Scalar::Anydata(AnydataValue::Json(JsonValue::Null))).unwrap();
        b.end().unwrap();
        b.enter(NodeKind::Anyxml, node("x"), None).unwrap();
        b.scalar_value(Scalar::Anyxml(XmlElement::new("x"))).unwrap();
        b.end().unwrap();
        b.end().unwrap();

        let result = b.finish().unwrap();
        assert_eq!(result.metadata, None);
        assert_eq!(result.mount_points, None);
        let c = result.node(&name("c")).unwrap();
        assert_eq!(c.children().len(), 3);
        let tags = c.child_named(&name("tags")).unwrap();
        assert_eq!(tags.children()[1].value(), Some(&Value::from("b")));
    }

    #[test]
    fn leaf_list_entry_must_carry_its_value() {
        let mut b = TreeBuilder::new();
        b.enter(NodeKind::LeafList, node("tags"), None).unwrap();
        b.enter(NodeKind::LeafListEntry, PathArgument::Value { name: name("tags"), value: Value::from("a") }, None)
            .unwrap();
        b.scalar_value(Scalar::Value(Value::from("b"))).unwrap();
        assert!(matches!(b.end(), Err(CodecError::ProtocolViolation(_))));
    }

    #[test]
    fn unfinished_tree_is_rejected() {
        let mut b = TreeBuilder::new();
        b.enter(NodeKind::Container, node("c"), None).unwrap();
        assert!(matches!(b.finish(), Err(CodecError::ProtocolViolation(_))));
    }

    #[test]
    fn metadata_levels_are_pruned() {
        let mut b = TreeBuilder::new();
        b.enter(NodeKind::Container, node("c"), None).unwrap();
        b.enter(NodeKind::Container, node("plain"), None).unwrap();
        b.leaf(name("x"), Value::from(1)).unwrap();
        b.end().unwrap();
        b.enter(NodeKind::Container, node("deep"), None).unwrap();
        b.enter(NodeKind::Leaf, node("y"), None).unwrap();
        b.metadata(Annotations::from([(name("origin"), Value::from("intended"))])).unwrap();
        b.scalar_value(Scalar::Value(Value::from(2))).unwrap();
        b.end().unwrap();
        b.end().unwrap();
        b.end().unwrap();

        let metadata = b.finish().unwrap().metadata.unwrap();
        assert!(metadata.annotations.is_empty());
        let c = metadata.child(&node("c")).unwrap();
        assert!(c.child(&node("plain")).is_none());
        let y = c.child(&node("deep")).unwrap().child(&node("y")).unwrap();
        assert_eq!(y.annotations.get(&name("origin")), Some(&Value::from("intended")));
    }

    #[test]
    fn interning_shares_small_domain_values() {
        let mut b = TreeBuilder::interning();
        b.enter(NodeKind::List, node("l"), None).unwrap();
        for key in 0..3 {
            let id = PathArgument::Entry { name: name("l"), keys: vec![(name("k"), Value::from(key))] };
            b.enter(NodeKind::ListEntry, id, None).unwrap();
            b.leaf(name("k"), Value::from(key)).unwrap();
            b.leaf(name("enabled"), Value::Boolean(true)).unwrap();
            b.end().unwrap();
        }
        b.end().unwrap();
        assert_eq!(b.interner().map(ValueInterner::len), Some(1));

        let result = b.finish().unwrap();
        let entries = result.data[0].children();
        let shared: Vec<&Arc<Value>> = entries
            .iter()
            .map(|e| match e.child_named(&name("enabled")) {
                Some(NormalizedNode::Leaf { value, .. }) => value,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert!(Arc::ptr_eq(shared[0], shared[2]));
    }

    #[test]
    fn mount_point_content_goes_to_side_tree() {
        let mounted = SchemaDocument::new(vec![Module::new("inner", "urn:inner", "in")]).build().unwrap();
        let mut b = TreeBuilder::new();
        b.enter(NodeKind::Container, node("root"), None).unwrap();
        b.leaf(name("before"), Value::from(true)).unwrap();
        b.start_mount_point("schema-mount", mounted.clone()).unwrap();
        b.enter(NodeKind::Container, PathArgument::Node(QName::new("urn:inner", "system")), None).unwrap();
        b.metadata(Annotations::from([(name("tag"), Value::from("m"))])).unwrap();
        b.leaf(QName::new("urn:inner", "hostname"), Value::from("r1")).unwrap();
        b.end().unwrap();
        // the mount root is a fresh root
        assert!(b.end().is_err());
        b.end_mount_point().unwrap();
        b.end().unwrap();

        let result = b.finish().unwrap();
        assert_eq!(result.data[0].children().len(), 1);
        let mounts = result.mount_points.unwrap();
        let mount = mounts.child(&node("root")).unwrap().mount_point.as_ref().unwrap();
        assert_eq!(mount.label, "schema-mount");
        assert_eq!(mount.context, ContextRef(mounted));
        assert_eq!(mount.data[0].name(), &QName::new("urn:inner", "system"));
        assert!(mount.metadata.is_some());
        assert!(result.metadata.is_none());
    }

    #[test]
    fn mount_point_requires_container() {
        let mounted = SchemaDocument::new(vec![]).build().unwrap();
        let mut b = TreeBuilder::new();
        assert!(b.start_mount_point("m", mounted.clone()).is_err());
        b.enter(NodeKind::Leaf, node("a"), None).unwrap();
        assert!(b.start_mount_point("m", mounted).is_err());
        assert!(b.end_mount_point().is_err());
    }
}
