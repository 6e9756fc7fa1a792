use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::json::JsonValue;
use crate::model::SchemaContext;
use crate::qname::{Namespace, QName};
use crate::value::{PathArgument, Value};

/// One node of a normalized data tree.
///
/// Composite variants own their children in insertion order; sibling
/// identifiers are unique except for entries of a keyless list, which are
/// positional. Trees are produced by a tree builder and not mutated after.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedNode {
    Container { name: QName, children: Vec<NormalizedNode> },
    /// A choice level; its children are the data of the selected case.
    Choice { name: QName, children: Vec<NormalizedNode> },
    List { name: QName, entries: Vec<NormalizedNode> },
    ListEntry { id: PathArgument, children: Vec<NormalizedNode> },
    LeafList { name: QName, entries: Vec<NormalizedNode> },
    LeafListEntry { name: QName, value: Arc<Value> },
    Leaf { name: QName, value: Arc<Value> },
    Anydata { name: QName, value: AnydataValue },
    Anyxml { name: QName, value: XmlElement },
}

impl NormalizedNode {
    pub fn container(name: QName, children: Vec<NormalizedNode>) -> NormalizedNode {
        NormalizedNode::Container { name, children }
    }

    pub fn leaf(name: QName, value: Value) -> NormalizedNode {
        NormalizedNode::Leaf { name, value: Arc::new(value) }
    }

    pub fn name(&self) -> &QName {
        match self {
            NormalizedNode::Container { name, .. }
            | NormalizedNode::Choice { name, .. }
            | NormalizedNode::List { name, .. }
            | NormalizedNode::LeafList { name, .. }
            | NormalizedNode::LeafListEntry { name, .. }
            | NormalizedNode::Leaf { name, .. }
            | NormalizedNode::Anydata { name, .. }
            | NormalizedNode::Anyxml { name, .. } => name,
            NormalizedNode::ListEntry { id, .. } => id.name(),
        }
    }

    /// The node's identity within its parent.
    pub fn identifier(&self) -> PathArgument {
        match self {
            NormalizedNode::ListEntry { id, .. } => id.clone(),
            NormalizedNode::LeafListEntry { name, value } => PathArgument::Value {
                name:  name.clone(),
                value: (**value).clone(),
            },
            other => PathArgument::Node(other.name().clone()),
        }
    }

    /// Children of a composite node, entries of a list or leaf-list, and
    /// nothing for scalar nodes.
    pub fn children(&self) -> &[NormalizedNode] {
        match self {
            NormalizedNode::Container { children, .. }
            | NormalizedNode::Choice { children, .. }
            | NormalizedNode::ListEntry { children, .. } => children,
            NormalizedNode::List { entries, .. } | NormalizedNode::LeafList { entries, .. } => entries,
            _ => &[],
        }
    }

    pub fn child(&self, id: &PathArgument) -> Option<&NormalizedNode> {
        self.children().iter().find(|c| c.identifier() == *id)
    }

    pub fn child_named(&self, name: &QName) -> Option<&NormalizedNode> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// The value of a leaf or leaf-list entry.
    pub fn value(&self) -> Option<&Value> {
        match self {
            NormalizedNode::Leaf { value, .. } | NormalizedNode::LeafListEntry { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// A generic XML-like element, the payload of an `anyxml` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name:      String,
    pub namespace: Option<Namespace>,
    pub children:  Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn new(name: &str) -> XmlElement {
        XmlElement { name: name.to_owned(), namespace: None, children: Vec::new() }
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> XmlElement {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_text(mut self, text: &str) -> XmlElement {
        self.children.push(XmlNode::Text(text.to_owned()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> XmlElement {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// The run of adjacent text nodes starting at the first text child.
    pub fn text(&self) -> Option<String> {
        let start = self.children.iter().position(|n| matches!(n, XmlNode::Text(_)))?;
        let mut text = String::new();
        for node in &self.children[start..] {
            match node {
                XmlNode::Text(t) => text.push_str(t),
                XmlNode::Element(_) => break,
            }
        }
        Some(text)
    }
}

/// The payload of an `anydata` node.
#[derive(Debug, Clone, PartialEq)]
pub enum AnydataValue {
    /// Opaque JSON, as it appeared in the input.
    Json(JsonValue),
    /// Data normalized against its own schema.
    Normalized(NormalizedAnydata),
}

#[derive(Clone)]
pub struct NormalizedAnydata {
    pub context: Arc<SchemaContext>,
    pub data:    Vec<NormalizedNode>,
}

impl PartialEq for NormalizedAnydata {
    fn eq(&self, other: &NormalizedAnydata) -> bool {
        self.context.id() == other.context.id() && self.data == other.data
    }
}

impl fmt::Debug for NormalizedAnydata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NormalizedAnydata")
            .field("context", &self.context.id())
            .field("data", &self.data)
            .finish()
    }
}

/// Annotations attached to one data node.
pub type Annotations = BTreeMap<QName, Value>;

/// Metadata side tree, shaped like the data tree it annotates. Levels that
/// carry no annotations anywhere below them are not materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedMetadata {
    pub annotations: Annotations,
    pub children:    Vec<(PathArgument, NormalizedMetadata)>,
}

impl NormalizedMetadata {
    pub fn child(&self, id: &PathArgument) -> Option<&NormalizedMetadata> {
        self.children.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && self.children.is_empty()
    }
}

/// A sub-tree attached at a mount point, normalized against the mounted schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MountPointData {
    pub label:    String,
    pub context:  ContextRef,
    pub data:     Vec<NormalizedNode>,
    pub metadata: Option<NormalizedMetadata>,
}

/// A schema context compared by identity.
#[derive(Clone)]
pub struct ContextRef(pub Arc<SchemaContext>);

impl PartialEq for ContextRef {
    fn eq(&self, other: &ContextRef) -> bool {
        self.0.id() == other.0.id()
    }
}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.id())
    }
}

/// Mount-point side tree, keyed by the same path arguments as the data tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedMountPoints {
    pub mount_point: Option<MountPointData>,
    pub children:    Vec<(PathArgument, NormalizedMountPoints)>,
}

impl NormalizedMountPoints {
    pub fn child(&self, id: &PathArgument) -> Option<&NormalizedMountPoints> {
        self.children.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.mount_point.is_none() && self.children.is_empty()
    }
}

/// The complete outcome of one normalization: the top-level data nodes and
/// the optional side trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationResult {
    pub data:         Vec<NormalizedNode>,
    pub metadata:     Option<NormalizedMetadata>,
    pub mount_points: Option<NormalizedMountPoints>,
}

impl NormalizationResult {
    pub fn from_data(data: Vec<NormalizedNode>) -> NormalizationResult {
        NormalizationResult { data, ..NormalizationResult::default() }
    }

    pub fn node(&self, name: &QName) -> Option<&NormalizedNode> {
        self.data.iter().find(|n| n.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        let name = QName::new("urn:x", "tags");
        let entry = NormalizedNode::LeafListEntry { name: name.clone(), value: Arc::new(Value::from("a")) };
        assert_eq!(entry.identifier(), PathArgument::Value { name: name.clone(), value: Value::from("a") });
        let list = NormalizedNode::LeafList { name: name.clone(), entries: vec![entry.clone()] };
        assert_eq!(list.identifier(), PathArgument::Node(name.clone()));
        assert_eq!(list.child(&entry.identifier()), Some(&entry));
        assert_eq!(entry.value(), Some(&Value::from("a")));
    }

    #[test]
    fn xml_text_run() {
        let element = XmlElement::new("a")
            .with_text("1")
            .with_text("2")
            .with_child(XmlElement::new("b"))
            .with_text("3");
        assert_eq!(element.text().as_deref(), Some("12"));
        assert_eq!(element.child_elements().count(), 1);
        assert_eq!(XmlElement::new("e").text(), None);
    }
}
