//! The tree streaming protocol: a push-style event interface through which a
//! normalized tree is produced or consumed one node at a time.
//!
//! A producer calls [enter](NormalizedNodeStreamWriter::enter) for every node,
//! [scalar_value](NormalizedNodeStreamWriter::scalar_value) for the payload of
//! leaves, leaf-list entries, anydata and anyxml, and
//! [end](NormalizedNodeStreamWriter::end) to close the innermost open node.
//! Choices are entered like any other node so consumers can see which case the
//! data belongs to. The root is implicit and never entered.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use yang_json_schema::{Annotations, AnydataValue, PathArgument, QName, SchemaContext, Value, XmlElement};

use crate::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Container,
    Choice,
    List,
    ListEntry,
    LeafList,
    LeafListEntry,
    Leaf,
    Anydata,
    Anyxml,
}

impl NodeKind {
    /// Levels that carry exactly one scalar and no children.
    pub fn is_scalar(self) -> bool {
        matches!(self, NodeKind::Leaf | NodeKind::LeafListEntry | NodeKind::Anydata | NodeKind::Anyxml)
    }

    fn is_data_child(self) -> bool {
        !matches!(self, NodeKind::ListEntry | NodeKind::LeafListEntry)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NodeKind::Container     => "container",
            NodeKind::Choice        => "choice",
            NodeKind::List          => "list",
            NodeKind::ListEntry     => "list entry",
            NodeKind::LeafList      => "leaf-list",
            NodeKind::LeafListEntry => "leaf-list entry",
            NodeKind::Leaf          => "leaf",
            NodeKind::Anydata       => "anydata",
            NodeKind::Anyxml        => "anyxml",
        };
        f.write_str(name)
    }
}

/// The payload of a scalar level.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Value(Value),
    Anydata(AnydataValue),
    Anyxml(XmlElement),
}

impl From<Value> for Scalar {
    fn from(value: Value) -> Scalar {
        Scalar::Value(value)
    }
}

pub trait NormalizedNodeStreamWriter {
    /// Opens a node. `size_hint` is the expected number of children, if known.
    fn enter(&mut self, kind: NodeKind, id: PathArgument, size_hint: Option<usize>) -> Result<(), CodecError>;

    /// Attaches the payload of the innermost open scalar level.
    fn scalar_value(&mut self, value: Scalar) -> Result<(), CodecError>;

    /// Closes the innermost open node.
    fn end(&mut self) -> Result<(), CodecError>;

    /// Attaches annotations to the innermost open node. Writers without a
    /// metadata channel ignore them.
    fn metadata(&mut self, _annotations: Annotations) -> Result<(), CodecError> {
        Ok(())
    }

    /// Starts the content of a mount point inside the innermost open node.
    /// Until the matching [end_mount_point](Self::end_mount_point), events
    /// describe top-level data of `context`.
    fn start_mount_point(&mut self, label: &str, _context: Arc<SchemaContext>) -> Result<(), CodecError> {
        Err(CodecError::protocol(format!("mount point \"{}\" is not supported by this writer", label)))
    }

    fn end_mount_point(&mut self) -> Result<(), CodecError> {
        Err(CodecError::protocol("no mount point is open"))
    }

    /// Writes a complete leaf.
    fn leaf(&mut self, name: QName, value: Value) -> Result<(), CodecError> {
        self.enter(NodeKind::Leaf, PathArgument::Node(name), None)?;
        self.scalar_value(Scalar::Value(value))?;
        self.end()
    }
}

impl<W: NormalizedNodeStreamWriter + ?Sized> NormalizedNodeStreamWriter for &mut W {
    fn enter(&mut self, kind: NodeKind, id: PathArgument, size_hint: Option<usize>) -> Result<(), CodecError> {
        (**self).enter(kind, id, size_hint)
    }

    fn scalar_value(&mut self, value: Scalar) -> Result<(), CodecError> {
        (**self).scalar_value(value)
    }

    fn end(&mut self) -> Result<(), CodecError> {
        (**self).end()
    }

    fn metadata(&mut self, annotations: Annotations) -> Result<(), CodecError> {
        (**self).metadata(annotations)
    }

    fn start_mount_point(&mut self, label: &str, context: Arc<SchemaContext>) -> Result<(), CodecError> {
        (**self).start_mount_point(label, context)
    }

    fn end_mount_point(&mut self) -> Result<(), CodecError> {
        (**self).end_mount_point()
    }
}

struct Level {
    /// `None` for the root and for mount point roots.
    kind:      Option<NodeKind>,
    id:        Option<PathArgument>,
    children:  HashSet<PathArgument>,
    has_value: bool,
}

impl Level {
    fn root() -> Level {
        Level { kind: None, id: None, children: HashSet::new(), has_value: false }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.id) {
            (Some(kind), Some(id)) => format!("{} {}", kind, id),
            _ => "the root".to_owned(),
        }
    }
}

/// Validates an event stream against the protocol rules. Writers embed one
/// and consult it before acting on each event.
pub struct ProtocolTracker {
    levels: Vec<Level>,
}

impl Default for ProtocolTracker {
    fn default() -> ProtocolTracker {
        ProtocolTracker::new()
    }
}

impl ProtocolTracker {
    pub fn new() -> ProtocolTracker {
        ProtocolTracker { levels: vec![Level::root()] }
    }

    /// Number of open levels, not counting roots.
    pub fn depth(&self) -> usize {
        self.levels.iter().filter(|l| l.kind.is_some()).count()
    }

    /// True when only the outermost root is open.
    pub fn is_idle(&self) -> bool {
        self.levels.len() == 1
    }

    pub fn current(&self) -> Option<NodeKind> {
        self.levels.last().and_then(|l| l.kind)
    }

    pub fn enter(&mut self, kind: NodeKind, id: &PathArgument) -> Result<(), CodecError> {
        let parent = self.top_mut()?;
        let allowed = match parent.kind {
            None | Some(NodeKind::Container) | Some(NodeKind::Choice) | Some(NodeKind::ListEntry) => kind.is_data_child(),
            Some(NodeKind::List)     => kind == NodeKind::ListEntry,
            Some(NodeKind::LeafList) => kind == NodeKind::LeafListEntry,
            Some(_) => false,
        };
        if !allowed {
            return Err(CodecError::protocol(format!("{} {} cannot be opened inside {}", kind, id, parent.describe())));
        }

        let id_matches = match (kind, id, &parent.id) {
            (NodeKind::ListEntry, PathArgument::Entry { name, .. }, Some(list))
            | (NodeKind::LeafListEntry, PathArgument::Value { name, .. }, Some(list)) => name == list.name(),
            (NodeKind::ListEntry | NodeKind::LeafListEntry, _, _) => false,
            (_, PathArgument::Node(_), _) => true,
            _ => false,
        };
        if !id_matches {
            return Err(CodecError::protocol(format!("identifier {} does not fit a {}", id, kind)));
        }

        if id.is_unique() && !parent.children.insert(id.clone()) {
            return Err(CodecError::Duplicate { node: id.to_string(), parent: parent.describe() });
        }
        self.levels.push(Level { kind: Some(kind), id: Some(id.clone()), children: HashSet::new(), has_value: false });
        Ok(())
    }

    pub fn scalar(&mut self, value: &Scalar) -> Result<(), CodecError> {
        let level = self.top_mut()?;
        let fits = match (level.kind, value) {
            (Some(NodeKind::Leaf) | Some(NodeKind::LeafListEntry), Scalar::Value(_)) => true,
            (Some(NodeKind::Anydata), Scalar::Anydata(_)) => true,
            (Some(NodeKind::Anyxml), Scalar::Anyxml(_)) => true,
            _ => false,
        };
        if !fits {
            return Err(CodecError::protocol(format!("unexpected scalar value inside {}", level.describe())));
        }
        if level.has_value {
            return Err(CodecError::protocol(format!("{} already has a value", level.describe())));
        }
        level.has_value = true;
        Ok(())
    }

    /// Closes the innermost level and returns its kind.
    pub fn end(&mut self) -> Result<NodeKind, CodecError> {
        let level = self.top_mut()?;
        let kind = match level.kind {
            Some(kind) => kind,
            None => return Err(CodecError::protocol("end() without an open node")),
        };
        if kind.is_scalar() && !level.has_value {
            return Err(CodecError::protocol(format!("{} ended without a value", level.describe())));
        }
        self.levels.pop();
        Ok(kind)
    }

    /// Opens a mount point root inside the innermost container or list entry.
    pub fn start_mount(&mut self, label: &str) -> Result<(), CodecError> {
        let level = self.top_mut()?;
        if !matches!(level.kind, Some(NodeKind::Container) | Some(NodeKind::ListEntry)) {
            return Err(CodecError::protocol(format!("mount point \"{}\" cannot start inside {}", label, level.describe())));
        }
        self.levels.push(Level::root());
        Ok(())
    }

    pub fn end_mount(&mut self) -> Result<(), CodecError> {
        if self.levels.len() < 2 || self.levels.last().map(|l| l.kind.is_some()).unwrap_or(true) {
            return Err(CodecError::protocol("end_mount_point() without an open mount point at this level"));
        }
        self.levels.pop();
        Ok(())
    }

    /// Fails unless every opened node has been closed.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.levels.last() {
            Some(level) if !self.is_idle() => {
                Err(CodecError::protocol(format!("{} is still open", level.describe())))
            }
            _ => Ok(()),
        }
    }

    fn top_mut(&mut self) -> Result<&mut Level, CodecError> {
        self.levels.last_mut().ok_or_else(|| CodecError::protocol("writer is closed"))
    }
}
