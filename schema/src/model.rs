use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::SchemaError;
use crate::qname::{Namespace, QName};
use crate::types::TypeDefinition;

/// A YANG module: the owner of one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name:      String,
    pub namespace: Namespace,
    pub prefix:    String,
}

impl Module {
    pub fn new(name: &str, namespace: &str, prefix: &str) -> Module {
        Module {
            name:      name.to_owned(),
            namespace: Namespace::new(namespace),
            prefix:    prefix.to_owned(),
        }
    }
}

/// A resolved identity and the identities it is directly derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub qname: QName,
    pub bases: Vec<QName>,
}

/// Index of a schema node inside the arena of one [SchemaContext].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Process-unique identity of a schema snapshot. Codec caches are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(u64);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

impl ContextId {
    fn next() -> ContextId {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNodeKind {
    Container { presence: bool },
    List { keys: Vec<QName>, ordered_by_user: bool },
    Leaf { type_def: TypeDefinition },
    LeafList { type_def: TypeDefinition, ordered_by_user: bool },
    Choice,
    Case,
    Anydata,
    Anyxml,
}

#[derive(Debug, Clone)]
pub struct SchemaNode {
    id:          NodeId,
    qname:       QName,
    kind:        SchemaNodeKind,
    parent:      Option<NodeId>,
    children:    Vec<NodeId>,
    mount_point: Option<String>,
}

impl SchemaNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn kind(&self) -> &SchemaNodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The label of the mount point declared on this node, if any.
    pub fn mount_point(&self) -> Option<&str> {
        self.mount_point.as_deref()
    }

    pub fn type_def(&self) -> Option<&TypeDefinition> {
        match &self.kind {
            SchemaNodeKind::Leaf { type_def } | SchemaNodeKind::LeafList { type_def, .. } => Some(type_def),
            _ => None,
        }
    }

    pub fn keys(&self) -> &[QName] {
        match &self.kind {
            SchemaNodeKind::List { keys, .. } => keys,
            _ => &[],
        }
    }

    pub fn is_presence(&self) -> bool {
        matches!(self.kind, SchemaNodeKind::Container { presence: true })
    }

    /// Choices and cases are schema-only; everything else instantiates data.
    pub fn is_data_node(&self) -> bool {
        !matches!(self.kind, SchemaNodeKind::Choice | SchemaNodeKind::Case)
    }
}

/// An immutable schema snapshot: modules, identities and the tree of schema
/// nodes, stored in an arena and addressed by [NodeId].
///
/// ```
/// use yang_json_schema::*;
///
/// let context = SchemaContext::from_json(r#"{
///     "modules": [{"name": "ex", "namespace": "urn:ex", "prefix": "ex"}],
///     "nodes": [
///         {"kind": "container", "name": "top", "module": "ex", "children": [
///             {"kind": "leaf", "name": "port", "type": {"base": "integer", "kind": "uint16"}}
///         ]}
///     ]
/// }"#).unwrap();
///
/// let top = context.find_data_child(None, &QName::new("urn:ex", "top")).unwrap();
/// assert_eq!(top.len(), 1);
/// assert_eq!(context.module_by_namespace(&Namespace::new("urn:ex")).unwrap().name, "ex");
/// ```
pub struct SchemaContext {
    id:           ContextId,
    modules:      Vec<Module>,
    by_name:      HashMap<String, usize>,
    by_prefix:    HashMap<String, usize>,
    by_namespace: HashMap<Namespace, usize>,
    identities:   HashMap<QName, Identity>,
    nodes:        Vec<SchemaNode>,
    roots:        Vec<NodeId>,
}

impl fmt::Debug for SchemaContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SchemaContext")
            .field("id", &self.id)
            .field("modules", &self.modules.iter().map(|m| m.name.as_str()).collect::<Vec<_>>())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl SchemaContext {
    pub fn from_json(text: &str) -> Result<Arc<SchemaContext>, SchemaError> {
        // Tagged type definitions buffer their fields, which only sees plain
        // integers once the text has gone through a `serde_json::Value`.
        let value: serde_json::Value = serde_json::from_str(text)?;
        let document: SchemaDocument = serde_json::from_value(value)?;
        SchemaContext::new(document)
    }

    pub fn new(document: SchemaDocument) -> Result<Arc<SchemaContext>, SchemaError> {
        let mut context = SchemaContext {
            id:           ContextId::next(),
            modules:      Vec::with_capacity(document.modules.len()),
            by_name:      HashMap::new(),
            by_prefix:    HashMap::new(),
            by_namespace: HashMap::new(),
            identities:   HashMap::new(),
            nodes:        Vec::new(),
            roots:        Vec::new(),
        };

        for module in document.modules {
            let index = context.modules.len();
            if context.by_name.insert(module.name.clone(), index).is_some()
                || context.by_namespace.insert(module.namespace.clone(), index).is_some()
            {
                return Err(SchemaError::DuplicateModule(module.name));
            }
            context.by_prefix.insert(module.prefix.clone(), index);
            context.modules.push(module);
        }

        for def in &document.identities {
            let namespace = context.namespace_of(&def.module)?;
            let qname = QName::new(namespace, &def.name);
            let bases = def
                .bases
                .iter()
                .map(|base| context.identity_name(base, &def.module))
                .collect::<Result<Vec<_>, _>>()?;
            context.identities.insert(qname.clone(), Identity { qname, bases });
        }

        for def in &document.nodes {
            let id = context.add_node(def, None, None)?;
            context.roots.push(id);
        }
        context.check_unique(None)?;

        Ok(Arc::new(context))
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module_by_name(&self, name: &str) -> Option<&Module> {
        self.by_name.get(name).map(|&i| &self.modules[i])
    }

    pub fn module_by_prefix(&self, prefix: &str) -> Option<&Module> {
        self.by_prefix.get(prefix).map(|&i| &self.modules[i])
    }

    pub fn module_by_namespace(&self, namespace: &Namespace) -> Option<&Module> {
        self.by_namespace.get(namespace).map(|&i| &self.modules[i])
    }

    pub fn identity(&self, qname: &QName) -> Option<&Identity> {
        self.identities.get(qname)
    }

    /// True when `identity` is derived, directly or transitively, from `base`.
    /// An identity is not derived from itself.
    pub fn is_derived_from(&self, identity: &QName, base: &QName) -> bool {
        let mut pending: Vec<&QName> = match self.identities.get(identity) {
            Some(found) => found.bases.iter().collect(),
            None => return false,
        };
        let mut seen = Vec::new();
        while let Some(next) = pending.pop() {
            if next == base {
                return true;
            }
            if seen.contains(&next) {
                continue;
            }
            seen.push(next);
            if let Some(found) = self.identities.get(next) {
                pending.extend(found.bases.iter());
            }
        }
        false
    }

    /// Panics when `id` was issued by another context; use [Self::try_node]
    /// for ids that come from outside.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    pub fn try_node(&self, id: NodeId) -> Result<&SchemaNode, SchemaError> {
        self.nodes.get(id.index()).ok_or(SchemaError::UnknownNode(id.index()))
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Direct children of `parent`, or the top-level nodes for `None`.
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(id) => &self.nodes[id.index()].children,
            None => &self.roots,
        }
    }

    /// Direct child lookup, without looking through choices and cases.
    pub fn child(&self, parent: Option<NodeId>, qname: &QName) -> Option<NodeId> {
        self.children_of(parent)
            .iter()
            .copied()
            .find(|&id| self.nodes[id.index()].qname == *qname)
    }

    /// Finds the data node named `qname` under `parent`, looking through any
    /// choice and case levels on the way. Returns the traversed choice/case
    /// nodes followed by the data node itself.
    pub fn find_data_child(&self, parent: Option<NodeId>, qname: &QName) -> Option<Vec<NodeId>> {
        for &id in self.children_of(parent) {
            let node = &self.nodes[id.index()];
            if node.is_data_node() {
                if node.qname == *qname {
                    return Some(vec![id]);
                }
            } else if let Some(mut path) = self.find_data_child(Some(id), qname) {
                path.insert(0, id);
                return Some(path);
            }
        }
        None
    }

    /// All data nodes reachable from `parent` through choices and cases.
    pub fn data_children(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.collect_data_children(parent, &mut found);
        found
    }

    fn collect_data_children(&self, parent: Option<NodeId>, found: &mut Vec<NodeId>) {
        for &id in self.children_of(parent) {
            if self.nodes[id.index()].is_data_node() {
                found.push(id);
            } else {
                self.collect_data_children(Some(id), found);
            }
        }
    }

    /// The nearest ancestor that is a data node; `None` means the schema root.
    pub fn data_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[id.index()].parent;
        while let Some(parent) = current {
            let node = &self.nodes[parent.index()];
            if node.is_data_node() {
                return Some(parent);
            }
            current = node.parent;
        }
        None
    }

    /// Resolves a leafref-style path relative to the node `from`.
    ///
    /// Steps are `prefix:name`, `name` (same module as `from`) or `..`.
    /// Predicates are skipped since they do not change the target schema node.
    pub fn resolve_path(&self, from: NodeId, path: &str) -> Option<NodeId> {
        let stripped = strip_predicates(path);
        let default_ns = self.nodes[from.index()].qname.namespace().clone();
        let (mut current, rest) = match stripped.strip_prefix('/') {
            Some(rest) => (None, rest.to_owned()),
            None => (Some(from), stripped),
        };
        for step in rest.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            if step == "." {
                continue;
            }
            if step == ".." {
                current = self.data_parent(current?);
                continue;
            }
            let (namespace, local) = match step.split_once(':') {
                Some((prefix, local)) => {
                    let module = self
                        .module_by_prefix(prefix)
                        .or_else(|| self.module_by_name(prefix))?;
                    (module.namespace.clone(), local)
                }
                None => (default_ns.clone(), step),
            };
            let found = self.find_data_child(current, &QName::new(namespace, local))?;
            current = found.last().copied();
        }
        current
    }

    fn namespace_of(&self, module: &str) -> Result<Namespace, SchemaError> {
        self.module_by_name(module)
            .map(|m| m.namespace.clone())
            .ok_or_else(|| SchemaError::UnknownModule(module.to_owned()))
    }

    fn identity_name(&self, text: &str, default_module: &str) -> Result<QName, SchemaError> {
        let (module, name) = text.split_once(':').unwrap_or((default_module, text));
        Ok(QName::new(self.namespace_of(module)?, name))
    }

    fn add_node(
        &mut self,
        def: &NodeDef,
        parent: Option<NodeId>,
        inherited: Option<&Namespace>,
    ) -> Result<NodeId, SchemaError> {
        let namespace = match (&def.module, inherited) {
            (Some(module), _) => self.namespace_of(module)?,
            (None, Some(namespace)) => namespace.clone(),
            (None, None) => {
                return Err(SchemaError::InvalidDefinition {
                    node: def.name.clone(),
                    msg:  "top-level nodes must name their module".to_owned(),
                })
            }
        };
        let qname = QName::new(namespace.clone(), &def.name);
        let invalid = |msg: &str| SchemaError::InvalidDefinition {
            node: def.name.clone(),
            msg:  msg.to_owned(),
        };

        let parent_is_choice = parent
            .map(|p| matches!(self.nodes[p.index()].kind, SchemaNodeKind::Choice))
            .unwrap_or(false);
        if def.kind == NodeDefKind::Case && !parent_is_choice {
            return Err(invalid("a case must be a child of a choice"));
        }
        if parent_is_choice && def.kind != NodeDefKind::Case {
            // Shorthand case: the case takes the name of its only child.
            let case = NodeDef {
                kind:     NodeDefKind::Case,
                name:     def.name.clone(),
                module:   None,
                children: vec![def.clone()],
                ..NodeDef::default()
            };
            return self.add_node(&case, parent, Some(&namespace));
        }

        let kind = match def.kind {
            NodeDefKind::Container => SchemaNodeKind::Container { presence: def.presence },
            NodeDefKind::List => SchemaNodeKind::List { keys: vec![], ordered_by_user: def.ordered_by_user },
            NodeDefKind::Leaf => SchemaNodeKind::Leaf {
                type_def: def.type_def.clone().ok_or_else(|| invalid("a leaf needs a type"))?,
            },
            NodeDefKind::LeafList => SchemaNodeKind::LeafList {
                type_def:        def.type_def.clone().ok_or_else(|| invalid("a leaf-list needs a type"))?,
                ordered_by_user: def.ordered_by_user,
            },
            NodeDefKind::Choice   => SchemaNodeKind::Choice,
            NodeDefKind::Case     => SchemaNodeKind::Case,
            NodeDefKind::Anydata  => SchemaNodeKind::Anydata,
            NodeDefKind::Anyxml   => SchemaNodeKind::Anyxml,
        };
        let is_terminal = matches!(
            kind,
            SchemaNodeKind::Leaf { .. } | SchemaNodeKind::LeafList { .. } | SchemaNodeKind::Anydata | SchemaNodeKind::Anyxml
        );
        if is_terminal && !def.children.is_empty() {
            return Err(invalid("only containers, lists, choices and cases have children"));
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode {
            id,
            qname,
            kind,
            parent,
            children: Vec::new(),
            mount_point: def.mount_point.clone(),
        });

        let mut children = Vec::with_capacity(def.children.len());
        for child in &def.children {
            children.push(self.add_node(child, Some(id), Some(&namespace))?);
        }
        self.nodes[id.index()].children = children;
        self.check_unique(Some(id))?;

        if def.kind == NodeDefKind::List {
            let mut keys = Vec::with_capacity(def.keys.len());
            for key in &def.keys {
                let key_name = QName::new(namespace.clone(), key);
                let is_leaf = self
                    .child(Some(id), &key_name)
                    .map(|k| matches!(self.nodes[k.index()].kind, SchemaNodeKind::Leaf { .. }))
                    .unwrap_or(false);
                if !is_leaf {
                    return Err(invalid(&format!("key \"{}\" is not a leaf of the list", key)));
                }
                keys.push(key_name);
            }
            if let SchemaNodeKind::List { keys: slot, .. } = &mut self.nodes[id.index()].kind {
                *slot = keys;
            }
        }

        Ok(id)
    }

    fn check_unique(&self, parent: Option<NodeId>) -> Result<(), SchemaError> {
        let children = self.children_of(parent);
        for (i, &a) in children.iter().enumerate() {
            let name = &self.nodes[a.index()].qname;
            if children[i + 1..].iter().any(|&b| self.nodes[b.index()].qname == *name) {
                return Err(SchemaError::DuplicateNode {
                    parent: match parent {
                        Some(p) => self.nodes[p.index()].qname.to_string(),
                        None => "the schema root".to_owned(),
                    },
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn strip_predicates(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    for c in path.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// The serialized form of a schema: what `SchemaContext::from_json` reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub modules:    Vec<Module>,
    #[serde(default)]
    pub identities: Vec<IdentityDef>,
    #[serde(default)]
    pub nodes:      Vec<NodeDef>,
}

impl SchemaDocument {
    pub fn new(modules: Vec<Module>) -> SchemaDocument {
        SchemaDocument { modules, ..SchemaDocument::default() }
    }

    pub fn identity(mut self, identity: IdentityDef) -> SchemaDocument {
        self.identities.push(identity);
        self
    }

    pub fn node(mut self, node: NodeDef) -> SchemaDocument {
        self.nodes.push(node);
        self
    }

    pub fn build(self) -> Result<Arc<SchemaContext>, SchemaError> {
        SchemaContext::new(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDef {
    pub module: String,
    pub name:   String,
    /// Written as `module-name:identity-name`, or a bare name for the same module.
    #[serde(default)]
    pub bases:  Vec<String>,
}

impl IdentityDef {
    pub fn new(module: &str, name: &str, bases: &[&str]) -> IdentityDef {
        IdentityDef {
            module: module.to_owned(),
            name:   name.to_owned(),
            bases:  bases.iter().map(|b| b.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeDefKind {
    #[default]
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
    Anydata,
    Anyxml,
}

/// One schema node definition. A node without a module inherits the module
/// of its parent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDef {
    pub kind:            NodeDefKind,
    pub name:            String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module:          Option<String>,
    #[serde(default)]
    pub presence:        bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys:            Vec<String>,
    #[serde(default)]
    pub ordered_by_user: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_def:        Option<TypeDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point:     Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children:        Vec<NodeDef>,
}

impl NodeDef {
    fn with_kind(kind: NodeDefKind, name: &str) -> NodeDef {
        NodeDef { kind, name: name.to_owned(), ..NodeDef::default() }
    }

    pub fn container(name: &str) -> NodeDef {
        NodeDef::with_kind(NodeDefKind::Container, name)
    }

    pub fn list(name: &str, keys: &[&str]) -> NodeDef {
        NodeDef {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            ..NodeDef::with_kind(NodeDefKind::List, name)
        }
    }

    pub fn leaf(name: &str, type_def: TypeDefinition) -> NodeDef {
        NodeDef { type_def: Some(type_def), ..NodeDef::with_kind(NodeDefKind::Leaf, name) }
    }

    pub fn leaf_list(name: &str, type_def: TypeDefinition) -> NodeDef {
        NodeDef { type_def: Some(type_def), ..NodeDef::with_kind(NodeDefKind::LeafList, name) }
    }

    pub fn choice(name: &str) -> NodeDef {
        NodeDef::with_kind(NodeDefKind::Choice, name)
    }

    pub fn case(name: &str) -> NodeDef {
        NodeDef::with_kind(NodeDefKind::Case, name)
    }

    pub fn anydata(name: &str) -> NodeDef {
        NodeDef::with_kind(NodeDefKind::Anydata, name)
    }

    pub fn anyxml(name: &str) -> NodeDef {
        NodeDef::with_kind(NodeDefKind::Anyxml, name)
    }

    pub fn in_module(mut self, module: &str) -> NodeDef {
        self.module = Some(module.to_owned());
        self
    }

    pub fn presence(mut self) -> NodeDef {
        self.presence = true;
        self
    }

    pub fn ordered_by_user(mut self) -> NodeDef {
        self.ordered_by_user = true;
        self
    }

    pub fn mount_point(mut self, label: &str) -> NodeDef {
        self.mount_point = Some(label.to_owned());
        self
    }

    pub fn child(mut self, child: NodeDef) -> NodeDef {
        self.children.push(child);
        self
    }
}
