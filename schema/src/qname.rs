use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The namespace URI of a YANG module.
///
/// Namespaces are compared by value but are cheap to clone, since every
/// qualified name in a tree carries one.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Arc<str>);

impl Namespace {
    pub fn new(uri: &str) -> Namespace {
        Namespace(Arc::from(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Namespace {
    fn from(uri: &str) -> Namespace {
        Namespace::new(uri)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A qualified name: a local name bound to the namespace of the module that
/// defines it. This is the identity of every schema node and data node.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    namespace:  Namespace,
    local_name: Arc<str>,
}

impl QName {
    pub fn new(namespace: impl Into<Namespace>, local_name: &str) -> QName {
        QName {
            namespace:  namespace.into(),
            local_name: Arc::from(local_name),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns a name with the same namespace and a different local name.
    pub fn sibling(&self, local_name: &str) -> QName {
        QName {
            namespace:  self.namespace.clone(),
            local_name: Arc::from(local_name),
        }
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}){}", self.namespace, self.local_name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}){}", self.namespace, self.local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_equality_is_by_value() {
        let a = QName::new("urn:example:foo", "bar");
        let b = QName::new(Namespace::new("urn:example:foo"), "bar");
        assert_eq!(a, b);
        assert_ne!(a, a.sibling("baz"));
        assert_eq!(a.sibling("baz").namespace(), a.namespace());
    }

    #[test]
    fn qname_display() {
        let name = QName::new("urn:example:foo", "bar");
        assert_eq!(name.to_string(), "(urn:example:foo)bar");
    }
}
