//! The data model shared by the yang-json crates: a read-only YANG schema
//! snapshot, typed scalar values, and the normalized data tree that the JSON
//! codec reads and writes.
//!
//! ```
//! use yang_json_schema::*;
//!
//! let context = SchemaDocument::new(vec![Module::new("ex", "urn:ex", "ex")])
//!     .node(
//!         NodeDef::container("system")
//!             .in_module("ex")
//!             .child(NodeDef::leaf("hostname", TypeDefinition::string())),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let system = QName::new("urn:ex", "system");
//! let tree = NormalizedNode::container(system.clone(), vec![
//!     NormalizedNode::leaf(system.sibling("hostname"), Value::from("r1")),
//! ]);
//! assert_eq!(tree.child_named(&system.sibling("hostname")).unwrap().value(), Some(&Value::from("r1")));
//! assert!(context.find_data_child(None, &system).is_some());
//! ```

pub mod error;
pub mod json;
pub mod model;
pub mod node;
pub mod qname;
pub mod types;
pub mod value;

pub use error::*;
pub use json::*;
pub use model::*;
pub use node::*;
pub use qname::*;
pub use types::*;
pub use value::*;
