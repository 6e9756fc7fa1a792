use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown module \"{0}\"")]
    UnknownModule(String),

    #[error("Module \"{0}\" is defined twice")]
    DuplicateModule(String),

    #[error("Node \"{name}\" is defined twice under {parent}")]
    DuplicateNode {
        parent: String,
        name:   String,
    },

    #[error("Invalid definition of \"{node}\": {msg}")]
    InvalidDefinition {
        node: String,
        msg:  String,
    },

    #[error("Node #{0} does not belong to this schema")]
    UnknownNode(usize),

    #[error("Schema document error: {0}")]
    Json(#[from] serde_json::Error),
}
