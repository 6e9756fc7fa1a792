use thiserror::Error;
use yang_json_schema::{SchemaError, ValueKind};

/// Everything that can make an encode or decode call fail. Any error aborts
/// the whole call; there are no partial results.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at line {line}, column {column}: {msg}")]
    Syntax {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Schema mismatch at {node}: {msg}")]
    SchemaMismatch {
        node: String,
        msg:  String,
    },

    #[error("Duplicate \"{node}\" in {parent}")]
    Duplicate {
        node:   String,
        parent: String,
    },

    #[error("Invalid value {input:?} for {node}: {source}")]
    Value {
        node:   String,
        input:  String,
        source: ValueError,
    },

    /// Misuse of the enter/scalar/end protocol by a producer. This is a
    /// programming error, not bad input data.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A request body has the wrong shape for its entry point: a different
    /// root element, or not exactly one child resource.
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Resource exhaustion: {0}")]
    ResourceExhaustion(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl CodecError {
    pub(crate) fn mismatch(node: impl ToString, msg: impl Into<String>) -> CodecError {
        CodecError::SchemaMismatch { node: node.to_string(), msg: msg.into() }
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> CodecError {
        CodecError::ProtocolViolation(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> CodecError {
        CodecError::Malformed(msg.into())
    }
}

/// A scalar failed validation against its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("\"{text}\" is not a valid {expected}")]
    Lexical {
        text:     String,
        expected: String,
    },

    #[error("{value} is out of range for {type_name}")]
    OutOfRange {
        value:     String,
        type_name: String,
    },

    #[error("length {0} is not allowed")]
    Length(u64),

    #[error("\"{text}\" does not match pattern \"{pattern}\"")]
    Pattern {
        text:    String,
        pattern: String,
    },

    #[error("unknown enum \"{0}\"")]
    UnknownEnum(String),

    #[error("unknown bit \"{0}\"")]
    UnknownBit(String),

    #[error("bit \"{0}\" is set twice")]
    DuplicateBit(String),

    #[error("unknown identity \"{0}\"")]
    UnknownIdentity(String),

    #[error("identity {identity} is not derived from {base}")]
    NotDerived {
        identity: String,
        base:     String,
    },

    #[error("unknown module \"{0}\"")]
    UnknownModule(String),

    #[error("bad path \"{path}\": {msg}")]
    BadPath {
        path: String,
        msg:  String,
    },

    #[error("no union member can handle {0}")]
    NoApplicableCodec(String),

    #[error("expected a {expected} value, found {found}")]
    WrongKind {
        expected: String,
        found:    ValueKind,
    },

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ValueError {
    pub(crate) fn lexical(text: &str, expected: impl Into<String>) -> ValueError {
        ValueError::Lexical { text: text.to_owned(), expected: expected.into() }
    }

    pub(crate) fn out_of_range(value: impl ToString, type_name: &str) -> ValueError {
        ValueError::OutOfRange { value: value.to_string(), type_name: type_name.to_owned() }
    }

    pub(crate) fn wrong_kind(expected: impl ToString, found: ValueKind) -> ValueError {
        ValueError::WrongKind { expected: expected.to_string(), found }
    }
}
