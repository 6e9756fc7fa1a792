//! Schema-driven RFC 7951 JSON encoding and decoding of normalized YANG data
//! trees.
//!
//! The crate is layered bottom-up:
//!
//! - [codecs]: one value codec per resolved leaf type.
//! - [factory]: binds codecs to a schema snapshot and caches them.
//! - [stream]: the enter/scalar/end protocol every producer and consumer speaks.
//! - [builder] and [walker]: turn events into trees and trees into events.
//! - [encoder] and [decoder]: the JSON ends of the protocol.
//! - [normalizer]: datastore, data resource and child resource bodies.
//!
//! ```
//! use yang_json_codec::*;
//! use yang_json_schema::*;
//!
//! let context = SchemaDocument::new(vec![Module::new("ex", "urn:ex", "ex")])
//!     .node(NodeDef::container("system").in_module("ex").child(NodeDef::leaf("hostname", TypeDefinition::string())))
//!     .build()
//!     .unwrap();
//! let codecs = JsonCodecFactory::lazy(context, IidDialect::Rfc7951);
//!
//! let text = r#"{"ex:system":{"hostname":"r1"}}"#;
//! let result = JsonDecoder::new(&codecs).normalize(text).unwrap();
//!
//! let mut out = JsonWriter::new(Vec::new());
//! let mut encoder = JsonEncoder::exclusive(&mut out, &codecs);
//! NormalizedNodeWriter::new(&mut encoder).write_result(&result).unwrap();
//! encoder.finish().unwrap();
//! assert_eq!(String::from_utf8(out.into_inner()).unwrap(), text);
//! ```

pub mod anyxml;
pub mod builder;
pub mod codecs;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod factory;
pub mod json;
pub mod normalizer;
pub mod options;
pub mod stream;
pub mod walker;

pub use builder::{TreeBuilder, ValueInterner};
pub use codecs::{JsonCodec, JsonScalar};
pub use decoder::JsonDecoder;
pub use encoder::JsonEncoder;
pub use error::{CodecError, ValueError};
pub use factory::{
    factory_for, CodecCache, CodecCacheRegistry, CodecProvider, EagerCache, JsonCodecFactory, LazyCache, NoCache,
    SharedCache,
};
pub use json::{parse_reader, parse_str, JsonWriter};
pub use normalizer::ChildData;
pub use options::{CachePolicy, CodecOptions, IidDialect};
pub use stream::{NodeKind, NormalizedNodeStreamWriter, ProtocolTracker, Scalar};
pub use walker::NormalizedNodeWriter;
