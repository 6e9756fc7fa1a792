//! yang-json
//!
//! Runtime support for moving YANG-modeled data between RFC 7951 JSON and
//! normalized data trees.
//!
//! - Schema model, values and trees (re-exported from `yang-json-schema`)
//! - Encoder, decoder and codec factories (re-exported from `yang-json-codec`)
//! - One-call helpers driven by [CodecOptions]
//!
//! ```
//! use yang_json::*;
//!
//! let context = SchemaDocument::new(vec![Module::new("ex", "urn:ex", "ex")])
//!     .node(NodeDef::container("system").in_module("ex").child(NodeDef::leaf("hostname", TypeDefinition::string())))
//!     .build()
//!     .unwrap();
//! let options = CodecOptions::default();
//!
//! let result = from_json_str(&context, r#"{"ex:system": {"hostname": "r1"}}"#, &options).unwrap();
//! assert_eq!(to_json_string(&context, &result, &options).unwrap(), r#"{"ex:system":{"hostname":"r1"}}"#);
//! ```

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use tracing::debug;

pub use yang_json_codec::{
    CachePolicy, CodecCacheRegistry, CodecError, CodecOptions, CodecProvider, IidDialect, JsonCodecFactory,
    JsonDecoder, JsonEncoder, JsonWriter, NodeKind, NormalizedNodeStreamWriter, NormalizedNodeWriter, Scalar,
    TreeBuilder, ValueError,
};
pub use yang_json_schema::*;

lazy_static! {
    static ref REGISTRY: CodecCacheRegistry = CodecCacheRegistry::new();
}

/// The process-wide registry behind [CachePolicy::Shared].
pub fn registry() -> &'static CodecCacheRegistry {
    &REGISTRY
}

/// Loads a JSON schema document from disk.
pub fn load_schema(path: &Path) -> Result<Arc<SchemaContext>, CodecError> {
    let text = fs::read_to_string(path)?;
    let context = SchemaContext::from_json(&text)?;
    debug!(path = %path.display(), modules = context.modules().len(), "loaded schema");
    Ok(context)
}

/// The codec factory selected by `options.cache`. Shared caches come from
/// [registry].
pub fn codec_provider(context: Arc<SchemaContext>, options: &CodecOptions) -> Result<Box<dyn CodecProvider>, CodecError> {
    yang_json_codec::factory_for(context, options, &REGISTRY)
}

/// Drops the shared codec caches of a schema that is no longer used.
pub fn retire_schema(context: &SchemaContext) -> usize {
    REGISTRY.retire(context.id())
}

/// Decodes an RFC 7951 document into a normalized tree.
pub fn from_json_str(
    context: &Arc<SchemaContext>,
    text: &str,
    options: &CodecOptions,
) -> Result<NormalizationResult, CodecError> {
    let codecs = codec_provider(context.clone(), options)?;
    JsonDecoder::new(&codecs)
        .lenient(options.lenient)
        .intern_values(options.intern_values)
        .normalize(text)
}

/// Decodes an RFC 7951 document read from `reader`.
pub fn from_json_reader<R: io::Read>(
    context: &Arc<SchemaContext>,
    reader: R,
    options: &CodecOptions,
) -> Result<NormalizationResult, CodecError> {
    let codecs = codec_provider(context.clone(), options)?;
    JsonDecoder::new(&codecs)
        .lenient(options.lenient)
        .intern_values(options.intern_values)
        .normalize_reader(reader)
}

/// Writes a normalized tree as an RFC 7951 document.
pub fn to_json_writer<W: io::Write>(
    context: &Arc<SchemaContext>,
    result: &NormalizationResult,
    options: &CodecOptions,
    out: W,
) -> Result<W, CodecError> {
    let codecs = codec_provider(context.clone(), options)?;
    let mut out = if options.pretty { JsonWriter::pretty(out) } else { JsonWriter::new(out) };
    let mut encoder = JsonEncoder::exclusive(&mut out, &codecs);
    NormalizedNodeWriter::new(&mut encoder).write_result(result)?;
    encoder.finish()?;
    Ok(out.into_inner())
}

/// Encodes a normalized tree into an RFC 7951 string.
pub fn to_json_string(
    context: &Arc<SchemaContext>,
    result: &NormalizationResult,
    options: &CodecOptions,
) -> Result<String, CodecError> {
    let bytes = to_json_writer(context, result, options, Vec::new())?;
    String::from_utf8(bytes).map_err(|e| CodecError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

pub mod error {
    pub use yang_json_codec::error::{CodecError, ValueError};
    pub use yang_json_schema::SchemaError;
}

pub mod codec {
    pub use yang_json_codec::*;
}

pub mod schema {
    pub use yang_json_schema::*;
}
