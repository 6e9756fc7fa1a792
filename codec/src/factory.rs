//! Codec factories bind the value codec layer to one schema snapshot and
//! decide how built codecs are remembered.
//!
//! | policy | type | thread safety |
//! |---|---|---|
//! | none | [JsonCodecFactory]`<`[NoCache]`>` | `Sync`, rebuilds every call |
//! | lazy | [JsonCodecFactory]`<`[LazyCache]`>` | single caller only |
//! | eager | [JsonCodecFactory]`<`[EagerCache]`>` | `Sync`, built up front |
//! | shared | [JsonCodecFactory]`<`[SharedCache]`>` | `Sync`, lives in a [CodecCacheRegistry] |

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, trace};
use yang_json_schema::{ContextId, NodeId, SchemaContext};

use crate::codecs::JsonCodec;
use crate::error::CodecError;
use crate::options::{CachePolicy, CodecOptions, IidDialect};

/// Storage for built codecs.
pub trait CodecCache {
    fn get(&self, node: NodeId) -> Option<Arc<JsonCodec>>;

    /// Offers a freshly built codec; returns the instance callers should use.
    fn put(&self, node: NodeId, codec: Arc<JsonCodec>) -> Arc<JsonCodec>;
}

#[derive(Debug, Default)]
pub struct NoCache;

impl CodecCache for NoCache {
    fn get(&self, _node: NodeId) -> Option<Arc<JsonCodec>> {
        None
    }

    fn put(&self, _node: NodeId, codec: Arc<JsonCodec>) -> Arc<JsonCodec> {
        codec
    }
}

/// Memoizes on first use. Not `Sync`: confine it to one caller.
#[derive(Debug, Default)]
pub struct LazyCache {
    codecs: RefCell<HashMap<NodeId, Arc<JsonCodec>>>,
}

impl CodecCache for LazyCache {
    fn get(&self, node: NodeId) -> Option<Arc<JsonCodec>> {
        self.codecs.borrow().get(&node).cloned()
    }

    fn put(&self, node: NodeId, codec: Arc<JsonCodec>) -> Arc<JsonCodec> {
        self.codecs.borrow_mut().entry(node).or_insert(codec).clone()
    }
}

/// Holds a codec for every leaf and leaf-list of the schema, built once.
#[derive(Debug, Default)]
pub struct EagerCache {
    codecs: HashMap<NodeId, Arc<JsonCodec>>,
}

impl CodecCache for EagerCache {
    fn get(&self, node: NodeId) -> Option<Arc<JsonCodec>> {
        self.codecs.get(&node).cloned()
    }

    fn put(&self, _node: NodeId, codec: Arc<JsonCodec>) -> Arc<JsonCodec> {
        codec
    }
}

#[derive(Debug)]
struct SharedCodecs {
    context: ContextId,
    codecs:  RwLock<HashMap<NodeId, Arc<JsonCodec>>>,
}

/// A thread-safe memoizing cache owned by a [CodecCacheRegistry].
#[derive(Debug, Clone)]
pub struct SharedCache {
    inner: Arc<SharedCodecs>,
}

impl SharedCache {
    pub fn context_id(&self) -> ContextId {
        self.inner.context
    }

    pub fn len(&self) -> usize {
        self.inner.codecs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CodecCache for SharedCache {
    fn get(&self, node: NodeId) -> Option<Arc<JsonCodec>> {
        self.inner.codecs.read().unwrap_or_else(PoisonError::into_inner).get(&node).cloned()
    }

    fn put(&self, node: NodeId, codec: Arc<JsonCodec>) -> Arc<JsonCodec> {
        let mut codecs = self.inner.codecs.write().unwrap_or_else(PoisonError::into_inner);
        codecs.entry(node).or_insert(codec).clone()
    }
}

/// Shared codec caches keyed by schema identity. A cache lives until its
/// schema is retired; factories already holding it keep it alive.
#[derive(Debug, Default)]
pub struct CodecCacheRegistry {
    caches: Mutex<HashMap<(ContextId, IidDialect), SharedCache>>,
}

impl CodecCacheRegistry {
    pub fn new() -> CodecCacheRegistry {
        CodecCacheRegistry::default()
    }

    pub fn cache_for(&self, context: &SchemaContext, dialect: IidDialect) -> SharedCache {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches
            .entry((context.id(), dialect))
            .or_insert_with(|| SharedCache {
                inner: Arc::new(SharedCodecs { context: context.id(), codecs: RwLock::new(HashMap::new()) }),
            })
            .clone()
    }

    /// Drops every cache of a schema that is no longer in use. Returns how
    /// many caches were removed.
    pub fn retire(&self, context: ContextId) -> usize {
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        let before = caches.len();
        caches.retain(|(id, _), _| *id != context);
        let removed = before - caches.len();
        debug!(context = %context, removed, "retired shared codec caches");
        removed
    }

    pub fn len(&self) -> usize {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What encoders and decoders need from a factory, independent of its cache.
pub trait CodecProvider {
    fn context(&self) -> &Arc<SchemaContext>;

    fn dialect(&self) -> IidDialect;

    /// The codec for a leaf or leaf-list schema node.
    fn codec_for(&self, node: NodeId) -> Result<Arc<JsonCodec>, CodecError>;

    /// An equivalent factory over another schema, for mount points and
    /// anydata payloads.
    fn rebase(&self, context: Arc<SchemaContext>) -> JsonCodecFactory<LazyCache> {
        JsonCodecFactory::lazy(context, self.dialect())
    }
}

impl<T: CodecProvider + ?Sized> CodecProvider for &T {
    fn context(&self) -> &Arc<SchemaContext> {
        (**self).context()
    }

    fn dialect(&self) -> IidDialect {
        (**self).dialect()
    }

    fn codec_for(&self, node: NodeId) -> Result<Arc<JsonCodec>, CodecError> {
        (**self).codec_for(node)
    }
}

impl<T: CodecProvider + ?Sized> CodecProvider for Box<T> {
    fn context(&self) -> &Arc<SchemaContext> {
        (**self).context()
    }

    fn dialect(&self) -> IidDialect {
        (**self).dialect()
    }

    fn codec_for(&self, node: NodeId) -> Result<Arc<JsonCodec>, CodecError> {
        (**self).codec_for(node)
    }
}

/// Builds and caches value codecs for one schema snapshot.
#[derive(Debug)]
pub struct JsonCodecFactory<C: CodecCache = LazyCache> {
    context: Arc<SchemaContext>,
    dialect: IidDialect,
    cache:   C,
}

impl JsonCodecFactory<NoCache> {
    pub fn uncached(context: Arc<SchemaContext>, dialect: IidDialect) -> JsonCodecFactory<NoCache> {
        JsonCodecFactory { context, dialect, cache: NoCache }
    }
}

impl JsonCodecFactory<LazyCache> {
    pub fn lazy(context: Arc<SchemaContext>, dialect: IidDialect) -> JsonCodecFactory<LazyCache> {
        JsonCodecFactory { context, dialect, cache: LazyCache::default() }
    }
}

impl JsonCodecFactory<EagerCache> {
    /// Walks the whole schema and builds every codec up front. Fails on the
    /// first leaf whose type cannot be handled.
    pub fn eager(context: Arc<SchemaContext>, dialect: IidDialect) -> Result<JsonCodecFactory<EagerCache>, CodecError> {
        let mut codecs = HashMap::new();
        for node in context.nodes() {
            if node.type_def().is_some() {
                let codec = build(&context, dialect, node.id())?;
                codecs.insert(node.id(), codec);
            }
        }
        debug!(context = %context.id(), codecs = codecs.len(), "precomputed codecs");
        Ok(JsonCodecFactory { context, dialect, cache: EagerCache { codecs } })
    }
}

impl JsonCodecFactory<SharedCache> {
    pub fn shared(
        registry: &CodecCacheRegistry,
        context: Arc<SchemaContext>,
        dialect: IidDialect,
    ) -> JsonCodecFactory<SharedCache> {
        let cache = registry.cache_for(&context, dialect);
        JsonCodecFactory { context, dialect, cache }
    }
}

impl<C: CodecCache> JsonCodecFactory<C> {
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<C: CodecCache> CodecProvider for JsonCodecFactory<C> {
    fn context(&self) -> &Arc<SchemaContext> {
        &self.context
    }

    fn dialect(&self) -> IidDialect {
        self.dialect
    }

    fn codec_for(&self, node: NodeId) -> Result<Arc<JsonCodec>, CodecError> {
        if let Some(codec) = self.cache.get(node) {
            return Ok(codec);
        }
        let codec = build(&self.context, self.dialect, node)?;
        Ok(self.cache.put(node, codec))
    }
}

fn build(context: &Arc<SchemaContext>, dialect: IidDialect, node: NodeId) -> Result<Arc<JsonCodec>, CodecError> {
    let schema = context.node(node);
    if schema.type_def().is_none() {
        return Err(CodecError::mismatch(schema.qname(), "only leaves and leaf-lists have value codecs"));
    }
    let codec = JsonCodec::build(context, dialect, node).map_err(|source| CodecError::Value {
        node:  schema.qname().to_string(),
        input: format!("{:?}", schema.type_def()),
        source,
    })?;
    trace!(node = %schema.qname(), "created codec");
    Ok(Arc::new(codec))
}

/// Picks the factory named by `options.cache`.
pub fn factory_for(
    context: Arc<SchemaContext>,
    options: &CodecOptions,
    registry: &CodecCacheRegistry,
) -> Result<Box<dyn CodecProvider>, CodecError> {
    Ok(match options.cache {
        CachePolicy::None   => Box::new(JsonCodecFactory::uncached(context, options.dialect)),
        CachePolicy::Lazy   => Box::new(JsonCodecFactory::lazy(context, options.dialect)),
        CachePolicy::Eager  => Box::new(JsonCodecFactory::eager(context, options.dialect)?),
        CachePolicy::Shared => Box::new(JsonCodecFactory::shared(registry, context, options.dialect)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use yang_json_schema::*;

    fn context() -> Arc<SchemaContext> {
        SchemaDocument::new(vec![Module::new("m", "urn:m", "m")])
            .node(
                NodeDef::container("c")
                    .in_module("m")
                    .child(NodeDef::leaf("a", TypeDefinition::integer(IntegerKind::Int32)))
                    .child(NodeDef::leaf_list("b", TypeDefinition::string())),
            )
            .build()
            .unwrap()
    }

    fn leaf(ctx: &SchemaContext, name: &str) -> NodeId {
        let c = ctx.roots()[0];
        ctx.child(Some(c), &QName::new("urn:m", name)).unwrap()
    }

    fn assert_sync<T: Sync + Send>() {}

    #[test]
    fn thread_safe_policies_are_sync() {
        assert_sync::<JsonCodecFactory<NoCache>>();
        assert_sync::<JsonCodecFactory<EagerCache>>();
        assert_sync::<JsonCodecFactory<SharedCache>>();
        assert_sync::<CodecCacheRegistry>();
    }

    #[test]
    fn lazy_memoizes_and_none_does_not() {
        let ctx = context();
        let a = leaf(&ctx, "a");

        let lazy = JsonCodecFactory::lazy(ctx.clone(), IidDialect::Rfc7951);
        assert!(Arc::ptr_eq(&lazy.codec_for(a).unwrap(), &lazy.codec_for(a).unwrap()));

        let none = JsonCodecFactory::uncached(ctx, IidDialect::Rfc7951);
        assert!(!Arc::ptr_eq(&none.codec_for(a).unwrap(), &none.codec_for(a).unwrap()));
    }

    #[test]
    fn eager_builds_everything_up_front() {
        let ctx = context();
        let eager = JsonCodecFactory::eager(ctx.clone(), IidDialect::Rfc7951).unwrap();
        assert!(eager.cache().get(leaf(&ctx, "a")).is_some());
        assert!(eager.cache().get(leaf(&ctx, "b")).is_some());
        assert!(eager.cache().get(ctx.roots()[0]).is_none());
    }

    #[test]
    fn non_leaf_has_no_codec() {
        let ctx = context();
        let factory = JsonCodecFactory::lazy(ctx.clone(), IidDialect::Rfc7951);
        assert!(matches!(factory.codec_for(ctx.roots()[0]), Err(CodecError::SchemaMismatch { .. })));
    }

    #[test]
    fn shared_caches_are_reused_until_retired() {
        let ctx = context();
        let a = leaf(&ctx, "a");
        let registry = CodecCacheRegistry::new();

        let first = JsonCodecFactory::shared(&registry, ctx.clone(), IidDialect::Rfc7951);
        let codec = first.codec_for(a).unwrap();
        let second = JsonCodecFactory::shared(&registry, ctx.clone(), IidDialect::Rfc7951);
        assert!(Arc::ptr_eq(&codec, &second.codec_for(a).unwrap()));
        assert_eq!(registry.len(), 1);

        let _other_dialect = JsonCodecFactory::shared(&registry, ctx.clone(), IidDialect::Lhotka02);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.retire(ctx.id()), 2);
        assert!(registry.is_empty());
        // Existing factories keep working with their own handle.
        assert!(Arc::ptr_eq(&codec, &first.codec_for(a).unwrap()));

        let fresh = JsonCodecFactory::shared(&registry, ctx, IidDialect::Rfc7951);
        assert!(fresh.cache().is_empty());
    }

    #[test]
    fn rebase_switches_schema() {
        let ctx = context();
        let other = context();
        let factory = JsonCodecFactory::eager(ctx, IidDialect::Lhotka02).unwrap();
        let rebased = factory.rebase(other.clone());
        assert_eq!(rebased.context().id(), other.id());
        assert_eq!(rebased.dialect(), IidDialect::Lhotka02);
        assert!(rebased.codec_for(leaf(&other, "a")).is_ok());
    }

    #[test]
    fn factory_for_options() {
        let registry = CodecCacheRegistry::new();
        for cache in [CachePolicy::None, CachePolicy::Lazy, CachePolicy::Eager, CachePolicy::Shared] {
            let options = CodecOptions { cache, ..CodecOptions::default() };
            let ctx = context();
            let provider = factory_for(ctx.clone(), &options, &registry).unwrap();
            assert!(provider.codec_for(leaf(&ctx, "b")).is_ok());
        }
        assert_eq!(registry.len(), 1);
    }
}
