//! RFC 7951 JSON encoder, driven by protocol events.
//!
//! Output is lazy: nothing is written for a node until its first descendant
//! produces a token, so empty non-presence containers and empty lists leave
//! no trace. Presence containers and list entries are always written.

use std::io::Write;
use std::sync::Arc;

use yang_json_schema::{AnydataValue, Namespace, NodeId, PathArgument, QName, SchemaContext, SchemaNodeKind, Value};

use crate::anyxml;
use crate::error::CodecError;
use crate::factory::CodecProvider;
use crate::json::JsonWriter;
use crate::stream::{NodeKind, NormalizedNodeStreamWriter, ProtocolTracker, Scalar};
use crate::walker::NormalizedNodeWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Object,
    Array,
    Scalar,
    /// Contributes no token of its own: choices and mount point roots.
    Transparent,
}

struct Frame {
    shape:         Shape,
    /// Member name written before the opening token; `None` inside arrays.
    member:        Option<String>,
    /// Namespace in effect for this frame's children.
    namespace:     Option<Namespace>,
    /// Schema node children are looked up under; `None` for a schema root.
    schema:        Option<NodeId>,
    emitted:       bool,
    emit_if_empty: bool,
    mount_root:    bool,
}

/// Writes protocol events as RFC 7951 JSON into a [JsonWriter].
///
/// An exclusive encoder owns the enclosing `{ }`; a nested encoder writes
/// members into an object the caller has already opened.
pub struct JsonEncoder<'a, W: Write> {
    out:       &'a mut JsonWriter<W>,
    providers: Vec<Box<dyn CodecProvider + 'a>>,
    frames:    Vec<Frame>,
    tracker:   ProtocolTracker,
}

impl<'a, W: Write> JsonEncoder<'a, W> {
    pub fn exclusive(out: &'a mut JsonWriter<W>, codecs: impl CodecProvider + 'a) -> JsonEncoder<'a, W> {
        JsonEncoder::with_root(out, Box::new(codecs), Shape::Object)
    }

    pub fn nested(out: &'a mut JsonWriter<W>, codecs: impl CodecProvider + 'a) -> JsonEncoder<'a, W> {
        JsonEncoder::with_root(out, Box::new(codecs), Shape::Transparent)
    }

    fn with_root(out: &'a mut JsonWriter<W>, codecs: Box<dyn CodecProvider + 'a>, shape: Shape) -> JsonEncoder<'a, W> {
        let root = Frame {
            shape,
            member: None,
            namespace: None,
            schema: None,
            emitted: shape == Shape::Transparent,
            emit_if_empty: true,
            mount_root: false,
        };
        JsonEncoder { out, providers: vec![codecs], frames: vec![root], tracker: ProtocolTracker::new() }
    }

    /// Treats `namespace` as already in effect at the top level, so members
    /// of that module are written without a prefix.
    pub fn with_initial_namespace(mut self, namespace: Namespace) -> JsonEncoder<'a, W> {
        if let Some(root) = self.frames.first_mut() {
            root.namespace = Some(namespace);
        }
        self
    }

    /// Completes the output. An exclusive encoder writes `{}` even when
    /// nothing else was emitted.
    pub fn finish(mut self) -> Result<(), CodecError> {
        self.tracker.finish()?;
        if self.frames.len() != 1 {
            return Err(CodecError::protocol("encoder finished inside an open node"));
        }
        self.open_frames(1)?;
        if let Some(root) = self.frames.pop() {
            close(&mut *self.out, root.shape)?;
        }
        Ok(())
    }

    fn codecs(&self) -> Result<&dyn CodecProvider, CodecError> {
        self.providers
            .last()
            .map(|provider| provider.as_ref())
            .ok_or_else(|| CodecError::protocol("no codec factory in scope"))
    }

    fn context(&self) -> Result<Arc<SchemaContext>, CodecError> {
        Ok(self.codecs()?.context().clone())
    }

    fn top(&self) -> Result<&Frame, CodecError> {
        self.frames.last().ok_or_else(|| CodecError::protocol("encoder is closed"))
    }

    /// Writes the opening tokens of every frame below `upto` that has not
    /// been written yet, outermost first.
    fn open_frames(&mut self, upto: usize) -> Result<(), CodecError> {
        for frame in self.frames[..upto].iter_mut().filter(|frame| !frame.emitted) {
            if let Some(member) = &frame.member {
                self.out.name(member)?;
            }
            match frame.shape {
                Shape::Object => self.out.begin_object()?,
                Shape::Array => self.out.begin_array()?,
                Shape::Scalar | Shape::Transparent => {}
            }
            frame.emitted = true;
        }
        Ok(())
    }

    fn member_name(&self, context: &SchemaContext, parent_namespace: Option<&Namespace>, name: &QName) -> Result<String, CodecError> {
        if parent_namespace == Some(name.namespace()) {
            return Ok(name.local_name().to_owned());
        }
        let module = context
            .module_by_namespace(name.namespace())
            .ok_or_else(|| CodecError::mismatch(name, "namespace belongs to no known module"))?;
        Ok(format!("{}:{}", module.name, name.local_name()))
    }

    fn push_frame(&mut self, kind: NodeKind, id: &PathArgument) -> Result<(), CodecError> {
        let context = self.context()?;
        let parent = self.top()?;
        let name = id.name();

        if matches!(kind, NodeKind::ListEntry | NodeKind::LeafListEntry) {
            let frame = Frame {
                shape:         if kind == NodeKind::ListEntry { Shape::Object } else { Shape::Scalar },
                member:        None,
                namespace:     parent.namespace.clone(),
                schema:        parent.schema,
                emitted:       false,
                emit_if_empty: true,
                mount_root:    false,
            };
            self.frames.push(frame);
            return Ok(());
        }

        let schema = if kind == NodeKind::Choice {
            find_choice(&context, parent.schema, name)
        } else {
            context.find_data_child(parent.schema, name).and_then(|path| path.last().copied())
        };
        let schema = schema.ok_or_else(|| CodecError::mismatch(name, "no such node in the schema"))?;
        check_kind(context.node(schema).kind(), kind, name)?;

        let frame = if kind == NodeKind::Choice {
            Frame {
                shape:         Shape::Transparent,
                member:        None,
                namespace:     parent.namespace.clone(),
                schema:        Some(schema),
                emitted:       false,
                emit_if_empty: false,
                mount_root:    false,
            }
        } else {
            let member = self.member_name(&context, parent.namespace.as_ref(), name)?;
            let (shape, emit_if_empty) = match kind {
                NodeKind::Container => (Shape::Object, context.node(schema).is_presence()),
                NodeKind::List | NodeKind::LeafList => (Shape::Array, false),
                _ => (Shape::Scalar, true),
            };
            Frame {
                shape,
                member: Some(member),
                namespace: Some(name.namespace().clone()),
                schema: Some(schema),
                emitted: false,
                emit_if_empty,
                mount_root: false,
            }
        };
        self.frames.push(frame);
        Ok(())
    }

    fn write_value(&mut self, schema: Option<NodeId>, value: &Value) -> Result<(), CodecError> {
        let schema = schema.ok_or_else(|| CodecError::protocol("value outside a leaf"))?;
        let codec = self.codecs()?.codec_for(schema)?;
        let json = codec.write(value).map_err(|source| CodecError::Value {
            node: self.context().map(|c| c.node(schema).qname().to_string()).unwrap_or_default(),
            input: format!("{:?}", value),
            source,
        })?;
        self.out.scalar(&json)?;
        Ok(())
    }

    fn write_anydata(&mut self, value: &AnydataValue, namespace: Option<Namespace>) -> Result<(), CodecError> {
        match value {
            AnydataValue::Json(json) => self.out.value(json)?,
            AnydataValue::Normalized(anydata) => {
                let codecs = self.codecs()?.rebase(anydata.context.clone());
                self.out.begin_object()?;
                let mut nested = JsonEncoder::nested(&mut *self.out, codecs);
                if let Some(namespace) = namespace {
                    nested = nested.with_initial_namespace(namespace);
                }
                let mut walker = NormalizedNodeWriter::new(&mut nested);
                walker.write_nodes(&anydata.data)?;
                nested.finish()?;
                self.out.end_object()?;
            }
        }
        Ok(())
    }
}

fn close<W: Write>(out: &mut JsonWriter<W>, shape: Shape) -> Result<(), CodecError> {
    match shape {
        Shape::Object => out.end_object()?,
        Shape::Array => out.end_array()?,
        Shape::Scalar | Shape::Transparent => {}
    }
    Ok(())
}

/// Finds the choice named `name` under `parent`, looking through enclosing
/// choice and case levels.
fn find_choice(context: &SchemaContext, parent: Option<NodeId>, name: &QName) -> Option<NodeId> {
    context.children_of(parent).iter().copied().find_map(|id| {
        let node = context.node(id);
        match node.kind() {
            SchemaNodeKind::Choice if node.qname() == name => Some(id),
            SchemaNodeKind::Choice | SchemaNodeKind::Case => find_choice(context, Some(id), name),
            _ => None,
        }
    })
}

fn check_kind(schema: &SchemaNodeKind, kind: NodeKind, name: &QName) -> Result<(), CodecError> {
    let fits = match kind {
        NodeKind::Container => matches!(schema, SchemaNodeKind::Container { .. }),
        NodeKind::Choice => matches!(schema, SchemaNodeKind::Choice),
        NodeKind::List => matches!(schema, SchemaNodeKind::List { .. }),
        NodeKind::LeafList => matches!(schema, SchemaNodeKind::LeafList { .. }),
        NodeKind::Leaf => matches!(schema, SchemaNodeKind::Leaf { .. }),
        NodeKind::Anydata => matches!(schema, SchemaNodeKind::Anydata),
        NodeKind::Anyxml => matches!(schema, SchemaNodeKind::Anyxml),
        NodeKind::ListEntry | NodeKind::LeafListEntry => true,
    };
    if fits {
        Ok(())
    } else {
        Err(CodecError::mismatch(name, format!("a {} does not match the schema node", kind)))
    }
}

impl<'a, W: Write> NormalizedNodeStreamWriter for JsonEncoder<'a, W> {
    fn enter(&mut self, kind: NodeKind, id: PathArgument, _size_hint: Option<usize>) -> Result<(), CodecError> {
        self.tracker.enter(kind, &id)?;
        self.push_frame(kind, &id)
    }

    fn scalar_value(&mut self, value: Scalar) -> Result<(), CodecError> {
        self.tracker.scalar(&value)?;
        let depth = self.frames.len();
        self.open_frames(depth - 1)?;

        let (member, schema) = {
            let frame = self.top()?;
            (frame.member.clone(), frame.schema)
        };
        if let Some(member) = &member {
            self.out.name(member)?;
        }
        match &value {
            Scalar::Value(value) => self.write_value(schema, value)?,
            Scalar::Anydata(anydata) => {
                let namespace = self.frames[..depth - 1].last().and_then(|parent| parent.namespace.clone());
                self.write_anydata(anydata, namespace)?
            }
            Scalar::Anyxml(element) => anyxml::write_xml(&mut *self.out, element)?,
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.emitted = true;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), CodecError> {
        self.tracker.end()?;
        let depth = self.frames.len();
        let top = self.top()?;
        if !top.emitted && top.emit_if_empty {
            self.open_frames(depth)?;
        }
        match self.frames.pop() {
            Some(frame) if frame.emitted => close(&mut *self.out, frame.shape),
            _ => Ok(()),
        }
    }

    fn start_mount_point(&mut self, label: &str, context: Arc<SchemaContext>) -> Result<(), CodecError> {
        self.tracker.start_mount(label)?;
        let namespace = self.top()?.namespace.clone();
        let codecs = self.codecs()?.rebase(context);
        self.providers.push(Box::new(codecs));
        self.frames.push(Frame {
            shape: Shape::Transparent,
            member: None,
            namespace,
            schema: None,
            emitted: false,
            emit_if_empty: false,
            mount_root: true,
        });
        Ok(())
    }

    fn end_mount_point(&mut self) -> Result<(), CodecError> {
        self.tracker.end_mount()?;
        match self.frames.pop() {
            Some(frame) if frame.mount_root => {
                self.providers.pop();
                Ok(())
            }
            _ => Err(CodecError::protocol("end_mount_point() without an open mount point")),
        }
    }
}
