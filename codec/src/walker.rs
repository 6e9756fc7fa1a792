use yang_json_schema::{
    NormalizationResult, NormalizedMetadata, NormalizedMountPoints, NormalizedNode, PathArgument,
};

use crate::error::CodecError;
use crate::stream::{NodeKind, NormalizedNodeStreamWriter, Scalar};

/// Replays existing trees as protocol events into a
/// [NormalizedNodeStreamWriter]. Used to feed the encoder and to copy trees
/// between builders.
pub struct NormalizedNodeWriter<W> {
    writer: W,
}

impl<W: NormalizedNodeStreamWriter> NormalizedNodeWriter<W> {
    pub fn new(writer: W) -> NormalizedNodeWriter<W> {
        NormalizedNodeWriter { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_node(&mut self, node: &NormalizedNode) -> Result<(), CodecError> {
        self.walk(node, None, None)
    }

    pub fn write_nodes(&mut self, nodes: &[NormalizedNode]) -> Result<(), CodecError> {
        for node in nodes {
            self.walk(node, None, None)?;
        }
        Ok(())
    }

    /// Writes the data of a result together with its metadata and mount
    /// points.
    pub fn write_result(&mut self, result: &NormalizationResult) -> Result<(), CodecError> {
        self.write_level(&result.data, result.metadata.as_ref(), result.mount_points.as_ref())
    }

    fn write_level(
        &mut self,
        nodes: &[NormalizedNode],
        metadata: Option<&NormalizedMetadata>,
        mounts: Option<&NormalizedMountPoints>,
    ) -> Result<(), CodecError> {
        if let Some(root) = metadata {
            if !root.annotations.is_empty() {
                self.writer.metadata(root.annotations.clone())?;
            }
        }
        for node in nodes {
            let id = node.identifier();
            self.walk(node, metadata.and_then(|m| m.child(&id)), mounts.and_then(|m| m.child(&id)))?;
        }
        Ok(())
    }

    fn walk(
        &mut self,
        node: &NormalizedNode,
        metadata: Option<&NormalizedMetadata>,
        mounts: Option<&NormalizedMountPoints>,
    ) -> Result<(), CodecError> {
        let (kind, scalar) = match node {
            NormalizedNode::Container { .. } => (NodeKind::Container, None),
            NormalizedNode::Choice { .. } => (NodeKind::Choice, None),
            NormalizedNode::List { .. } => (NodeKind::List, None),
            NormalizedNode::ListEntry { .. } => (NodeKind::ListEntry, None),
            NormalizedNode::LeafList { .. } => (NodeKind::LeafList, None),
            NormalizedNode::LeafListEntry { value, .. } => (NodeKind::LeafListEntry, Some(Scalar::Value((**value).clone()))),
            NormalizedNode::Leaf { value, .. } => (NodeKind::Leaf, Some(Scalar::Value((**value).clone()))),
            NormalizedNode::Anydata { value, .. } => (NodeKind::Anydata, Some(Scalar::Anydata(value.clone()))),
            NormalizedNode::Anyxml { value, .. } => (NodeKind::Anyxml, Some(Scalar::Anyxml(value.clone()))),
        };

        let children = node.children();
        self.writer.enter(kind, node.identifier(), Some(children.len()))?;
        if let Some(metadata) = metadata {
            if !metadata.annotations.is_empty() {
                self.writer.metadata(metadata.annotations.clone())?;
            }
        }
        if let Some(scalar) = scalar {
            self.writer.scalar_value(scalar)?;
        }
        for child in children {
            let id: PathArgument = child.identifier();
            self.walk(child, metadata.and_then(|m| m.child(&id)), mounts.and_then(|m| m.child(&id)))?;
        }
        if let Some(mount) = mounts.and_then(|m| m.mount_point.as_ref()) {
            self.writer.start_mount_point(&mount.label, mount.context.0.clone())?;
            self.write_level(&mount.data, mount.metadata.as_ref(), None)?;
            self.writer.end_mount_point()?;
        }
        self.writer.end()
    }
}
