use std::sync::Arc;

use yang_json_schema::{IdentityrefType, Namespace, NodeId, QName, SchemaContext, Value, ValueKind};

use super::JsonScalar;
use crate::error::ValueError;

/// Codec for `identityref`: `module-name:identity`, or a bare identity name
/// when the identity lives in the same module as the leaf.
#[derive(Debug, Clone)]
pub struct IdentityrefCodec {
    context: Arc<SchemaContext>,
    module:  Namespace,
    bases:   Vec<QName>,
}

impl IdentityrefCodec {
    /// `leaf` is the node whose values are written, `owner` the node that
    /// declares `type_def`. They differ when the type is reached through a
    /// leafref.
    pub fn new(
        context: &Arc<SchemaContext>,
        leaf: NodeId,
        owner: NodeId,
        type_def: &IdentityrefType,
    ) -> Result<IdentityrefCodec, ValueError> {
        let module = context.node(leaf).qname().namespace().clone();
        let owner_module = context.node(owner).qname().namespace();
        let mut bases = Vec::with_capacity(type_def.bases.len());
        for base in &type_def.bases {
            bases.push(resolve(context, owner_module, base)?);
        }
        Ok(IdentityrefCodec { context: context.clone(), module, bases })
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        let identity = resolve(&self.context, &self.module, text.trim())?;
        self.check(&identity)?;
        Ok(Value::Identityref(identity))
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        let identity = match value {
            Value::Identityref(identity) => identity,
            other => return Err(ValueError::wrong_kind(ValueKind::Identityref, other.kind())),
        };
        self.check(identity)?;
        if *identity.namespace() == self.module {
            return Ok(JsonScalar::String(identity.local_name().to_owned()));
        }
        let module = self
            .context
            .module_by_namespace(identity.namespace())
            .ok_or_else(|| ValueError::UnknownModule(identity.namespace().to_string()))?;
        Ok(JsonScalar::String(format!("{}:{}", module.name, identity.local_name())))
    }

    fn check(&self, identity: &QName) -> Result<(), ValueError> {
        if self.context.identity(identity).is_none() {
            return Err(ValueError::UnknownIdentity(identity.to_string()));
        }
        for base in &self.bases {
            if !self.context.is_derived_from(identity, base) {
                return Err(ValueError::NotDerived { identity: identity.to_string(), base: base.to_string() });
            }
        }
        Ok(())
    }
}

fn resolve(context: &SchemaContext, default_module: &Namespace, text: &str) -> Result<QName, ValueError> {
    match text.split_once(':') {
        Some((module, name)) => {
            let module = context
                .module_by_name(module)
                .ok_or_else(|| ValueError::UnknownModule(module.to_owned()))?;
            Ok(QName::new(module.namespace.clone(), name))
        }
        None => Ok(QName::new(default_module.clone(), text)),
    }
}
