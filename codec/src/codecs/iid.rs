use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use yang_json_schema::{
    InstanceIdentifier, Namespace, NodeId, PathArgument, QName, SchemaContext, SchemaNodeKind, Value, ValueKind,
};

use super::{JsonCodec, JsonScalar};
use crate::error::ValueError;
use crate::options::IidDialect;

lazy_static! {
    static ref NODE_IDENTIFIER: Regex = Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_.-]*:)?[A-Za-z_][A-Za-z0-9_.-]*$").unwrap();
}

/// Codec for `instance-identifier`: `/module:node/child[key='value']/...`.
///
/// Both dialects are accepted when parsing; the configured one decides
/// whether a module prefix is repeated on steps that stay in one module.
#[derive(Debug, Clone)]
pub struct InstanceIdentifierCodec {
    context: Arc<SchemaContext>,
    dialect: IidDialect,
}

struct Step<'a> {
    name:       &'a str,
    predicates: Vec<(&'a str, String)>,
}

impl InstanceIdentifierCodec {
    pub fn new(context: &Arc<SchemaContext>, dialect: IidDialect) -> InstanceIdentifierCodec {
        InstanceIdentifierCodec { context: context.clone(), dialect }
    }

    pub fn parse(&self, text: &str) -> Result<Value, ValueError> {
        let bad = |msg: &str| ValueError::BadPath { path: text.to_owned(), msg: msg.to_owned() };
        let steps = split_steps(text).map_err(|msg| bad(&msg))?;
        if steps.is_empty() {
            return Err(bad("empty path"));
        }

        let mut path = Vec::new();
        let mut parent: Option<NodeId> = None;
        let mut namespace: Option<Namespace> = None;
        for step in steps {
            let qname = self.step_name(step.name, namespace.as_ref()).map_err(|msg| bad(&msg))?;
            let found = self
                .context
                .find_data_child(parent, &qname)
                .and_then(|chain| chain.last().copied())
                .ok_or_else(|| bad(&format!("no schema node {}", qname)))?;
            let node = self.context.node(found);

            path.push(PathArgument::Node(qname.clone()));
            match node.kind() {
                SchemaNodeKind::List { keys, .. } if !step.predicates.is_empty() => {
                    let mut values = Vec::with_capacity(keys.len());
                    for key in keys {
                        let (_, text) = step
                            .predicates
                            .iter()
                            .find(|(name, _)| local_part(name) == key.local_name())
                            .ok_or_else(|| bad(&format!("missing key {}", key.local_name())))?;
                        let key_node = self
                            .context
                            .child(Some(found), key)
                            .ok_or_else(|| bad(&format!("no key leaf {}", key)))?;
                        values.push((key.clone(), self.parse_key(key_node, text)?));
                    }
                    if step.predicates.len() != keys.len() {
                        return Err(bad("predicate does not name a key"));
                    }
                    path.push(PathArgument::Entry { name: qname.clone(), keys: values });
                }
                SchemaNodeKind::LeafList { .. } if !step.predicates.is_empty() => {
                    let value = match step.predicates.as_slice() {
                        [(".", text)] => self.parse_key(found, text)?,
                        _ => return Err(bad("leaf-list predicates must be [.='value']")),
                    };
                    path.push(PathArgument::Value { name: qname.clone(), value });
                }
                _ if !step.predicates.is_empty() => return Err(bad("predicates on a node that is not a list")),
                _ => {}
            }
            namespace = Some(qname.namespace().clone());
            parent = Some(found);
        }
        Ok(Value::InstanceIdentifier(InstanceIdentifier(path)))
    }

    pub fn write(&self, value: &Value) -> Result<JsonScalar, ValueError> {
        let iid = match value {
            Value::InstanceIdentifier(iid) => iid,
            other => return Err(ValueError::wrong_kind(ValueKind::InstanceIdentifier, other.kind())),
        };
        let bad = |msg: String| ValueError::BadPath { path: format!("{:?}", iid), msg };

        let steps = iid.steps();
        let mut out = String::new();
        let mut parent: Option<NodeId> = None;
        let mut namespace: Option<&Namespace> = None;
        for (i, step) in steps.iter().enumerate() {
            let name = step.name();
            // A list or leaf-list step is folded into the entry step after it.
            if let (PathArgument::Node(_), Some(next)) = (step, steps.get(i + 1)) {
                if !matches!(next, PathArgument::Node(_)) && next.name() == name {
                    continue;
                }
            }
            let found = self
                .context
                .find_data_child(parent, name)
                .and_then(|chain| chain.last().copied())
                .ok_or_else(|| bad(format!("no schema node {}", name)))?;

            out.push('/');
            out.push_str(&self.step_text(name, namespace)?);
            match step {
                PathArgument::Node(_) => {}
                PathArgument::Entry { keys, .. } => {
                    for (key, key_value) in keys {
                        let key_node = self
                            .context
                            .child(Some(found), key)
                            .ok_or_else(|| bad(format!("no key leaf {}", key)))?;
                        let key_name = self.step_text(key, Some(name.namespace()))?;
                        out.push_str(&format!("[{}={}]", key_name, self.write_key(key_node, key_value)?));
                    }
                }
                PathArgument::Value { value, .. } => {
                    out.push_str(&format!("[.={}]", self.write_key(found, value)?));
                }
            }
            namespace = Some(name.namespace());
            parent = Some(found);
        }
        if out.is_empty() {
            return Err(bad("empty path".to_owned()));
        }
        Ok(JsonScalar::String(out))
    }

    fn step_name(&self, text: &str, inherited: Option<&Namespace>) -> Result<QName, String> {
        match text.split_once(':') {
            Some((module, local)) => {
                let module = self
                    .context
                    .module_by_name(module)
                    .ok_or_else(|| format!("unknown module {}", module))?;
                Ok(QName::new(module.namespace.clone(), local))
            }
            None => match inherited {
                Some(namespace) => Ok(QName::new(namespace.clone(), text)),
                None => Err("the first step needs a module prefix".to_owned()),
            },
        }
    }

    fn step_text(&self, name: &QName, previous: Option<&Namespace>) -> Result<String, ValueError> {
        if self.dialect == IidDialect::Rfc7951 && previous == Some(name.namespace()) {
            return Ok(name.local_name().to_owned());
        }
        let module = self
            .context
            .module_by_namespace(name.namespace())
            .ok_or_else(|| ValueError::UnknownModule(name.namespace().to_string()))?;
        Ok(format!("{}:{}", module.name, name.local_name()))
    }

    fn parse_key(&self, leaf: NodeId, text: &str) -> Result<Value, ValueError> {
        let codec = JsonCodec::build(&self.context, self.dialect, leaf)?;
        match codec.parse(text) {
            Err(_) if text.is_empty() => codec.parse_empty(),
            other => other,
        }
    }

    fn write_key(&self, leaf: NodeId, value: &Value) -> Result<String, ValueError> {
        let codec = JsonCodec::build(&self.context, self.dialect, leaf)?;
        let scalar = codec.write(value)?;
        let text = scalar.text();
        if !text.contains('\'') {
            Ok(format!("'{}'", text))
        } else if !text.contains('"') {
            Ok(format!("\"{}\"", text))
        } else {
            Err(ValueError::Unsupported(format!("key value {:?} mixes both quote characters", text)))
        }
    }
}

fn local_part(name: &str) -> &str {
    name.split_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Splits `/a:b/c[k='v'][.="w"]` into steps with raw predicate values.
fn split_steps(text: &str) -> Result<Vec<Step<'_>>, String> {
    let bytes = text.as_bytes();
    let mut steps = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'/' {
            return Err(format!("expected '/' at offset {}", pos));
        }
        pos += 1;
        let start = pos;
        while pos < bytes.len() && bytes[pos] != b'/' && bytes[pos] != b'[' {
            pos += 1;
        }
        let name = text[start..pos].trim();
        if !NODE_IDENTIFIER.is_match(name) {
            return Err(format!("bad step name {:?}", name));
        }

        let mut predicates = Vec::new();
        while pos < bytes.len() && bytes[pos] == b'[' {
            let close_eq = text[pos..].find('=').map(|i| pos + i).ok_or("predicate without '='")?;
            let key = text[pos + 1..close_eq].trim();
            if key.bytes().all(|b| b.is_ascii_digit()) {
                return Err("positional predicates are not supported".to_owned());
            }
            pos = close_eq + 1;
            while pos < bytes.len() && bytes[pos] == b' ' {
                pos += 1;
            }
            let quote = match bytes.get(pos) {
                Some(&q) if q == b'\'' || q == b'"' => q,
                _ => return Err("predicate value must be quoted".to_owned()),
            };
            let value_start = pos + 1;
            let value_end = text[value_start..]
                .find(quote as char)
                .map(|i| value_start + i)
                .ok_or("unterminated predicate value")?;
            pos = value_end + 1;
            while pos < bytes.len() && bytes[pos] == b' ' {
                pos += 1;
            }
            if bytes.get(pos) != Some(&b']') {
                return Err("expected ']'".to_owned());
            }
            pos += 1;
            predicates.push((key, text[value_start..value_end].to_owned()));
        }
        steps.push(Step { name, predicates });
    }
    Ok(steps)
}
