//! Structural translation between `anyxml` documents and JSON.
//!
//! Encoding: an element with child elements becomes an object keyed by child
//! tag (first occurrence wins the position); a tag that repeats among its
//! siblings becomes an array holding every sibling with that tag; an element
//! without child elements becomes a scalar sniffed from its trimmed text.
//! A lone child never becomes an array.
//!
//! Decoding: objects become child elements named after their members, array
//! items become `array-element` children, and scalars become text.

use std::collections::HashSet;
use std::io::Write;

use lazy_static::lazy_static;
use regex::Regex;
use yang_json_schema::{JsonValue, Namespace, XmlElement, XmlNode};

use crate::error::CodecError;
use crate::json::JsonWriter;

/// Tag given to elements created for JSON array items.
pub const ARRAY_ELEMENT: &str = "array-element";

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap();
}

/// Writes the JSON rendition of an anyxml value.
pub fn write_xml<W: Write>(out: &mut JsonWriter<W>, root: &XmlElement) -> Result<(), CodecError> {
    write_content(out, root)
}

fn write_content<W: Write>(out: &mut JsonWriter<W>, element: &XmlElement) -> Result<(), CodecError> {
    if element.child_elements().next().is_some() {
        write_object(out, element)
    } else {
        write_text(out, element)
    }
}

fn write_object<W: Write>(out: &mut JsonWriter<W>, parent: &XmlElement) -> Result<(), CodecError> {
    let children: Vec<&XmlElement> = parent.child_elements().collect();
    let mut seen = HashSet::new();

    out.begin_object()?;
    for (index, child) in children.iter().enumerate() {
        if !seen.insert(child.name.as_str()) {
            continue;
        }
        out.name(&child.name)?;
        if children[index + 1..].iter().any(|next| next.name == child.name) {
            out.begin_array()?;
            for item in children.iter().filter(|item| item.name == child.name) {
                write_content(out, item)?;
            }
            out.end_array()?;
        } else {
            write_content(out, child)?;
        }
    }
    out.end_object()?;
    Ok(())
}

fn write_text<W: Write>(out: &mut JsonWriter<W>, element: &XmlElement) -> Result<(), CodecError> {
    let text = element.text().unwrap_or_default();
    let text = text.trim();

    if NUMBER.is_match(text) {
        if !text.contains('.') {
            return Ok(match text.parse::<i64>() {
                Ok(number) => out.number(&number.to_string())?,
                Err(_) => out.string(text)?,
            });
        }
        if let Ok(number) = text.parse::<f64>() {
            if number.is_finite() {
                out.number(&format!("{:?}", number))?;
                return Ok(());
            }
        }
        out.string(text)?;
        return Ok(());
    }
    match text {
        "null"  => out.null()?,
        "true"  => out.boolean(true)?,
        "false" => out.boolean(false)?,
        other   => out.string(other)?,
    }
    Ok(())
}

/// Rebuilds an anyxml document from the JSON value of member `name`. The root
/// element carries `namespace`; nested elements carry none.
pub fn read_xml(name: &str, namespace: Namespace, value: &JsonValue) -> XmlElement {
    let mut root = XmlElement::new(name).with_namespace(namespace);
    read_into(&mut root, value);
    root
}

fn read_into(element: &mut XmlElement, value: &JsonValue) {
    match value {
        JsonValue::String(text) | JsonValue::Number(text) => element.children.push(XmlNode::Text(text.clone())),
        JsonValue::Bool(flag) => element.children.push(XmlNode::Text(flag.to_string())),
        JsonValue::Null => element.children.push(XmlNode::Text("null".to_owned())),
        JsonValue::Array(items) => {
            for item in items {
                let mut child = XmlElement::new(ARRAY_ELEMENT);
                read_into(&mut child, item);
                element.children.push(XmlNode::Element(child));
            }
        }
        JsonValue::Object(members) => {
            for (member, item) in members {
                let mut child = XmlElement::new(member);
                read_into(&mut child, item);
                element.children.push(XmlNode::Element(child));
            }
        }
    }
}
