//! JSON token plumbing: a document reader built on serde_json and a
//! streaming token writer.

pub mod reader;
pub mod writer;

pub use reader::{parse_reader, parse_str};
pub use writer::JsonWriter;
