//! Document loader: raw bytes to a read-only [`Document`] tree.
//!
//! Loading runs in four steps, failing early on input that is not HTML:
//!
//! 1. Reject empty input
//! 2. Resolve the encoding (BOM, caller hint, `<meta charset>`, UTF-8)
//! 3. Reject binary data and decode strictly
//! 4. Reject tagless text, then parse with html5ever's error recovery

mod arena;
mod tree_sink;

pub use arena::{Attribute, Children, Descendants, Document, Node, NodeData, NodeId};
pub use tree_sink::DocumentSink;

use encoding_rs::{UTF_16BE, UTF_16LE};
use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

pub use crate::util::EncodingSource;

use crate::error::{Error, Result};
use crate::util::{decode_text, has_tag_structure, looks_binary, resolve_encoding};

/// A parsed document together with how it was decoded.
pub struct LoadedDocument {
    pub document: Document,
    /// Name of the encoding used to decode the input.
    pub encoding: &'static str,
    pub encoding_source: EncodingSource,
    /// Parse errors html5ever recovered from.
    pub parse_errors: usize,
}

/// Load an HTML document from raw bytes.
///
/// `encoding_hint` is a label such as `"utf-8"` or `"windows-1252"` supplied
/// by the caller; it overrides in-document declarations but not a BOM.
///
/// # Errors
///
/// - [`Error::MalformedInput`] for empty, binary, or tagless input
/// - [`Error::UnsupportedEncoding`] for unknown labels or undecodable bytes
///
/// # Example
///
/// ```
/// use chatdown::dom::load;
///
/// let loaded = load(b"<p>Hello</p>", None).unwrap();
/// assert!(loaded.document.find_by_tag("p").is_some());
///
/// assert!(load(b"", None).is_err());
/// ```
pub fn load(bytes: &[u8], encoding_hint: Option<&str>) -> Result<LoadedDocument> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::MalformedInput("input is empty".to_string()));
    }

    let (encoding, encoding_source) = resolve_encoding(bytes, encoding_hint)?;

    let wide = encoding == UTF_16LE || encoding == UTF_16BE;
    if !wide && looks_binary(bytes) {
        return Err(Error::MalformedInput(
            "input contains binary data".to_string(),
        ));
    }

    let text = decode_text(bytes, encoding)?;
    if !has_tag_structure(&text) {
        return Err(Error::MalformedInput(
            "input has no HTML tag structure".to_string(),
        ));
    }

    let (document, parse_errors) = parse_html(&text);
    tracing::debug!(
        encoding = encoding.name(),
        source = ?encoding_source,
        nodes = document.len(),
        parse_errors,
        "loaded document"
    );

    Ok(LoadedDocument {
        document,
        encoding: encoding.name(),
        encoding_source,
        parse_errors,
    })
}

/// Parse already-decoded HTML into a [`Document`].
///
/// Never fails: unclosed tags, bad nesting and unknown elements are repaired
/// with the standard HTML tree construction rules.
pub fn parse_html(html: &str) -> (Document, usize) {
    parse_document(DocumentSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_parts()
}
