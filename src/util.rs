//! Byte-level helpers for the document loader: encoding resolution and sniffing.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use memchr::memmem;

use crate::error::{Error, Result};

/// Number of leading bytes inspected for declarations and binary markers.
///
/// Matches the HTML prescan window browsers use for `<meta charset>`.
const PRESCAN_LIMIT: usize = 1024;

/// Where the encoding used to decode a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    /// A byte order mark at the start of the input.
    ByteOrderMark,
    /// The label supplied by the caller.
    CallerHint,
    /// A `<meta>` or `<?xml?>` declaration inside the document.
    Declared,
    /// Nothing was declared; UTF-8 is assumed.
    Default,
}

/// Resolve the encoding of a document.
///
/// Order: BOM, caller hint, in-document declaration, UTF-8. A declared
/// UTF-16 label is read as UTF-8, since a document that can declare its own
/// encoding in ASCII is not UTF-16.
pub fn resolve_encoding(
    bytes: &[u8],
    hint: Option<&str>,
) -> Result<(&'static Encoding, EncodingSource)> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Ok((encoding, EncodingSource::ByteOrderMark));
    }

    if let Some(label) = hint {
        return Ok((lookup_encoding(label)?, EncodingSource::CallerHint));
    }

    let declared = extract_meta_charset(bytes).or_else(|| extract_xml_encoding(bytes));
    if let Some(label) = declared {
        let encoding = lookup_encoding(label)?;
        let encoding = if encoding == UTF_16LE || encoding == UTF_16BE {
            UTF_8
        } else {
            encoding
        };
        return Ok((encoding, EncodingSource::Declared));
    }

    Ok((UTF_8, EncodingSource::Default))
}

fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) if encoding != encoding_rs::REPLACEMENT => Ok(encoding),
        _ => Err(Error::UnsupportedEncoding(label.trim().to_string())),
    }
}

/// Decode bytes strictly with the given encoding.
///
/// A matching BOM is stripped. If the bytes are malformed for a non-UTF-8
/// encoding, UTF-8 is tried once; there is no further guessing.
pub fn decode_text<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Result<Cow<'a, str>> {
    if let Some(text) = decode_strict(bytes, encoding) {
        return Ok(text);
    }

    if encoding != UTF_8
        && let Some(text) = decode_strict(bytes, UTF_8)
    {
        tracing::warn!(
            declared = encoding.name(),
            "input is not valid in its declared encoding, decoded as UTF-8"
        );
        return Ok(text);
    }

    Err(Error::UnsupportedEncoding(format!(
        "input is not valid {}",
        encoding.name()
    )))
}

fn decode_strict<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    let offset = match Encoding::for_bom(bytes) {
        Some((bom_encoding, len)) if bom_encoding == encoding => len,
        _ => 0,
    };
    encoding.decode_without_bom_handling_and_without_replacement(&bytes[offset..])
}

/// Check for NUL bytes in the prescan window, the cheapest tell of binary data.
///
/// Callers must skip this for UTF-16 input, where NULs are legitimate.
pub fn looks_binary(bytes: &[u8]) -> bool {
    let prefix = &bytes[..bytes.len().min(PRESCAN_LIMIT)];
    memchr::memchr(0, prefix).is_some()
}

/// Check whether decoded text contains anything shaped like markup.
///
/// A tag opener is `<` followed by a letter, `/`, `!` or `?`.
pub fn has_tag_structure(text: &str) -> bool {
    let bytes = text.as_bytes();
    memchr::memchr_iter(b'<', bytes).any(|pos| {
        bytes
            .get(pos + 1)
            .is_some_and(|&next| next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?'))
    })
}

/// Extract the charset from a `<meta>` element in the prescan window.
///
/// Handles both `<meta charset="...">` and
/// `<meta http-equiv="Content-Type" content="text/html; charset=...">`.
pub fn extract_meta_charset(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(PRESCAN_LIMIT)];
    // ASCII lowercasing keeps byte offsets, so positions map back onto `prefix`.
    let lower = prefix.to_ascii_lowercase();

    for start in memmem::find_iter(&lower, b"<meta") {
        let tag_len = memchr::memchr(b'>', &lower[start..]).unwrap_or(lower.len() - start);
        let tag = &lower[start..start + tag_len];

        let Some(charset_pos) = memmem::find(tag, b"charset") else {
            continue;
        };
        let mut i = start + charset_pos + b"charset".len();

        while lower.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
            i += 1;
        }
        if lower.get(i) != Some(&b'=') {
            continue;
        }
        i += 1;
        while lower.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
            i += 1;
        }

        let quote = match lower.get(i) {
            Some(&q @ (b'"' | b'\'')) => {
                i += 1;
                Some(q)
            }
            _ => None,
        };
        let value_start = i;
        while let Some(&b) = lower.get(i) {
            let at_end = match quote {
                Some(q) => b == q,
                None => b.is_ascii_whitespace() || matches!(b, b';' | b'"' | b'\'' | b'>' | b'/'),
            };
            if at_end {
                break;
            }
            i += 1;
        }

        if i > value_start {
            return std::str::from_utf8(&prefix[value_start..i]).ok();
        }
    }

    None
}

/// Extract encoding from an XML declaration (`<?xml ... encoding="..." ?>`).
///
/// Saved pages are sometimes serialized as XHTML and carry only this.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];

    let xml_start = memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let quote = *after_enc.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}
