//! End-to-end conversion: export bytes in, transcript out.
//!
//! A [`Converter`] holds the boundary rules and the render configuration and
//! can be reused for any number of documents. Each call loads, extracts,
//! normalizes and renders one document; the parsed tree is dropped before
//! the call returns.

use crate::dom::{self, EncodingSource};
use crate::error::Result;
use crate::extract::{self, Extraction, SignatureRules};
use crate::markdown::{RenderConfig, render_transcript};
use crate::model::Transcript;
use crate::normalize;

/// The result of converting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub transcript: Transcript,
    /// The rendered markdown transcript.
    pub text: String,
    /// Name of the encoding the input was decoded with.
    pub encoding: &'static str,
    pub encoding_source: EncodingSource,
    /// Turns and the page chrome left out around them.
    ///
    /// Span node ids refer to the document, which is gone by the time the
    /// conversion is returned.
    pub extraction: Extraction,
    /// Markup errors the parser recovered from.
    pub parse_errors: usize,
}

impl Conversion {
    pub fn is_empty(&self) -> bool {
        self.extraction.is_empty()
    }

    /// Fail with [`Error::NoTurnsFound`](crate::Error::NoTurnsFound) when no
    /// turn was identified. The empty transcript is still available.
    pub fn ensure_turns(&self) -> Result<()> {
        self.extraction.ensure_turns()
    }
}

/// Reusable conversion pipeline.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    rules: SignatureRules,
    render: RenderConfig,
}

impl Converter {
    /// Create a converter with the Gemini rules and default rendering.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, rules: SignatureRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn rules(&self) -> &SignatureRules {
        &self.rules
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    /// Convert one saved export.
    ///
    /// Finding no turns is not an error here; call
    /// [`Conversion::ensure_turns`] to treat it as one.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedInput`](crate::Error::MalformedInput) when the
    ///   bytes are not HTML
    /// - [`Error::UnsupportedEncoding`](crate::Error::UnsupportedEncoding)
    ///   when they cannot be decoded
    pub fn convert(&self, bytes: &[u8], encoding_hint: Option<&str>) -> Result<Conversion> {
        let loaded = dom::load(bytes, encoding_hint)?;
        let doc = &loaded.document;

        let extraction = extract::extract_turns(doc, &self.rules);
        let transcript = normalize::normalize(doc, &extraction.turns, &self.rules);
        let text = render_transcript(&transcript, &self.render);

        tracing::debug!(
            turns = transcript.len(),
            skipped_leading = extraction.skipped_leading,
            skipped_outside = extraction.skipped_outside,
            bytes = text.len(),
            "converted document"
        );

        Ok(Conversion {
            transcript,
            text,
            encoding: loaded.encoding,
            encoding_source: loaded.encoding_source,
            extraction,
            parse_errors: loaded.parse_errors,
        })
    }
}

/// Convert a saved Gemini export with the default configuration.
///
/// # Example
///
/// ```
/// let html = br#"<div class="user">Hello</div><div class="model">Hi there</div>"#;
/// let conversion = chatdown::convert(html, None).unwrap();
/// assert_eq!(conversion.text, "User:\nHello\n\nAssistant:\nHi there");
/// ```
pub fn convert(bytes: &[u8], encoding_hint: Option<&str>) -> Result<Conversion> {
    Converter::default().convert(bytes, encoding_hint)
}
