//! Maps HTML elements to the role they play during normalization.

use html5ever::LocalName;

use crate::model::MediaKind;

/// How the normalizer treats an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRole {
    /// Paragraph-like container; flushes the current paragraph around itself.
    Block,
    Heading(u8),
    Preformatted,
    List { ordered: bool },
    Quote,
    Table,
    Rule,
    Break,
    Media(MediaKind),
    Strong,
    Emphasis,
    Strike,
    Code,
    Link,
    /// Unknown or purely presentational; its text folds into the paragraph.
    Transparent,
}

/// Map an element name to its role.
pub fn element_role(local_name: &LocalName) -> ElementRole {
    match local_name.as_ref() {
        "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
        | "address" | "details" | "summary" | "figure" | "figcaption" | "caption" | "li"
        | "dl" | "dt" | "dd" | "tr" | "td" | "th" | "thead" | "tbody" | "tfoot" | "form"
        | "fieldset" | "legend" | "hgroup" | "center" | "body" => ElementRole::Block,

        "h1" => ElementRole::Heading(1),
        "h2" => ElementRole::Heading(2),
        "h3" => ElementRole::Heading(3),
        "h4" => ElementRole::Heading(4),
        "h5" => ElementRole::Heading(5),
        "h6" => ElementRole::Heading(6),

        "pre" | "listing" | "xmp" | "plaintext" => ElementRole::Preformatted,

        "ul" | "menu" => ElementRole::List { ordered: false },
        "ol" => ElementRole::List { ordered: true },

        "blockquote" => ElementRole::Quote,
        "table" => ElementRole::Table,
        "hr" => ElementRole::Rule,
        "br" => ElementRole::Break,

        "img" | "picture" => ElementRole::Media(MediaKind::Image),
        "video" => ElementRole::Media(MediaKind::Video),
        "audio" => ElementRole::Media(MediaKind::Audio),
        "iframe" | "embed" | "object" => ElementRole::Media(MediaKind::Embed),

        "strong" | "b" => ElementRole::Strong,
        "em" | "i" | "cite" | "dfn" | "var" => ElementRole::Emphasis,
        "del" | "s" | "strike" => ElementRole::Strike,
        "code" | "kbd" | "samp" | "tt" => ElementRole::Code,
        "a" => ElementRole::Link,

        _ => ElementRole::Transparent,
    }
}
