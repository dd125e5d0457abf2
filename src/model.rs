//! Conversation data model: turns, content blocks and the transcript.

use std::fmt;

use crate::dom::NodeId;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Speaker {
    User,
    Assistant,
    /// A boundary was found but no speaker marker was present.
    Unknown,
}

impl Speaker {
    /// Default label used in serialized transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
            Speaker::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The document nodes that belong to one turn.
///
/// Each root stands for its whole subtree. Roots are in document order and
/// no root is an ancestor of another, in this span or in any other turn's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSpan {
    roots: Vec<NodeId>,
}

impl ContentSpan {
    pub fn new(boundary: NodeId) -> Self {
        Self {
            roots: vec![boundary],
        }
    }

    pub(crate) fn push(&mut self, root: NodeId) {
        self.roots.push(root);
    }

    /// The boundary node that opened the turn.
    pub fn boundary(&self) -> NodeId {
        self.roots.first().copied().unwrap_or(NodeId::NONE)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
}

/// One extracted conversational turn, still referring into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    /// Position in document order, starting at 0.
    pub ordinal: usize,
    pub span: ContentSpan,
}

/// Kind of embedded media a placeholder stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Embed,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Embed => "embed",
        }
    }
}

/// A normalized unit of content inside a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Block {
    /// Plain text with whitespace collapsed. Explicit line breaks are `\n`.
    Paragraph { text: String },
    /// Text carrying resolved markdown markers for emphasis, links or code.
    Inline { text: String },
    /// Preformatted text, kept verbatim.
    Code {
        text: String,
        language: Option<String>,
    },
    /// List items, each flattened to one line plus indented continuation lines.
    List {
        ordered: bool,
        start: u32,
        items: Vec<String>,
    },
    /// Placeholder for an image or other embedded media.
    Media {
        kind: MediaKind,
        caption: Option<String>,
        /// Source URL, omitted for inline `data:` payloads.
        source: Option<String>,
    },
    Heading { level: u8, text: String },
    Quote { blocks: Vec<Block> },
    /// Table rows with each cell flattened to one line.
    Table { rows: Vec<Vec<String>> },
    Rule,
}

/// One speaker's normalized message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub speaker: Speaker,
    pub blocks: Vec<Block>,
}

/// The ordered conversation, ready for serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transcript {
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}
