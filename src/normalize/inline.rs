//! Paragraph text accumulation with lazily resolved inline markers.
//!
//! Whitespace is collapsed as text arrives: runs become one pending space that
//! is only written once the next visible character shows up, so paragraphs
//! never start or end with whitespace. Formatting frames record where their
//! content begins at the first visible character and wrap it when they close.
//! A frame that never sees visible text emits nothing, which keeps empty
//! `<b></b>` or icon-only links out of the output.

use crate::markdown::calculate_inline_code_ticks;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Strong,
    Emphasis,
    Strike,
    Code,
    Link { href: Option<String> },
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// Byte offset where this frame's content starts in the current paragraph.
    start: Option<usize>,
    /// Nested in a code span, so markers would show up literally.
    inert: bool,
    /// Whether any text was ever written under this frame.
    produced: bool,
}

/// Text of one paragraph under construction.
#[derive(Debug, Default)]
pub struct InlineBuffer {
    text: String,
    frames: Vec<Frame>,
    pending_space: bool,
    formatted: bool,
}

impl InlineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text, collapsing whitespace runs.
    pub fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
            } else {
                self.push_visible(c);
            }
        }
    }

    /// An explicit line break. Consecutive breaks collapse into one.
    pub fn line_break(&mut self) {
        self.pending_space = false;
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    pub fn open(&mut self, kind: FrameKind) {
        let inert = self
            .frames
            .iter()
            .any(|f| f.kind == FrameKind::Code && !f.inert);
        self.frames.push(Frame {
            kind,
            start: None,
            inert,
            produced: false,
        });
    }

    pub fn close(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };

        if let Some(start) = frame.start {
            self.wrap(&frame, start);
        } else if !frame.produced && !frame.inert {
            // A link with no text of its own still keeps its target
            if let FrameKind::Link { href: Some(href) } = &frame.kind {
                let href = href.clone();
                self.open(FrameKind::Link {
                    href: Some(href.clone()),
                });
                self.push_text(&href);
                if let Some(inner) = self.frames.pop()
                    && let Some(start) = inner.start
                {
                    self.wrap(&inner, start);
                }
            }
        }
    }

    /// Whether the paragraph has any visible text yet.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Finish the current paragraph and start a new one.
    ///
    /// Open frames are closed in the returned text and stay open for the
    /// next paragraph, where they restart at its first visible character.
    /// Returns the text and whether it carries markdown markers.
    pub fn take_paragraph(&mut self) -> Option<(String, bool)> {
        for i in (0..self.frames.len()).rev() {
            if let Some(start) = self.frames[i].start.take() {
                let frame = &self.frames[i];
                let (kind, inert) = (frame.kind.clone(), frame.inert);
                self.wrap_parts(&kind, inert, start);
            }
        }

        self.pending_space = false;
        let formatted = std::mem::take(&mut self.formatted);
        let mut text = std::mem::take(&mut self.text);
        let trimmed = text.trim_end_matches('\n').len();
        text.truncate(trimmed);

        if text.is_empty() {
            None
        } else {
            Some((text, formatted))
        }
    }

    fn push_visible(&mut self, c: char) {
        if self.pending_space && !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push(' ');
        }
        self.pending_space = false;

        let offset = self.text.len();
        for frame in &mut self.frames {
            if frame.start.is_none() {
                frame.start = Some(offset);
            }
            frame.produced = true;
        }
        self.text.push(c);
    }

    fn wrap(&mut self, frame: &Frame, start: usize) {
        self.wrap_parts(&frame.kind, frame.inert, start);
    }

    fn wrap_parts(&mut self, kind: &FrameKind, inert: bool, start: usize) {
        if inert || start >= self.text.len() {
            return;
        }

        let marker = match kind {
            FrameKind::Strong => "**",
            FrameKind::Emphasis => "*",
            FrameKind::Strike => "~~",
            FrameKind::Code => {
                let content = self.text.split_off(start);
                let ticks = "`".repeat(calculate_inline_code_ticks(&content));
                let pad = if content.starts_with('`') || content.ends_with('`') {
                    " "
                } else {
                    ""
                };
                self.text.push_str(&ticks);
                self.text.push_str(pad);
                self.text.push_str(&content);
                self.text.push_str(pad);
                self.text.push_str(&ticks);
                self.formatted = true;
                return;
            }
            FrameKind::Link { href: None } => return,
            FrameKind::Link { href: Some(href) } => {
                let label = self.text.split_off(start);
                self.text.push('[');
                self.text.push_str(&label);
                self.text.push_str("](");
                self.text.push_str(href);
                self.text.push(')');
                self.formatted = true;
                return;
            }
        };

        self.text.insert_str(start, marker);
        self.text.push_str(marker);
        self.formatted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish(buf: &mut InlineBuffer) -> String {
        buf.take_paragraph().map(|(t, _)| t).unwrap_or_default()
    }

    #[test]
    fn test_whitespace_collapse() {
        let mut buf = InlineBuffer::new();
        buf.push_text("  Hello \n\t ");
        buf.push_text("   world  ");
        let (text, formatted) = buf.take_paragraph().unwrap();
        assert_eq!(text, "Hello world");
        assert!(!formatted);
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let mut buf = InlineBuffer::new();
        buf.push_text(" \n ");
        assert_eq!(buf.take_paragraph(), None);
    }

    #[test]
    fn test_strong_and_emphasis() {
        let mut buf = InlineBuffer::new();
        buf.push_text("a ");
        buf.open(FrameKind::Strong);
        buf.push_text("bold");
        buf.close();
        buf.push_text(" and ");
        buf.open(FrameKind::Emphasis);
        buf.push_text(" it ");
        buf.close();
        buf.push_text("!");
        let (text, formatted) = buf.take_paragraph().unwrap();
        assert_eq!(text, "a **bold** and *it* !");
        assert!(formatted);
    }

    #[test]
    fn test_empty_frame_emits_nothing() {
        let mut buf = InlineBuffer::new();
        buf.push_text("x");
        buf.open(FrameKind::Strong);
        buf.push_text("   ");
        buf.close();
        buf.push_text("y");
        let (text, formatted) = buf.take_paragraph().unwrap();
        assert_eq!(text, "x y");
        assert!(!formatted);
    }

    #[test]
    fn test_inline_code_ticks() {
        let mut buf = InlineBuffer::new();
        buf.open(FrameKind::Code);
        buf.push_text("a`b");
        buf.close();
        assert_eq!(finish(&mut buf), "``a`b``");

        buf.open(FrameKind::Code);
        buf.push_text("`x");
        buf.close();
        assert_eq!(finish(&mut buf), "`` `x ``");
    }

    #[test]
    fn test_markers_inside_code_are_inert() {
        let mut buf = InlineBuffer::new();
        buf.open(FrameKind::Code);
        buf.open(FrameKind::Strong);
        buf.push_text("x");
        buf.close();
        buf.close();
        assert_eq!(finish(&mut buf), "`x`");
    }

    #[test]
    fn test_link() {
        let mut buf = InlineBuffer::new();
        buf.push_text("see ");
        buf.open(FrameKind::Link {
            href: Some("../docs/a b.html".to_string()),
        });
        buf.push_text("the docs");
        buf.close();
        assert_eq!(finish(&mut buf), "see [the docs](../docs/a b.html)");
    }

    #[test]
    fn test_link_without_text_keeps_href() {
        let mut buf = InlineBuffer::new();
        buf.open(FrameKind::Link {
            href: Some("https://example.com".to_string()),
        });
        buf.close();
        assert_eq!(
            finish(&mut buf),
            "[https://example.com](https://example.com)"
        );
    }

    #[test]
    fn test_anchor_without_href_is_plain() {
        let mut buf = InlineBuffer::new();
        buf.open(FrameKind::Link { href: None });
        buf.push_text("anchor");
        buf.close();
        let (text, formatted) = buf.take_paragraph().unwrap();
        assert_eq!(text, "anchor");
        assert!(!formatted);
    }

    #[test]
    fn test_frames_span_paragraphs() {
        let mut buf = InlineBuffer::new();
        buf.open(FrameKind::Strong);
        buf.push_text("one");
        assert_eq!(finish(&mut buf), "**one**");
        buf.push_text("two");
        buf.close();
        assert_eq!(finish(&mut buf), "**two**");
    }

    #[test]
    fn test_line_breaks() {
        let mut buf = InlineBuffer::new();
        buf.line_break();
        buf.push_text("a ");
        buf.line_break();
        buf.line_break();
        buf.push_text(" b");
        buf.line_break();
        assert_eq!(finish(&mut buf), "a\nb");
    }
}
