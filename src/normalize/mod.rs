//! Content normalizer: a turn's subtrees to an ordered list of [`Block`]s.
//!
//! Each turn gets its own `BlockBuilder`, so no paragraph or marker state
//! leaks from one message into the next. The builder walks with an explicit
//! stack of enter/exit steps. Lists, quotes and tables are normalized by
//! nested builders, which bounds recursion by structural nesting rather than
//! by raw element depth.

mod inline;
mod role;

pub use role::{ElementRole, element_role};

use std::iter;

use crate::dom::{Document, NodeData, NodeId};
use crate::extract::{NoiseRules, SignatureRules};
use crate::markdown::block_lines;
use crate::model::{Block, MediaKind, Message, Transcript, Turn};

use inline::{FrameKind, InlineBuffer};

/// Nested lists, quotes and tables beyond this depth become plain text.
pub const MAX_NESTING: usize = 64;

/// Normalize every turn into a [`Transcript`], keeping turn order.
pub fn normalize(doc: &Document, turns: &[Turn], rules: &SignatureRules) -> Transcript {
    let messages = turns
        .iter()
        .map(|turn| normalize_turn(doc, turn, rules))
        .collect();
    Transcript::new(messages)
}

/// Normalize one turn's content span into a [`Message`].
///
/// # Example
///
/// ```
/// use chatdown::dom::parse_html;
/// use chatdown::extract::{SignatureRules, extract_turns};
/// use chatdown::model::Block;
/// use chatdown::normalize::normalize_turn;
///
/// let (doc, _) = parse_html(r#"<div class="model"><p>Use <code>ls</code></p></div>"#);
/// let rules = SignatureRules::default();
/// let extraction = extract_turns(&doc, &rules);
///
/// let message = normalize_turn(&doc, &extraction.turns[0], &rules);
/// assert_eq!(message.blocks, vec![Block::Inline { text: "Use `ls`".into() }]);
/// ```
pub fn normalize_turn(doc: &Document, turn: &Turn, rules: &SignatureRules) -> Message {
    let mut builder = BlockBuilder::new(doc, &rules.noise, 0);
    for &root in turn.span.roots() {
        builder.walk(root);
    }
    let blocks = builder.finish();

    tracing::trace!(
        ordinal = turn.ordinal,
        speaker = %turn.speaker,
        blocks = blocks.len(),
        "normalized turn"
    );

    Message {
        speaker: turn.speaker,
        blocks,
    }
}

enum Step {
    Enter(NodeId),
    Exit(Close),
}

#[derive(Clone, Copy)]
enum Close {
    Block,
    Heading,
    Inline,
}

/// Accumulates blocks for one subtree.
struct BlockBuilder<'a> {
    doc: &'a Document,
    noise: &'a NoiseRules,
    depth: usize,
    blocks: Vec<Block>,
    line: InlineBuffer,
    heading: Option<u8>,
}

impl<'a> BlockBuilder<'a> {
    fn new(doc: &'a Document, noise: &'a NoiseRules, depth: usize) -> Self {
        Self {
            doc,
            noise,
            depth,
            blocks: Vec::new(),
            line: InlineBuffer::new(),
            heading: None,
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }

    fn walk(&mut self, root: NodeId) {
        let mut stack = vec![Step::Enter(root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => self.enter(id, &mut stack),
                Step::Exit(Close::Block) => self.flush(),
                Step::Exit(Close::Heading) => {
                    self.flush();
                    self.heading = None;
                }
                Step::Exit(Close::Inline) => self.line.close(),
            }
        }
    }

    fn enter(&mut self, id: NodeId, stack: &mut Vec<Step>) {
        let doc = self.doc;
        if self.noise.is_noise(doc, id) {
            return;
        }
        let Some(node) = doc.get(id) else {
            return;
        };
        let name = match &node.data {
            NodeData::Text(text) => {
                self.line.push_text(text);
                return;
            }
            NodeData::Element { name, .. } => &name.local,
            _ => return,
        };

        let close = match element_role(name) {
            ElementRole::Transparent => None,
            ElementRole::Block => {
                self.flush();
                Some(Close::Block)
            }
            ElementRole::Heading(level) => {
                self.flush();
                self.heading = Some(level);
                Some(Close::Heading)
            }
            ElementRole::Preformatted => {
                self.flush();
                self.code_block(id);
                return;
            }
            ElementRole::List { ordered } => {
                self.flush();
                self.list(id, ordered);
                return;
            }
            ElementRole::Quote => {
                self.flush();
                let blocks = self.sub_blocks(doc.children(id));
                if !blocks.is_empty() {
                    self.blocks.push(Block::Quote { blocks });
                }
                return;
            }
            ElementRole::Table => {
                self.flush();
                self.table(id);
                return;
            }
            ElementRole::Rule => {
                self.flush();
                self.blocks.push(Block::Rule);
                return;
            }
            ElementRole::Break => {
                self.line.line_break();
                return;
            }
            ElementRole::Media(kind) => {
                self.flush();
                self.blocks.push(media_block(doc, id, kind));
                return;
            }
            ElementRole::Strong => self.open(FrameKind::Strong),
            ElementRole::Emphasis => self.open(FrameKind::Emphasis),
            ElementRole::Strike => self.open(FrameKind::Strike),
            ElementRole::Code => self.open(FrameKind::Code),
            ElementRole::Link => {
                let href = doc
                    .attr(id, "href")
                    .map(str::trim)
                    .filter(|href| !href.is_empty())
                    .map(str::to_string);
                self.open(FrameKind::Link { href })
            }
        };

        if let Some(close) = close {
            stack.push(Step::Exit(close));
        }
        let first = stack.len();
        stack.extend(doc.children(id).map(Step::Enter));
        stack[first..].reverse();
    }

    fn open(&mut self, kind: FrameKind) -> Option<Close> {
        self.line.open(kind);
        Some(Close::Inline)
    }

    /// End the current paragraph, if it has any text.
    fn flush(&mut self) {
        let Some((text, formatted)) = self.line.take_paragraph() else {
            return;
        };
        let block = match self.heading {
            Some(level) => Block::Heading {
                level,
                text: text.replace('\n', " "),
            },
            None if formatted => Block::Inline { text },
            None => Block::Paragraph { text },
        };
        self.blocks.push(block);
    }

    fn code_block(&mut self, pre: NodeId) {
        let text = raw_text(self.doc, self.noise, pre);
        let text = text.trim_end_matches(['\n', '\r']);
        if text.trim().is_empty() {
            return;
        }
        self.blocks.push(Block::Code {
            text: text.to_string(),
            language: code_language(self.doc, pre),
        });
    }

    fn list(&mut self, list: NodeId, ordered: bool) {
        let doc = self.doc;
        let start = if ordered {
            doc.attr(list, "start")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(1)
        } else {
            1
        };

        let items: Vec<String> = doc
            .children(list)
            .filter(|&child| !self.noise.is_noise(doc, child))
            .map(|child| flatten_blocks(&self.sub_blocks(iter::once(child))))
            .filter(|item| !item.is_empty())
            .collect();

        if !items.is_empty() {
            self.blocks.push(Block::List {
                ordered,
                start,
                items,
            });
        }
    }

    fn table(&mut self, table: NodeId) {
        let doc = self.doc;
        let mut rows = Vec::new();
        let mut trailing = Vec::new();

        let mut stack: Vec<NodeId> = doc.children(table).collect();
        stack.reverse();
        while let Some(id) = stack.pop() {
            if self.noise.is_noise(doc, id) {
                continue;
            }
            match doc.element_name(id).map(|name| name.as_ref()) {
                Some("thead" | "tbody" | "tfoot") => {
                    let first = stack.len();
                    stack.extend(doc.children(id));
                    stack[first..].reverse();
                }
                Some("tr") => {
                    let row = self.table_row(id);
                    if row.iter().any(|cell| !cell.is_empty()) {
                        rows.push(row);
                    }
                }
                Some("colgroup" | "col") => {}
                Some("caption") => {
                    let caption = self.sub_blocks(iter::once(id));
                    self.blocks.extend(caption);
                }
                _ => trailing.extend(self.sub_blocks(iter::once(id))),
            }
        }

        if !rows.is_empty() {
            self.blocks.push(Block::Table { rows });
        }
        self.blocks.extend(trailing);
    }

    fn table_row(&self, row: NodeId) -> Vec<String> {
        let doc = self.doc;
        doc.children(row)
            .filter(|&cell| {
                doc.element_name(cell)
                    .is_some_and(|name| matches!(name.as_ref(), "td" | "th"))
                    && !self.noise.is_noise(doc, cell)
            })
            .map(|cell| flatten_blocks(&self.sub_blocks(iter::once(cell))).replace('\n', " "))
            .collect()
    }

    /// Normalize subtrees with a nested builder, or as plain text once
    /// nesting gets too deep.
    fn sub_blocks(&self, roots: impl IntoIterator<Item = NodeId>) -> Vec<Block> {
        if self.depth >= MAX_NESTING {
            return plain_text(self.doc, self.noise, roots)
                .map(|text| Block::Paragraph { text })
                .into_iter()
                .collect();
        }

        let mut sub = BlockBuilder::new(self.doc, self.noise, self.depth + 1);
        for root in roots {
            sub.walk(root);
        }
        sub.finish()
    }
}

/// Flatten nested blocks to a head line plus continuation lines.
///
/// Leading paragraphs join the head line; everything from the first other
/// block on is rendered line by line below it.
fn flatten_blocks(blocks: &[Block]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut head_open = true;

    for block in blocks {
        let rendered = block_lines(block);
        let joinable = matches!(block, Block::Paragraph { .. } | Block::Inline { .. });

        if joinable && head_open {
            let mut rest = rendered.into_iter();
            if let Some(first) = rest.next() {
                match lines.first_mut() {
                    Some(head) => {
                        head.push(' ');
                        head.push_str(&first);
                    }
                    None => lines.push(first),
                }
            }
            let before = lines.len();
            lines.extend(rest);
            if lines.len() > before {
                head_open = false;
            }
        } else {
            head_open = false;
            lines.extend(rendered);
        }
    }

    lines.join("\n")
}

/// Verbatim text of a preformatted subtree; `<br>` counts as a newline.
fn raw_text(doc: &Document, noise: &NoiseRules, root: NodeId) -> String {
    let mut out = String::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if noise.is_noise(doc, id) {
            continue;
        }
        match doc.get(id).map(|node| &node.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Element { name, .. }) => {
                if name.local.as_ref() == "br" {
                    out.push('\n');
                }
                let first = stack.len();
                stack.extend(doc.children(id));
                stack[first..].reverse();
            }
            _ => {}
        }
    }
    out
}

/// Whitespace-collapsed text of the subtrees, without any markup.
fn plain_text(
    doc: &Document,
    noise: &NoiseRules,
    roots: impl IntoIterator<Item = NodeId>,
) -> Option<String> {
    let mut line = InlineBuffer::new();
    for root in roots {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if noise.is_noise(doc, id) {
                continue;
            }
            match doc.get(id).map(|node| &node.data) {
                Some(NodeData::Text(text)) => line.push_text(text),
                Some(NodeData::Element { name, .. }) => {
                    // Keep words in separate blocks apart
                    if !matches!(
                        element_role(&name.local),
                        ElementRole::Transparent
                            | ElementRole::Strong
                            | ElementRole::Emphasis
                            | ElementRole::Strike
                            | ElementRole::Code
                            | ElementRole::Link
                    ) {
                        line.push_text(" ");
                    }
                    let first = stack.len();
                    stack.extend(doc.children(id));
                    stack[first..].reverse();
                }
                _ => {}
            }
        }
    }
    line.take_paragraph().map(|(text, _)| text)
}

fn code_language(doc: &Document, pre: NodeId) -> Option<String> {
    let code = doc
        .children(pre)
        .find(|&child| doc.element_name(child).is_some_and(|n| n.as_ref() == "code"));

    [code, Some(pre)].into_iter().flatten().find_map(|id| {
        doc.classes(id)
            .iter()
            .find_map(|class| {
                class
                    .strip_prefix("language-")
                    .or_else(|| class.strip_prefix("lang-"))
            })
            .or_else(|| doc.attr(id, "data-language").map(str::trim))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    })
}

fn media_block(doc: &Document, id: NodeId, kind: MediaKind) -> Block {
    let is_tag = |node: NodeId, tag: &str| doc.element_name(node).is_some_and(|n| n.as_ref() == tag);

    // A <picture> describes itself through its fallback <img>
    let fallback = is_tag(id, "picture")
        .then(|| doc.descendants(id).find(|&node| is_tag(node, "img")))
        .flatten();
    let caption = [Some(id), fallback]
        .into_iter()
        .flatten()
        .flat_map(|node| ["alt", "title", "aria-label"].map(|attr| doc.attr(node, attr)))
        .flatten()
        .map(|value| value.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|value| !value.is_empty());

    let src_attr = if is_tag(id, "object") { "data" } else { "src" };
    let source = doc
        .attr(id, src_attr)
        .or_else(|| fallback.and_then(|img| doc.attr(img, "src")))
        .or_else(|| {
            doc.children(id).find(|&child| is_tag(child, "source")).and_then(|child| {
                doc.attr(child, "src").or_else(|| {
                    doc.attr(child, "srcset")
                        .and_then(|srcset| srcset.split([',', ' ']).find(|s| !s.is_empty()))
                })
            })
        })
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(str::to_string);

    Block::Media {
        kind,
        caption,
        source,
    }
}
