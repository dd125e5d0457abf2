//! Transcript → markdown rendering.
//!
//! Pure string building; writing the result anywhere is left to the caller.

use crate::model::{Block, Message, Speaker, Transcript};

use super::escape::{calculate_fence_length, escape_table_cell};

/// Configuration for transcript rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub user_label: String,
    pub assistant_label: String,
    pub unknown_label: String,
    /// Written before every content line, e.g. `"> "` for quoted messages.
    /// Label lines are never prefixed.
    pub line_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            user_label: Speaker::User.label().to_string(),
            assistant_label: Speaker::Assistant.label().to_string(),
            unknown_label: Speaker::Unknown.label().to_string(),
            line_prefix: String::new(),
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_label(mut self, label: impl Into<String>) -> Self {
        self.user_label = label.into();
        self
    }

    pub fn with_assistant_label(mut self, label: impl Into<String>) -> Self {
        self.assistant_label = label.into();
        self
    }

    pub fn with_unknown_label(mut self, label: impl Into<String>) -> Self {
        self.unknown_label = label.into();
        self
    }

    pub fn with_line_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.line_prefix = prefix.into();
        self
    }

    /// Quote every content line with `> `.
    pub fn quoted(self) -> Self {
        self.with_line_prefix("> ")
    }

    pub fn label(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::User => &self.user_label,
            Speaker::Assistant => &self.assistant_label,
            Speaker::Unknown => &self.unknown_label,
        }
    }
}

/// Render a transcript, one blank line between messages.
///
/// # Example
///
/// ```
/// use chatdown::markdown::{RenderConfig, render_transcript};
/// use chatdown::model::{Block, Message, Speaker, Transcript};
///
/// let transcript = Transcript::new(vec![
///     Message {
///         speaker: Speaker::User,
///         blocks: vec![Block::Paragraph { text: "Hello".into() }],
///     },
///     Message {
///         speaker: Speaker::Assistant,
///         blocks: vec![Block::Paragraph { text: "Hi there".into() }],
///     },
/// ]);
///
/// let text = render_transcript(&transcript, &RenderConfig::default());
/// assert_eq!(text, "User:\nHello\n\nAssistant:\nHi there");
/// ```
pub fn render_transcript(transcript: &Transcript, config: &RenderConfig) -> String {
    transcript
        .messages
        .iter()
        .map(|message| render_message(message, config))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render one message: the label line, then every block line.
pub fn render_message(message: &Message, config: &RenderConfig) -> String {
    let mut output = String::new();
    output.push_str(config.label(message.speaker));
    output.push(':');

    for block in &message.blocks {
        for line in block_lines(block) {
            output.push('\n');
            if line.is_empty() {
                output.push_str(config.line_prefix.trim_end());
            } else {
                output.push_str(&config.line_prefix);
                output.push_str(&line);
            }
        }
    }

    output
}

/// Render a single block to its markdown lines.
pub fn block_lines(block: &Block) -> Vec<String> {
    match block {
        Block::Paragraph { text } | Block::Inline { text } => {
            text.split('\n').map(str::to_string).collect()
        }

        Block::Code { text, language } => {
            let fence = "`".repeat(calculate_fence_length(text, '`'));
            let mut lines = Vec::with_capacity(text.lines().count() + 2);
            lines.push(format!("{fence}{}", language.as_deref().unwrap_or("")));
            lines.extend(text.split('\n').map(str::to_string));
            lines.push(fence);
            lines
        }

        Block::List {
            ordered,
            start,
            items,
        } => {
            let mut lines = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let marker = if *ordered {
                    format!("{}.", u64::from(*start) + i as u64)
                } else {
                    "-".to_string()
                };
                let indent = " ".repeat(marker.len() + 1);

                let mut item_lines = item.split('\n');
                let head = item_lines.next().unwrap_or("");
                lines.push(format!("{marker} {head}"));
                for line in item_lines {
                    if line.is_empty() {
                        lines.push(String::new());
                    } else {
                        lines.push(format!("{indent}{line}"));
                    }
                }
            }
            lines
        }

        Block::Media { kind, caption, .. } => match caption {
            Some(caption) => vec![format!("[{}: {caption}]", kind.as_str())],
            None => vec![format!("[{}]", kind.as_str())],
        },

        Block::Heading { level, text } => {
            vec![format!("{} {text}", "#".repeat(usize::from(*level).clamp(1, 6)))]
        }

        Block::Quote { blocks } => blocks
            .iter()
            .flat_map(block_lines)
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect(),

        Block::Table { rows } => table_lines(rows),

        Block::Rule => vec!["---".to_string()],
    }
}

/// Pipe table; the first row is the header.
fn table_lines(rows: &[Vec<String>]) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);

    let row_line = |row: &[String]| {
        let mut line = String::from("|");
        for i in 0..columns {
            let cell = row.get(i).map(|c| escape_table_cell(c)).unwrap_or_default();
            line.push(' ');
            line.push_str(&cell);
            line.push_str(" |");
        }
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(row_line(row));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    lines
}
