//! Markdown serialization of a [`Transcript`](crate::model::Transcript).
//!
//! - `escape`: fence/tick sizing and table-cell escaping
//! - `render`: block and transcript rendering with [`RenderConfig`]
//!
//! Each message is a label line followed by its blocks, one block after
//! another with no blank lines between them. Messages are separated by
//! exactly one blank line and the output has no trailing newline.

mod escape;
mod render;

pub use escape::{calculate_fence_length, calculate_inline_code_ticks, escape_table_cell};
pub use render::{RenderConfig, block_lines, render_message, render_transcript};
