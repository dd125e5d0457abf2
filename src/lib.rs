//! # chatdown
//!
//! Convert a saved chat-assistant conversation page (the Gemini web export)
//! into a clean, ordered markdown transcript.
//!
//! ## Pipeline
//!
//! 1. [`dom`]: bytes are decoded and parsed into an arena [`Document`]
//!    with html5ever's error recovery
//! 2. [`extract`]: turn boundaries are found with declarative
//!    [`SignatureRules`], and each turn gets a speaker and a content span
//! 3. [`normalize`]: each span becomes a list of content [`Block`]s
//! 4. [`markdown`]: the [`Transcript`] is serialized
//!
//! ## Quick Start
//!
//! ```
//! let html = br#"
//!     <div class="query-text">How do I list files?</div>
//!     <div class="markdown markdown-main-panel">
//!         <p>Run <code>ls</code>:</p>
//!         <pre><code class="language-sh">ls -la</code></pre>
//!     </div>"#;
//!
//! let conversion = chatdown::convert(html, None).unwrap();
//! assert_eq!(
//!     conversion.text,
//!     "User:\nHow do I list files?\n\nAssistant:\nRun `ls`:\n```sh\nls -la\n```"
//! );
//! ```
//!
//! ## Custom Rules
//!
//! Other markup can be handled by swapping the rule set:
//!
//! ```
//! use chatdown::{Converter, Marker, SignatureRules};
//!
//! let rules = SignatureRules::empty()
//!     .with_user_marker(Marker::class("prompt"))
//!     .with_assistant_marker(Marker::class("reply"));
//!
//! let html = br#"<p class="prompt">hi</p><p class="reply">hello</p>"#;
//! let conversion = Converter::new().with_rules(rules).convert(html, None).unwrap();
//! assert_eq!(conversion.transcript.len(), 2);
//! ```

pub mod convert;
pub mod dom;
pub mod error;
pub mod extract;
pub mod markdown;
pub mod model;
pub mod normalize;
pub(crate) mod util;

pub use convert::{Conversion, Converter, convert};
pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use extract::{Extraction, Marker, NoiseRules, SignatureRules, extract_turns};
pub use markdown::{RenderConfig, render_transcript};
pub use model::{Block, MediaKind, Message, Speaker, Transcript, Turn};
