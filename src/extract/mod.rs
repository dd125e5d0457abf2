//! Turn extraction: find boundary nodes and the content span of each turn.
//!
//! Extraction runs two passes over the document, both with explicit stacks:
//!
//! 1. **Index** - pre-order walk that prunes noise subtrees, then a reverse
//!    sweep that folds "has visible text" and "contains a candidate" up to
//!    each ancestor
//! 2. **Partition** - pre-order walk from the conversation root that opens a
//!    turn at each top-level candidate and attaches the visible subtrees that
//!    follow it, until the next candidate
//!
//! A candidate is any element matching a marker in [`SignatureRules`] at or
//! above `max_depth`. Candidates nested inside another candidate belong to the
//! outer one. The conversation root is the lowest common ancestor of all
//! non-empty top-level candidates, or the parent of a lone candidate; anything
//! outside it is page chrome, counted in [`Extraction::skipped_outside`].

mod rules;

pub use rules::{Marker, NoiseRules, SignatureRules};

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::model::{ContentSpan, Speaker, Turn};
use crate::normalize::{ElementRole, element_role};

/// Result of turn extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Turns in document order.
    pub turns: Vec<Turn>,
    /// Visible subtrees inside the conversation root that came before the
    /// first turn and were left out.
    pub skipped_leading: usize,
    /// Visible subtrees outside the conversation root, such as a page title
    /// or navigation, that were left out.
    pub skipped_outside: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Report an extraction without turns as [`Error::NoTurnsFound`].
    pub fn ensure_turns(&self) -> Result<()> {
        if self.turns.is_empty() {
            Err(Error::NoTurnsFound)
        } else {
            Ok(())
        }
    }
}

const PRUNED: u8 = 1 << 0;
const VISIBLE_TEXT: u8 = 1 << 1;
const CANDIDATE: u8 = 1 << 2;
const CONTAINS_CANDIDATE: u8 = 1 << 3;
const MEDIA: u8 = 1 << 4;

/// Per-node facts gathered in the index pass.
struct NodeIndex {
    flags: Vec<u8>,
    depth: Vec<u32>,
}

impl NodeIndex {
    fn build(doc: &Document, rules: &SignatureRules) -> Self {
        let mut flags = vec![0u8; doc.len()];
        let mut depth = vec![0u32; doc.len()];
        let mut order = Vec::with_capacity(doc.len());

        let mut stack = vec![doc.root()];
        while let Some(id) = stack.pop() {
            let i = id.0 as usize;
            if rules.noise.is_noise(doc, id) {
                flags[i] |= PRUNED;
                continue;
            }
            order.push(id);

            if let Some(text) = doc.text(id) {
                if !text.trim().is_empty() {
                    flags[i] |= VISIBLE_TEXT;
                }
                continue;
            }

            if depth[i] as usize <= rules.max_depth && rules.is_marked(doc, id) {
                flags[i] |= CANDIDATE | CONTAINS_CANDIDATE;
            }
            if doc
                .element_name(id)
                .is_some_and(|name| matches!(element_role(name), ElementRole::Media(_)))
            {
                flags[i] |= MEDIA;
            }

            let first = stack.len();
            for child in doc.children(id) {
                depth[child.0 as usize] = depth[i] + 1;
                stack.push(child);
            }
            stack[first..].reverse();
        }

        // Children follow their parent in pre-order, so a reverse sweep sees
        // every child before its parent.
        for &id in order.iter().rev() {
            let inherited = flags[id.0 as usize] & (VISIBLE_TEXT | CONTAINS_CANDIDATE | MEDIA);
            if inherited != 0
                && let Some(parent) = doc.parent(id)
            {
                flags[parent.0 as usize] |= inherited;
            }
        }

        Self { flags, depth }
    }

    fn has(&self, id: NodeId, flag: u8) -> bool {
        self.flags.get(id.0 as usize).is_some_and(|f| f & flag != 0)
    }

    fn is_pruned(&self, id: NodeId) -> bool {
        self.has(id, PRUNED)
    }

    /// Visible text or embedded media. Either one makes a candidate a turn
    /// and stray content worth keeping.
    fn has_content(&self, id: NodeId) -> bool {
        self.has(id, VISIBLE_TEXT | MEDIA)
    }

    fn is_candidate(&self, id: NodeId) -> bool {
        self.has(id, CANDIDATE)
    }

    fn contains_candidate(&self, id: NodeId) -> bool {
        self.has(id, CONTAINS_CANDIDATE)
    }

    fn depth(&self, id: NodeId) -> u32 {
        self.depth.get(id.0 as usize).copied().unwrap_or(0)
    }
}

/// Extract the ordered turns of a conversation.
///
/// Never fails: a document without boundaries yields an empty
/// [`Extraction`], which [`Extraction::ensure_turns`] reports as
/// [`Error::NoTurnsFound`].
///
/// # Example
///
/// ```
/// use chatdown::dom::parse_html;
/// use chatdown::extract::{SignatureRules, extract_turns};
/// use chatdown::Speaker;
///
/// let (doc, _) = parse_html(r#"<div class="user">Hello</div><div class="model">Hi</div>"#);
/// let extraction = extract_turns(&doc, &SignatureRules::gemini());
///
/// let speakers: Vec<_> = extraction.turns.iter().map(|t| t.speaker).collect();
/// assert_eq!(speakers, [Speaker::User, Speaker::Assistant]);
/// ```
pub fn extract_turns(doc: &Document, rules: &SignatureRules) -> Extraction {
    let index = NodeIndex::build(doc, rules);

    let boundaries = top_level_candidates(doc, &index);
    let Some(lca) = lowest_common_ancestor(doc, &index, &boundaries) else {
        tracing::warn!("no turn boundaries found");
        return Extraction::default();
    };
    // A lone boundary is its own LCA; its siblings still belong to it.
    let conversation_root = if index.is_candidate(lca) {
        doc.parent(lca).unwrap_or(lca)
    } else {
        lca
    };
    let skipped_outside = count_outside(doc, &index, conversation_root);

    let mut turns: Vec<Turn> = Vec::new();
    let mut skipped_leading = 0;
    // Speaker of an empty candidate waiting to merge into the next boundary.
    let mut pending_speaker: Option<Speaker> = None;

    let mut stack = vec![conversation_root];
    while let Some(id) = stack.pop() {
        if index.is_pruned(id) {
            continue;
        }

        if index.is_candidate(id) {
            if !index.has_content(id) {
                if let Some(speaker) = classify(doc, &index, rules, id) {
                    pending_speaker = Some(speaker);
                }
                tracing::trace!(node = id.0, "empty candidate merged into next boundary");
                continue;
            }

            let speaker = classify(doc, &index, rules, id)
                .or(pending_speaker)
                .unwrap_or(Speaker::Unknown);
            pending_speaker = None;

            tracing::trace!(
                node = id.0,
                depth = index.depth(id),
                ?speaker,
                ordinal = turns.len(),
                "turn boundary"
            );
            turns.push(Turn {
                speaker,
                ordinal: turns.len(),
                span: ContentSpan::new(id),
            });
            continue;
        }

        if index.contains_candidate(id) {
            let first = stack.len();
            stack.extend(doc.children(id));
            stack[first..].reverse();
            continue;
        }

        if !index.has_content(id) {
            continue;
        }

        // Visible content between candidates stops an empty candidate from
        // lending its speaker.
        pending_speaker = None;
        match turns.last_mut() {
            Some(turn) => turn.span.push(id),
            None => skipped_leading += 1,
        }
    }

    tracing::debug!(
        turns = turns.len(),
        skipped_leading,
        skipped_outside,
        root = conversation_root.0,
        "extracted turns"
    );

    Extraction {
        turns,
        skipped_leading,
        skipped_outside,
    }
}

/// Count the visible subtrees that lie outside the conversation root.
fn count_outside(doc: &Document, index: &NodeIndex, conversation_root: NodeId) -> usize {
    let ancestors: Vec<NodeId> =
        std::iter::successors(doc.parent(conversation_root), |&id| doc.parent(id)).collect();

    let mut count = 0;
    let mut stack = vec![doc.root()];
    while let Some(id) = stack.pop() {
        if id == conversation_root || index.is_pruned(id) {
            continue;
        }
        if ancestors.contains(&id) {
            stack.extend(doc.children(id));
        } else if index.has_content(id) {
            tracing::debug!(node = id.0, "page chrome outside the conversation root");
            count += 1;
        }
    }
    count
}

/// Candidates with visible content that are not nested in another candidate.
fn top_level_candidates(doc: &Document, index: &NodeIndex) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack = vec![doc.root()];
    while let Some(id) = stack.pop() {
        if index.is_pruned(id) || !index.contains_candidate(id) {
            continue;
        }
        if index.is_candidate(id) {
            if index.has_content(id) {
                found.push(id);
            }
            continue;
        }
        let first = stack.len();
        stack.extend(doc.children(id));
        stack[first..].reverse();
    }
    found
}

fn lowest_common_ancestor(doc: &Document, index: &NodeIndex, nodes: &[NodeId]) -> Option<NodeId> {
    let (&first, rest) = nodes.split_first()?;
    let mut lca = first;
    for &other in rest {
        let mut a = lca;
        let mut b = other;
        while index.depth(a) > index.depth(b) {
            a = doc.parent(a)?;
        }
        while index.depth(b) > index.depth(a) {
            b = doc.parent(b)?;
        }
        while a != b {
            a = doc.parent(a)?;
            b = doc.parent(b)?;
        }
        lca = a;
    }
    Some(lca)
}

/// Speaker of a boundary: its own markers, else the first speaker marker
/// among its visible descendants.
fn classify(
    doc: &Document,
    index: &NodeIndex,
    rules: &SignatureRules,
    boundary: NodeId,
) -> Option<Speaker> {
    if let Some(speaker) = rules.speaker_of(doc, boundary) {
        return Some(speaker);
    }

    let mut stack: Vec<NodeId> = doc.children(boundary).collect();
    stack.reverse();
    while let Some(id) = stack.pop() {
        if index.is_pruned(id) || !doc.is_element(id) {
            continue;
        }
        if let Some(speaker) = rules.speaker_of(doc, id) {
            return Some(speaker);
        }
        let first = stack.len();
        stack.extend(doc.children(id));
        stack[first..].reverse();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn extract(html: &str) -> (Document, Extraction) {
        let (doc, _) = parse_html(html);
        let extraction = extract_turns(&doc, &SignatureRules::gemini());
        (doc, extraction)
    }

    fn speakers(extraction: &Extraction) -> Vec<Speaker> {
        extraction.turns.iter().map(|t| t.speaker).collect()
    }

    #[test]
    fn test_two_turns() {
        let (doc, extraction) =
            extract(r#"<div class="user">Hello</div><div class="model">Hi there</div>"#);

        assert_eq!(speakers(&extraction), [Speaker::User, Speaker::Assistant]);
        assert_eq!(extraction.turns[0].ordinal, 0);
        assert_eq!(extraction.turns[1].ordinal, 1);
        for turn in &extraction.turns {
            assert_eq!(turn.span.roots().len(), 1);
            assert_eq!(doc.element_name(turn.span.boundary()).unwrap().as_ref(), "div");
        }
    }

    #[test]
    fn test_no_markers() {
        let (_, extraction) = extract("<div><p>Just a page</p></div>");
        assert!(extraction.is_empty());
        assert_eq!(extraction.ensure_turns(), Err(Error::NoTurnsFound));
    }

    #[test]
    fn test_nested_candidates_count_once() {
        let (_, extraction) = extract(
            r#"<div class="chat-message"><div class="user"><p class="user">Q</p></div></div>
               <div class="model"><div class="markdown-main-panel">A</div></div>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::User, Speaker::Assistant]);
    }

    #[test]
    fn test_neutral_boundary_takes_descendant_speaker() {
        let (_, extraction) = extract(
            r#"<article class="conversation-turn"><div data-message-author-role="assistant">A</div></article>
               <article class="conversation-turn"><div>no marker</div></article>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::Assistant, Speaker::Unknown]);
    }

    #[test]
    fn test_noise_is_excluded_and_never_a_boundary() {
        let (_, extraction) = extract(
            r#"<script class="user">var x = 1;</script>
               <div class="user" aria-hidden="true">shadow copy</div>
               <div class="user">real</div>"#,
        );
        assert_eq!(extraction.turns.len(), 1);
        assert_eq!(extraction.turns[0].speaker, Speaker::User);
    }

    #[test]
    fn test_stray_content_attaches_to_open_turn() {
        let (doc, extraction) = extract(
            r#"<main>
                 <p>before</p>
                 <div class="user">Q</div>
                 <p>follow-up</p>
                 <div class="model">A</div>
                 <p>tail</p>
               </main>
               <footer>page chrome</footer>"#,
        );

        assert_eq!(extraction.skipped_leading, 1);
        assert_eq!(extraction.skipped_outside, 1);
        assert_eq!(extraction.turns[0].span.roots().len(), 2);
        assert_eq!(extraction.turns[1].span.roots().len(), 2);

        let footer = doc.find_by_tag("footer").unwrap();
        for turn in &extraction.turns {
            assert!(!turn.span.roots().contains(&footer));
        }
    }

    #[test]
    fn test_stray_media_is_content() {
        let (doc, extraction) = extract(
            r#"<div class="user">Look at this</div>
               <div class="preview"><img src="cat.png"></div>
               <div class="model">A cat.</div>"#,
        );
        let preview = doc.find_by_tag("img").and_then(|img| doc.parent(img)).unwrap();
        assert_eq!(extraction.turns[0].span.roots()[1], preview);
    }

    #[test]
    fn test_media_only_candidate_is_a_turn() {
        let (doc, extraction) = extract(
            r#"<main>
                 <div class="user"><img alt="my screenshot" src="s.png"></div>
                 <div class="model">Nice picture.</div>
               </main>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::User, Speaker::Assistant]);
        let img = doc.find_by_tag("img").unwrap();
        assert_eq!(doc.parent(img), Some(extraction.turns[0].span.boundary()));
    }

    #[test]
    fn test_lone_boundary_keeps_following_siblings() {
        let (doc, extraction) = extract(
            r#"<div class="user">Question?</div><p>Answer paragraph without marker</p>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::User]);
        let p = doc.find_by_tag("p").unwrap();
        assert_eq!(extraction.turns[0].span.roots()[1..], [p]);
        assert_eq!(extraction.skipped_outside, 0);
    }

    #[test]
    fn test_last_boundary_keeps_trailing_content() {
        let (doc, extraction) = extract(
            r#"<div class="user">Q1</div><div class="model">A1</div><p>trailing visible text</p>"#,
        );
        let p = doc.find_by_tag("p").unwrap();
        assert_eq!(extraction.turns[1].span.roots()[1..], [p]);
    }

    #[test]
    fn test_content_outside_root_is_counted() {
        let (_, extraction) = extract(
            r#"<body>
                 <h1>Conversation title</h1>
                 <section><div class="user">Q</div><div class="model">A</div></section>
                 <p>after section</p>
               </body>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::User, Speaker::Assistant]);
        assert_eq!(extraction.skipped_leading, 0);
        assert_eq!(extraction.skipped_outside, 2);
    }

    #[test]
    fn test_empty_candidate_merges_into_next() {
        let (_, extraction) = extract(
            r#"<div class="user"><span class="avatar"></span></div>
               <div class="chat-message">What time is it?</div>
               <div class="model">Noon.</div>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::User, Speaker::Assistant]);
    }

    #[test]
    fn test_empty_candidate_does_not_merge_across_content() {
        let (_, extraction) = extract(
            r#"<section>
                 <div class="model">A</div>
                 <div class="user">  </div>
                 <p>stray text</p>
                 <div class="chat-message">unattributed</div>
               </section>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::Assistant, Speaker::Unknown]);
        // The stray paragraph belongs to the assistant turn
        assert_eq!(extraction.turns[0].span.roots().len(), 2);
    }

    #[test]
    fn test_adjacent_non_empty_candidates_stay_separate() {
        let (_, extraction) = extract(
            r#"<div class="user">first</div><div class="user">second</div>"#,
        );
        assert_eq!(speakers(&extraction), [Speaker::User, Speaker::User]);
    }

    #[test]
    fn test_max_depth_limits_boundaries() {
        let (doc, _) = parse_html(
            r#"<div><div><div><div class="user">deep</div></div></div></div>"#,
        );
        let shallow = SignatureRules::gemini().with_max_depth(3);
        assert!(extract_turns(&doc, &shallow).is_empty());
        assert_eq!(extract_turns(&doc, &SignatureRules::gemini()).turns.len(), 1);
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let depth = 20_000;
        let html = format!(
            "{}<div class=\"user\">deep question</div>{}",
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let (doc, _) = parse_html(&html);
        let rules = SignatureRules::gemini().with_max_depth(usize::MAX);
        let extraction = extract_turns(&doc, &rules);
        assert_eq!(extraction.turns.len(), 1);
    }
}
