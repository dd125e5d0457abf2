//! Declarative structural signatures for turn boundaries and noise.
//!
//! Export markup drifts between versions, so nothing in the extractor names a
//! concrete class or tag. Everything format-specific lives in a
//! [`SignatureRules`] value, which can be replaced wholesale or loaded from a
//! JSON file.

use crate::dom::{Document, NodeData, NodeId};
use crate::model::Speaker;

/// One way an element can be recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Marker {
    /// The element carries this class token.
    Class { name: String },
    /// The element has this tag name (custom elements included).
    Tag { name: String },
    /// The element has this attribute, optionally with this exact value.
    Attribute { name: String, value: Option<String> },
}

impl Marker {
    pub fn class(name: impl Into<String>) -> Self {
        Marker::Class { name: name.into() }
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Marker::Tag { name: name.into() }
    }

    pub fn attribute(name: impl Into<String>, value: Option<&str>) -> Self {
        Marker::Attribute {
            name: name.into(),
            value: value.map(str::to_string),
        }
    }

    /// Check whether an element matches. Non-elements never match.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        match self {
            Marker::Class { name } => doc.has_class(id, name),
            Marker::Tag { name } => doc
                .element_name(id)
                .is_some_and(|tag| tag.as_ref().eq_ignore_ascii_case(name)),
            Marker::Attribute { name, value } => match (doc.attr(id, name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual.trim() == expected,
                (None, _) => false,
            },
        }
    }
}

/// Elements that never carry conversation content.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NoiseRules {
    /// Tags pruned with their whole subtree.
    pub tags: Vec<String>,
    /// Class tokens marking invisible or duplicated scaffolding.
    pub classes: Vec<String>,
    /// Prune `hidden`, `aria-hidden="true"` and inline `display:none` /
    /// `visibility:hidden` elements.
    pub honor_hidden: bool,
}

impl Default for NoiseRules {
    fn default() -> Self {
        Self {
            tags: [
                "head", "script", "style", "noscript", "template", "svg", "button", "mat-icon",
            ]
            .map(String::from)
            .to_vec(),
            classes: [
                "cdk-visually-hidden",
                "sr-only",
                "visually-hidden",
                "screen-reader-only",
            ]
            .map(String::from)
            .to_vec(),
            honor_hidden: true,
        }
    }
}

impl NoiseRules {
    /// Check whether a node and its subtree are noise.
    ///
    /// Comments and doctypes are always noise; text nodes never are.
    pub fn is_noise(&self, doc: &Document, id: NodeId) -> bool {
        let Some(node) = doc.get(id) else {
            return true;
        };
        let NodeData::Element { name, classes, .. } = &node.data else {
            return matches!(node.data, NodeData::Comment | NodeData::Doctype);
        };

        let tag = name.local.as_ref();
        if self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return true;
        }
        if classes.iter().any(|c| self.classes.contains(c)) {
            return true;
        }

        self.honor_hidden && is_hidden(doc, id)
    }
}

fn is_hidden(doc: &Document, id: NodeId) -> bool {
    if doc.attr(id, "hidden").is_some() {
        return true;
    }
    if doc
        .attr(id, "aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    doc.attr(id, "style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

/// The complete boundary signature for one export format.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SignatureRules {
    /// Markers of containers holding the user's input.
    pub user: Vec<Marker>,
    /// Markers of containers holding model output.
    pub assistant: Vec<Marker>,
    /// Markers of message containers that do not name a speaker themselves.
    pub neutral: Vec<Marker>,
    pub noise: NoiseRules,
    /// Elements nested deeper than this never open a turn.
    pub max_depth: usize,
}

impl Default for SignatureRules {
    fn default() -> Self {
        Self::gemini()
    }
}

impl SignatureRules {
    /// Rules with no markers at all, for building a signature from scratch.
    pub fn empty() -> Self {
        Self {
            user: Vec::new(),
            assistant: Vec::new(),
            neutral: Vec::new(),
            noise: NoiseRules::default(),
            max_depth: 512,
        }
    }

    /// Rules calibrated against saved Gemini conversation pages.
    ///
    /// Each exchange is a `<user-query>` followed by a `<model-response>`;
    /// older saves only keep the inner `div.query-text` and
    /// `div.markdown.markdown-main-panel`. The generic `user` / `model` /
    /// `assistant` classes and the `data-message-author-role` attribute cover
    /// simplified and re-saved copies of the same export.
    pub fn gemini() -> Self {
        Self {
            user: vec![
                Marker::tag("user-query"),
                Marker::class("query-text"),
                Marker::class("user-query-bubble-with-background"),
                Marker::class("user"),
                Marker::attribute("data-message-author-role", Some("user")),
            ],
            assistant: vec![
                Marker::tag("model-response"),
                Marker::class("markdown-main-panel"),
                Marker::class("model-response-text"),
                Marker::class("model"),
                Marker::class("assistant"),
                Marker::attribute("data-message-author-role", Some("assistant")),
            ],
            neutral: vec![
                Marker::class("chat-message"),
                Marker::class("conversation-turn"),
                Marker::attribute("data-turn-id", None),
            ],
            ..Self::empty()
        }
    }

    /// Parse rules from JSON. Missing fields take their Gemini defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::Error::InvalidRules(e.to_string()))
    }

    pub fn with_user_marker(mut self, marker: Marker) -> Self {
        self.user.push(marker);
        self
    }

    pub fn with_assistant_marker(mut self, marker: Marker) -> Self {
        self.assistant.push(marker);
        self
    }

    pub fn with_neutral_marker(mut self, marker: Marker) -> Self {
        self.neutral.push(marker);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Speaker named by markers on this element. User markers win ties.
    pub fn speaker_of(&self, doc: &Document, id: NodeId) -> Option<Speaker> {
        if self.user.iter().any(|m| m.matches(doc, id)) {
            Some(Speaker::User)
        } else if self.assistant.iter().any(|m| m.matches(doc, id)) {
            Some(Speaker::Assistant)
        } else {
            None
        }
    }

    /// Whether the element carries any boundary marker.
    pub fn is_marked(&self, doc: &Document, id: NodeId) -> bool {
        self.speaker_of(doc, id).is_some() || self.neutral.iter().any(|m| m.matches(doc, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn first(doc: &Document, tag: &str) -> NodeId {
        doc.find_by_tag(tag).expect("element present")
    }

    #[test]
    fn test_marker_matching() {
        let (doc, _) = parse_html(
            r#"<div class="query-text gds-body-l" data-message-author-role=" user "></div>"#,
        );
        let div = first(&doc, "div");

        assert!(Marker::class("query-text").matches(&doc, div));
        assert!(!Marker::class("query").matches(&doc, div));
        assert!(Marker::tag("DIV").matches(&doc, div));
        assert!(Marker::attribute("data-message-author-role", None).matches(&doc, div));
        assert!(Marker::attribute("data-message-author-role", Some("user")).matches(&doc, div));
        assert!(
            !Marker::attribute("data-message-author-role", Some("assistant")).matches(&doc, div)
        );
    }

    #[test]
    fn test_speaker_classification() {
        let (doc, _) = parse_html(
            r#"<p class="user">q</p><section class="model">a</section><article class="chat-message">x</article>"#,
        );
        let rules = SignatureRules::gemini();

        assert_eq!(rules.speaker_of(&doc, first(&doc, "p")), Some(Speaker::User));
        assert_eq!(
            rules.speaker_of(&doc, first(&doc, "section")),
            Some(Speaker::Assistant)
        );
        let article = first(&doc, "article");
        assert_eq!(rules.speaker_of(&doc, article), None);
        assert!(rules.is_marked(&doc, article));
    }

    #[test]
    fn test_user_marker_wins_ties() {
        let (doc, _) = parse_html(r#"<div class="user model">both</div>"#);
        let rules = SignatureRules::gemini();
        assert_eq!(rules.speaker_of(&doc, first(&doc, "div")), Some(Speaker::User));
    }

    #[test]
    fn test_noise_detection() {
        let (doc, _) = parse_html(
            r#"<script>x()</script>
            <span class="cdk-visually-hidden">You said</span>
            <div aria-hidden="true">dup</div>
            <p style="display: none">gone</p>
            <em hidden>gone</em>
            <b style="color: red">kept</b>"#,
        );
        let noise = NoiseRules::default();

        assert!(noise.is_noise(&doc, first(&doc, "script")));
        assert!(noise.is_noise(&doc, first(&doc, "span")));
        assert!(noise.is_noise(&doc, first(&doc, "div")));
        assert!(noise.is_noise(&doc, first(&doc, "p")));
        assert!(noise.is_noise(&doc, first(&doc, "em")));
        assert!(!noise.is_noise(&doc, first(&doc, "b")));
        assert!(noise.is_noise(&doc, first(&doc, "head")));
    }

    #[test]
    fn test_hidden_can_be_ignored() {
        let (doc, _) = parse_html(r#"<div aria-hidden="true">kept</div>"#);
        let noise = NoiseRules {
            honor_hidden: false,
            ..NoiseRules::default()
        };
        assert!(!noise.is_noise(&doc, first(&doc, "div")));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rules_from_json() {
        let rules = SignatureRules::from_json(
            r#"{
                "user": [{"kind": "class", "name": "prompt"}],
                "assistant": [{"kind": "attribute", "name": "data-role", "value": "bot"}],
                "max_depth": 40
            }"#,
        )
        .unwrap();

        assert_eq!(rules.user, vec![Marker::class("prompt")]);
        assert_eq!(
            rules.assistant,
            vec![Marker::attribute("data-role", Some("bot"))]
        );
        assert_eq!(rules.max_depth, 40);
        // Omitted fields keep the defaults
        assert_eq!(rules.noise, NoiseRules::default());
        assert_eq!(rules.neutral, SignatureRules::gemini().neutral);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_rules_from_invalid_json() {
        let err = SignatureRules::from_json(r#"{"user": "nope"}"#).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidRules(_)));
    }
}
