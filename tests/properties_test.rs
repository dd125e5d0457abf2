//! Property tests over generated conversations.

use proptest::prelude::*;

use chatdown::{Block, Speaker, convert};

#[derive(Debug, Clone)]
struct GeneratedTurn {
    user: bool,
    words: Vec<String>,
    /// Index of a word wrapped in `<b>`, if any.
    bold: Option<usize>,
    separators: Vec<&'static str>,
    noise: bool,
}

fn turn_strategy() -> impl Strategy<Value = GeneratedTurn> {
    (
        any::<bool>(),
        prop::collection::vec("[a-z]{1,8}", 1..8),
        any::<Option<prop::sample::Index>>(),
        prop::collection::vec(prop_oneof![Just(" "), Just("  "), Just("\n"), Just(" \t ")], 8),
        any::<bool>(),
    )
        .prop_map(|(user, words, bold, separators, noise)| GeneratedTurn {
            user,
            bold: bold.map(|i| i.index(words.len())),
            words,
            separators,
            noise,
        })
}

fn turn_html(turn: &GeneratedTurn) -> String {
    let class = if turn.user { "user" } else { "model" };
    let mut html = format!("<div class=\"{class}\"><p>");
    for (i, word) in turn.words.iter().enumerate() {
        if i > 0 {
            html.push_str(turn.separators[i % turn.separators.len()]);
        }
        if turn.bold == Some(i) {
            html.push_str(&format!("<b>{word}</b>"));
        } else {
            html.push_str(word);
        }
    }
    html.push_str("</p>");
    if turn.noise {
        html.push_str(
            "<span class=\"cdk-visually-hidden\">NOISE</span><script>NOISE()</script>",
        );
    }
    html.push_str("</div>\n");
    html
}

fn conversation_html(turns: &[GeneratedTurn]) -> String {
    let body: String = turns.iter().map(turn_html).collect();
    format!("<!DOCTYPE html><html><body><header>Chrome</header><main>{body}</main></body></html>")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

proptest! {
    #[test]
    fn prop_conversion_is_deterministic(turns in prop::collection::vec(turn_strategy(), 1..6)) {
        let html = conversation_html(&turns);
        let first = convert(html.as_bytes(), None).unwrap();
        let second = convert(html.as_bytes(), None).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_turn_order_follows_document(turns in prop::collection::vec(turn_strategy(), 1..6)) {
        let html = conversation_html(&turns);
        let conversion = convert(html.as_bytes(), None).unwrap();

        let expected: Vec<Speaker> = turns
            .iter()
            .map(|t| if t.user { Speaker::User } else { Speaker::Assistant })
            .collect();
        let actual: Vec<Speaker> = conversion.transcript.messages.iter().map(|m| m.speaker).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_no_visible_text_is_lost(turns in prop::collection::vec(turn_strategy(), 1..6)) {
        let html = conversation_html(&turns);
        let conversion = convert(html.as_bytes(), None).unwrap();

        for (turn, message) in turns.iter().zip(&conversion.transcript.messages) {
            let text: String = message
                .blocks
                .iter()
                .filter_map(|b| match b {
                    Block::Paragraph { text } | Block::Inline { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" ")
                .replace("**", "");
            let words: Vec<&str> = text.split(' ').collect();
            prop_assert_eq!(words, turn.words.iter().map(String::as_str).collect::<Vec<_>>());
        }
        prop_assert!(!conversion.text.contains("NOISE"));
    }

    #[test]
    fn prop_left_out_chrome_is_counted(turns in prop::collection::vec(turn_strategy(), 1..6)) {
        let html = conversation_html(&turns);
        let conversion = convert(html.as_bytes(), None).unwrap();

        // The header is the only visible content outside the turns
        prop_assert!(!conversion.text.contains("Chrome"));
        prop_assert_eq!(conversion.extraction.skipped_leading, 0);
        prop_assert_eq!(conversion.extraction.skipped_outside, 1);
    }

    #[test]
    fn prop_normalization_is_idempotent(turns in prop::collection::vec(turn_strategy(), 1..6)) {
        let html = conversation_html(&turns);
        let conversion = convert(html.as_bytes(), None).unwrap();

        for message in &conversion.transcript.messages {
            for block in &message.blocks {
                let (Block::Paragraph { text } | Block::Inline { text }) = block else {
                    continue;
                };
                let again = format!("<div class=\"user\"><p>{}</p></div>", escape_html(text));
                let renormalized = convert(again.as_bytes(), None).unwrap();
                prop_assert_eq!(
                    &renormalized.transcript.messages[0].blocks,
                    &vec![Block::Paragraph { text: text.clone() }]
                );
            }
        }
    }
}
