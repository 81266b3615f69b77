//! Answer text parsing for display.
//!
//! Answers cite sources inline as `[file]`. These are numbered in order of
//! first appearance so a terminal or page can show superscripts and a
//! citation list.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// A piece of a parsed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerFragment {
    Text { text: String },
    Bold { text: String },
    Citation { index: usize, citation: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAnswer {
    pub fragments: Vec<AnswerFragment>,

    /// Distinct citations, in order of first appearance
    pub citations: Vec<String>,
}

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("valid regex"));

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));

static FOOTNOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^\d+?\]").expect("valid regex"));

/// Rewrite Markdown heading lines as bold lines.
fn headings_to_bold(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.starts_with('#') {
                format!("**{}**", line.trim_start_matches('#').trim())
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop a citation that is still being typed: an `[` with no `]` after it.
fn truncate_open_citation(text: &str) -> &str {
    match (text.rfind('['), text.rfind(']')) {
        (Some(open), Some(close)) if open > close => &text[..open],
        (Some(open), None) => &text[..open],
        _ => text,
    }
}

fn push_text_fragments(fragments: &mut Vec<AnswerFragment>, text: &str) {
    let mut last = 0;
    for captures in BOLD_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last {
            fragments.push(AnswerFragment::Text {
                text: text[last..whole.start()].to_string(),
            });
        }
        fragments.push(AnswerFragment::Bold {
            text: inner.as_str().to_string(),
        });
        last = whole.end();
    }
    if last < text.len() {
        fragments.push(AnswerFragment::Text {
            text: text[last..].to_string(),
        });
    }
}

/// Split an answer into text, bold and numbered citation fragments.
///
/// While streaming, a trailing half-written citation is left out.
pub fn parse_answer(answer: &str, is_streaming: bool) -> ParsedAnswer {
    let normalized = headings_to_bold(answer);
    let mut text = normalized.trim();
    if is_streaming {
        text = truncate_open_citation(text);
    }

    let mut parsed = ParsedAnswer::default();
    let mut last = 0;

    for captures in CITATION_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_text_fragments(&mut parsed.fragments, &text[last..whole.start()]);

        let citation = inner.as_str().to_string();
        let index = match parsed.citations.iter().position(|c| *c == citation) {
            Some(position) => position + 1,
            None => {
                parsed.citations.push(citation.clone());
                parsed.citations.len()
            }
        };
        parsed.fragments.push(AnswerFragment::Citation { index, citation });
        last = whole.end();
    }
    push_text_fragments(&mut parsed.fragments, &text[last..]);

    parsed
}

/// Path a citation is served from.
pub fn citation_file_path(base_url: &str, citation: &str) -> String {
    format!("{}/content/{}", base_url.trim_end_matches('/'), citation)
}

/// Remove `[^N]` footnote markers.
pub fn strip_footnote_markers(answer: &str) -> String {
    FOOTNOTE_RE.replace_all(answer, "").into_owned()
}
