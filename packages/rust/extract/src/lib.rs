//! Restaurant extraction from post HTML.
//!
//! Posts are flattened to plain text (one text node per line) and scanned
//! for NYC street addresses. Each address becomes a [`Candidate`] whose name
//! is the closest non-blank line above it and whose blurb is a short window
//! of text starting at the address.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tracing::{debug, instrument};

use sietsemap_shared::{Candidate, Post};

/// Name used when no text precedes the address.
const UNNAMED: &str = "Unnamed";

/// Characters of context kept after the address in the blurb.
const BLURB_TAIL_CHARS: usize = 140;

/// Hard cap on blurb length, in characters.
const BLURB_MAX_CHARS: usize = 260;

/// Separator that replaces line breaks inside a blurb.
const BLURB_LINE_JOIN: &str = "…";

/// A street number, a street, a borough (or "New York"/"NYC"), an optional
/// state, and a 5-digit ZIP.
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,5}[A-Z]?\s+[\w\s.,'&/-]+?,\s*(?:Brooklyn|Bronx|Queens|Manhattan|Staten Island|New York|NYC)[\w\s.,'-]*?(?:NY)?\s*\d{5})",
    )
    .expect("address regex")
});

// ---------------------------------------------------------------------------
// Text flattening
// ---------------------------------------------------------------------------

/// Flatten an HTML fragment to text, one text node per line.
///
/// Script and style contents are dropped.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    let mut parts: Vec<&str> = Vec::new();
    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_code = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|el| matches!(el.name(), "script" | "style"));
        if !in_code {
            parts.push(text);
        }
    }

    parts.join("\n")
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract every restaurant mention from a post, in order of appearance.
#[instrument(skip_all, fields(title = %post.title))]
pub fn extract_candidates(post: &Post) -> Vec<Candidate> {
    let text = html_to_text(&post.content_html);
    let candidates = extract_from_text(&text);

    debug!(found = candidates.len(), "addresses extracted");
    candidates
}

/// Extract candidates from already-flattened text.
pub fn extract_from_text(text: &str) -> Vec<Candidate> {
    ADDRESS_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| Candidate {
            name: name_before(&text[..m.start()]),
            address: m.as_str().trim().to_string(),
            blurb: blurb_at(&text[m.start()..], m.as_str().chars().count()),
        })
        .collect()
}

/// The nearest non-blank line in `before`, trimmed.
fn name_before(before: &str) -> String {
    before
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(UNNAMED)
        .to_string()
}

/// The address plus a tail of context, flattened to one line and capped.
fn blurb_at(from_match: &str, match_chars: usize) -> String {
    let window: String = from_match
        .chars()
        .take(match_chars + BLURB_TAIL_CHARS)
        .collect();

    window
        .lines()
        .collect::<Vec<_>>()
        .join(BLURB_LINE_JOIN)
        .chars()
        .take(BLURB_MAX_CHARS)
        .collect()
}
