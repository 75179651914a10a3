//! URL extraction from generated card text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::record::{AnalysisResult, Card};

static RE_BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)\]]+").unwrap());
static RE_MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

/// Full-width punctuation that ends a URL written inside CJK prose.
const CJK_TERMINATORS: &[char] = &[
    '。', '，', '、', '；', '：', '！', '？', '」', '』', '）', '》', '】', '“', '”', '‘', '’',
];

const TRAILING_ASCII: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', '>', '*', '_', '`'];

/// Extracts URLs from one piece of text: bare URLs first, then markdown link
/// targets, in order of appearance. May contain duplicates.
pub fn extract_urls(text: &str) -> Vec<String> {
    let bare = RE_BARE_URL
        .find_iter(text)
        .filter_map(|m| clean_bare(m.as_str()));

    let markdown = RE_MARKDOWN_LINK
        .captures_iter(text)
        .filter_map(|c| c.get(2))
        .filter_map(|m| clean_markdown_target(m.as_str()));

    bare.chain(markdown).collect()
}

/// Deduplicated URLs across every text-bearing field of one card.
pub fn card_urls(card: &Card) -> Vec<String> {
    dedupe(card.text_fields().flat_map(extract_urls))
}

/// Deduplicated URLs across all cards, in first-seen order.
pub fn result_urls(result: &AnalysisResult) -> Vec<String> {
    dedupe(result.cards.iter().flat_map(card_urls))
}

fn dedupe(urls: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.filter(|u| seen.insert(u.clone())).collect()
}

fn clean_bare(raw: &str) -> Option<String> {
    let cut = raw.find(CJK_TERMINATORS).unwrap_or(raw.len());
    let url = raw[..cut].trim_end_matches(TRAILING_ASCII);
    is_absolute_http(url).then(|| url.to_string())
}

fn clean_markdown_target(raw: &str) -> Option<String> {
    // [label](<url> "title")
    let target = raw.trim().split_whitespace().next()?;
    let target = target.trim_start_matches('<').trim_end_matches('>');
    is_absolute_http(target).then(|| target.to_string())
}

fn is_absolute_http(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.starts_with('/'))
}
