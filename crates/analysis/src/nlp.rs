use linkify::{LinkFinder, LinkKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// A single emoji code point: pictographs, skin-tone modifiers and
/// regional indicators.
static EMOJI_CHAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{Extended_Pictographic}\u{1F3FB}-\u{1F3FF}\u{1F1E6}-\u{1F1FF}]$")
        .expect("emoji char pattern is valid")
});

/// Runs of emoji code points plus the joiners and selectors that glue
/// multi-code-point emoji together.
static EMOJI_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\p{Extended_Pictographic}\u{1F3FB}-\u{1F3FF}\u{1F1E6}-\u{1F1FF}\u{200D}\u{FE0F}\u{20E3}]+",
    )
    .expect("emoji run pattern is valid")
});

static HTTP_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http\S+").expect("http link pattern is valid"));

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

/// Whether `c` is an emoji code point.
pub fn is_emoji(c: char) -> bool {
    if c.is_ascii() {
        return false;
    }
    let mut buf = [0u8; 4];
    EMOJI_CHAR.is_match(c.encode_utf8(&mut buf))
}

/// Emoji code points of `text`, in order.
pub fn emojis(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter(|c| is_emoji(*c))
}

/// URLs found in `text`, including bare domains such as `example.org/a`.
pub fn extract_urls(text: &str) -> Vec<&str> {
    let mut finder = LinkFinder::new();
    finder.url_must_have_scheme(false).kinds(&[LinkKind::Url]);
    finder.links(text).map(|link| link.as_str()).collect()
}

/// Remove every emoji sequence.
pub fn strip_emojis(text: &str) -> String {
    EMOJI_RUN.replace_all(text, "").into_owned()
}

/// Remove everything from `http` to the next whitespace.
pub fn strip_links(text: &str) -> String {
    HTTP_LINK.replace_all(text, "").into_owned()
}

/// Remove digit runs.
pub fn strip_digits(text: &str) -> String {
    DIGITS.replace_all(text, "").into_owned()
}

/// Message text as it enters the training table: emojis, links and digits
/// removed, in that order.
pub fn clean_for_training(text: &str) -> String {
    strip_digits(&strip_links(&strip_emojis(text)))
}

/// Whitespace token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased token with surrounding punctuation removed, for lexicon
/// lookups. Inner punctuation (`well-known`, `don't`) is kept.
pub fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '-')
        .trim_matches(|c: char| c == '-')
        .to_lowercase()
}
