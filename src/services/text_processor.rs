// Text Processing Service
// Owns every text-cleaning rule: normalisation, sentence splitting and word extraction.

use crate::models::TokenSet;
use regex::Regex;
use std::sync::OnceLock;

/// Abbreviations that never close a sentence, whatever follows them.
/// Dotted forms are matched without their final dot ("e.g.").
const TITLE_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e",
];

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{3000}\u{00A0}\u{2007}\u{202F}]").expect("space regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0C\x0B]+").expect("whitespace regex"))
}

/// Normalize punctuation and whitespace before tokenisation
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s = text.to_string();

    // Replace smart quotes
    s = s.replace('\u{201c}', "\"")
         .replace('\u{201d}', "\"")
         .replace('\u{2018}', "'")
         .replace('\u{2019}', "'");

    // Dashes and the single-glyph ellipsis
    s = s.replace('\u{2014}', "-")
         .replace('\u{2013}', "-")
         .replace('\u{2026}', "...");

    s = space_re().replace_all(&s, " ").to_string();

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    s = horizontal_ws_re().replace_all(&s, " ").to_string();

    s = s.lines()
         .map(|ln| ln.trim())
         .collect::<Vec<_>>()
         .join("\n");

    s.trim().to_string()
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '}')
}

fn has_word_char(s: &str) -> bool {
    s.chars().any(|c| c.is_alphanumeric())
}

/// Last whitespace-delimited token before a trailing '.', lowercased.
fn ends_with_title_abbreviation(buffer: &str) -> bool {
    let Some(stem) = buffer.strip_suffix('.') else {
        return false;
    };
    let last = stem
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    TITLE_ABBREVIATIONS.contains(&last.as_str())
}

/// Split text into sentences.
///
/// A run of `.`, `!`, `?` (plus trailing closing quotes or brackets) is one
/// boundary. The run is not a boundary when it sits between two digits, is
/// glued to the next word, follows a title abbreviation, or is followed by
/// lowercase text (abbreviations and ellipses mid-sentence). Fragments without
/// any word character are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut buffer = String::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        buffer.push(ch);

        if !is_terminal(ch) {
            i += 1;
            continue;
        }

        // Decimal numbers
        if ch == '.' && i > 0 && i + 1 < chars.len()
            && chars[i - 1].is_ascii_digit() && chars[i + 1].is_ascii_digit()
        {
            i += 1;
            continue;
        }

        let run_start = i;
        while i + 1 < chars.len() && (is_terminal(chars[i + 1]) || is_closing(chars[i + 1])) {
            i += 1;
            buffer.push(chars[i]);
        }

        let glued = chars.get(i + 1).map(|c| c.is_alphanumeric()).unwrap_or(false);
        let single_dot = run_start == i && ch == '.';
        let next_visible = chars[i + 1..].iter().find(|c| !c.is_whitespace());
        let continues_lowercase = next_visible.map(|c| c.is_lowercase()).unwrap_or(false);

        let is_boundary = !glued
            && !(single_dot && ends_with_title_abbreviation(&buffer))
            && !continues_lowercase;

        if is_boundary {
            let sentence = buffer.trim();
            if has_word_char(sentence) {
                sentences.push(sentence.to_string());
            }
            buffer.clear();
        }

        i += 1;
    }

    let remaining = buffer.trim();
    if has_word_char(remaining) {
        sentences.push(remaining.to_string());
    }

    sentences
}

/// Split text into words on whitespace, stripping surrounding punctuation.
/// Inner apostrophes, hyphens and dots survive ("don't", "well-known").
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

/// Case-folded key used for uniqueness comparisons.
pub fn fold_case(word: &str) -> String {
    word.to_lowercase()
}

/// Build the token set for a document. Never fails; blank input yields an empty set.
pub fn tokenize(text: &str) -> TokenSet {
    let normalized = normalize_punctuation(text);
    if normalized.is_empty() {
        return TokenSet::default();
    }

    TokenSet {
        words: split_words(&normalized),
        sentences: split_sentences(&normalized),
    }
}
