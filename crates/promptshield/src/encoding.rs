//! Encoding-attack preprocessing.
//!
//! Obfuscated payloads (Base64, hex, ROT13, decimal ASCII) are decoded into
//! additional candidate texts so the models score the hidden content, not
//! just the carrier text.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;

const MIN_DECODED_LEN: usize = 10;
const PRINTABLE_RATIO: f64 = 0.8;

/// Keywords gating the ROT13 variant. The set is part of the detection
/// semantics; changing it changes which inputs get expanded.
const ROT13_KEYWORDS: [&str; 6] = [
    "ignore",
    "instructions",
    "prompt",
    "system",
    "reveal",
    "show",
];

/// Expand `text` into the ordered candidate list scored by the pipeline: the
/// original text first, then at most one decoded variant per encoding family.
/// Plain text comes back as a single candidate.
pub fn expand(text: &str) -> Vec<String> {
    let mut candidates = vec![text.to_string()];
    if text.is_empty() {
        return candidates;
    }

    for decoded in [
        try_base64(text),
        try_hex(text),
        try_rot13(text),
        try_decimal_ascii(text),
    ]
    .into_iter()
    .flatten()
    {
        candidates.push(decoded);
    }

    candidates
}

fn base64_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9+/]{20,}={0,2}").unwrap())
}

fn hex_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9A-Fa-f]{20,}").unwrap())
}

fn decimal_ascii_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:\d{1,3}\s*,\s*){4,}\d{1,3}").unwrap())
}

fn try_base64(text: &str) -> Option<String> {
    for m in base64_re().find_iter(text) {
        let Ok(decoded) = STANDARD.decode(m.as_str()) else {
            continue;
        };
        let decoded = String::from_utf8_lossy(&decoded).into_owned();
        if looks_like_text(&decoded) {
            return Some(decoded);
        }
    }
    None
}

fn try_hex(text: &str) -> Option<String> {
    for m in hex_re().find_iter(text) {
        let s = m.as_str();
        if s.len() % 2 != 0 {
            continue;
        }

        let bytes: Option<Vec<u8>> = (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect();
        let Some(bytes) = bytes else {
            continue;
        };

        let decoded = String::from_utf8_lossy(&bytes).into_owned();
        if looks_like_text(&decoded) {
            return Some(decoded);
        }
    }
    None
}

fn try_rot13(text: &str) -> Option<String> {
    let decoded = rot13(text);
    let lowered = decoded.to_lowercase();
    let hits = ROT13_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .count();
    (hits >= 2).then_some(decoded)
}

fn try_decimal_ascii(text: &str) -> Option<String> {
    for m in decimal_ascii_re().find_iter(text) {
        let mut bytes = Vec::new();
        for token in m.as_str().split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if let Ok(n) = token.parse::<u32>() {
                if (32..=126).contains(&n) {
                    bytes.push(n as u8);
                }
            }
        }

        let decoded = String::from_utf8_lossy(&bytes).into_owned();
        if looks_like_text(&decoded) {
            return Some(decoded);
        }
    }
    None
}

fn rot13(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'a'..='z' => (b'a' + (c as u8 - b'a' + 13) % 26) as char,
            'A'..='Z' => (b'A' + (c as u8 - b'A' + 13) % 26) as char,
            _ => c,
        })
        .collect()
}

fn looks_like_text(s: &str) -> bool {
    let total = s.chars().count();
    if total <= MIN_DECODED_LEN {
        return false;
    }
    let printable = s.chars().filter(|c| (' '..='~').contains(c)).count();
    printable as f64 / total as f64 > PRINTABLE_RATIO
}
