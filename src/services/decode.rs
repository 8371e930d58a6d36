// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort recovery of a human-readable title from an opaque attraction id.
//!
//! Attraction ids are inconsistent across sources: sometimes a clean catalog
//! key, sometimes a title packed as hex or base64 by a legacy provider. This
//! module tries an ordered list of decode strategies and extracts the longest
//! printable segment from whichever decode succeeds.
//!
//! Pure and deterministic: no I/O, no randomness, same input always yields
//! the same output.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Minimum sanitized title length to accept a decoded segment.
const MIN_TITLE_LEN: usize = 4;

/// The printable run must cover more than this share of the decoded text.
/// A decode that is mostly binary junk with a short printable island is
/// rejected even if the island itself looks like text.
const PRINTABLE_RATIO_PERCENT: usize = 60;

type DecodeStrategy = fn(&str) -> Option<String>;

/// Decode strategies, tried in order. First one whose output yields a clean
/// title wins; adding a new legacy encoding means adding one entry here.
const STRATEGIES: &[DecodeStrategy] = &[decode_hex, decode_base64];

/// Decode a best-effort human title from a raw attraction id.
///
/// Returns an empty string when nothing usable can be recovered; callers
/// substitute a literal fallback label.
pub fn decode_title(raw: &str) -> String {
    for strategy in STRATEGIES {
        if let Some(decoded) = strategy(raw) {
            if let Some(title) = extract_title(&decoded) {
                return title;
            }
        }
    }

    // The id may simply be readable text already.
    extract_title(raw).unwrap_or_default()
}

/// Hex strategy: even length, hex digits only.
fn decode_hex(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.len() % 2 != 0 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = hex::decode(raw).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Base64 strategy: standard alphabet, padding only at the end.
fn decode_base64(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.len() % 4 != 0 {
        return None;
    }
    let body = raw.trim_end_matches('=');
    if raw.len() - body.len() > 2 {
        return None;
    }
    if !body
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
    {
        return None;
    }
    let bytes = STANDARD.decode(raw).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Characters considered printable for title extraction.
fn is_printable(c: char) -> bool {
    c.is_alphanumeric() || c == ' ' || c.is_ascii_punctuation()
}

/// Extract and sanitize the longest printable run from `text`.
///
/// Accepts the run only if it covers more than 60% of the text and the
/// sanitized result is at least 4 characters.
fn extract_title(text: &str) -> Option<String> {
    let total: usize = text.chars().count();
    if total == 0 {
        return None;
    }

    let mut best = String::new();
    let mut best_len = 0usize;
    let mut current = String::new();
    let mut current_len = 0usize;

    for c in text.chars() {
        if is_printable(c) {
            current.push(c);
            current_len += 1;
        } else {
            if current_len > best_len {
                best = std::mem::take(&mut current);
                best_len = current_len;
            } else {
                current.clear();
            }
            current_len = 0;
        }
    }
    if current_len > best_len {
        best = current;
        best_len = current_len;
    }

    if best_len * 100 <= total * PRINTABLE_RATIO_PERCENT {
        return None;
    }

    let sanitized = sanitize(&best);
    if sanitized.chars().count() < MIN_TITLE_LEN {
        return None;
    }
    Some(sanitized)
}

/// Collapse whitespace runs to single spaces and strip leading/trailing
/// non-alphanumeric characters.
fn sanitize(segment: &str) -> String {
    let collapsed = segment.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}
