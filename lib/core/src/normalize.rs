//! Text canonicalization for attribute matching
//!
//! Both queries and candidate terms pass through the same normalization
//! before any comparison, so "Rebar Size", "rebar_size" and "rebar-size"
//! all land on the canonical form "rebar size".

/// Canonicalize free text: lowercase, separators to spaces, punctuation
/// stripped, whitespace collapsed and trimmed.
///
/// Total and idempotent: `normalize(normalize(t)) == normalize(t)` for all
/// input. Empty or whitespace-only input normalizes to an empty string,
/// which callers treat as "no meaningful query".
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        let ch = match ch {
            '_' | '-' => ' ',
            c => c,
        };
        if ch.is_whitespace() {
            if !out.is_empty() {
                pending_space = true;
            }
            continue;
        }
        if !ch.is_alphanumeric() {
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        for lc in ch.to_lowercase() {
            out.push(lc);
        }
    }

    out
}
