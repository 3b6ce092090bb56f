//! String-embedded control markers.
//!
//! Two literal marker forms travel inside otherwise plain-text strings:
//!
//! - `[SEND_FILE:<path>]` — a generated artifact the transport layer must
//!   deliver to the user and delete after send;
//! - `[LARGE_RESULT_SET:<fingerprint>]` — a cached result set the model can
//!   page through or export.
//!
//! The exact syntax is a wire contract: the model is instructed to parse
//! these textually, and the transport layer scans final replies for them.
//! Parsing is a plain substring scan; markers never nest and never contain
//! `]`.

use std::path::PathBuf;

pub const SEND_FILE_PREFIX: &str = "[SEND_FILE:";
pub const LARGE_RESULT_SET_PREFIX: &str = "[LARGE_RESULT_SET:";

/// Format a file-delivery marker for the given path.
pub fn send_file(path: &std::path::Path) -> String {
    format!("{SEND_FILE_PREFIX}{}]", path.display())
}

/// Format a large-result marker for the given fingerprint.
pub fn large_result_set(fingerprint: &str) -> String {
    format!("{LARGE_RESULT_SET_PREFIX}{fingerprint}]")
}

/// Extract every `[SEND_FILE:...]` path from a string, in order.
pub fn extract_send_files(text: &str) -> Vec<PathBuf> {
    extract(text, SEND_FILE_PREFIX).into_iter().map(PathBuf::from).collect()
}

/// Extract every `[LARGE_RESULT_SET:...]` fingerprint from a string, in order.
pub fn extract_fingerprints(text: &str) -> Vec<String> {
    extract(text, LARGE_RESULT_SET_PREFIX)
}

/// Remove every `[SEND_FILE:...]` marker from a string, trimming any
/// whitespace the removal leaves dangling at the ends.
pub fn strip_send_files(text: &str) -> String {
    strip(text, SEND_FILE_PREFIX)
}

fn extract(text: &str, prefix: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(prefix) {
        let after = &rest[start + prefix.len()..];
        match after.find(']') {
            Some(end) => {
                out.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            // Unterminated marker: treat as plain text
            None => break,
        }
    }
    out
}

fn strip(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(prefix) {
        out.push_str(&rest[..start]);
        let after = &rest[start + prefix.len()..];
        match after.find(']') {
            Some(end) => rest = &after[end + 1..],
            None => {
                rest = &rest[start..];
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}
