//! Deterministic vault-relative locations for remote items.

use crate::models::RemoteItem;

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces filesystem-illegal characters and whitespace with `_`, collapses
/// runs of underscores into one and trims surrounding whitespace.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let mapped = if ILLEGAL_CHARS.contains(&c) || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    out.trim().to_string()
}

/// File name a remote item is stored under.
pub fn file_name(item: &RemoteItem) -> String {
    let sanitized = sanitize_file_name(&item.name);
    if item.is_folder() {
        sanitized
    } else {
        format!("{}.md", sanitized)
    }
}

/// Vault-relative path: `folders/<name>` or `documents/<name>.md`.
pub fn local_path(item: &RemoteItem) -> String {
    if item.is_folder() {
        format!("folders/{}", file_name(item))
    } else {
        format!("documents/{}", file_name(item))
    }
}
