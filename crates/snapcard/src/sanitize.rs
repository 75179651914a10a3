//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Image references can be signed URLs; logs must never carry their query
//! strings or embedded credentials.

/// Reduces an image reference to `host/…/file-name`.
///
/// - `https://cdn.example.com/screens/123-ab.jpg?token=x` → `cdn.example.com/…/123-ab.jpg`
/// - `123-ab.jpg` → `123-ab.jpg`
pub fn redact_image_ref(image_ref: &str) -> String {
    let without_query = strip_query(image_ref);

    let Some(scheme_end) = without_query.find("://") else {
        return last_segment(without_query).to_string();
    };

    let rest = &without_query[scheme_end + 3..];
    let (authority, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, ""),
    };
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let file = last_segment(path);

    if file.is_empty() {
        host.to_string()
    } else {
        format!("{}/…/{}", host, file)
    }
}

/// Strips userinfo and query string from a URL, keeping scheme, host and path.
///
/// Used for hallucinated-link log lines where the full path is useful.
pub fn redact_url(url: &str) -> String {
    let without_query = strip_query(url);
    if let Some(scheme_end) = without_query.find("://") {
        let after_scheme = &without_query[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].rfind('@') {
            let scheme = &without_query[..scheme_end + 3];
            return format!("{}****@{}", scheme, &after_scheme[at_pos + 1..]);
        }
    }
    without_query.to_string()
}

/// Shortens model output for log lines, respecting char boundaries.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}… ({} bytes total)", &text[..byte_idx], text.len()),
        None => text.to_string(),
    }
}

fn strip_query(value: &str) -> &str {
    let end = value.find(['?', '#']).unwrap_or(value.len());
    &value[..end]
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}
