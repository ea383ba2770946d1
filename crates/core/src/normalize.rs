/// Literal substrings replaced by a space, applied in this order.
///
/// Replacement is substring based, not word based: `ltd` is stripped from
/// inside `saltdale` as well.
pub const STOP_TOKENS: [&str; 7] = [".", ",", "&", "ltd", "pvt", "online", "india"];

/// Canonicalizes a vendor name for comparison: lowercase, trimmed, stop
/// tokens replaced by spaces, whitespace runs collapsed.
pub fn normalize_text(raw: &str) -> String {
    let mut s = raw.to_lowercase().trim().to_string();
    for token in STOP_TOKENS {
        if s.contains(token) {
            s = s.replace(token, " ");
        }
    }
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Missing vendor names normalize to the empty string.
pub fn normalize_vendor(raw: Option<&str>) -> String {
    raw.map(normalize_text).unwrap_or_default()
}
