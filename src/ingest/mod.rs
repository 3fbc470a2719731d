// src/ingest/mod.rs
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

/// Normalize a feed title: collapse whitespace runs and trim.
///
/// The XML parser has already resolved entities once; the text is otherwise
/// kept verbatim, including anything that looks like markup.
pub fn normalize_title(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}

/// Stable identifier for a feed entry.
/// The link is used when present; otherwise a SHA-256 over title and published date.
pub fn item_id(link: &str, title: &str, published: &str) -> String {
    let link = link.trim();
    if !link.is_empty() {
        return link.to_string();
    }
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(published.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

/// Trim categories and drop blanks, keeping feed order.
pub fn clean_categories<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|c| c.as_ref().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
