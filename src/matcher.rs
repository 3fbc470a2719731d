//! Keyword matching against feed titles.
//!
//! Plain case-insensitive substring containment: no tokenization, no regex.

use crate::ingest::types::FeedItem;

/// A feed item together with the keywords found in its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub item: FeedItem,
    pub keywords: Vec<String>,
}

/// Keywords (in configured order) that occur in `title`, ignoring case.
/// Case-insensitive duplicates in `keywords` are reported once.
pub fn matching_keywords<'k>(title: &str, keywords: &'k [String]) -> Vec<&'k str> {
    let haystack = title.to_lowercase();
    let mut hits: Vec<&'k str> = Vec::new();
    let mut hit_lower: Vec<String> = Vec::new();
    for kw in keywords {
        let needle = kw.to_lowercase();
        if hit_lower.contains(&needle) {
            continue;
        }
        if haystack.contains(&needle) {
            hits.push(kw.as_str());
            hit_lower.push(needle);
        }
    }
    hits
}

/// Match one item; `None` means the item is dropped.
pub fn match_item(item: &FeedItem, keywords: &[String]) -> Option<MatchResult> {
    let hits = matching_keywords(&item.title, keywords);
    if hits.is_empty() {
        return None;
    }
    Some(MatchResult {
        item: item.clone(),
        keywords: hits.into_iter().map(str::to_string).collect(),
    })
}
