// src/ingest/types.rs
use anyhow::Result;

/// One entry of the vulnerability feed, as handed to the matcher.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,        // link, or sha256 of title + published
    pub title: String,     // normalized title
    pub link: String,      // may be empty when the feed omits it
    pub published: String, // verbatim from the feed
    pub categories: Vec<String>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed once. An unreachable or unparseable feed is an error.
    async fn fetch_items(&self) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &str;
}
