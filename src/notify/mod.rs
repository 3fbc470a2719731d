pub mod adaptive_card;
pub mod webhook;

use crate::matcher::MatchResult;

pub use adaptive_card::AdaptiveCardMessage;
pub use webhook::{DeliveryOutcome, DispatchReport, Dispatcher};

/// Rendered notification text for one matched feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    pub text: String,
}

impl NotificationPayload {
    pub fn to_card(&self) -> AdaptiveCardMessage {
        AdaptiveCardMessage::text_block(&self.text)
    }
}

/// Render the card text from the matched item only.
pub fn format_notification(m: &MatchResult) -> NotificationPayload {
    let item = &m.item;
    let mut lines = Vec::with_capacity(5);
    lines.push(format!("Title: {}", item.title));
    lines.push(format!("Matched keywords: {}", m.keywords.join(", ")));
    if !item.categories.is_empty() {
        lines.push(format!("Categories: {}", item.categories.join(", ")));
    }
    let link = if item.link.is_empty() { "n/a" } else { item.link.as_str() };
    lines.push(format!("Link: {link}"));
    let published = if item.published.is_empty() {
        "unknown"
    } else {
        item.published.as_str()
    };
    lines.push(format!("Published Date: {published}"));

    NotificationPayload {
        text: lines.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::FeedItem;

    fn sample(categories: Vec<String>, published: &str) -> MatchResult {
        MatchResult {
            item: FeedItem {
                id: "https://vuldb.com/?id.1".into(),
                title: "Trend Micro Apex One Remote Code Execution".into(),
                link: "https://vuldb.com/?id.1".into(),
                published: published.into(),
                categories,
            },
            keywords: vec!["apex one".into(), "trend micro".into()],
        }
    }

    #[test]
    fn renders_item_fields_in_order() {
        let p = format_notification(&sample(
            vec!["Remote".into(), "critical".into()],
            "Tue, 13 Oct 2026 08:00:00 +0000",
        ));
        assert_eq!(
            p.text,
            "Title: Trend Micro Apex One Remote Code Execution\n\
             Matched keywords: apex one, trend micro\n\
             Categories: Remote, critical\n\
             Link: https://vuldb.com/?id.1\n\
             Published Date: Tue, 13 Oct 2026 08:00:00 +0000"
        );
    }

    #[test]
    fn no_categories_line_and_unknown_date() {
        let p = format_notification(&sample(vec![], ""));
        assert!(!p.text.contains("Categories:"));
        assert!(p.text.ends_with("Published Date: unknown"));
    }

    #[test]
    fn no_fixed_vendor_text() {
        let p = format_notification(&sample(vec![], "x"));
        assert!(!p.text.contains("Vendor:"));
        assert!(!p.text.contains("Risk:"));
    }
}
