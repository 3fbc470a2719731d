// src/notify/adaptive_card.rs
//! Wire envelope for adaptive-card chat webhooks. Field names and nesting are fixed
//! by the receiving platform.
use serde::Serialize;

const MESSAGE_TYPE: &str = "Message";
const CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
const CARD_TYPE: &str = "AdaptiveCard";
const CARD_VERSION: &str = "1.2";
const TEXT_BLOCK: &str = "TextBlock";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdaptiveCardMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Attachment {
    #[serde(rename = "contentType")]
    content_type: &'static str,
    content: CardContent,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct CardContent {
    #[serde(rename = "$schema")]
    schema: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    version: &'static str,
    body: Vec<TextBlock>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct TextBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    wrap: bool,
}

impl AdaptiveCardMessage {
    /// Single wrapped text block card.
    pub fn text_block(text: &str) -> Self {
        Self {
            kind: MESSAGE_TYPE,
            attachments: vec![Attachment {
                content_type: CARD_CONTENT_TYPE,
                content: CardContent {
                    schema: CARD_SCHEMA,
                    kind: CARD_TYPE,
                    version: CARD_VERSION,
                    body: vec![TextBlock {
                        kind: TEXT_BLOCK,
                        text: text.to_string(),
                        wrap: true,
                    }],
                },
            }],
        }
    }
}
