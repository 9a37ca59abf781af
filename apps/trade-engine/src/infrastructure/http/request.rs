//! HTTP request bodies.

use serde::Deserialize;

/// Body for `POST /api/v1/chat/command`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCommandRequest {
    /// The user's free-text chat message.
    pub text: String,
    /// Conversation to append this command to. A fresh id is minted when
    /// omitted.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Whether the reasoner should fold in live news context, once wired.
    #[serde(default)]
    pub news_enabled: Option<bool>,
    /// Lookback window, in hours, for news/market context.
    #[serde(default)]
    pub lookback_hours: Option<u32>,
}
