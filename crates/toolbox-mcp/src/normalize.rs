use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use toolbox_core::HandlerResponse;

/// One item of tool output. Only text items are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
}

/// The `result` of a successful `tools/call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContent {
    pub content: Vec<ContentItem>,
    pub is_error: bool,
}

/// Flatten a handler response into tool content.
///
/// The body is embedded verbatim as a single text item whatever its content
/// type, so JSON bodies arrive as their raw text. `is_error` is set for any
/// status outside `200..=299`.
pub fn normalize(response: &HandlerResponse) -> ToolContent {
    ToolContent {
        content: vec![ContentItem::Text {
            text: response.body_text(),
        }],
        is_error: !response.is_success(),
    }
}

impl From<ToolContent> for Value {
    fn from(tool_content: ToolContent) -> Self {
        let items: Vec<Value> = tool_content
            .content
            .into_iter()
            .map(|ContentItem::Text { text }| json!({"type": "text", "text": text}))
            .collect();
        json!({"content": items, "isError": tool_content.is_error})
    }
}
