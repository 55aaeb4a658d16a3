//! Atlassian Document Format: the rich-text body Jira v3 requires for
//! comments and worklog comments.

use serde_json::{json, Value};

/// A document built from paragraphs of plain text and mentions.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    paragraphs: Vec<Vec<Value>>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            paragraphs: Vec::new(),
        }
    }

    /// Single-paragraph document, or `None` for empty text.
    pub fn from_text(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let mut doc = Document::new();
        doc.paragraph(text);
        Some(doc)
    }

    /// Appends a paragraph and returns its index for [`Document::mention`].
    pub fn paragraph(&mut self, text: &str) -> usize {
        self.paragraphs.push(vec![json!({ "type": "text", "text": text })]);
        self.paragraphs.len() - 1
    }

    /// Puts a mention of `account_id` at the start of paragraph `index`.
    pub fn mention(&mut self, index: usize, account_id: &str) {
        if let Some(paragraph) = self.paragraphs.get_mut(index) {
            let node = json!({ "type": "mention", "attrs": { "id": account_id } });
            paragraph.insert(0, node);
            paragraph.insert(1, json!({ "type": "text", "text": " " }));
        }
    }

    pub fn to_value(&self) -> Value {
        let content: Vec<Value> = self
            .paragraphs
            .iter()
            .map(|nodes| json!({ "type": "paragraph", "content": nodes }))
            .collect();
        json!({ "type": "doc", "version": 1, "content": content })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Flattens an ADF tree to plain text: paragraph-like blocks become lines,
/// mentions render as their display text.
pub fn to_plain_text(node: &Value) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out.trim_end().to_string()
}

fn collect_text(node: &Value, out: &mut String) {
    match node.get("type").and_then(Value::as_str) {
        Some("text") => {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
        Some("mention") => {
            let label = node
                .pointer("/attrs/text")
                .and_then(Value::as_str)
                .unwrap_or("@someone");
            out.push_str(label);
        }
        Some("hardBreak") => out.push('\n'),
        _ => {}
    }

    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_text(child, out);
        }
    }

    if let Some("paragraph" | "heading" | "codeBlock" | "listItem") =
        node.get("type").and_then(Value::as_str)
    {
        out.push('\n');
    }
}
