//! Best-effort recovery of the oracle's JSON reply from free text.

use serde_json::Value;

use crate::instruction::Instruction;

type Strategy = fn(&str) -> Option<Value>;

/// Tried in order; the first strategy yielding a JSON object wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("fenced", from_fenced_block),
    ("brace_span", from_brace_span),
    ("direct", direct),
];

/// Body of the first ``` fenced block, with or without a language tag.
fn from_fenced_block(raw: &str) -> Option<Value> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let tag = after[..body_start].trim();
    // A tag like `json` sits on the fence line; anything longer is content.
    let body = if tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        &after[body_start..]
    } else {
        after
    };
    let end = body.find("```")?;
    parse_object(body[..end].trim())
}

/// From the first `{` to the last `}`.
fn from_brace_span(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&raw[start..=end])
}

fn direct(raw: &str) -> Option<Value> {
    parse_object(raw.trim())
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(v @ Value::Object(_)) => Some(v),
        _ => None,
    }
}

/// Run the strategy chain over raw oracle text.
pub fn extract_json(raw: &str) -> Option<Value> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(raw);
        if found.is_some() {
            tracing::debug!(strategy = name, "extracted oracle JSON");
        }
        found
    })
}

// ---------------------------------------------------------------------------
// OracleReply
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct OracleReply {
    pub message: Option<String>,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    /// No strategy produced a JSON object.
    Unparseable,
    /// JSON object without an `instructions` array; carries the oracle's
    /// own `message` if it sent one.
    MissingInstructions { message: Option<String> },
}

pub fn parse_reply(raw: &str) -> Result<OracleReply, ReplyError> {
    let value = extract_json(raw).ok_or(ReplyError::Unparseable)?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    let Some(items) = value.get("instructions").and_then(Value::as_array) else {
        return Err(ReplyError::MissingInstructions { message });
    };
    let instructions = items
        .iter()
        .cloned()
        .map(Instruction::from_value_lenient)
        .collect();
    Ok(OracleReply {
        message,
        instructions,
    })
}
