// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Prompt/response protocol adapter.
//!
//! Two pure functions tie the tool registry to the model: [`build_tool_prompt`]
//! renders the current tool list into a system instruction, and
//! [`parse_tool_call`] scans model output for the delimited tool-call marker.
//!
//! Models routinely mangle the marker syntax, so extraction runs an ordered
//! list of candidate strategies (each a pure `text -> Option<raw json>`
//! function) and takes the first one that yields valid JSON. Parse failures
//! never raise; the orchestrator treats unparseable output as a final answer.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::mcp::McpToolInfo;
use crate::types::ToolCall;

/// Opening delimiter of the tool-call marker.
pub const TOOL_CALL_OPEN: &str = "<tool_call>";

/// Closing delimiter of the tool-call marker.
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";

/// Build the system instruction for the given tool list.
///
/// With no tools this is a plain assistant instruction; otherwise one line
/// per tool (`name(param: type, ...): description`) followed by the fixed
/// marker-syntax instruction block.
pub fn build_tool_prompt(tools: &[McpToolInfo]) -> String {
    if tools.is_empty() {
        return "You are a helpful AI assistant. Answer questions clearly and concisely."
            .to_string();
    }

    let tool_descriptions = tools
        .iter()
        .map(|tool| {
            let params = tool
                .input_schema
                .get("properties")
                .and_then(|p| p.as_object())
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, prop)| {
                            let type_name = prop
                                .get("type")
                                .and_then(|t| t.as_str())
                                .unwrap_or("any");
                            format!("{}: {}", name, type_name)
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!(
                "- {}({}): {}",
                tool.name,
                params,
                tool.description.as_deref().unwrap_or("No description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a helpful AI assistant with access to tools.

AVAILABLE TOOLS:
{tool_descriptions}

INSTRUCTIONS:
1. When you need to use a tool, respond ONLY with the tool call in this exact format:
<tool_call>{{"name": "tool_name", "arguments": {{"arg1": "value"}}}}</tool_call>

2. Do NOT include any other text when making a tool call.
3. Wait for the tool result before continuing.
4. After receiving tool results, provide a helpful response to the user.
5. Only use tools when necessary to answer the user's question."#
    )
}

static WELL_FORMED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tool_call>(.*?)</tool_call>").expect("valid regex"));

static MALFORMED_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tool_call>(.*?)>\s*</tool_call>").expect("valid regex"));

/// Strategy 1: a well-formed open/close pair.
fn extract_well_formed(text: &str) -> Option<String> {
    WELL_FORMED
        .captures(text)
        .map(|c| c[1].to_string())
}

/// Strategy 2: the closing delimiter lost its slash.
fn extract_malformed_close(text: &str) -> Option<String> {
    MALFORMED_CLOSE
        .captures(text)
        .map(|c| c[1].to_string())
}

/// Strategy 3: an open delimiter with no close; capture up to and including
/// the first balanced closing brace.
fn extract_unclosed(text: &str) -> Option<String> {
    let after = &text[text.find(TOOL_CALL_OPEN)? + TOOL_CALL_OPEN.len()..];
    let start = after.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in after[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(after[start..start + i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Candidate extraction strategies, in priority order.
const EXTRACTORS: &[fn(&str) -> Option<String>] = &[
    extract_well_formed,
    extract_malformed_close,
    extract_unclosed,
];

/// Trim the candidate and strip at most one stray trailing `>` (the
/// malformed-close variant's leftover).
fn clean_candidate(candidate: &str) -> &str {
    let trimmed = candidate.trim();
    match trimmed.strip_suffix('>') {
        Some(stripped) => stripped.trim_end(),
        None => trimmed,
    }
}

/// Scan model output for a tool-call marker.
///
/// Returns `Some` only when a marker is found, its payload parses as a JSON
/// object with a `name` field, and the argument payload (under `arguments`
/// or `parameters`, in that priority order, defaulting to an empty mapping)
/// is itself a mapping. Everything else returns `None` — logged, never
/// raised.
pub fn parse_tool_call(text: &str) -> Option<ToolCall> {
    let mut raw = None;
    for extract in EXTRACTORS {
        if let Some(candidate) = extract(text) {
            let cleaned = clean_candidate(&candidate);
            match serde_json::from_str::<serde_json::Value>(cleaned) {
                Ok(value) => {
                    raw = Some(value);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "tool-call candidate was not valid JSON, trying next strategy");
                }
            }
        }
    }
    let value = raw?;

    let object = value.as_object()?;
    let name = match object.get("name").and_then(|n| n.as_str()) {
        Some(name) => name.to_string(),
        None => {
            warn!("tool-call marker is missing a 'name' field");
            return None;
        }
    };

    let arguments = match object.get("arguments").or_else(|| object.get("parameters")) {
        None => serde_json::Map::new(),
        Some(args) => match args.as_object() {
            Some(map) => map.clone(),
            None => {
                warn!(tool = %name, "tool-call arguments are not a mapping");
                return None;
            }
        },
    };

    Some(ToolCall { name, arguments })
}
