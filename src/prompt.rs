//! Flattens a structured chat request into the single tagged prompt string
//! the upstream engine understands.
//!
//! Every message becomes a block `<role>\n  line\n  line\n</role>\n`. When the
//! conversation opens with a system message and the request carries tools, a
//! `<tools>` block follows it that teaches the model the `<use tool="...">`
//! invocation grammar and lists the available tool schemas.

use crate::types::{ChatReq, Message};
use std::fmt::Write;

const TOOL_USE_PREAMBLE: &str = r#"USE TOOL
--------
Specify what tool to use and the required arguments in <use></use> block.
- Place tool name in "tool" attribute.
- Place tool arguments between <use> and </use>
- The tool arguments MUST be a valid JSON object that can be validated against the tool's input JSON schema.
ALWAYS check the existing facts before calling the tool, DO NOT call tools repeatedly.
Once you respond with </use>, you STOP.

<examples>
	<good_example>
		<use tool="Edit">
		{
			"file_path": "/path/to/main.py",
			"old_string": "class Snippet:\n    def __init__(self, file_path, line_no, lines):",
			"new_string": "class Snippet:\n    def __init__(self, file_path, line_no, lines, context_range=4):"
		}
		</use>
	</good_example>

	<bad_example>
		<use>
		{
			"tool": "Edit",
			"file_path": "/path/to/main.py",
			"old_string": "class Snippet:\n    def __init__(self, file_path, line_no, lines):",
			"new_string": "class Snippet:\n    def __init__(self, file_path, line_no, lines, context_range=4):"
		}
		</use>
		<reasoning>
			The tool name should be placed in "tool" attribute!
		</reasoning>
	</bad_example>

	<bad_example>
		<use tool="Read">
			<file_path>/path/to/main.go</file_path>
			<offset>116</offset>
			<limit>110</limit>
		</use>
		<reasoning>
			The tool arguments MUST be a valid JSON object.
		</reasoning>
	</bad_example>
</examples>

AVAILABLE TOOLS
---------------
"#;

/// Render the request as one prompt. Returns an empty string when there are
/// no messages; callers should not contact the engine in that case.
pub fn compose(req: &ChatReq) -> String {
    let Some((first, rest)) = req.messages.split_first() else {
        return String::new();
    };

    let mut out = String::new();
    let remaining = if first.role == "system" {
        write_tag(&mut out, &first.role, &first.content);
        if !req.tools.is_empty() {
            write_tag(&mut out, "tools", &tool_use_block(&req.tools));
        }
        rest
    } else {
        &req.messages[..]
    };

    for message in remaining {
        write_tag(&mut out, &message.role, &message_body(message));
    }
    out
}

fn tool_use_block(tools: &[serde_json::Value]) -> String {
    let schemas = serde_json::to_string_pretty(tools).unwrap_or_default();
    format!("{TOOL_USE_PREAMBLE}{schemas}")
}

fn message_body(message: &Message) -> String {
    if let Some(id) = message.tool_call_id.as_deref().filter(|id| !id.is_empty()) {
        return format!("tool_call_id: {}, content: {}", id, message.content);
    }
    match message.tool_calls.as_deref() {
        Some(calls) if !calls.is_empty() => serde_json::to_string_pretty(calls).unwrap_or_default(),
        _ => message.content.clone(),
    }
}

fn write_tag(out: &mut String, tag: &str, body: &str) {
    let _ = writeln!(out, "<{tag}>");
    for line in body.trim().split('\n') {
        let _ = writeln!(out, "  {line}");
    }
    let _ = writeln!(out, "</{tag}>");
}
