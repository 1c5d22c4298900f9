//! Fallback extraction of tool calls from free-form model text.
//!
//! When the provider returns no structured tool call, the call is often
//! still in the reply, rendered as a fenced code block, an XML-style tag, or
//! bare JSON. Three strategies run in order and the first hit wins. The
//! extractor never panics on malformed input; anything that does not parse
//! simply falls through to the next strategy.

use crate::story::now_millis;
use crate::validate::RawCall;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

lazy_static! {
    static ref FENCED_CALL: Regex = Regex::new(
        r#"(?is)```(?:json|tool_code)?\s*(\{.*?"tool_name".*?\})\s*```"#
    )
    .expect("valid regex");
    static ref TAGGED_CALL: Regex = Regex::new(
        r"(?is)<(?:tool_call|execute_tool)>\s*(.*?)\s*</(?:tool_call|execute_tool)>"
    )
    .expect("valid regex");
}

/// Which strategy found the call. Useful in logs when tuning prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    FencedBlock,
    TaggedBlock,
    BareJson,
}

/// A tool call recovered from free text, plus the reply with the call's
/// span removed.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub call: RawCall,
    pub cleaned_text: String,
    pub strategy: ExtractionStrategy,
}

/// Try to recover a tool call from a free-form reply.
///
/// Returns `None` when no strategy finds a parseable call; the caller keeps
/// the full reply text for diagnostics in that case.
pub fn extract_tool_call(text: &str) -> Option<Extracted> {
    if let Some(m) = FENCED_CALL.captures(text) {
        let whole = m.get(0).expect("group 0");
        if let Some(call) = parse_call(m.get(1).expect("group 1").as_str()) {
            debug!(strategy = "fenced", name = %call.name, "recovered tool call from text");
            return Some(Extracted {
                call,
                cleaned_text: remove_span(text, whole.start(), whole.end()),
                strategy: ExtractionStrategy::FencedBlock,
            });
        }
    }

    if let Some(m) = TAGGED_CALL.captures(text) {
        let whole = m.get(0).expect("group 0");
        let inner = m.get(1).expect("group 1").as_str();
        // The tag body is sometimes itself fenced.
        let inner = inner
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        if let Some(json) = first_balanced_object(inner) {
            if let Some(call) = parse_call(json) {
                debug!(strategy = "tagged", name = %call.name, "recovered tool call from text");
                return Some(Extracted {
                    call,
                    cleaned_text: remove_span(text, whole.start(), whole.end()),
                    strategy: ExtractionStrategy::TaggedBlock,
                });
            }
        }
    }

    // Bare JSON anywhere in the reply. Brace matching is string-aware, so
    // braces inside string values (chapter prose often has them) do not
    // derail the scan.
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        match balanced_object_at(text, start) {
            Some(end) => {
                let candidate = &text[start..end];
                if candidate.contains("\"tool_name\"") {
                    if let Some(call) = parse_call(candidate) {
                        debug!(strategy = "bare", name = %call.name, "recovered tool call from text");
                        return Some(Extracted {
                            call,
                            cleaned_text: remove_span(text, start, end),
                            strategy: ExtractionStrategy::BareJson,
                        });
                    }
                }
                search_from = start + 1;
            }
            None => search_from = start + 1,
        }
    }

    None
}

/// Parse a JSON object of the form `{"tool_name": ..., "args"|"tool_params":
/// {...}}` into a [`RawCall`] with a synthetic id.
fn parse_call(json: &str) -> Option<RawCall> {
    let value: Value = serde_json::from_str(json).ok()?;
    let name = value.get("tool_name")?.as_str()?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    let args = ["args", "tool_params", "arguments"]
        .iter()
        .find_map(|k| value.get(*k))
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    Some(RawCall::new(format!("fallback_{}", now_millis()), name, args))
}

/// Find the first balanced `{...}` object in `text`, returned as a slice.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = balanced_object_at(text, start)?;
    Some(&text[start..end])
}

/// Given the byte index of a `{` in `text`, return the byte index one past
/// its matching `}`, skipping braces inside JSON string literals.
fn balanced_object_at(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    debug_assert_eq!(bytes.get(start), Some(&b'{'));
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn remove_span(text: &str, start: usize, end: usize) -> String {
    let mut cleaned = String::with_capacity(text.len() - (end - start));
    cleaned.push_str(&text[..start]);
    cleaned.push_str(&text[end..]);
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_from_fenced_json_block() {
        let text = "Here is the update:\n```json\n{\"tool_name\": \"add_chapter\", \"args\": {\"number\": 3}}\n```\nDone.";
        let extracted = extract_tool_call(text).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::FencedBlock);
        assert_eq!(extracted.call.name, "add_chapter");
        assert_eq!(extracted.call.args, json!({"number": 3}));
        assert_eq!(extracted.cleaned_text, "Here is the update:\n\nDone.");
    }

    #[test]
    fn extracts_from_tool_code_fence_with_tool_params() {
        let text = "```tool_code\n{\"tool_name\": \"add_character\", \"tool_params\": {\"name\": \"Lin Hai\"}}\n```";
        let extracted = extract_tool_call(text).unwrap();
        assert_eq!(extracted.call.name, "add_character");
        assert_eq!(extracted.call.args["name"], "Lin Hai");
        assert!(extracted.cleaned_text.is_empty());
    }

    #[test]
    fn extracts_from_tagged_block() {
        let text = "<tool_call>{\"tool_name\": \"add_world_entry\", \"args\": {\"name\": \"Valley\"}}</tool_call>";
        let extracted = extract_tool_call(text).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::TaggedBlock);
        assert_eq!(extracted.call.name, "add_world_entry");
    }

    #[test]
    fn extracts_from_execute_tool_tag() {
        let text = "thinking...\n<execute_tool>\n{\"tool_name\": \"update_structure\", \"args\": {\"beat\": \"hook\", \"content\": \"x\"}}\n</execute_tool>";
        let extracted = extract_tool_call(text).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::TaggedBlock);
        assert_eq!(extracted.call.args["beat"], "hook");
    }

    #[test]
    fn extracts_bare_json_with_braces_inside_strings() {
        let text = "I'll write it now. {\"tool_name\": \"update_storyboard\", \"args\": {\"chapter_content\": \"He said {loudly} and left } quickly\"}} That's all.";
        let extracted = extract_tool_call(text).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::BareJson);
        assert_eq!(extracted.call.name, "update_storyboard");
        assert!(extracted.call.args["chapter_content"]
            .as_str()
            .unwrap()
            .contains("{loudly}"));
        assert_eq!(extracted.cleaned_text, "I'll write it now.  That's all.");
    }

    #[test]
    fn synthetic_id_marks_fallback_origin() {
        let text = "{\"tool_name\": \"add_chapter\", \"args\": {}}";
        let extracted = extract_tool_call(text).unwrap();
        assert!(extracted.call.id.starts_with("fallback_"));
    }

    #[test]
    fn fenced_strategy_wins_over_bare_json() {
        let text = "{\"tool_name\": \"add_chapter\", \"args\": {\"number\": 1}}\n```json\n{\"tool_name\": \"add_chapter\", \"args\": {\"number\": 2}}\n```";
        let extracted = extract_tool_call(text).unwrap();
        assert_eq!(extracted.strategy, ExtractionStrategy::FencedBlock);
        assert_eq!(extracted.call.args["number"], 2);
    }

    #[test]
    fn plain_prose_yields_none() {
        assert!(extract_tool_call("I wrote chapter three. It went well.").is_none());
        assert!(extract_tool_call("A {curly} remark without any JSON.").is_none());
    }

    #[test]
    fn object_without_tool_name_is_ignored() {
        let text = "Config sample: {\"retries\": 3, \"mode\": \"fast\"}";
        assert!(extract_tool_call(text).is_none());
    }

    #[test]
    fn missing_args_defaults_to_empty_object() {
        let text = "{\"tool_name\": \"add_chapter\"}";
        let extracted = extract_tool_call(text).unwrap();
        assert_eq!(extracted.call.args, json!({}));
    }
}
