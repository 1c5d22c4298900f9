//! Argument validation and normalization for tool calls.
//!
//! The model returns loosely-typed arguments: numbers as strings, structured
//! arrays or objects where flat text is expected, missing optional fields.
//! One pure validator per operation kind checks required fields, coerces the
//! input into the canonical shape, and splits problems into hard errors and
//! soft warnings. The reducer only ever sees fully-normalized [`Operation`]
//! values; it never type-sniffs.

use crate::story::{Beat, BehaviorExample};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// Bare chapter-number titles ("第4章", "Chapter 4", "Ch 4") are
    /// rejected; titles must be descriptive.
    static ref BARE_CHAPTER_TITLE: Regex =
        Regex::new(r"(?i)^(?:第\s*\d+\s*章|chapter\s*\d+|ch\s*\d+)$").expect("valid regex");
}

/// A tool call as received from the model, before validation.
#[derive(Debug, Clone)]
pub struct RawCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

impl RawCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// Result of validating one raw call.
///
/// `normalized` is `Some` exactly when `errors` is empty; callers must never
/// apply partially-normalized data.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub normalized: Option<Operation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn finish(mut self, normalized: Operation) -> Self {
        if self.errors.is_empty() {
            self.normalized = Some(normalized);
        }
        self
    }
}

// ============================================================================
// Normalized operations
// ============================================================================

/// A fully-validated, fully-normalized operation, ready for the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Append a new version to one beat of the active blueprint.
    UpdateStructure { beat: Beat, content: String },
    /// Upsert a chapter's outline without touching its content versions.
    AddChapter(ChapterOutline),
    /// Composite chapter write: body, outline, and optional side updates.
    UpdateStoryboard(Box<StoryboardUpdate>),
    /// Upsert a character by name.
    AddCharacter(CharacterUpsert),
    /// Append a behavior example to an existing character.
    AddCharacterBehavior {
        character_name: String,
        context: String,
        response: String,
    },
    /// Upsert a world entry by `(category, name)`.
    AddWorldEntry(WorldEntryUpsert),
    /// Append a writing guideline.
    AddWritingGuideline(GuidelineAppend),
}

impl Operation {
    /// The wire name of this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::UpdateStructure { .. } => "update_structure",
            Operation::AddChapter(_) => "add_chapter",
            Operation::UpdateStoryboard(_) => "update_storyboard",
            Operation::AddCharacter(_) => "add_character",
            Operation::AddCharacterBehavior { .. } => "add_character_behavior",
            Operation::AddWorldEntry(_) => "add_world_entry",
            Operation::AddWritingGuideline(_) => "add_writing_guideline",
        }
    }

    /// The chapter this operation targets, when it targets one.
    pub fn target_chapter(&self) -> Option<u32> {
        match self {
            Operation::AddChapter(outline) => Some(outline.number),
            Operation::UpdateStoryboard(update) => Some(update.chapter_number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutline {
    pub number: u32,
    pub title: String,
    pub summary: String,
    pub summary_detailed: Option<String>,
    pub volume_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryboardUpdate {
    pub chapter_number: u32,
    pub volume_number: Option<u32>,
    pub chapter_title: String,
    pub chapter_content: String,
    pub chapter_outline: String,
    pub version_name: Option<String>,
    pub story_bible: Option<BibleUpdate>,
    pub characters: Vec<CharacterUpsert>,
    pub world_entries: Vec<WorldEntryUpsert>,
    pub writing_guidelines: Vec<GuidelineAppend>,
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub alternative_titles: Vec<String>,
}

/// Story-bible payload, flattened to one string per field.
#[derive(Debug, Clone, PartialEq)]
pub struct BibleUpdate {
    pub character_status: String,
    pub key_items_and_locations: String,
    pub active_plot_threads: String,
    pub important_rules: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterUpsert {
    pub name: String,
    pub role: String,
    pub description: String,
    pub tags: Vec<String>,
    pub behavior_examples: Vec<BehaviorExample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldEntryUpsert {
    pub category: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuidelineAppend {
    pub category: String,
    pub content: String,
    pub is_active: bool,
}

// ============================================================================
// Coercion helpers
// ============================================================================

/// Whether a field counts as present. Absent, `null`, and empty-string
/// values are all treated as missing.
fn present<'a>(args: &'a Value, key: &str) -> Option<&'a Value> {
    match args.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

/// Coerce a value into a chapter/volume number. Accepts numbers and
/// numeric-looking strings.
fn coerce_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(|n| n as u32)
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u32)),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Coerce any scalar into a string. Non-string scalars are stringified;
/// structured values fall back to their JSON rendering.
fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn coerce_bool(value: &Value, default: bool) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("false")
        }
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
        _ => default,
    }
}

/// Flatten a story-bible field into newline-joined text.
///
/// Accepts a flat string, an array of items (strings or `{name, status}`
/// style objects rendered as `"<name>: <detail>"`), or a key→value object
/// rendered as `"<key>: <value>"` with non-string values JSON-stringified.
fn flatten_bible_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                Value::Object(obj) => {
                    let name = ["name", "character"]
                        .iter()
                        .find_map(|k| obj.get(*k).and_then(Value::as_str))
                        .unwrap_or("unknown");
                    let detail = ["status", "state", "description", "detail"]
                        .iter()
                        .find_map(|k| obj.get(*k).and_then(Value::as_str))
                        .unwrap_or("");
                    format!("{name}: {detail}")
                }
                other => coerce_string(other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{key}: {s}"),
                other => format!("{key}: {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => coerce_string(other),
    }
}

fn char_count(s: &str) -> usize {
    s.chars().count()
}

// ============================================================================
// Per-operation validators
// ============================================================================

/// Validate and normalize an `update_structure` call.
pub fn validate_update_structure(args: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let beat = match present(args, "beat") {
        None => {
            report.errors.push("missing required parameter: beat".into());
            None
        }
        Some(v) => {
            let name = coerce_string(v);
            let beat = Beat::from_wire(name.trim());
            if beat.is_none() {
                report.errors.push(format!(
                    "beat must be one of hook, incitingIncident, risingAction, climax, fallingAction, resolution (got \"{name}\")"
                ));
            }
            beat
        }
    };

    let content = match present(args, "content") {
        None => {
            report
                .errors
                .push("missing required parameter: content".into());
            String::new()
        }
        Some(v) => coerce_string(v),
    };

    match beat {
        Some(beat) if report.errors.is_empty() => {
            report.finish(Operation::UpdateStructure { beat, content })
        }
        _ => report,
    }
}

/// Validate and normalize an `add_chapter` call.
pub fn validate_add_chapter(args: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let number = require_number(args, "number", &mut report);
    let title = require_trimmed_string(args, "title", &mut report);
    if let Some(title) = &title {
        if char_count(title) < 2 {
            report
                .errors
                .push("title too short; at least 2 characters required".into());
        }
    }

    let summary = match present(args, "summary") {
        None => {
            report
                .errors
                .push("missing required parameter: summary".into());
            String::new()
        }
        Some(v) => {
            let s = coerce_string(v);
            if char_count(&s) < 50 {
                report
                    .warnings
                    .push("summary is short; at least 50 characters recommended".into());
            }
            s
        }
    };

    let summary_detailed = present(args, "summaryDetailed").map(coerce_string);
    let volume_number = optional_volume_number(args, &mut report);

    let Some(number) = number else { return report };
    let Some(title) = title else { return report };
    report.finish(Operation::AddChapter(ChapterOutline {
        number,
        title,
        summary,
        summary_detailed,
        volume_number,
    }))
}

/// Validate and normalize an `update_storyboard` call (composite chapter
/// write).
pub fn validate_update_storyboard(args: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let chapter_number = require_number(args, "chapterNumber", &mut report);

    let chapter_title = require_trimmed_string(args, "chapterTitle", &mut report);
    if let Some(title) = &chapter_title {
        if BARE_CHAPTER_TITLE.is_match(title) {
            report.errors.push(format!(
                "chapterTitle \"{title}\" is just a bare chapter number; a descriptive title is required (e.g. \"初入江湖\", \"The Turning Point\")"
            ));
        } else if char_count(title) < 2 {
            report
                .errors
                .push("chapterTitle too short; at least 2 characters required".into());
        } else if char_count(title) > 30 {
            report
                .warnings
                .push("chapterTitle is long (over 30 characters); a shorter title is recommended".into());
        }
    }

    let chapter_content = match present(args, "chapter_content") {
        None => {
            report
                .errors
                .push("missing required parameter: chapter_content".into());
            String::new()
        }
        Some(v) => {
            let s = coerce_string(v);
            let len = char_count(&s);
            if len < 100 {
                report.errors.push(format!(
                    "chapter_content too short ({len} characters); at least 100 required"
                ));
            } else if len < 500 {
                report.warnings.push(format!(
                    "chapter_content is short ({len} characters); at least 500 recommended"
                ));
            }
            s
        }
    };

    let chapter_outline = match present(args, "chapter_outline") {
        None => {
            report
                .errors
                .push("missing required parameter: chapter_outline".into());
            String::new()
        }
        Some(v) => {
            let s = coerce_string(v);
            let len = char_count(&s);
            if len < 500 {
                report.errors.push(format!(
                    "chapter_outline too short ({len} characters); at least 500 required"
                ));
            } else if len < 800 {
                report.warnings.push(format!(
                    "chapter_outline is a little short ({len} characters); at least 800 recommended"
                ));
            } else if len > 3000 {
                report.warnings.push(format!(
                    "chapter_outline is long ({len} characters); 1500 or fewer recommended"
                ));
            }
            if !outline_covers_key_elements(&s) {
                report.warnings.push(
                    "chapter_outline should cover plot tasks, character relationship changes, and foreshadowing".into(),
                );
            }
            s
        }
    };

    let story_bible = match args.get("updated_story_bible") {
        None | Some(Value::Null) => {
            report.warnings.push(
                "updated_story_bible not provided; include it to keep the story consistent".into(),
            );
            None
        }
        Some(bible) if !bible.is_object() => {
            report
                .errors
                .push("updated_story_bible must be an object".into());
            None
        }
        Some(bible) => Some(normalize_bible(bible, &mut report)),
    };

    let volume_number = optional_volume_number(args, &mut report);
    let version_name = present(args, "versionName").map(coerce_string);

    let characters = optional_characters(args, &mut report);
    let world_entries = optional_world_entries(args, &mut report);
    let writing_guidelines = optional_guidelines(args, &mut report);

    let title = present(args, "title").map(|v| coerce_string(v).trim().to_string());
    let synopsis = present(args, "synopsis").map(coerce_string);
    let alternative_titles = match args.get("alternativeTitles") {
        Some(Value::Array(items)) => items.iter().map(coerce_string).collect(),
        _ => Vec::new(),
    };

    let Some(chapter_number) = chapter_number else { return report };
    let Some(chapter_title) = chapter_title else { return report };
    report.finish(Operation::UpdateStoryboard(Box::new(StoryboardUpdate {
        chapter_number,
        volume_number,
        chapter_title,
        chapter_content,
        chapter_outline,
        version_name,
        story_bible,
        characters,
        world_entries,
        writing_guidelines,
        title,
        synopsis,
        alternative_titles,
    })))
}

/// Validate and normalize an `add_character` call.
pub fn validate_add_character(args: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let upserts = normalize_character(args, None, &mut report);
    match upserts {
        Some(upsert) if report.errors.is_empty() => report.finish(Operation::AddCharacter(upsert)),
        _ => report,
    }
}

/// Validate and normalize an `add_character_behavior` call.
pub fn validate_add_character_behavior(args: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let character_name = require_trimmed_string(args, "characterName", &mut report);
    let context = require_trimmed_string(args, "context", &mut report);
    let response = require_trimmed_string(args, "response", &mut report);

    let (Some(character_name), Some(context), Some(response)) = (character_name, context, response)
    else {
        return report;
    };
    report.finish(Operation::AddCharacterBehavior {
        character_name,
        context,
        response,
    })
}

/// Validate and normalize an `add_world_entry` call.
pub fn validate_add_world_entry(args: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let entry = normalize_world_entry(args, None, &mut report);
    match entry {
        Some(entry) if report.errors.is_empty() => report.finish(Operation::AddWorldEntry(entry)),
        _ => report,
    }
}

/// Validate and normalize an `add_writing_guideline` call.
pub fn validate_add_writing_guideline(args: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();
    let guideline = normalize_guideline(args, None, &mut report);
    match guideline {
        Some(guideline) if report.errors.is_empty() => {
            report.finish(Operation::AddWritingGuideline(guideline))
        }
        _ => report,
    }
}

/// Dispatch a raw call to the validator for its operation kind.
pub fn validate_call(call: &RawCall) -> ValidationReport {
    match call.name.as_str() {
        "update_structure" => validate_update_structure(&call.args),
        "add_chapter" => validate_add_chapter(&call.args),
        "update_storyboard" => validate_update_storyboard(&call.args),
        "add_character" => validate_add_character(&call.args),
        "add_character_behavior" => validate_add_character_behavior(&call.args),
        "add_world_entry" => validate_add_world_entry(&call.args),
        "add_writing_guideline" => validate_add_writing_guideline(&call.args),
        other => ValidationReport {
            errors: vec![format!("unknown operation: {other}")],
            warnings: Vec::new(),
            normalized: None,
        },
    }
}

// ============================================================================
// Shared normalization pieces
// ============================================================================

fn require_number(args: &Value, key: &str, report: &mut ValidationReport) -> Option<u32> {
    match present(args, key) {
        None => {
            report
                .errors
                .push(format!("missing required parameter: {key}"));
            None
        }
        Some(v) => {
            let n = coerce_number(v);
            if n.is_none() {
                report.errors.push(format!("{key} must be a number"));
            }
            n
        }
    }
}

fn require_trimmed_string(args: &Value, key: &str, report: &mut ValidationReport) -> Option<String> {
    match present(args, key) {
        None => {
            report
                .errors
                .push(format!("missing required parameter: {key}"));
            None
        }
        Some(v) => Some(coerce_string(v).trim().to_string()),
    }
}

fn optional_volume_number(args: &Value, report: &mut ValidationReport) -> Option<u32> {
    match present(args, "volumeNumber") {
        None => None,
        Some(v) => {
            let n = coerce_number(v);
            if n.is_none() {
                report
                    .warnings
                    .push("volumeNumber is not a number; ignored".into());
            }
            n
        }
    }
}

fn outline_covers_key_elements(outline: &str) -> bool {
    let lower = outline.to_lowercase();
    let contains_any = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));
    contains_any(&["剧情", "情节", "事件", "plot", "event"])
        && contains_any(&["角色", "人物", "character"])
        && contains_any(&["伏笔", "悬念", "线索", "foreshadow", "suspense", "thread"])
}

fn normalize_bible(bible: &Value, report: &mut ValidationReport) -> BibleUpdate {
    let character_status = match present(bible, "character_status") {
        Some(v) => {
            let flat = flatten_bible_field(v);
            let lines: Vec<&str> = flat.lines().filter(|l| !l.trim().is_empty()).collect();
            if !lines.is_empty() && !lines.iter().any(|l| l.contains(':') || l.contains('：')) {
                report.warnings.push(
                    "character_status should use a \"[name]: [status]\" format".into(),
                );
            }
            flat
        }
        None => {
            report
                .errors
                .push("updated_story_bible.character_status is required".into());
            String::new()
        }
    };

    let key_items_and_locations = optional_bible_field(bible, "key_items_and_locations", report);
    let active_plot_threads = optional_bible_field(bible, "active_plot_threads", report);
    let important_rules = present(bible, "important_rules")
        .map(flatten_bible_field)
        .unwrap_or_default();

    BibleUpdate {
        character_status,
        key_items_and_locations,
        active_plot_threads,
        important_rules,
    }
}

fn optional_bible_field(bible: &Value, key: &str, report: &mut ValidationReport) -> String {
    match present(bible, key) {
        Some(v) => flatten_bible_field(v),
        None => {
            report.warnings.push(format!(
                "updated_story_bible.{key} not provided; defaulted to empty (fine when this chapter changes nothing there)"
            ));
            String::new()
        }
    }
}

fn normalize_character(
    item: &Value,
    index: Option<usize>,
    report: &mut ValidationReport,
) -> Option<CharacterUpsert> {
    let label = |key: &str| match index {
        Some(i) => format!("characters[{i}].{key}"),
        None => key.to_string(),
    };

    let mut missing = Vec::new();
    for key in ["name", "role", "description"] {
        if present(item, key).is_none() {
            missing.push(key);
        }
    }
    if !missing.is_empty() {
        let message = format!(
            "missing required parameter: {}",
            missing
                .iter()
                .map(|k| label(k))
                .collect::<Vec<_>>()
                .join(", ")
        );
        if index.is_some() {
            report.warnings.push(format!("{message}; entry skipped"));
        } else {
            report.errors.push(message);
        }
        return None;
    }

    let name = coerce_string(&item["name"]).trim().to_string();
    let role = coerce_string(&item["role"]).trim().to_string();
    let description = coerce_string(&item["description"]);
    if char_count(&description) < 50 {
        report.warnings.push(format!(
            "{} is short; at least 50 characters recommended",
            label("description")
        ));
    }

    let tags = match item.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|t| coerce_string(t).trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    let behavior_examples = match item.get("behaviorExamples") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|ex| {
                let context = present(ex, "context").map(coerce_string);
                let response = present(ex, "response").map(coerce_string);
                match (context, response) {
                    (Some(context), Some(response)) => {
                        Some(BehaviorExample { context, response })
                    }
                    _ => {
                        report.warnings.push(format!(
                            "{} entry missing context or response; skipped",
                            label("behaviorExamples")
                        ));
                        None
                    }
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(CharacterUpsert {
        name,
        role,
        description,
        tags,
        behavior_examples,
    })
}

fn normalize_world_entry(
    item: &Value,
    index: Option<usize>,
    report: &mut ValidationReport,
) -> Option<WorldEntryUpsert> {
    let mut missing = Vec::new();
    for key in ["category", "name", "description"] {
        if present(item, key).is_none() {
            missing.push(key);
        }
    }
    if !missing.is_empty() {
        let message = match index {
            Some(i) => format!(
                "worldEntries[{i}] missing required field(s): {}; entry skipped",
                missing.join(", ")
            ),
            None => format!("missing required parameter: {}", missing.join(", ")),
        };
        if index.is_some() {
            report.warnings.push(message);
        } else {
            report.errors.push(message);
        }
        return None;
    }

    let description = coerce_string(&item["description"]);
    if index.is_none() && char_count(&description) < 50 {
        report
            .warnings
            .push("description is short; at least 50 characters recommended".into());
    }

    Some(WorldEntryUpsert {
        category: coerce_string(&item["category"]).trim().to_string(),
        name: coerce_string(&item["name"]).trim().to_string(),
        description,
    })
}

fn normalize_guideline(
    item: &Value,
    index: Option<usize>,
    report: &mut ValidationReport,
) -> Option<GuidelineAppend> {
    let mut missing = Vec::new();
    for key in ["category", "content"] {
        if present(item, key).is_none() {
            missing.push(key);
        }
    }
    if !missing.is_empty() {
        let message = match index {
            Some(i) => format!(
                "writingGuidelines[{i}] missing required field(s): {}; entry skipped",
                missing.join(", ")
            ),
            None => format!("missing required parameter: {}", missing.join(", ")),
        };
        if index.is_some() {
            report.warnings.push(message);
        } else {
            report.errors.push(message);
        }
        return None;
    }

    let content = coerce_string(&item["content"]);
    if index.is_none() && char_count(&content) < 20 {
        report
            .warnings
            .push("content is short; at least 20 characters recommended".into());
    }

    Some(GuidelineAppend {
        category: coerce_string(&item["category"]).trim().to_string(),
        content,
        is_active: item
            .get("isActive")
            .map(|v| coerce_bool(v, true))
            .unwrap_or(true),
    })
}

fn optional_characters(args: &Value, report: &mut ValidationReport) -> Vec<CharacterUpsert> {
    match args.get("characters") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| normalize_character(item, Some(i), report))
            .collect(),
        Some(_) => {
            report
                .warnings
                .push("characters is not an array; ignored".into());
            Vec::new()
        }
    }
}

fn optional_world_entries(args: &Value, report: &mut ValidationReport) -> Vec<WorldEntryUpsert> {
    match args.get("worldEntries") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| normalize_world_entry(item, Some(i), report))
            .collect(),
        Some(_) => {
            report
                .warnings
                .push("worldEntries is not an array; ignored".into());
            Vec::new()
        }
    }
}

fn optional_guidelines(args: &Value, report: &mut ValidationReport) -> Vec<GuidelineAppend> {
    match args.get("writingGuidelines") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| normalize_guideline(item, Some(i), report))
            .collect(),
        Some(_) => {
            report
                .warnings
                .push("writingGuidelines is not an array; ignored".into());
            Vec::new()
        }
    }
}
