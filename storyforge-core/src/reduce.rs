//! The operation reducer: applies one normalized operation to a story.
//!
//! `apply` is a pure function from `(story, operation, context)` to a new
//! story plus an outcome. It never leaves the document half-updated: every
//! check that can fail runs against a scratch copy, and on failure the input
//! story is returned untouched.

use crate::story::{
    BeatVersionState, Chapter, ContentVersion, StoryBibleVersion, StoryState, WorldEntry,
    WritingGuideline, now_millis,
};
use crate::validate::{
    BibleUpdate, ChapterOutline, CharacterUpsert, GuidelineAppend, Operation, StoryboardUpdate,
    WorldEntryUpsert,
};
use crate::story::Character;
use tracing::debug;
use uuid::Uuid;

/// Ambient inputs to a reduction that are not part of the operation itself.
#[derive(Debug, Clone, Default)]
pub struct ApplyContext {
    /// Model that produced the content, recorded on new versions.
    pub model_id: Option<String>,
}

/// What a reduction did, reported per touched field.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied { summary: Vec<String> },
    Failed { reason: String },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }
}

/// A reduced story paired with the outcome of the reduction.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub story: StoryState,
    pub outcome: Outcome,
}

/// Apply one operation. On failure the returned story is the input,
/// unchanged.
pub fn apply(story: StoryState, op: &Operation, ctx: &ApplyContext) -> ApplyResult {
    let mut next = story.clone();
    match apply_inner(&mut next, op, ctx) {
        Ok(summary) => {
            debug!(op = op.name(), ?summary, "operation applied");
            ApplyResult {
                story: next,
                outcome: Outcome::Applied { summary },
            }
        }
        Err(reason) => {
            debug!(op = op.name(), %reason, "operation rejected");
            ApplyResult {
                story,
                outcome: Outcome::Failed { reason },
            }
        }
    }
}

fn apply_inner(
    story: &mut StoryState,
    op: &Operation,
    ctx: &ApplyContext,
) -> Result<Vec<String>, String> {
    match op {
        Operation::UpdateStructure { beat, content } => {
            apply_update_structure(story, *beat, content, ctx)
        }
        Operation::AddChapter(outline) => apply_add_chapter(story, outline),
        Operation::UpdateStoryboard(update) => apply_update_storyboard(story, update, ctx),
        Operation::AddCharacter(upsert) => Ok(vec![upsert_character(story, upsert)]),
        Operation::AddCharacterBehavior {
            character_name,
            context,
            response,
        } => apply_add_character_behavior(story, character_name, context, response),
        Operation::AddWorldEntry(entry) => Ok(vec![upsert_world_entry(story, entry)]),
        Operation::AddWritingGuideline(guideline) => Ok(vec![append_guideline(story, guideline)]),
    }
}

// ============================================================================
// update_structure
// ============================================================================

fn apply_update_structure(
    story: &mut StoryState,
    beat: crate::story::Beat,
    content: &str,
    ctx: &ApplyContext,
) -> Result<Vec<String>, String> {
    let index = story
        .active_blueprint_index()
        .ok_or_else(|| "no blueprint exists to update".to_string())?;
    let blueprint = &mut story.blueprints[index];

    let state = blueprint
        .beat_versions
        .entry(beat)
        .or_insert_with(|| BeatVersionState::seeded(""));
    deactivate_context(&mut state.versions, &state.active_version_id);
    let version = ContentVersion::new(format!("Version {}", state.versions.len() + 1), content)
        .with_context(true)
        .with_model_id(ctx.model_id.clone());
    state.active_version_id = version.id.clone();
    state.versions.push(version);

    blueprint.data.set(beat, content);
    Ok(vec![format!(
        "structure beat {} updated ({} versions)",
        beat.wire_name(),
        blueprint.beat_versions[&beat].versions.len()
    )])
}

// ============================================================================
// add_chapter
// ============================================================================

fn apply_add_chapter(story: &mut StoryState, outline: &ChapterOutline) -> Result<Vec<String>, String> {
    let mut summary = Vec::new();
    let volume_id = resolve_volume(story, outline.volume_number, &mut summary);

    match story.chapter_index(outline.number, outline.volume_number) {
        Some(i) => {
            let chapter = &mut story.outline[i];
            chapter.title = outline.title.clone();
            chapter.summary = outline.summary.clone();
            if outline.summary_detailed.is_some() {
                chapter.summary_detailed = outline.summary_detailed.clone();
            }
            if volume_id.is_some() {
                chapter.volume_id = volume_id;
            }
            summary.insert(0, format!("chapter {} outline updated", outline.number));
        }
        None => {
            let mut chapter = Chapter::new(outline.number, &outline.title, &outline.summary);
            chapter.summary_detailed = outline.summary_detailed.clone();
            chapter.volume_id = volume_id;
            insert_sorted(&mut story.outline, chapter);
            summary.insert(0, format!("chapter {} outline added", outline.number));
        }
    }
    Ok(summary)
}

// ============================================================================
// update_storyboard (composite write)
// ============================================================================

fn apply_update_storyboard(
    story: &mut StoryState,
    update: &StoryboardUpdate,
    ctx: &ApplyContext,
) -> Result<Vec<String>, String> {
    let mut summary = Vec::new();
    let volume_id = resolve_volume(story, update.volume_number, &mut summary);

    let version_name = update.version_name.clone();
    let content_len = update.chapter_content.chars().count();

    // Every composite write produces a fresh content version; existing
    // versions are never overwritten.
    match story.chapter_index(update.chapter_number, update.volume_number) {
        Some(i) => {
            let chapter = &mut story.outline[i];
            let name = version_name
                .unwrap_or_else(|| format!("Draft {}", chapter.content_versions.len() + 1));
            let version = ContentVersion::new(name, &update.chapter_content)
                .with_context(true)
                .with_model_id(ctx.model_id.clone());
            deactivate_context(&mut chapter.content_versions, &chapter.active_version_id);
            chapter.active_version_id = version.id.clone();
            chapter.content_versions.push(version);
            chapter.title = update.chapter_title.clone();
            chapter.summary = update.chapter_outline.clone();
            if volume_id.is_some() {
                chapter.volume_id = volume_id;
            }
            summary.insert(
                0,
                format!(
                    "chapter {} written ({} characters, {} versions)",
                    update.chapter_number,
                    content_len,
                    chapter.content_versions.len()
                ),
            );
        }
        None => {
            let name = version_name.unwrap_or_else(|| "Draft 1".to_string());
            let version = ContentVersion::new(name, &update.chapter_content)
                .with_context(true)
                .with_model_id(ctx.model_id.clone());
            let chapter = Chapter {
                id: Uuid::new_v4().to_string(),
                volume_id,
                number: update.chapter_number,
                title: update.chapter_title.clone(),
                summary: update.chapter_outline.clone(),
                summary_detailed: None,
                active_version_id: version.id.clone(),
                content_versions: vec![version],
            };
            insert_sorted(&mut story.outline, chapter);
            summary.insert(
                0,
                format!(
                    "chapter {} created ({} characters)",
                    update.chapter_number, content_len
                ),
            );
        }
    }

    if let Some(bible) = &update.story_bible {
        summary.push(apply_bible_update(
            story,
            update.chapter_number,
            update.volume_number,
            bible,
        ));
    }

    if !update.characters.is_empty() {
        for upsert in &update.characters {
            upsert_character(story, upsert);
        }
        summary.push(format!("{} character(s) upserted", update.characters.len()));
    }
    if !update.world_entries.is_empty() {
        for entry in &update.world_entries {
            upsert_world_entry(story, entry);
        }
        summary.push(format!(
            "{} world entr(y/ies) upserted",
            update.world_entries.len()
        ));
    }
    if !update.writing_guidelines.is_empty() {
        for guideline in &update.writing_guidelines {
            append_guideline(story, guideline);
        }
        summary.push(format!(
            "{} writing guideline(s) added",
            update.writing_guidelines.len()
        ));
    }

    if let Some(title) = update.title.as_deref().filter(|t| !t.is_empty()) {
        story.title = title.to_string();
        summary.push("story title set".into());
    }
    if let Some(synopsis) = update.synopsis.as_deref().filter(|s| !s.trim().is_empty()) {
        story.synopsis = synopsis.to_string();
        summary.push("synopsis set".into());
    }
    if !update.alternative_titles.is_empty() {
        story.alternative_titles = update.alternative_titles.clone();
        summary.push("alternative titles set".into());
    }

    Ok(summary)
}

/// Replace-by-key write into the story bible, keeping entries sorted and
/// the active pointers on the most recent write.
fn apply_bible_update(
    story: &mut StoryState,
    chapter_number: u32,
    volume_number: Option<u32>,
    bible: &BibleUpdate,
) -> String {
    let store = story.story_bible.get_or_insert_with(Default::default);
    store
        .versions
        .retain(|v| !(v.chapter_number == chapter_number && v.volume_number == volume_number));
    store.versions.push(StoryBibleVersion {
        chapter_number,
        volume_number,
        character_status: bible.character_status.clone(),
        key_items_and_locations: bible.key_items_and_locations.clone(),
        active_plot_threads: bible.active_plot_threads.clone(),
        important_rules: bible.important_rules.clone(),
        timestamp: now_millis(),
    });
    store
        .versions
        .sort_by_key(|v| (v.volume_number, v.chapter_number));
    store.active_chapter_number = Some(chapter_number);
    store.active_volume_number = volume_number;
    format!("story bible updated for chapter {chapter_number}")
}

// ============================================================================
// Characters, world, guidelines
// ============================================================================

fn upsert_character(story: &mut StoryState, upsert: &CharacterUpsert) -> String {
    match story.characters.iter_mut().find(|c| c.name == upsert.name) {
        Some(existing) => {
            existing.role = upsert.role.clone();
            existing.description = upsert.description.clone();
            if !upsert.tags.is_empty() {
                existing.tags = upsert.tags.clone();
            }
            existing
                .behavior_examples
                .extend(upsert.behavior_examples.iter().cloned());
            format!("character \"{}\" updated", upsert.name)
        }
        None => {
            story.characters.push(Character {
                id: Uuid::new_v4().to_string(),
                name: upsert.name.clone(),
                role: upsert.role.clone(),
                tags: upsert.tags.clone(),
                description: upsert.description.clone(),
                behavior_examples: upsert.behavior_examples.clone(),
            });
            format!("character \"{}\" added", upsert.name)
        }
    }
}

fn apply_add_character_behavior(
    story: &mut StoryState,
    character_name: &str,
    context: &str,
    response: &str,
) -> Result<Vec<String>, String> {
    let character = story
        .characters
        .iter_mut()
        .find(|c| c.name == character_name)
        .ok_or_else(|| {
            format!("character \"{character_name}\" not found; add the character first")
        })?;
    character.behavior_examples.push(crate::story::BehaviorExample {
        context: context.to_string(),
        response: response.to_string(),
    });
    Ok(vec![format!(
        "behavior example added to \"{character_name}\" ({} total)",
        character.behavior_examples.len()
    )])
}

fn upsert_world_entry(story: &mut StoryState, entry: &WorldEntryUpsert) -> String {
    match story
        .world_guide
        .iter_mut()
        .find(|e| e.category == entry.category && e.name == entry.name)
    {
        Some(existing) => {
            existing.description = entry.description.clone();
            format!("world entry \"{}\" ({}) updated", entry.name, entry.category)
        }
        None => {
            story.world_guide.push(WorldEntry {
                id: Uuid::new_v4().to_string(),
                category: entry.category.clone(),
                name: entry.name.clone(),
                description: entry.description.clone(),
            });
            format!("world entry \"{}\" ({}) added", entry.name, entry.category)
        }
    }
}

fn append_guideline(story: &mut StoryState, guideline: &GuidelineAppend) -> String {
    story.writing_guidelines.push(WritingGuideline {
        id: Uuid::new_v4().to_string(),
        category: guideline.category.clone(),
        content: guideline.content.clone(),
        is_active: guideline.is_active,
    });
    format!("writing guideline added ({})", guideline.category)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Mark the currently active version as out of context before a new active
/// version is appended.
fn deactivate_context(versions: &mut [ContentVersion], active_id: &str) {
    for version in versions.iter_mut() {
        if version.id == active_id {
            version.is_context = false;
        }
    }
}

fn resolve_volume(
    story: &StoryState,
    volume_number: Option<u32>,
    summary: &mut Vec<String>,
) -> Option<String> {
    let number = volume_number?;
    match story.volume_by_number(number) {
        Some(volume) => Some(volume.id.clone()),
        None => {
            summary.push(format!("volume {number} does not exist; chapter left unassigned"));
            None
        }
    }
}

fn insert_sorted(outline: &mut Vec<Chapter>, chapter: Chapter) {
    let position = outline
        .iter()
        .position(|c| c.number > chapter.number)
        .unwrap_or(outline.len());
    outline.insert(position, chapter);
}
