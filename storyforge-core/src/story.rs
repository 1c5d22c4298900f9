//! Versioned story document model.
//!
//! Contains all types for representing a story: blueprints with per-beat
//! version history, volumes, chapters with content versions, characters,
//! world entries, writing guidelines, and the incrementally-maintained
//! story bible.
//!
//! Serde field names match the persisted document shape exactly, so a
//! document written by an older save can be read back (see [`crate::migrate`]
//! for legacy shapes that need more than renaming).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current time as epoch milliseconds, the timestamp unit used throughout
/// the persisted document.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Blueprint & Beats
// ============================================================================

/// One of the six fixed structural slots of a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Beat {
    #[serde(rename = "hook")]
    Hook,
    #[serde(rename = "incitingIncident")]
    IncitingIncident,
    #[serde(rename = "risingAction")]
    RisingAction,
    #[serde(rename = "climax")]
    Climax,
    #[serde(rename = "fallingAction")]
    FallingAction,
    #[serde(rename = "resolution")]
    Resolution,
}

impl Beat {
    /// All beats, in structural order.
    pub const ALL: [Beat; 6] = [
        Beat::Hook,
        Beat::IncitingIncident,
        Beat::RisingAction,
        Beat::Climax,
        Beat::FallingAction,
        Beat::Resolution,
    ];

    /// The wire name used in tool arguments.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Beat::Hook => "hook",
            Beat::IncitingIncident => "incitingIncident",
            Beat::RisingAction => "risingAction",
            Beat::Climax => "climax",
            Beat::FallingAction => "fallingAction",
            Beat::Resolution => "resolution",
        }
    }

    /// Parse a wire name into a beat.
    pub fn from_wire(name: &str) -> Option<Beat> {
        Beat::ALL.iter().copied().find(|b| b.wire_name() == name)
    }
}

/// Flattened beat texts, mirrored from each beat's active version for
/// display and prompt assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureData {
    #[serde(default)]
    pub hook: String,
    #[serde(default, rename = "incitingIncident")]
    pub inciting_incident: String,
    #[serde(default, rename = "risingAction")]
    pub rising_action: String,
    #[serde(default)]
    pub climax: String,
    #[serde(default, rename = "fallingAction")]
    pub falling_action: String,
    #[serde(default)]
    pub resolution: String,
}

impl StructureData {
    pub fn get(&self, beat: Beat) -> &str {
        match beat {
            Beat::Hook => &self.hook,
            Beat::IncitingIncident => &self.inciting_incident,
            Beat::RisingAction => &self.rising_action,
            Beat::Climax => &self.climax,
            Beat::FallingAction => &self.falling_action,
            Beat::Resolution => &self.resolution,
        }
    }

    pub fn set(&mut self, beat: Beat, text: impl Into<String>) {
        let slot = match beat {
            Beat::Hook => &mut self.hook,
            Beat::IncitingIncident => &mut self.inciting_incident,
            Beat::RisingAction => &mut self.rising_action,
            Beat::Climax => &mut self.climax,
            Beat::FallingAction => &mut self.falling_action,
            Beat::Resolution => &mut self.resolution,
        };
        *slot = text.into();
    }
}

/// One timestamped draft of some text (chapter body or beat description).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: String,
    #[serde(rename = "versionName")]
    pub version_name: String,
    pub timestamp: i64,
    pub text: String,
    /// Whether this version is in scope as context for future generation.
    #[serde(default, rename = "isContext")]
    pub is_context: bool,
    /// Model that produced this version, when known.
    #[serde(default, rename = "modelId", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl ContentVersion {
    /// Create a new version with a fresh id and the current timestamp.
    pub fn new(version_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            version_name: version_name.into(),
            timestamp: now_millis(),
            text: text.into(),
            is_context: false,
            model_id: None,
        }
    }

    pub fn with_context(mut self, is_context: bool) -> Self {
        self.is_context = is_context;
        self
    }

    pub fn with_model_id(mut self, model_id: Option<String>) -> Self {
        self.model_id = model_id;
        self
    }
}

/// Append-only version history for one beat, with an active pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatVersionState {
    #[serde(rename = "activeVersionId")]
    pub active_version_id: String,
    pub versions: Vec<ContentVersion>,
}

impl BeatVersionState {
    /// Seed a beat with a single version carrying the given text.
    pub fn seeded(text: impl Into<String>) -> Self {
        let version = ContentVersion::new("Initial concept", text).with_context(true);
        Self {
            active_version_id: version.id.clone(),
            versions: vec![version],
        }
    }

    /// The currently active version, falling back to the last one if the
    /// pointer is dangling.
    pub fn active(&self) -> Option<&ContentVersion> {
        self.versions
            .iter()
            .find(|v| v.id == self.active_version_id)
            .or_else(|| self.versions.last())
    }
}

/// A named snapshot of the six-beat plot structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    #[serde(rename = "versionName")]
    pub version_name: String,
    pub timestamp: i64,
    #[serde(default)]
    pub data: StructureData,
    #[serde(default, rename = "beatVersions")]
    pub beat_versions: BTreeMap<Beat, BeatVersionState>,
}

impl Blueprint {
    /// Create a blueprint with every beat seeded from the given data.
    pub fn seeded(version_name: impl Into<String>, data: StructureData) -> Self {
        let beat_versions = Beat::ALL
            .iter()
            .map(|&beat| (beat, BeatVersionState::seeded(data.get(beat))))
            .collect();
        Self {
            id: Uuid::new_v4().to_string(),
            version_name: version_name.into(),
            timestamp: now_millis(),
            data,
            beat_versions,
        }
    }
}

// ============================================================================
// Volumes & Chapters
// ============================================================================

/// Optional grouping of chapters into a book or arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub summary: String,
}

/// One chapter of the outline, with versioned body text.
///
/// Chapter numbers are not globally unique; identity is `(number, volume_id)`
/// with a number-only fallback when no volume is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    #[serde(default, rename = "volumeId", skip_serializing_if = "Option::is_none")]
    pub volume_id: Option<String>,
    pub number: u32,
    pub title: String,
    /// Latest outline text for the chapter.
    pub summary: String,
    #[serde(
        default,
        rename = "summaryDetailed",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary_detailed: Option<String>,
    #[serde(rename = "activeVersionId")]
    pub active_version_id: String,
    #[serde(rename = "contentVersions")]
    pub content_versions: Vec<ContentVersion>,
}

impl Chapter {
    /// Create a chapter seeded with one empty content version.
    ///
    /// Chapters must always carry at least one version so that content
    /// updates have something to rotate against.
    pub fn new(number: u32, title: impl Into<String>, summary: impl Into<String>) -> Self {
        let seed = ContentVersion::new("Initial draft", "").with_context(true);
        Self {
            id: Uuid::new_v4().to_string(),
            volume_id: None,
            number,
            title: title.into(),
            summary: summary.into(),
            summary_detailed: None,
            active_version_id: seed.id.clone(),
            content_versions: vec![seed],
        }
    }

    /// The currently active content version.
    pub fn active_version(&self) -> Option<&ContentVersion> {
        self.content_versions
            .iter()
            .find(|v| v.id == self.active_version_id)
            .or_else(|| self.content_versions.last())
    }

    /// Whether any version carries non-empty body text.
    pub fn has_content(&self) -> bool {
        self.content_versions
            .iter()
            .any(|v| !v.text.trim().is_empty())
    }
}

// ============================================================================
// Characters, World, Guidelines
// ============================================================================

/// A situational reaction used to deepen a character's voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorExample {
    pub context: String,
    pub response: String,
}

/// A story character. `name` is the natural key for upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: String,
    #[serde(default, rename = "behaviorExamples")]
    pub behavior_examples: Vec<BehaviorExample>,
}

/// A world-building entry. `(category, name)` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEntry {
    pub id: String,
    pub category: String,
    pub name: String,
    pub description: String,
}

/// A writing rule or style preference. Append-only; duplicates allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingGuideline {
    pub id: String,
    pub category: String,
    pub content: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

// ============================================================================
// Story Bible
// ============================================================================

/// Per-chapter incremental record of the story's running state.
///
/// At most one version exists per `(chapter_number, volume_number)` key; a
/// new write for the same key replaces the old entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryBibleVersion {
    #[serde(rename = "chapterNumber")]
    pub chapter_number: u32,
    #[serde(
        default,
        rename = "volumeNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub volume_number: Option<u32>,
    pub character_status: String,
    pub key_items_and_locations: String,
    pub active_plot_threads: String,
    #[serde(default)]
    pub important_rules: String,
    pub timestamp: i64,
}

/// The story bible: one version per written chapter, plus pointers to the
/// most recently written entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryBible {
    #[serde(default)]
    pub versions: Vec<StoryBibleVersion>,
    #[serde(
        default,
        rename = "activeChapterNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_chapter_number: Option<u32>,
    #[serde(
        default,
        rename = "activeVolumeNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_volume_number: Option<u32>,
}

impl StoryBible {
    /// The entry for a `(chapter, volume)` key, if any.
    pub fn entry(&self, chapter_number: u32, volume_number: Option<u32>) -> Option<&StoryBibleVersion> {
        self.versions
            .iter()
            .find(|v| v.chapter_number == chapter_number && v.volume_number == volume_number)
    }
}

// ============================================================================
// Root aggregate
// ============================================================================

/// The root story document. Owned exclusively by one session and mutated
/// only through the operation reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryState {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "alternativeTitles")]
    pub alternative_titles: Vec<String>,
    #[serde(default)]
    pub synopsis: String,
    #[serde(rename = "activeBlueprintId")]
    pub active_blueprint_id: String,
    pub blueprints: Vec<Blueprint>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    /// Ordered chapter list.
    #[serde(default)]
    pub outline: Vec<Chapter>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default, rename = "worldGuide")]
    pub world_guide: Vec<WorldEntry>,
    #[serde(default, rename = "writingGuidelines")]
    pub writing_guidelines: Vec<WritingGuideline>,
    #[serde(default, rename = "storyBible", skip_serializing_if = "Option::is_none")]
    pub story_bible: Option<StoryBible>,
}

impl StoryState {
    /// Create an empty story with one seeded blueprint (every beat present
    /// with a single empty version).
    pub fn new() -> Self {
        let blueprint = Blueprint::seeded("Initial concept", StructureData::default());
        Self {
            title: String::new(),
            alternative_titles: Vec::new(),
            synopsis: String::new(),
            active_blueprint_id: blueprint.id.clone(),
            blueprints: vec![blueprint],
            volumes: Vec::new(),
            outline: Vec::new(),
            characters: Vec::new(),
            world_guide: Vec::new(),
            writing_guidelines: Vec::new(),
            story_bible: None,
        }
    }

    /// Index of the active blueprint, falling back to the first one.
    pub fn active_blueprint_index(&self) -> Option<usize> {
        self.blueprints
            .iter()
            .position(|b| b.id == self.active_blueprint_id)
            .or(if self.blueprints.is_empty() { None } else { Some(0) })
    }

    /// The active blueprint, if any exists.
    pub fn active_blueprint(&self) -> Option<&Blueprint> {
        self.active_blueprint_index().map(|i| &self.blueprints[i])
    }

    /// Find a volume by its number.
    pub fn volume_by_number(&self, number: u32) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.number == number)
    }

    /// Resolve a chapter by `(number, volume)` first, then by number alone.
    pub fn chapter_index(&self, number: u32, volume_number: Option<u32>) -> Option<usize> {
        if let Some(vol_num) = volume_number {
            if let Some(vol) = self.volume_by_number(vol_num) {
                let hit = self
                    .outline
                    .iter()
                    .position(|c| c.number == number && c.volume_id.as_deref() == Some(&vol.id));
                if hit.is_some() {
                    return hit;
                }
            }
        }
        self.outline.iter().position(|c| c.number == number)
    }

    /// Resolve a chapter by `(number, volume)` first, then by number alone.
    pub fn chapter(&self, number: u32, volume_number: Option<u32>) -> Option<&Chapter> {
        self.chapter_index(number, volume_number).map(|i| &self.outline[i])
    }

    /// Highest chapter number in the outline.
    pub fn max_chapter_number(&self) -> Option<u32> {
        self.outline.iter().map(|c| c.number).max()
    }

    /// Find a character by name.
    pub fn character_by_name(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Find a world entry by `(category, name)`.
    pub fn world_entry(&self, category: &str, name: &str) -> Option<&WorldEntry> {
        self.world_guide
            .iter()
            .find(|e| e.category == category && e.name == name)
    }
}

impl Default for StoryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_story_seeds_every_beat() {
        let story = StoryState::new();
        let blueprint = story.active_blueprint().expect("active blueprint");
        for beat in Beat::ALL {
            let state = blueprint
                .beat_versions
                .get(&beat)
                .unwrap_or_else(|| panic!("beat {} missing", beat.wire_name()));
            assert_eq!(state.versions.len(), 1);
            assert_eq!(state.active_version_id, state.versions[0].id);
            assert!(state.versions[0].text.is_empty());
        }
    }

    #[test]
    fn chapter_resolution_prefers_volume_match() {
        let mut story = StoryState::new();
        story.volumes.push(Volume {
            id: "vol-1".into(),
            number: 1,
            title: "Book One".into(),
            summary: String::new(),
        });
        story.volumes.push(Volume {
            id: "vol-2".into(),
            number: 2,
            title: "Book Two".into(),
            summary: String::new(),
        });

        let mut ch_a = Chapter::new(3, "Crossing the river", "outline a");
        ch_a.volume_id = Some("vol-1".into());
        let mut ch_b = Chapter::new(3, "The second mountain", "outline b");
        ch_b.volume_id = Some("vol-2".into());
        story.outline.push(ch_a);
        story.outline.push(ch_b);

        let hit = story.chapter(3, Some(2)).expect("volume-scoped chapter");
        assert_eq!(hit.title, "The second mountain");

        // Number-only lookup falls back to outline order.
        let first = story.chapter(3, None).expect("number-only chapter");
        assert_eq!(first.title, "Crossing the river");
    }

    #[test]
    fn beat_wire_names_round_trip() {
        for beat in Beat::ALL {
            assert_eq!(Beat::from_wire(beat.wire_name()), Some(beat));
        }
        assert_eq!(Beat::from_wire("denouement"), None);
    }

    #[test]
    fn story_state_round_trips_through_json() {
        let mut story = StoryState::new();
        story.title = "The Silent Sword".into();
        story.outline.push(Chapter::new(1, "A storm gathers", "outline"));
        story.story_bible = Some(StoryBible {
            versions: vec![StoryBibleVersion {
                chapter_number: 1,
                volume_number: None,
                character_status: "Lin Hai: wounded, in the valley".into(),
                key_items_and_locations: String::new(),
                active_plot_threads: String::new(),
                important_rules: String::new(),
                timestamp: now_millis(),
            }],
            active_chapter_number: Some(1),
            active_volume_number: None,
        });

        let json = serde_json::to_value(&story).expect("serialize");
        // Persisted field names match the original document shape.
        assert!(json.get("activeBlueprintId").is_some());
        assert!(json.get("worldGuide").is_some());
        assert!(json["storyBible"]["versions"][0].get("character_status").is_some());

        let back: StoryState = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, story);
    }
}
