//! Invariant enforcement and legacy-save migration.
//!
//! Two helpers run at document-load time and whenever a blueprint is read:
//! seeding missing beat version histories, and lifting legacy chapters
//! (which stored a single flat body string) into the versioned shape.
//! Both are idempotent; an already-conformant document is returned
//! untouched so callers can skip spurious change notifications.

use crate::story::{
    Beat, BeatVersionState, Blueprint, ContentVersion, StoryState, StructureData,
};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// Ensure every beat of the blueprint has at least one version.
///
/// Missing or empty beat histories are seeded from the flattened `data`
/// mirror. Returns `None` when the blueprint is already conformant.
pub fn ensure_beat_versions(blueprint: &Blueprint) -> Option<Blueprint> {
    let missing: Vec<Beat> = Beat::ALL
        .iter()
        .copied()
        .filter(|beat| {
            blueprint
                .beat_versions
                .get(beat)
                .map_or(true, |state| state.versions.is_empty())
        })
        .collect();

    if missing.is_empty() {
        return None;
    }

    let mut fixed = blueprint.clone();
    for beat in missing {
        fixed
            .beat_versions
            .insert(beat, BeatVersionState::seeded(blueprint.data.get(beat)));
    }
    Some(fixed)
}

/// Ensure the whole document satisfies its structural invariants.
///
/// Covers beat version histories on every blueprint and the
/// at-least-one-content-version rule on every chapter. Returns `None` when
/// nothing needed fixing.
pub fn ensure_story(story: &StoryState) -> Option<StoryState> {
    let mut fixed = story.clone();
    let mut changed = false;

    for blueprint in &mut fixed.blueprints {
        if let Some(repaired) = ensure_beat_versions(blueprint) {
            *blueprint = repaired;
            changed = true;
        }
    }

    for chapter in &mut fixed.outline {
        if chapter.content_versions.is_empty() {
            let seed = ContentVersion::new("Initial draft", "").with_context(true);
            chapter.active_version_id = seed.id.clone();
            chapter.content_versions.push(seed);
            changed = true;
        }
    }

    if changed {
        Some(fixed)
    } else {
        None
    }
}

/// Migrate a persisted document of any historical shape into the current
/// [`StoryState`].
///
/// Handles saves that predate blueprints (a flat `structure` object) and
/// chapters that predate content versioning (a flat `content` string). An
/// unreadable document falls back to a fresh empty story rather than
/// failing the load.
pub fn migrate_story(mut value: Value) -> StoryState {
    let Some(root) = value.as_object_mut() else {
        if !value.is_null() {
            warn!("persisted story is not an object; starting fresh");
        }
        return StoryState::new();
    };

    // Blueprints: lift a legacy flat `structure` into a single blueprint.
    let has_blueprints = root
        .get("blueprints")
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty());
    if !has_blueprints {
        let data: StructureData = root
            .get("structure")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let blueprint = Blueprint::seeded("Migrated backup", data);
        debug!(blueprint_id = %blueprint.id, "migrated legacy structure into blueprint");
        root.insert(
            "activeBlueprintId".into(),
            Value::String(blueprint.id.clone()),
        );
        root.insert(
            "blueprints".into(),
            serde_json::to_value(vec![blueprint]).unwrap_or(Value::Array(Vec::new())),
        );
    } else if !root.contains_key("activeBlueprintId") {
        let first_id = root["blueprints"][0]["id"].clone();
        root.insert("activeBlueprintId".into(), first_id);
    }

    // Chapters: lift flat `content` strings into seeded version histories
    // and default `isContext` on pre-flag versions.
    if let Some(chapters) = root.get_mut("outline").and_then(Value::as_array_mut) {
        for chapter in chapters.iter_mut() {
            migrate_chapter(chapter);
        }
    }

    let story: StoryState = match serde_json::from_value(Value::Object(root.clone())) {
        Ok(story) => story,
        Err(err) => {
            warn!(%err, "failed to read persisted story; starting fresh");
            return StoryState::new();
        }
    };

    ensure_story(&story).unwrap_or(story)
}

fn migrate_chapter(chapter: &mut Value) {
    let Some(obj) = chapter.as_object_mut() else {
        return;
    };

    let has_versions = obj
        .get("contentVersions")
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty());

    if !has_versions {
        let body = obj
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let id = Uuid::new_v4().to_string();
        obj.insert(
            "contentVersions".into(),
            serde_json::json!([{
                "id": id,
                "versionName": "Initial draft",
                "timestamp": crate::story::now_millis(),
                "text": body,
                "isContext": true,
            }]),
        );
        obj.insert("activeVersionId".into(), Value::String(id));
        obj.remove("content");
        return;
    }

    let active_id = obj
        .get("activeVersionId")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(versions) = obj.get_mut("contentVersions").and_then(Value::as_array_mut) {
        for version in versions.iter_mut() {
            let Some(v) = version.as_object_mut() else {
                continue;
            };
            if !v.contains_key("isContext") {
                // Only the active version defaults to being in context.
                let is_active = v.get("id").and_then(Value::as_str) == active_id.as_deref();
                v.insert("isContext".into(), Value::Bool(is_active));
            }
        }
    }
    if active_id.is_none() {
        let first_id = obj["contentVersions"][0]["id"].clone();
        obj.insert("activeVersionId".into(), first_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_beat_versions_is_noop_on_conformant_blueprint() {
        let blueprint = Blueprint::seeded("draft", StructureData::default());
        assert!(ensure_beat_versions(&blueprint).is_none());
    }

    #[test]
    fn ensure_beat_versions_seeds_from_flat_data() {
        let mut blueprint = Blueprint::seeded("draft", StructureData::default());
        blueprint.data.climax = "The duel on the bridge".into();
        blueprint.beat_versions.remove(&Beat::Climax);

        let fixed = ensure_beat_versions(&blueprint).expect("should repair");
        let state = fixed.beat_versions.get(&Beat::Climax).expect("climax seeded");
        assert_eq!(state.versions.len(), 1);
        assert_eq!(state.versions[0].text, "The duel on the bridge");

        // Second pass is a no-op.
        assert!(ensure_beat_versions(&fixed).is_none());
    }

    #[test]
    fn ensure_story_is_noop_on_fresh_story() {
        assert!(ensure_story(&StoryState::new()).is_none());
    }

    #[test]
    fn migrates_legacy_flat_structure() {
        let legacy = json!({
            "title": "Old Save",
            "synopsis": "",
            "structure": {
                "hook": "A letter arrives",
                "incitingIncident": "",
                "risingAction": "",
                "climax": "",
                "fallingAction": "",
                "resolution": ""
            },
            "outline": [],
        });

        let story = migrate_story(legacy);
        assert_eq!(story.title, "Old Save");
        assert_eq!(story.blueprints.len(), 1);
        assert_eq!(story.active_blueprint_id, story.blueprints[0].id);
        let hook = story.blueprints[0]
            .beat_versions
            .get(&Beat::Hook)
            .expect("hook seeded");
        assert_eq!(hook.versions[0].text, "A letter arrives");
    }

    #[test]
    fn migrates_legacy_flat_chapter_content() {
        let legacy = json!({
            "title": "Old Save",
            "activeBlueprintId": "bp",
            "blueprints": [{
                "id": "bp",
                "versionName": "v1",
                "timestamp": 0,
            }],
            "outline": [{
                "id": "ch",
                "number": 1,
                "title": "Ashfall",
                "summary": "outline",
                "content": "The city burned through the night.",
            }],
        });

        let story = migrate_story(legacy);
        let chapter = &story.outline[0];
        assert_eq!(chapter.content_versions.len(), 1);
        assert_eq!(
            chapter.content_versions[0].text,
            "The city burned through the night."
        );
        assert!(chapter.content_versions[0].is_context);
        assert_eq!(chapter.active_version_id, chapter.content_versions[0].id);
    }

    #[test]
    fn defaults_is_context_on_active_version_only() {
        let legacy = json!({
            "activeBlueprintId": "bp",
            "blueprints": [{"id": "bp", "versionName": "v1", "timestamp": 0}],
            "outline": [{
                "id": "ch",
                "number": 1,
                "title": "Ashfall",
                "summary": "outline",
                "activeVersionId": "v2",
                "contentVersions": [
                    {"id": "v1", "versionName": "Draft 1", "timestamp": 0, "text": "a"},
                    {"id": "v2", "versionName": "Draft 2", "timestamp": 1, "text": "b"},
                ],
            }],
        });

        let story = migrate_story(legacy);
        let versions = &story.outline[0].content_versions;
        assert!(!versions[0].is_context);
        assert!(versions[1].is_context);
    }

    #[test]
    fn migration_is_idempotent() {
        let story = {
            let mut s = StoryState::new();
            s.title = "Stable".into();
            s.outline.push(crate::story::Chapter::new(1, "Opening", "outline"));
            s
        };
        let value = serde_json::to_value(&story).expect("serialize");
        let migrated = migrate_story(value);
        assert_eq!(migrated, story);
    }

    #[test]
    fn unreadable_document_falls_back_to_fresh_story() {
        let story = migrate_story(json!("not an object"));
        assert_eq!(story.outline.len(), 0);
        assert_eq!(story.blueprints.len(), 1);
    }
}
