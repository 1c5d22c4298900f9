//! Loading older saved documents and writing onto them.

use serde_json::json;
use storyforge_core::migrate::migrate_story;
use storyforge_core::session::StorySession;
use storyforge_core::testing::storyboard_args;
use storyforge_core::validate::RawCall;

#[test]
fn legacy_flat_document_migrates_and_accepts_writes() {
    // Pre-blueprint save: flat structure, chapters with bare content.
    let legacy = json!({
        "title": "The Silent Sword",
        "structure": {
            "hook": "A stranger arrives at midnight.",
            "incitingIncident": "",
            "risingAction": "",
            "climax": "",
            "fallingAction": "",
            "resolution": "",
        },
        "outline": [
            {
                "id": "ch-1",
                "number": 1,
                "title": "A storm gathers",
                "summary": "The stranger is recognized.",
                "content": "Rain fell on the mountain road...",
            }
        ],
        "characters": [],
        "worldGuide": [],
    });

    let story = migrate_story(legacy);
    assert_eq!(story.title, "The Silent Sword");

    // The flat beat text survives as a seeded version.
    let blueprint = story.active_blueprint().expect("migrated blueprint");
    assert_eq!(blueprint.data.hook, "A stranger arrives at midnight.");

    // The flat chapter content was lifted into a content version.
    let chapter = story.chapter(1, None).expect("chapter 1");
    assert!(chapter.has_content());
    assert_eq!(chapter.content_versions.len(), 1);
    assert!(chapter.active_version().unwrap().is_context);

    // New writes land on the migrated document like on a fresh one.
    let mut session = StorySession::new(story);
    let report = session.handle_call(&RawCall::new("c1", "update_storyboard", storyboard_args(1)));
    assert!(report.succeeded(), "result: {:?}", report.result);

    let story = session.story();
    let chapter = story.chapter(1, None).unwrap();
    assert_eq!(chapter.content_versions.len(), 2);
    assert!(!chapter.content_versions[0].is_context);
}

#[test]
fn unreadable_document_falls_back_to_a_fresh_story() {
    let story = migrate_story(json!("not even an object"));
    assert!(story.outline.is_empty());
    assert!(story.active_blueprint().is_some());
}
