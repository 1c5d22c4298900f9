//! Auto-write orchestration against a real session: scripted replies run
//! the full extract/validate/apply/marker pipeline while the orchestrator
//! verifies and sequences.

use std::time::Duration;

use llm::ModelReply;
use serde_json::json;
use storyforge_core::markers::VerifyConfig;
use storyforge_core::orchestrator::{
    AutoWriteConfig, AutoWriteError, AutoWriteState, AutoWriter, WritingMode,
};
use storyforge_core::session::StorySession;
use storyforge_core::story::StoryState;
use storyforge_core::testing::{
    fenced_outline_reply, fenced_storyboard_reply, long_text, ScriptedGenerator,
};

fn harness(replies: Vec<ModelReply>) -> (AutoWriter<ScriptedGenerator, storyforge_core::SharedStory>, tokio::sync::watch::Receiver<AutoWriteState>, storyforge_core::SharedStory) {
    let session = StorySession::new(StoryState::new());
    let shared = session.shared_story();
    let markers = session.markers();
    let mut generator = ScriptedGenerator::new(session);
    for reply in replies {
        generator.push_reply(reply);
    }
    let (writer, state) = AutoWriter::new(generator, shared.clone(), markers);
    (writer, state, shared)
}

fn quick_config(start: u32, count: u32) -> AutoWriteConfig {
    AutoWriteConfig {
        start_chapter: start,
        count,
        mode: WritingMode::Default,
        cooldown: Duration::from_secs(1),
        verify: VerifyConfig::default(),
    }
}

#[tokio::test(start_paused = true)]
async fn writes_three_chapters_in_sequence() {
    let (mut writer, state, shared) = harness(vec![
        fenced_storyboard_reply(1),
        fenced_storyboard_reply(2),
        fenced_storyboard_reply(3),
    ]);

    let written = writer.run(quick_config(1, 3)).await.expect("clean run");
    assert_eq!(written, 3);
    assert_eq!(
        *state.borrow(),
        AutoWriteState::Completed { chapters_written: 3 }
    );

    let story = shared.snapshot();
    for number in 1..=3 {
        let chapter = story.chapter(number, None).unwrap_or_else(|| {
            panic!("chapter {number} missing");
        });
        assert!(chapter.has_content(), "chapter {number} has no content");
    }
    // Sequential writes each see the previous chapter's bible replaced or
    // extended, one entry per chapter.
    assert_eq!(story.story_bible.unwrap().versions.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn design_outline_mode_verifies_chapters_without_content() {
    // Outline-only chapters carry an empty seeded body; the run must still
    // confirm each write instead of timing out waiting for content.
    let (mut writer, state, shared) = harness(vec![
        fenced_outline_reply(1),
        fenced_outline_reply(2),
    ]);

    let written = writer
        .run(AutoWriteConfig {
            mode: WritingMode::DesignOutline,
            ..quick_config(1, 2)
        })
        .await
        .expect("outline run");
    assert_eq!(written, 2);
    assert_eq!(
        *state.borrow(),
        AutoWriteState::Completed { chapters_written: 2 }
    );

    let story = shared.snapshot();
    for number in 1..=2 {
        let chapter = story.chapter(number, None).unwrap_or_else(|| {
            panic!("chapter {number} missing");
        });
        assert_eq!(chapter.title, format!("Design {number}"));
        assert!(!chapter.has_content());
    }
}

#[tokio::test(start_paused = true)]
async fn halts_at_the_first_unconfirmed_chapter() {
    // Chapter 2's reply is prose with no recoverable call; chapters 1 and 3
    // have valid writes scripted.
    let (mut writer, state, shared) = harness(vec![
        fenced_storyboard_reply(1),
        ModelReply::text(format!("Let me think about this. {}", long_text('p', 800))),
        fenced_storyboard_reply(3),
    ]);

    let err = writer.run(quick_config(1, 3)).await.unwrap_err();
    let AutoWriteError::Generation { chapter, .. } = err else {
        panic!("expected generation failure, got {err:?}");
    };
    assert_eq!(chapter, 2);
    assert!(matches!(
        *state.borrow(),
        AutoWriteState::Failed { chapter: 2, .. }
    ));

    // Chapter 1 survived; chapters 2 and 3 were never written.
    let story = shared.snapshot();
    assert!(story.chapter(1, None).unwrap().has_content());
    assert!(story.chapter(2, None).is_none());
    assert!(story.chapter(3, None).is_none());
}

#[tokio::test(start_paused = true)]
async fn invalid_composite_reply_halts_with_the_validation_error() {
    let bad = ModelReply::text(format!(
        "```json\n{}\n```",
        json!({
            "tool_name": "update_storyboard",
            "args": {
                "chapterNumber": 1,
                "chapterTitle": "第1章",
                "chapter_content": long_text('a', 600),
                "chapter_outline": long_text('o', 900),
                "updated_story_bible": {"character_status": "x: y"},
            }
        })
    ));
    let (mut writer, _state, shared) = harness(vec![bad]);

    let err = writer.run(quick_config(1, 1)).await.unwrap_err();
    let AutoWriteError::Generation { chapter, message } = err else {
        panic!("expected generation failure, got {err:?}");
    };
    assert_eq!(chapter, 1);
    assert!(message.contains("第1章"));
    assert!(shared.snapshot().chapter(1, None).is_none());
}

#[tokio::test(start_paused = true)]
async fn stop_request_ends_the_run_between_chapters() {
    let (mut writer, state, shared) = harness(vec![
        fenced_storyboard_reply(1),
        fenced_storyboard_reply(2),
        fenced_storyboard_reply(3),
    ]);
    let stop = writer.stop_handle();

    let run = tokio::spawn(async move {
        writer
            .run(AutoWriteConfig {
                cooldown: Duration::from_secs(30),
                ..quick_config(1, 3)
            })
            .await
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    stop.stop();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let written = run.await.unwrap().expect("stopped run still returns Ok");
    assert_eq!(written, 1);
    assert_eq!(*state.borrow(), AutoWriteState::Stopped { completed: 1 });
    assert!(shared.snapshot().chapter(2, None).is_none());
}

#[tokio::test(start_paused = true)]
async fn start_chapter_continues_the_existing_outline() {
    let session = StorySession::new(StoryState::new());
    let shared = session.shared_story();
    let markers = session.markers();
    let mut generator = ScriptedGenerator::new(session);
    // Seed chapters 1 and 2 through the pipeline itself.
    generator.push_reply(fenced_storyboard_reply(1));
    generator.push_reply(fenced_storyboard_reply(2));
    generator.push_reply(fenced_storyboard_reply(3));

    let (mut writer, _state) = AutoWriter::new(generator, shared.clone(), markers);
    writer.run(quick_config(1, 2)).await.expect("seed run");

    // Asking to start at chapter 9 gets clamped to chapter 3.
    writer.run(quick_config(9, 1)).await.expect("resumed run");
    let story = shared.snapshot();
    assert!(story.chapter(3, None).is_some());
    assert!(story.chapter(9, None).is_none());
}
