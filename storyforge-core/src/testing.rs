//! Test doubles and fixture builders.
//!
//! Used by the integration tests under `tests/` and by downstream crates
//! that want to exercise a session without a live provider.

use std::collections::VecDeque;

use llm::{Error, ModelClient, ModelReply, ModelRequest};
use serde_json::{Value, json};

use crate::orchestrator::{ChapterGenerator, GenerationRequest};
use crate::session::{CallResult, IngestReport, StorySession};

/// Repeat one character; handy for hitting validator length floors exactly.
pub fn long_text(ch: char, len: usize) -> String {
    std::iter::repeat(ch).take(len).collect()
}

/// Arguments for a composite write that passes validation.
pub fn storyboard_args(chapter: u32) -> Value {
    json!({
        "chapterNumber": chapter,
        "chapterTitle": format!("Turning Point {chapter}"),
        "chapter_content": long_text('a', 600),
        "chapter_outline": format!(
            "plot: {} character: {} foreshadow: {}",
            long_text('x', 300),
            long_text('y', 300),
            long_text('z', 300)
        ),
        "updated_story_bible": {
            "character_status": "Lin Hai: wounded, hiding in the valley",
            "key_items_and_locations": "The jade seal: carried by Lin Hai",
            "active_plot_threads": "1. Find the antidote (ongoing)",
        }
    })
}

/// A reply whose text embeds a composite write as a fenced JSON block, the
/// shape the fallback extractor recovers.
pub fn fenced_storyboard_reply(chapter: u32) -> ModelReply {
    ModelReply::text(format!(
        "Writing chapter {chapter} now.\n```json\n{}\n```",
        json!({"tool_name": "update_storyboard", "args": storyboard_args(chapter)})
    ))
}

/// Arguments for an outline-only chapter write that passes validation.
pub fn outline_args(chapter: u32) -> Value {
    json!({
        "number": chapter,
        "title": format!("Design {chapter}"),
        "summary": long_text('s', 80),
    })
}

/// A reply carrying an outline-only write as a fenced JSON block.
pub fn fenced_outline_reply(chapter: u32) -> ModelReply {
    ModelReply::text(format!(
        "Designing chapter {chapter}.\n```json\n{}\n```",
        json!({"tool_name": "add_chapter", "args": outline_args(chapter)})
    ))
}

/// Model client that replays a fixed script of replies and records every
/// request it receives.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: VecDeque<Result<ModelReply, String>>,
    pub requests: Vec<ModelRequest>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&mut self, reply: ModelReply) {
        self.replies.push_back(Ok(reply));
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.replies.push_back(Err(message.into()));
    }
}

impl ModelClient for ScriptedClient {
    async fn send(&mut self, request: ModelRequest) -> Result<ModelReply, Error> {
        self.requests.push(request);
        match self.replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::Api {
                status: 500,
                message,
            }),
            None => Err(Error::Api {
                status: 500,
                message: "scripted client ran out of replies".into(),
            }),
        }
    }
}

/// Chapter generator that feeds scripted replies through a real session, so
/// orchestration tests run the full validate/apply/marker pipeline.
pub struct ScriptedGenerator {
    pub session: StorySession,
    pub replies: VecDeque<ModelReply>,
}

impl ScriptedGenerator {
    pub fn new(session: StorySession) -> Self {
        Self {
            session,
            replies: VecDeque::new(),
        }
    }

    pub fn push_reply(&mut self, reply: ModelReply) {
        self.replies.push_back(reply);
    }
}

impl ChapterGenerator for ScriptedGenerator {
    async fn generate(&mut self, request: GenerationRequest) -> Result<(), String> {
        let reply = self
            .replies
            .pop_front()
            .ok_or_else(|| "no scripted reply left".to_string())?;
        match self.session.ingest_reply(&reply, Some(request.strategy)) {
            IngestReport::Handled { reports, .. } => {
                for report in &reports {
                    match &report.result {
                        CallResult::Applied { .. } => {}
                        CallResult::Invalid { errors } => {
                            return Err(format!(
                                "{} rejected by validation: {}",
                                report.operation,
                                errors.join("; ")
                            ));
                        }
                        CallResult::Rejected { reason } => {
                            return Err(format!("{} rejected: {reason}", report.operation));
                        }
                    }
                }
                Ok(())
            }
            IngestReport::NoCall { .. } => Err("reply carried no tool call".into()),
            IngestReport::ExtractionFailed { guidance, .. } => Err(guidance),
        }
    }
}
