//! Story session: the pipeline from a model reply to a mutated story.
//!
//! A session owns the shared story document and its marker store. Replies
//! come in with structured tool calls or as free text; each recovered call
//! runs through validation, the reducer, and (for composite chapter writes)
//! the marker protocol that the verifier in [`crate::markers`] watches.

use std::sync::{Arc, Mutex};

use llm::ModelReply;
use tracing::{info, warn};

use crate::extract::extract_tool_call;
use crate::markers::{DocumentView, MarkerStore};
use crate::orchestrator::RequestStrategy;
use crate::reduce::{apply, ApplyContext, Outcome};
use crate::story::StoryState;
use crate::validate::{validate_call, RawCall};

/// Story document behind a shared handle, so the session (writer) and the
/// orchestrator's verifier (reader) observe the same state.
#[derive(Debug, Clone, Default)]
pub struct SharedStory {
    inner: Arc<Mutex<StoryState>>,
}

impl SharedStory {
    pub fn new(story: StoryState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(story)),
        }
    }

    /// A copy of the current document.
    pub fn snapshot(&self) -> StoryState {
        self.lock().clone()
    }

    pub fn replace(&self, story: StoryState) {
        *self.lock() = story;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoryState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DocumentView for SharedStory {
    fn chapter_exists(&self, number: u32) -> bool {
        self.lock().chapter(number, None).is_some()
    }

    fn chapter_has_content(&self, number: u32) -> bool {
        self.lock()
            .chapter(number, None)
            .is_some_and(|c| c.has_content())
    }

    fn max_chapter_number(&self) -> Option<u32> {
        self.lock().max_chapter_number()
    }
}

/// Outcome of handling one tool call.
#[derive(Debug, Clone)]
pub struct CallReport {
    pub call_id: String,
    pub operation: String,
    pub warnings: Vec<String>,
    pub result: CallResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    /// Validated and reduced; `summary` lists the touched fields.
    Applied { summary: Vec<String> },
    /// Validation rejected the arguments; nothing was applied.
    Invalid { errors: Vec<String> },
    /// Arguments were valid but the reducer refused the operation.
    Rejected { reason: String },
}

impl CallReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, CallResult::Applied { .. })
    }
}

/// Outcome of ingesting one model reply.
#[derive(Debug, Clone)]
pub enum IngestReport {
    /// One or more calls were found and handled. `text` is the reply prose
    /// with any recovered call span removed.
    Handled {
        reports: Vec<CallReport>,
        text: String,
    },
    /// Plain prose; no call was expected or found.
    NoCall { text: String },
    /// A call was expected but none could be recovered. `text` is the full,
    /// untruncated reply for diagnostics; `guidance` tells the model how to
    /// re-send.
    ExtractionFailed { text: String, guidance: String },
}

/// A story document under tool-call control.
pub struct StorySession {
    story: SharedStory,
    markers: MarkerStore,
    /// Recorded on content versions produced by this session.
    pub model_id: Option<String>,
}

impl StorySession {
    pub fn new(story: StoryState) -> Self {
        Self {
            story: SharedStory::new(story),
            markers: MarkerStore::new(),
            model_id: None,
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Shared handle to the document, for the orchestrator's verifier.
    pub fn shared_story(&self) -> SharedStory {
        self.story.clone()
    }

    /// Shared marker store, for the orchestrator's verifier.
    pub fn markers(&self) -> MarkerStore {
        self.markers.clone()
    }

    /// A copy of the current story.
    pub fn story(&self) -> StoryState {
        self.story.snapshot()
    }

    /// Handle a model reply end to end.
    ///
    /// Structured tool calls take priority; when there are none, the
    /// fallback extractor scans the reply text. `expected` is the request
    /// strategy in force, used to pick the re-send guidance when a call was
    /// required but missing.
    pub fn ingest_reply(
        &mut self,
        reply: &ModelReply,
        expected: Option<RequestStrategy>,
    ) -> IngestReport {
        if !reply.tool_calls.is_empty() {
            let reports = reply
                .tool_calls
                .iter()
                .map(|invocation| {
                    self.handle_call(&RawCall::new(
                        invocation.id.clone(),
                        invocation.name.clone(),
                        invocation.args.clone(),
                    ))
                })
                .collect();
            return IngestReport::Handled {
                reports,
                text: reply.text.clone(),
            };
        }

        if let Some(extracted) = extract_tool_call(&reply.text) {
            info!(
                strategy = ?extracted.strategy,
                name = %extracted.call.name,
                "tool call recovered from reply text"
            );
            let report = self.handle_call(&extracted.call);
            return IngestReport::Handled {
                reports: vec![report],
                text: extracted.cleaned_text,
            };
        }

        match expected {
            None => IngestReport::NoCall {
                text: reply.text.clone(),
            },
            Some(strategy) => {
                warn!(?strategy, "expected a tool call but none could be recovered");
                IngestReport::ExtractionFailed {
                    text: reply.text.clone(),
                    guidance: resend_guidance(strategy).to_string(),
                }
            }
        }
    }

    /// Validate and apply one tool call, running the marker protocol for
    /// composite chapter writes.
    pub fn handle_call(&mut self, call: &RawCall) -> CallReport {
        let validation = validate_call(call);
        let Some(operation) = validation.normalized else {
            warn!(call = %call.name, errors = ?validation.errors, "tool call rejected by validation");
            return CallReport {
                call_id: call.id.clone(),
                operation: call.name.clone(),
                warnings: validation.warnings,
                result: CallResult::Invalid {
                    errors: validation.errors,
                },
            };
        };

        // Both chapter-writing operations run the marker protocol, so the
        // verifier confirms outline-only writes the same way as composite
        // ones.
        let target_chapter = operation.target_chapter();
        if let Some(chapter) = target_chapter {
            self.markers.begin(chapter);
        }

        let ctx = ApplyContext {
            model_id: self.model_id.clone(),
        };
        let applied = apply(self.story.snapshot(), &operation, &ctx);
        let result = match applied.outcome {
            Outcome::Applied { summary } => {
                self.story.replace(applied.story);
                if let Some(chapter) = target_chapter {
                    self.markers.confirm(chapter);
                }
                info!(op = operation.name(), "tool call applied");
                CallResult::Applied { summary }
            }
            Outcome::Failed { reason } => {
                if let Some(chapter) = target_chapter {
                    // Deleting the pending marker is the failure signal.
                    self.markers.clear(chapter);
                }
                warn!(op = operation.name(), %reason, "tool call rejected by reducer");
                CallResult::Rejected { reason }
            }
        };

        CallReport {
            call_id: call.id.clone(),
            operation: operation.name().to_string(),
            warnings: validation.warnings,
            result,
        }
    }
}

/// Re-send instructions for a reply that should have carried a tool call.
fn resend_guidance(strategy: RequestStrategy) -> &'static str {
    match strategy {
        RequestStrategy::Composite => {
            "The reply did not contain a usable tool call. Re-send the chapter as one \
             update_storyboard call carrying chapterNumber, chapterTitle, chapter_content, \
             chapter_outline, and updated_story_bible."
        }
        RequestStrategy::OutlineOnly => {
            "The reply did not contain a usable tool call. Re-send the outline as one \
             add_chapter call carrying number, title, and summary."
        }
        RequestStrategy::FullManuscript => {
            "The reply did not contain a usable tool call. Re-send the manuscript as one \
             update_storyboard call whose chapter_content holds the full chapter text and \
             whose chapter_outline repeats the existing outline."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::ToolInvocation;
    use serde_json::json;

    fn long_text(ch: char, len: usize) -> String {
        std::iter::repeat(ch).take(len).collect()
    }

    fn storyboard_args(chapter: u32) -> serde_json::Value {
        json!({
            "chapterNumber": chapter,
            "chapterTitle": "The Turning Point",
            "chapter_content": long_text('a', 600),
            "chapter_outline": long_text('o', 900),
            "updated_story_bible": {
                "character_status": "Lin Hai: wounded",
            }
        })
    }

    #[test]
    fn valid_composite_call_applies_and_confirms_marker_before_clearing() {
        let mut session = StorySession::new(StoryState::new()).with_model_id("gemini-2.5-pro");
        let report = session.handle_call(&RawCall::new(
            "call_1",
            "update_storyboard",
            storyboard_args(7),
        ));
        assert!(report.succeeded(), "result: {:?}", report.result);

        let story = session.story();
        let chapter = story.chapter(7, None).unwrap();
        assert_eq!(chapter.content_versions.len(), 1);
        assert_eq!(
            chapter.active_version().unwrap().model_id.as_deref(),
            Some("gemini-2.5-pro")
        );
        // Marker confirmed; the verifier clears it, not the session.
        assert!(session.markers().get(7).is_some_and(|m| m.success));
    }

    #[test]
    fn outline_call_confirms_its_chapter_marker() {
        // Outline-only chapters have no body text, so the verifier leans on
        // the marker; the session must flip it for add_chapter too.
        let mut session = StorySession::new(StoryState::new());
        let report = session.handle_call(&RawCall::new(
            "call_1",
            "add_chapter",
            json!({
                "number": 3,
                "title": "The Long Road",
                "summary": long_text('s', 60),
            }),
        ));
        assert!(report.succeeded(), "result: {:?}", report.result);

        let story = session.story();
        let chapter = story.chapter(3, None).unwrap();
        assert!(!chapter.has_content());
        assert!(session.markers().get(3).is_some_and(|m| m.success));
    }

    #[test]
    fn invalid_composite_call_leaves_no_marker_and_no_mutation() {
        let mut session = StorySession::new(StoryState::new());
        let before = session.story();
        let report = session.handle_call(&RawCall::new(
            "call_1",
            "update_storyboard",
            json!({
                "chapterNumber": "4",
                "chapterTitle": "第4章",
                "chapter_content": "too short",
                "chapter_outline": "also too short",
            }),
        ));

        let CallResult::Invalid { errors } = &report.result else {
            panic!("expected validation failure, got {:?}", report.result);
        };
        assert!(errors.iter().any(|e| e.contains("第4章")));
        assert_eq!(session.story(), before);
        assert!(session.markers().get(4).is_none());
    }

    #[test]
    fn reducer_rejection_is_reported_not_applied() {
        let mut session = StorySession::new(StoryState::new());
        let report = session.handle_call(&RawCall::new(
            "call_1",
            "add_character_behavior",
            json!({
                "characterName": "Nobody",
                "context": "asked a question",
                "response": "stays silent",
            }),
        ));
        assert!(matches!(report.result, CallResult::Rejected { .. }));
    }

    #[test]
    fn structured_calls_take_priority_over_reply_text() {
        let mut session = StorySession::new(StoryState::new());
        let mut reply = ModelReply::text("{\"tool_name\": \"add_chapter\", \"args\": {}}");
        reply.tool_calls.push(ToolInvocation {
            id: "call_9".into(),
            name: "add_world_entry".into(),
            args: json!({"category": "Locations", "name": "The Valley", "description": long_text('d', 60)}),
        });

        let IngestReport::Handled { reports, .. } =
            session.ingest_reply(&reply, Some(RequestStrategy::Composite))
        else {
            panic!("expected handled report");
        };
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].operation, "add_world_entry");
    }

    #[test]
    fn fallback_extraction_feeds_the_same_pipeline() {
        let mut session = StorySession::new(StoryState::new());
        let text = format!(
            "Writing it now.\n```json\n{}\n```",
            json!({"tool_name": "update_storyboard", "args": storyboard_args(2)})
        );
        let reply = ModelReply::text(text);

        let IngestReport::Handled { reports, text } =
            session.ingest_reply(&reply, Some(RequestStrategy::Composite))
        else {
            panic!("expected handled report");
        };
        assert!(reports[0].succeeded());
        assert_eq!(text, "Writing it now.");
        assert!(session.story().chapter(2, None).is_some());
    }

    #[test]
    fn extraction_failure_keeps_the_full_reply_text() {
        let mut session = StorySession::new(StoryState::new());
        let prose = long_text('x', 5000);
        let reply = ModelReply::text(prose.clone());

        let IngestReport::ExtractionFailed { text, guidance } =
            session.ingest_reply(&reply, Some(RequestStrategy::Composite))
        else {
            panic!("expected extraction failure");
        };
        assert_eq!(text, prose);
        assert!(guidance.contains("update_storyboard"));
    }

    #[test]
    fn prose_without_expectation_is_not_an_error() {
        let mut session = StorySession::new(StoryState::new());
        let reply = ModelReply::text("Here is my thinking about the next arc.");
        assert!(matches!(
            session.ingest_reply(&reply, None),
            IngestReport::NoCall { .. }
        ));
    }
}
