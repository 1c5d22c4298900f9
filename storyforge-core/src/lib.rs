//! Core engine for tool-call driven story writing.
//!
//! The model talks to the story exclusively through a small set of tools;
//! this crate owns everything between a model reply and a mutated story
//! document:
//!
//! - [`story`]: the versioned story document itself.
//! - [`migrate`]: invariant repair and legacy-document migration.
//! - [`validate`]: per-operation argument validation and normalization.
//! - [`extract`]: recovery of tool calls embedded in free reply text.
//! - [`reduce`]: the pure reducer that applies a normalized operation.
//! - [`markers`]: success markers and post-write verification.
//! - [`orchestrator`]: the sequential auto-write loop.
//! - [`session`]: the reply-to-document pipeline tying it all together.
//! - [`tools`]: the tool declarations advertised to the model.
//!
//! Provider transport lives behind [`llm::ModelClient`]; this crate never
//! performs network I/O.

pub mod extract;
pub mod markers;
pub mod migrate;
pub mod orchestrator;
pub mod reduce;
pub mod session;
pub mod story;
pub mod testing;
pub mod tools;
pub mod validate;

pub use markers::{MarkerStore, VerifyConfig, VerifyOutcome, WriteExpectation};
pub use orchestrator::{AutoWriteConfig, AutoWriteState, AutoWriter, StopFlag, WritingMode};
pub use reduce::{apply, ApplyContext, ApplyResult, Outcome};
pub use session::{CallReport, CallResult, IngestReport, SharedStory, StorySession};
pub use story::StoryState;
pub use validate::{validate_call, Operation, RawCall, ValidationReport};
