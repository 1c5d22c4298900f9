//! Sequential auto-write orchestration.
//!
//! Drives chapter generation one chapter at a time: drop a pending marker,
//! dispatch the generator, verify the write landed, cool down, move on. A
//! failed or unverified write halts the run on the spot; the orchestrator
//! never advances past a chapter it could not confirm.
//!
//! Progress is published through a `watch` channel so a frontend can render
//! the current chapter, cooldown countdown, and terminal state without
//! polling the orchestrator itself.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::markers::{
    DocumentView, MarkerStore, VerifyConfig, VerifyOutcome, WriteExpectation, verify_chapter_write,
};

/// How the auto-writer asks for each chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingMode {
    /// Outline plus full chapter body in one composite write.
    Default,
    /// Outline design only; no chapter body is written.
    DesignOutline,
    /// Body straight from the existing outline.
    DirectManuscript,
}

/// The request shape implied by a writing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStrategy {
    Composite,
    OutlineOnly,
    FullManuscript,
}

impl WritingMode {
    pub fn strategy(&self) -> RequestStrategy {
        match self {
            WritingMode::Default => RequestStrategy::Composite,
            WritingMode::DesignOutline => RequestStrategy::OutlineOnly,
            WritingMode::DirectManuscript => RequestStrategy::FullManuscript,
        }
    }
}

impl RequestStrategy {
    /// What the verifier must see in the document for a write made under
    /// this strategy. Outline-only writes never produce body text.
    pub fn expectation(&self) -> WriteExpectation {
        match self {
            RequestStrategy::OutlineOnly => WriteExpectation::ChapterExists,
            RequestStrategy::Composite | RequestStrategy::FullManuscript => {
                WriteExpectation::ChapterContent
            }
        }
    }
}

/// One unit of work handed to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub chapter: u32,
    pub strategy: RequestStrategy,
    /// Whether the chapter was already in the outline when this request was
    /// made. Lets generators build a rewrite request instead of a fresh one
    /// without re-deriving it from the document.
    pub chapter_exists: bool,
}

/// Produces and applies the write for one chapter.
///
/// Implementations drive the model and the call pipeline; by the time
/// `generate` resolves, a successful write has flipped the chapter's marker
/// and a rejected one has deleted it.
pub trait ChapterGenerator {
    fn generate(
        &mut self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<(), String>> + Send;
}

/// Observable run state.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoWriteState {
    Idle,
    Running { chapter: u32, remaining: u32 },
    Cooldown { next_chapter: u32, seconds_left: u64 },
    /// Stopped by request; `completed` chapters were confirmed before the
    /// stop took effect.
    Stopped { completed: u32 },
    Failed { chapter: u32, reason: String },
    Completed { chapters_written: u32 },
}

#[derive(Debug, Error)]
pub enum AutoWriteError {
    #[error("generation for chapter {chapter} failed: {message}")]
    Generation { chapter: u32, message: String },
    #[error("verification for chapter {chapter} failed: {reason}")]
    Verification { chapter: u32, reason: String },
}

/// Cancellation handle shared between the orchestrator and its caller. The
/// flag is checked after dispatch, after verification, and on every cooldown
/// tick, so a stop takes effect without abandoning an in-flight write.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct AutoWriteConfig {
    /// First chapter to write. Adjusted down if it would leave a gap in the
    /// outline.
    pub start_chapter: u32,
    /// How many chapters to write in this run.
    pub count: u32,
    pub mode: WritingMode,
    /// Pause between confirmed chapters.
    pub cooldown: Duration,
    pub verify: VerifyConfig,
}

impl Default for AutoWriteConfig {
    fn default() -> Self {
        Self {
            start_chapter: 1,
            count: 1,
            mode: WritingMode::Default,
            cooldown: Duration::from_secs(5),
            verify: VerifyConfig::default(),
        }
    }
}

/// Clamp a requested start chapter so the run continues the outline rather
/// than jumping past it.
pub fn adjust_start_chapter(requested: u32, max_existing: Option<u32>) -> u32 {
    let next = max_existing.map(|m| m + 1).unwrap_or(1);
    requested.min(next).max(1)
}

/// The sequential auto-writer.
pub struct AutoWriter<G, D> {
    generator: G,
    document: D,
    markers: MarkerStore,
    stop: StopFlag,
    state_tx: watch::Sender<AutoWriteState>,
}

impl<G, D> AutoWriter<G, D>
where
    G: ChapterGenerator,
    D: DocumentView,
{
    /// Create an auto-writer plus the receiver for its state updates.
    pub fn new(
        generator: G,
        document: D,
        markers: MarkerStore,
    ) -> (Self, watch::Receiver<AutoWriteState>) {
        let (state_tx, state_rx) = watch::channel(AutoWriteState::Idle);
        (
            Self {
                generator,
                document,
                markers,
                stop: StopFlag::default(),
                state_tx,
            },
            state_rx,
        )
    }

    /// A handle the caller can use to request a stop from another task.
    pub fn stop_handle(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Run one auto-write session. Returns the number of confirmed chapters
    /// on clean completion or stop, the halting error otherwise.
    pub async fn run(&mut self, config: AutoWriteConfig) -> Result<u32, AutoWriteError> {
        self.stop.reset();
        let start = adjust_start_chapter(config.start_chapter, self.document.max_chapter_number());
        if start != config.start_chapter {
            info!(
                requested = config.start_chapter,
                adjusted = start,
                "start chapter adjusted to continue the outline"
            );
        }
        let strategy = config.mode.strategy();
        let mut completed = 0u32;

        for offset in 0..config.count {
            let chapter = start + offset;
            if self.stop.is_stopped() {
                return Ok(self.finish_stopped(completed));
            }

            self.set_state(AutoWriteState::Running {
                chapter,
                remaining: config.count - offset,
            });
            info!(chapter, ?strategy, "dispatching chapter write");

            let chapter_exists = self.document.chapter_exists(chapter);
            self.markers.begin(chapter);
            if let Err(message) = self
                .generator
                .generate(GenerationRequest {
                    chapter,
                    strategy,
                    chapter_exists,
                })
                .await
            {
                self.markers.clear(chapter);
                warn!(chapter, %message, "generation failed; halting run");
                self.set_state(AutoWriteState::Failed {
                    chapter,
                    reason: message.clone(),
                });
                return Err(AutoWriteError::Generation { chapter, message });
            }

            if self.stop.is_stopped() {
                self.markers.clear(chapter);
                return Ok(self.finish_stopped(completed));
            }

            let outcome = verify_chapter_write(
                &self.markers,
                &self.document,
                chapter,
                strategy.expectation(),
                &config.verify,
            )
            .await;
            match outcome {
                VerifyOutcome::Confirmed { via } => {
                    info!(chapter, ?via, "chapter write confirmed");
                    completed += 1;
                }
                VerifyOutcome::Failed { reason } => {
                    self.set_state(AutoWriteState::Failed {
                        chapter,
                        reason: reason.clone(),
                    });
                    return Err(AutoWriteError::Verification { chapter, reason });
                }
            }

            if self.stop.is_stopped() {
                return Ok(self.finish_stopped(completed));
            }

            // Cooldown before the next chapter, skipped after the last one.
            if offset + 1 < config.count {
                let next_chapter = chapter + 1;
                for seconds_left in (1..=config.cooldown.as_secs()).rev() {
                    self.set_state(AutoWriteState::Cooldown {
                        next_chapter,
                        seconds_left,
                    });
                    sleep(Duration::from_secs(1)).await;
                    if self.stop.is_stopped() {
                        return Ok(self.finish_stopped(completed));
                    }
                }
            }
        }

        self.set_state(AutoWriteState::Completed {
            chapters_written: completed,
        });
        info!(completed, "auto-write run completed");
        Ok(completed)
    }

    fn finish_stopped(&self, completed: u32) -> u32 {
        info!(completed, "auto-write run stopped by request");
        self.set_state(AutoWriteState::Stopped { completed });
        completed
    }

    fn set_state(&self, state: AutoWriteState) {
        self.state_tx.send_replace(state);
    }
}
