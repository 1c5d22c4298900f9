//! Success markers and post-dispatch write verification.
//!
//! A composite chapter write is only trusted once it is confirmed. Before
//! dispatching, the caller drops a pending marker for the target chapter;
//! the apply path flips it to success, and a failed apply deletes it. The
//! verifier then polls until the marker confirms, the document itself shows
//! the chapter was written, or a timeout expires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::story::now_millis;

/// One success marker, keyed by chapter number in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub chapter: u32,
    pub success: bool,
    pub created_at: i64,
}

/// Shared map of per-chapter success markers. Cheap to clone; all clones
/// see the same map.
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    inner: Arc<Mutex<HashMap<u32, Marker>>>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a pending marker for a chapter about to be written. Overwrites
    /// any stale marker from an earlier attempt.
    pub fn begin(&self, chapter: u32) {
        let mut map = self.lock();
        map.insert(
            chapter,
            Marker {
                chapter,
                success: false,
                created_at: now_millis(),
            },
        );
    }

    /// Flip the marker for a chapter to success, creating it if the begin
    /// step was skipped.
    pub fn confirm(&self, chapter: u32) {
        let mut map = self.lock();
        map.insert(
            chapter,
            Marker {
                chapter,
                success: true,
                created_at: now_millis(),
            },
        );
    }

    /// Remove the marker for a chapter. Called both on apply failure (where
    /// the deletion itself signals failure to the verifier) and after a
    /// confirmed verification.
    pub fn clear(&self, chapter: u32) {
        self.lock().remove(&chapter);
    }

    pub fn get(&self, chapter: u32) -> Option<Marker> {
        self.lock().get(&chapter).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, Marker>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Read-only view of the document used to corroborate a write when the
/// marker alone is not conclusive.
pub trait DocumentView {
    fn chapter_exists(&self, number: u32) -> bool;
    fn chapter_has_content(&self, number: u32) -> bool;
    /// Highest chapter number currently in the outline, if any.
    fn max_chapter_number(&self) -> Option<u32>;
}

/// What the document must show for a pending write to count as landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteExpectation {
    /// The chapter must exist with non-empty body text.
    ChapterContent,
    /// The chapter only needs to exist. Outline-only writes leave the body
    /// empty, so content is not required.
    ChapterExists,
}

impl WriteExpectation {
    fn met<D: DocumentView>(&self, document: &D, chapter: u32) -> bool {
        match self {
            WriteExpectation::ChapterContent => document.chapter_has_content(chapter),
            WriteExpectation::ChapterExists => document.chapter_exists(chapter),
        }
    }
}

/// How a verification concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The write was confirmed, either by the marker or by the document.
    Confirmed { via: Confirmation },
    /// The write could not be confirmed; `reason` is specific enough to
    /// surface to the user.
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Marker,
    Document,
}

impl VerifyOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, VerifyOutcome::Confirmed { .. })
    }
}

/// Verification timing. The defaults match interactive use: a write either
/// lands within a few polls or it is not going to land at all.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Poll until the chapter write for `chapter` is confirmed or the timeout
/// expires.
///
/// A marker that disappears while pending means the apply path rejected the
/// write; that fails immediately rather than waiting out the timeout.
pub async fn verify_chapter_write<D: DocumentView>(
    markers: &MarkerStore,
    document: &D,
    chapter: u32,
    expectation: WriteExpectation,
    config: &VerifyConfig,
) -> VerifyOutcome {
    let deadline = Instant::now() + config.timeout;

    loop {
        match markers.get(chapter) {
            Some(marker) if marker.success => {
                markers.clear(chapter);
                debug!(chapter, "write confirmed by marker");
                return VerifyOutcome::Confirmed {
                    via: Confirmation::Marker,
                };
            }
            Some(_) => {
                // Still pending; the document may already show the write.
                if expectation.met(document, chapter) {
                    markers.clear(chapter);
                    debug!(chapter, "write confirmed by document state");
                    return VerifyOutcome::Confirmed {
                        via: Confirmation::Document,
                    };
                }
            }
            None => {
                warn!(chapter, "marker deleted while pending; write was rejected");
                return VerifyOutcome::Failed {
                    reason: format!(
                        "chapter {chapter} write was rejected during apply (marker deleted)"
                    ),
                };
            }
        }

        if Instant::now() >= deadline {
            break;
        }
        sleep(config.poll_interval).await;
    }

    // Timed out; one last look at the marker and the document, then report
    // what the document shows.
    if let Some(marker) = markers.get(chapter) {
        if marker.success {
            markers.clear(chapter);
            return VerifyOutcome::Confirmed {
                via: Confirmation::Marker,
            };
        }
    }
    if expectation.met(document, chapter) {
        markers.clear(chapter);
        return VerifyOutcome::Confirmed {
            via: Confirmation::Document,
        };
    }
    markers.clear(chapter);
    let reason = if !document.chapter_exists(chapter) {
        format!("verification timed out: chapter {chapter} was never created")
    } else {
        format!("verification timed out: chapter {chapter} exists but has no content")
    };
    warn!(chapter, %reason, "write verification failed");
    VerifyOutcome::Failed { reason }
}
