//! Per-run progress reporting and cooperative cancellation.
//!
//! A [`RunContext`] is created for each filter invocation and threaded
//! explicitly through every stage. It carries two things:
//! - a [`CancelToken`] that any thread may trip, checked at iteration and
//!   stage boundaries
//! - an optional fire-and-forget progress callback invoked at named phase
//!   transitions
//!
//! # Example
//!
//! ```
//! use srs_mesh::progress::{CancelToken, RunContext};
//!
//! let token = CancelToken::new();
//! let ctx = RunContext::new()
//!     .with_cancel_token(token.clone())
//!     .with_progress(Box::new(|p| eprintln!("[{}] {}", p.current, p.message)));
//!
//! ctx.report("Filtering process started...");
//! token.cancel();
//! assert!(ctx.is_cancelled());
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Progress information passed to callbacks.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Number of phase messages reported so far, starting at 1.
    pub current: u64,

    /// Expected number of phase messages, 0 when unknown.
    pub total: u64,

    /// Human-readable phase description.
    pub message: String,

    /// Time since the run context was created.
    pub elapsed: Duration,
}

impl Progress {
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// Fraction complete in `[0, 1]`, or 0 when the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f64 / self.total as f64).min(1.0)
        }
    }

    #[inline]
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }
}

/// Progress callback. It cannot fail and its return value is ignored.
pub type ProgressCallback = Box<dyn Fn(&Progress) + Send + Sync>;

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a handle kept by the caller can stop a
/// run executing on another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// State owned by a single filter run.
pub struct RunContext {
    cancel: CancelToken,
    callback: Option<ProgressCallback>,
    reported: AtomicU64,
    total: u64,
    started: Instant,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("has_callback", &self.callback.is_some())
            .field("reported", &self.reported.load(Ordering::Relaxed))
            .field("total", &self.total)
            .finish()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            cancel: CancelToken::new(),
            callback: None,
            reported: AtomicU64::new(0),
            total: 0,
            started: Instant::now(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Set the expected number of phase messages for fraction reporting.
    pub fn with_total_steps(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    /// A handle to this run's cancellation flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of messages reported so far.
    pub fn reported(&self) -> u64 {
        self.reported.load(Ordering::Relaxed)
    }

    /// Announce a phase transition.
    ///
    /// The message is logged and handed to the callback. A panicking
    /// callback is contained here and never reaches the pipeline.
    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        let current = self.reported.fetch_add(1, Ordering::Relaxed) + 1;
        info!(step = current, "{message}");

        let Some(callback) = self.callback.as_ref() else {
            return;
        };
        let progress = Progress {
            current,
            total: self.total,
            message,
            elapsed: self.elapsed(),
        };
        if catch_unwind(AssertUnwindSafe(|| callback(&progress))).is_err() {
            warn!(message = %progress.message, "Progress callback panicked; ignoring");
        }
    }
}
