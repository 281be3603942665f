use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::additive_normalizer::AdditiveCode;
use crate::api_connection::connection::ScoringApiError;
use crate::api_connection::endpoints::InteractionReport;

/// Pairwise scoring needs at least two distinct codes to say anything.
pub const MIN_CODES_FOR_CHECK: usize = 2;

/// Settle time before a scheduled check fires, tuned so a burst of routine
/// edits produces a single request.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub fn can_run(codes: &[AdditiveCode]) -> bool {
    codes.len() >= MIN_CODES_FOR_CHECK
}

/// Seam between the orchestrator and the scoring backend, so tests can swap
/// in a canned scorer.
pub trait InteractionScorer: Send + Sync {
    fn check(
        &self,
        codes: &[AdditiveCode],
    ) -> impl Future<Output = Result<InteractionReport, ScoringApiError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckState {
    Idle,
    Loading,
    Success(InteractionReport),
    Error(String),
}

/// What became of one submission. `Superseded` means a newer submission took
/// over while this one was waiting or in flight, so its result was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Applied,
    Superseded,
    InsufficientInput,
}

struct CheckerInner {
    state: CheckState,
    seq: u64,
}

/// Drives interaction checks against a scorer and owns the published state.
///
/// Every submission takes a ticket from a monotonically increasing sequence;
/// a result is only applied while its ticket is still the newest, so a slow
/// response can never overwrite the outcome of a later submission.
pub struct InteractionChecker<S> {
    scorer: S,
    debounce_window: Duration,
    inner: Mutex<CheckerInner>,
}

impl<S: InteractionScorer> InteractionChecker<S> {
    pub fn new(scorer: S) -> Self {
        Self::with_debounce_window(scorer, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce_window(scorer: S, debounce_window: Duration) -> Self {
        Self {
            scorer,
            debounce_window,
            inner: Mutex::new(CheckerInner {
                state: CheckState::Idle,
                seq: 0,
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CheckState {
        self.lock().state.clone()
    }

    /// Runs a check immediately. With fewer than two codes no request is
    /// issued: the state clears to `Idle` and, because the ticket sequence
    /// still advances, any response already in flight is discarded on
    /// arrival instead of resurrecting a stale report.
    pub async fn run_check(&self, codes: &[AdditiveCode]) -> CheckOutcome {
        if !can_run(codes) {
            return self.clear_to_idle();
        }

        let ticket = {
            let mut inner = self.lock();
            inner.seq += 1;
            inner.state = CheckState::Loading;
            inner.seq
        };

        let result = self.scorer.check(codes).await;
        self.apply(ticket, result)
    }

    /// Runs a check after the debounce window. The ticket is taken up front,
    /// so a later submission invalidates this one while it is still waiting
    /// and the burst collapses into a single request. `Loading` is only
    /// published once the request actually goes out. Only requests wait:
    /// with fewer than two codes the state clears to `Idle` at once, the
    /// same as `run_check`.
    pub async fn schedule_check(&self, codes: &[AdditiveCode]) -> CheckOutcome {
        if !can_run(codes) {
            return self.clear_to_idle();
        }

        let ticket = {
            let mut inner = self.lock();
            inner.seq += 1;
            inner.seq
        };

        sleep(self.debounce_window).await;

        {
            let mut inner = self.lock();
            if inner.seq != ticket {
                debug!(ticket, newest = inner.seq, "debounced check superseded while waiting");
                return CheckOutcome::Superseded;
            }
            inner.state = CheckState::Loading;
        }

        let result = self.scorer.check(codes).await;
        self.apply(ticket, result)
    }

    fn clear_to_idle(&self) -> CheckOutcome {
        let mut inner = self.lock();
        inner.seq += 1;
        inner.state = CheckState::Idle;
        CheckOutcome::InsufficientInput
    }

    fn apply(&self, ticket: u64, result: Result<InteractionReport, ScoringApiError>) -> CheckOutcome {
        let mut inner = self.lock();
        if inner.seq != ticket {
            debug!(ticket, newest = inner.seq, "discarding stale interaction result");
            return CheckOutcome::Superseded;
        }
        inner.state = match result {
            Ok(report) => CheckState::Success(report),
            Err(err) => CheckState::Error(err.to_string()),
        };
        CheckOutcome::Applied
    }

    // The lock is never held across an await, so a poisoned mutex can only
    // mean a panic mid-update of plain data; the state is still usable.
    fn lock(&self) -> MutexGuard<'_, CheckerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
