// Speculative racing of generation candidates.
//
// A round runs K candidate futures concurrently on the current task. The first
// candidate to come back `Accepted` claims the round's CancelFlag and wins;
// the remaining futures are dropped, which cancels them at their next await.
// Candidates also poll the flag between steps so work that is already past an
// await point stops early, and an `Accepted` that arrives after the flag was
// claimed is discarded.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use annotator_common::{squash_whitespace, truncate_chars, FEEDBACK_CHAR_CAP, FEEDBACK_MAX_REASONS};
use anyhow::Error;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

/// Write-once cancellation flag shared by the candidates of a race.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Claim the single winner slot. Only the first caller gets `true`.
    pub fn claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// How one candidate ended, when it did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome<T> {
    /// Draft produced and (where judged) passed.
    Accepted(T),
    /// Draft produced but rejected; the reason feeds the next round.
    Rejected(String),
    /// Observed the cancel flag at a checkpoint and stopped.
    Cancelled,
}

#[derive(Debug)]
pub enum RaceOutcome<T> {
    Won(T),
    /// Every candidate was rejected, cancelled or errored, and at least one
    /// reached a verdict. Carries the aggregated feedback.
    Lost { feedback: String },
    /// No candidate reached a verdict; the first error encountered.
    Failed(Error),
}

/// Run `candidates` concurrently and resolve with the first accepted one.
pub async fn race<T, F>(candidates: Vec<F>, flag: &CancelFlag) -> RaceOutcome<T>
where
    F: Future<Output = anyhow::Result<CandidateOutcome<T>>>,
{
    let total = candidates.len();
    let mut in_flight: FuturesUnordered<F> = candidates.into_iter().collect();
    let mut reasons: Vec<String> = Vec::new();
    let mut first_error: Option<Error> = None;

    while let Some(result) = in_flight.next().await {
        match result {
            Ok(CandidateOutcome::Accepted(value)) => {
                if flag.claim() {
                    debug!(total, pending = in_flight.len(), "race: winner found, cancelling the rest");
                    return RaceOutcome::Won(value);
                }
                debug!("race: discarding accepted candidate that finished after cancellation");
            }
            Ok(CandidateOutcome::Rejected(reason)) => {
                debug!(reason = reason.as_str(), "race: candidate rejected");
                reasons.push(reason);
            }
            Ok(CandidateOutcome::Cancelled) => {}
            Err(e) => {
                warn!(error = %e, "race: candidate failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if reasons.is_empty() => RaceOutcome::Failed(e),
        _ => RaceOutcome::Lost {
            feedback: aggregate_feedback(&reasons),
        },
    }
}

/// Join the first few rejection reasons into one bounded feedback string.
pub fn aggregate_feedback(reasons: &[String]) -> String {
    let joined = reasons
        .iter()
        .map(|r| squash_whitespace(r))
        .filter(|r| !r.is_empty())
        .take(FEEDBACK_MAX_REASONS)
        .enumerate()
        .map(|(i, r)| format!("{}. {r}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(&joined, FEEDBACK_CHAR_CAP)
}
