//! Transition table and retry policy for generation jobs.

use chrono::Utc;
use thiserror::Error;

use super::types::{GenerationJob, JobEvent, JobState, Transition};

/// An event that is not valid in the job's current state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal transition: {event} while {from} (attempt {attempts}/{max_attempts})")]
pub struct IllegalTransitionError {
    pub from: JobState,
    pub event: JobEvent,
    pub attempts: u32,
    pub max_attempts: u32,
}

impl JobState {
    /// Next state for `event`, or `None` if the transition is illegal.
    ///
    /// `attempts_remain` gates leaving `Failed`: a failed job only re-enters
    /// submission while it still has attempts left.
    pub fn next(self, event: JobEvent, attempts_remain: bool) -> Option<JobState> {
        use JobEvent::*;
        use JobState::*;

        match (self, event) {
            (Pending, SubmitOk) => Some(Submitted),
            (Pending, SubmitFail) => Some(Failed),

            (Failed, SubmitOk) if attempts_remain => Some(Submitted),
            (Failed, SubmitFail) if attempts_remain => Some(Failed),

            (Submitted, PollRunning) => Some(Polling),
            (Submitted, PollFail) => Some(Failed),
            (Submitted, Timeout) => Some(TimedOut),

            (Polling, PollRunning) => Some(Polling),
            (Polling, PollDone) => Some(Succeeded),
            (Polling, PollFail) => Some(Failed),
            (Polling, Timeout) => Some(TimedOut),

            _ => None,
        }
    }
}

impl GenerationJob {
    /// Apply one event and return the new state.
    ///
    /// Submission events (`SubmitOk`, `SubmitFail`) consume one attempt.
    pub fn advance(&mut self, event: JobEvent) -> Result<JobState, IllegalTransitionError> {
        let from = self.state;
        let to = from
            .next(event, self.attempts < self.max_attempts)
            .ok_or(IllegalTransitionError {
                from,
                event,
                attempts: self.attempts,
                max_attempts: self.max_attempts,
            })?;

        if event.is_submission() {
            self.attempts += 1;
        }

        let at = Utc::now();
        self.state = to;
        self.updated_at = at;
        self.history.push(Transition {
            from,
            event,
            to,
            at,
        });

        Ok(to)
    }

    /// True iff the job is `Failed` (never `TimedOut`) and has attempts left.
    pub fn should_retry(&self) -> bool {
        self.state == JobState::Failed && self.attempts < self.max_attempts
    }
}
