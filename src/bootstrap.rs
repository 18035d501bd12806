//! Startup and bounded retry
//!
//! Sidebar fragments can be inserted after the script runs and there is no
//! readiness signal for them, so wiring is polled: one attempt at startup,
//! then one per interval tick until every group is wired or the attempt
//! budget is spent. Each tick also re-runs the highlight pass so an
//! auto-open happens as soon as the panel appears.

use serde::Serialize;

use crate::host::Host;
use crate::menu::NavMenu;

/// Result of the startup attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BootStatus {
    /// Every group is wired; no timer is needed
    Ready,
    /// Some elements are missing; the host should start the interval
    Pending,
}

/// Result of one interval tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TickOutcome {
    /// Keep the interval running
    Continue,
    /// Everything wired; stop the interval
    Ready,
    /// Attempt budget spent; stop the interval
    Exhausted,
}

impl TickOutcome {
    pub fn is_final(self) -> bool {
        !matches!(self, TickOutcome::Continue)
    }
}

#[derive(Debug, Clone)]
pub struct RetryLoop {
    attempts: u32,
    max_attempts: u32,
    outcome: Option<TickOutcome>,
}

impl RetryLoop {
    /// Highlight once and try to wire everything
    pub fn start<H: Host>(menu: &mut NavMenu<H::Node>, host: &H) -> (Self, BootStatus) {
        menu.highlight(host);
        let ready = menu.wire_all(host);
        let retry = Self {
            attempts: 0,
            max_attempts: menu.config().retry.max_attempts,
            outcome: ready.then_some(TickOutcome::Ready),
        };
        if ready {
            log::debug!("all submenus wired at startup");
            (retry, BootStatus::Ready)
        } else {
            log::debug!(
                "submenus not ready, retrying every {}ms up to {} times",
                menu.config().retry.interval_ms,
                retry.max_attempts
            );
            (retry, BootStatus::Pending)
        }
    }

    /// One interval tick. Once a final outcome is reached further ticks do
    /// nothing and repeat it.
    pub fn tick<H: Host>(&mut self, menu: &mut NavMenu<H::Node>, host: &H) -> TickOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        self.attempts += 1;
        menu.highlight(host);
        let outcome = if menu.wire_all(host) {
            log::debug!("all submenus wired after {} retries", self.attempts);
            TickOutcome::Ready
        } else if self.attempts >= self.max_attempts {
            log::debug!("giving up on missing submenus after {} retries", self.attempts);
            TickOutcome::Exhausted
        } else {
            TickOutcome::Continue
        };
        if outcome.is_final() {
            self.outcome = Some(outcome);
        }
        outcome
    }

    /// Interval ticks performed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<TickOutcome> {
        self.outcome
    }
}
