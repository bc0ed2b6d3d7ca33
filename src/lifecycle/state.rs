//! Startup state machine of a fixture.

use std::fmt;

/// Where a fixture is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Spec built, nothing requested from the engine yet.
    Pending,
    /// The container is being created or reused.
    Starting,
    /// The container runs and the readiness probe is being polled.
    WaitingReady,
    /// The typed client is live.
    Ready,
    /// Startup stopped at a recorded error.
    Failed,
    /// Cleanup has run.
    Released,
}

impl LifecycleState {
    /// Return whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Starting | Self::Failed)
                | (Self::Starting, Self::WaitingReady | Self::Failed)
                | (Self::WaitingReady, Self::Ready | Self::Failed)
                | (Self::Ready | Self::Failed, Self::Released)
        )
    }

    /// Return whether startup has finished, successfully or not.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Released)
    }

    /// Return the lowercase state name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Starting => "starting",
            Self::WaitingReady => "waiting-ready",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Released => "released",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the state of one `up` call and logs each transition.
#[derive(Debug)]
pub(crate) struct StateTracker<'a> {
    name: &'a str,
    state: LifecycleState,
}

impl<'a> StateTracker<'a> {
    pub(crate) const fn new(name: &'a str) -> Self {
        Self {
            name,
            state: LifecycleState::Pending,
        }
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Move to `next`; an illegal transition is logged and ignored.
    pub(crate) fn advance(&mut self, next: LifecycleState) {
        if self.state.can_transition_to(next) {
            tracing::debug!(fixture = self.name, from = %self.state, to = %next, "lifecycle transition");
            self.state = next;
        } else {
            tracing::warn!(fixture = self.name, from = %self.state, to = %next, "ignored illegal lifecycle transition");
        }
    }
}
