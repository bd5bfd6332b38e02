//! Client-side query lifecycle.

use std::fmt;

use trino_protocol::{EngineState, Phase};

/// Lifecycle state of a query as seen by the client.
///
/// ```text
/// Created ──► Queued ──► Running ──► Finished
///    │           │          │
///    └───────────┴──────────┴──► Failed | Canceled
/// ```
///
/// `Finished`, `Failed` and `Canceled` are terminal: no transition leaves
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryState {
    /// Built locally, not yet acknowledged by the coordinator.
    #[default]
    Created,
    /// Accepted, waiting for resources or planning.
    Queued,
    /// Executing; pages may carry data.
    Running,
    /// Every page has been received.
    Finished,
    /// The engine or the transport failed the query.
    Failed,
    /// Canceled by the caller or a deadline.
    Canceled,
}

impl QueryState {
    /// Whether the state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Canceled)
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Staying in the same non-terminal state is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Created => next != Self::Created,
            Self::Queued => next != Self::Created,
            Self::Running => !matches!(next, Self::Created | Self::Queued),
            Self::Finished | Self::Failed | Self::Canceled => false,
        }
    }

    /// Upper-case name, as the engine spells states.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl From<Phase> for QueryState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Queued => Self::Queued,
            Phase::Running => Self::Running,
            Phase::Finished => Self::Finished,
            Phase::Failed => Self::Failed,
        }
    }
}

impl From<EngineState> for QueryState {
    fn from(state: EngineState) -> Self {
        state.phase().into()
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
