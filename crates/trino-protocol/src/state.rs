//! Engine-reported query states.

use std::fmt;

/// A query state as reported in `stats.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EngineState {
    /// Waiting in a resource group queue.
    Queued,
    /// Waiting for cluster resources.
    WaitingForResources,
    /// Being dispatched to a coordinator.
    Dispatching,
    /// Being planned.
    Planning,
    /// Tasks are starting.
    Starting,
    /// Running.
    Running,
    /// Running but blocked on a buffer.
    Blocked,
    /// Output is being finalized.
    Finishing,
    /// Completed successfully.
    Finished,
    /// Failed, including user cancellation.
    Failed,
}

/// Coarse lifecycle phase of an [`EngineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Accepted but not yet producing output.
    Queued,
    /// Producing output.
    Running,
    /// Completed successfully.
    Finished,
    /// Failed.
    Failed,
}

impl EngineState {
    /// Parse the engine's state string. Unknown strings yield `None`.
    #[must_use]
    pub fn parse(state: &str) -> Option<Self> {
        let state = match state {
            "QUEUED" => Self::Queued,
            "WAITING_FOR_RESOURCES" => Self::WaitingForResources,
            "DISPATCHING" => Self::Dispatching,
            "PLANNING" => Self::Planning,
            "STARTING" => Self::Starting,
            "RUNNING" => Self::Running,
            "BLOCKED" => Self::Blocked,
            "FINISHING" => Self::Finishing,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            _ => return None,
        };
        Some(state)
    }

    /// The wire name of this state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::WaitingForResources => "WAITING_FOR_RESOURCES",
            Self::Dispatching => "DISPATCHING",
            Self::Planning => "PLANNING",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Blocked => "BLOCKED",
            Self::Finishing => "FINISHING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }

    /// Collapse into the client-side lifecycle phase.
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Self::Queued
            | Self::WaitingForResources
            | Self::Dispatching
            | Self::Planning
            | Self::Starting => Phase::Queued,
            Self::Running | Self::Blocked | Self::Finishing => Phase::Running,
            Self::Finished => Phase::Finished,
            Self::Failed => Phase::Failed,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
