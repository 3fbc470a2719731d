// src/error.rs
use std::fmt;

/// Stages of one notifier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Fetching,
    Filtering,
    Notifying,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Filtering => "filtering",
            Self::Notifying => "notifying",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Conditions that abort a run before (or while) notifying.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("seen store error during {state}: {source:#}")]
    Store {
        state: RunState,
        source: anyhow::Error,
    },

    #[error("feed fetch failed: {0:#}")]
    Fetch(anyhow::Error),

    #[error("feed {feed} returned no items")]
    EmptyFeed { feed: String },
}

impl RunError {
    /// Process exit code for this failure. Always non-zero.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Store { .. } => 3,
            Self::Fetch(_) | Self::EmptyFeed { .. } => 4,
        }
    }

    /// State the machine was in when it gave up.
    pub fn failed_in(&self) -> RunState {
        match self {
            Self::Config(_) => RunState::Init,
            Self::Store { state, .. } => *state,
            Self::Fetch(_) | Self::EmptyFeed { .. } => RunState::Fetching,
        }
    }
}
