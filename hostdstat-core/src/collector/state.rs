//! Per-host collection lifecycle

use serde::{Deserialize, Serialize};

/// Where a host is in its collection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostState {
    /// Not yet started
    Init,
    /// Opening the connection
    Connecting,
    /// Authenticated
    Connected,
    /// Running probes
    Probing,
    /// All metrics classified
    Classified,
    /// Connect or authentication failed
    ConnectFailed,
    /// Report emitted
    Reported,
}

impl HostState {
    /// Returns true if `self -> next` is a legal transition
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Connecting)
                | (Self::Connecting, Self::Connected | Self::ConnectFailed)
                | (Self::Connected, Self::Probing)
                | (Self::Probing, Self::Classified)
                | (Self::Classified | Self::ConnectFailed, Self::Reported)
        )
    }

    /// True once no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Reported)
    }
}

impl std::fmt::Display for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Probing => "probing",
            Self::Classified => "classified",
            Self::ConnectFailed => "connect_failed",
            Self::Reported => "reported",
        };
        f.write_str(name)
    }
}

/// The states one host passed through, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateTrace(Vec<HostState>);

impl StateTrace {
    /// A trace positioned at [`HostState::Init`]
    #[must_use]
    pub fn new() -> Self {
        Self(vec![HostState::Init])
    }

    /// Current state
    #[must_use]
    pub fn current(&self) -> HostState {
        self.0.last().copied().unwrap_or(HostState::Init)
    }

    /// Moves to `next`. An illegal transition is logged and still recorded.
    pub fn advance(&mut self, host: &str, next: HostState) {
        let current = self.current();
        if current.can_advance_to(next) {
            tracing::trace!(host = %host, from = %current, to = %next, "Host state change");
        } else {
            tracing::warn!(host = %host, from = %current, to = %next, "Unexpected host state change");
        }
        self.0.push(next);
    }

    /// All recorded states
    #[must_use]
    pub fn states(&self) -> &[HostState] {
        &self.0
    }

    /// True when every recorded step was a legal transition
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0.first() == Some(&HostState::Init)
            && self.0.windows(2).all(|w| w[0].can_advance_to(w[1]))
    }
}

impl Default for StateTrace {
    fn default() -> Self {
        Self::new()
    }
}
