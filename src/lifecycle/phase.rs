//! Build lifecycle phases and the events emitted on entering them.

use std::fmt;

/// Phase of a clean-build session.
///
/// Phases advance strictly in declaration order; `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing created yet; the container is acquired in this phase
    Idle,
    /// Pushing and inflating the snapshot archive
    SettingUp,
    /// Polling the container's network reachability
    WaitingForNetwork,
    /// Network reachable, build not started
    NetworkReady,
    /// Contained build tool running
    Building,
    /// Pulling the artifact back to the host
    Retrieving,
    /// Artifact retrieved
    Done,
    /// Unrecoverable error
    Failed,
}

impl Phase {
    /// Next phase on success; terminal phases have none.
    pub fn successor(self) -> Option<Phase> {
        match self {
            Self::Idle => Some(Self::SettingUp),
            Self::SettingUp => Some(Self::WaitingForNetwork),
            Self::WaitingForNetwork => Some(Self::NetworkReady),
            Self::NetworkReady => Some(Self::Building),
            Self::Building => Some(Self::Retrieving),
            Self::Retrieving => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Transition out of this phase after its work succeeded or failed.
    ///
    /// Terminal phases never move.
    pub fn advance(self, succeeded: bool) -> Phase {
        match (self.successor(), succeeded) {
            (None, _) => self,
            (Some(next), true) => next,
            (Some(_), false) => Self::Failed,
        }
    }

    /// `true` for `Done` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "creating container",
            Self::SettingUp => "setting up container",
            Self::WaitingForNetwork => "waiting for network",
            Self::NetworkReady => "preparing build",
            Self::Building => "building",
            Self::Retrieving => "retrieving artifact",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Observable event emitted once when a phase is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Entered `SettingUp`
    SettingUp,
    /// Entered `WaitingForNetwork`
    WaitingForNetwork,
    /// Entered `NetworkReady`
    NetworkEstablished,
    /// Entered `Done` with the retrieved artifact's file name
    Retrieved(String),
}

impl PhaseEvent {
    /// Event for entering `phase`, if that entry is reported.
    pub fn on_enter(phase: Phase, artifact_name: &str) -> Option<PhaseEvent> {
        match phase {
            Phase::SettingUp => Some(Self::SettingUp),
            Phase::WaitingForNetwork => Some(Self::WaitingForNetwork),
            Phase::NetworkReady => Some(Self::NetworkEstablished),
            Phase::Done => Some(Self::Retrieved(artifact_name.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SettingUp => f.write_str("Setting up container with project assets"),
            Self::WaitingForNetwork => f.write_str("Waiting for a network connection..."),
            Self::NetworkEstablished => f.write_str("Network connection established"),
            Self::Retrieved(artifact) => write!(f, "Retrieved {}", artifact),
        }
    }
}
