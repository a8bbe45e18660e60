//! Campaign state machine.

use std::fmt;

use uuid::Uuid;

use super::model::CampaignStatus;
use crate::error::Error;

/// Lifecycle triggers that move a campaign between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignAction {
    Schedule,
    Send,
    Complete,
    Pause,
}

impl CampaignAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Send => "send",
            Self::Complete => "complete",
            Self::Pause => "pause",
        }
    }

    /// Status the campaign lands in after this action.
    pub fn target(&self) -> CampaignStatus {
        match self {
            Self::Schedule => CampaignStatus::Scheduled,
            Self::Send => CampaignStatus::Sending,
            Self::Complete => CampaignStatus::Completed,
            Self::Pause => CampaignStatus::Paused,
        }
    }
}

impl fmt::Display for CampaignAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CampaignStatus {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: CampaignStatus) -> bool {
        use CampaignStatus::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, target),
            (Draft, Scheduled)
                | (Scheduled, Scheduled)
                | (Draft, Sending)
                | (Scheduled, Sending)
                | (Sending, Completed)
                | (Sending, Paused)
        )
    }

    /// Completed campaigns never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// A send is allowed to start from this status.
    pub fn is_sendable(&self) -> bool {
        self.can_transition_to(CampaignStatus::Sending)
    }

    /// Resolve `action` from this status, or explain why it is illegal.
    pub fn apply(&self, id: Uuid, action: CampaignAction) -> Result<CampaignStatus, Error> {
        let target = action.target();
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(invalid_state(id, *self, action))
        }
    }
}

pub(crate) fn invalid_state(id: Uuid, state: CampaignStatus, action: impl fmt::Display) -> Error {
    Error::InvalidState {
        id: id.to_string(),
        state: state.to_string(),
        action: action.to_string(),
    }
}
