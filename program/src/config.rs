use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::GovernanceError;

/// Slots between proposal creation and the voting power snapshot.
pub const DEFAULT_VOTING_DELAY: u64 = 1;

/// Roughly one week of 400ms slots.
pub const DEFAULT_VOTING_PERIOD: u64 = 1_512_000;

pub const MIN_VOTING_PERIOD: u64 = 1;

/// Roughly eight weeks of slots.
pub const MAX_VOTING_PERIOD: u64 = 12_096_000;

pub const MAX_VOTING_DELAY: u64 = 12_096_000;

/// Smallest accepted proposal threshold.
pub const MIN_PROPOSAL_THRESHOLD: u64 = 1;

pub const DEFAULT_MAX_PROPOSALS: u32 = 32;

/// Upper bound on stored proposals; the governor account is sized for it.
pub const MAX_PROPOSALS: u32 = 256;

/// Governance parameters fixed at deployment and changed only by the governor authority.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernanceConfig {
    pub voting_delay: u64,
    pub voting_period: u64,
    /// Minimum `for + abstain` weight for a proposal to be able to succeed.
    pub quorum: u64,
    /// Weight a proposer needs one slot before proposing. At least `MIN_PROPOSAL_THRESHOLD`.
    pub proposal_threshold: u64,
    /// Slots after the deadline during which the attester may still submit. `None` never closes.
    pub attestation_window: Option<u64>,
    /// Slots after the deadline during which a succeeded proposal may be queued. `None` never expires.
    pub queue_grace_period: Option<u64>,
    /// Proposals kept at once. Settled ones are pruned to make room for new ones.
    pub max_proposals: u32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            voting_delay: DEFAULT_VOTING_DELAY,
            voting_period: DEFAULT_VOTING_PERIOD,
            quorum: 0,
            proposal_threshold: MIN_PROPOSAL_THRESHOLD,
            attestation_window: None,
            queue_grace_period: None,
            max_proposals: DEFAULT_MAX_PROPOSALS,
        }
    }
}

impl GovernanceConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if !(MIN_VOTING_PERIOD..=MAX_VOTING_PERIOD).contains(&self.voting_period) {
            return Err(GovernanceError::InvalidConfig);
        }
        if self.voting_delay > MAX_VOTING_DELAY {
            return Err(GovernanceError::InvalidConfig);
        }
        if self.attestation_window == Some(0) || self.queue_grace_period == Some(0) {
            return Err(GovernanceError::InvalidConfig);
        }
        if self.proposal_threshold < MIN_PROPOSAL_THRESHOLD
            || !(1..=MAX_PROPOSALS).contains(&self.max_proposals)
        {
            return Err(GovernanceError::InvalidConfig);
        }
        Ok(())
    }
}
