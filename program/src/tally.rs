use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::GovernanceError;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSupport {
    Against,
    For,
    Abstain,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteReceipt {
    pub support: VoteSupport,
    pub weight: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotingPhase {
    Pending,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyOutcome {
    Succeeded,
    Defeated,
}

/// Slot bounds of a proposal's vote. Fixed at creation.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingWindow {
    /// Voting power is read as of this slot.
    pub snapshot: u64,
    pub deadline: u64,
}

impl VotingWindow {
    pub fn open(created: u64, voting_delay: u64, voting_period: u64) -> Result<Self, GovernanceError> {
        let snapshot = created
            .checked_add(voting_delay)
            .ok_or(GovernanceError::Overflow)?;
        let deadline = snapshot
            .checked_add(voting_period)
            .ok_or(GovernanceError::Overflow)?;
        Ok(Self { snapshot, deadline })
    }

    pub fn phase(&self, slot: u64) -> VotingPhase {
        if slot <= self.snapshot {
            VotingPhase::Pending
        } else if slot < self.deadline {
            VotingPhase::Active
        } else {
            VotingPhase::Ended
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub votes_for: u64,
    pub votes_against: u64,
    pub votes_abstain: u64,
    receipts: BTreeMap<Pubkey, VoteReceipt>,
}

impl VoteTally {
    pub fn has_voted(&self, account: &Pubkey) -> bool {
        self.receipts.contains_key(account)
    }

    pub fn receipt(&self, account: &Pubkey) -> Option<&VoteReceipt> {
        self.receipts.get(account)
    }

    pub fn voters(&self) -> usize {
        self.receipts.len()
    }

    pub fn register_vote(
        &mut self,
        window: &VotingWindow,
        slot: u64,
        account: Pubkey,
        weight: u64,
        support: VoteSupport,
    ) -> Result<(), GovernanceError> {
        if window.phase(slot) != VotingPhase::Active {
            return Err(GovernanceError::VotingClosed);
        }
        if self.has_voted(&account) {
            return Err(GovernanceError::AlreadyVoted);
        }
        if weight == 0 {
            return Err(GovernanceError::NoVotingPower);
        }

        let bucket = match support {
            VoteSupport::For => &mut self.votes_for,
            VoteSupport::Against => &mut self.votes_against,
            VoteSupport::Abstain => &mut self.votes_abstain,
        };
        *bucket = bucket.checked_add(weight).ok_or(GovernanceError::Overflow)?;
        self.receipts.insert(account, VoteReceipt { support, weight });
        Ok(())
    }

    /// Abstentions count toward quorum but not toward the majority.
    pub fn quorum_reached(&self, quorum: u64) -> bool {
        (self.votes_for as u128) + (self.votes_abstain as u128) >= quorum as u128
    }

    pub fn vote_succeeded(&self) -> bool {
        self.votes_for > self.votes_against
    }

    pub fn outcome(
        &self,
        window: &VotingWindow,
        slot: u64,
        quorum: u64,
    ) -> Result<TallyOutcome, GovernanceError> {
        if window.phase(slot) != VotingPhase::Ended {
            return Err(GovernanceError::VotingNotEnded);
        }
        if self.vote_succeeded() && self.quorum_reached(quorum) {
            Ok(TallyOutcome::Succeeded)
        } else {
            Ok(TallyOutcome::Defeated)
        }
    }
}
