//! The single trusted input of the engine.
//!
//! Every other transition can be recomputed from ledger history. This one records the
//! configured attester's verdict on a proposal's off-chain vote, at most once per
//! proposal. Every write is logged with its timestamp.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::Clock, msg, pubkey::Pubkey};

use crate::{error::GovernanceError, events::GovernanceEvent, payload::ProposalId};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attestation {
    pub attester: Pubkey,
    pub result: bool,
    pub unix_timestamp: i64,
    pub slot: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct OffchainAttestationGate {
    attester: Pubkey,
    /// Slots after the voting deadline during which an attestation is accepted.
    window: Option<u64>,
    records: BTreeMap<ProposalId, Attestation>,
}

impl OffchainAttestationGate {
    pub fn new(attester: Pubkey, window: Option<u64>) -> Self {
        Self {
            attester,
            window,
            records: BTreeMap::new(),
        }
    }

    pub fn attester(&self) -> &Pubkey {
        &self.attester
    }

    pub fn window(&self) -> Option<u64> {
        self.window
    }

    pub fn set_window(&mut self, window: Option<u64>) {
        self.window = window;
    }

    /// Swaps the attester. Attestations already recorded stay valid.
    pub fn rotate(&mut self, attester: Pubkey, clock: &Clock) -> Pubkey {
        let previous = std::mem::replace(&mut self.attester, attester);
        msg!(
            "Attester rotated: {} -> {} at {}",
            previous,
            attester,
            clock.unix_timestamp
        );
        GovernanceEvent::AttesterRotated {
            previous,
            attester,
            unix_timestamp: clock.unix_timestamp,
        }
        .emit();
        previous
    }

    pub fn ensure_attester(&self, caller: &Pubkey) -> Result<(), GovernanceError> {
        if *caller != self.attester {
            return Err(GovernanceError::Unauthorized);
        }
        Ok(())
    }

    pub fn attestation(&self, proposal_id: &ProposalId) -> Option<&Attestation> {
        self.records.get(proposal_id)
    }

    /// True only for a recorded positive verdict.
    pub fn is_attested(&self, proposal_id: &ProposalId) -> bool {
        self.records
            .get(proposal_id)
            .map(|record| record.result)
            .unwrap_or(false)
    }

    /// Drops the verdict on a proposal that is no longer stored.
    pub fn forget(&mut self, proposal_id: &ProposalId) -> Option<Attestation> {
        self.records.remove(proposal_id)
    }

    pub fn submit(
        &mut self,
        caller: &Pubkey,
        proposal_id: ProposalId,
        deadline: u64,
        result: bool,
        clock: &Clock,
    ) -> Result<Attestation, GovernanceError> {
        self.ensure_attester(caller)?;
        if clock.slot < deadline {
            return Err(GovernanceError::VotingNotEnded);
        }
        if self.records.contains_key(&proposal_id) {
            return Err(GovernanceError::AlreadyAttested);
        }
        if let Some(window) = self.window {
            let closes = deadline.checked_add(window).ok_or(GovernanceError::Overflow)?;
            if clock.slot > closes {
                return Err(GovernanceError::AttestationWindowClosed);
            }
        }

        let record = Attestation {
            attester: *caller,
            result,
            unix_timestamp: clock.unix_timestamp,
            slot: clock.slot,
        };
        self.records.insert(proposal_id, record);

        msg!(
            "Attestation recorded: result={} attester={} unix_timestamp={} slot={}",
            result,
            caller,
            clock.unix_timestamp,
            clock.slot
        );
        GovernanceEvent::OffchainResultSubmitted {
            proposal_id,
            attester: *caller,
            result,
            unix_timestamp: clock.unix_timestamp,
            slot: clock.slot,
        }
        .emit();
        Ok(record)
    }
}
