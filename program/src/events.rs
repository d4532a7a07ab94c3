use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, pubkey::Pubkey};

use crate::{
    payload::{OperationId, ProposalId},
    registry::ProposalState,
    tally::VoteSupport,
    timelock::Role,
};

/// Structured log records, one per state change. Emitted borsh-encoded through
/// `sol_log_data` so indexers can replay governance history from transaction logs.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceEvent {
    ProposalCreated {
        proposal_id: ProposalId,
        proposer: Pubkey,
        snapshot: u64,
        deadline: u64,
        description: String,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter: Pubkey,
        support: VoteSupport,
        weight: u64,
    },
    OffchainResultSubmitted {
        proposal_id: ProposalId,
        attester: Pubkey,
        result: bool,
        unix_timestamp: i64,
        slot: u64,
    },
    AttesterRotated {
        previous: Pubkey,
        attester: Pubkey,
        unix_timestamp: i64,
    },
    ProposalQueued {
        proposal_id: ProposalId,
        operation_id: OperationId,
        eta: i64,
    },
    ProposalExecuted {
        proposal_id: ProposalId,
    },
    ProposalCanceled {
        proposal_id: ProposalId,
        previous_state: ProposalState,
    },
    CallScheduled {
        operation_id: OperationId,
        eta: i64,
    },
    CallExecuted {
        operation_id: OperationId,
        calls: u32,
    },
    OperationCanceled {
        operation_id: OperationId,
    },
    RoleGranted {
        role: Role,
        account: Pubkey,
        sender: Pubkey,
    },
    RoleRevoked {
        role: Role,
        account: Pubkey,
        sender: Pubkey,
    },
    MinDelayChanged {
        previous: i64,
        min_delay: i64,
    },
}

impl GovernanceEvent {
    pub fn emit(&self) {
        if let Ok(data) = borsh::to_vec(self) {
            sol_log_data(&[&data]);
        }
    }
}
