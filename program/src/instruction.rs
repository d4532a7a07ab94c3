use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::{
    config::GovernanceConfig,
    payload::{ActionBatch, DescriptionHash, OperationId, ProposalId},
    state::vault_address,
    tally::VoteSupport,
    timelock::Role,
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub enum GovernanceInstruction {
    /// Initialize a pre-allocated timelock account.
    /// Accounts:
    /// 0. [signer] payer
    /// 1. [writable] timelock
    InitializeTimelock {
        /// Minimum delay between scheduling and running, in seconds.
        min_delay: i64,
        admins: Vec<Pubkey>,
        proposers: Vec<Pubkey>,
        executors: Vec<Pubkey>,
        cancellers: Vec<Pubkey>,
    },

    /// Initialize a pre-allocated governor account bound to a timelock.
    /// Accounts:
    /// 0. [signer] authority
    /// 1. [writable] governor
    /// 2. [] timelock
    InitializeGovernor {
        config: GovernanceConfig,
        attester: Pubkey,
        guardian: Option<Pubkey>,
        /// Owner of the `VotingPowerRecord` accounts votes are weighed with.
        voting_power_program: Pubkey,
    },

    /// Submit a proposal.
    /// Accounts:
    /// 0. [signer] proposer
    /// 1. [writable] governor
    /// 2. [] clock sysvar
    /// 3. [] proposer's voting power record
    Propose {
        batch: ActionBatch,
        description: String,
    },

    /// Vote with the voter's weight at the proposal snapshot.
    /// Accounts:
    /// 0. [signer] voter
    /// 1. [writable] governor
    /// 2. [] clock sysvar
    /// 3. [] voter's voting power record
    CastVote {
        proposal_id: ProposalId,
        support: VoteSupport,
    },

    /// Record the attester's verdict on a closed vote.
    /// Accounts:
    /// 0. [signer] attester
    /// 1. [writable] governor
    /// 2. [] clock sysvar
    SubmitOffchainVoteResult {
        proposal_id: ProposalId,
        result: bool,
    },

    /// Schedule a succeeded, attested proposal on the timelock. Callable by anyone.
    /// Accounts:
    /// 0. [signer] caller
    /// 1. [writable] governor
    /// 2. [writable] timelock
    /// 3. [] clock sysvar
    Queue {
        batch: ActionBatch,
        description_hash: DescriptionHash,
    },

    /// Run a queued proposal once its eta has passed. Callable by anyone.
    /// Accounts:
    /// 0. [signer] caller
    /// 1. [writable] governor
    /// 2. [writable] timelock
    /// 3. [writable] vault
    /// 4. [] clock sysvar
    /// 5. [] system program
    /// 6.. accounts referenced by the batch
    Execute {
        batch: ActionBatch,
        description_hash: DescriptionHash,
    },

    /// Cancel a proposal. Proposer or guardian only.
    /// Accounts:
    /// 0. [signer] proposer or guardian
    /// 1. [writable] governor
    /// 2. [writable] timelock
    /// 3. [] clock sysvar
    Cancel {
        batch: ActionBatch,
        description_hash: DescriptionHash,
    },

    /// Replace the governance parameters.
    /// Accounts:
    /// 0. [signer] governor authority
    /// 1. [writable] governor
    UpdateConfig { config: GovernanceConfig },

    /// Rotate the attester.
    /// Accounts:
    /// 0. [signer] governor authority
    /// 1. [writable] governor
    /// 2. [] clock sysvar
    SetAttester { attester: Pubkey },

    /// Accounts:
    /// 0. [signer] governor authority
    /// 1. [writable] governor
    SetGuardian { guardian: Option<Pubkey> },

    /// Schedule an operation directly. Proposer role only.
    /// Accounts:
    /// 0. [signer] proposer
    /// 1. [writable] timelock
    /// 2. [] clock sysvar
    Schedule { operation_id: OperationId, eta: i64 },

    /// Run a scheduled operation directly. Executor role only, unless execution is open.
    /// Accounts:
    /// 0. [signer] executor
    /// 1. [writable] timelock
    /// 2. [writable] vault
    /// 3. [] clock sysvar
    /// 4. [] system program
    /// 5.. accounts referenced by the batch
    ExecuteOperation { batch: ActionBatch, salt: [u8; 32] },

    /// Accounts:
    /// 0. [signer] admin or canceller
    /// 1. [writable] timelock
    CancelOperation { operation_id: OperationId },

    /// Accounts:
    /// 0. [signer] admin
    /// 1. [writable] timelock
    GrantRole { role: Role, account: Pubkey },

    /// Accounts:
    /// 0. [signer] admin, or the member itself to renounce
    /// 1. [writable] timelock
    RevokeRole { role: Role, account: Pubkey },

    /// Accounts:
    /// 0. [signer] admin
    /// 1. [writable] timelock
    UpdateDelay { min_delay: i64 },
}

#[allow(clippy::too_many_arguments)]
pub fn initialize_timelock(
    program_id: &Pubkey,
    payer: &Pubkey,
    timelock: &Pubkey,
    min_delay: i64,
    admins: Vec<Pubkey>,
    proposers: Vec<Pubkey>,
    executors: Vec<Pubkey>,
    cancellers: Vec<Pubkey>,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::InitializeTimelock {
            min_delay,
            admins,
            proposers,
            executors,
            cancellers,
        },
        vec![
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(*timelock, false),
        ],
    )
}

#[allow(clippy::too_many_arguments)]
pub fn initialize_governor(
    program_id: &Pubkey,
    authority: &Pubkey,
    governor: &Pubkey,
    timelock: &Pubkey,
    config: GovernanceConfig,
    attester: Pubkey,
    guardian: Option<Pubkey>,
    voting_power_program: Pubkey,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::InitializeGovernor {
            config,
            attester,
            guardian,
            voting_power_program,
        },
        vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*governor, false),
            AccountMeta::new_readonly(*timelock, false),
        ],
    )
}

pub fn propose(
    program_id: &Pubkey,
    proposer: &Pubkey,
    governor: &Pubkey,
    power_record: &Pubkey,
    batch: ActionBatch,
    description: String,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::Propose { batch, description },
        vec![
            AccountMeta::new_readonly(*proposer, true),
            AccountMeta::new(*governor, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
            AccountMeta::new_readonly(*power_record, false),
        ],
    )
}

pub fn cast_vote(
    program_id: &Pubkey,
    voter: &Pubkey,
    governor: &Pubkey,
    power_record: &Pubkey,
    proposal_id: ProposalId,
    support: VoteSupport,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::CastVote {
            proposal_id,
            support,
        },
        vec![
            AccountMeta::new_readonly(*voter, true),
            AccountMeta::new(*governor, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
            AccountMeta::new_readonly(*power_record, false),
        ],
    )
}

pub fn submit_offchain_vote_result(
    program_id: &Pubkey,
    attester: &Pubkey,
    governor: &Pubkey,
    proposal_id: ProposalId,
    result: bool,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::SubmitOffchainVoteResult {
            proposal_id,
            result,
        },
        vec![
            AccountMeta::new_readonly(*attester, true),
            AccountMeta::new(*governor, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
    )
}

pub fn queue(
    program_id: &Pubkey,
    caller: &Pubkey,
    governor: &Pubkey,
    timelock: &Pubkey,
    batch: ActionBatch,
    description_hash: DescriptionHash,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::Queue {
            batch,
            description_hash,
        },
        vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(*governor, false),
            AccountMeta::new(*timelock, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
    )
}

/// Every call target is appended as a writable account; a call whose calldata references
/// further accounts needs them added by the caller.
pub fn execute(
    program_id: &Pubkey,
    caller: &Pubkey,
    governor: &Pubkey,
    timelock: &Pubkey,
    batch: ActionBatch,
    description_hash: DescriptionHash,
) -> Instruction {
    let (vault, _) = vault_address(program_id, timelock);
    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*governor, false),
        AccountMeta::new(*timelock, false),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    accounts.extend(batch.targets.iter().map(|t| AccountMeta::new(*t, false)));
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::Execute {
            batch,
            description_hash,
        },
        accounts,
    )
}

pub fn cancel(
    program_id: &Pubkey,
    caller: &Pubkey,
    governor: &Pubkey,
    timelock: &Pubkey,
    batch: ActionBatch,
    description_hash: DescriptionHash,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::Cancel {
            batch,
            description_hash,
        },
        vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(*governor, false),
            AccountMeta::new(*timelock, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
    )
}

pub fn update_config(
    program_id: &Pubkey,
    authority: &Pubkey,
    governor: &Pubkey,
    config: GovernanceConfig,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::UpdateConfig { config },
        vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*governor, false),
        ],
    )
}

pub fn set_attester(
    program_id: &Pubkey,
    authority: &Pubkey,
    governor: &Pubkey,
    attester: Pubkey,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::SetAttester { attester },
        vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*governor, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
    )
}

pub fn set_guardian(
    program_id: &Pubkey,
    authority: &Pubkey,
    governor: &Pubkey,
    guardian: Option<Pubkey>,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::SetGuardian { guardian },
        vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(*governor, false),
        ],
    )
}

pub fn schedule(
    program_id: &Pubkey,
    proposer: &Pubkey,
    timelock: &Pubkey,
    operation_id: OperationId,
    eta: i64,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::Schedule { operation_id, eta },
        vec![
            AccountMeta::new_readonly(*proposer, true),
            AccountMeta::new(*timelock, false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
    )
}

/// Like `execute`, every call target is appended as a writable account.
pub fn execute_operation(
    program_id: &Pubkey,
    executor: &Pubkey,
    timelock: &Pubkey,
    batch: ActionBatch,
    salt: [u8; 32],
) -> Instruction {
    let (vault, _) = vault_address(program_id, timelock);
    let mut accounts = vec![
        AccountMeta::new_readonly(*executor, true),
        AccountMeta::new(*timelock, false),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    accounts.extend(batch.targets.iter().map(|t| AccountMeta::new(*t, false)));
    Instruction::new_with_borsh(
        *program_id,
        &GovernanceInstruction::ExecuteOperation { batch, salt },
        accounts,
    )
}

fn timelock_admin(
    program_id: &Pubkey,
    caller: &Pubkey,
    timelock: &Pubkey,
    ix: &GovernanceInstruction,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        ix,
        vec![
            AccountMeta::new_readonly(*caller, true),
            AccountMeta::new(*timelock, false),
        ],
    )
}

pub fn cancel_operation(
    program_id: &Pubkey,
    caller: &Pubkey,
    timelock: &Pubkey,
    operation_id: OperationId,
) -> Instruction {
    timelock_admin(
        program_id,
        caller,
        timelock,
        &GovernanceInstruction::CancelOperation { operation_id },
    )
}

pub fn grant_role(
    program_id: &Pubkey,
    admin: &Pubkey,
    timelock: &Pubkey,
    role: Role,
    account: Pubkey,
) -> Instruction {
    timelock_admin(
        program_id,
        admin,
        timelock,
        &GovernanceInstruction::GrantRole { role, account },
    )
}

/// Signed by the member itself, this renounces the role.
pub fn revoke_role(
    program_id: &Pubkey,
    caller: &Pubkey,
    timelock: &Pubkey,
    role: Role,
    account: Pubkey,
) -> Instruction {
    timelock_admin(
        program_id,
        caller,
        timelock,
        &GovernanceInstruction::RevokeRole { role, account },
    )
}

pub fn update_delay(
    program_id: &Pubkey,
    admin: &Pubkey,
    timelock: &Pubkey,
    min_delay: i64,
) -> Instruction {
    timelock_admin(
        program_id,
        admin,
        timelock,
        &GovernanceInstruction::UpdateDelay { min_delay },
    )
}
