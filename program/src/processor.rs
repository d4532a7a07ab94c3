use borsh::BorshDeserialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
    sysvar::Sysvar,
};

use crate::{
    adapters::{RecordPowerSource, VaultExecutor},
    config::GovernanceConfig,
    error::GovernanceError,
    instruction::GovernanceInstruction,
    payload::{hash_operation, ActionBatch, DescriptionHash, OperationId, ProposalId},
    registry::ProposalRegistry,
    state::{
        governor_authority, is_initialized, load_initialized, store, vault_address, Governor,
        Timelock, VAULT_SEED,
    },
    tally::VoteSupport,
    timelock::{Role, TimelockScheduler},
};

pub struct Processor;

fn ensure_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

fn ensure_uninitialized(program_id: &Pubkey, account: &AccountInfo) -> ProgramResult {
    if account.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    if !account.is_writable {
        return Err(ProgramError::InvalidArgument);
    }
    if is_initialized(account)? {
        return Err(GovernanceError::AlreadyInitialized.into());
    }
    Ok(())
}

/// Loads the timelock bound to `governor`.
fn load_timelock(
    program_id: &Pubkey,
    governor: &Governor,
    timelock_ai: &AccountInfo,
) -> Result<Timelock, ProgramError> {
    if governor.timelock != *timelock_ai.key {
        return Err(ProgramError::InvalidArgument);
    }
    load_initialized(program_id, timelock_ai)
}

impl Processor {
    pub fn process(program_id: &Pubkey, accounts: &[AccountInfo], input: &[u8]) -> ProgramResult {
        let ix = GovernanceInstruction::try_from_slice(input)
            .map_err(|_| GovernanceError::InvalidInstruction)?;

        match ix {
            GovernanceInstruction::InitializeTimelock {
                min_delay,
                admins,
                proposers,
                executors,
                cancellers,
            } => Self::process_initialize_timelock(
                program_id, accounts, min_delay, admins, proposers, executors, cancellers,
            ),
            GovernanceInstruction::InitializeGovernor {
                config,
                attester,
                guardian,
                voting_power_program,
            } => Self::process_initialize_governor(
                program_id,
                accounts,
                config,
                attester,
                guardian,
                voting_power_program,
            ),
            GovernanceInstruction::Propose { batch, description } => {
                Self::process_propose(program_id, accounts, batch, description)
            }
            GovernanceInstruction::CastVote {
                proposal_id,
                support,
            } => Self::process_cast_vote(program_id, accounts, proposal_id, support),
            GovernanceInstruction::SubmitOffchainVoteResult {
                proposal_id,
                result,
            } => Self::process_submit_result(program_id, accounts, proposal_id, result),
            GovernanceInstruction::Queue {
                batch,
                description_hash,
            } => Self::process_queue(program_id, accounts, batch, description_hash),
            GovernanceInstruction::Execute {
                batch,
                description_hash,
            } => Self::process_execute(program_id, accounts, batch, description_hash),
            GovernanceInstruction::Cancel {
                batch,
                description_hash,
            } => Self::process_cancel(program_id, accounts, batch, description_hash),
            GovernanceInstruction::UpdateConfig { config } => {
                Self::process_governor_admin(program_id, accounts, |registry, caller| {
                    registry.update_config(caller, config)
                })
            }
            GovernanceInstruction::SetAttester { attester } => {
                Self::process_set_attester(program_id, accounts, attester)
            }
            GovernanceInstruction::SetGuardian { guardian } => {
                Self::process_governor_admin(program_id, accounts, |registry, caller| {
                    registry.set_guardian(caller, guardian)
                })
            }
            GovernanceInstruction::Schedule { operation_id, eta } => {
                Self::process_schedule(program_id, accounts, operation_id, eta)
            }
            GovernanceInstruction::ExecuteOperation { batch, salt } => {
                Self::process_execute_operation(program_id, accounts, batch, salt)
            }
            GovernanceInstruction::CancelOperation { operation_id } => {
                Self::process_timelock_admin(program_id, accounts, |scheduler, caller| {
                    scheduler.cancel(caller, &operation_id)
                })
            }
            GovernanceInstruction::GrantRole { role, account } => {
                Self::process_timelock_admin(program_id, accounts, |scheduler, caller| {
                    scheduler.grant_role(caller, role, account).map(|_| ())
                })
            }
            GovernanceInstruction::RevokeRole { role, account } => {
                Self::process_revoke_role(program_id, accounts, role, account)
            }
            GovernanceInstruction::UpdateDelay { min_delay } => {
                Self::process_timelock_admin(program_id, accounts, |scheduler, caller| {
                    scheduler.update_delay(caller, min_delay)
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_initialize_timelock(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        min_delay: i64,
        admins: Vec<Pubkey>,
        proposers: Vec<Pubkey>,
        executors: Vec<Pubkey>,
        cancellers: Vec<Pubkey>,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let payer = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;

        ensure_signer(payer)?;
        ensure_uninitialized(program_id, timelock_ai)?;

        let scheduler = TimelockScheduler::new(min_delay, &admins)?
            .with_members(Role::Proposer, &proposers)
            .with_members(Role::Executor, &executors)
            .with_members(Role::Canceller, &cancellers);
        store(
            &Timelock {
                is_initialized: true,
                scheduler,
            },
            timelock_ai,
        )?;

        let (vault, _) = vault_address(program_id, timelock_ai.key);
        msg!(
            "Timelock initialized: min_delay={} admins={} vault={}",
            min_delay,
            admins.len(),
            vault
        );
        Ok(())
    }

    fn process_initialize_governor(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        config: GovernanceConfig,
        attester: Pubkey,
        guardian: Option<Pubkey>,
        voting_power_program: Pubkey,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let authority = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;

        ensure_signer(authority)?;
        ensure_uninitialized(program_id, governor_ai)?;
        let timelock: Timelock = load_initialized(program_id, timelock_ai)?;

        let (executor, _) = governor_authority(program_id, governor_ai.key);
        for role in [Role::Proposer, Role::Executor, Role::Canceller] {
            if !timelock.scheduler.has_role(role, &executor) {
                msg!("Timelock does not grant {:?} to governor {}", role, executor);
                return Err(GovernanceError::InvalidConfig.into());
            }
        }

        let registry = ProposalRegistry::new(*authority.key, executor, attester, guardian, config)?;
        store(
            &Governor {
                is_initialized: true,
                timelock: *timelock_ai.key,
                voting_power_program,
                registry,
            },
            governor_ai,
        )?;
        msg!(
            "Governor initialized: quorum={} voting_period={}",
            config.quorum,
            config.voting_period
        );
        Ok(())
    }

    fn process_propose(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        batch: ActionBatch,
        description: String,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let proposer = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;
        let power_ai = next_account_info(acc_iter)?;

        ensure_signer(proposer)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        let power = RecordPowerSource::new(power_ai, &governor.voting_power_program);
        let id = governor
            .registry
            .propose(proposer.key, batch, &description, &clock, &power)?;
        store(&governor, governor_ai)?;

        msg!("Proposal created: id={:?} slot={}", id, clock.slot);
        Ok(())
    }

    fn process_cast_vote(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        proposal_id: ProposalId,
        support: VoteSupport,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let voter = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;
        let power_ai = next_account_info(acc_iter)?;

        ensure_signer(voter)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        let power = RecordPowerSource::new(power_ai, &governor.voting_power_program);
        let weight = governor
            .registry
            .cast_vote(voter.key, &proposal_id, support, &clock, &power)?;
        store(&governor, governor_ai)?;

        msg!("Vote cast: {:?} weight={}", support, weight);
        Ok(())
    }

    fn process_submit_result(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        proposal_id: ProposalId,
        result: bool,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let attester = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;

        ensure_signer(attester)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        governor
            .registry
            .submit_offchain_vote_result(attester.key, &proposal_id, result, &clock)?;
        store(&governor, governor_ai)?;
        Ok(())
    }

    fn process_queue(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        batch: ActionBatch,
        description_hash: DescriptionHash,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let caller = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;

        ensure_signer(caller)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        let mut timelock = load_timelock(program_id, &governor, timelock_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        let operation_id = governor.registry.queue(
            &batch,
            &description_hash,
            &clock,
            &mut timelock.scheduler,
        )?;
        store(&governor, governor_ai)?;
        store(&timelock, timelock_ai)?;

        msg!("Proposal queued: operation={:?}", operation_id);
        Ok(())
    }

    fn process_execute(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        batch: ActionBatch,
        description_hash: DescriptionHash,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let caller = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;
        let vault_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;

        ensure_signer(caller)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        let mut timelock = load_timelock(program_id, &governor, timelock_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        let (vault, bump) = vault_address(program_id, timelock_ai.key);
        if vault != *vault_ai.key {
            return Err(ProgramError::InvalidSeeds);
        }
        let bump_seed = [bump];
        let seeds: &[&[u8]] = &[VAULT_SEED, timelock_ai.key.as_ref(), &bump_seed];
        let mut target = VaultExecutor::new(program_id, &vault, seeds, accounts);

        // State is held by value here, so no account data is borrowed across the calls.
        let id = governor.registry.execute(
            &batch,
            &description_hash,
            &clock,
            &mut timelock.scheduler,
            &mut target,
        )?;
        store(&governor, governor_ai)?;
        store(&timelock, timelock_ai)?;

        msg!("Proposal executed: id={:?} calls={}", id, batch.len());
        Ok(())
    }

    fn process_cancel(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        batch: ActionBatch,
        description_hash: DescriptionHash,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let caller = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;

        ensure_signer(caller)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        let mut timelock = load_timelock(program_id, &governor, timelock_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        let id = governor.registry.cancel(
            caller.key,
            &batch,
            &description_hash,
            &clock,
            &mut timelock.scheduler,
        )?;
        store(&governor, governor_ai)?;
        store(&timelock, timelock_ai)?;

        msg!("Proposal canceled: id={:?}", id);
        Ok(())
    }

    fn process_set_attester(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        attester: Pubkey,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let authority = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;

        ensure_signer(authority)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        governor
            .registry
            .set_attester(authority.key, attester, &clock)?;
        store(&governor, governor_ai)
    }

    /// Governor settings guarded by the registry authority.
    fn process_governor_admin<F>(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        apply: F,
    ) -> ProgramResult
    where
        F: FnOnce(&mut ProposalRegistry, &Pubkey) -> Result<(), GovernanceError>,
    {
        let acc_iter = &mut accounts.iter();
        let authority = next_account_info(acc_iter)?;
        let governor_ai = next_account_info(acc_iter)?;

        ensure_signer(authority)?;
        let mut governor: Governor = load_initialized(program_id, governor_ai)?;
        apply(&mut governor.registry, authority.key)?;
        store(&governor, governor_ai)?;

        msg!("Governor updated by {}", authority.key);
        Ok(())
    }

    fn process_schedule(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        operation_id: OperationId,
        eta: i64,
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let proposer = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;

        ensure_signer(proposer)?;
        let mut timelock: Timelock = load_initialized(program_id, timelock_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        let round = timelock
            .scheduler
            .schedule(proposer.key, operation_id, eta, &clock)?;
        store(&timelock, timelock_ai)?;

        msg!("Operation scheduled: eta={} round={}", eta, round);
        Ok(())
    }

    fn process_execute_operation(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        batch: ActionBatch,
        salt: [u8; 32],
    ) -> ProgramResult {
        let acc_iter = &mut accounts.iter();
        let executor = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;
        let vault_ai = next_account_info(acc_iter)?;
        let clock_ai = next_account_info(acc_iter)?;

        ensure_signer(executor)?;
        let mut timelock: Timelock = load_initialized(program_id, timelock_ai)?;
        let clock = Clock::from_account_info(clock_ai)?;

        let (vault, bump) = vault_address(program_id, timelock_ai.key);
        if vault != *vault_ai.key {
            return Err(ProgramError::InvalidSeeds);
        }
        let bump_seed = [bump];
        let seeds: &[&[u8]] = &[VAULT_SEED, timelock_ai.key.as_ref(), &bump_seed];
        let mut target = VaultExecutor::new(program_id, &vault, seeds, accounts);

        let operation_id = hash_operation(&batch, &salt);
        timelock.scheduler.run(
            executor.key,
            operation_id,
            &batch,
            &salt,
            &clock,
            &mut target,
        )?;
        store(&timelock, timelock_ai)?;

        msg!("Operation executed: calls={}", batch.len());
        Ok(())
    }

    fn process_revoke_role(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        role: Role,
        account: Pubkey,
    ) -> ProgramResult {
        Self::process_timelock_admin(program_id, accounts, |scheduler, caller| {
            if *caller == account {
                scheduler.renounce_role(caller, role);
                Ok(())
            } else {
                scheduler.revoke_role(caller, role, &account).map(|_| ())
            }
        })
    }

    /// Timelock changes authorized by the scheduler's own roles.
    fn process_timelock_admin<F>(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        apply: F,
    ) -> ProgramResult
    where
        F: FnOnce(&mut TimelockScheduler, &Pubkey) -> Result<(), GovernanceError>,
    {
        let acc_iter = &mut accounts.iter();
        let caller = next_account_info(acc_iter)?;
        let timelock_ai = next_account_info(acc_iter)?;

        ensure_signer(caller)?;
        let mut timelock: Timelock = load_initialized(program_id, timelock_ai)?;
        apply(&mut timelock.scheduler, caller.key)?;
        store(&timelock, timelock_ai)?;

        msg!("Timelock updated by {}", caller.key);
        Ok(())
    }
}
