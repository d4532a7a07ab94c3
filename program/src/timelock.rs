//! Delay-enforcing scheduler that sits between governance and the treasury.
//!
//! Operations are keyed by the hash of their batch; the scheduler knows nothing about
//! proposals or votes.

use std::collections::{BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::Clock, msg, pubkey::Pubkey};

use crate::{
    error::GovernanceError,
    events::GovernanceEvent,
    interface::ExecutionTarget,
    payload::{hash_operation, ActionBatch, OperationId},
};

/// Longest minimum delay accepted, in seconds.
pub const MAX_MIN_DELAY: i64 = 30 * 24 * 60 * 60;

/// Default minimum delay, in seconds.
pub const DEFAULT_MIN_DELAY: i64 = 60;

/// Member standing for "anyone". Granting it `Executor` makes `run` permissionless.
pub const OPEN_ROLE: Pubkey = Pubkey::new_from_array([0; 32]);

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Admin,
    Proposer,
    Executor,
    Canceller,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Unscheduled,
    Scheduled,
    Executed,
    Canceled,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledOperation {
    /// Earliest unix timestamp at which the operation may run.
    pub eta: i64,
    pub status: OperationStatus,
    /// Bumped on every schedule, so a holder of an earlier round can tell that the
    /// operation was canceled and scheduled again under its feet.
    pub round: u32,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimelockScheduler {
    min_delay: i64,
    roles: BTreeMap<Role, BTreeSet<Pubkey>>,
    operations: BTreeMap<OperationId, ScheduledOperation>,
}

fn validate_delay(min_delay: i64) -> Result<(), GovernanceError> {
    if !(0..=MAX_MIN_DELAY).contains(&min_delay) {
        return Err(GovernanceError::InvalidConfig);
    }
    Ok(())
}

impl TimelockScheduler {
    pub fn new(min_delay: i64, admins: &[Pubkey]) -> Result<Self, GovernanceError> {
        validate_delay(min_delay)?;
        let mut roles = BTreeMap::new();
        roles.insert(Role::Admin, admins.iter().copied().collect());
        Ok(Self {
            min_delay,
            roles,
            operations: BTreeMap::new(),
        })
    }

    /// Seeds a role at construction time, before any admin action is possible.
    pub fn with_members(mut self, role: Role, members: &[Pubkey]) -> Self {
        self.roles.entry(role).or_default().extend(members.iter().copied());
        self
    }

    pub fn min_delay(&self) -> i64 {
        self.min_delay
    }

    pub fn has_role(&self, role: Role, account: &Pubkey) -> bool {
        self.roles
            .get(&role)
            .map(|members| members.contains(account))
            .unwrap_or(false)
    }

    pub fn members(&self, role: Role) -> impl Iterator<Item = &Pubkey> {
        self.roles.get(&role).into_iter().flatten()
    }

    fn ensure_role(&self, role: Role, caller: &Pubkey) -> Result<(), GovernanceError> {
        if self.has_role(role, caller) {
            return Ok(());
        }
        if role == Role::Executor && self.has_role(Role::Executor, &OPEN_ROLE) {
            return Ok(());
        }
        Err(GovernanceError::Unauthorized)
    }

    pub fn grant_role(
        &mut self,
        caller: &Pubkey,
        role: Role,
        account: Pubkey,
    ) -> Result<bool, GovernanceError> {
        self.ensure_role(Role::Admin, caller)?;
        let granted = self.roles.entry(role).or_default().insert(account);
        if granted {
            GovernanceEvent::RoleGranted {
                role,
                account,
                sender: *caller,
            }
            .emit();
        }
        Ok(granted)
    }

    pub fn revoke_role(
        &mut self,
        caller: &Pubkey,
        role: Role,
        account: &Pubkey,
    ) -> Result<bool, GovernanceError> {
        self.ensure_role(Role::Admin, caller)?;
        Ok(self.remove_member(caller, role, account))
    }

    pub fn renounce_role(&mut self, caller: &Pubkey, role: Role) -> bool {
        self.remove_member(caller, role, caller)
    }

    fn remove_member(&mut self, sender: &Pubkey, role: Role, account: &Pubkey) -> bool {
        let revoked = self
            .roles
            .get_mut(&role)
            .map(|members| members.remove(account))
            .unwrap_or(false);
        if revoked {
            GovernanceEvent::RoleRevoked {
                role,
                account: *account,
                sender: *sender,
            }
            .emit();
        }
        revoked
    }

    pub fn update_delay(&mut self, caller: &Pubkey, min_delay: i64) -> Result<(), GovernanceError> {
        self.ensure_role(Role::Admin, caller)?;
        validate_delay(min_delay)?;
        let previous = std::mem::replace(&mut self.min_delay, min_delay);
        GovernanceEvent::MinDelayChanged {
            previous,
            min_delay,
        }
        .emit();
        Ok(())
    }

    pub fn operation(&self, id: &OperationId) -> Option<&ScheduledOperation> {
        self.operations.get(id)
    }

    pub fn status(&self, id: &OperationId) -> OperationStatus {
        self.operations
            .get(id)
            .map(|op| op.status)
            .unwrap_or(OperationStatus::Unscheduled)
    }

    /// Schedules `id`, or reschedules it after a cancel. Returns the new round.
    pub fn schedule(
        &mut self,
        caller: &Pubkey,
        id: OperationId,
        eta: i64,
        clock: &Clock,
    ) -> Result<u32, GovernanceError> {
        self.ensure_role(Role::Proposer, caller)?;
        if !matches!(
            self.status(&id),
            OperationStatus::Unscheduled | OperationStatus::Canceled
        ) {
            return Err(GovernanceError::AlreadyScheduled);
        }
        let earliest = clock
            .unix_timestamp
            .checked_add(self.min_delay)
            .ok_or(GovernanceError::Overflow)?;
        if eta < earliest {
            return Err(GovernanceError::DelayTooShort);
        }
        let round = self
            .operations
            .get(&id)
            .map_or(Some(1), |op| op.round.checked_add(1))
            .ok_or(GovernanceError::Overflow)?;

        self.operations.insert(
            id,
            ScheduledOperation {
                eta,
                status: OperationStatus::Scheduled,
                round,
            },
        );
        GovernanceEvent::CallScheduled {
            operation_id: id,
            eta,
        }
        .emit();
        Ok(round)
    }

    pub fn is_ready(&self, id: &OperationId, clock: &Clock) -> bool {
        match self.operations.get(id) {
            Some(op) => op.status == OperationStatus::Scheduled && clock.unix_timestamp >= op.eta,
            None => false,
        }
    }

    /// Runs every call of `batch` against `target`, in order, all or nothing.
    pub fn run<T: ExecutionTarget>(
        &mut self,
        caller: &Pubkey,
        id: OperationId,
        batch: &ActionBatch,
        salt: &[u8; 32],
        clock: &Clock,
        target: &mut T,
    ) -> Result<(), GovernanceError> {
        self.ensure_role(Role::Executor, caller)?;
        batch.validate()?;
        if hash_operation(batch, salt) != id {
            return Err(GovernanceError::PayloadMismatch);
        }
        match self.status(&id) {
            OperationStatus::Executed => return Err(GovernanceError::AlreadyExecuted),
            OperationStatus::Canceled => return Err(GovernanceError::InvalidStateTransition),
            OperationStatus::Unscheduled => return Err(GovernanceError::TimelockNotReady),
            OperationStatus::Scheduled => {}
        }
        if !self.is_ready(&id, clock) {
            return Err(GovernanceError::TimelockNotReady);
        }

        let checkpoint = target.checkpoint();
        for (index, call) in batch.calls().enumerate() {
            if let Err(err) = target.invoke(&call) {
                msg!("Call {} to {} failed: {}", index, call.target, err);
                target.rollback(checkpoint);
                return Err(GovernanceError::BatchExecutionFailed);
            }
        }

        if let Some(op) = self.operations.get_mut(&id) {
            op.status = OperationStatus::Executed;
        }
        GovernanceEvent::CallExecuted {
            operation_id: id,
            calls: batch.len() as u32,
        }
        .emit();
        Ok(())
    }

    pub fn cancel(&mut self, caller: &Pubkey, id: &OperationId) -> Result<(), GovernanceError> {
        if !self.has_role(Role::Admin, caller) && !self.has_role(Role::Canceller, caller) {
            return Err(GovernanceError::Unauthorized);
        }
        match self.operations.get_mut(id) {
            Some(op) if op.status == OperationStatus::Scheduled => {
                op.status = OperationStatus::Canceled;
            }
            Some(op) if op.status == OperationStatus::Executed => {
                return Err(GovernanceError::AlreadyExecuted)
            }
            _ => return Err(GovernanceError::InvalidStateTransition),
        }
        GovernanceEvent::OperationCanceled { operation_id: *id }.emit();
        Ok(())
    }
}
