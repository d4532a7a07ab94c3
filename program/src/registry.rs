//! Proposal lifecycle.
//!
//! Pending, Active, Defeated, Succeeded and Expired are never stored: they are derived
//! from the current slot, the stored voting window and the tally on every query. Only
//! the explicit transitions (queue, execute, cancel) are recorded. The link to the
//! timelock is the operation hash recomputed from the caller's payload.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::Clock, msg, pubkey::Pubkey};

use crate::{
    attestation::OffchainAttestationGate,
    config::GovernanceConfig,
    error::GovernanceError,
    events::GovernanceEvent,
    interface::{ExecutionTarget, VotingPowerSource},
    payload::{
        hash_description, hash_operation, hash_proposal, ActionBatch, DescriptionHash,
        OperationId, ProposalId,
    },
    tally::{TallyOutcome, VoteSupport, VoteTally, VotingPhase, VotingWindow},
    timelock::{OperationStatus, TimelockScheduler},
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    Pending,
    Active,
    Defeated,
    Succeeded,
    Queued,
    Executed,
    Canceled,
    Expired,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    /// `round` is the timelock round this proposal scheduled. If the operation was
    /// canceled and scheduled again by someone else, the proposal stays Canceled.
    Queued {
        operation_id: OperationId,
        eta: i64,
        round: u32,
    },
    Executed { unix_timestamp: i64 },
    Canceled,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProposalRecord {
    pub id: ProposalId,
    pub proposer: Pubkey,
    pub batch: ActionBatch,
    pub description_hash: DescriptionHash,
    pub created_slot: u64,
    pub window: VotingWindow,
    pub tally: VoteTally,
    pub lifecycle: Lifecycle,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProposalRegistry {
    /// May change the config, rotate the attester and set the guardian.
    authority: Pubkey,
    /// Identity the registry presents to the timelock. Must hold Proposer, Executor and Canceller there.
    executor: Pubkey,
    guardian: Option<Pubkey>,
    config: GovernanceConfig,
    gate: OffchainAttestationGate,
    proposals: BTreeMap<ProposalId, ProposalRecord>,
}

impl ProposalRegistry {
    pub fn new(
        authority: Pubkey,
        executor: Pubkey,
        attester: Pubkey,
        guardian: Option<Pubkey>,
        config: GovernanceConfig,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        Ok(Self {
            authority,
            executor,
            guardian,
            config,
            gate: OffchainAttestationGate::new(attester, config.attestation_window),
            proposals: BTreeMap::new(),
        })
    }

    pub fn authority(&self) -> &Pubkey {
        &self.authority
    }

    pub fn executor(&self) -> &Pubkey {
        &self.executor
    }

    pub fn guardian(&self) -> Option<&Pubkey> {
        self.guardian.as_ref()
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn gate(&self) -> &OffchainAttestationGate {
        &self.gate
    }

    pub fn proposal(&self, id: &ProposalId) -> Option<&ProposalRecord> {
        self.proposals.get(id)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    fn ensure_authority(&self, caller: &Pubkey) -> Result<(), GovernanceError> {
        if *caller != self.authority {
            return Err(GovernanceError::Unauthorized);
        }
        Ok(())
    }

    pub fn update_config(
        &mut self,
        caller: &Pubkey,
        config: GovernanceConfig,
    ) -> Result<(), GovernanceError> {
        self.ensure_authority(caller)?;
        config.validate()?;
        self.gate.set_window(config.attestation_window);
        self.config = config;
        Ok(())
    }

    pub fn set_attester(
        &mut self,
        caller: &Pubkey,
        attester: Pubkey,
        clock: &Clock,
    ) -> Result<Pubkey, GovernanceError> {
        self.ensure_authority(caller)?;
        Ok(self.gate.rotate(attester, clock))
    }

    pub fn set_guardian(
        &mut self,
        caller: &Pubkey,
        guardian: Option<Pubkey>,
    ) -> Result<(), GovernanceError> {
        self.ensure_authority(caller)?;
        self.guardian = guardian;
        Ok(())
    }

    pub fn state(
        &self,
        id: &ProposalId,
        clock: &Clock,
        timelock: &TimelockScheduler,
    ) -> Result<ProposalState, GovernanceError> {
        let record = self
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        Ok(self.derive_state(record, clock, timelock))
    }

    fn derive_state(
        &self,
        record: &ProposalRecord,
        clock: &Clock,
        timelock: &TimelockScheduler,
    ) -> ProposalState {
        match record.lifecycle {
            Lifecycle::Executed { .. } => ProposalState::Executed,
            Lifecycle::Canceled => ProposalState::Canceled,
            Lifecycle::Queued {
                operation_id,
                round,
                ..
            } => match timelock.operation(&operation_id) {
                Some(op) if op.round == round => match op.status {
                    OperationStatus::Executed => ProposalState::Executed,
                    OperationStatus::Scheduled => ProposalState::Queued,
                    OperationStatus::Canceled | OperationStatus::Unscheduled => {
                        ProposalState::Canceled
                    }
                },
                _ => ProposalState::Canceled,
            },
            Lifecycle::Open => match record.window.phase(clock.slot) {
                VotingPhase::Pending => ProposalState::Pending,
                VotingPhase::Active => ProposalState::Active,
                VotingPhase::Ended => self.settled_state(record, clock.slot),
            },
        }
    }

    fn settled_state(&self, record: &ProposalRecord, slot: u64) -> ProposalState {
        match record.tally.outcome(&record.window, slot, self.config.quorum) {
            Ok(TallyOutcome::Succeeded) => {
                let expired = self
                    .config
                    .queue_grace_period
                    .and_then(|grace| record.window.deadline.checked_add(grace))
                    .map(|expires| slot >= expires)
                    .unwrap_or(false);
                if expired {
                    ProposalState::Expired
                } else {
                    ProposalState::Succeeded
                }
            }
            _ => ProposalState::Defeated,
        }
    }

    /// Records whose state can no longer change without the timelock: executed,
    /// canceled, defeated or expired. Queued records are kept until their own transition.
    fn is_settled(&self, record: &ProposalRecord, slot: u64) -> bool {
        match record.lifecycle {
            Lifecycle::Executed { .. } | Lifecycle::Canceled => true,
            Lifecycle::Queued { .. } => false,
            Lifecycle::Open => {
                record.window.phase(slot) == VotingPhase::Ended
                    && matches!(
                        self.settled_state(record, slot),
                        ProposalState::Defeated | ProposalState::Expired
                    )
            }
        }
    }

    /// Makes room for one more proposal, dropping settled records and their attestations
    /// only if that frees a slot.
    fn reserve_slot(&mut self, clock: &Clock) -> Result<(), GovernanceError> {
        let capacity = self.config.max_proposals as usize;
        if self.proposals.len() < capacity {
            return Ok(());
        }
        let settled: Vec<ProposalId> = self
            .proposals
            .values()
            .filter(|record| self.is_settled(record, clock.slot))
            .map(|record| record.id)
            .collect();
        if self.proposals.len() - settled.len() >= capacity {
            return Err(GovernanceError::ProposalLimitReached);
        }
        for id in &settled {
            self.proposals.remove(id);
            self.gate.forget(id);
        }
        msg!("Pruned {} settled proposals", settled.len());
        Ok(())
    }

    pub fn propose<V: VotingPowerSource>(
        &mut self,
        proposer: &Pubkey,
        batch: ActionBatch,
        description: &str,
        clock: &Clock,
        power: &V,
    ) -> Result<ProposalId, GovernanceError> {
        batch.validate()?;
        let weight = power.weight_of(proposer, clock.slot.saturating_sub(1))?;
        if weight < self.config.proposal_threshold {
            return Err(GovernanceError::InsufficientVotingPower);
        }

        let description_hash = hash_description(description);
        let id = hash_proposal(&batch, &description_hash);
        if self.proposals.contains_key(&id) {
            return Err(GovernanceError::ProposalAlreadyExists);
        }
        let window = VotingWindow::open(
            clock.slot,
            self.config.voting_delay,
            self.config.voting_period,
        )?;
        self.reserve_slot(clock)?;

        self.proposals.insert(
            id,
            ProposalRecord {
                id,
                proposer: *proposer,
                batch,
                description_hash,
                created_slot: clock.slot,
                window,
                tally: VoteTally::default(),
                lifecycle: Lifecycle::Open,
            },
        );
        GovernanceEvent::ProposalCreated {
            proposal_id: id,
            proposer: *proposer,
            snapshot: window.snapshot,
            deadline: window.deadline,
            description: description.to_string(),
        }
        .emit();
        Ok(id)
    }

    /// Records `voter`'s snapshot weight. Returns the weight counted.
    pub fn cast_vote<V: VotingPowerSource>(
        &mut self,
        voter: &Pubkey,
        id: &ProposalId,
        support: VoteSupport,
        clock: &Clock,
        power: &V,
    ) -> Result<u64, GovernanceError> {
        let record = self
            .proposals
            .get_mut(id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        if record.lifecycle != Lifecycle::Open
            || record.window.phase(clock.slot) != VotingPhase::Active
        {
            return Err(GovernanceError::VotingClosed);
        }
        if record.tally.has_voted(voter) {
            return Err(GovernanceError::AlreadyVoted);
        }

        let weight = power.weight_of(voter, record.window.snapshot)?;
        record
            .tally
            .register_vote(&record.window, clock.slot, *voter, weight, support)?;
        GovernanceEvent::VoteCast {
            proposal_id: *id,
            voter: *voter,
            support,
            weight,
        }
        .emit();
        Ok(weight)
    }

    pub fn submit_offchain_vote_result(
        &mut self,
        caller: &Pubkey,
        id: &ProposalId,
        result: bool,
        clock: &Clock,
    ) -> Result<(), GovernanceError> {
        self.gate.ensure_attester(caller)?;
        let record = self
            .proposals
            .get(id)
            .ok_or(GovernanceError::ProposalNotFound)?;
        if record.lifecycle == Lifecycle::Canceled {
            return Err(GovernanceError::InvalidStateTransition);
        }
        let deadline = record.window.deadline;
        self.gate.submit(caller, *id, deadline, result, clock)?;
        Ok(())
    }

    pub fn queue(
        &mut self,
        batch: &ActionBatch,
        description_hash: &DescriptionHash,
        clock: &Clock,
        timelock: &mut TimelockScheduler,
    ) -> Result<OperationId, GovernanceError> {
        batch.validate()?;
        let id = hash_proposal(batch, description_hash);
        let record = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::PayloadMismatch)?;
        if self.derive_state(record, clock, timelock) != ProposalState::Succeeded {
            return Err(GovernanceError::InvalidStateTransition);
        }
        if !self.gate.is_attested(&id) {
            return Err(GovernanceError::AttestationMissing);
        }

        let operation_id = hash_operation(batch, description_hash);
        let eta = clock
            .unix_timestamp
            .checked_add(timelock.min_delay())
            .ok_or(GovernanceError::Overflow)?;
        let round = timelock.schedule(&self.executor, operation_id, eta, clock)?;

        if let Some(record) = self.proposals.get_mut(&id) {
            record.lifecycle = Lifecycle::Queued {
                operation_id,
                eta,
                round,
            };
        }
        GovernanceEvent::ProposalQueued {
            proposal_id: id,
            operation_id,
            eta,
        }
        .emit();
        Ok(operation_id)
    }

    pub fn execute<T: ExecutionTarget>(
        &mut self,
        batch: &ActionBatch,
        description_hash: &DescriptionHash,
        clock: &Clock,
        timelock: &mut TimelockScheduler,
        target: &mut T,
    ) -> Result<ProposalId, GovernanceError> {
        batch.validate()?;
        let id = hash_proposal(batch, description_hash);
        let record = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::PayloadMismatch)?;
        let operation_id = match (record.lifecycle, self.derive_state(record, clock, timelock)) {
            (_, ProposalState::Executed) => return Err(GovernanceError::AlreadyExecuted),
            (Lifecycle::Queued { operation_id, .. }, ProposalState::Queued) => operation_id,
            _ => return Err(GovernanceError::InvalidStateTransition),
        };
        if !timelock.is_ready(&operation_id, clock) {
            return Err(GovernanceError::TimelockNotReady);
        }

        timelock.run(
            &self.executor,
            operation_id,
            batch,
            description_hash,
            clock,
            target,
        )?;

        if let Some(record) = self.proposals.get_mut(&id) {
            record.lifecycle = Lifecycle::Executed {
                unix_timestamp: clock.unix_timestamp,
            };
        }
        GovernanceEvent::ProposalExecuted { proposal_id: id }.emit();
        Ok(id)
    }

    /// Proposer or guardian only. Cancelling a queued proposal also cancels its operation.
    pub fn cancel(
        &mut self,
        caller: &Pubkey,
        batch: &ActionBatch,
        description_hash: &DescriptionHash,
        clock: &Clock,
        timelock: &mut TimelockScheduler,
    ) -> Result<ProposalId, GovernanceError> {
        batch.validate()?;
        let id = hash_proposal(batch, description_hash);
        let record = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::PayloadMismatch)?;
        if *caller != record.proposer && self.guardian.as_ref() != Some(caller) {
            return Err(GovernanceError::Unauthorized);
        }

        let previous_state = self.derive_state(record, clock, timelock);
        match (previous_state, record.lifecycle) {
            (ProposalState::Queued, Lifecycle::Queued { operation_id, .. }) => {
                timelock.cancel(&self.executor, &operation_id)?;
            }
            (ProposalState::Pending | ProposalState::Active | ProposalState::Succeeded, _) => {}
            (ProposalState::Executed, _) => return Err(GovernanceError::AlreadyExecuted),
            _ => return Err(GovernanceError::InvalidStateTransition),
        }

        if let Some(record) = self.proposals.get_mut(&id) {
            record.lifecycle = Lifecycle::Canceled;
        }
        GovernanceEvent::ProposalCanceled {
            proposal_id: id,
            previous_state,
        }
        .emit();
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use solana_program::entrypoint::ProgramResult;

    use super::*;
    use crate::{payload::Call, timelock::Role};

    struct FlatPower(BTreeMap<Pubkey, u64>);

    impl VotingPowerSource for FlatPower {
        fn weight_of(&self, account: &Pubkey, _snapshot: u64) -> Result<u64, GovernanceError> {
            Ok(self.0.get(account).copied().unwrap_or(0))
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<Pubkey>);

    impl ExecutionTarget for Recorder {
        type Checkpoint = usize;

        fn checkpoint(&self) -> usize {
            self.0.len()
        }

        fn invoke(&mut self, call: &Call<'_>) -> ProgramResult {
            self.0.push(*call.target);
            Ok(())
        }

        fn rollback(&mut self, checkpoint: usize) {
            self.0.truncate(checkpoint);
        }
    }

    fn at(slot: u64, unix_timestamp: i64) -> Clock {
        Clock {
            slot,
            unix_timestamp,
            ..Clock::default()
        }
    }

    struct Fixture {
        authority: Pubkey,
        attester: Pubkey,
        guardian: Pubkey,
        proposer: Pubkey,
        power: FlatPower,
        registry: ProposalRegistry,
        timelock: TimelockScheduler,
        batch: ActionBatch,
    }

    fn fixture(config: GovernanceConfig) -> Fixture {
        let authority = Pubkey::new_unique();
        let executor = Pubkey::new_unique();
        let attester = Pubkey::new_unique();
        let guardian = Pubkey::new_unique();
        let proposer = Pubkey::new_unique();
        let registry =
            ProposalRegistry::new(authority, executor, attester, Some(guardian), config).unwrap();
        let timelock = TimelockScheduler::new(60, &[authority])
            .unwrap()
            .with_members(Role::Proposer, &[executor])
            .with_members(Role::Executor, &[executor])
            .with_members(Role::Canceller, &[executor]);
        Fixture {
            authority,
            attester,
            guardian,
            proposer,
            power: FlatPower(BTreeMap::from([(proposer, 100)])),
            registry,
            timelock,
            batch: ActionBatch::single(Pubkey::new_unique(), 1, vec![]),
        }
    }

    fn config() -> GovernanceConfig {
        GovernanceConfig {
            voting_delay: 1,
            voting_period: 10,
            quorum: 50,
            ..GovernanceConfig::default()
        }
    }

    /// Drives a proposal to Succeeded at slot 11 with an attestation recorded.
    fn succeeded(f: &mut Fixture) -> ProposalId {
        let id = f
            .registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(0, 0), &f.power)
            .unwrap();
        f.registry
            .cast_vote(&f.proposer, &id, VoteSupport::For, &at(2, 0), &f.power)
            .unwrap();
        f.registry
            .submit_offchain_vote_result(&f.attester, &id, true, &at(11, 100))
            .unwrap();
        id
    }

    #[test]
    fn state_is_derived_from_the_clock() {
        let mut f = fixture(config());
        let id = f
            .registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(0, 0), &f.power)
            .unwrap();
        let state = |f: &Fixture, slot| f.registry.state(&id, &at(slot, 0), &f.timelock).unwrap();
        assert_eq!(state(&f, 1), ProposalState::Pending);
        assert_eq!(state(&f, 2), ProposalState::Active);
        assert_eq!(state(&f, 11), ProposalState::Defeated);

        f.registry
            .cast_vote(&f.proposer, &id, VoteSupport::For, &at(5, 0), &f.power)
            .unwrap();
        assert_eq!(state(&f, 11), ProposalState::Succeeded);
    }

    #[test]
    fn duplicate_proposal_is_rejected() {
        let mut f = fixture(config());
        f.registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(0, 0), &f.power)
            .unwrap();
        assert_eq!(
            f.registry
                .propose(&f.proposer, f.batch.clone(), "W", &at(3, 0), &f.power),
            Err(GovernanceError::ProposalAlreadyExists)
        );
        assert_eq!(f.registry.len(), 1);
    }

    #[test]
    fn malformed_batch_is_rejected_first() {
        let mut f = fixture(config());
        let bad = ActionBatch::new(vec![Pubkey::new_unique()], vec![], vec![vec![]]);
        assert_eq!(
            f.registry.propose(&f.proposer, bad, "W", &at(0, 0), &f.power),
            Err(GovernanceError::InvalidProposalShape)
        );
        assert!(f.registry.is_empty());
    }

    #[test]
    fn proposal_threshold_uses_prior_slot_weight() {
        let mut f = fixture(GovernanceConfig {
            proposal_threshold: 101,
            ..config()
        });
        assert_eq!(
            f.registry
                .propose(&f.proposer, f.batch.clone(), "W", &at(5, 0), &f.power),
            Err(GovernanceError::InsufficientVotingPower)
        );
        let stranger = Pubkey::new_unique();
        assert_eq!(
            f.registry
                .propose(&stranger, f.batch.clone(), "W", &at(5, 0), &f.power),
            Err(GovernanceError::InsufficientVotingPower)
        );
        assert!(f.registry.is_empty());
    }

    #[test]
    fn capacity_is_reclaimed_from_settled_proposals() {
        let mut f = fixture(GovernanceConfig {
            max_proposals: 2,
            ..config()
        });
        let propose = |f: &mut Fixture, description: &str, slot| {
            f.registry
                .propose(&f.proposer, f.batch.clone(), description, &at(slot, 0), &f.power)
        };
        let first = propose(&mut f, "A", 0).unwrap();
        let second = propose(&mut f, "B", 0).unwrap();
        assert_eq!(
            propose(&mut f, "C", 1),
            Err(GovernanceError::ProposalLimitReached)
        );
        assert_eq!(f.registry.len(), 2);

        f.registry
            .cancel(&f.guardian, &f.batch, &hash_description("A"), &at(1, 0), &mut f.timelock)
            .unwrap();
        propose(&mut f, "C", 2).unwrap();
        assert!(f.registry.proposal(&first).is_none());
        assert_eq!(f.registry.len(), 2);

        // No votes, so the second proposal is defeated once its deadline passes.
        f.registry
            .submit_offchain_vote_result(&f.attester, &second, true, &at(11, 0))
            .unwrap();
        assert_eq!(
            f.registry.state(&second, &at(12, 0), &f.timelock),
            Ok(ProposalState::Defeated)
        );
        propose(&mut f, "D", 12).unwrap();
        assert!(f.registry.proposal(&second).is_none());
        assert!(f.registry.gate().attestation(&second).is_none());
        assert_eq!(
            propose(&mut f, "E", 12),
            Err(GovernanceError::ProposalLimitReached)
        );
    }

    #[test]
    fn pruned_executed_proposal_cannot_run_again() {
        let mut f = fixture(GovernanceConfig {
            max_proposals: 2,
            ..config()
        });
        let id = succeeded(&mut f);
        let hash = hash_description("W");
        f.registry
            .queue(&f.batch, &hash, &at(11, 100), &mut f.timelock)
            .unwrap();
        let mut target = Recorder::default();
        f.registry
            .execute(&f.batch, &hash, &at(12, 160), &mut f.timelock, &mut target)
            .unwrap();

        f.registry
            .propose(&f.proposer, f.batch.clone(), "X", &at(14, 200), &f.power)
            .unwrap();
        f.registry
            .cancel(&f.proposer, &f.batch, &hash_description("X"), &at(14, 200), &mut f.timelock)
            .unwrap();
        f.registry
            .propose(&f.proposer, f.batch.clone(), "Y", &at(15, 200), &f.power)
            .unwrap();
        assert!(f.registry.proposal(&id).is_none());

        let again = f
            .registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(15, 200), &f.power)
            .unwrap();
        assert_eq!(again, id);
        f.registry
            .cast_vote(&f.proposer, &id, VoteSupport::For, &at(17, 210), &f.power)
            .unwrap();
        assert_eq!(
            f.registry.queue(&f.batch, &hash, &at(26, 300), &mut f.timelock),
            Err(GovernanceError::AttestationMissing)
        );
        f.registry
            .submit_offchain_vote_result(&f.attester, &id, true, &at(26, 300))
            .unwrap();
        assert_eq!(
            f.registry.queue(&f.batch, &hash, &at(26, 300), &mut f.timelock),
            Err(GovernanceError::AlreadyScheduled)
        );
        assert_eq!(target.0.len(), 1);
    }

    #[test]
    fn queue_requires_positive_attestation() {
        let mut f = fixture(config());
        let id = f
            .registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(0, 0), &f.power)
            .unwrap();
        f.registry
            .cast_vote(&f.proposer, &id, VoteSupport::For, &at(2, 0), &f.power)
            .unwrap();
        let hash = hash_description("W");
        assert_eq!(
            f.registry.queue(&f.batch, &hash, &at(11, 100), &mut f.timelock),
            Err(GovernanceError::AttestationMissing)
        );
        f.registry
            .submit_offchain_vote_result(&f.attester, &id, false, &at(12, 100))
            .unwrap();
        assert_eq!(
            f.registry.queue(&f.batch, &hash, &at(12, 100), &mut f.timelock),
            Err(GovernanceError::AttestationMissing)
        );
    }

    #[test]
    fn queue_rejects_unknown_payload_and_defeated_proposals() {
        let mut f = fixture(config());
        let hash = hash_description("W");
        assert_eq!(
            f.registry.queue(&f.batch, &hash, &at(11, 100), &mut f.timelock),
            Err(GovernanceError::PayloadMismatch)
        );
        let id = f
            .registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(0, 0), &f.power)
            .unwrap();
        f.registry
            .submit_offchain_vote_result(&f.attester, &id, true, &at(11, 100))
            .unwrap();
        assert_eq!(
            f.registry.queue(&f.batch, &hash, &at(11, 100), &mut f.timelock),
            Err(GovernanceError::InvalidStateTransition)
        );
    }

    #[test]
    fn full_lifecycle_executes_once() {
        let mut f = fixture(config());
        let id = succeeded(&mut f);
        let hash = hash_description("W");

        let operation_id = f
            .registry
            .queue(&f.batch, &hash, &at(11, 100), &mut f.timelock)
            .unwrap();
        assert_eq!(f.timelock.operation(&operation_id).unwrap().eta, 160);
        assert_eq!(
            f.registry.queue(&f.batch, &hash, &at(12, 101), &mut f.timelock),
            Err(GovernanceError::InvalidStateTransition)
        );

        let mut target = Recorder::default();
        assert_eq!(
            f.registry
                .execute(&f.batch, &hash, &at(12, 159), &mut f.timelock, &mut target),
            Err(GovernanceError::TimelockNotReady)
        );
        f.registry
            .execute(&f.batch, &hash, &at(13, 160), &mut f.timelock, &mut target)
            .unwrap();
        assert_eq!(
            f.registry
                .execute(&f.batch, &hash, &at(14, 161), &mut f.timelock, &mut target),
            Err(GovernanceError::AlreadyExecuted)
        );
        assert_eq!(target.0.len(), 1);
        assert_eq!(
            f.registry.state(&id, &at(14, 161), &f.timelock),
            Ok(ProposalState::Executed)
        );
    }

    #[test]
    fn cancel_rules() {
        let mut f = fixture(config());
        let hash = hash_description("W");
        let id = f
            .registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(0, 0), &f.power)
            .unwrap();
        assert_eq!(
            f.registry
                .cancel(&Pubkey::new_unique(), &f.batch, &hash, &at(1, 0), &mut f.timelock),
            Err(GovernanceError::Unauthorized)
        );
        f.registry
            .cancel(&f.guardian, &f.batch, &hash, &at(1, 0), &mut f.timelock)
            .unwrap();
        assert_eq!(
            f.registry.state(&id, &at(30, 0), &f.timelock),
            Ok(ProposalState::Canceled)
        );
        assert_eq!(
            f.registry
                .cancel(&f.proposer, &f.batch, &hash, &at(2, 0), &mut f.timelock),
            Err(GovernanceError::InvalidStateTransition)
        );
        assert_eq!(
            f.registry
                .cast_vote(&f.proposer, &id, VoteSupport::For, &at(2, 0), &f.power),
            Err(GovernanceError::VotingClosed)
        );
    }

    #[test]
    fn canceling_queued_proposal_cancels_operation() {
        let mut f = fixture(config());
        succeeded(&mut f);
        let hash = hash_description("W");
        let operation_id = f
            .registry
            .queue(&f.batch, &hash, &at(11, 100), &mut f.timelock)
            .unwrap();

        f.registry
            .cancel(&f.proposer, &f.batch, &hash, &at(12, 100), &mut f.timelock)
            .unwrap();
        assert_eq!(f.timelock.status(&operation_id), OperationStatus::Canceled);

        let mut target = Recorder::default();
        assert_eq!(
            f.registry
                .execute(&f.batch, &hash, &at(20, 1_000), &mut f.timelock, &mut target),
            Err(GovernanceError::InvalidStateTransition)
        );
        assert!(target.0.is_empty());
    }

    #[test]
    fn rescheduled_operation_does_not_revive_canceled_proposal() {
        let mut f = fixture(config());
        let id = succeeded(&mut f);
        let hash = hash_description("W");
        let operation_id = f
            .registry
            .queue(&f.batch, &hash, &at(11, 100), &mut f.timelock)
            .unwrap();

        f.timelock.cancel(&f.authority, &operation_id).unwrap();
        assert_eq!(
            f.registry.state(&id, &at(12, 100), &f.timelock),
            Ok(ProposalState::Canceled)
        );

        let other = Pubkey::new_unique();
        f.timelock
            .grant_role(&f.authority, Role::Proposer, other)
            .unwrap();
        assert_eq!(
            f.timelock.schedule(&other, operation_id, 200, &at(12, 100)),
            Ok(2)
        );
        assert_eq!(
            f.registry.state(&id, &at(13, 300), &f.timelock),
            Ok(ProposalState::Canceled)
        );

        let mut target = Recorder::default();
        assert_eq!(
            f.registry
                .execute(&f.batch, &hash, &at(13, 300), &mut f.timelock, &mut target),
            Err(GovernanceError::InvalidStateTransition)
        );
        assert_eq!(
            f.registry
                .cancel(&f.proposer, &f.batch, &hash, &at(13, 300), &mut f.timelock),
            Err(GovernanceError::InvalidStateTransition)
        );
        assert!(target.0.is_empty());
        assert_eq!(f.timelock.status(&operation_id), OperationStatus::Scheduled);
    }

    #[test]
    fn succeeded_proposal_expires_after_grace() {
        let mut f = fixture(GovernanceConfig {
            queue_grace_period: Some(5),
            ..config()
        });
        let id = succeeded(&mut f);
        assert_eq!(
            f.registry.state(&id, &at(15, 0), &f.timelock),
            Ok(ProposalState::Succeeded)
        );
        assert_eq!(
            f.registry.state(&id, &at(16, 0), &f.timelock),
            Ok(ProposalState::Expired)
        );
        assert_eq!(
            f.registry
                .queue(&f.batch, &hash_description("W"), &at(16, 0), &mut f.timelock),
            Err(GovernanceError::InvalidStateTransition)
        );
    }

    #[test]
    fn attestation_is_attester_only_and_after_deadline() {
        let mut f = fixture(config());
        let id = f
            .registry
            .propose(&f.proposer, f.batch.clone(), "W", &at(0, 0), &f.power)
            .unwrap();
        assert_eq!(
            f.registry
                .submit_offchain_vote_result(&f.proposer, &id, true, &at(11, 0)),
            Err(GovernanceError::Unauthorized)
        );
        assert_eq!(
            f.registry
                .submit_offchain_vote_result(&f.attester, &id, true, &at(10, 0)),
            Err(GovernanceError::VotingNotEnded)
        );
        assert_eq!(
            f.registry
                .submit_offchain_vote_result(&f.attester, &[0; 32], true, &at(11, 0)),
            Err(GovernanceError::ProposalNotFound)
        );
    }

    #[test]
    fn administration_is_authority_only() {
        let mut f = fixture(config());
        let next = Pubkey::new_unique();
        assert_eq!(
            f.registry.set_attester(&f.proposer, next, &at(0, 0)),
            Err(GovernanceError::Unauthorized)
        );
        assert_eq!(
            f.registry.set_attester(&f.authority, next, &at(0, 0)),
            Ok(f.attester)
        );
        assert_eq!(f.registry.gate().attester(), &next);

        assert_eq!(
            f.registry.update_config(
                &f.authority,
                GovernanceConfig {
                    voting_period: 0,
                    ..config()
                }
            ),
            Err(GovernanceError::InvalidConfig)
        );
        f.registry.set_guardian(&f.authority, None).unwrap();
        assert!(f.registry.guardian().is_none());
    }
}
