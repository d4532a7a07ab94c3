//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use attested_governance::{
    error::GovernanceError,
    interface::{ExecutionTarget, VotingPowerSource},
    payload::Call,
    state::{Checkpoint, VotingPowerRecord},
};
use solana_program::{
    clock::Clock, entrypoint::ProgramResult, program_error::ProgramError, pubkey::Pubkey,
};

/// Calldata that makes `Treasury::invoke` fail.
pub const FAILING_CALL: &[u8] = b"fail";

pub fn at(slot: u64, unix_timestamp: i64) -> Clock {
    Clock {
        slot,
        unix_timestamp,
        ..Clock::default()
    }
}

/// Token with delegated, checkpointed voting power.
#[derive(Default)]
pub struct TokenLedger {
    balances: BTreeMap<Pubkey, u64>,
    delegates: BTreeMap<Pubkey, Pubkey>,
    power: BTreeMap<Pubkey, VotingPowerRecord>,
}

impl TokenLedger {
    pub fn balance(&self, account: &Pubkey) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, to: Pubkey, amount: u64, slot: u64) {
        *self.balances.entry(to).or_default() += amount;
        if let Some(delegatee) = self.delegates.get(&to).copied() {
            self.adjust(delegatee, amount as i128, slot);
        }
    }

    pub fn delegate(&mut self, holder: Pubkey, delegatee: Pubkey, slot: u64) {
        let balance = self.balance(&holder) as i128;
        if let Some(previous) = self.delegates.insert(holder, delegatee) {
            self.adjust(previous, -balance, slot);
        }
        self.adjust(delegatee, balance, slot);
    }

    pub fn transfer(&mut self, from: Pubkey, to: Pubkey, amount: u64, slot: u64) {
        let remaining = self.balance(&from) - amount;
        self.balances.insert(from, remaining);
        *self.balances.entry(to).or_default() += amount;
        if let Some(delegatee) = self.delegates.get(&from).copied() {
            self.adjust(delegatee, -(amount as i128), slot);
        }
        if let Some(delegatee) = self.delegates.get(&to).copied() {
            self.adjust(delegatee, amount as i128, slot);
        }
    }

    pub fn current_power(&self, account: &Pubkey) -> u64 {
        self.weight_of(account, u64::MAX).unwrap()
    }

    fn adjust(&mut self, account: Pubkey, delta: i128, slot: u64) {
        let record = self.power.entry(account).or_insert_with(|| VotingPowerRecord {
            owner: account,
            checkpoints: vec![],
        });
        let current = record.checkpoints.last().map(|c| c.weight).unwrap_or(0);
        let weight = (current as i128 + delta) as u64;
        match record.checkpoints.last_mut() {
            Some(last) if last.slot == slot => last.weight = weight,
            _ => record.checkpoints.push(Checkpoint { slot, weight }),
        }
    }
}

impl VotingPowerSource for TokenLedger {
    fn weight_of(&self, account: &Pubkey, snapshot: u64) -> Result<u64, GovernanceError> {
        Ok(self
            .power
            .get(account)
            .map(|record| record.weight_at(snapshot))
            .unwrap_or(0))
    }
}

/// Lamport balances with the treasury vault as the only payer.
pub struct Treasury {
    pub vault: Pubkey,
    pub balances: BTreeMap<Pubkey, u64>,
    pub invocations: usize,
}

impl Treasury {
    pub fn funded(amount: u64) -> Self {
        let vault = Pubkey::new_unique();
        Self {
            vault,
            balances: BTreeMap::from([(vault, amount)]),
            invocations: 0,
        }
    }

    pub fn balance(&self, account: &Pubkey) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

impl ExecutionTarget for Treasury {
    type Checkpoint = (BTreeMap<Pubkey, u64>, usize);

    fn checkpoint(&self) -> Self::Checkpoint {
        (self.balances.clone(), self.invocations)
    }

    fn invoke(&mut self, call: &Call<'_>) -> ProgramResult {
        self.invocations += 1;
        if call.calldata == FAILING_CALL {
            return Err(ProgramError::Custom(0));
        }
        let available = self.balance(&self.vault);
        if available < call.value {
            return Err(ProgramError::InsufficientFunds);
        }
        self.balances.insert(self.vault, available - call.value);
        *self.balances.entry(*call.target).or_default() += call.value;
        Ok(())
    }

    fn rollback(&mut self, checkpoint: Self::Checkpoint) {
        (self.balances, self.invocations) = checkpoint;
    }
}
