use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};

use crate::{error::GovernanceError, registry::ProposalRegistry, timelock::TimelockScheduler};

pub const GOVERNOR_SEED: &[u8] = b"governor";
pub const VAULT_SEED: &[u8] = b"vault";

/// Governor state account. Pre-allocated by the client, owned by this program.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct Governor {
    pub is_initialized: bool,
    pub timelock: Pubkey,
    /// Program that owns the `VotingPowerRecord` accounts votes are weighed with.
    pub voting_power_program: Pubkey,
    pub registry: ProposalRegistry,
}

/// Timelock state account. Pre-allocated by the client, owned by this program.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct Timelock {
    pub is_initialized: bool,
    pub scheduler: TimelockScheduler,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub slot: u64,
    pub weight: u64,
}

/// Delegated voting weight history of one account, written by the voting power program.
/// Checkpoints are sorted by slot.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct VotingPowerRecord {
    pub owner: Pubkey,
    pub checkpoints: Vec<Checkpoint>,
}

impl VotingPowerRecord {
    /// Weight of the last checkpoint at or before `slot`.
    pub fn weight_at(&self, slot: u64) -> u64 {
        let idx = self.checkpoints.partition_point(|c| c.slot <= slot);
        idx.checked_sub(1)
            .map(|i| self.checkpoints[i].weight)
            .unwrap_or(0)
    }
}

pub fn governor_authority(program_id: &Pubkey, governor: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[GOVERNOR_SEED, governor.as_ref()], program_id)
}

pub fn vault_address(program_id: &Pubkey, timelock: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, timelock.as_ref()], program_id)
}

/// First byte of every state account is its `is_initialized` flag.
pub fn is_initialized(account: &AccountInfo) -> Result<bool, ProgramError> {
    Ok(account.try_borrow_data()?.first() == Some(&1))
}

pub fn load<T: BorshDeserialize>(account: &AccountInfo) -> Result<T, ProgramError> {
    let data = account.try_borrow_data()?;
    T::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)
}

pub fn load_initialized<T: BorshDeserialize>(
    program_id: &Pubkey,
    account: &AccountInfo,
) -> Result<T, ProgramError> {
    if account.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    if !is_initialized(account)? {
        return Err(GovernanceError::NotInitialized.into());
    }
    load(account)
}

/// Writes `value` at the start of the account data. Trailing bytes are left as they are.
pub fn store<T: BorshSerialize>(value: &T, account: &AccountInfo) -> Result<(), ProgramError> {
    let bytes = borsh::to_vec(value).map_err(|_| ProgramError::InvalidAccountData)?;
    let mut data = account.try_borrow_mut_data()?;
    if bytes.len() > data.len() {
        return Err(ProgramError::AccountDataTooSmall);
    }
    data[..bytes.len()].copy_from_slice(&bytes);
    Ok(())
}
