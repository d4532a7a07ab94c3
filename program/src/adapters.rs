//! On-chain implementations of the engine's collaborator traits.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    program::invoke_signed,
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
};

use crate::{
    error::GovernanceError,
    interface::{ExecutionTarget, VotingPowerSource},
    payload::Call,
    state::{load, VotingPowerRecord},
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallAccount {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

/// Decoded form of a non-empty calldata: an instruction for the call's target program.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CallPayload {
    pub accounts: Vec<CallAccount>,
    pub data: Vec<u8>,
}

impl CallPayload {
    pub fn encode(&self) -> Result<Vec<u8>, ProgramError> {
        borsh::to_vec(self).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn to_instruction(&self, program_id: Pubkey) -> Instruction {
        Instruction {
            program_id,
            accounts: self
                .accounts
                .iter()
                .map(|a| AccountMeta {
                    pubkey: a.pubkey,
                    is_signer: a.is_signer,
                    is_writable: a.is_writable,
                })
                .collect(),
            data: self.data.clone(),
        }
    }
}

/// Reads a `VotingPowerRecord` account written by the configured voting power program.
pub struct RecordPowerSource<'a, 'info> {
    record: &'a AccountInfo<'info>,
    power_program: &'a Pubkey,
}

impl<'a, 'info> RecordPowerSource<'a, 'info> {
    pub fn new(record: &'a AccountInfo<'info>, power_program: &'a Pubkey) -> Self {
        Self {
            record,
            power_program,
        }
    }
}

impl VotingPowerSource for RecordPowerSource<'_, '_> {
    fn weight_of(&self, account: &Pubkey, snapshot: u64) -> Result<u64, GovernanceError> {
        if self.record.owner != self.power_program {
            return Err(GovernanceError::InvalidVotingPowerAccount);
        }
        let record: VotingPowerRecord =
            load(self.record).map_err(|_| GovernanceError::InvalidVotingPowerAccount)?;
        if record.owner != *account {
            return Err(GovernanceError::InvalidVotingPowerAccount);
        }
        Ok(record.weight_at(snapshot))
    }
}

/// Treasury vault PDA acting for the timelock. `accounts` must hold the vault, the system
/// program and every account the batch's calls reference.
///
/// Calls targeting `program_id` are refused: the runtime only allows direct self
/// recursion, so this is the one path by which a batch could re-enter the program while
/// its caller still holds governor and timelock state in memory.
pub struct VaultExecutor<'a, 'info> {
    program_id: &'a Pubkey,
    vault: &'a Pubkey,
    signer_seeds: &'a [&'a [u8]],
    accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> VaultExecutor<'a, 'info> {
    pub fn new(
        program_id: &'a Pubkey,
        vault: &'a Pubkey,
        signer_seeds: &'a [&'a [u8]],
        accounts: &'a [AccountInfo<'info>],
    ) -> Self {
        Self {
            program_id,
            vault,
            signer_seeds,
            accounts,
        }
    }
}

// A failed instruction is reverted by the runtime, so there is nothing to checkpoint.
impl ExecutionTarget for VaultExecutor<'_, '_> {
    type Checkpoint = ();

    fn checkpoint(&self) -> Self::Checkpoint {}

    fn invoke(&mut self, call: &Call<'_>) -> ProgramResult {
        if call.target == self.program_id {
            return Err(GovernanceError::ReentrantCall.into());
        }
        if call.value > 0 {
            invoke_signed(
                &system_instruction::transfer(self.vault, call.target, call.value),
                self.accounts,
                &[self.signer_seeds],
            )?;
        }
        if !call.calldata.is_empty() {
            let payload = CallPayload::try_from_slice(call.calldata)
                .map_err(|_| ProgramError::InvalidInstructionData)?;
            invoke_signed(
                &payload.to_instruction(*call.target),
                self.accounts,
                &[self.signer_seeds],
            )?;
        }
        Ok(())
    }

    fn rollback(&mut self, _checkpoint: Self::Checkpoint) {}
}
