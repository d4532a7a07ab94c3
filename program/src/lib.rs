//! Token-weighted governance whose vote outcome is confirmed by a trusted off-chain
//! attester before it can reach a timelocked treasury.

pub mod adapters;
pub mod attestation;
pub mod config;
pub mod error;
pub mod events;
pub mod instruction;
pub mod interface;
pub mod payload;
pub mod processor;
pub mod registry;
pub mod state;
pub mod tally;
pub mod timelock;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

solana_program::declare_id!("AttGovovZqk86x8QSxCvnRdqGtkRRqDfrFo8oViozi6w");

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
