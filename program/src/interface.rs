//! Seams to the collaborators the engine does not own: the voting power ledger and the
//! account that actually holds and moves funds.

use solana_program::{entrypoint::ProgramResult, pubkey::Pubkey};

use crate::{error::GovernanceError, payload::Call};

/// Historical voting weight lookup. Must be a pure function of ledger history: the same
/// `(account, snapshot)` always yields the same weight once `snapshot` is in the past.
pub trait VotingPowerSource {
    fn weight_of(&self, account: &Pubkey, snapshot: u64) -> Result<u64, GovernanceError>;
}

/// Receiver of timelocked calls.
///
/// The scheduler takes a checkpoint before running a batch and rolls back to it if any
/// call fails, so a batch is never partially applied. On-chain the runtime already
/// reverts a failed instruction, which makes both hooks no-ops there.
pub trait ExecutionTarget {
    type Checkpoint;

    fn checkpoint(&self) -> Self::Checkpoint;

    fn invoke(&mut self, call: &Call<'_>) -> ProgramResult;

    fn rollback(&mut self, checkpoint: Self::Checkpoint);
}
