use solana_program::program_error::ProgramError;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("Invalid instruction")]
    InvalidInstruction,

    #[error("Invalid configuration")]
    InvalidConfig,

    #[error("Batch must be non-empty with matching targets, values and calldatas")]
    InvalidProposalShape,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Proposer is below the proposal threshold")]
    InsufficientVotingPower,

    #[error("Voting power record is missing or does not belong to the voter")]
    InvalidVotingPowerAccount,

    #[error("Voter has no voting power at the snapshot")]
    NoVotingPower,

    #[error("Voting is closed")]
    VotingClosed,

    #[error("Voting has not ended")]
    VotingNotEnded,

    #[error("Attestation window has closed")]
    AttestationWindowClosed,

    #[error("Timelock delay has not elapsed")]
    TimelockNotReady,

    #[error("Eta is earlier than the minimum delay allows")]
    DelayTooShort,

    #[error("Proposal already exists")]
    ProposalAlreadyExists,

    #[error("Proposal not found")]
    ProposalNotFound,

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Already attested")]
    AlreadyAttested,

    #[error("Off-chain attestation missing")]
    AttestationMissing,

    #[error("Payload does not match a known proposal or operation")]
    PayloadMismatch,

    #[error("Invalid state transition")]
    InvalidStateTransition,

    #[error("Operation already scheduled")]
    AlreadyScheduled,

    #[error("Already executed")]
    AlreadyExecuted,

    #[error("Batch execution failed")]
    BatchExecutionFailed,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Account already initialized")]
    AlreadyInitialized,

    #[error("Account not initialized")]
    NotInitialized,

    #[error("A call may not target the governance program itself")]
    ReentrantCall,

    #[error("Proposal capacity reached")]
    ProposalLimitReached,
}

/// Coarse grouping used by callers to decide whether a retry can ever succeed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed payload, rejected before any state is touched.
    Shape,
    Authorization,
    /// Too early or too late relative to snapshot, deadline or eta.
    Timing,
    /// Wrong current state, or a duplicate of a transition that already happened.
    State,
    Execution,
    Arithmetic,
    Account,
}

impl GovernanceError {
    pub fn class(&self) -> ErrorClass {
        use GovernanceError::*;
        match self {
            InvalidInstruction | InvalidConfig | InvalidProposalShape => ErrorClass::Shape,
            Unauthorized | InsufficientVotingPower | InvalidVotingPowerAccount | NoVotingPower => {
                ErrorClass::Authorization
            }
            VotingClosed | VotingNotEnded | AttestationWindowClosed | TimelockNotReady
            | DelayTooShort => ErrorClass::Timing,
            ProposalLimitReached => ErrorClass::State,
            ProposalAlreadyExists | ProposalNotFound | AlreadyVoted | AlreadyAttested
            | AttestationMissing | PayloadMismatch | InvalidStateTransition | AlreadyScheduled
            | AlreadyExecuted => ErrorClass::State,
            BatchExecutionFailed | ReentrantCall => ErrorClass::Execution,
            Overflow => ErrorClass::Arithmetic,
            AlreadyInitialized | NotInitialized => ErrorClass::Account,
        }
    }
}

impl From<GovernanceError> for ProgramError {
    fn from(e: GovernanceError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
