use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{keccak, pubkey::Pubkey};

use crate::error::GovernanceError;

pub type ProposalId = [u8; 32];
pub type OperationId = [u8; 32];
pub type DescriptionHash = [u8; 32];

const PROPOSAL_DOMAIN: &[u8] = b"proposal";
const OPERATION_DOMAIN: &[u8] = b"operation";

/// Ordered batch of calls a proposal performs once executed.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActionBatch {
    pub targets: Vec<Pubkey>,
    /// Lamports moved from the vault to each target.
    pub values: Vec<u64>,
    pub calldatas: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call<'a> {
    pub target: &'a Pubkey,
    pub value: u64,
    pub calldata: &'a [u8],
}

impl ActionBatch {
    pub fn new(targets: Vec<Pubkey>, values: Vec<u64>, calldatas: Vec<Vec<u8>>) -> Self {
        Self {
            targets,
            values,
            calldatas,
        }
    }

    pub fn single(target: Pubkey, value: u64, calldata: Vec<u8>) -> Self {
        Self::new(vec![target], vec![value], vec![calldata])
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.targets.is_empty()
            || self.targets.len() != self.values.len()
            || self.targets.len() != self.calldatas.len()
        {
            return Err(GovernanceError::InvalidProposalShape);
        }
        Ok(())
    }

    /// Calls in execution order. Only meaningful on a validated batch.
    pub fn calls(&self) -> impl Iterator<Item = Call<'_>> {
        self.targets
            .iter()
            .zip(self.values.iter())
            .zip(self.calldatas.iter())
            .map(|((target, value), calldata)| Call {
                target,
                value: *value,
                calldata,
            })
    }

    pub fn total_value(&self) -> Option<u64> {
        self.values
            .iter()
            .try_fold(0u64, |acc, value| acc.checked_add(*value))
    }

    /// Canonical byte encoding hashed into proposal and operation ids.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.targets.len() as u32).to_le_bytes());
        for call in self.calls() {
            out.extend_from_slice(call.target.as_ref());
            out.extend_from_slice(&call.value.to_le_bytes());
            out.extend_from_slice(&(call.calldata.len() as u32).to_le_bytes());
            out.extend_from_slice(call.calldata);
        }
        out
    }
}

pub fn hash_description(description: &str) -> DescriptionHash {
    keccak::hash(description.as_bytes()).to_bytes()
}

pub fn hash_proposal(batch: &ActionBatch, description_hash: &DescriptionHash) -> ProposalId {
    keccak::hashv(&[PROPOSAL_DOMAIN, &batch.encode(), description_hash]).to_bytes()
}

pub fn hash_operation(batch: &ActionBatch, salt: &[u8; 32]) -> OperationId {
    keccak::hashv(&[OPERATION_DOMAIN, &batch.encode(), salt]).to_bytes()
}
