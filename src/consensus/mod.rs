//! Consensus abstraction
//!
//! The rule governing block proposal and validation is a capability set the
//! engine binds once per open chain. Two implementations exist:
//! proof-of-work with difficulty retargeting and proof-of-stake with
//! stake-weighted proposer selection.

pub mod pos;
pub mod pow;

pub use pos::{PosConsensus, Validator};
pub use pow::PowConsensus;

use crate::block::Block;
use crate::error::{LedgerError, Result};
use crate::transaction::{PrevTransactions, Transaction};
use crate::types::ByteString;
use crate::wallet::Wallet;

/// The consensus rule bound to an open chain
pub trait Consensus: Send + Sync {
    /// Create a block extending `prev_hash` according to the rule: find a
    /// nonce under proof-of-work, select and sign under proof-of-stake.
    /// `tip` is the current chain tip the difficulty context derives from.
    fn propose_block(
        &self,
        proposer: &Wallet,
        transactions: Vec<Transaction>,
        prev_hash: ByteString,
        tip: &[u8],
    ) -> Result<Block>;

    /// Check a block against the rule, including structural and transaction
    /// validation
    fn validate_block(&self, block: &Block, prev_txs: &PrevTransactions) -> Result<()>;

    /// Difficulty context a new block would be created under
    fn current_difficulty(&self, tip: &[u8]) -> Result<Difficulty>;
}

/// Rule-specific difficulty information
#[derive(Debug, Clone)]
pub enum Difficulty {
    /// Proof-of-work target exponent
    Bits(i64),
    /// Proof-of-stake active validator set
    Validators(Vec<Validator>),
}

/// Which rule a chain was created under; persisted in the store's meta
/// bucket and re-bound at open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusKind {
    Pow,
    Pos,
}

impl ConsensusKind {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            ConsensusKind::Pow => b"pow",
            ConsensusKind::Pos => b"pos",
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ConsensusKind> {
        match bytes {
            b"pow" => Ok(ConsensusKind::Pow),
            b"pos" => Ok(ConsensusKind::Pos),
            other => Err(LedgerError::Serialization(format!(
                "unknown consensus kind {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}
