//! Blocks and their consensus-specific header views
//!
//! A block is immutable once committed; the consensus layer fills in the
//! identity fields (hash, nonce, bits, validator key, signature) during
//! proposal. Proof-of-work and proof-of-stake disagree on which bytes form
//! a block's identity, so the header is exposed as two preimage views over
//! the same struct.

use rayon::prelude::*;

use crate::error::{LedgerError, Result};
use crate::hashing::{int_to_dec, sha256};
use crate::transaction::{PrevTransactions, Transaction};
use crate::types::{ByteString, Hash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Seconds since epoch, set at construction
    pub timestamp: i64,
    /// Ordered transactions; index 0 is the coinbase
    pub transactions: Vec<Transaction>,
    /// Parent block hash; empty for genesis
    pub prev_hash: ByteString,
    /// Block identity, recorded by whichever consensus committed it
    pub hash: ByteString,
    /// Proof-of-work nonce
    pub nonce: i64,
    /// Difficulty target exponent; 0 on non-genesis proof-of-stake blocks
    pub bits: i64,
    /// Raw public key of the proposing validator; empty under proof-of-work
    pub validator_pubkey: ByteString,
    /// Validator signature over the proof-of-stake header digest
    pub signature: ByteString,
}

impl Block {
    /// New block extending `prev_hash`; the consensus layer sets the
    /// identity fields
    pub fn new(transactions: Vec<Transaction>, prev_hash: ByteString) -> Block {
        Block {
            timestamp: unix_now(),
            transactions,
            prev_hash,
            hash: Vec::new(),
            nonce: 0,
            bits: 0,
            validator_pubkey: Vec::new(),
            signature: Vec::new(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    /// Root over the block's transactions: SHA-256 of the concatenated ids
    pub fn tx_root(&self) -> Hash {
        let mut joined = Vec::with_capacity(self.transactions.len() * 32);
        for tx in &self.transactions {
            joined.extend_from_slice(&tx.id);
        }
        sha256(&joined)
    }

    /// Proof-of-work header preimage:
    /// prev_hash ‖ tx_root ‖ dec(timestamp) ‖ dec(bits) ‖ dec(nonce)
    pub fn prepare_header_pow(&self, nonce: i64, bits: i64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.prev_hash);
        data.extend_from_slice(&self.tx_root());
        data.extend_from_slice(&int_to_dec(self.timestamp));
        data.extend_from_slice(&int_to_dec(bits));
        data.extend_from_slice(&int_to_dec(nonce));
        data
    }

    /// Proof-of-stake header preimage: the proof-of-work fields followed by
    /// the validator public key
    pub fn prepare_header_pos(&self) -> Vec<u8> {
        let mut data = self.prepare_header_pow(self.nonce, self.bits);
        data.extend_from_slice(&self.validator_pubkey);
        data
    }

    /// Consensus-independent validation: genesis carries exactly one
    /// coinbase; every other block starts with a coinbase and all spends
    /// verify against `prev_txs`.
    ///
    /// Spend verification runs in parallel; the first failure wins.
    pub fn validate_structural(&self, prev_txs: &PrevTransactions) -> Result<()> {
        if self.is_genesis() {
            if self.transactions.len() != 1 || !self.transactions[0].is_coinbase() {
                return Err(LedgerError::InvalidStructure(
                    "genesis block must have exactly one coinbase transaction".into(),
                ));
            }
            return Ok(());
        }

        if self.transactions.is_empty() {
            return Err(LedgerError::InvalidStructure(
                "block must contain at least one transaction".into(),
            ));
        }
        if !self.transactions[0].is_coinbase() {
            return Err(LedgerError::InvalidStructure(
                "first transaction must be coinbase".into(),
            ));
        }

        self.transactions
            .par_iter()
            .enumerate()
            .filter(|(_, tx)| !tx.is_coinbase())
            .try_for_each(|(index, tx)| {
                tx.validate(prev_txs).map_err(|e| {
                    LedgerError::InvalidStructure(format!(
                        "invalid transaction at index {index}: {e}"
                    ))
                })
            })
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
