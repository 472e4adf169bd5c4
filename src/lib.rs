//! # ledger-core
//!
//! Core of a single-node decentralized ledger: a content-addressed,
//! append-only chain of cryptographically linked blocks whose state is the
//! set of unspent transaction outputs, extended under a pluggable consensus
//! rule.
//!
//! ## Architecture
//!
//! - `store` / `chain`: hash-keyed block persistence with a single tip
//!   pointer and tip-to-genesis iteration
//! - `utxo`: derived index of spendable outputs, kept consistent with the
//!   canonical chain
//! - `consensus`: the proposal/validation contract, instantiated by
//!   proof-of-work (with 2016-block retargeting) and proof-of-stake
//!   (stake-weighted proposer, signed blocks)
//! - `transaction` / `block`: the UTXO transaction graph and the blocks
//!   that carry it
//!
//! Blocks and transactions are immutable after construction; mutation is
//! confined to the chain engine behind one reader-writer lock.

pub mod address;
pub mod block;
pub mod chain;
pub mod cli;
pub mod config;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod merkle;
pub mod serialization;
pub mod store;
pub mod transaction;
pub mod types;
pub mod utxo;
pub mod wallet;

pub use block::Block;
pub use chain::Blockchain;
pub use consensus::{Consensus, ConsensusKind, Difficulty};
pub use error::{LedgerError, Result};
pub use merkle::MerkleTree;
pub use transaction::{Transaction, TxInput, TxOutput};
pub use wallet::Wallet;
