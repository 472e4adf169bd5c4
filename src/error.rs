//! Error types for ledger validation and storage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("chain already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid proof of work: {0}")]
    InvalidProofOfWork(String),

    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("validator {validator} has insufficient stake ({stake}, required {required})")]
    InsufficientStake {
        validator: String,
        stake: i64,
        required: i64,
    },

    #[error("wallet is not the selected proposer (selected {selected})")]
    NotSelectedProposer { selected: String },

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
