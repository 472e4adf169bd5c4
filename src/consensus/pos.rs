//! Proof-of-stake consensus
//!
//! Validators register stake in the store and are cached in memory. The
//! proposer for each block is drawn stake-weighted at random; this
//! single-node design only proposes when the caller's wallet is the
//! selected validator. A block's identity under proof-of-stake is the
//! SHA-256 of its stake header view, signed by the proposer.

use std::sync::{Arc, RwLock};

use rand::Rng;
use tracing::info;

use crate::block::Block;
use crate::constants::{GENESIS_STAKE, INITIAL_TARGET_BITS, MIN_STAKE};
use crate::error::{LedgerError, Result};
use crate::hashing::{hash_pub_key, sha256};
use crate::serialization::{deserialize_validator, serialize_validator};
use crate::store::ChainStore;
use crate::transaction::{PrevTransactions, Transaction};
use crate::types::ByteString;
use crate::wallet::Wallet;

use super::{Consensus, Difficulty};

/// A staking account, keyed in storage by its pubkey hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub address: String,
    pub pubkey: ByteString,
    pub stake: i64,
}

pub struct PosConsensus {
    store: Arc<ChainStore>,
    /// In-memory cache of the registry, in store key order
    validators: RwLock<Vec<Validator>>,
}

impl PosConsensus {
    /// Create the consensus instance and load the persisted registry
    pub fn new(store: Arc<ChainStore>) -> Result<PosConsensus> {
        let mut validators = Vec::new();
        for entry in store.validators_iter() {
            let (_, raw) = entry?;
            validators.push(deserialize_validator(&raw)?);
        }
        Ok(PosConsensus {
            store,
            validators: RwLock::new(validators),
        })
    }

    /// Register stake for a wallet, inserting or incrementing its record
    pub fn add_stake(&self, amount: i64, wallet: &Wallet) -> Result<()> {
        if amount <= 0 {
            return Err(LedgerError::InvalidStructure(
                "stake amount must be positive".into(),
            ));
        }

        let mut validators = write_lock(&self.validators);
        let record = match validators
            .iter_mut()
            .find(|v| v.pubkey == wallet.public_key())
        {
            Some(existing) => {
                existing.stake += amount;
                existing.clone()
            }
            None => {
                let validator = Validator {
                    address: wallet.address(),
                    pubkey: wallet.public_key().to_vec(),
                    stake: amount,
                };
                validators.push(validator.clone());
                validator
            }
        };
        drop(validators);

        self.store.validator_put(
            &hash_pub_key(&record.pubkey),
            serialize_validator(&record),
        )?;
        info!(address = %record.address, stake = record.stake, "validator stake updated");
        Ok(())
    }

    /// Stake-weighted random choice over validators with positive stake.
    ///
    /// The walk order is the cache's load order, independent of stake, so a
    /// uniform draw over [0, total) weights each validator by its share.
    fn select_validator(&self) -> Result<Validator> {
        let validators = read_lock(&self.validators);
        let total: i64 = validators.iter().filter(|v| v.stake > 0).map(|v| v.stake).sum();
        if total == 0 {
            return Err(LedgerError::NotFound(
                "no validators with positive stake".into(),
            ));
        }

        let draw = rand::thread_rng().gen_range(0..total);
        let mut cumulative = 0i64;
        for validator in validators.iter() {
            if validator.stake > 0 {
                cumulative += validator.stake;
                if draw < cumulative {
                    return Ok(validator.clone());
                }
            }
        }
        // Unreachable: cumulative reaches total and draw < total.
        Err(LedgerError::NotFound("validator selection failed".into()))
    }

    fn find_validator(&self, pubkey: &[u8]) -> Option<Validator> {
        read_lock(&self.validators)
            .iter()
            .find(|v| v.pubkey == pubkey)
            .cloned()
    }
}

impl Consensus for PosConsensus {
    fn propose_block(
        &self,
        proposer: &Wallet,
        transactions: Vec<Transaction>,
        prev_hash: ByteString,
        _tip: &[u8],
    ) -> Result<Block> {
        let selected = self.select_validator()?;
        if selected.pubkey != proposer.public_key() {
            return Err(LedgerError::NotSelectedProposer {
                selected: selected.address,
            });
        }

        let mut block = Block::new(transactions, prev_hash);
        if block.is_genesis() {
            // Preserved in the serialized form; unused by stake validation.
            block.bits = INITIAL_TARGET_BITS;
        }
        block.validator_pubkey = proposer.public_key().to_vec();

        let digest = sha256(&block.prepare_header_pos());
        block.signature = proposer.sign_digest(&digest)?;
        block.hash = digest.to_vec();
        Ok(block)
    }

    fn validate_block(&self, block: &Block, prev_txs: &PrevTransactions) -> Result<()> {
        block.validate_structural(prev_txs)?;

        if block.validator_pubkey.is_empty() || block.signature.is_empty() {
            return Err(LedgerError::InvalidStructure(
                "stake block missing validator public key or signature".into(),
            ));
        }

        let digest = sha256(&block.prepare_header_pos());
        if !crate::keys::verify_digest(&block.validator_pubkey, &digest, &block.signature) {
            return Err(LedgerError::InvalidSignature(format!(
                "validator signature for block {}",
                hex::encode(&block.hash)
            )));
        }

        let validator = self
            .find_validator(&block.validator_pubkey)
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "validator {} not in active set",
                    hex::encode(&block.validator_pubkey)
                ))
            })?;
        if validator.stake < MIN_STAKE {
            return Err(LedgerError::InsufficientStake {
                validator: validator.address,
                stake: validator.stake,
                required: MIN_STAKE,
            });
        }
        Ok(())
    }

    fn current_difficulty(&self, _tip: &[u8]) -> Result<Difficulty> {
        Ok(Difficulty::Validators(read_lock(&self.validators).clone()))
    }
}

/// Grant the chain creator its initial stake
pub(crate) fn seed_genesis_stake(consensus: &PosConsensus, wallet: &Wallet) -> Result<()> {
    consensus.add_stake(GENESIS_STAKE, wallet)
}

fn read_lock(lock: &RwLock<Vec<Validator>>) -> std::sync::RwLockReadGuard<'_, Vec<Validator>> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock(lock: &RwLock<Vec<Validator>>) -> std::sync::RwLockWriteGuard<'_, Vec<Validator>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
