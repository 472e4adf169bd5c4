//! UTXO-model transactions
//!
//! A transaction consumes outputs of earlier transactions and creates new
//! ones locked to public key hashes. Its id is the SHA-256 of the canonical
//! serialization with the id field cleared. Per-input signatures are made
//! over a trimmed copy so the digest is deterministic: the input being
//! signed carries the referenced output's pubkey hash, every other auth
//! field is empty.

use std::collections::HashMap;

use rand::RngCore;

use crate::constants::{COINBASE_MEMO_LEN, SUBSIDY};
use crate::error::{LedgerError, Result};
use crate::hashing::{hash_pub_key, sha256};
use crate::keys::verify_digest;
use crate::serialization::serialize_transaction;
use crate::types::{ByteString, Hash, PubKeyHash};
use crate::utxo::UtxoIndex;
use crate::wallet::Wallet;

/// Sentinel output index marking a coinbase input
pub const COINBASE_OUT_INDEX: i64 = -1;

/// A reference to a previous output plus the authorization to spend it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Id of the transaction holding the output to spend; empty for coinbase
    pub prev_tx_id: ByteString,
    /// Index of the output in that transaction; -1 for coinbase
    pub prev_out_index: i64,
    /// Fixed-width r ‖ s signature over the per-input digest
    pub signature: ByteString,
    /// Raw public key of the spender; carries the memo in a coinbase
    pub pubkey: ByteString,
}

impl TxInput {
    /// Whether this input was signed by the key hashing to `pubkey_hash`
    pub fn uses_key(&self, pubkey_hash: &[u8]) -> bool {
        hash_pub_key(&self.pubkey) == pubkey_hash
    }
}

/// An amount of coins locked to a public key hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: i64,
    pub pubkey_hash: PubKeyHash,
}

impl TxOutput {
    pub fn is_locked_with_key(&self, pubkey_hash: &[u8]) -> bool {
        self.pubkey_hash == pubkey_hash
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: ByteString,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

/// Transactions a verification pass resolves inputs against, keyed by id
pub type PrevTransactions = HashMap<ByteString, Transaction>;

impl Transaction {
    /// Create a coinbase paying the subsidy to `to_pubkey`'s hash.
    ///
    /// The single input carries the memo in place of a public key; without
    /// one, random bytes keep distinct coinbases from colliding on id.
    pub fn new_coinbase(to_pubkey: &[u8], memo: Option<Vec<u8>>) -> Transaction {
        let memo = memo.unwrap_or_else(|| {
            let mut random = vec![0u8; COINBASE_MEMO_LEN];
            rand::thread_rng().fill_bytes(&mut random);
            random
        });

        let input = TxInput {
            prev_tx_id: Vec::new(),
            prev_out_index: COINBASE_OUT_INDEX,
            signature: Vec::new(),
            pubkey: memo,
        };
        let output = TxOutput {
            value: SUBSIDY,
            pubkey_hash: hash_pub_key(to_pubkey),
        };

        let mut tx = Transaction {
            id: Vec::new(),
            inputs: vec![input],
            outputs: vec![output],
        };
        tx.id = tx.hash().to_vec();
        tx
    }

    /// Build an unsigned transaction spending `amount` from the wallet's
    /// outputs to `to_pubkey_hash`, with change back to the sender
    pub fn new_utxo_transaction(
        wallet: &Wallet,
        to_pubkey_hash: &[u8],
        amount: i64,
        utxo: &UtxoIndex,
    ) -> Result<Transaction> {
        let sender_hash = hash_pub_key(wallet.public_key());
        let (accumulated, spendable) = utxo.find_spendable_outputs(&sender_hash, amount)?;

        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                available: accumulated,
                required: amount,
            });
        }

        let mut inputs = Vec::new();
        for (tx_id, indices) in spendable {
            for index in indices {
                inputs.push(TxInput {
                    prev_tx_id: tx_id.clone(),
                    prev_out_index: index,
                    signature: Vec::new(),
                    pubkey: wallet.public_key().to_vec(),
                });
            }
        }

        let mut outputs = vec![TxOutput {
            value: amount,
            pubkey_hash: to_pubkey_hash.to_vec(),
        }];
        if accumulated > amount {
            outputs.push(TxOutput {
                value: accumulated - amount,
                pubkey_hash: sender_hash,
            });
        }

        let mut tx = Transaction {
            id: Vec::new(),
            inputs,
            outputs,
        };
        tx.id = tx.hash().to_vec();
        Ok(tx)
    }

    /// Whether this transaction mints coins (single input with the sentinel
    /// reference)
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].prev_tx_id.is_empty()
            && self.inputs[0].prev_out_index == COINBASE_OUT_INDEX
    }

    /// Canonical id: SHA-256 of the serialization with the id cleared
    pub fn hash(&self) -> Hash {
        let mut copy = self.clone();
        copy.id = Vec::new();
        sha256(&serialize_transaction(&copy))
    }

    /// Copy with every input's signature and pubkey cleared, the base form
    /// for per-input signing digests
    pub fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput {
                prev_tx_id: input.prev_tx_id.clone(),
                prev_out_index: input.prev_out_index,
                signature: Vec::new(),
                pubkey: Vec::new(),
            })
            .collect();
        Transaction {
            id: self.id.clone(),
            inputs,
            outputs: self.outputs.clone(),
        }
    }

    /// Sign every non-coinbase input with the wallet's key.
    ///
    /// Fails if a referenced transaction is missing from `prev_txs` or an
    /// output index is out of range.
    pub fn sign(&mut self, wallet: &Wallet, prev_txs: &PrevTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let mut copy = self.trimmed_copy();
        for index in 0..self.inputs.len() {
            let (digest, _) = per_input_digest(&mut copy, index, &self.inputs[index], prev_txs)?;
            self.inputs[index].signature = wallet.sign_digest(&digest)?;
        }
        Ok(())
    }

    /// Verify every non-coinbase input's signature against the referenced
    /// output's key hash
    pub fn verify(&self, prev_txs: &PrevTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let mut copy = self.trimmed_copy();
        for (index, input) in self.inputs.iter().enumerate() {
            let (digest, locked_to) = per_input_digest(&mut copy, index, input, prev_txs)?;
            if !input.uses_key(&locked_to) {
                return Err(LedgerError::InvalidSignature(format!(
                    "input {index} pubkey does not match the referenced output"
                )));
            }
            if !verify_digest(&input.pubkey, &digest, &input.signature) {
                return Err(LedgerError::InvalidSignature(format!(
                    "input {index} of transaction {}",
                    hex::encode(&self.id)
                )));
            }
        }
        Ok(())
    }

    /// Structural invariants plus signature verification for spends
    pub fn validate(&self, prev_txs: &PrevTransactions) -> Result<()> {
        if self.id.is_empty() {
            return Err(LedgerError::InvalidStructure(
                "transaction id cannot be empty".into(),
            ));
        }
        if self.inputs.is_empty() {
            return Err(LedgerError::InvalidStructure(
                "transaction must have at least one input".into(),
            ));
        }
        if self.outputs.is_empty() {
            return Err(LedgerError::InvalidStructure(
                "transaction must have at least one output".into(),
            ));
        }
        if !self.is_coinbase() {
            self.verify(prev_txs)?;
        }
        Ok(())
    }
}

/// Digest an input signs: the trimmed copy with this input's pubkey set to
/// the referenced output's hash, id cleared, everything else empty.
/// Also returns the hash the referenced output is locked to.
fn per_input_digest(
    copy: &mut Transaction,
    index: usize,
    input: &TxInput,
    prev_txs: &PrevTransactions,
) -> Result<(Hash, PubKeyHash)> {
    let prev_tx = prev_txs.get(&input.prev_tx_id).ok_or_else(|| {
        LedgerError::NotFound(format!(
            "referenced transaction {}",
            hex::encode(&input.prev_tx_id)
        ))
    })?;
    let prev_out = usize::try_from(input.prev_out_index)
        .ok()
        .and_then(|i| prev_tx.outputs.get(i))
        .ok_or_else(|| {
            LedgerError::InvalidStructure(format!(
                "output index {} out of range for transaction {}",
                input.prev_out_index,
                hex::encode(&input.prev_tx_id)
            ))
        })?;

    let locked_to = prev_out.pubkey_hash.clone();
    copy.inputs[index].signature = Vec::new();
    copy.inputs[index].pubkey = locked_to.clone();
    let digest = copy.hash();
    copy.inputs[index].pubkey = Vec::new();
    Ok((digest, locked_to))
}
