//! UTXO index over the chainstate bucket
//!
//! A derived index mapping each transaction id to the outputs of that
//! transaction not yet consumed by a later block. Entries shrink as inputs
//! spend them and are removed once empty; an entry is never resurrected.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use crate::block::Block;
use crate::error::{LedgerError, Result};
use crate::serialization::{deserialize_outputs, serialize_outputs};
use crate::store::ChainStore;
use crate::transaction::TxOutput;
use crate::types::ByteString;

pub struct UtxoIndex {
    store: Arc<ChainStore>,
}

impl UtxoIndex {
    pub fn new(store: Arc<ChainStore>) -> UtxoIndex {
        UtxoIndex { store }
    }

    /// Destroy and rebuild the index from a full tip-to-genesis scan.
    ///
    /// A single backward pass marks every spent output reference, then
    /// records each transaction's surviving outputs.
    pub fn reindex(&self) -> Result<()> {
        self.store.chainstate_clear()?;

        let utxo = self.scan_chain()?;
        let mut entries = 0usize;
        for (tx_id, outputs) in utxo {
            self.store
                .chainstate_put(&tx_id, serialize_outputs(&outputs))?;
            entries += 1;
        }
        info!(entries, "utxo index rebuilt");
        Ok(())
    }

    /// Accumulate outputs locked to `pubkey_hash` until `amount` is reached.
    ///
    /// Returns the accumulated value and the chosen outputs as
    /// `tx_id → output indices`. Enumeration follows the store's sorted key
    /// order, so selection is reproducible.
    pub fn find_spendable_outputs(
        &self,
        pubkey_hash: &[u8],
        amount: i64,
    ) -> Result<(i64, HashMap<ByteString, Vec<i64>>)> {
        let mut spendable: HashMap<ByteString, Vec<i64>> = HashMap::new();
        let mut accumulated = 0i64;

        'scan: for entry in self.store.chainstate_iter() {
            let (tx_id, raw) = entry?;
            let outputs = deserialize_outputs(&raw)?;
            for (index, output) in outputs.iter().enumerate() {
                if output.is_locked_with_key(pubkey_hash) {
                    accumulated += output.value;
                    spendable.entry(tx_id.clone()).or_default().push(index as i64);
                    if accumulated >= amount {
                        break 'scan;
                    }
                }
            }
        }

        Ok((accumulated, spendable))
    }

    /// All still-spendable outputs, filtered to `pubkey_hash` when given
    pub fn find_outputs(&self, pubkey_hash: Option<&[u8]>) -> Result<Vec<TxOutput>> {
        let mut found = Vec::new();
        for entry in self.store.chainstate_iter() {
            let (_, raw) = entry?;
            for output in deserialize_outputs(&raw)? {
                match pubkey_hash {
                    Some(hash) if !output.is_locked_with_key(hash) => {}
                    _ => found.push(output),
                }
            }
        }
        Ok(found)
    }

    /// Raw chainstate entries in key order, as stored on disk
    pub fn raw_entries(&self) -> Result<Vec<(ByteString, ByteString)>> {
        self.store.chainstate_iter().collect()
    }

    /// Number of transactions with spendable outputs remaining
    pub fn count_transactions(&self) -> Result<usize> {
        let mut count = 0;
        for entry in self.store.chainstate_iter() {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Apply a committed block's delta: drop consumed outputs, delete
    /// emptied entries, insert the new transactions' outputs
    pub fn update(&self, block: &Block) -> Result<()> {
        for tx in &block.transactions {
            if !tx.is_coinbase() {
                for input in &tx.inputs {
                    let raw = self
                        .store
                        .chainstate_get(&input.prev_tx_id)?
                        .ok_or_else(|| {
                            LedgerError::NotFound(format!(
                                "utxo entry {}",
                                hex::encode(&input.prev_tx_id)
                            ))
                        })?;
                    let outputs = deserialize_outputs(&raw)?;

                    // Input indices address positions in the current entry.
                    let remaining: Vec<TxOutput> = outputs
                        .iter()
                        .enumerate()
                        .filter(|(index, _)| *index as i64 != input.prev_out_index)
                        .map(|(_, output)| output.clone())
                        .collect();

                    if remaining.is_empty() {
                        self.store.chainstate_remove(&input.prev_tx_id)?;
                    } else {
                        self.store
                            .chainstate_put(&input.prev_tx_id, serialize_outputs(&remaining))?;
                    }
                }
            }

            self.store
                .chainstate_put(&tx.id, serialize_outputs(&tx.outputs))?;
        }
        Ok(())
    }

    /// Full backward chain scan producing `tx_id → unspent outputs`
    fn scan_chain(&self) -> Result<HashMap<ByteString, Vec<TxOutput>>> {
        let mut utxo: HashMap<ByteString, Vec<TxOutput>> = HashMap::new();
        let mut spent: HashMap<ByteString, HashSet<i64>> = HashMap::new();

        let mut current = match self.store.tip()? {
            Some(tip) => tip,
            None => return Ok(utxo),
        };

        loop {
            let block = self.store.get_block(&current)?;

            for tx in &block.transactions {
                let spent_here = spent.get(&tx.id);
                let unspent: Vec<TxOutput> = tx
                    .outputs
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| {
                        spent_here.is_none_or(|s| !s.contains(&(*index as i64)))
                    })
                    .map(|(_, output)| output.clone())
                    .collect();
                if !unspent.is_empty() {
                    utxo.insert(tx.id.clone(), unspent);
                }

                if !tx.is_coinbase() {
                    for input in &tx.inputs {
                        spent
                            .entry(input.prev_tx_id.clone())
                            .or_default()
                            .insert(input.prev_out_index);
                    }
                }
            }

            if block.is_genesis() {
                break;
            }
            current = block.prev_hash;
        }

        Ok(utxo)
    }
}
