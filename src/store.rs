//! Persistent chain store
//!
//! Namespaced key-value persistence on sled. Logical buckets map to named
//! trees:
//! - `blocks`: block hash → serialized block, plus the `"l"` key → tip hash
//! - `chainstate`: transaction id → serialized list of spendable outputs
//! - `validators`: pubkey hash → serialized validator record
//! - `meta`: `"consensus"` → consensus kind bound at creation
//!
//! One store is opened per process and all records go through the
//! deterministic codec in `serialization`.

use std::path::Path;

use crate::block::Block;
use crate::consensus::ConsensusKind;
use crate::error::{LedgerError, Result};
use crate::serialization::{deserialize_block, serialize_block};
use crate::types::ByteString;

const BLOCKS_TREE: &str = "blocks";
const CHAINSTATE_TREE: &str = "chainstate";
const VALIDATORS_TREE: &str = "validators";
const META_TREE: &str = "meta";

/// Key under the blocks tree holding the tip hash
const TIP_KEY: &[u8] = b"l";
/// Key under the meta tree holding the bound consensus kind
const CONSENSUS_KEY: &[u8] = b"consensus";

pub struct ChainStore {
    db: sled::Db,
    blocks: sled::Tree,
    chainstate: sled::Tree,
    validators: sled::Tree,
    meta: sled::Tree,
}

impl ChainStore {
    /// Open (or create) the store under `path`
    pub fn open(path: &Path) -> Result<ChainStore> {
        let db = sled::open(path)?;
        let blocks = db.open_tree(BLOCKS_TREE)?;
        let chainstate = db.open_tree(CHAINSTATE_TREE)?;
        let validators = db.open_tree(VALIDATORS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        Ok(ChainStore {
            db,
            blocks,
            chainstate,
            validators,
            meta,
        })
    }

    /// Hash of the latest committed block, if any
    pub fn tip(&self) -> Result<Option<ByteString>> {
        Ok(self.blocks.get(TIP_KEY)?.map(|v| v.to_vec()))
    }

    /// Advance the tip pointer
    pub fn set_tip(&self, hash: &[u8]) -> Result<()> {
        self.blocks.insert(TIP_KEY, hash)?;
        Ok(())
    }

    /// Store a block keyed by its hash
    pub fn put_block(&self, block: &Block) -> Result<()> {
        self.blocks.insert(&block.hash, serialize_block(block))?;
        Ok(())
    }

    /// Load a block by hash
    pub fn get_block(&self, hash: &[u8]) -> Result<Block> {
        let bytes = self
            .blocks
            .get(hash)?
            .ok_or_else(|| LedgerError::NotFound(format!("block {}", hex::encode(hash))))?;
        deserialize_block(&bytes)
    }

    /// Store pre-serialized block bytes under an explicit hash key
    pub fn put_raw_block(&self, hash: &[u8], bytes: Vec<u8>) -> Result<()> {
        self.blocks.insert(hash, bytes)?;
        Ok(())
    }

    pub fn consensus_kind(&self) -> Result<ConsensusKind> {
        let bytes = self
            .meta
            .get(CONSENSUS_KEY)?
            .ok_or_else(|| LedgerError::NotFound("consensus kind".into()))?;
        ConsensusKind::from_bytes(&bytes)
    }

    pub fn set_consensus_kind(&self, kind: ConsensusKind) -> Result<()> {
        self.meta.insert(CONSENSUS_KEY, kind.as_bytes())?;
        Ok(())
    }

    // chainstate bucket

    pub fn chainstate_get(&self, tx_id: &[u8]) -> Result<Option<ByteString>> {
        Ok(self.chainstate.get(tx_id)?.map(|v| v.to_vec()))
    }

    pub fn chainstate_put(&self, tx_id: &[u8], outputs: Vec<u8>) -> Result<()> {
        self.chainstate.insert(tx_id, outputs)?;
        Ok(())
    }

    pub fn chainstate_remove(&self, tx_id: &[u8]) -> Result<()> {
        self.chainstate.remove(tx_id)?;
        Ok(())
    }

    pub fn chainstate_clear(&self) -> Result<()> {
        self.chainstate.clear()?;
        Ok(())
    }

    /// Iterate chainstate entries in sorted key order
    pub fn chainstate_iter(
        &self,
    ) -> impl Iterator<Item = Result<(ByteString, ByteString)>> + '_ {
        self.chainstate
            .iter()
            .map(|entry| entry.map(|(k, v)| (k.to_vec(), v.to_vec())).map_err(Into::into))
    }

    // validators bucket

    pub fn validator_put(&self, key: &[u8], record: Vec<u8>) -> Result<()> {
        self.validators.insert(key, record)?;
        Ok(())
    }

    /// Iterate validator records in sorted key order
    pub fn validators_iter(
        &self,
    ) -> impl Iterator<Item = Result<(ByteString, ByteString)>> + '_ {
        self.validators
            .iter()
            .map(|entry| entry.map(|(k, v)| (k.to_vec(), v.to_vec())).map_err(Into::into))
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use crate::wallet::Wallet;

    fn open_temp() -> (tempfile::TempDir, ChainStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ChainStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_tip_round_trip() {
        let (_dir, store) = open_temp();
        assert!(store.tip().unwrap().is_none());
        store.set_tip(&[0xab; 32]).unwrap();
        assert_eq!(store.tip().unwrap().unwrap(), vec![0xab; 32]);
    }

    #[test]
    fn test_block_round_trip() {
        let (_dir, store) = open_temp();
        let wallet = Wallet::new();
        let mut block = Block::new(
            vec![Transaction::new_coinbase(wallet.public_key(), None)],
            Vec::new(),
        );
        block.hash = vec![0xcd; 32];
        store.put_block(&block).unwrap();
        assert_eq!(store.get_block(&block.hash).unwrap(), block);
    }

    #[test]
    fn test_missing_block_is_not_found() {
        let (_dir, store) = open_temp();
        assert!(matches!(
            store.get_block(&[0u8; 32]),
            Err(LedgerError::NotFound(_))
        ));
    }

    #[test]
    fn test_consensus_kind_round_trip() {
        let (_dir, store) = open_temp();
        assert!(store.consensus_kind().is_err());
        store.set_consensus_kind(ConsensusKind::Pos).unwrap();
        assert_eq!(store.consensus_kind().unwrap(), ConsensusKind::Pos);
    }

    #[test]
    fn test_chainstate_sorted_iteration() {
        let (_dir, store) = open_temp();
        store.chainstate_put(&[3u8], vec![3]).unwrap();
        store.chainstate_put(&[1u8], vec![1]).unwrap();
        store.chainstate_put(&[2u8], vec![2]).unwrap();
        let keys: Vec<_> = store
            .chainstate_iter()
            .map(|e| e.unwrap().0)
            .collect();
        assert_eq!(keys, vec![vec![1u8], vec![2u8], vec![3u8]]);
    }
}
