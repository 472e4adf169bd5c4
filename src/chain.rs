//! Chain engine
//!
//! Ties the store, the UTXO index, and the bound consensus rule together.
//! Blocks and transactions are immutable; all mutation funnels through the
//! engine, which guards the tip pointer and index coherence with a single
//! reader-writer lock. Readers concurrent with a commit observe either the
//! pre- or post-commit state, never a partial application.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::block::Block;
use crate::consensus::{Consensus, ConsensusKind, Difficulty, PosConsensus, PowConsensus};
use crate::constants::GENESIS_COINBASE_MEMO;
use crate::error::{LedgerError, Result};
use crate::store::ChainStore;
use crate::transaction::{PrevTransactions, Transaction};
use crate::types::ByteString;
use crate::utxo::UtxoIndex;
use crate::wallet::Wallet;

pub struct Blockchain {
    store: Arc<ChainStore>,
    consensus: Arc<dyn Consensus>,
    /// Present only on proof-of-stake chains; shares the consensus instance
    pos: Option<Arc<PosConsensus>>,
    kind: ConsensusKind,
    utxo: UtxoIndex,
    tip: RwLock<ByteString>,
}

impl Blockchain {
    /// Create a new chain at `data_dir` with a genesis block paying the
    /// miner. Fails if a chain already exists there.
    pub fn create(data_dir: &Path, miner: &Wallet, kind: ConsensusKind) -> Result<Blockchain> {
        if data_dir.exists() {
            return Err(LedgerError::AlreadyExists(data_dir.display().to_string()));
        }

        let store = Arc::new(ChainStore::open(data_dir)?);
        store.set_consensus_kind(kind)?;
        let (consensus, pos) = bind_consensus(kind, Arc::clone(&store))?;
        if let Some(pos) = &pos {
            crate::consensus::pos::seed_genesis_stake(pos, miner)?;
        }

        let coinbase = Transaction::new_coinbase(
            miner.public_key(),
            Some(GENESIS_COINBASE_MEMO.as_bytes().to_vec()),
        );
        let genesis = consensus.propose_block(miner, vec![coinbase], Vec::new(), &[])?;
        consensus.validate_block(&genesis, &PrevTransactions::new())?;

        store.put_block(&genesis)?;
        store.set_tip(&genesis.hash)?;
        store.flush()?;
        info!(hash = %hex::encode(&genesis.hash), ?kind, "chain created");

        let chain = Blockchain {
            utxo: UtxoIndex::new(Arc::clone(&store)),
            tip: RwLock::new(genesis.hash.clone()),
            store,
            consensus,
            pos,
            kind,
        };
        chain.utxo.reindex()?;
        Ok(chain)
    }

    /// Open the chain at `data_dir`. Fails if none exists.
    pub fn open(data_dir: &Path) -> Result<Blockchain> {
        if !data_dir.exists() {
            return Err(LedgerError::NotFound(format!(
                "no chain at {}",
                data_dir.display()
            )));
        }

        let store = Arc::new(ChainStore::open(data_dir)?);
        let tip = store
            .tip()?
            .ok_or_else(|| LedgerError::NotFound("chain tip".into()))?;
        let kind = store.consensus_kind()?;
        let (consensus, pos) = bind_consensus(kind, Arc::clone(&store))?;

        Ok(Blockchain {
            utxo: UtxoIndex::new(Arc::clone(&store)),
            tip: RwLock::new(tip),
            store,
            consensus,
            pos,
            kind,
        })
    }

    /// Append one block carrying `transactions`, produced and checked by
    /// the bound consensus. On any failure the tip and the UTXO index are
    /// left untouched.
    pub fn append(&self, transactions: Vec<Transaction>, proposer: &Wallet) -> Result<Block> {
        let mut tip = write_lock(&self.tip);
        let tip_hash = (*tip).clone();

        let mut prev_txs = PrevTransactions::new();
        for tx in &transactions {
            if tx.is_coinbase() {
                continue;
            }
            self.resolve_inputs(&tip_hash, tx, &mut prev_txs)?;
            tx.verify(&prev_txs)?;
        }

        let block = self.consensus.propose_block(
            proposer,
            transactions,
            tip_hash.clone(),
            &tip_hash,
        )?;
        self.consensus.validate_block(&block, &prev_txs)?;

        self.store.put_block(&block)?;
        self.store.set_tip(&block.hash)?;
        self.store.flush()?;
        *tip = block.hash.clone();

        self.utxo.update(&block)?;
        info!(hash = %hex::encode(&block.hash), txs = block.transactions.len(), "block committed");
        Ok(block)
    }

    /// Verify a transaction's signatures against the current chain
    pub fn verify_transaction(&self, tx: &Transaction) -> Result<()> {
        if tx.is_coinbase() {
            return Ok(());
        }
        let tip = read_lock(&self.tip).clone();
        let mut prev_txs = PrevTransactions::new();
        self.resolve_inputs(&tip, tx, &mut prev_txs)?;
        tx.verify(&prev_txs)
    }

    /// Sign a transaction's inputs with `wallet`, resolving the referenced
    /// transactions from the chain
    pub fn sign_transaction(&self, tx: &mut Transaction, wallet: &Wallet) -> Result<()> {
        let tip = read_lock(&self.tip).clone();
        let mut prev_txs = PrevTransactions::new();
        self.resolve_inputs(&tip, tx, &mut prev_txs)?;
        tx.sign(wallet, &prev_txs)
    }

    /// Find a transaction by id, scanning tip to genesis
    pub fn find_transaction(&self, id: &[u8]) -> Result<Transaction> {
        let tip = read_lock(&self.tip).clone();
        self.find_transaction_from(&tip, id)
    }

    /// Re-validate every block from the tip down against the bound
    /// consensus rule
    pub fn validate_chain(&self) -> Result<()> {
        let tip = read_lock(&self.tip).clone();
        for block in self.iterator() {
            let block = block?;
            let mut prev_txs = PrevTransactions::new();
            for tx in &block.transactions {
                if !tx.is_coinbase() {
                    self.resolve_inputs(&tip, tx, &mut prev_txs)?;
                }
            }
            self.consensus.validate_block(&block, &prev_txs)?;
        }
        Ok(())
    }

    /// Iterate blocks from the tip back to genesis
    pub fn iterator(&self) -> ChainIterator {
        ChainIterator {
            current: read_lock(&self.tip).clone(),
            store: Arc::clone(&self.store),
        }
    }

    pub fn utxo(&self) -> &UtxoIndex {
        &self.utxo
    }

    pub fn kind(&self) -> ConsensusKind {
        self.kind
    }

    /// Current difficulty context from the bound consensus
    pub fn current_difficulty(&self) -> Result<Difficulty> {
        let tip = read_lock(&self.tip).clone();
        self.consensus.current_difficulty(&tip)
    }

    /// Register validator stake; fails unless the chain is proof-of-stake
    pub fn add_stake(&self, amount: i64, wallet: &Wallet) -> Result<()> {
        match &self.pos {
            Some(pos) => pos.add_stake(amount, wallet),
            None => Err(LedgerError::InvalidStructure(
                "chain is not using proof-of-stake".into(),
            )),
        }
    }

    /// Collect the transactions referenced by `tx`'s inputs into `prev_txs`.
    /// Scans from an explicit tip so callers already holding the tip lock
    /// do not re-acquire it.
    fn resolve_inputs(
        &self,
        tip: &[u8],
        tx: &Transaction,
        prev_txs: &mut PrevTransactions,
    ) -> Result<()> {
        for input in &tx.inputs {
            if input.prev_tx_id.is_empty() {
                continue;
            }
            if prev_txs.contains_key(&input.prev_tx_id) {
                continue;
            }
            let prev = self.find_transaction_from(tip, &input.prev_tx_id)?;
            prev_txs.insert(prev.id.clone(), prev);
        }
        Ok(())
    }

    fn find_transaction_from(&self, tip: &[u8], id: &[u8]) -> Result<Transaction> {
        let iter = ChainIterator {
            current: tip.to_vec(),
            store: Arc::clone(&self.store),
        };
        for block in iter {
            let block = block?;
            for tx in block.transactions {
                if tx.id == id {
                    return Ok(tx);
                }
            }
        }
        Err(LedgerError::NotFound(format!(
            "transaction {}",
            hex::encode(id)
        )))
    }
}

fn bind_consensus(
    kind: ConsensusKind,
    store: Arc<ChainStore>,
) -> Result<(Arc<dyn Consensus>, Option<Arc<PosConsensus>>)> {
    match kind {
        ConsensusKind::Pow => Ok((Arc::new(PowConsensus::new(store)), None)),
        ConsensusKind::Pos => {
            let pos = Arc::new(PosConsensus::new(store)?);
            Ok((Arc::clone(&pos) as Arc<dyn Consensus>, Some(pos)))
        }
    }
}

/// Stateless tip-to-genesis block iterator
pub struct ChainIterator {
    current: ByteString,
    store: Arc<ChainStore>,
}

impl Iterator for ChainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_empty() {
            return None;
        }
        match self.store.get_block(&self.current) {
            Ok(block) => {
                self.current = block.prev_hash.clone();
                Some(Ok(block))
            }
            Err(e) => {
                self.current = Vec::new();
                Some(Err(e))
            }
        }
    }
}

fn read_lock(lock: &RwLock<ByteString>) -> std::sync::RwLockReadGuard<'_, ByteString> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock(lock: &RwLock<ByteString>) -> std::sync::RwLockWriteGuard<'_, ByteString> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
