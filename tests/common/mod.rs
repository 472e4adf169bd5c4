//! Shared helpers for integration tests
#![allow(dead_code)]

use std::path::PathBuf;

use ledger_core::chain::Blockchain;
use ledger_core::consensus::ConsensusKind;
use ledger_core::hashing::hash_pub_key;
use ledger_core::transaction::Transaction;
use ledger_core::wallet::Wallet;

/// Temp directory plus a chain data path inside it; the path itself must
/// not exist before `Blockchain::create`
pub struct TestDirs {
    pub root: tempfile::TempDir,
    pub data_dir: PathBuf,
}

pub fn test_dirs() -> TestDirs {
    let root = tempfile::tempdir().unwrap();
    let data_dir = root.path().join("chain");
    TestDirs { root, data_dir }
}

/// Create a proof-of-stake chain paying `miner`; stake chains keep the
/// integration suite fast and deterministic (the creator is the sole
/// validator)
pub fn create_stake_chain(dirs: &TestDirs, miner: &Wallet) -> Blockchain {
    Blockchain::create(&dirs.data_dir, miner, ConsensusKind::Pos).unwrap()
}

/// Balance of a wallet per the chain's UTXO index
pub fn balance(chain: &Blockchain, wallet: &Wallet) -> i64 {
    chain
        .utxo()
        .find_outputs(Some(&hash_pub_key(wallet.public_key())))
        .unwrap()
        .iter()
        .map(|out| out.value)
        .sum()
}

/// Build, sign, and append one block sending `amount` from `from` to `to`,
/// bundled with a fresh coinbase paying `from`
pub fn send(chain: &Blockchain, from: &Wallet, to: &Wallet, amount: i64) -> ledger_core::Result<()> {
    let mut tx = Transaction::new_utxo_transaction(
        from,
        &hash_pub_key(to.public_key()),
        amount,
        chain.utxo(),
    )?;
    chain.sign_transaction(&mut tx, from)?;
    let coinbase = Transaction::new_coinbase(from.public_key(), None);
    chain.append(vec![coinbase, tx], from)?;
    Ok(())
}
