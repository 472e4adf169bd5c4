//! End-to-end chain scenarios: genesis, spending, failure atomicity,
//! tamper detection, and UTXO index consistency

mod common;

use common::{balance, create_stake_chain, send, test_dirs};
use ledger_core::chain::Blockchain;
use ledger_core::consensus::ConsensusKind;
use ledger_core::constants::SUBSIDY;
use ledger_core::error::LedgerError;
use ledger_core::serialization::serialize_block;
use ledger_core::store::ChainStore;
use ledger_core::wallet::Wallet;

#[test]
fn test_genesis_pays_the_miner() {
    let dirs = test_dirs();
    let miner = Wallet::new();
    let chain = create_stake_chain(&dirs, &miner);

    assert_eq!(balance(&chain, &miner), SUBSIDY);

    let blocks: Vec<_> = chain.iterator().map(|b| b.unwrap()).collect();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].is_genesis());
}

#[test]
fn test_create_twice_fails() {
    let dirs = test_dirs();
    let miner = Wallet::new();
    let _chain = create_stake_chain(&dirs, &miner);
    assert!(matches!(
        Blockchain::create(&dirs.data_dir, &miner, ConsensusKind::Pos),
        Err(LedgerError::AlreadyExists(_))
    ));
}

#[test]
fn test_open_without_chain_fails() {
    let dirs = test_dirs();
    assert!(matches!(
        Blockchain::open(&dirs.data_dir),
        Err(LedgerError::NotFound(_))
    ));
}

#[test]
fn test_send_updates_balances() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = create_stake_chain(&dirs, &alice);

    send(&chain, &alice, &bob, 10).unwrap();

    // Alice: 40 change + 50 from the bundled coinbase; Bob: the payment.
    assert_eq!(balance(&chain, &bob), 10);
    assert_eq!(balance(&chain, &alice), SUBSIDY - 10 + SUBSIDY);

    let blocks: Vec<_> = chain.iterator().map(|b| b.unwrap()).collect();
    assert_eq!(blocks.len(), 2);
}

#[test]
fn test_send_chain_of_spends() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = create_stake_chain(&dirs, &alice);

    send(&chain, &alice, &bob, 10).unwrap();
    send(&chain, &alice, &bob, 25).unwrap();

    assert_eq!(balance(&chain, &bob), 35);
    // Alice minted three coinbases (genesis + two sends) and paid 35.
    assert_eq!(balance(&chain, &alice), 3 * SUBSIDY - 35);
}

#[test]
fn test_insufficient_funds_leaves_state_untouched() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = create_stake_chain(&dirs, &alice);

    let tip_before: Vec<_> = chain.iterator().map(|b| b.unwrap().hash).collect();
    let result = send(&chain, &alice, &bob, 1000);
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientFunds {
            available: 50,
            required: 1000
        })
    ));

    let tip_after: Vec<_> = chain.iterator().map(|b| b.unwrap().hash).collect();
    assert_eq!(tip_before, tip_after);
    assert_eq!(balance(&chain, &alice), SUBSIDY);
    assert_eq!(balance(&chain, &bob), 0);
}

#[test]
fn test_every_block_links_to_a_stored_parent() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = create_stake_chain(&dirs, &alice);
    send(&chain, &alice, &bob, 5).unwrap();
    send(&chain, &alice, &bob, 7).unwrap();

    let blocks: Vec<_> = chain.iterator().map(|b| b.unwrap()).collect();
    assert_eq!(blocks.len(), 3);
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].prev_hash, pair[1].hash);
    }
    assert!(blocks.last().unwrap().is_genesis());
}

#[test]
fn test_reindex_matches_incremental_updates_byte_for_byte() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = create_stake_chain(&dirs, &alice);
    send(&chain, &alice, &bob, 10).unwrap();
    send(&chain, &alice, &bob, 60).unwrap();

    let incremental = chain.utxo().raw_entries().unwrap();
    chain.utxo().reindex().unwrap();
    let rebuilt = chain.utxo().raw_entries().unwrap();

    assert_eq!(incremental, rebuilt);
}

#[test]
fn test_reopen_preserves_state() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    {
        let chain = create_stake_chain(&dirs, &alice);
        send(&chain, &alice, &bob, 10).unwrap();
    }

    let chain = Blockchain::open(&dirs.data_dir).unwrap();
    assert_eq!(chain.kind(), ConsensusKind::Pos);
    assert_eq!(balance(&chain, &bob), 10);
    chain.validate_chain().unwrap();
}

#[test]
fn test_tampered_block_fails_validation_on_reopen() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    {
        let chain = create_stake_chain(&dirs, &alice);
        send(&chain, &alice, &bob, 10).unwrap();
        chain.validate_chain().unwrap();
    }

    // Flip one byte of the tip block's coinbase id in place in the store.
    {
        let store = ChainStore::open(&dirs.data_dir).unwrap();
        let tip = store.tip().unwrap().unwrap();
        let mut tampered = store.get_block(&tip).unwrap();
        tampered.transactions[0].id[0] ^= 0x01;
        store
            .put_raw_block(&tip, serialize_block(&tampered))
            .unwrap();
        store.flush().unwrap();
    }

    let chain = Blockchain::open(&dirs.data_dir).unwrap();
    let result = chain.validate_chain();
    assert!(matches!(
        result,
        Err(LedgerError::InvalidSignature(_)) | Err(LedgerError::InvalidStructure(_))
    ));
}

#[test]
fn test_engine_verifies_and_rejects_transactions() {
    use ledger_core::hashing::hash_pub_key;
    use ledger_core::transaction::Transaction;

    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = create_stake_chain(&dirs, &alice);

    let mut tx = Transaction::new_utxo_transaction(
        &alice,
        &hash_pub_key(bob.public_key()),
        10,
        chain.utxo(),
    )
    .unwrap();
    chain.sign_transaction(&mut tx, &alice).unwrap();
    chain.verify_transaction(&tx).unwrap();

    // Redirecting the payment after signing invalidates every input.
    tx.outputs[0].pubkey_hash = hash_pub_key(alice.public_key());
    assert!(chain.verify_transaction(&tx).is_err());
}

#[test]
fn test_find_transaction_walks_the_chain() {
    let dirs = test_dirs();
    let alice = Wallet::new();
    let bob = Wallet::new();
    let chain = create_stake_chain(&dirs, &alice);
    send(&chain, &alice, &bob, 10).unwrap();

    let genesis_tx = chain
        .iterator()
        .map(|b| b.unwrap())
        .find(|b| b.is_genesis())
        .unwrap()
        .transactions[0]
        .clone();
    assert_eq!(
        chain.find_transaction(&genesis_tx.id).unwrap(),
        genesis_tx
    );
    assert!(matches!(
        chain.find_transaction(&[0u8; 32]),
        Err(LedgerError::NotFound(_))
    ));
}
