use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ledger_core::hashing::{hash_pub_key, sha256};
use ledger_core::keys::{new_key_pair, sign_digest, verify_digest};
use ledger_core::merkle::MerkleTree;
use ledger_core::transaction::Transaction;
use ledger_core::wallet::Wallet;

fn benchmark_sha256(c: &mut Criterion) {
    let data = vec![0u8; 1024];
    c.bench_function("sha256_1kb", |b| b.iter(|| black_box(sha256(black_box(&data)))));
}

fn benchmark_hash_pub_key(c: &mut Criterion) {
    let pubkey = vec![0x42u8; 64];
    c.bench_function("hash_pub_key", |b| {
        b.iter(|| black_box(hash_pub_key(black_box(&pubkey))))
    });
}

fn benchmark_transaction_id(c: &mut Criterion) {
    let wallet = Wallet::new();
    let tx = Transaction::new_coinbase(wallet.public_key(), Some(b"bench".to_vec()));
    c.bench_function("transaction_id", |b| b.iter(|| black_box(tx.hash())));
}

fn benchmark_merkle_build(c: &mut Criterion) {
    let data: Vec<Vec<u8>> = (0u32..64).map(|i| i.to_be_bytes().to_vec()).collect();
    c.bench_function("merkle_build_64", |b| {
        b.iter(|| black_box(MerkleTree::build(black_box(&data)).unwrap().root()))
    });
}

fn benchmark_sign_verify(c: &mut Criterion) {
    let (key, pubkey) = new_key_pair();
    let digest = sha256(b"bench digest");
    let signature = sign_digest(&key, &digest).unwrap();

    c.bench_function("ecdsa_sign", |b| {
        b.iter(|| black_box(sign_digest(&key, &digest).unwrap()))
    });
    c.bench_function("ecdsa_verify", |b| {
        b.iter(|| black_box(verify_digest(&pubkey, &digest, &signature)))
    });
}

criterion_group!(
    benches,
    benchmark_sha256,
    benchmark_hash_pub_key,
    benchmark_transaction_id,
    benchmark_merkle_build,
    benchmark_sign_verify
);
criterion_main!(benches);
