//! Proof-of-work consensus
//!
//! A block is valid when the SHA-256 of its proof-of-work header preimage,
//! read as a 256-bit big-endian integer, is below `1 << (256 − bits)`.
//! Mining searches the nonce space upward from zero. The target exponent
//! retargets every 2016 blocks by observed timing, clamped to a factor of
//! four per period.

use std::sync::Arc;

use tracing::{debug, info};

use crate::block::Block;
use crate::constants::{
    DIFFICULTY_ADJUSTMENT_INTERVAL, INITIAL_TARGET_BITS, MAX_ADJUSTMENT_FACTOR, MAX_NONCE,
    MAX_TARGET_BITS, MIN_TARGET_BITS, TARGET_BLOCK_TIME_SECS,
};
use crate::error::{LedgerError, Result};
use crate::hashing::sha256;
use crate::store::ChainStore;
use crate::transaction::{PrevTransactions, Transaction};
use crate::types::ByteString;
use crate::wallet::Wallet;

use super::{Consensus, Difficulty};

pub struct PowConsensus {
    store: Arc<ChainStore>,
}

impl PowConsensus {
    pub fn new(store: Arc<ChainStore>) -> PowConsensus {
        PowConsensus { store }
    }

    /// Target exponent for a block extending `tip`.
    ///
    /// Genesis (no tip) starts at the initial exponent. At every
    /// 2016-block boundary the target rescales by the wall-clock span of
    /// the ending interval, clamped to [old/4, old×4]; between boundaries
    /// the tip's exponent carries forward.
    fn adjusted_target_bits(&self, tip: &[u8]) -> Result<i64> {
        if tip.is_empty() {
            return Ok(INITIAL_TARGET_BITS);
        }

        let tip_block = self.store.get_block(tip)?;
        if tip_block.is_genesis() {
            return Ok(tip_block.bits);
        }

        let height = self.chain_height(tip)?;
        if height % DIFFICULTY_ADJUSTMENT_INTERVAL != 0 {
            return Ok(tip_block.bits);
        }

        // Walk back to the first block of the ending interval.
        let mut first = tip_block.clone();
        for _ in 0..DIFFICULTY_ADJUSTMENT_INTERVAL - 1 {
            if first.is_genesis() {
                break;
            }
            first = self.store.get_block(&first.prev_hash)?;
        }

        let actual_span = (tip_block.timestamp - first.timestamp).max(0) as u64;
        let expected_span =
            (DIFFICULTY_ADJUSTMENT_INTERVAL * TARGET_BLOCK_TIME_SECS) as u64;

        let old_target = target_from_bits(tip_block.bits)?;
        let scaled = old_target
            .checked_mul_u64(actual_span)
            .map(|t| t.div_u64(expected_span));

        let floor = old_target.div_u64(MAX_ADJUSTMENT_FACTOR);
        let ceiling = old_target.checked_mul_u64(MAX_ADJUSTMENT_FACTOR);
        let new_target = match (scaled, ceiling) {
            (Some(t), Some(c)) => {
                if t > c {
                    c
                } else if t < floor {
                    floor
                } else {
                    t
                }
            }
            // Multiplication overflowed 256 bits; the clamp wins either way.
            (None, Some(c)) => c,
            (_, None) => U256::max_value(),
        };

        let new_bits = (256 - new_target.bit_length() as i64)
            .clamp(MIN_TARGET_BITS, MAX_TARGET_BITS);
        info!(
            old_bits = tip_block.bits,
            new_bits, actual_span, expected_span, "difficulty retarget"
        );
        Ok(new_bits)
    }

    /// Number of blocks from `tip` down to genesis, inclusive
    fn chain_height(&self, tip: &[u8]) -> Result<i64> {
        let mut height = 0i64;
        let mut current = tip.to_vec();
        loop {
            let block = self.store.get_block(&current)?;
            height += 1;
            if block.is_genesis() {
                break;
            }
            current = block.prev_hash;
        }
        Ok(height)
    }
}

impl Consensus for PowConsensus {
    fn propose_block(
        &self,
        _proposer: &Wallet,
        transactions: Vec<Transaction>,
        prev_hash: ByteString,
        tip: &[u8],
    ) -> Result<Block> {
        let bits = self.adjusted_target_bits(tip)?;
        let mut block = Block::new(transactions, prev_hash);
        mine(&mut block, bits)?;
        Ok(block)
    }

    fn validate_block(&self, block: &Block, prev_txs: &PrevTransactions) -> Result<()> {
        block.validate_structural(prev_txs)?;
        validate_proof_of_work(block)
    }

    fn current_difficulty(&self, tip: &[u8]) -> Result<Difficulty> {
        Ok(Difficulty::Bits(self.adjusted_target_bits(tip)?))
    }
}

/// Search the nonce space until the header hash drops below the target;
/// records the found nonce, the exponent used, and the hash
fn mine(block: &mut Block, bits: i64) -> Result<()> {
    let target = target_from_bits(bits)?;
    debug!(bits, "mining block");

    let mut nonce = 0i64;
    loop {
        let hash = sha256(&block.prepare_header_pow(nonce, bits));
        if U256::from_be_bytes(&hash) < target {
            block.nonce = nonce;
            block.bits = bits;
            block.hash = hash.to_vec();
            debug!(nonce, hash = %hex::encode(hash), "block mined");
            return Ok(());
        }
        if nonce == MAX_NONCE {
            return Err(LedgerError::InvalidProofOfWork(
                "nonce space exhausted".into(),
            ));
        }
        nonce += 1;
    }
}

/// Re-derive the target from the block's own exponent and re-check the
/// hash inequality
pub fn validate_proof_of_work(block: &Block) -> Result<()> {
    let target = target_from_bits(block.bits)?;
    let hash = sha256(&block.prepare_header_pow(block.nonce, block.bits));
    if U256::from_be_bytes(&hash) < target {
        Ok(())
    } else {
        Err(LedgerError::InvalidProofOfWork(hex::encode(&block.hash)))
    }
}

/// Expand a target exponent: `1 << (256 − bits)`
fn target_from_bits(bits: i64) -> Result<U256> {
    if !(MIN_TARGET_BITS..=MAX_TARGET_BITS).contains(&bits) {
        return Err(LedgerError::InvalidProofOfWork(format!(
            "target bits {bits} out of range"
        )));
    }
    Ok(U256::one().shl((256 - bits) as u32))
}

/// Fixed-width 256-bit unsigned integer for target arithmetic.
/// Words are little-endian: `0[0]` holds the least significant 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct U256([u64; 4]);

impl U256 {
    fn zero() -> U256 {
        U256([0; 4])
    }

    fn one() -> U256 {
        U256([1, 0, 0, 0])
    }

    fn max_value() -> U256 {
        U256([u64::MAX; 4])
    }

    /// Interpret a 32-byte hash as a big-endian integer
    fn from_be_bytes(bytes: &[u8; 32]) -> U256 {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            let start = (3 - i) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *word = u64::from_be_bytes(chunk);
        }
        U256(words)
    }

    fn shl(&self, shift: u32) -> U256 {
        if shift >= 256 {
            return U256::zero();
        }
        let mut result = U256::zero();
        let word_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..4 {
            if i + word_shift < 4 {
                result.0[i + word_shift] |= self.0[i] << bit_shift;
                if bit_shift > 0 && i + word_shift + 1 < 4 {
                    result.0[i + word_shift + 1] |= self.0[i] >> (64 - bit_shift);
                }
            }
        }
        result
    }

    /// Multiply by a u64; None on overflow past 256 bits
    fn checked_mul_u64(&self, rhs: u64) -> Option<U256> {
        let mut carry = 0u128;
        let mut result = U256::zero();
        for i in 0..4 {
            let product = (self.0[i] as u128) * (rhs as u128) + carry;
            result.0[i] = product as u64;
            carry = product >> 64;
        }
        if carry > 0 {
            None
        } else {
            Some(result)
        }
    }

    /// Integer division by a non-zero u64
    fn div_u64(&self, rhs: u64) -> U256 {
        if rhs == 0 {
            return U256::max_value();
        }
        let mut remainder = 0u128;
        let mut result = U256::zero();
        for i in (0..4).rev() {
            let dividend = (remainder << 64) | (self.0[i] as u128);
            result.0[i] = (dividend / (rhs as u128)) as u64;
            remainder = dividend % (rhs as u128);
        }
        result
    }

    /// Number of significant bits; 0 for zero
    fn bit_length(&self) -> u32 {
        for (i, &word) in self.0.iter().enumerate().rev() {
            if word != 0 {
                return i as u32 * 64 + (64 - word.leading_zeros());
            }
        }
        0
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
            match a.cmp(b) {
                std::cmp::Ordering::Equal => continue,
                ordering => return ordering,
            }
        }
        std::cmp::Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use crate::wallet::Wallet;

    fn easy_block() -> Block {
        let wallet = Wallet::new();
        Block::new(
            vec![Transaction::new_coinbase(wallet.public_key(), None)],
            Vec::new(),
        )
    }

    #[test]
    fn test_mine_and_validate_low_difficulty() {
        let mut block = easy_block();
        // A tiny exponent keeps the search instant in tests.
        mine(&mut block, 8).unwrap();
        assert_eq!(block.bits, 8);
        validate_proof_of_work(&block).unwrap();
    }

    #[test]
    fn test_validate_rejects_tampered_nonce() {
        let mut block = easy_block();
        mine(&mut block, 8).unwrap();
        block.nonce += 1;
        // One nonce over the found one almost surely misses the target.
        if sha256(&block.prepare_header_pow(block.nonce, block.bits))[0] != 0 {
            assert!(validate_proof_of_work(&block).is_err());
        }
    }

    #[test]
    fn test_target_bits_bounds() {
        assert!(target_from_bits(0).is_err());
        assert!(target_from_bits(256).is_err());
        assert!(target_from_bits(1).is_ok());
        assert!(target_from_bits(255).is_ok());
    }

    #[test]
    fn test_target_expansion() {
        // bits = 255 leaves a target of 2.
        assert_eq!(target_from_bits(255).unwrap(), U256([2, 0, 0, 0]));
        // bits = 192 places the one exactly at the start of the top word.
        assert_eq!(target_from_bits(192).unwrap(), U256([0, 1, 0, 0]));
    }

    #[test]
    fn test_u256_ordering_uses_high_words() {
        let small = U256([u64::MAX, 0, 0, 0]);
        let large = U256([0, 1, 0, 0]);
        assert!(small < large);
    }

    #[test]
    fn test_u256_from_be_bytes() {
        let mut bytes = [0u8; 32];
        bytes[31] = 7;
        assert_eq!(U256::from_be_bytes(&bytes), U256([7, 0, 0, 0]));
        let mut high = [0u8; 32];
        high[0] = 1;
        assert_eq!(high_word(U256::from_be_bytes(&high)), 1u64 << 56);
    }

    fn high_word(value: U256) -> u64 {
        value.0[3]
    }

    #[test]
    fn test_u256_mul_div_round_trip() {
        let target = target_from_bits(32).unwrap();
        let scaled = target.checked_mul_u64(1209600).unwrap().div_u64(1209600);
        assert_eq!(scaled, target);
    }

    #[test]
    fn test_u256_mul_overflow_detected() {
        assert!(U256::max_value().checked_mul_u64(2).is_none());
        assert!(U256::one().checked_mul_u64(u64::MAX).is_some());
    }

    #[test]
    fn test_bit_length() {
        assert_eq!(U256::zero().bit_length(), 0);
        assert_eq!(U256::one().bit_length(), 1);
        assert_eq!(U256([0, 1, 0, 0]).bit_length(), 65);
        assert_eq!(U256::max_value().bit_length(), 256);
    }
}
