//! Protocol constants

/// Coinbase subsidy: new coins minted per block, paid to the producer
pub const SUBSIDY: i64 = 50;

/// Difficulty target exponent for the genesis block
pub const INITIAL_TARGET_BITS: i64 = 24;

/// Target time per block: 10 minutes
pub const TARGET_BLOCK_TIME_SECS: i64 = 600;

/// Difficulty adjustment interval: 2016 blocks
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: i64 = 2016;

/// Per-retarget clamp: the target changes by at most this factor (up or down)
pub const MAX_ADJUSTMENT_FACTOR: u64 = 4;

/// Difficulty target exponent bounds
pub const MIN_TARGET_BITS: i64 = 1;
pub const MAX_TARGET_BITS: i64 = 255;

/// Upper bound on the proof-of-work nonce search
pub const MAX_NONCE: i64 = i64::MAX;

/// Minimum stake a validator must hold for its blocks to be accepted
pub const MIN_STAKE: i64 = 100;

/// Stake granted to the chain creator under proof-of-stake
pub const GENESIS_STAKE: i64 = 1000;

/// Address version byte prepended to the public key hash
pub const ADDRESS_VERSION: u8 = 0x00;

/// Length of the double-SHA256 address checksum
pub const ADDRESS_CHECKSUM_LEN: usize = 4;

/// Random memo length for coinbase transactions created without one
pub const COINBASE_MEMO_LEN: usize = 20;

/// Memo carried by the genesis coinbase
pub const GENESIS_COINBASE_MEMO: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";
