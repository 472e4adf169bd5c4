//! Shared primitive types

/// 256-bit hash produced by SHA-256
pub type Hash = [u8; 32];

/// Variable-length byte string: protocol fields that may be empty
/// (a genesis block's parent hash, an unset transaction id)
pub type ByteString = Vec<u8>;

/// RIPEMD-160(SHA-256(pubkey)) digest locking an output, 20 bytes
pub type PubKeyHash = Vec<u8>;
