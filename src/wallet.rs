//! Wallet key pairs and their on-disk files
//!
//! A wallet is a P-256 key pair plus the raw public key bytes the protocol
//! carries. Files live one per address under a wallet directory; their
//! encoding is outside the consensus core and uses plain JSON with
//! hex-encoded key material.

use std::fs;
use std::path::{Path, PathBuf};

use p256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::address::{address_from_pubkey, validate_address};
use crate::error::{LedgerError, Result};
use crate::keys::{new_key_pair, raw_pubkey, sign_digest};
use crate::types::Hash;

const WALLET_FILE_EXT: &str = "wallet";

pub struct Wallet {
    signing_key: SigningKey,
    public_key: Vec<u8>,
}

/// On-disk wallet encoding
#[derive(Serialize, Deserialize)]
struct WalletFile {
    secret_key: String,
    public_key: String,
}

impl Wallet {
    /// Generate a fresh key pair
    pub fn new() -> Wallet {
        let (signing_key, public_key) = new_key_pair();
        Wallet {
            signing_key,
            public_key,
        }
    }

    /// Raw X ‖ Y public key bytes
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Address text form of this wallet's public key
    pub fn address(&self) -> String {
        address_from_pubkey(&self.public_key)
    }

    /// Sign a raw 32-byte digest
    pub fn sign_digest(&self, digest: &Hash) -> Result<Vec<u8>> {
        sign_digest(&self.signing_key, digest)
    }

    /// Persist the wallet under `dir` as `<address>.wallet`
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let file = WalletFile {
            secret_key: hex::encode(self.signing_key.to_bytes()),
            public_key: hex::encode(&self.public_key),
        };
        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        fs::write(wallet_path(dir, &self.address()), contents)?;
        Ok(())
    }

    /// Load the wallet for `address` from `dir`
    pub fn load(dir: &Path, address: &str) -> Result<Wallet> {
        if !validate_address(address) {
            return Err(LedgerError::NotFound(format!("invalid address {address}")));
        }
        let path = wallet_path(dir, address);
        if !path.exists() {
            return Err(LedgerError::NotFound(format!("wallet for {address}")));
        }

        let contents = fs::read_to_string(path)?;
        let file: WalletFile = serde_json::from_str(&contents)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let secret = hex::decode(&file.secret_key)
            .map_err(|e| LedgerError::Serialization(format!("wallet secret key: {e}")))?;
        let signing_key = SigningKey::from_slice(&secret)
            .map_err(|e| LedgerError::Serialization(format!("wallet secret key: {e}")))?;
        // The stored pubkey is advisory; re-derive from the secret.
        let public_key = raw_pubkey(signing_key.verifying_key());

        Ok(Wallet {
            signing_key,
            public_key,
        })
    }

    /// Addresses of every wallet file under `dir`
    pub fn list_addresses(dir: &Path) -> Result<Vec<String>> {
        let mut addresses = Vec::new();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(addresses),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(WALLET_FILE_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if validate_address(stem) {
                        addresses.push(stem.to_string());
                    }
                }
            }
        }
        addresses.sort();
        Ok(addresses)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Wallet::new()
    }
}

fn wallet_path(dir: &Path, address: &str) -> PathBuf {
    dir.join(format!("{address}.{WALLET_FILE_EXT}"))
}
