//! Command-line surface
//!
//! Thin layer over the engine: every command maps to one engine or wallet
//! call. Failures print a short diagnostic and exit non-zero; no partial
//! state is written.

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use crate::chain::Blockchain;
use crate::config::NodeConfig;
use crate::consensus::pow::validate_proof_of_work;
use crate::consensus::ConsensusKind;
use crate::error::{LedgerError, Result};
use crate::hashing::hash_pub_key;
use crate::transaction::Transaction;
use crate::wallet::Wallet;

#[derive(Parser)]
#[command(name = "ledger-node", version, about = "Single-node UTXO ledger")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new wallet and print its address
    Createwallet,
    /// List all wallet addresses
    Listaddresses,
    /// Initialize the chain with a genesis block paying ADDRESS
    Init {
        #[arg(long)]
        address: String,
        /// Consensus rule the chain is created under
        #[arg(long, value_enum, default_value = "pow")]
        consensus: KindArg,
    },
    /// Print all blocks from tip to genesis
    Printchain,
    /// Print the balance of ADDRESS
    Getbalance {
        #[arg(long)]
        address: String,
    },
    /// Send AMOUNT of coins from FROM to TO, mining one block
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: i64,
    },
    /// Rebuild the UTXO index from a full chain scan
    Reindexutxo,
    /// Add validator stake for ADDRESS (proof-of-stake chains only)
    Stake {
        #[arg(long)]
        address: String,
        #[arg(long)]
        amount: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Pow,
    Pos,
}

impl From<KindArg> for ConsensusKind {
    fn from(kind: KindArg) -> ConsensusKind {
        match kind {
            KindArg::Pow => ConsensusKind::Pow,
            KindArg::Pos => ConsensusKind::Pos,
        }
    }
}

/// Parse arguments and run one command; `Err` maps to a non-zero exit
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = NodeConfig::from_env();

    match cli.command {
        Command::Createwallet => create_wallet(&config),
        Command::Listaddresses => list_addresses(&config),
        Command::Init { address, consensus } => init(&config, &address, consensus.into()),
        Command::Printchain => print_chain(&config),
        Command::Getbalance { address } => get_balance(&config, &address),
        Command::Send { from, to, amount } => send(&config, &from, &to, amount),
        Command::Reindexutxo => reindex_utxo(&config),
        Command::Stake { address, amount } => stake(&config, &address, amount),
    }
}

fn create_wallet(config: &NodeConfig) -> Result<()> {
    let wallet = Wallet::new();
    wallet.save(&config.wallet_dir)?;
    println!("Your new address: {}", wallet.address());
    Ok(())
}

fn list_addresses(config: &NodeConfig) -> Result<()> {
    for address in Wallet::list_addresses(&config.wallet_dir)? {
        println!("{address}");
    }
    Ok(())
}

fn init(config: &NodeConfig, address: &str, kind: ConsensusKind) -> Result<()> {
    let miner = Wallet::load(&config.wallet_dir, address)?;
    Blockchain::create(&config.data_dir, &miner, kind)?;
    println!("Chain initialized with genesis block paying {address}");
    Ok(())
}

fn print_chain(config: &NodeConfig) -> Result<()> {
    let chain = Blockchain::open(&config.data_dir)?;
    for block in chain.iterator() {
        let block = block?;
        println!("============ Block {} ============", hex::encode(&block.hash));
        println!("Prev. block: {}", hex::encode(&block.prev_hash));
        if block.validator_pubkey.is_empty() {
            let pow_ok = validate_proof_of_work(&block).is_ok();
            println!("PoW: {pow_ok}");
        } else {
            println!("Validator: {}", hex::encode(&block.validator_pubkey));
            println!("Signature: {}", hex::encode(&block.signature));
        }
        for tx in &block.transactions {
            println!("  tx {}", hex::encode(&tx.id));
        }
        println!();
    }
    Ok(())
}

fn get_balance(config: &NodeConfig, address: &str) -> Result<()> {
    let wallet = Wallet::load(&config.wallet_dir, address)?;
    let chain = Blockchain::open(&config.data_dir)?;

    let pubkey_hash = hash_pub_key(wallet.public_key());
    let balance: i64 = chain
        .utxo()
        .find_outputs(Some(&pubkey_hash))?
        .iter()
        .map(|out| out.value)
        .sum();

    println!("Balance of '{address}': {balance}");
    Ok(())
}

fn send(config: &NodeConfig, from: &str, to: &str, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidStructure(
            "amount must be positive".into(),
        ));
    }
    let from_wallet = Wallet::load(&config.wallet_dir, from)?;
    let to_wallet = Wallet::load(&config.wallet_dir, to)?;
    let chain = Blockchain::open(&config.data_dir)?;

    let mut tx = Transaction::new_utxo_transaction(
        &from_wallet,
        &hash_pub_key(to_wallet.public_key()),
        amount,
        chain.utxo(),
    )?;
    chain.sign_transaction(&mut tx, &from_wallet)?;

    let coinbase = Transaction::new_coinbase(from_wallet.public_key(), None);
    chain.append(vec![coinbase, tx], &from_wallet)?;
    println!("Success!");
    Ok(())
}

fn reindex_utxo(config: &NodeConfig) -> Result<()> {
    let chain = Blockchain::open(&config.data_dir)?;
    chain.utxo().reindex()?;
    let count = chain.utxo().count_transactions()?;
    println!("Done! There are {count} transactions in the UTXO set.");
    Ok(())
}

fn stake(config: &NodeConfig, address: &str, amount: i64) -> Result<()> {
    let wallet = Wallet::load(&config.wallet_dir, address)?;
    let chain = Blockchain::open(&config.data_dir)?;
    chain.add_stake(amount, &wallet)?;
    println!("Added stake of {amount} for validator {address}");
    Ok(())
}

/// Log and convert an error into a process exit code
pub fn exit_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            1
        }
    }
}
