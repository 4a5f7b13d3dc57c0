use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod constants;
pub mod error;
pub mod mine;

pub use chain::{BlockView, Chain, ChainFault, ChainStore, MemoryStore};
pub use error::{LedgerError, Result};

/// Current wall-clock time in Unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    pub timestamp: u64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: f64) -> Self {
        Self::with_timestamp(sender, receiver, amount, unix_now())
    }

    pub fn with_timestamp(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        timestamp: u64,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
        }
    }

    /// Like [`Transaction::new`], but rejects blank parties and amounts that are
    /// negative or not finite.
    pub fn checked(sender: &str, receiver: &str, amount: f64) -> Result<Self> {
        let (sender, receiver) = (sender.trim(), receiver.trim());
        if sender.is_empty() {
            return Err(LedgerError::MalformedInput("sender must not be empty".into()));
        }
        if receiver.is_empty() {
            return Err(LedgerError::MalformedInput(
                "receiver must not be empty".into(),
            ));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::MalformedInput(format!(
                "amount must be a non-negative number, got {amount}"
            )));
        }
        Ok(Self::new(sender, receiver, amount))
    }
}

/// SHA-256 over the block fields, hex encoded.
///
/// The preimage is the plain concatenation of index, timestamp, previous hash,
/// then sender, receiver, amount (two decimals) and timestamp of every
/// transaction in order, and finally the nonce.
pub fn calculate_hash(
    index: u64,
    timestamp: u64,
    previous_hash: &str,
    transactions: &[Transaction],
    nonce: u64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index.to_string());
    hasher.update(timestamp.to_string());
    hasher.update(previous_hash);
    for tx in transactions {
        hasher.update(&tx.sender);
        hasher.update(&tx.receiver);
        hasher.update(format!("{:.2}", tx.amount));
        hasher.update(tx.timestamp.to_string());
    }
    hasher.update(nonce.to_string());
    hex::encode(hasher.finalize())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    /// Stamp the current time and seal the block with its own hash.
    pub fn new(
        transactions: Vec<Transaction>,
        nonce: u64,
        previous_hash: impl Into<String>,
        index: u64,
    ) -> Self {
        Self::with_timestamp(transactions, nonce, previous_hash, index, unix_now())
    }

    pub fn with_timestamp(
        transactions: Vec<Transaction>,
        nonce: u64,
        previous_hash: impl Into<String>,
        index: u64,
        timestamp: u64,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            nonce,
            previous_hash: previous_hash.into(),
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    pub fn compute_hash(&self) -> String {
        calculate_hash(
            self.index,
            self.timestamp,
            &self.previous_hash,
            &self.transactions,
            self.nonce,
        )
    }

    /// True when the stored hash still matches the block contents.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == constants::GENESIS_PREVIOUS_HASH
    }
}

pub mod pow {
    use super::{Block, Transaction};
    use crate::constants::{
        HASH_HEX_SIZE, LEGACY_TARGET_PREFIX, MAX_MINING_ATTEMPTS, POW_TARGET_DIFFICULTY,
    };
    use crate::error::{LedgerError, Result};
    use serde::{Deserialize, Serialize};
    use tracing::{debug, info};

    /// How a digest is compared against the difficulty.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub enum TargetRule {
        /// The first `difficulty` hex characters must all be `'0'`.
        #[default]
        LeadingZeros,
        /// The first `difficulty` characters must equal the literal `"00"`.
        /// Same as `LeadingZeros` at difficulty 2, unsatisfiable otherwise.
        LegacyFixedPrefix,
    }

    impl TargetRule {
        pub fn is_satisfied(self, hash: &str, difficulty: usize) -> bool {
            match self {
                Self::LeadingZeros => {
                    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
                }
                Self::LegacyFixedPrefix => hash.get(..difficulty) == Some(LEGACY_TARGET_PREFIX),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MinerConfig {
        pub difficulty: usize,
        pub rule: TargetRule,
        /// Upper bound on candidate nonces tried per block.
        pub max_attempts: u64,
        /// Threads used for the nonce search; 0 or 1 searches on the caller's thread.
        pub workers: usize,
    }

    impl Default for MinerConfig {
        fn default() -> Self {
            Self {
                difficulty: POW_TARGET_DIFFICULTY,
                rule: TargetRule::default(),
                max_attempts: MAX_MINING_ATTEMPTS,
                workers: 1,
            }
        }
    }

    impl MinerConfig {
        pub fn validate(&self) -> Result<()> {
            if self.difficulty > HASH_HEX_SIZE {
                return Err(LedgerError::InvalidDifficulty {
                    difficulty: self.difficulty,
                    max: HASH_HEX_SIZE,
                });
            }
            Ok(())
        }

        pub fn meets_target(&self, hash: &str) -> bool {
            self.rule.is_satisfied(hash, self.difficulty)
        }

        /// Prefix a winning digest starts with, for display.
        pub fn target_prefix(&self) -> String {
            match self.rule {
                TargetRule::LeadingZeros => "0".repeat(self.difficulty),
                TargetRule::LegacyFixedPrefix => LEGACY_TARGET_PREFIX.to_string(),
            }
        }
    }

    /// Build a block for `index` on top of `previous_hash` and search for a
    /// nonce that satisfies `config`.
    pub fn mine(
        transactions: Vec<Transaction>,
        previous_hash: &str,
        index: u64,
        config: &MinerConfig,
    ) -> Result<Block> {
        let template = Block::new(transactions, 0, previous_hash, index);
        debug!(
            index,
            difficulty = config.difficulty,
            workers = config.workers,
            "mining round started"
        );
        if config.workers > 1 {
            crate::mine::mine_block_parallel(template, config)
        } else {
            mine_block(template, config)
        }
    }

    /// Mine the block by trying nonces 0, 1, 2, ... on the current thread until
    /// the hash meets the target or `config.max_attempts` is reached.
    pub fn mine_block(mut block: Block, config: &MinerConfig) -> Result<Block> {
        config.validate()?;
        for nonce in 0..config.max_attempts {
            block.nonce = nonce;
            block.hash = block.compute_hash();
            if config.meets_target(&block.hash) {
                info!(
                    "Mined block {} with nonce {} and hash {}",
                    block.index, block.nonce, block.hash
                );
                return Ok(block);
            }
        }
        Err(LedgerError::MiningExhausted {
            attempts: config.max_attempts,
        })
    }
}
