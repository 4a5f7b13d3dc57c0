use crate::{
    constants::{GENESIS_AMOUNT, GENESIS_PREVIOUS_HASH, GENESIS_RECEIVER, GENESIS_SENDER},
    error::{LedgerError, Result},
    pow::{self, MinerConfig},
    Block, Transaction,
};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Ordered block storage the chain operates on. `append` never validates;
/// integrity is checked separately by [`verify`].
pub trait ChainStore {
    fn append(&mut self, block: Block);
    fn blocks(&self) -> &[Block];
    fn blocks_mut(&mut self) -> &mut [Block];

    fn len(&self) -> usize {
        self.blocks().len()
    }

    fn is_empty(&self) -> bool {
        self.blocks().is_empty()
    }

    fn get(&self, index: usize) -> Result<&Block> {
        let len = self.len();
        self.blocks()
            .get(index)
            .ok_or(LedgerError::OutOfRange { index, len })
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Block> {
        let len = self.len();
        self.blocks_mut()
            .get_mut(index)
            .ok_or(LedgerError::OutOfRange { index, len })
    }

    /// Hash the next block must link to; the genesis sentinel when empty.
    fn latest_hash(&self) -> &str {
        self.blocks()
            .last()
            .map(|b| b.hash.as_str())
            .unwrap_or(GENESIS_PREVIOUS_HASH)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    blocks: Vec<Block>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for MemoryStore {
    fn append(&mut self, block: Block) {
        self.blocks.push(block);
    }

    fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }
}

/// First inconsistency found while walking the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChainFault {
    /// `previous_hash` of the block does not equal its predecessor's hash.
    BrokenLink { index: usize },
    /// The stored hash does not match the block contents.
    HashMismatch { index: usize },
}

impl ChainFault {
    pub fn index(&self) -> usize {
        match *self {
            Self::BrokenLink { index } | Self::HashMismatch { index } => index,
        }
    }
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BrokenLink { index } => write!(
                f,
                "block #{index} does not link to the hash of block #{}",
                index - 1
            ),
            Self::HashMismatch { index } => {
                write!(f, "block #{index} hash does not match its contents")
            }
        }
    }
}

/// Walk blocks 1..len checking linkage, then self-hash. The genesis block is
/// trusted as is.
pub fn find_fault<S: ChainStore + ?Sized>(store: &S) -> Option<ChainFault> {
    store
        .blocks()
        .windows(2)
        .enumerate()
        .find_map(|(i, pair)| {
            let (prev, block) = (&pair[0], &pair[1]);
            if block.previous_hash != prev.hash {
                Some(ChainFault::BrokenLink { index: i + 1 })
            } else if !block.has_valid_hash() {
                Some(ChainFault::HashMismatch { index: i + 1 })
            } else {
                None
            }
        })
}

pub fn verify<S: ChainStore + ?Sized>(store: &S) -> bool {
    find_fault(store).is_none()
}

/// Overwrite the transactions of block `index` with `transaction` and reseal
/// only that block. Its successor keeps pointing at the old hash.
pub fn replace<S: ChainStore + ?Sized>(
    store: &mut S,
    index: usize,
    transaction: Transaction,
) -> Result<()> {
    let block = store.get_mut(index)?;
    block.transactions = vec![transaction];
    block.hash = block.compute_hash();
    info!(index, hash = %block.hash, "block transactions replaced");
    Ok(())
}

/// Unmined genesis block paying the initial allocation.
pub fn genesis_block() -> Block {
    let allocation =
        Transaction::with_timestamp(GENESIS_SENDER, GENESIS_RECEIVER, GENESIS_AMOUNT, 0);
    Block::new(vec![allocation], 0, GENESIS_PREVIOUS_HASH, 0)
}

/// Read-only record of a block handed to renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockView<'a> {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: &'a [Transaction],
    pub nonce: u64,
    pub previous_hash: &'a str,
    pub hash: &'a str,
}

impl<'a> From<&'a Block> for BlockView<'a> {
    fn from(block: &'a Block) -> Self {
        Self {
            index: block.index,
            timestamp: block.timestamp,
            transactions: &block.transactions,
            nonce: block.nonce,
            previous_hash: &block.previous_hash,
            hash: &block.hash,
        }
    }
}

/// A single ledger: its blocks plus the mining rules used to extend it.
#[derive(Clone, Debug)]
pub struct Chain<S: ChainStore = MemoryStore> {
    store: S,
    config: MinerConfig,
}

impl Chain<MemoryStore> {
    /// In-memory chain seeded with [`genesis_block`].
    pub fn new(config: MinerConfig) -> Result<Self> {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl<S: ChainStore> Chain<S> {
    pub fn with_store(store: S, config: MinerConfig) -> Result<Self> {
        config.validate()?;
        let mut chain = Self { store, config };
        chain.ensure_genesis();
        Ok(chain)
    }

    /// Ensure a genesis block exists. Idempotent.
    pub fn ensure_genesis(&mut self) {
        if self.store.is_empty() {
            let genesis = genesis_block();
            info!(hash = %genesis.hash, "genesis block added");
            self.store.append(genesis);
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn latest_hash(&self) -> &str {
        self.store.latest_hash()
    }

    pub fn get(&self, index: usize) -> Result<&Block> {
        self.store.get(index)
    }

    pub fn add_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: f64,
    ) -> Result<Transaction> {
        Transaction::checked(sender, receiver, amount)
    }

    /// Mine a block over `transactions` linked to the current tip and append it.
    /// Nothing is appended if mining fails.
    pub fn mine_and_append(&mut self, transactions: Vec<Transaction>) -> Result<&Block> {
        let index = self.store.len();
        let block = pow::mine(
            transactions,
            self.store.latest_hash(),
            index as u64,
            &self.config,
        )?;
        self.store.append(block);
        self.store.get(index)
    }

    pub fn render(&self) -> Vec<BlockView<'_>> {
        self.store.blocks().iter().map(BlockView::from).collect()
    }

    pub fn find_fault(&self) -> Option<ChainFault> {
        find_fault(&self.store)
    }

    pub fn verify(&self) -> bool {
        match self.find_fault() {
            Some(fault) => {
                warn!(%fault, "chain verification failed");
                false
            }
            None => true,
        }
    }

    pub fn mutate(&mut self, index: usize, transaction: Transaction) -> Result<()> {
        replace(&mut self.store, index, transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(sender: &str, receiver: &str, amount: f64) -> Transaction {
        Transaction::with_timestamp(sender, receiver, amount, 1_600_000_000)
    }

    fn chain_with(blocks: usize) -> Chain {
        let mut chain = Chain::new(MinerConfig::default()).unwrap();
        for i in 1..blocks {
            chain
                .mine_and_append(vec![tx("Alice", "Bob", i as f64)])
                .unwrap();
        }
        chain
    }

    #[test]
    fn genesis_block_example() {
        let genesis = genesis_block();
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.transactions.len(), 1);
        assert_eq!(genesis.transactions[0].sender, "Genesis");
        assert_eq!(genesis.transactions[0].receiver, "Alice");
        assert_eq!(genesis.transactions[0].amount, 100.0);
        assert!(genesis.has_valid_hash());
    }

    #[test]
    fn new_chain_starts_at_genesis() {
        let chain = chain_with(1);
        assert_eq!(chain.len(), 1);
        assert!(chain.get(0).unwrap().is_genesis());
        assert_eq!(chain.latest_hash(), chain.get(0).unwrap().hash);
        assert!(chain.verify());
    }

    #[test]
    fn ensure_genesis_is_idempotent() {
        let mut chain = chain_with(1);
        let hash = chain.latest_hash().to_string();
        chain.ensure_genesis();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.latest_hash(), hash);
    }

    #[test]
    fn empty_store_edges() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.latest_hash(), GENESIS_PREVIOUS_HASH);
        assert!(matches!(
            store.get(0),
            Err(LedgerError::OutOfRange { index: 0, len: 0 })
        ));
        assert!(verify(&store));
    }

    #[test]
    fn append_does_not_validate() {
        let mut store = MemoryStore::new();
        store.append(genesis_block());
        store.append(Block::with_timestamp(vec![], 0, "bogus", 1, 0));
        assert_eq!(store.len(), 2);
        assert_eq!(
            find_fault(&store),
            Some(ChainFault::BrokenLink { index: 1 })
        );
    }

    #[test]
    fn mined_blocks_link_to_tip() {
        let chain = chain_with(4);
        assert_eq!(chain.len(), 4);
        for i in 1..chain.len() {
            let block = chain.get(i).unwrap();
            assert_eq!(block.index, i as u64);
            assert_eq!(block.previous_hash, chain.get(i - 1).unwrap().hash);
            assert!(block.hash.starts_with("00"));
        }
        assert_eq!(chain.latest_hash(), chain.get(3).unwrap().hash);
    }

    #[test]
    fn verify_is_sound_and_idempotent() {
        let chain = chain_with(5);
        assert!(chain.verify());
        assert!(chain.verify());
        assert_eq!(chain.find_fault(), None);
    }

    #[test]
    fn mutate_middle_block_is_detected() {
        let mut chain = chain_with(3);
        let old_hash = chain.get(1).unwrap().hash.clone();
        chain.mutate(1, tx("Mallory", "Mallory", 1_000.0)).unwrap();

        let mutated = chain.get(1).unwrap();
        assert_ne!(mutated.hash, old_hash);
        assert!(mutated.has_valid_hash());
        assert_eq!(chain.get(2).unwrap().previous_hash, old_hash);

        assert!(!chain.verify());
        assert_eq!(
            chain.find_fault(),
            Some(ChainFault::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn mutate_last_block_goes_unnoticed() {
        let mut chain = chain_with(3);
        chain.mutate(2, tx("Mallory", "Mallory", 1_000.0)).unwrap();
        assert!(chain.verify());
    }

    #[test]
    fn mutate_out_of_range_is_signalled() {
        let mut chain = chain_with(2);
        let before: Vec<Block> = chain.store().blocks().to_vec();
        let err = chain.mutate(2, tx("Eve", "Eve", 1.0)).unwrap_err();
        assert!(matches!(err, LedgerError::OutOfRange { index: 2, len: 2 }));
        assert_eq!(chain.store().blocks(), before.as_slice());
    }

    #[test]
    fn raw_field_edit_is_a_hash_mismatch() {
        let mut chain = chain_with(3);
        if let Ok(block) = chain.store.get_mut(2) {
            block.nonce += 1;
        }
        assert_eq!(
            chain.find_fault(),
            Some(ChainFault::HashMismatch { index: 2 })
        );
        assert_eq!(chain.find_fault().map(|f| f.index()), Some(2));
    }

    #[test]
    fn fault_display() {
        assert_eq!(
            ChainFault::BrokenLink { index: 2 }.to_string(),
            "block #2 does not link to the hash of block #1"
        );
        assert_eq!(
            ChainFault::HashMismatch { index: 4 }.to_string(),
            "block #4 hash does not match its contents"
        );
    }

    #[test]
    fn failed_mining_appends_nothing() {
        let config = MinerConfig {
            difficulty: 64,
            max_attempts: 100,
            ..MinerConfig::default()
        };
        let mut chain = Chain::new(config).unwrap();
        assert!(chain.mine_and_append(vec![tx("A", "B", 1.0)]).is_err());
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = MinerConfig {
            difficulty: 65,
            ..MinerConfig::default()
        };
        assert!(matches!(
            Chain::new(config),
            Err(LedgerError::InvalidDifficulty { .. })
        ));
    }

    #[test]
    fn render_mirrors_blocks() {
        let chain = chain_with(2);
        let views = chain.render();
        assert_eq!(views.len(), 2);
        let block = chain.get(1).unwrap();
        assert_eq!(views[1].index, 1);
        assert_eq!(views[1].hash, block.hash);
        assert_eq!(views[1].previous_hash, chain.get(0).unwrap().hash);
        assert_eq!(views[1].nonce, block.nonce);
        assert_eq!(views[1].transactions, block.transactions.as_slice());
    }

    #[test]
    fn add_transaction_is_hardened() {
        let chain = chain_with(1);
        let tx = chain.add_transaction("Alice", "Bob", 10.0).unwrap();
        assert_eq!(tx.amount, 10.0);
        assert!(chain.add_transaction("", "Bob", 10.0).is_err());
        assert!(chain.add_transaction("Alice", "Bob", -1.0).is_err());
    }
}
