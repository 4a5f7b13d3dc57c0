pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const POW_TARGET_DIFFICULTY: usize = 2;
pub const MAX_MINING_ATTEMPTS: u64 = 1 << 24;
/// Previous-hash value carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "";
pub const GENESIS_SENDER: &str = "Genesis";
pub const GENESIS_RECEIVER: &str = "Alice";
pub const GENESIS_AMOUNT: f64 = 100.00;
/// Prefix compared by the legacy fixed-prefix rule.
pub const LEGACY_TARGET_PREFIX: &str = "00";
