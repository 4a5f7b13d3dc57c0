#![allow(dead_code)]

use ledger_core::{pow::MinerConfig, Chain, Transaction};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub const FIXED_TIMESTAMP: u64 = 1_600_000_000;

pub fn fixture_tx(sender: &str, receiver: &str, amount: f64) -> Transaction {
    Transaction::with_timestamp(sender, receiver, amount, FIXED_TIMESTAMP)
}

/// Seeded batch of transactions so failures reproduce.
pub fn random_txs(seed: u64, count: usize) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            fixture_tx(
                &format!("user-{}", rng.gen_range(0..100)),
                &format!("user-{i}"),
                rng.gen_range(0.0..1_000.0),
            )
        })
        .collect()
}

/// Genesis plus `mined` blocks, each carrying a few seeded transactions.
pub fn build_chain(config: MinerConfig, mined: usize) -> Chain {
    let mut chain = Chain::new(config).expect("valid miner config");
    for i in 0..mined {
        chain
            .mine_and_append(random_txs(i as u64, 3))
            .expect("mining within attempt ceiling");
    }
    chain
}
