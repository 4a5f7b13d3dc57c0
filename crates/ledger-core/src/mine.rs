use crate::{
    calculate_hash,
    error::{LedgerError, Result},
    pow::MinerConfig,
    Block,
};
use rayon::prelude::*;
use tracing::info;

/// Mines a block by searching nonces in parallel on `config.workers` threads.
///
/// Only the nonce of `template` varies; its timestamp and transactions are
/// fixed for the whole round. The lowest satisfying nonce wins, so the result
/// is the same block the sequential search would find. Returns
/// `MiningExhausted` if no nonce below `config.max_attempts` qualifies.
pub fn mine_block_parallel(template: Block, config: &MinerConfig) -> Result<Block> {
    config.validate()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()?;

    let found = pool.install(|| {
        (0u64..config.max_attempts)
            .into_par_iter()
            .find_first(|nonce| {
                let hash = calculate_hash(
                    template.index,
                    template.timestamp,
                    &template.previous_hash,
                    &template.transactions,
                    *nonce,
                );
                config.meets_target(&hash)
            })
    });

    let nonce = found.ok_or(LedgerError::MiningExhausted {
        attempts: config.max_attempts,
    })?;

    let mut block = template;
    block.nonce = nonce;
    block.hash = block.compute_hash();

    info!(
        "Mined block {} with nonce {} and hash {} on {} workers",
        block.index, block.nonce, block.hash, config.workers
    );
    Ok(block)
}
