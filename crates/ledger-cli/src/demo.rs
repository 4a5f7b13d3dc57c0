use crate::render::{self, Format};
use anyhow::Result;
use ledger_core::Chain;
use std::io::Write;

/// Scripted walkthrough: mine Alice -> Bob on top of genesis, verify, rewrite
/// the genesis transaction and verify again.
pub fn run<W: Write>(mut chain: Chain, out: &mut W, format: Format) -> Result<()> {
    writeln!(out, "Genesis Block added to the blockchain")?;

    let tx = chain.add_transaction("Alice", "Bob", 10.00)?;
    let block = chain.mine_and_append(vec![tx])?;
    writeln!(out, "Block #{} added to the blockchain", block.index)?;
    writeln!(out, "Hash: {}", block.hash)?;
    render::write_verdict(out, &chain)?;

    let forged = chain.add_transaction("Genesis", "Carol", 999.00)?;
    chain.mutate(0, forged)?;
    writeln!(out, "Block #0 changed")?;
    render::write_verdict(out, &chain)?;

    writeln!(out, "\nBlockchain:")?;
    render::write_chain(out, &chain.render(), format)
}
