use anyhow::Result;
use clap::ValueEnum;
use ledger_core::{BlockView, Chain};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

pub fn write_chain<W: Write>(
    out: &mut W,
    blocks: &[BlockView<'_>],
    format: Format,
) -> Result<()> {
    match format {
        Format::Text => {
            for block in blocks {
                write_block(out, block)?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, blocks)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_block<W: Write>(out: &mut W, block: &BlockView<'_>) -> io::Result<()> {
    writeln!(out, "Block #{}:", block.index)?;
    writeln!(out, "  Transactions:")?;
    for tx in block.transactions {
        writeln!(out, "    Sender: {}", tx.sender)?;
        writeln!(out, "    Receiver: {}", tx.receiver)?;
        writeln!(out, "    Amount: {:.2}", tx.amount)?;
    }
    writeln!(out, "  Nonce: {}", block.nonce)?;
    writeln!(out, "  PrevHash: {}", block.previous_hash)?;
    writeln!(out, "  Hash: {}", block.hash)
}

pub fn write_verdict<W: Write>(out: &mut W, chain: &Chain) -> io::Result<()> {
    if chain.verify() {
        writeln!(out, "Blockchain is valid.")
    } else {
        writeln!(out, "Blockchain is invalid.")?;
        match chain.find_fault() {
            Some(fault) => writeln!(out, "  {fault}"),
            None => Ok(()),
        }
    }
}
