use crate::render::{self, Format};
use anyhow::Result;
use ledger_core::Chain;
use std::io::{BufRead, Write};
use std::str::FromStr;

enum Step {
    Continue,
    Quit,
}

/// Blocking menu loop over a chain. Reads one answer per line; end of input
/// ends the session like choosing Quit, minus the farewell.
pub struct Session<R, W> {
    chain: Chain,
    input: R,
    out: W,
    format: Format,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(chain: Chain, input: R, out: W, format: Format) -> Self {
        Self {
            chain,
            input,
            out,
            format,
        }
    }

    #[cfg(test)]
    fn into_parts(self) -> (Chain, W) {
        (self.chain, self.out)
    }

    pub fn run(&mut self) -> Result<()> {
        writeln!(self.out, "Genesis Block added to the blockchain")?;
        loop {
            self.print_menu()?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                break;
            };
            let step = match choice.as_str() {
                "1" => self.add_block()?,
                "2" => self.display()?,
                "3" => self.change_block()?,
                "4" => {
                    render::write_verdict(&mut self.out, &self.chain)?;
                    Step::Continue
                }
                "5" => {
                    writeln!(self.out, "Goodbye!")?;
                    Step::Quit
                }
                _ => {
                    writeln!(self.out, "Invalid choice. Please select a valid option.")?;
                    Step::Continue
                }
            };
            if let Step::Quit = step {
                break;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.out, "\nMenu:")?;
        writeln!(self.out, "1. Add a Block")?;
        writeln!(self.out, "2. Display the whole chain")?;
        writeln!(self.out, "3. Change a Block")?;
        writeln!(self.out, "4. Verify Chain")?;
        writeln!(self.out, "5. Quit")?;
        Ok(())
    }

    fn add_block(&mut self) -> Result<Step> {
        let Some((sender, receiver, amount)) = self.prompt_transaction("")? else {
            return Ok(Step::Quit);
        };
        let tx = match self.chain.add_transaction(&sender, &receiver, amount) {
            Ok(tx) => tx,
            Err(err) => {
                writeln!(self.out, "Transaction rejected: {err}")?;
                return Ok(Step::Continue);
            }
        };
        match self.chain.mine_and_append(vec![tx]) {
            Ok(block) => {
                writeln!(self.out, "Block #{} added to the blockchain", block.index)?;
                writeln!(self.out, "Hash: {}", block.hash)?;
            }
            Err(err) => writeln!(self.out, "Mining failed: {err}")?,
        }
        Ok(Step::Continue)
    }

    fn display(&mut self) -> Result<Step> {
        writeln!(self.out, "\nBlockchain:")?;
        render::write_chain(&mut self.out, &self.chain.render(), self.format)?;
        Ok(Step::Continue)
    }

    fn change_block(&mut self) -> Result<Step> {
        let Some(index) = self.prompt_parsed::<usize>("Enter the index of the block to change: ")?
        else {
            return Ok(Step::Quit);
        };
        if self.chain.get(index).is_err() {
            writeln!(self.out, "Invalid block index")?;
            return Ok(Step::Continue);
        }
        let Some((sender, receiver, amount)) = self.prompt_transaction("new ")? else {
            return Ok(Step::Quit);
        };
        let tx = match self.chain.add_transaction(&sender, &receiver, amount) {
            Ok(tx) => tx,
            Err(err) => {
                writeln!(self.out, "Transaction rejected: {err}")?;
                return Ok(Step::Continue);
            }
        };
        match self.chain.mutate(index, tx) {
            Ok(()) => writeln!(self.out, "Block #{index} changed")?,
            Err(err) => writeln!(self.out, "{err}")?,
        }
        Ok(Step::Continue)
    }

    fn prompt_transaction(&mut self, qualifier: &str) -> Result<Option<(String, String, f64)>> {
        let Some(sender) = self.prompt(&format!("Enter {qualifier}sender name: "))? else {
            return Ok(None);
        };
        let Some(receiver) = self.prompt(&format!("Enter {qualifier}receiver name: "))? else {
            return Ok(None);
        };
        let Some(amount) = self.prompt_parsed::<f64>(&format!("Enter {qualifier}amount: "))?
        else {
            return Ok(None);
        };
        Ok(Some((sender, receiver, amount)))
    }

    /// `None` once input is exhausted.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Re-prompts until the answer parses.
    fn prompt_parsed<T: FromStr>(&mut self, label: &str) -> Result<Option<T>> {
        loop {
            let Some(answer) = self.prompt(label)? else {
                return Ok(None);
            };
            match answer.parse() {
                Ok(value) => return Ok(Some(value)),
                Err(_) => writeln!(self.out, "Invalid number {answer:?}, please try again.")?,
            }
        }
    }
}
