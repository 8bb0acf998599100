//! Interactive shell over a single B-tree

mod command;
mod error;
#[cfg(test)]
mod tests;

pub use command::{Command, HELP, parse_line, parser};
pub use error::{ShellError, ShellResult};

use std::fmt::Write;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use prettytable::{Table, row};

use crate::btree::{BTree, Key};
use crate::config::Config;

/// Text produced by a command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub output: String,
    /// Set once an `exit` command has run
    pub exit: bool,
}

impl Reply {
    fn push(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.output.is_empty() {
            self.output.push('\n');
        }
        self.output.push_str(text.trim_end_matches('\n'));
    }
}

/// A tree plus the settings it is driven with
pub struct Session {
    tree: BTree,
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> ShellResult<Self> {
        let tree = BTree::new(config.order)?;
        Ok(Self { tree, config })
    }

    pub fn tree(&self) -> &BTree {
        &self.tree
    }

    /// Parse and run one line of input
    ///
    /// Commands run in order; the first failure aborts the rest of the
    /// line. Commands after an `exit` are ignored.
    pub fn run_line(&mut self, line: &str) -> ShellResult<Reply> {
        let commands = parse_line(line).map_err(ShellError::Parse)?;
        let mut reply = Reply::default();

        for command in commands {
            tracing::debug!(target: "btindex::shell", ?command, "executing");
            if command == Command::Exit {
                reply.exit = true;
                break;
            }
            let output = self.execute(command)?;
            reply.push(&output);
        }

        Ok(reply)
    }

    /// Run a single command, returning its output
    pub fn execute(&mut self, command: Command) -> ShellResult<String> {
        let mutates = matches!(
            command,
            Command::Insert(_) | Command::Delete(_) | Command::Load(_) | Command::Reset(_)
        );

        let output = match command {
            Command::Insert(keys) => self.insert_keys(&keys)?,
            Command::Delete(keys) => self.delete_keys(&keys)?,
            Command::Search(keys) => self.search_keys(&keys)?,
            Command::Print => self.print()?,
            Command::Stats => self.stats(),
            Command::Check => {
                self.tree.check()?;
                "ok: all invariants hold".to_string()
            }
            Command::Dump => serde_json::to_string_pretty(&self.tree.snapshot()?)?,
            Command::Load(path) => self.load(Path::new(&path))?,
            Command::Reset(order) => {
                let order = order.unwrap_or(self.config.order);
                self.tree = BTree::new(order)?;
                self.config.order = order;
                format!("new empty tree of order {}", order)
            }
            Command::Help => HELP.to_string(),
            Command::Exit => String::new(),
        };

        if mutates && self.config.verify {
            self.tree.check()?;
        }

        Ok(output)
    }

    fn insert_keys(&mut self, keys: &[Key]) -> ShellResult<String> {
        let mut out = Vec::with_capacity(keys.len());
        for &key in keys {
            if self.tree.insert(key)? {
                out.push(format!("inserted {}", key));
            } else {
                out.push(format!("{} already present", key));
            }
        }
        Ok(out.join("\n"))
    }

    fn delete_keys(&mut self, keys: &[Key]) -> ShellResult<String> {
        let mut out = Vec::with_capacity(keys.len());
        for &key in keys {
            if self.tree.delete(key)? {
                out.push(format!("deleted {}", key));
            } else {
                out.push(format!("{} not found", key));
            }
        }
        Ok(out.join("\n"))
    }

    fn search_keys(&self, keys: &[Key]) -> ShellResult<String> {
        let mut out = Vec::with_capacity(keys.len());
        for &key in keys {
            match self.tree.try_search(key)? {
                Some(locator) => out.push(format!(
                    "{} found in node {} at index {}",
                    key, locator.node, locator.index
                )),
                None => out.push(format!("{} not found", key)),
            }
        }
        Ok(out.join("\n"))
    }

    fn print(&self) -> ShellResult<String> {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "order {}: at most {} keys per node",
            self.tree.order(),
            self.tree.max_keys()
        );
        out.push_str(&self.tree.traversal_level()?.to_string());
        Ok(out)
    }

    fn stats(&self) -> String {
        let stats = self.tree.stats();
        stats.emit_tracing();

        let mut table = Table::new();
        table.add_row(row!["metric", "value"]);
        table.add_row(row!["order", self.tree.order()]);
        table.add_row(row!["keys", self.tree.len()]);
        table.add_row(row!["height", self.tree.height()]);
        table.add_row(row!["nodes", self.tree.node_count()]);
        for (label, value) in stats.rows() {
            table.add_row(row![label, value]);
        }
        table.to_string()
    }

    /// Insert every key in a CSV file
    pub fn load(&mut self, path: &Path) -> ShellResult<String> {
        let keys = read_keys(path)?;
        let mut inserted = 0;
        for &key in &keys {
            if self.tree.insert(key)? {
                inserted += 1;
            }
        }
        tracing::debug!(
            target: "btindex::shell",
            path = %path.display(),
            read = keys.len(),
            inserted,
            "loaded keys"
        );
        Ok(format!(
            "loaded {} keys from {} ({} already present)",
            inserted,
            path.display(),
            keys.len() - inserted
        ))
    }
}

/// Read integer keys from a CSV file
///
/// Every non-empty field of every record is a key; rows may differ in
/// length and there is no header row.
pub fn read_keys(path: &Path) -> ShellResult<Vec<Key>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut keys = Vec::new();
    for record in reader.records() {
        let record = record?;
        for field in record.iter().filter(|f| !f.is_empty()) {
            let key = field
                .parse::<Key>()
                .map_err(|_| ShellError::InvalidKey(field.to_string()))?;
            keys.push(key);
        }
    }
    Ok(keys)
}
