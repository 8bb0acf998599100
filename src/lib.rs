pub mod btree;
pub mod config;
pub mod shell;

pub use btree::{BTree, BTreeError, BTreeResult, DEFAULT_ORDER, Key, Locator, MAX_HEIGHT};
pub use config::{Args, Config};
pub use shell::{Reply, Session, ShellError, ShellResult};
