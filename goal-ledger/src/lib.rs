//! Goal Ledger - serializing host for the encrypted goal store
//!
//! The store itself is single-threaded. The ledger moves it into one tokio
//! task and hands out cloneable handles, so concurrent callers see a single
//! total order of mutations and a broadcast stream of committed events.
//!
//! Also home to the shared configuration, tracing setup, snapshot
//! persistence and the `goalctl` command line.

pub mod cli;
pub mod config;
pub mod demo;
pub mod ledger;
pub mod logging;
pub mod persist;

pub use config::{ChannelConfig, LedgerConfig, LoggingConfig, StoreConfig};
pub use demo::{run_demo, DemoReport};
pub use ledger::{Ledger, LedgerError, LedgerHandle};
pub use logging::init_tracing;
pub use persist::{load_store, save_snapshot};
