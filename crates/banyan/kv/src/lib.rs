//! Flat key-value storage for the Banyan data core.
//!
//! Everything Banyan persists lives in one string-keyed table of JSON
//! values: entity records under `{kind}:{id}` keys and relationship pointers
//! under composite prefixes. This crate defines the storage contract and two
//! backends:
//! - an in-memory ordered map for tests and single-process deployments
//! - PostgreSQL (one table, `key TEXT PRIMARY KEY, value JSONB`) behind the
//!   `postgres` feature
//!
//! Design stance:
//! - operations are atomic at single-key granularity; there are no
//!   cross-key transactions, and the layers above sequence multi-key writes
//! - prefix scans return values in key order, so callers can re-sort by
//!   their own criteria without worrying about backend nondeterminism

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{KvError, KvResult};
pub use memory::InMemoryKvStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresKvStore;
pub use traits::KvStore;
