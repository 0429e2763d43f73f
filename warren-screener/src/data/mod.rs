//! Market data access and result persistence.
//!
//! - `statements` - statement tables and fuzzy line-item resolution
//! - `provider` - the `FundamentalsProvider` seam
//! - `yahoo` - Yahoo Finance implementation of the provider
//! - `universe` - index constituent lists with a static fallback
//! - `local_storage` - blob backends (SQLite, memory)
//! - `cache` - TTL result cache over a blob backend

pub mod cache;
pub mod local_storage;
pub mod provider;
pub mod statements;
pub mod universe;
pub mod yahoo;

pub use cache::{CacheEntry, CacheStatus, ResultCache};
pub use local_storage::{CacheBackend, MemoryBlobStore, SqliteBlobStore};
pub use provider::{FundamentalsProvider, MarketSnapshot, ProviderError};
pub use statements::{fields, resolve_field, FinancialStatements, StatementRow, StatementTable};
pub use universe::{normalize_tickers, RemoteUniverse, StaticUniverse, TickerUniverse};
pub use yahoo::YahooFinanceAdapter;
