//! Team and project tracking with a local-first JSON store.
//!
//! The layers, bottom up:
//! - [`types`]: the AppState aggregate and every record it holds.
//! - [`sanitize`]: total, idempotent gap-filling for old snapshots.
//! - [`store`]: the on-disk cache with schema-version purge.
//! - [`server`]: the shared-store HTTP API (optimistic concurrency).
//! - [`sync`]: the client for that API plus the two-tier [`sync::StateStore`]
//!   facade the application drives.
//! - [`merge`]: backup export and the id-keyed import merge.
//! - [`llm`]: extraction and report drafting via a local LLM endpoint.

pub mod error;
pub mod llm;
pub mod merge;
pub mod sanitize;
pub mod server;
pub mod store;
pub mod sync;
pub mod types;
pub mod util;

/// Display name carried in backup metadata.
pub const APP_NAME: &str = "DOINg";

/// Schema version. A local cache tagged with any other value is purged on
/// load.
pub const APP_VERSION: &str = "1.0.2";
