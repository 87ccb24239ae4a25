//! Per-user OAuth 1.0a sync engine: mirrors a Discogs account's collection
//! and wantlist into the relational and graph stores, under the trigger-
//! point concurrency controls the Read API's `/api/sync` handler uses.

pub mod client;
pub mod config;
pub mod crypto;
pub mod oauth;
pub mod orchestrator;
pub mod pagination;

pub use config::SyncConfig;
pub use crypto::TokenCipher;
pub use orchestrator::{run_full_sync, SyncTrigger, TriggerResult};
