//! The two bus sink services: Graph Sink and Table Sink.
//!
//! Both consume the same four catalog topics from `discogsography-exchange`
//! and converge the same upstream records into different storage shapes.
//! They share no state; this crate only shares the plumbing (bus setup,
//! the decode-hash-compare-write protocol, redelivery tracking) that both
//! binaries apply to their own store.

pub mod bus;
pub mod config;
pub mod merge;
pub mod sink;

pub use bus::BusConfig;
pub use config::IngestConfig;
