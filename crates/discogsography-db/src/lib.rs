//! Resilient drivers for the two stores discogsography writes to: the
//! relational table store (Postgres via sqlx) and the embedded property
//! graph store (kuzu).

pub mod graph;
pub mod recovery;
pub mod relational;

pub use graph::GraphStore;
pub use relational::RelationalStore;
