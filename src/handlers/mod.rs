pub mod auth;
pub mod autocomplete;
pub mod cache;
pub mod expand;
pub mod explore;
pub mod node;
pub mod sync;
pub mod trends;
pub mod user;
