//! Persistence: an injected key-value store, per-world documents, and the
//! named playground catalog.
//!
//! # Invariants
//! - The kernel never touches storage; everything here consumes its public API.
//! - Only entity lists and dimensions are stored; derived maps are rebuilt on load.
//! - A document with an unknown schema version fails closed.

pub mod catalog;
pub mod document;
pub mod store;

pub use catalog::{PlaygroundStore, DEFAULT_COLLECTION, UNTITLED};
pub use document::{decode_world, encode_world, WORLD_SCHEMA_VERSION};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
