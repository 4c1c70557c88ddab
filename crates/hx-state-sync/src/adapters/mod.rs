//! # Adapters
//!
//! Concrete implementations of the outbound ports: in-memory stores for
//! tests and embedded use, a filesystem chunk store for production, and the
//! compression codecs.

pub mod compression;
pub mod fs_store;
pub mod memory;
