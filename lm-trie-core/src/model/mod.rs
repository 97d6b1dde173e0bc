//! The N-gram trie and everything that reads it.
//!
//! - Pooled node storage with generational handles (`NodeStore`)
//! - The mutable trie itself (`Trie`)
//! - Backoff probability queries
//! - Flat and parent/child iteration

/// Pooled allocation of fixed-shape trie nodes.
///
/// Owns every node; parents hold child handles, children hold a
/// non-owning handle back to their parent.
pub mod node;

/// Root sentinel, sorted successor lookup/insert/delete, quantization.
pub mod trie;

/// Exact lookup plus recursive backoff probability and weight.
pub mod query;

/// Flat (same order) and local (one node's successors) enumeration.
pub mod iter;
