//! Mutable trie storage for backoff N-gram language models.
//!
//! This crate provides everything needed to serve an ARPA model to a decoder:
//! - A pooled node store and the trie built on top of it
//! - A streaming ARPA reader (and the matching writer)
//! - Smoothed probability queries with recursive backoff
//! - Flat and parent/child navigation over the stored N-grams
//!
//! The word dictionary and the log-math service are small collaborators
//! shared between tries through `Arc`.

/// Word <-> id dictionary shared with the trie.
pub mod dict;

/// Integer log arithmetic used for every stored score.
pub mod logmath;

/// The trie, its node store, queries and iteration.
pub mod model;

/// ARPA text format reader and writer.
pub mod arpa;

/// Crate error type.
pub mod error;

/// I/O utilities (line reading, snapshot paths, model listing).
pub mod io;

pub use arpa::ArpaStats;
pub use dict::{Dictionary, WordId};
pub use error::{Error, Result};
pub use logmath::{LogMath, LogMathConfig};
pub use model::iter::{NgramCursor, Ngrams};
pub use model::node::{NodeId, TrieNode};
pub use model::trie::Trie;
