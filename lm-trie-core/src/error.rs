//! Error types for lm-trie-core

use thiserror::Error;

use crate::dict::WordId;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
///
/// Only structural problems are errors. Unknown words and unresolved
/// histories met while reading an ARPA file are logged and skipped.
#[derive(Error, Debug)]
pub enum Error {
	/// Malformed ARPA input; the partially built trie must be discarded
	#[error("ARPA format error at line {line}: {message}")]
	Format { line: usize, message: String },

	/// I/O error
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Snapshot (de)serialization error
	#[error("Snapshot error: {0}")]
	Snapshot(#[from] postcard::Error),

	/// Invalid configuration value
	#[error("Invalid configuration: {0}")]
	Config(String),

	/// A node handle that no longer refers to a live node
	#[error("Invalid node handle")]
	InvalidNode,

	/// A word id the trie's dictionary does not know
	#[error("Unknown word id {0}")]
	UnknownWord(WordId),
}

impl Error {
	/// Create a format error for a given (1-based) line
	pub fn format(line: usize, msg: impl Into<String>) -> Self {
		Error::Format { line, message: msg.into() }
	}

	/// Create a configuration error
	pub fn config(msg: impl Into<String>) -> Self {
		Error::Config(msg.into())
	}
}
