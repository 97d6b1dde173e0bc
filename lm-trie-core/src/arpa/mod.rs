//! ARPA text format.
//!
//! ```text
//! \data\
//! ngram 1=3
//! ngram 2=1
//!
//! \1-grams:
//! -1.000000	</s>
//! -99.000000	<s>	-0.500000
//! -0.700000	hello	-0.300000
//!
//! \2-grams:
//! -1.000000	<s> hello
//!
//! \end\
//! ```
//!
//! Anything before `\data\` is ignored. Each data line is
//! `<log10 prob> <words, oldest first> [<log10 backoff>]`.

/// Streaming reader that populates a trie one order at a time.
mod reader;

/// Writer producing text the reader accepts.
mod writer;

pub use reader::{read_arpa, ArpaStats};
pub use writer::write_arpa;
