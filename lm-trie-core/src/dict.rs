use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer identifier of a word in a [`Dictionary`].
///
/// Ids are dense and assigned in insertion order. The value `-1` is
/// reserved for the trie root and never names a real word.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordId(pub i32);

impl WordId {
	/// Sentinel id carried by the trie root.
	pub const ROOT: WordId = WordId(-1);

	pub fn is_root(self) -> bool {
		self == Self::ROOT
	}
}

impl fmt::Display for WordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Bidirectional word <-> id mapping.
///
/// # Responsibilities
/// - Resolve word strings to ids (and back)
/// - Grow the vocabulary when a trie is built in "generate" mode
///
/// # Invariants
/// - `words[id]` is the string of `id`, and `ids[words[id]] == id`
/// - Ids never change once assigned
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Dictionary {
	words: Vec<String>,
	ids: HashMap<String, WordId>,
}

impl Dictionary {
	/// Creates an empty dictionary.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a dictionary from a word list, in order.
	///
	/// Duplicates keep their first id.
	pub fn from_words<I, S>(words: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut dict = Self::new();
		for word in words {
			dict.add_word(word.as_ref());
		}
		dict
	}

	/// Returns the id of `word`, if known.
	pub fn word_id(&self, word: &str) -> Option<WordId> {
		self.ids.get(word).copied()
	}

	/// Returns the string of `wid`, if it names a known word.
	pub fn word_str(&self, wid: WordId) -> Option<&str> {
		usize::try_from(wid.0)
			.ok()
			.and_then(|i| self.words.get(i))
			.map(String::as_str)
	}

	/// Adds `word` and returns its id.
	///
	/// Adding a word that is already present returns the existing id.
	pub fn add_word(&mut self, word: &str) -> WordId {
		if let Some(wid) = self.ids.get(word) {
			return *wid;
		}
		let wid = WordId(self.words.len() as i32);
		self.words.push(word.to_owned());
		self.ids.insert(word.to_owned(), wid);
		wid
	}

	pub fn len(&self) -> usize {
		self.words.len()
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	/// Iterates over `(id, word)` pairs in id order.
	pub fn words(&self) -> impl Iterator<Item = (WordId, &str)> {
		self.words
			.iter()
			.enumerate()
			.map(|(i, w)| (WordId(i as i32), w.as_str()))
	}
}
