use log::debug;

use super::node::NodeId;
use super::trie::Trie;
use crate::dict::WordId;

impl Trie {
	/// Log probability of `word` after `history`, with backoff.
	///
	/// `history` is most recent first and is truncated to `order() - 1`
	/// words. Returns the expanded log probability and the order of the
	/// N-gram that was actually found (`0` when even the unigram is missing
	/// and the floor is returned).
	///
	/// When `(history, word)` is absent, the oldest history word is dropped
	/// and the backoff weight of the history is added:
	/// `prob(w, h) = backoff_weight(h[0], h[1..]) + prob(w, h[..len - 1])`.
	///
	/// # Notes
	/// - Runs at most `order()` lookups, each bounded by `order()` steps.
	pub fn prob(&self, word: WordId, history: &[WordId]) -> (i32, usize) {
		let mut n_hist = history.len().min(self.n.saturating_sub(1));
		let mut backoff = 0;

		loop {
			if let Some(prob) = self.ngram(word, &history[..n_hist]).and_then(|id| self.node_prob(id)) {
				return (backoff + prob, n_hist + 1);
			}
			if n_hist == 0 {
				debug!("Word {} not found, using floor", word);
				return (backoff + self.floor(), 0);
			}
			backoff += self.backoff_weight(history[0], &history[1..n_hist]);
			n_hist -= 1;
		}
	}

	/// Log backoff weight of the N-gram `(history, word)`.
	///
	/// If it is absent, the oldest history word is dropped until a stored
	/// N-gram is found; an empty miss yields `0` (a neutral weight).
	pub fn backoff_weight(&self, word: WordId, history: &[WordId]) -> i32 {
		let mut n_hist = history.len().min(self.n.saturating_sub(1));

		loop {
			if let Some(bowt) = self.ngram(word, &history[..n_hist]).and_then(|id| self.node_bowt(id)) {
				return bowt;
			}
			if n_hist == 0 {
				return 0;
			}
			n_hist -= 1;
		}
	}

	/// Log probability of `word` following the N-gram stored at `parent`.
	///
	/// Returns `None` if `parent` is stale.
	pub fn successor_prob(&self, parent: NodeId, word: WordId) -> Option<(i32, usize)> {
		let node = self.node(parent)?;
		let mut history = Vec::with_capacity(self.n);
		if !node.word().is_root() {
			history.push(node.word());
			history.extend(self.word_history(parent));
		}
		Some(self.prob(word, &history))
	}

	/// String form of [`Trie::prob`].
	///
	/// Unknown words behave like words with no stored N-grams.
	pub fn prob_words(&self, word: &str, history: &[&str]) -> (i32, usize) {
		let lookup = |w: &str| self.dict.word_id(w).unwrap_or(WordId::ROOT);
		let history: Vec<WordId> = history.iter().map(|w| lookup(w)).collect();
		self.prob(lookup(word), &history)
	}

	/// Sums the log probability of every token given the tokens before it.
	///
	/// Each token is scored with at most `order() - 1` preceding tokens.
	pub fn score_sentence(&self, tokens: &[&str]) -> i32 {
		let max_hist = self.n.saturating_sub(1);
		(0..tokens.len())
			.map(|i| {
				let history: Vec<&str> = tokens[..i].iter().rev().take(max_hist).copied().collect();
				self.prob_words(tokens[i], &history).0
			})
			.sum()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use crate::dict::{Dictionary, WordId};
	use crate::logmath::{LogMath, LogMathConfig};
	use crate::model::trie::Trie;

	/// Builds the three-word example model with shift 0.
	///
	/// ```text
	/// 1-grams: </s> -1.0, <s> -99 (bowt -0.5), hello -0.7 (bowt -0.3)
	/// 2-grams: <s> hello -1.0
	/// ```
	fn example() -> Trie {
		let dict = Arc::new(Dictionary::from_words(["</s>", "<s>", "hello"]));
		let lmath = LogMath::new(LogMathConfig { base: 1.01, min_prob: 1e-20 }).unwrap();
		let mut t = Trie::new(Some(dict), Arc::new(lmath));
		let root = t.root();
		let [end, start, hello] = ["</s>", "<s>", "hello"].map(|w| t.dict().word_id(w).unwrap());

		let n = t.add_successor(root, end).unwrap();
		t.set_scores(n, -1.0, 0.0).unwrap();
		let s = t.add_successor(root, start).unwrap();
		t.set_scores(s, -99.0, -0.5).unwrap();
		let h = t.add_successor(root, hello).unwrap();
		t.set_scores(h, -0.7, -0.3).unwrap();
		let sh = t.add_successor(s, hello).unwrap();
		t.set_scores(sh, -1.0, 0.0).unwrap();
		t
	}

	fn ids(t: &Trie, words: &[&str]) -> Vec<WordId> {
		words.iter().map(|w| t.dict().word_id(w).unwrap()).collect()
	}

	#[test]
	fn test_exact_hit() {
		let t = example();
		let w = ids(&t, &["hello", "<s>"]);
		let (p, n_used) = t.prob(w[0], &w[1..]);
		assert_eq!(p, t.lmath().log10_to_log(-1.0));
		assert_eq!(n_used, 2);
	}

	#[test]
	fn test_backoff_to_unigram() {
		let t = example();
		let w = ids(&t, &["</s>", "hello"]);
		let (p, n_used) = t.prob(w[0], &w[1..]);
		let expected = t.backoff_weight(w[1], &[]) + t.prob(w[0], &[]).0;
		assert_eq!(p, expected);
		assert_eq!(p, t.lmath().log10_to_log(-0.3) + t.lmath().log10_to_log(-1.0));
		assert_eq!(n_used, 1);
	}

	#[test]
	fn test_unknown_word_gets_floor() {
		let t = example();
		let (p, n_used) = t.prob_words("nowhere", &[]);
		assert_eq!(p, t.floor());
		assert_eq!(n_used, 0);

		// Backoff weights still apply on the way down.
		let (p, n_used) = t.prob_words("nowhere", &["hello"]);
		assert_eq!(p, t.floor() + t.lmath().log10_to_log(-0.3));
		assert_eq!(n_used, 0);
	}

	#[test]
	fn test_backoff_weight_defaults_to_neutral() {
		let t = example();
		let w = ids(&t, &["</s>", "hello"]);
		assert_eq!(t.backoff_weight(w[0], &[]), 0);
		// (hello </s>) is absent: drop the history and use </s> alone.
		assert_eq!(t.backoff_weight(w[0], &w[1..]), 0);
		assert_eq!(t.backoff_weight(w[1], &w[..1]), t.lmath().log10_to_log(-0.3));
		assert_eq!(t.backoff_weight(ids(&t, &["hello"])[0], &[]), t.lmath().log10_to_log(-0.3));
	}

	#[test]
	fn test_successor_prob() {
		let t = example();
		let w = ids(&t, &["</s>", "<s>", "hello"]);
		let start = t.successor(t.root(), w[1]).unwrap();
		let hello = t.successor(t.root(), w[2]).unwrap();

		assert_eq!(t.successor_prob(start, w[2]), Some(t.prob(w[2], &[w[1]])));
		assert_eq!(t.successor_prob(hello, w[0]), Some(t.prob(w[0], &[w[2]])));
		assert_eq!(t.successor_prob(t.root(), w[0]), Some(t.prob(w[0], &[])));
	}

	#[test]
	fn test_score_sentence() {
		let t = example();
		let score = t.score_sentence(&["<s>", "hello", "</s>"]);
		let expected = t.prob_words("<s>", &[]).0
			+ t.prob_words("hello", &["<s>"]).0
			+ t.prob_words("</s>", &["hello"]).0;
		assert_eq!(score, expected);
	}

	#[test]
	fn test_long_history_terminates() {
		let t = example();
		let hist = vec![t.dict().word_id("hello").unwrap(); 50];
		let (p, n_used) = t.prob(t.dict().word_id("</s>").unwrap(), &hist);
		assert_eq!(n_used, 1);
		assert_eq!(p, t.lmath().log10_to_log(-0.3) + t.lmath().log10_to_log(-1.0));
	}
}
