use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use lm_trie_core::{LogMath, LogMathConfig, Trie, WordId};

const TRIGRAMS: &str = "\
Trigram model with gaps.

\\data\\
ngram 1=5
ngram 2=6
ngram 3=3

\\1-grams:
-1.2 </s>
-99 <s> -0.4
-0.9 the -0.25
-1.1 cat -0.15
-1.3 sat -0.2

\\2-grams:
-0.3 <s> the -0.1
-0.8 the cat -0.05
-0.6 cat sat -0.12
-0.4 sat </s>
-1.5 the sat
-0.9 cat </s>

\\3-grams:
-0.2 <s> the cat
-0.1 the cat sat
-0.05 cat sat </s>

\\end\\
";

const VOCAB: [&str; 5] = ["</s>", "<s>", "the", "cat", "sat"];

/// Log base 1.01 keeps the floor within 16 bits, so nothing is shifted.
fn exact_lmath() -> Arc<LogMath> {
	Arc::new(LogMath::new(LogMathConfig { base: 1.01, min_prob: 1e-20 }).unwrap())
}

fn load(text: &str) -> Trie {
	let _ = env_logger::builder().is_test(true).try_init();
	let mut trie = Trie::new(None, exact_lmath());
	trie.read_arpa(text.as_bytes()).unwrap();
	trie
}

/// Straightforward model built from the ARPA text, keyed by words oldest first.
struct Reference {
	entries: HashMap<Vec<String>, (i32, i32)>,
	order: usize,
	floor: i32,
}

impl Reference {
	fn parse(text: &str, lmath: &LogMath) -> Self {
		let floor = lmath.floor();
		let mut entries = HashMap::new();
		let mut order = 0;
		let mut n = 0;
		for line in text.lines().map(str::trim) {
			if let Some(rest) = line.strip_prefix('\\').and_then(|l| l.strip_suffix("-grams:")) {
				n = rest.parse().unwrap();
				order = order.max(n);
				continue;
			}
			let fields: Vec<&str> = line.split_whitespace().collect();
			if n == 0 || fields.len() < n + 1 || line.starts_with('\\') {
				continue;
			}
			let score = |s: &str| lmath.log10_to_log(s.parse().unwrap()).max(floor);
			let prob = score(fields[0]);
			let bowt = fields.get(n + 1).map_or(0, |&s| score(s));
			let words = fields[1..=n].iter().map(|w| w.to_string()).collect();
			entries.insert(words, (prob, bowt));
		}
		Self { entries, order, floor }
	}

	fn key(word: &str, history: &[&str]) -> Vec<String> {
		history.iter().rev().chain(std::iter::once(&word)).map(|w| w.to_string()).collect()
	}

	fn prob(&self, word: &str, history: &[&str]) -> i32 {
		let history = &history[..history.len().min(self.order - 1)];
		if let Some((prob, _)) = self.entries.get(&Self::key(word, history)) {
			return *prob;
		}
		match history.split_first() {
			None => self.floor,
			Some((&newest, rest)) => {
				self.bowt(newest, rest) + self.prob(word, &history[..history.len() - 1])
			}
		}
	}

	fn bowt(&self, word: &str, history: &[&str]) -> i32 {
		if let Some((_, bowt)) = self.entries.get(&Self::key(word, history)) {
			return *bowt;
		}
		if history.is_empty() { 0 } else { self.bowt(word, &history[..history.len() - 1]) }
	}
}

/// Every history (most recent first) of length 0..=3 over the vocabulary.
fn histories() -> Vec<Vec<&'static str>> {
	let mut all = vec![vec![]];
	let mut frontier = vec![vec![]];
	for _ in 0..3 {
		let mut next = Vec::new();
		for h in &frontier {
			for w in VOCAB {
				let mut longer: Vec<&str> = h.clone();
				longer.push(w);
				next.push(longer);
			}
		}
		all.extend(next.iter().cloned());
		frontier = next;
	}
	all
}

#[test]
fn every_record_is_retrievable_exactly() {
	let trie = load(TRIGRAMS);
	assert_eq!(trie.shift(), 0);
	let reference = Reference::parse(TRIGRAMS, trie.lmath());

	assert_eq!(reference.entries.len(), 14);
	for (words, (prob, bowt)) in &reference.entries {
		let (word, history) = words.split_last().unwrap();
		let history: Vec<&str> = history.iter().rev().map(String::as_str).collect();
		let id = trie.ngram_words(word, &history).unwrap();
		assert_eq!(trie.node_prob(id), Some(*prob), "{:?}", words);
		assert_eq!(trie.node_bowt(id), Some(*bowt), "{:?}", words);
	}
}

#[test]
fn prob_matches_reference_backoff() {
	let trie = load(TRIGRAMS);
	let reference = Reference::parse(TRIGRAMS, trie.lmath());

	for history in histories() {
		for word in VOCAB {
			let (prob, _) = trie.prob_words(word, &history);
			assert_eq!(prob, reference.prob(word, &history), "{} | {:?}", word, history);
		}
	}
}

#[test]
fn backoff_identity_holds_when_full_ngram_is_absent() {
	let trie = load(TRIGRAMS);
	let ids = |words: &[&str]| -> Vec<WordId> { words.iter().map(|w| trie.dict().word_id(w).unwrap()).collect() };
	for history in histories().into_iter().filter(|h| !h.is_empty() && h.len() <= 2) {
		for word in VOCAB {
			let hist = ids(history.as_slice());
			let w = ids(&[word][..])[0];
			if trie.ngram(w, &hist).is_some() {
				continue;
			}
			let shorter = &hist[..hist.len() - 1];
			let (prob, n_used) = trie.prob(w, &hist);
			let expected = trie.backoff_weight(hist[0], &hist[1..]) + trie.prob(w, shorter).0;
			assert_eq!(prob, expected, "{} | {:?}", word, history);
			assert_eq!(n_used, trie.prob(w, shorter).1);
			assert!(n_used <= hist.len());
		}
	}
}

#[test]
fn three_word_example() {
	let text = "\
\\data\\
ngram 1=3
ngram 2=1

\\1-grams:
-1.0 </s>
-99 <s> -0.5
-0.7 hello -0.3

\\2-grams:
-1.0 <s> hello

\\end\\
";
	let trie = load(text);
	assert!(trie.ngram_words("</s>", &["hello"]).is_none());

	let [end, hello] = ["</s>", "hello"].map(|w| trie.dict().word_id(w).unwrap());
	let (prob, n_used) = trie.prob(end, &[hello]);
	assert_eq!(prob, trie.backoff_weight(hello, &[]) + trie.prob(end, &[]).0);
	assert_eq!(n_used, 1);
}

#[test]
fn flat_iteration_visits_declared_counts() {
	let trie = load(TRIGRAMS);
	for n in 1..=3 {
		let visited: Vec<_> = trie.ngrams(n).into_iter().collect();
		let unique: HashSet<_> = visited.iter().copied().collect();
		assert_eq!(visited.len(), trie.counts()[n], "order {}", n);
		assert_eq!(unique.len(), visited.len());
		assert!(visited.iter().all(|&id| trie.depth(id) == Some(n)));
	}
}

#[test]
fn flat_order_is_independent_of_input_order() {
	let shuffled = "\
\\data\\
ngram 1=5
ngram 2=6
ngram 3=3

\\1-grams:
-1.3 sat -0.2
-0.9 the -0.25
-99 <s> -0.4
-1.2 </s>
-1.1 cat -0.15

\\2-grams:
-0.9 cat </s>
-1.5 the sat
-0.4 sat </s>
-0.3 <s> the -0.1
-0.6 cat sat -0.12
-0.8 the cat -0.05

\\3-grams:
-0.05 cat sat </s>
-0.1 the cat sat
-0.2 <s> the cat

\\end\\
";
	let a = load(TRIGRAMS);
	let b = load(shuffled);
	let text = |t: &Trie, n: usize| -> Vec<String> {
		t.ngrams(n)
			.into_iter()
			.map(|id| t.words(id).iter().map(|&w| t.dict().word_str(w).unwrap()).collect::<Vec<_>>().join(" "))
			.collect()
	};
	for n in 1..=3 {
		assert_eq!(text(&a, n), text(&b, n));
	}
	assert_eq!(text(&a, 2), vec!["<s> the", "cat </s>", "cat sat", "sat </s>", "the cat", "the sat"]);
}

#[test]
fn queries_are_shared_across_threads() {
	let trie = Arc::new(load(TRIGRAMS));
	let expected: Vec<i32> = histories()
		.iter()
		.flat_map(|h| VOCAB.map(|w| trie.prob_words(w, h).0))
		.collect();

	let handles: Vec<_> = (0..4)
		.map(|_| {
			let trie = Trie::retain(&trie);
			thread::spawn(move || -> Vec<i32> {
				histories()
					.iter()
					.flat_map(|h| VOCAB.map(|w| trie.prob_words(w, h).0))
					.collect()
			})
		})
		.collect();

	for handle in handles {
		assert_eq!(handle.join().unwrap(), expected);
	}
	assert_eq!(Trie::release(trie), 0);
}

#[test]
fn deleting_a_history_makes_its_extensions_unreachable() {
	let mut trie = load(TRIGRAMS);
	let the = trie.dict().word_id("the").unwrap();
	let old_the = trie.ngram_words("the", &[]).unwrap();
	let old_the_cat = trie.ngram_words("cat", &["the"]).unwrap();
	let old_the_cat_sat = trie.ngram_words("sat", &["cat", "the"]).unwrap();
	let live_before = trie.len();

	assert!(trie.delete_successor(trie.root(), the).unwrap());

	// Only "the" was named, but nothing below it can be reached any more.
	assert!(trie.ngram_words("the", &[]).is_none());
	assert!(trie.ngram_words("cat", &["the"]).is_none());
	assert!(trie.ngram_words("sat", &["cat", "the"]).is_none());
	assert!(trie.node(old_the).is_none());
	assert!(trie.node(old_the_cat).is_none());
	assert!(trie.node(old_the_cat_sat).is_none());
	assert_eq!(trie.len(), live_before - 4);

	// Siblings and unrelated N-grams stay.
	assert!(trie.ngram_words("the", &["<s>"]).is_some());
	assert!(trie.ngram_words("cat", &["the", "<s>"]).is_some());
	assert_eq!(trie.ngram_counts(), vec![1, 4, 4, 2]);

	// "the" is gone as a unigram: it now scores at the floor.
	assert_eq!(trie.prob_words("the", &[]), (trie.floor(), 0));
}
