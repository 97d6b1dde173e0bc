use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::node::{NodeId, NodeStore, TrieNode};
use crate::dict::{Dictionary, WordId};
use crate::error::{Error, Result};
use crate::io::build_output_path;
use crate::logmath::LogMath;

/// Mutable trie of backoff N-grams.
///
/// Each node below the root is one N-gram; its depth is the N-gram order
/// and its parent is its history (the same N-gram without the last word).
///
/// # Responsibilities
/// - Own every node through a pooled [`NodeStore`]
/// - Keep each successor list sorted by word string
/// - Quantize scores into 16 bits with a global `shift`
///
/// # Invariants
/// - Exactly one root, `word == WordId::ROOT`, no parent
/// - A node at depth `d > 0` has its full ancestor chain up to the root
/// - `zero` fits in an `i16`; `zero << shift` is the probability floor
/// - `counts[0] == 1` (the zero-gram) once counts have been declared
///
/// # Sharing
/// Wrap in `Arc` to share. After loading, every query only needs `&Trie`,
/// so concurrent readers are safe; mutation needs exclusive access.
#[derive(Serialize, Deserialize, Debug)]
pub struct Trie {
	pub(crate) dict: Arc<Dictionary>,
	pub(crate) generate: bool,
	pub(crate) lmath: Arc<LogMath>,
	pub(crate) shift: u32,
	pub(crate) zero: i32,
	pub(crate) n: usize,
	pub(crate) counts: Vec<usize>,
	pub(crate) root: NodeId,
	pub(crate) nodes: NodeStore,
}

/// Sort order of successor lists, bound to one dictionary.
///
/// Words compare by their dictionary string; ids unknown to the
/// dictionary sort first.
pub(crate) struct WordOrder<'a> {
	dict: &'a Dictionary,
	nodes: &'a NodeStore,
}

impl<'a> WordOrder<'a> {
	pub(crate) fn new(dict: &'a Dictionary, nodes: &'a NodeStore) -> Self {
		Self { dict, nodes }
	}

	fn key(&self, word: WordId) -> &'a str {
		self.dict.word_str(word).unwrap_or("")
	}

	fn node_key(&self, id: NodeId) -> &'a str {
		self.nodes.get(id).map_or("", |node| self.key(node.word))
	}

	/// First position whose word is not less than `word`.
	pub(crate) fn bisect_left(&self, list: &[NodeId], word: WordId) -> usize {
		let key = self.key(word);
		list.partition_point(|&id| self.node_key(id) < key)
	}

	/// First position whose word is greater than `word`.
	pub(crate) fn bisect_right(&self, list: &[NodeId], word: WordId) -> usize {
		let key = self.key(word);
		list.partition_point(|&id| self.node_key(id) <= key)
	}
}

impl Trie {
	/// Creates an empty trie.
	///
	/// - With `dict == None` a private dictionary is created and the trie is
	///   in "generate" mode: unigrams read from an ARPA file extend it.
	/// - Otherwise `dict` is shared and never modified by the trie.
	///
	/// The probability floor from `lmath` is halved until it fits 16 bits;
	/// the number of halvings is the quantization `shift`.
	pub fn new(dict: Option<Arc<Dictionary>>, lmath: Arc<LogMath>) -> Self {
		let (dict, generate) = match dict {
			Some(dict) => (dict, false),
			None => (Arc::new(Dictionary::new()), true),
		};

		let mut zero = lmath.floor();
		let mut shift = 0;
		while zero < i16::MIN as i32 {
			zero >>= 1;
			shift += 1;
		}
		debug!("Trie floor {} quantized with shift {}", zero, shift);

		let mut nodes = NodeStore::new();
		let root = nodes.alloc(TrieNode::new(WordId::ROOT, None));

		Self { dict, generate, lmath, shift, zero, n: 0, counts: Vec::new(), root, nodes }
	}

	/// Adds an owner to a shared trie.
	pub fn retain(this: &Arc<Self>) -> Arc<Self> {
		Arc::clone(this)
	}

	/// Drops one owner and returns how many remain.
	///
	/// The trie (nodes, dictionary and log-math handles) is freed when the
	/// last owner is released.
	pub fn release(this: Arc<Self>) -> usize {
		let remaining = Arc::strong_count(&this) - 1;
		drop(this);
		remaining
	}

	pub fn dict(&self) -> &Arc<Dictionary> {
		&self.dict
	}

	pub fn lmath(&self) -> &Arc<LogMath> {
		&self.lmath
	}

	/// Whether the trie grows its own dictionary while reading.
	pub fn is_generating(&self) -> bool {
		self.generate
	}

	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Maximum N-gram order.
	pub fn order(&self) -> usize {
		self.n
	}

	pub fn shift(&self) -> u32 {
		self.shift
	}

	/// Quantized probability floor.
	pub fn zero(&self) -> i32 {
		self.zero
	}

	/// Expanded probability floor, in the log-math base.
	pub fn floor(&self) -> i32 {
		self.zero << self.shift
	}

	/// N-gram counts as declared by the ARPA header (index 0 is the zero-gram).
	pub fn counts(&self) -> &[usize] {
		&self.counts
	}

	/// Number of live nodes, root included.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.len() <= 1
	}

	pub fn node(&self, id: NodeId) -> Option<&TrieNode> {
		self.nodes.get(id)
	}

	/// Distance from the root, i.e. the order of the N-gram.
	pub fn depth(&self, id: NodeId) -> Option<usize> {
		let mut node = self.nodes.get(id)?;
		let mut depth = 0;
		while let Some(parent) = node.parent {
			node = self.nodes.get(parent)?;
			depth += 1;
		}
		Some(depth)
	}

	/// Counts the live N-grams of each order by walking the trie.
	///
	/// Index 0 is the root. Unlike [`Trie::counts`] this reflects skipped
	/// lines and later insertions or deletions.
	pub fn ngram_counts(&self) -> Vec<usize> {
		let mut counts = vec![1];
		let mut stack = vec![(self.root, 0usize)];
		while let Some((id, depth)) = stack.pop() {
			let Some(node) = self.nodes.get(id) else { continue };
			if !node.successors.is_empty() && counts.len() <= depth + 1 {
				counts.resize(depth + 2, 0);
			}
			for &child in &node.successors {
				counts[depth + 1] += 1;
				stack.push((child, depth + 1));
			}
		}
		counts
	}

	/// Quantizes an integer log value for storage.
	///
	/// Values below the floor are clamped to it.
	pub(crate) fn quantize(&self, value: i32) -> i16 {
		let floor = self.floor();
		((value.max(floor)) >> self.shift).clamp(i16::MIN as i32, i16::MAX as i32) as i16
	}

	/// Reverses [`Trie::quantize`] (up to `2^shift - 1` units lost).
	pub(crate) fn expand(&self, value: i16) -> i32 {
		(value as i32) << self.shift
	}

	/// Expanded log probability of a node.
	pub fn node_prob(&self, id: NodeId) -> Option<i32> {
		self.nodes.get(id).map(|node| self.expand(node.log_prob))
	}

	/// Expanded log backoff weight of a node.
	pub fn node_bowt(&self, id: NodeId) -> Option<i32> {
		self.nodes.get(id).map(|node| self.expand(node.log_bowt))
	}

	/// Sets a node's scores from log10 values (as found in ARPA files).
	///
	/// # Errors
	/// Returns an error if `id` is stale.
	pub fn set_scores(&mut self, id: NodeId, log10_prob: f64, log10_bowt: f64) -> Result<()> {
		let log_prob = self.quantize(self.lmath.log10_to_log(log10_prob));
		let log_bowt = self.quantize(self.lmath.log10_to_log(log10_bowt));
		let node = self.nodes.get_mut(id).ok_or(Error::InvalidNode)?;
		node.log_prob = log_prob;
		node.log_bowt = log_bowt;
		Ok(())
	}

	/// Finds the successor of `parent` for `word`.
	///
	/// Bisects the sorted successor list; `None` on a miss or stale parent.
	pub fn successor(&self, parent: NodeId, word: WordId) -> Option<NodeId> {
		let list = &self.nodes.get(parent)?.successors;
		let pos = WordOrder::new(&self.dict, &self.nodes).bisect_left(list, word);
		let id = *list.get(pos)?;
		(self.nodes.get(id)?.word == word).then_some(id)
	}

	/// Adds a new, unscored successor for `word` under `parent`.
	///
	/// The node goes after any existing successor with the same word, so
	/// insertion is stable. The trie order grows if the node is deeper than
	/// any before it.
	///
	/// # Errors
	/// Returns an error if `parent` is stale or `word` is not in the dictionary.
	pub fn add_successor(&mut self, parent: NodeId, word: WordId) -> Result<NodeId> {
		let depth = self.depth(parent).ok_or(Error::InvalidNode)? + 1;
		if self.dict.word_str(word).is_none() {
			return Err(Error::UnknownWord(word));
		}

		let pos = {
			let list = &self.nodes.get(parent).ok_or(Error::InvalidNode)?.successors;
			WordOrder::new(&self.dict, &self.nodes).bisect_right(list, word)
		};
		let id = self.nodes.alloc(TrieNode::new(word, Some(parent)));
		self.nodes
			.get_mut(parent)
			.ok_or(Error::InvalidNode)?
			.successors
			.insert(pos, id);

		if depth > self.n {
			self.n = depth;
		}
		Ok(id)
	}

	/// Removes the successor of `parent` for `word`.
	///
	/// The removed node's whole subtree goes back to the node pool: its
	/// former descendants are unreachable and their handles become stale.
	/// Returns `Ok(false)` if no successor matches.
	///
	/// # Errors
	/// Returns an error if `parent` is stale.
	pub fn delete_successor(&mut self, parent: NodeId, word: WordId) -> Result<bool> {
		let Some(id) = self.successor(parent, word) else {
			if self.nodes.contains(parent) {
				return Ok(false);
			}
			return Err(Error::InvalidNode);
		};

		let siblings = &mut self.nodes.get_mut(parent).ok_or(Error::InvalidNode)?.successors;
		if let Some(pos) = siblings.iter().position(|&s| s == id) {
			siblings.remove(pos);
		}

		let mut stack = vec![id];
		let mut freed = 0;
		while let Some(next) = stack.pop() {
			if let Some(node) = self.nodes.free(next) {
				stack.extend(node.successors);
				freed += 1;
			}
		}
		debug!("Deleted successor {} ({} nodes reclaimed)", word, freed);
		Ok(true)
	}

	/// Finds the N-gram `(history..., word)`.
	///
	/// `history` is most recent first; it is truncated to `order() - 1` words.
	pub fn ngram(&self, word: WordId, history: &[WordId]) -> Option<NodeId> {
		let n_hist = history.len().min(self.n.saturating_sub(1));
		let mut node = self.root;
		for &wid in history[..n_hist].iter().rev() {
			node = self.successor(node, wid)?;
		}
		self.successor(node, word)
	}

	/// String form of [`Trie::ngram`]; unknown words never match.
	pub fn ngram_words(&self, word: &str, history: &[&str]) -> Option<NodeId> {
		let wid = self.dict.word_id(word)?;
		let hist = history
			.iter()
			.map(|w| self.dict.word_id(w))
			.collect::<Option<Vec<_>>>()?;
		self.ngram(wid, &hist)
	}

	/// History words of a node, most recent first, without its own word.
	pub fn word_history(&self, id: NodeId) -> Vec<WordId> {
		let mut hist = Vec::new();
		let mut cur = self.nodes.get(id).and_then(|node| node.parent);
		while let Some(node) = cur.and_then(|p| self.nodes.get(p)) {
			if node.word.is_root() {
				break;
			}
			hist.push(node.word);
			cur = node.parent;
		}
		hist
	}

	/// All words of a node's N-gram, oldest first.
	pub fn words(&self, id: NodeId) -> Vec<WordId> {
		let mut words = self.word_history(id);
		words.reverse();
		if let Some(node) = self.nodes.get(id) {
			if !node.word.is_root() {
				words.push(node.word);
			}
		}
		words
	}

	/// Saves the whole trie (dictionary and log-math included).
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Loads a trie written by [`Trie::save`].
	pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	/// Loads an ARPA model, going through a binary snapshot when possible.
	///
	/// - If `<stem>.bin` exists next to `arpa_path` and is not older than
	///   the ARPA file, it is loaded instead.
	/// - Otherwise the ARPA file is parsed (generate mode) and the snapshot
	///   is written for the next time.
	pub fn open<P: AsRef<Path>>(arpa_path: P, lmath: Arc<LogMath>) -> Result<Self> {
		let snapshot_path = build_output_path(&arpa_path, "bin")?;
		if snapshot_is_fresh(arpa_path.as_ref(), &snapshot_path) {
			info!("Loading snapshot {}", snapshot_path.display());
			let trie = Self::load_snapshot(&snapshot_path)?;
			if trie.lmath.config() == lmath.config() {
				return Ok(trie);
			}
			info!("Snapshot log base differs, re-reading {}", arpa_path.as_ref().display());
		}

		let mut trie = Self::new(None, lmath);
		trie.read_arpa_file(&arpa_path)?;
		trie.save(&snapshot_path)?;
		Ok(trie)
	}
}

/// Whether the snapshot exists and the ARPA file was not modified after it.
///
/// A snapshot without its ARPA file counts as fresh.
fn snapshot_is_fresh(arpa_path: &Path, snapshot_path: &Path) -> bool {
	let modified = |path: &Path| std::fs::metadata(path).and_then(|m| m.modified()).ok();
	match (modified(snapshot_path), modified(arpa_path)) {
		(Some(snapshot), Some(arpa)) => snapshot >= arpa,
		(Some(_), None) => true,
		(None, _) => false,
	}
}
