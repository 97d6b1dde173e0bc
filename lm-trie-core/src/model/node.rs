use serde::{Deserialize, Serialize};

use crate::dict::WordId;

/// Handle to a node in a [`NodeStore`].
///
/// A handle carries the generation of the slot it was issued for, so
/// a handle to a deleted node never resolves to the node that later
/// reuses its slot.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
	index: u32,
	generation: u32,
}

/// One N-gram.
///
/// # Invariants
/// - `successors` is sorted by the dictionary string of each child's word
/// - `parent` is `None` only for the root
/// - Scores are quantized (already shifted right by the trie's `shift`)
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrieNode {
	pub(crate) word: WordId,
	pub(crate) log_prob: i16,
	pub(crate) log_bowt: i16,
	pub(crate) parent: Option<NodeId>,
	pub(crate) successors: Vec<NodeId>,
}

impl TrieNode {
	pub(crate) fn new(word: WordId, parent: Option<NodeId>) -> Self {
		Self { word, log_prob: 0, log_bowt: 0, parent, successors: Vec::new() }
	}

	/// Last word of the N-gram (`WordId::ROOT` for the root).
	pub fn word(&self) -> WordId {
		self.word
	}

	/// The history node, i.e. the N-gram without its last word.
	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	/// Children in sorted word order.
	pub fn successors(&self) -> &[NodeId] {
		&self.successors
	}

	/// Quantized log probability, as stored.
	pub fn quantized_prob(&self) -> i16 {
		self.log_prob
	}

	/// Quantized log backoff weight, as stored.
	pub fn quantized_bowt(&self) -> i16 {
		self.log_bowt
	}
}

#[derive(Serialize, Deserialize, Clone, Debug)]
enum Slot {
	Occupied { generation: u32, node: TrieNode },
	Vacant { generation: u32, next_free: Option<u32> },
}

/// Pooled allocation of trie nodes.
///
/// # Responsibilities
/// - Own every node for the lifetime of the trie
/// - Hand out generational handles
/// - Recycle freed slots before growing
///
/// # Invariants
/// - `free_head` chains every vacant slot exactly once
/// - `live` equals the number of occupied slots
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct NodeStore {
	slots: Vec<Slot>,
	free_head: Option<u32>,
	live: usize,
}

impl NodeStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `node` and returns its handle, reusing a freed slot if any.
	pub fn alloc(&mut self, node: TrieNode) -> NodeId {
		self.live += 1;
		if let Some(index) = self.free_head {
			let slot = &mut self.slots[index as usize];
			if let Slot::Vacant { generation, next_free } = *slot {
				let generation = generation.wrapping_add(1);
				self.free_head = next_free;
				*slot = Slot::Occupied { generation, node };
				return NodeId { index, generation };
			}
		}
		let index = self.slots.len() as u32;
		self.slots.push(Slot::Occupied { generation: 0, node });
		NodeId { index, generation: 0 }
	}

	/// Releases the node behind `id` and returns it.
	///
	/// Returns `None` if the handle is stale.
	pub fn free(&mut self, id: NodeId) -> Option<TrieNode> {
		let slot = self.slots.get_mut(id.index as usize)?;
		if !matches!(&*slot, Slot::Occupied { generation, .. } if *generation == id.generation) {
			return None;
		}
		let vacant = Slot::Vacant { generation: id.generation, next_free: self.free_head };
		match std::mem::replace(slot, vacant) {
			Slot::Occupied { node, .. } => {
				self.free_head = Some(id.index);
				self.live -= 1;
				Some(node)
			}
			Slot::Vacant { .. } => None,
		}
	}

	pub fn get(&self, id: NodeId) -> Option<&TrieNode> {
		match self.slots.get(id.index as usize)? {
			Slot::Occupied { generation, node } if *generation == id.generation => Some(node),
			_ => None,
		}
	}

	pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TrieNode> {
		match self.slots.get_mut(id.index as usize)? {
			Slot::Occupied { generation, node } if *generation == id.generation => Some(node),
			_ => None,
		}
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.get(id).is_some()
	}

	/// Number of live nodes.
	pub fn len(&self) -> usize {
		self.live
	}

	pub fn is_empty(&self) -> bool {
		self.live == 0
	}

	/// Number of slots ever allocated (live or free).
	pub fn capacity(&self) -> usize {
		self.slots.len()
	}
}
