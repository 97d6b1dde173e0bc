use super::node::NodeId;
use super::trie::{Trie, WordOrder};

/// Cursor over a successor list of a [`Trie`].
///
/// The cursor points at `successors(parent)[pos]`. In flat mode it moves on
/// to the next node of the same depth when a list runs out, which visits
/// every N-gram of one order in sorted order without a per-order index.
/// In local mode it stops at the end of the list.
///
/// A finished cursor has no parent; every accessor then returns `None`.
#[derive(Clone, Debug)]
pub struct NgramCursor<'a> {
	trie: &'a Trie,
	parent: Option<NodeId>,
	pos: usize,
	flat: bool,
}

impl<'a> NgramCursor<'a> {
	/// Moves to the next entry. Returns `false` once iteration has ended.
	pub fn advance(&mut self) -> bool {
		let Some(parent) = self.parent else {
			return false;
		};
		self.pos += 1;
		if self.pos >= self.trie.successor_count(parent) {
			self.pos = 0;
			self.parent = if self.flat {
				self.trie.next_at_depth(parent).and_then(|next| self.trie.with_successors_from(next))
			} else {
				None
			};
		}
		self.parent.is_some()
	}

	/// Moves up to the current parent's own list, pointing at the parent.
	///
	/// Ends iteration when the cursor is already among the root's successors.
	pub fn up(&mut self) -> bool {
		let Some(parent) = self.parent else {
			return false;
		};
		let grandparent = self.trie.node(parent).and_then(|node| node.parent());
		match grandparent {
			Some(gp) => {
				self.pos = self.trie.position_in(gp, parent).unwrap_or(0);
				self.parent = Some(gp);
			}
			None => self.parent = None,
		}
		self.parent.is_some()
	}

	/// Moves into the list of the current entry.
	///
	/// Ends iteration when the current entry has no successors of its own.
	pub fn down(&mut self) -> bool {
		let child = self.get();
		self.pos = 0;
		self.parent = child.filter(|&c| self.trie.successor_count(c) > 0);
		self.parent.is_some()
	}

	/// Current entry, or `None` past the end.
	pub fn get(&self) -> Option<NodeId> {
		let parent = self.trie.node(self.parent?)?;
		parent.successors().get(self.pos).copied()
	}

	/// Node whose successor list is being walked.
	pub fn get_parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn is_done(&self) -> bool {
		self.get().is_none()
	}
}

impl<'a> IntoIterator for NgramCursor<'a> {
	type Item = NodeId;
	type IntoIter = Ngrams<'a>;

	/// Starts at the current entry.
	fn into_iter(self) -> Ngrams<'a> {
		Ngrams { cursor: self, started: false }
	}
}

/// [`Iterator`] adapter over an [`NgramCursor`].
#[derive(Clone, Debug)]
pub struct Ngrams<'a> {
	cursor: NgramCursor<'a>,
	started: bool,
}

impl Iterator for Ngrams<'_> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		if self.started {
			self.cursor.advance();
		}
		self.started = true;
		self.cursor.get()
	}
}

impl Trie {
	/// Cursor over every N-gram of order `n`, in sorted order.
	///
	/// The cursor is already finished if the trie holds no such N-gram.
	pub fn ngrams(&self, n: usize) -> NgramCursor<'_> {
		let parent = if n == 0 {
			None
		} else {
			self.first_at_depth(n - 1).and_then(|first| self.with_successors_from(first))
		};
		NgramCursor { trie: self, parent, pos: 0, flat: true }
	}

	/// Cursor over the successors of one node.
	pub fn successors(&self, node: NodeId) -> NgramCursor<'_> {
		let parent = Some(node).filter(|&id| self.successor_count(id) > 0);
		NgramCursor { trie: self, parent, pos: 0, flat: false }
	}

	fn successor_count(&self, id: NodeId) -> usize {
		self.node(id).map_or(0, |node| node.successors().len())
	}

	/// Index of `child` in `parent`'s successor list.
	fn position_in(&self, parent: NodeId, child: NodeId) -> Option<usize> {
		let list = self.node(parent)?.successors();
		let word = self.node(child)?.word();
		let start = WordOrder::new(&self.dict, &self.nodes).bisect_left(list, word);
		list[start..].iter().position(|&id| id == child).map(|i| start + i)
	}

	/// First node at `depth` in sorted order.
	fn first_at_depth(&self, depth: usize) -> Option<NodeId> {
		let mut node = self.root;
		for _ in 0..depth {
			let parent = self.with_successors_from(node)?;
			node = *self.node(parent)?.successors().first()?;
		}
		Some(node)
	}

	/// `node` itself if it has successors, else the next such node at its depth.
	fn with_successors_from(&self, mut node: NodeId) -> Option<NodeId> {
		while self.successor_count(node) == 0 {
			node = self.next_at_depth(node)?;
		}
		Some(node)
	}

	/// Next node at the same depth as `node`, in sorted order.
	///
	/// Takes the next sibling; past the last sibling, climbs to the parent's
	/// next node at its own depth and descends into its first successor.
	pub(crate) fn next_at_depth(&self, node: NodeId) -> Option<NodeId> {
		let parent = self.node(node)?.parent()?;
		let pos = self.position_in(parent, node)?;
		if let Some(&next) = self.node(parent)?.successors().get(pos + 1) {
			return Some(next);
		}
		let uncle = self.next_at_depth(parent)?;
		let uncle = self.with_successors_from(uncle)?;
		self.node(uncle)?.successors().first().copied()
	}
}
