use std::io::{BufRead, Lines};
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::dict::WordId;
use crate::error::{Error, Result};
use crate::io::open_reader;
use crate::model::node::NodeId;
use crate::model::trie::Trie;

/// Outcome of reading an ARPA file.
///
/// Every vector is indexed by order; index 0 is the zero-gram.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArpaStats {
	/// Counts from the `\data\` header.
	pub declared: Vec<usize>,
	/// N-grams stored in the trie.
	pub loaded: Vec<usize>,
	/// Lines skipped because of an unknown word or missing history.
	pub skipped: Vec<usize>,
}

/// Where the N-gram sections go next.
enum Section {
	/// A marker for a higher order was met.
	Order(usize),
	/// `\end\` was met.
	End,
}

/// Trimmed lines with 1-based line numbers.
struct LineSource<R> {
	lines: Lines<R>,
	line_no: usize,
}

impl<R: BufRead> LineSource<R> {
	fn next_line(&mut self) -> Result<Option<String>> {
		match self.lines.next() {
			None => Ok(None),
			Some(line) => {
				self.line_no += 1;
				Ok(Some(line?.trim().to_owned()))
			}
		}
	}

	fn error(&self, msg: impl Into<String>) -> Error {
		Error::format(self.line_no, msg)
	}
}

/// ARPA state machine: header, counts, then one section per order.
///
/// # Notes
/// - Input is not assumed sorted: the history of each line is looked up,
///   with a shortcut when it equals the previous line's history.
/// - Structural errors abort; unknown words and missing histories only
///   skip the line.
struct ArpaReader<'t, R> {
	trie: &'t mut Trie,
	src: LineSource<R>,
	stats: ArpaStats,
}

impl<'t, R: BufRead> ArpaReader<'t, R> {
	fn new(trie: &'t mut Trie, reader: R) -> Self {
		Self {
			trie,
			src: LineSource { lines: reader.lines(), line_no: 0 },
			stats: ArpaStats::default(),
		}
	}

	fn max_order(&self) -> usize {
		self.stats.declared.len().saturating_sub(1)
	}

	/// Skips everything up to and including `\data\`.
	fn skip_header(&mut self) -> Result<()> {
		while let Some(line) = self.src.next_line()? {
			if line == "\\data\\" {
				return Ok(());
			}
		}
		Err(self.src.error("unexpected end of file before \\data\\"))
	}

	/// Reads `ngram <order>=<count>` lines up to the first blank line.
	fn read_counts(&mut self) -> Result<()> {
		let mut counts = vec![1];
		loop {
			let Some(line) = self.src.next_line()? else {
				return Err(self.src.error("unexpected end of file in N-gram counts"));
			};
			if line.is_empty() {
				break;
			}
			let (order, count) = parse_count(&line)
				.ok_or_else(|| self.src.error(format!("invalid N-gram count line: {}", line)))?;
			info!("{}", line);
			if counts.len() <= order {
				counts.resize(order + 1, 0);
			}
			counts[order] = count;
		}

		let max_order = counts.len() - 1;
		self.trie.counts = counts.clone();
		self.trie.n = self.trie.n.max(max_order);
		self.stats.loaded = vec![0; max_order + 1];
		self.stats.skipped = vec![0; max_order + 1];
		self.stats.declared = counts;
		Ok(())
	}

	/// Reads the data lines of order `n`.
	fn read_ngrams(&mut self, n: usize) -> Result<Section> {
		let mut last_history = (n == 1).then_some(self.trie.root);

		while let Some(line) = self.src.next_line()? {
			if line.is_empty() {
				continue;
			}
			if line == "\\end\\" {
				return Ok(Section::End);
			}
			if line.starts_with('\\') {
				let order = parse_marker(&line)
					.ok_or_else(|| self.src.error(format!("expected an N-gram section marker, got {}", line)))?;
				if order > self.max_order() {
					return Err(self.src.error(format!("section {} exceeds the declared maximum order", line)));
				}
				info!("{}", line);
				if order > n {
					return Ok(Section::Order(order));
				}
				continue;
			}
			self.add_ngram_line(&line, n, &mut last_history)?;
		}
		Err(self.src.error("expected \\end\\ or an N-gram section marker"))
	}

	/// Parses one data line of order `n` and stores it.
	fn add_ngram_line(&mut self, line: &str, n: usize, last_history: &mut Option<NodeId>) -> Result<()> {
		if n > self.max_order() {
			return Err(self.src.error(format!("{}-grams were not declared in the header", n)));
		}
		let fields: Vec<&str> = line.split_whitespace().collect();
		if fields.len() != n + 1 && fields.len() != n + 2 {
			return Err(self.src.error(format!(
				"expected {} or {} fields for a {}-gram, got {}",
				n + 1,
				n + 2,
				n,
				fields.len()
			)));
		}

		let prob = self.parse_log10(fields[0])?;
		let bowt = match fields.get(n + 1) {
			Some(field) => self.parse_log10(field)?,
			None => 0.0,
		};

		let word = match self.trie.dict.word_id(fields[n]) {
			Some(wid) => wid,
			None if n == 1 && self.trie.generate => Arc::make_mut(&mut self.trie.dict).add_word(fields[n]),
			None => return self.skip(n, format!("unknown word {} in {}-gram, skipping", fields[n], n)),
		};

		// Most recent first.
		let mut history = Vec::with_capacity(n - 1);
		for i in 1..n {
			match self.trie.dict.word_id(fields[n - i]) {
				Some(wid) => history.push(wid),
				None => return self.skip(n, format!("unknown word {} in {}-gram, skipping", fields[n - i], n)),
			}
		}

		let parent = if n == 1 {
			self.trie.root
		} else {
			let cached = last_history.filter(|&h| self.history_matches(h, &history));
			match cached.or_else(|| self.trie.ngram(history[0], &history[1..])) {
				Some(h) => {
					*last_history = Some(h);
					h
				}
				None => return self.skip(n, format!("unknown history for N-gram: {}", line)),
			}
		};

		let node = self.trie.add_successor(parent, word)?;
		self.trie.set_scores(node, prob, bowt)?;
		self.stats.loaded[n] += 1;
		debug!("Added {}-gram {}", n, line);
		Ok(())
	}

	/// Whether `node` is the N-gram made of `history` (most recent first).
	fn history_matches(&self, node: NodeId, history: &[WordId]) -> bool {
		let mut cur = Some(node);
		for &wid in history {
			match cur.and_then(|id| self.trie.node(id)) {
				Some(h) if h.word() == wid => cur = h.parent(),
				_ => return false,
			}
		}
		cur == Some(self.trie.root)
	}

	/// Parses a log10 score. `nan` and `inf` parse as `f64` but are not scores.
	fn parse_log10(&self, field: &str) -> Result<f64> {
		match field.parse::<f64>() {
			Ok(v) if v.is_finite() => Ok(v),
			_ => Err(self.src.error(format!("invalid log10 value {}", field))),
		}
	}

	fn skip(&mut self, n: usize, msg: String) -> Result<()> {
		warn!("line {}: {}", self.src.line_no, msg);
		self.stats.skipped[n] += 1;
		Ok(())
	}

	fn log_summary(&self) {
		for n in 1..self.stats.declared.len() {
			let (declared, loaded, skipped) = (self.stats.declared[n], self.stats.loaded[n], self.stats.skipped[n]);
			info!("{}-grams: {} loaded, {} skipped, {} declared", n, loaded, skipped, declared);
			if loaded != declared {
				warn!("{}-gram count mismatch: header declares {}, loaded {}", n, declared, loaded);
			}
		}
	}
}

/// Parses `ngram <order>=<count>`.
fn parse_count(line: &str) -> Option<(usize, usize)> {
	let (order, count) = line.strip_prefix("ngram ")?.split_once('=')?;
	let order = order.trim().parse::<usize>().ok().filter(|&o| o > 0)?;
	let count = count.trim().parse::<usize>().ok()?;
	Some((order, count))
}

/// Parses `\<order>-grams:`.
fn parse_marker(line: &str) -> Option<usize> {
	let digits = line.strip_prefix('\\')?.strip_suffix("-grams:")?;
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	digits.parse().ok()
}

/// Reads an ARPA model into `trie`.
///
/// # Errors
/// Returns [`Error::Format`] on a malformed marker, count line or data line,
/// or when the input ends before `\end\`. The trie is then partially built
/// and must be discarded.
pub fn read_arpa<R: BufRead>(trie: &mut Trie, reader: R) -> Result<ArpaStats> {
	let mut parser = ArpaReader::new(trie, reader);
	parser.skip_header()?;
	parser.read_counts()?;

	let mut n = 1;
	while let Section::Order(next) = parser.read_ngrams(n)? {
		n = next;
	}

	parser.log_summary();
	Ok(parser.stats)
}

impl Trie {
	/// Reads an ARPA model from a reader. See [`read_arpa`].
	pub fn read_arpa<R: BufRead>(&mut self, reader: R) -> Result<ArpaStats> {
		read_arpa(self, reader)
	}

	/// Reads an ARPA model from a file. See [`read_arpa`].
	pub fn read_arpa_file<P: AsRef<Path>>(&mut self, path: P) -> Result<ArpaStats> {
		info!("Reading ARPA model {}", path.as_ref().display());
		read_arpa(self, open_reader(path)?)
	}
}
