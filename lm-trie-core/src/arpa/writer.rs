use std::io::Write;
use std::path::Path;

use log::info;

use crate::error::{Error, Result};
use crate::io::create_writer;
use crate::logmath::LogMath;
use crate::model::trie::Trie;

/// Writes `trie` as an ARPA model.
///
/// # Format
/// - Counts are the live counts of the trie, not the header it was read from
/// - Records are `<log10 prob>\t<words, oldest first>[\t<log10 backoff>]`
///   in sorted (flat iteration) order, values with 6 decimal places, or
///   more when one step of the log base is finer than that
/// - The backoff column is written below the maximum order, and at the
///   maximum order only when it is not neutral
///
/// Values keep at least one decimal more than a step of the log base, so
/// reading the output back restores every stored value exactly.
pub fn write_arpa<W: Write>(trie: &Trie, mut out: W) -> Result<()> {
	let counts = trie.ngram_counts();
	let max_order = counts.len() - 1;

	writeln!(out, "\\data\\")?;
	for (n, count) in counts.iter().enumerate().skip(1) {
		writeln!(out, "ngram {}={}", n, count)?;
	}

	for n in 1..=max_order {
		writeln!(out)?;
		writeln!(out, "\\{}-grams:", n)?;
		write_records(trie, n, max_order, &mut out)?;
	}

	writeln!(out)?;
	writeln!(out, "\\end\\")?;
	out.flush()?;
	Ok(())
}

/// Decimal places that tell apart two adjacent integer logs (at least six).
fn decimals(lmath: &LogMath) -> usize {
	let step = lmath.log_to_log10(1).abs();
	let needed = (-step.log10()).ceil() as usize + 1;
	needed.max(6)
}

/// Writes the records of order `n`, one per line. Returns how many were written.
fn write_records<W: Write>(trie: &Trie, n: usize, max_order: usize, out: &mut W) -> Result<usize> {
	let lmath = trie.lmath();
	let prec = decimals(lmath);
	let mut written = 0;
	for id in trie.ngrams(n) {
		let node = trie.node(id).ok_or(Error::InvalidNode)?;
		let words = trie
			.words(id)
			.into_iter()
			.map(|wid| trie.dict().word_str(wid).ok_or(Error::UnknownWord(wid)))
			.collect::<Result<Vec<_>>>()?;

		let prob = lmath.log_to_log10(trie.expand(node.quantized_prob()));
		write!(out, "{:.*}\t{}", prec, prob, words.join(" "))?;
		if n < max_order || node.quantized_bowt() != 0 {
			let bowt = lmath.log_to_log10(trie.expand(node.quantized_bowt()));
			write!(out, "\t{:.*}", prec, bowt)?;
		}
		writeln!(out)?;
		written += 1;
	}
	Ok(written)
}

impl Trie {
	/// Writes the trie as ARPA text. See [`write_arpa`].
	pub fn write_arpa<W: Write>(&self, out: W) -> Result<()> {
		write_arpa(self, out)
	}

	/// Writes the trie to an ARPA file. See [`write_arpa`].
	pub fn write_arpa_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		info!("Writing ARPA model {}", path.as_ref().display());
		write_arpa(self, create_writer(path)?)
	}

	/// Writes the order-`n` records in ARPA form, without section marker.
	///
	/// Returns how many records were written.
	pub fn write_ngrams<W: Write>(&self, n: usize, mut out: W) -> Result<usize> {
		let max_order = self.ngram_counts().len() - 1;
		write_records(self, n, max_order, &mut out)
	}
}
