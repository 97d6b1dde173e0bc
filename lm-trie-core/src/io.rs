use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Opens a text file for buffered, line-oriented reading.
///
/// Models can be large, so nothing is read up front.
pub fn open_reader<P: AsRef<Path>>(filename: P) -> io::Result<BufReader<File>> {
	Ok(BufReader::new(File::open(filename)?))
}

/// Creates (or truncates) a file for buffered writing.
pub fn create_writer<P: AsRef<Path>>(filename: P) -> io::Result<BufWriter<File>> {
	Ok(BufWriter::new(File::create(filename)?))
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/model.arpa` + `"bin"` → `data/model.bin`
pub fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/model.arpa"` → `"model"`
/// - `"model.arpa"` → `"model"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_build_output_path() {
		let out = build_output_path("data/model.arpa", "bin").unwrap();
		assert_eq!(out, PathBuf::from("data/model.bin"));
	}

	#[test]
	fn test_get_filename() {
		assert_eq!(get_filename("./data/model.arpa").unwrap(), "model");
		assert_eq!(get_filename("model.arpa").unwrap(), "model");
	}

	#[test]
	fn test_list_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.arpa"), "").unwrap();
		fs::write(dir.path().join("a.arpa"), "").unwrap();
		fs::write(dir.path().join("a.bin"), "").unwrap();
		assert_eq!(list_files(dir.path(), "arpa").unwrap(), vec!["a.arpa", "b.arpa"]);
	}
}
