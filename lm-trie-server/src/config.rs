use std::env;
use std::path::PathBuf;

use log::warn;

/// Server settings, read from the environment.
///
/// - `LM_TRIE_DATA_DIR`: directory holding the `.arpa` models (`./data`)
/// - `LM_TRIE_HOST`: bind address (`127.0.0.1`)
/// - `LM_TRIE_PORT`: bind port (`5000`)
#[derive(Clone, Debug)]
pub struct ServerConfig {
	pub data_dir: PathBuf,
	pub host: String,
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("./data"),
			host: "127.0.0.1".to_owned(),
			port: 5000,
		}
	}
}

impl ServerConfig {
	pub fn from_env() -> Self {
		Self::from_vars(|key| env::var(key).ok())
	}

	fn from_vars<F: Fn(&str) -> Option<String>>(var: F) -> Self {
		let mut config = Self::default();
		if let Some(dir) = var("LM_TRIE_DATA_DIR") {
			config.data_dir = PathBuf::from(dir);
		}
		if let Some(host) = var("LM_TRIE_HOST") {
			config.host = host;
		}
		if let Some(port) = var("LM_TRIE_PORT") {
			match port.parse() {
				Ok(p) => config.port = p,
				Err(_) => warn!("Ignoring invalid LM_TRIE_PORT '{}'", port),
			}
		}
		config
	}

	/// Path of the ARPA file for a model name, or `None` if the name would
	/// leave the data directory.
	pub fn model_path(&self, name: &str) -> Option<PathBuf> {
		if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
			return None;
		}
		Some(self.data_dir.join(format!("{}.arpa", name)))
	}
}
