use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parameters of the integer log representation.
///
/// # Defaults
/// - `base`: `1.0001`, so one integer step is about `4.3e-5` in log10 units
/// - `min_prob`: `1e-20`, the probability floor returned for unknown words
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct LogMathConfig {
	pub base: f64,
	pub min_prob: f64,
}

impl Default for LogMathConfig {
	fn default() -> Self {
		Self { base: 1.0001, min_prob: 1e-20 }
	}
}

/// Converts between linear/log10 values and integer logs in `base`.
///
/// Every score stored in or returned by a trie is an integer log in
/// this base.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogMath {
	config: LogMathConfig,
	ln_base: f64,
}

impl LogMath {
	/// Creates a log-math service.
	///
	/// # Errors
	/// Returns an error if `base <= 1` or `min_prob` is not in `(0, 1)`.
	pub fn new(config: LogMathConfig) -> Result<Self> {
		if !(config.base > 1.0) || !config.base.is_finite() {
			return Err(Error::config(format!("log base must be > 1, got {}", config.base)));
		}
		if !(config.min_prob > 0.0 && config.min_prob < 1.0) {
			return Err(Error::config(format!(
				"minimum probability must be in (0, 1), got {}",
				config.min_prob
			)));
		}
		Ok(Self { config, ln_base: config.base.ln() })
	}

	pub fn config(&self) -> &LogMathConfig {
		&self.config
	}

	pub fn base(&self) -> f64 {
		self.config.base
	}

	/// Integer log of a linear probability.
	pub fn log(&self, p: f64) -> i32 {
		Self::saturate(p.ln() / self.ln_base)
	}

	/// Linear value of an integer log.
	pub fn exp(&self, l: i32) -> f64 {
		(l as f64 * self.ln_base).exp()
	}

	/// Integer log of a log10 value (as found in ARPA files).
	pub fn log10_to_log(&self, x: f64) -> i32 {
		Self::saturate(x * std::f64::consts::LN_10 / self.ln_base)
	}

	/// log10 value of an integer log.
	pub fn log_to_log10(&self, l: i32) -> f64 {
		l as f64 * self.ln_base / std::f64::consts::LN_10
	}

	/// Integer log of the configured probability floor.
	pub fn floor(&self) -> i32 {
		self.log(self.config.min_prob)
	}

	fn saturate(v: f64) -> i32 {
		v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
	}
}

impl Default for LogMath {
	fn default() -> Self {
		let config = LogMathConfig::default();
		Self { config, ln_base: config.base.ln() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_log10_conversion() {
		let lmath = LogMath::default();
		assert_eq!(lmath.log10_to_log(0.0), 0);
		let l = lmath.log10_to_log(-1.0);
		assert!((lmath.log_to_log10(l) + 1.0).abs() < 1e-4);
		assert_eq!(lmath.log(1.0), 0);
		assert!((lmath.exp(lmath.log(0.25)) - 0.25).abs() < 1e-4);
	}

	#[test]
	fn test_floor() {
		let lmath = LogMath::default();
		// ln(1e-20) / ln(1.0001)
		assert!((lmath.floor() + 460_540).abs() < 5);
	}

	#[test]
	fn test_invalid_config() {
		assert!(LogMath::new(LogMathConfig { base: 1.0, min_prob: 1e-20 }).is_err());
		assert!(LogMath::new(LogMathConfig { base: 1.0001, min_prob: 0.0 }).is_err());
		assert!(LogMath::new(LogMathConfig { base: 1.0001, min_prob: 1.5 }).is_err());
	}
}
