//! Configuration module for the authorization relayer.
//!
//! Loads the full pipeline configuration from a TOML file and validates it
//! before anything runs: the per-chain network registry, the fee schedule,
//! batch limits, submission settings, and the optional local signing
//! account. Everything is explicit structs handed to constructors; there
//! are no module-level singletons.

use relayer_batch::BatchLimits;
use relayer_fee::FeeSchedule;
use relayer_types::{deserialize_networks, NetworksConfig, SecretString};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the relayer pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Network and token configurations, keyed by chain ID.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	/// Fee schedule for relayer quotes.
	#[serde(default)]
	pub fees: FeeSchedule,
	/// Structural limits for batch validation.
	#[serde(default)]
	pub batch: BatchLimits,
	/// Submission settings for the relayer HTTP client.
	#[serde(default)]
	pub submission: SubmissionConfig,
	/// Local signing account, when this instance signs authorizations
	/// itself rather than receiving pre-signed ones.
	pub account: Option<AccountConfig>,
}

/// Submission settings for the relayer HTTP client.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
	/// Per-request timeout for relay calls.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
	30
}

impl Default for SubmissionConfig {
	fn default() -> Self {
		Self {
			timeout_seconds: default_timeout_seconds(),
		}
	}
}

/// Local signing account configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
	/// Hex-encoded private key; redacted from all output.
	pub private_key: SecretString,
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Parses and validates configuration from a TOML string.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates cross-field coherence of the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"at least one network must be configured".to_string(),
			));
		}

		for (chain_id, chain) in &self.networks {
			if !chain.relayer_endpoint.starts_with("http://")
				&& !chain.relayer_endpoint.starts_with("https://")
			{
				return Err(ConfigError::Validation(format!(
					"chain {}: relayer_endpoint '{}' must be an http(s) URL",
					chain_id, chain.relayer_endpoint
				)));
			}
			if chain.native_price_usd <= 0.0 {
				return Err(ConfigError::Validation(format!(
					"chain {}: native_price_usd must be positive",
					chain_id
				)));
			}
			if chain.default_gas_price_gwei <= 0.0 {
				return Err(ConfigError::Validation(format!(
					"chain {}: default_gas_price_gwei must be positive",
					chain_id
				)));
			}
		}

		if self.fees.markup_bps > 10_000 {
			return Err(ConfigError::Validation(
				"fees.markup_bps must not exceed 10000 (100%)".to_string(),
			));
		}
		if self.fees.max_batch_discount_bps >= 10_000 {
			return Err(ConfigError::Validation(
				"fees.max_batch_discount_bps must be below 10000 (100%)".to_string(),
			));
		}

		if self.batch.max_batch_size == 0 {
			return Err(ConfigError::Validation(
				"batch.max_batch_size must be positive".to_string(),
			));
		}
		if self.batch.min_amount < 0.0 {
			return Err(ConfigError::Validation(
				"batch.min_amount must not be negative".to_string(),
			));
		}
		if self.batch.min_amount >= self.batch.max_amount {
			return Err(ConfigError::Validation(
				"batch.min_amount must be below batch.max_amount".to_string(),
			));
		}

		if self.submission.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"submission.timeout_seconds must be positive".to_string(),
			));
		}

		Ok(())
	}
}
