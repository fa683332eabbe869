//! Network and token configuration types for multi-chain relayer operations.
//!
//! This module defines the configuration structures for chain-specific
//! settings: the relay endpoint, native-token pricing used for fee quotes,
//! and the tokens whose transfers can be authorized on each chain.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Configuration for a token on a specific network.
///
/// Besides the contract address and decimals, each token carries the
/// EIP-712 domain name and version its contract advertises, since those
/// bind every signature to that exact contract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
	/// EIP-712 domain name of the token contract, e.g. "USD Coin".
	pub domain_name: String,
	/// EIP-712 domain version of the token contract, e.g. "2".
	pub domain_version: String,
}

/// Configuration for a single blockchain network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Human-readable chain name, e.g. "ethereum".
	pub name: String,
	/// Base URL of this chain's relay service.
	pub relayer_endpoint: String,
	/// Native token symbol, e.g. "ETH".
	pub native_symbol: String,
	/// Native token price in USD, used to convert gas cost for quoting.
	pub native_price_usd: f64,
	/// Gas price in gwei used when the caller supplies none.
	pub default_gas_price_gwei: f64,
	/// Tokens whose transfers can be authorized on this chain.
	pub tokens: Vec<TokenConfig>,
}

impl ChainConfig {
	/// Looks up a token by symbol, case-insensitively.
	pub fn token_by_symbol(&self, symbol: &str) -> Option<&TokenConfig> {
		self.tokens
			.iter()
			.find(|t| t.symbol.eq_ignore_ascii_case(symbol))
	}

	/// The chain's default token: the first configured one.
	pub fn default_token(&self) -> Option<&TokenConfig> {
		self.tokens.first()
	}
}

/// Networks configuration mapping chain IDs to their configurations.
pub type NetworksConfig = HashMap<u64, ChainConfig>;

/// Helper function to deserialize network configurations from TOML.
///
/// TOML tables cannot have numeric keys, so chain IDs arrive as strings
/// and are parsed into `u64` keys here.
///
/// # Errors
///
/// Returns a deserialization error if a chain ID key cannot be parsed as a
/// u64 or the underlying network configuration is invalid.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, ChainConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}
