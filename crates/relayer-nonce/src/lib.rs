//! Nonce authority for the authorization relayer system.
//!
//! This module issues the unique, strictly increasing nonces that make each
//! transfer authorization single-use. Counters are independent per
//! (address, chain) pair and safe under unbounded concurrent callers: the
//! backing store must provide an atomic increment-and-return primitive, so
//! no two callers ever observe the same value and no value is silently
//! skipped. An issued nonce is considered consumed; abandoned in-flight
//! nonces are never returned to the pool.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during nonce operations.
#[derive(Debug, Error)]
pub enum NonceError {
	/// Error that occurs when the backing store is unreachable or fails.
	/// The operation fails closed; no nonce is issued.
	#[error("Nonce store error: {0}")]
	Backend(String),
	/// Error that occurs when a counter would overflow.
	#[error("Nonce counter exhausted for {0}")]
	Exhausted(String),
}

/// Key identifying an independent nonce counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonceKey {
	pub address: Address,
	pub chain_id: u64,
}

impl NonceKey {
	/// Creates a new nonce key.
	pub fn new(address: Address, chain_id: u64) -> Self {
		Self { address, chain_id }
	}
}

impl std::fmt::Display for NonceKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.chain_id, self.address)
	}
}

/// Trait defining the low-level interface for nonce store backends.
///
/// Implementations must back `get_and_increment` with a single atomic
/// read-and-advance operation, not a read followed by a write, and must
/// not serialize operations on different keys against each other.
#[async_trait]
pub trait NonceStore: Send + Sync {
	/// Atomically returns the current counter value for the key and
	/// advances it by one. A never-seen key starts at 0.
	async fn get_and_increment(&self, key: &NonceKey) -> Result<u64, NonceError>;

	/// Forces the next issued value for the key.
	async fn set_nonce(&self, key: &NonceKey, value: u64) -> Result<(), NonceError>;

	/// Returns the counter for the key to 0.
	async fn reset(&self, key: &NonceKey) -> Result<(), NonceError>;

	/// Records a wire nonce as consumed for the key.
	async fn mark_used(&self, key: &NonceKey, nonce: B256) -> Result<(), NonceError>;

	/// Checks whether a wire nonce has been consumed for the key.
	async fn is_used(&self, key: &NonceKey, nonce: B256) -> Result<bool, NonceError>;
}

/// A nonce issued by the authority: the raw sequence number plus the
/// `bytes32` form carried in the authorization message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedNonce {
	pub sequence: u64,
	pub nonce: B256,
}

/// Derives the on-wire `bytes32` nonce from a sequence number.
///
/// Big-endian encoding of the sequence as a `uint256`, so counters map
/// into the arbitrary-`bytes32` nonce space EIP-3009 contracts accept.
pub fn nonce_from_sequence(sequence: u64) -> B256 {
	B256::from(U256::from(sequence))
}

/// Service that issues nonces and tracks consumption.
///
/// Wraps a pluggable [`NonceStore`] backend so multiple service instances
/// can share consistent state through an external store.
pub struct NonceService {
	backend: Box<dyn NonceStore>,
}

impl NonceService {
	/// Creates a new NonceService with the specified backend.
	pub fn new(backend: Box<dyn NonceStore>) -> Self {
		Self { backend }
	}

	/// Issues the next nonce for the given (address, chain) pair.
	///
	/// Strictly increasing from 0 per key; never hands the same value to
	/// two callers. If the store is unreachable the call fails closed.
	pub async fn issue(&self, key: &NonceKey) -> Result<IssuedNonce, NonceError> {
		let sequence = self.backend.get_and_increment(key).await?;
		tracing::debug!(key = %key, sequence, "issued nonce");
		Ok(IssuedNonce {
			sequence,
			nonce: nonce_from_sequence(sequence),
		})
	}

	/// Forces the next issued sequence for the key.
	pub async fn set_nonce(&self, key: &NonceKey, value: u64) -> Result<(), NonceError> {
		self.backend.set_nonce(key, value).await
	}

	/// Resets the key's counter to 0.
	pub async fn reset(&self, key: &NonceKey) -> Result<(), NonceError> {
		self.backend.reset(key).await
	}

	/// Records a wire nonce as consumed for the key.
	pub async fn mark_used(&self, key: &NonceKey, nonce: B256) -> Result<(), NonceError> {
		self.backend.mark_used(key, nonce).await
	}

	/// Checks whether a wire nonce has been consumed for the key.
	pub async fn is_used(&self, key: &NonceKey, nonce: B256) -> Result<bool, NonceError> {
		self.backend.is_used(key, nonce).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryNonceStore;
	use alloy_primitives::address;

	fn service() -> NonceService {
		NonceService::new(Box::new(MemoryNonceStore::new()))
	}

	#[tokio::test]
	async fn issues_sequence_and_wire_nonce() {
		let service = service();
		let key = NonceKey::new(address!("1111111111111111111111111111111111111111"), 1);

		let first = service.issue(&key).await.unwrap();
		let second = service.issue(&key).await.unwrap();
		assert_eq!(first.sequence, 0);
		assert_eq!(second.sequence, 1);
		assert_eq!(first.nonce, nonce_from_sequence(0));
		assert_ne!(first.nonce, second.nonce);
	}

	#[tokio::test]
	async fn used_set_tracks_wire_nonces() {
		let service = service();
		let key = NonceKey::new(address!("1111111111111111111111111111111111111111"), 1);

		let issued = service.issue(&key).await.unwrap();
		assert!(!service.is_used(&key, issued.nonce).await.unwrap());
		service.mark_used(&key, issued.nonce).await.unwrap();
		assert!(service.is_used(&key, issued.nonce).await.unwrap());
	}

	#[test]
	fn wire_nonce_is_big_endian_sequence() {
		let nonce = nonce_from_sequence(0x01_02);
		assert_eq!(nonce.0[31], 0x02);
		assert_eq!(nonce.0[30], 0x01);
		assert!(nonce.0[..30].iter().all(|b| *b == 0));
	}
}
