//! In-memory nonce store backend.
//!
//! Counters live in a sharded concurrent map keyed by (address, chain),
//! each backed by an atomic integer, so `get_and_increment` is a single
//! atomic fetch-add and operations on different keys never serialize
//! against each other. Suitable for a single service instance and for
//! tests; multi-instance deployments plug a shared store (e.g. Redis INCR)
//! behind the same trait.

use crate::{NonceError, NonceKey, NonceStore};
use alloy_primitives::B256;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory nonce store implementation.
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
	/// Per-key counters; the atomic provides the read-and-advance.
	counters: DashMap<NonceKey, AtomicU64>,
	/// Wire nonces already consumed, per key.
	used: DashSet<(NonceKey, B256)>,
}

impl MemoryNonceStore {
	/// Creates a new empty store.
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
	async fn get_and_increment(&self, key: &NonceKey) -> Result<u64, NonceError> {
		let entry = self.counters.entry(*key).or_insert_with(|| AtomicU64::new(0));
		// Compare-exchange so the counter can never wrap past MAX and hand
		// out 0 again; an exhausted key stays exhausted.
		let mut current = entry.load(Ordering::SeqCst);
		loop {
			if current == u64::MAX {
				return Err(NonceError::Exhausted(key.to_string()));
			}
			match entry.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
			{
				Ok(value) => return Ok(value),
				Err(actual) => current = actual,
			}
		}
	}

	async fn set_nonce(&self, key: &NonceKey, value: u64) -> Result<(), NonceError> {
		self.counters.insert(*key, AtomicU64::new(value));
		Ok(())
	}

	async fn reset(&self, key: &NonceKey) -> Result<(), NonceError> {
		self.counters.insert(*key, AtomicU64::new(0));
		Ok(())
	}

	async fn mark_used(&self, key: &NonceKey, nonce: B256) -> Result<(), NonceError> {
		self.used.insert((*key, nonce));
		Ok(())
	}

	async fn is_used(&self, key: &NonceKey, nonce: B256) -> Result<bool, NonceError> {
		Ok(self.used.contains(&(*key, nonce)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use std::collections::HashSet;
	use std::sync::Arc;

	#[tokio::test]
	async fn sequential_issues_are_gapless() {
		let store = MemoryNonceStore::new();
		let key = NonceKey::new(address!("1111111111111111111111111111111111111111"), 1);

		for expected in 0..50u64 {
			assert_eq!(store.get_and_increment(&key).await.unwrap(), expected);
		}
	}

	#[tokio::test]
	async fn concurrent_issues_never_collide() {
		let store = Arc::new(MemoryNonceStore::new());
		let key = NonceKey::new(address!("1111111111111111111111111111111111111111"), 137);

		let mut handles = Vec::new();
		for _ in 0..100 {
			let store = Arc::clone(&store);
			handles.push(tokio::spawn(async move {
				store.get_and_increment(&key).await.unwrap()
			}));
		}

		let mut seen = HashSet::new();
		for handle in handles {
			assert!(seen.insert(handle.await.unwrap()));
		}
		// Exactly {0..99}: no duplicates, no gaps.
		assert_eq!(seen, (0..100u64).collect::<HashSet<_>>());
	}

	#[tokio::test]
	async fn keys_are_independent() {
		let store = MemoryNonceStore::new();
		let alice = NonceKey::new(address!("1111111111111111111111111111111111111111"), 1);
		let alice_polygon = NonceKey::new(alice.address, 137);
		let bob = NonceKey::new(address!("2222222222222222222222222222222222222222"), 1);

		store.get_and_increment(&alice).await.unwrap();
		store.get_and_increment(&alice).await.unwrap();

		// Same address on another chain and another address both start at 0.
		assert_eq!(store.get_and_increment(&alice_polygon).await.unwrap(), 0);
		assert_eq!(store.get_and_increment(&bob).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn set_and_reset_move_the_counter() {
		let store = MemoryNonceStore::new();
		let key = NonceKey::new(address!("1111111111111111111111111111111111111111"), 1);

		store.set_nonce(&key, 42).await.unwrap();
		assert_eq!(store.get_and_increment(&key).await.unwrap(), 42);
		assert_eq!(store.get_and_increment(&key).await.unwrap(), 43);

		store.reset(&key).await.unwrap();
		assert_eq!(store.get_and_increment(&key).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn exhausted_counter_never_reissues() {
		let store = MemoryNonceStore::new();
		let key = NonceKey::new(address!("1111111111111111111111111111111111111111"), 1);

		store.set_nonce(&key, u64::MAX - 1).await.unwrap();
		assert_eq!(store.get_and_increment(&key).await.unwrap(), u64::MAX - 1);

		// The counter is now at MAX; every further call fails and the
		// counter stays put instead of wrapping back to 0.
		assert!(matches!(
			store.get_and_increment(&key).await,
			Err(NonceError::Exhausted(_))
		));
		assert!(matches!(
			store.get_and_increment(&key).await,
			Err(NonceError::Exhausted(_))
		));
	}

	#[tokio::test]
	async fn used_set_is_per_key() {
		let store = MemoryNonceStore::new();
		let key = NonceKey::new(address!("1111111111111111111111111111111111111111"), 1);
		let other = NonceKey::new(key.address, 137);
		let nonce = B256::with_last_byte(7);

		store.mark_used(&key, nonce).await.unwrap();
		assert!(store.is_used(&key, nonce).await.unwrap());
		assert!(!store.is_used(&other, nonce).await.unwrap());
	}
}
