//! Signature verification for the relayer system.
//!
//! Recovers the signer of an EIP-712 `TransferWithAuthorization` payload and
//! validates the full authorization: validity window first, then replay
//! state, then the signature itself, each failure carrying a distinct
//! reason. Validation returns structured verdicts rather than errors so
//! batch flows continue past individual failures; only infrastructure
//! failures (the nonce store being unreachable) surface as hard errors.

use alloy_primitives::Address;
use alloy_sol_types::SolStruct;
use relayer_nonce::{NonceError, NonceKey, NonceService};
use relayer_types::{current_timestamp, parse_signature, SignedAuthorization};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Reasons an authorization can fail validation.
///
/// Callers can distinguish "expired" from "replayed" from "forged"; signer
/// mismatches always include the recovered address so a wrong signer can
/// be told apart from a corrupt signature.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VerificationError {
	/// The validity window has not opened yet.
	#[error("Authorization not yet valid (valid_after {valid_after})")]
	NotYetValid { valid_after: u64 },
	/// The validity window has passed.
	#[error("Authorization expired (valid_before {valid_before})")]
	Expired { valid_before: u64 },
	/// The nonce was already consumed for this sender and domain. The
	/// authorization is permanently unusable; retry requires a new nonce.
	#[error("Nonce already used")]
	NonceUsed,
	/// The signature could not be decoded or recovered.
	#[error("Malformed signature: {0}")]
	MalformedSignature(String),
	/// The signature recovered to a different address than claimed.
	#[error("Signer mismatch: expected {expected}, recovered {recovered}")]
	SignerMismatch {
		expected: Address,
		recovered: Address,
	},
}

/// Outcome of validating one authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
	pub valid: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<VerificationError>,
	/// The address recovery produced, when recovery succeeded at all.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub recovered_signer: Option<Address>,
}

impl Verdict {
	fn ok(recovered: Address) -> Self {
		Self {
			valid: true,
			error: None,
			recovered_signer: Some(recovered),
		}
	}

	fn invalid(error: VerificationError) -> Self {
		let recovered_signer = match &error {
			VerificationError::SignerMismatch { recovered, .. } => Some(*recovered),
			_ => None,
		};
		Self {
			valid: false,
			error: Some(error),
			recovered_signer,
		}
	}
}

/// Outcome of validating a batch of authorizations independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchVerification {
	pub all_valid: bool,
	/// Per-item verdicts in input order.
	pub results: Vec<Verdict>,
	pub valid_count: usize,
	pub invalid_count: usize,
}

/// Recovers the signer of a signed authorization.
///
/// Deterministic EIP-712 recovery; a malformed signature is a hard
/// failure, not a best-effort guess.
pub fn recover_signer(signed: &SignedAuthorization) -> Result<Address, VerificationError> {
	let signature = parse_signature(&signed.signature)
		.map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
	let digest = signed
		.message
		.as_sol_struct()
		.eip712_signing_hash(&signed.domain.eip712_domain());
	signature
		.recover_address_from_prehash(&digest)
		.map_err(|e| VerificationError::MalformedSignature(e.to_string()))
}

/// Checks whether the signature over the authorization was produced by the
/// expected signer. Address comparison is by value, so hex case never
/// matters.
pub fn verify_signature(signed: &SignedAuthorization, expected: Address) -> bool {
	recover_signer(signed).is_ok_and(|recovered| recovered == expected)
}

/// Verifier combining window, replay, and signature checks.
pub struct AuthorizationVerifier {
	nonces: Arc<NonceService>,
}

impl AuthorizationVerifier {
	/// Creates a verifier backed by the given nonce authority.
	pub fn new(nonces: Arc<NonceService>) -> Self {
		Self { nonces }
	}

	/// Validates one authorization against the current clock.
	pub async fn validate(&self, signed: &SignedAuthorization) -> Result<Verdict, NonceError> {
		self.validate_at(signed, current_timestamp()).await
	}

	/// Validates one authorization at an explicit timestamp.
	///
	/// Check order: (1) validity window, (2) nonce-not-used, (3) signature
	/// recovery and signer match, short-circuiting on the first failure.
	/// The cheap temporal checks run before any recovery work.
	pub async fn validate_at(
		&self,
		signed: &SignedAuthorization,
		now: u64,
	) -> Result<Verdict, NonceError> {
		let message = &signed.message;

		if now < message.valid_after {
			return Ok(Verdict::invalid(VerificationError::NotYetValid {
				valid_after: message.valid_after,
			}));
		}
		if now >= message.valid_before {
			return Ok(Verdict::invalid(VerificationError::Expired {
				valid_before: message.valid_before,
			}));
		}

		let key = NonceKey::new(message.from, signed.domain.chain_id);
		if self.nonces.is_used(&key, message.nonce).await? {
			return Ok(Verdict::invalid(VerificationError::NonceUsed));
		}

		match recover_signer(signed) {
			Ok(recovered) if recovered == message.from => Ok(Verdict::ok(recovered)),
			Ok(recovered) => Ok(Verdict::invalid(VerificationError::SignerMismatch {
				expected: message.from,
				recovered,
			})),
			Err(error) => Ok(Verdict::invalid(error)),
		}
	}

	/// Validates every authorization independently; one item's failure
	/// never blocks the others. Results preserve input order.
	pub async fn validate_batch_at(
		&self,
		items: &[SignedAuthorization],
		now: u64,
	) -> Result<BatchVerification, NonceError> {
		let mut results = Vec::with_capacity(items.len());
		for signed in items {
			results.push(self.validate_at(signed, now).await?);
		}
		let valid_count = results.iter().filter(|v| v.valid).count();
		let invalid_count = results.len() - valid_count;
		Ok(BatchVerification {
			all_valid: invalid_count == 0,
			results,
			valid_count,
			invalid_count,
		})
	}

	/// Records the authorization's nonce as consumed after execution, so
	/// any replay of the same message fails with [`VerificationError::NonceUsed`].
	pub async fn mark_executed(&self, signed: &SignedAuthorization) -> Result<(), NonceError> {
		let key = NonceKey::new(signed.message.from, signed.domain.chain_id);
		tracing::debug!(%key, nonce = %signed.message.nonce, "marking nonce consumed");
		self.nonces.mark_used(&key, signed.message.nonce).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, Bytes, B256, U256};
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use relayer_nonce::implementations::memory::MemoryNonceStore;
	use relayer_types::{AuthorizationMessage, DomainSpec};

	const NOW: u64 = 1_700_001_000;

	fn usdc_domain() -> DomainSpec {
		DomainSpec::new(
			"USD Coin",
			"2",
			1,
			address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
		)
	}

	fn message(from: Address) -> AuthorizationMessage {
		AuthorizationMessage {
			from,
			to: address!("2222222222222222222222222222222222222222"),
			value: U256::from(1_000_000u64),
			valid_after: 1_700_000_000,
			valid_before: 1_700_003_600,
			nonce: B256::with_last_byte(0),
		}
	}

	fn sign(signer: &PrivateKeySigner, message: &AuthorizationMessage) -> SignedAuthorization {
		let domain = usdc_domain();
		let digest = message
			.as_sol_struct()
			.eip712_signing_hash(&domain.eip712_domain());
		let signature = signer.sign_hash_sync(&digest).unwrap();
		SignedAuthorization::new(
			domain,
			message.clone(),
			Bytes::copy_from_slice(&signature.as_bytes()),
		)
	}

	fn verifier() -> AuthorizationVerifier {
		AuthorizationVerifier::new(Arc::new(NonceService::new(Box::new(
			MemoryNonceStore::new(),
		))))
	}

	#[tokio::test]
	async fn valid_signature_verifies() {
		let signer = PrivateKeySigner::random();
		let signed = sign(&signer, &message(signer.address()));

		assert!(verify_signature(&signed, signer.address()));
		let verdict = verifier().validate_at(&signed, NOW).await.unwrap();
		assert!(verdict.valid);
		assert_eq!(verdict.recovered_signer, Some(signer.address()));
	}

	#[tokio::test]
	async fn replay_after_mark_executed_is_rejected() {
		let signer = PrivateKeySigner::random();
		let signed = sign(&signer, &message(signer.address()));
		let verifier = verifier();

		assert!(verifier.validate_at(&signed, NOW).await.unwrap().valid);
		verifier.mark_executed(&signed).await.unwrap();

		// Identical message and signature, second time around.
		let verdict = verifier.validate_at(&signed, NOW).await.unwrap();
		assert!(!verdict.valid);
		assert_eq!(verdict.error, Some(VerificationError::NonceUsed));
	}

	#[tokio::test]
	async fn window_checks_short_circuit() {
		let signer = PrivateKeySigner::random();
		let signed = sign(&signer, &message(signer.address()));
		let verifier = verifier();

		let early = verifier.validate_at(&signed, 1_699_999_999).await.unwrap();
		assert_eq!(
			early.error,
			Some(VerificationError::NotYetValid {
				valid_after: 1_700_000_000
			})
		);

		let late = verifier.validate_at(&signed, 1_700_003_600).await.unwrap();
		assert_eq!(
			late.error,
			Some(VerificationError::Expired {
				valid_before: 1_700_003_600
			})
		);
	}

	#[tokio::test]
	async fn foreign_signer_reports_recovered_address() {
		let signer = PrivateKeySigner::random();
		let claimed = address!("1111111111111111111111111111111111111111");
		// Signed by `signer` but claiming to be from `claimed`.
		let signed = sign(&signer, &message(claimed));

		let verdict = verifier().validate_at(&signed, NOW).await.unwrap();
		assert!(!verdict.valid);
		match verdict.error {
			Some(VerificationError::SignerMismatch {
				expected,
				recovered,
			}) => {
				assert_eq!(expected, claimed);
				assert_eq!(verdict.recovered_signer, Some(recovered));
				assert_ne!(recovered, claimed);
			}
			other => panic!("expected signer mismatch, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn malformed_signature_is_a_distinct_error() {
		let signer = PrivateKeySigner::random();
		let mut signed = sign(&signer, &message(signer.address()));
		signed.signature = Bytes::copy_from_slice(&[0u8; 10]);

		let verdict = verifier().validate_at(&signed, NOW).await.unwrap();
		assert!(matches!(
			verdict.error,
			Some(VerificationError::MalformedSignature(_))
		));
		assert_eq!(verdict.recovered_signer, None);
	}

	#[tokio::test]
	async fn compact_signatures_recover_to_the_same_signer() {
		let signer = PrivateKeySigner::random();
		let message = message(signer.address());
		let domain = usdc_domain();
		let digest = message
			.as_sol_struct()
			.eip712_signing_hash(&domain.eip712_domain());
		let signature = signer.sign_hash_sync(&digest).unwrap();

		// Re-encode as ERC-2098: parity folded into the top bit of s.
		let mut compact = [0u8; 64];
		compact[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
		compact[32..].copy_from_slice(&signature.s().to_be_bytes::<32>());
		if signature.v() {
			compact[32] |= 0x80;
		}

		let signed = SignedAuthorization::new(domain, message, Bytes::copy_from_slice(&compact));
		assert_eq!(recover_signer(&signed).unwrap(), signer.address());
	}

	#[tokio::test]
	async fn batch_failures_do_not_block_siblings() {
		let signer = PrivateKeySigner::random();
		let good = sign(&signer, &message(signer.address()));

		let mut expired = message(signer.address());
		expired.valid_before = NOW - 1;
		expired.nonce = B256::with_last_byte(1);
		let expired = sign(&signer, &expired);

		let mut forged = sign(&signer, &message(signer.address()));
		forged.message.from = address!("1111111111111111111111111111111111111111");

		let verifier = verifier();
		let batch = verifier
			.validate_batch_at(&[good, expired, forged], NOW)
			.await
			.unwrap();

		assert!(!batch.all_valid);
		assert_eq!(batch.valid_count, 1);
		assert_eq!(batch.invalid_count, 2);
		assert!(batch.results[0].valid);
		assert!(matches!(
			batch.results[1].error,
			Some(VerificationError::Expired { .. })
		));
		assert!(matches!(
			batch.results[2].error,
			Some(VerificationError::SignerMismatch { .. })
		));
	}
}
