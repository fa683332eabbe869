//! Authorization generation for the relayer system.
//!
//! This module builds the EIP-712 typed data for EIP-3009
//! `TransferWithAuthorization` messages: it combines a token domain, a fresh
//! nonce from the nonce authority, and a validity window into a signable
//! payload. It never signs; signing is delegated to the holder of the
//! private key. It also produces the ABI-encoded call data the consuming
//! token contract executes.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolCall, SolStruct};
use relayer_nonce::{NonceError, NonceKey, NonceService};
use relayer_types::{
	current_timestamp, parse_signature, AuthorizationMessage, DomainSpec, SignatureParseError,
	SignedAuthorization,
};
use std::sync::Arc;
use thiserror::Error;

sol! {
	/// EIP-3009 execution entrypoint on the token contract.
	interface IEip3009 {
		function transferWithAuthorization(
			address from,
			address to,
			uint256 value,
			uint256 validAfter,
			uint256 validBefore,
			bytes32 nonce,
			uint8 v,
			bytes32 r,
			bytes32 s
		) external;
	}
}

/// Errors that can occur while generating authorizations.
#[derive(Debug, Error)]
pub enum AuthorizationError {
	/// Error that occurs when a validity window is empty or inverted.
	#[error("Invalid validity window: {0}")]
	InvalidWindow(String),
	/// Error propagated from the nonce authority. Fails closed; no
	/// authorization is produced without a nonce.
	#[error(transparent)]
	Nonce(#[from] NonceError),
	/// Error that occurs when a signature cannot be decoded for encoding
	/// the on-chain call.
	#[error(transparent)]
	Signature(#[from] SignatureParseError),
}

/// The `[valid_after, valid_before)` range during which an authorization
/// is executable, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
	pub valid_after: u64,
	pub valid_before: u64,
}

impl ValidityWindow {
	/// Creates a window from explicit bounds.
	pub fn new(valid_after: u64, valid_before: u64) -> Result<Self, AuthorizationError> {
		if valid_after >= valid_before {
			return Err(AuthorizationError::InvalidWindow(format!(
				"valid_after {} must precede valid_before {}",
				valid_after, valid_before
			)));
		}
		Ok(Self {
			valid_after,
			valid_before,
		})
	}

	/// Creates a window opening now and lasting `duration_secs`.
	///
	/// A zero or negative duration is a caller error.
	pub fn starting_now(duration_secs: i64) -> Result<Self, AuthorizationError> {
		if duration_secs <= 0 {
			return Err(AuthorizationError::InvalidWindow(format!(
				"duration must be positive, got {}",
				duration_secs
			)));
		}
		let now = current_timestamp();
		Ok(Self {
			valid_after: now,
			valid_before: now + duration_secs as u64,
		})
	}
}

/// A fully built, not yet signed authorization.
#[derive(Debug, Clone)]
pub struct PreparedAuthorization {
	pub message: AuthorizationMessage,
	/// The complete EIP-712 typed-data object (domain, types, message).
	pub typed_data: TypedData,
	/// The signing hash the key holder must sign.
	pub digest: B256,
}

/// Generator combining domain, nonce, and validity window into signable
/// typed data.
pub struct AuthorizationGenerator {
	nonces: Arc<NonceService>,
}

impl AuthorizationGenerator {
	/// Creates a generator backed by the given nonce authority.
	pub fn new(nonces: Arc<NonceService>) -> Self {
		Self { nonces }
	}

	/// Builds one authorization for `from` paying `value` to `to`.
	///
	/// Pulls exactly one fresh nonce for (`from`, domain chain). The nonce
	/// is consumed once issued, whether or not the authorization is ever
	/// signed or submitted.
	pub async fn generate(
		&self,
		domain: &DomainSpec,
		from: Address,
		to: Address,
		value: U256,
		window: ValidityWindow,
	) -> Result<PreparedAuthorization, AuthorizationError> {
		let key = NonceKey::new(from, domain.chain_id);
		let issued = self.nonces.issue(&key).await?;

		let message = AuthorizationMessage {
			from,
			to,
			value,
			valid_after: window.valid_after,
			valid_before: window.valid_before,
			nonce: issued.nonce,
		};

		let payload = message.as_sol_struct();
		let eip712 = domain.eip712_domain();
		let digest = payload.eip712_signing_hash(&eip712);
		let typed_data = TypedData::from_struct(&payload, Some(eip712));
		debug_assert_eq!(typed_data.eip712_signing_hash().ok(), Some(digest));

		tracing::debug!(
			from = %from,
			to = %to,
			chain_id = domain.chain_id,
			sequence = issued.sequence,
			"generated authorization"
		);

		Ok(PreparedAuthorization {
			message,
			typed_data,
			digest,
		})
	}

	/// Builds one independent authorization per recipient.
	///
	/// Each gets its own nonce; nonces are never shared across items even
	/// within one batch.
	pub async fn generate_batch(
		&self,
		domain: &DomainSpec,
		from: Address,
		recipients: &[(Address, U256)],
		window: ValidityWindow,
	) -> Result<Vec<PreparedAuthorization>, AuthorizationError> {
		let mut prepared = Vec::with_capacity(recipients.len());
		for (to, value) in recipients {
			prepared.push(self.generate(domain, from, *to, *value, window).await?);
		}
		Ok(prepared)
	}
}

/// ABI-encodes the `transferWithAuthorization` call for a signed
/// authorization, ready for the consuming token contract.
pub fn transfer_with_authorization_calldata(
	signed: &SignedAuthorization,
) -> Result<Vec<u8>, AuthorizationError> {
	let signature = parse_signature(&signed.signature)?;
	let message = &signed.message;

	let call = IEip3009::transferWithAuthorizationCall {
		from: message.from,
		to: message.to,
		value: message.value,
		validAfter: U256::from(message.valid_after),
		validBefore: U256::from(message.valid_before),
		nonce: message.nonce,
		v: 27 + signature.v() as u8,
		r: signature.r().into(),
		s: signature.s().into(),
	};
	Ok(call.abi_encode())
}
