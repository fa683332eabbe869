//! EIP-712 domain and EIP-3009 authorization message types.
//!
//! An authorization is a `TransferWithAuthorization` message bound to a
//! specific token contract and chain through its EIP-712 domain. The holder
//! signs it off-chain; a relayer later submits it and pays the gas.

use alloy_primitives::{Address, Bytes, Signature, B256, U256};
use alloy_sol_types::{sol, Eip712Domain};
use serde::{Deserialize, Serialize};
use thiserror::Error;

sol! {
	/// EIP-3009 transfer authorization payload, hashed per EIP-712.
	#[derive(Serialize, Deserialize)]
	struct TransferWithAuthorization {
		address from;
		address to;
		uint256 value;
		uint256 validAfter;
		uint256 validBefore;
		bytes32 nonce;
	}
}

/// The EIP-712 domain a signature is bound to.
///
/// All four fields must match the verifying contract's actual domain
/// exactly; any difference makes recovery yield a different signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSpec {
	/// Token contract name, e.g. "USD Coin".
	pub name: String,
	/// Domain version, e.g. "2".
	pub version: String,
	/// Chain the verifying contract is deployed on.
	pub chain_id: u64,
	/// Address of the token contract that will execute the transfer.
	pub verifying_contract: Address,
}

impl DomainSpec {
	/// Creates a new domain specification.
	pub fn new(
		name: impl Into<String>,
		version: impl Into<String>,
		chain_id: u64,
		verifying_contract: Address,
	) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
			chain_id,
			verifying_contract,
		}
	}

	/// Converts this specification into an alloy [`Eip712Domain`] for hashing.
	pub fn eip712_domain(&self) -> Eip712Domain {
		Eip712Domain::new(
			Some(self.name.clone().into()),
			Some(self.version.clone().into()),
			Some(U256::from(self.chain_id)),
			Some(self.verifying_contract),
			None,
		)
	}
}

/// An unsigned transfer authorization message.
///
/// `value` is in the token's smallest unit. The validity window is
/// `[valid_after, valid_before)` in Unix seconds. The nonce is unique per
/// (`from`, domain) and is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationMessage {
	pub from: Address,
	pub to: Address,
	pub value: U256,
	pub valid_after: u64,
	pub valid_before: u64,
	pub nonce: B256,
}

impl AuthorizationMessage {
	/// Converts into the solidity struct used for EIP-712 hashing.
	pub fn as_sol_struct(&self) -> TransferWithAuthorization {
		TransferWithAuthorization {
			from: self.from,
			to: self.to,
			value: self.value,
			validAfter: U256::from(self.valid_after),
			validBefore: U256::from(self.valid_before),
			nonce: self.nonce,
		}
	}
}

/// An authorization message together with its signature and domain.
///
/// Immutable once created; producing another authorization for the same
/// sender requires a fresh nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
	pub domain: DomainSpec,
	pub message: AuthorizationMessage,
	/// 65-byte r||s||v signature, or 64-byte ERC-2098 compact form.
	pub signature: Bytes,
}

impl SignedAuthorization {
	/// Creates a signed authorization from its parts.
	pub fn new(domain: DomainSpec, message: AuthorizationMessage, signature: Bytes) -> Self {
		Self {
			domain,
			message,
			signature,
		}
	}
}

/// Errors raised when decoding a raw signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
	/// Signatures must be 65 bytes (r||s||v) or 64 bytes (ERC-2098).
	#[error("Invalid signature length {0}, expected 64 or 65 bytes")]
	InvalidLength(usize),
	/// The recovery byte of a 65-byte signature was not 0, 1, 27 or 28.
	#[error("Invalid recovery id {0}")]
	InvalidRecoveryId(u8),
}

/// Decodes a 65-byte r||s||v or 64-byte ERC-2098 compact signature.
///
/// Malformed input is a hard error, never a best-effort guess.
pub fn parse_signature(bytes: &[u8]) -> Result<Signature, SignatureParseError> {
	match bytes.len() {
		65 => {
			let r = U256::from_be_slice(&bytes[..32]);
			let s = U256::from_be_slice(&bytes[32..64]);
			let parity = match bytes[64] {
				0 | 27 => false,
				1 | 28 => true,
				v => return Err(SignatureParseError::InvalidRecoveryId(v)),
			};
			Ok(Signature::new(r, s, parity))
		}
		64 => {
			// ERC-2098: the parity bit rides on the top bit of s.
			let r = U256::from_be_slice(&bytes[..32]);
			let mut y_and_s = [0u8; 32];
			y_and_s.copy_from_slice(&bytes[32..]);
			let parity = y_and_s[0] & 0x80 != 0;
			y_and_s[0] &= 0x7f;
			Ok(Signature::new(r, U256::from_be_slice(&y_and_s), parity))
		}
		len => Err(SignatureParseError::InvalidLength(len)),
	}
}
