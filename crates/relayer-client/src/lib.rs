//! Relayer HTTP client.
//!
//! Submits signed authorizations to the chain-specific relay endpoint and
//! aggregates batch results. Routing is by chain ID against the configured
//! network registry; an unmapped chain is a hard failure, never a silent
//! fallback to another chain's relayer. Network failures and relayer-side
//! rejections are folded into `SubmissionOutcome` values so batch fan-out
//! continues past individual failures.

use alloy_primitives::Address;
use futures::future::join_all;
use relayer_types::{
	BatchSubmissionOutcome, NetworksConfig, RelayerStatus, SignedAuthorization, SubmissionOutcome,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to relay services.
///
/// Per-item submission failures are not errors; they come back as
/// unsuccessful [`SubmissionOutcome`]s. Only conditions that make the call
/// impossible in the first place surface here.
#[derive(Debug, Error)]
pub enum ClientError {
	/// Error that occurs when no relay endpoint is configured for a chain.
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(u64),
	/// Error that occurs constructing the underlying HTTP client.
	#[error("HTTP client error: {0}")]
	Http(String),
}

/// Wire body for `POST {endpoint}/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
	pub token: Address,
	pub from: Address,
	pub to: Address,
	/// Token amount in smallest units, as a decimal string.
	pub value: String,
	pub valid_after: u64,
	pub valid_before: u64,
	/// Wire nonce as a 0x-prefixed 32-byte hex string.
	pub nonce: String,
	/// Signature as a 0x-prefixed hex string.
	pub signature: String,
}

impl SubmitRequest {
	/// Builds the wire body from a signed authorization and the token it
	/// authorizes a transfer of.
	pub fn from_authorization(token: Address, signed: &SignedAuthorization) -> Self {
		let message = &signed.message;
		Self {
			token,
			from: message.from,
			to: message.to,
			value: message.value.to_string(),
			valid_after: message.valid_after,
			valid_before: message.valid_before,
			nonce: format!("{}", message.nonce),
			signature: format!("{}", signed.signature),
		}
	}
}

/// Success payload of `POST {endpoint}/submit`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
	transaction_hash: String,
	#[serde(default)]
	#[allow(dead_code)]
	estimated_confirmation: Option<u64>,
}

/// Error payload returned by relay services.
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
	message: String,
}

/// Payload of `GET {endpoint}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
	supported_chains: Vec<u64>,
	queue_length: u64,
	estimated_wait_time: u64,
}

/// Client routing submissions to per-chain relay endpoints.
pub struct RelayerClient {
	http: reqwest::Client,
	/// Chain ID to relay endpoint base URL, trailing slash stripped.
	endpoints: HashMap<u64, String>,
}

impl RelayerClient {
	/// Creates a client over the configured networks.
	pub fn new(networks: &NetworksConfig, timeout: Duration) -> Result<Self, ClientError> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ClientError::Http(e.to_string()))?;
		let endpoints = networks
			.iter()
			.map(|(chain_id, chain)| {
				(
					*chain_id,
					chain.relayer_endpoint.trim_end_matches('/').to_string(),
				)
			})
			.collect();
		Ok(Self { http, endpoints })
	}

	/// The relay endpoint for a chain, or a hard failure if unmapped.
	pub fn endpoint(&self, chain_id: u64) -> Result<&str, ClientError> {
		self.endpoints
			.get(&chain_id)
			.map(String::as_str)
			.ok_or(ClientError::UnsupportedChain(chain_id))
	}

	/// Submits one signed authorization to the chain's relay service.
	///
	/// Network failures and non-2xx responses both produce an unsuccessful
	/// outcome with a descriptive error, never a panic or opaque failure.
	pub async fn submit(
		&self,
		chain_id: u64,
		token: Address,
		signed: &SignedAuthorization,
	) -> Result<SubmissionOutcome, ClientError> {
		let endpoint = self.endpoint(chain_id)?;
		let body = SubmitRequest::from_authorization(token, signed);

		let response = match self
			.http
			.post(format!("{}/submit", endpoint))
			.json(&body)
			.send()
			.await
		{
			Ok(response) => response,
			Err(e) => {
				tracing::warn!(chain_id, error = %e, "relayer unreachable");
				return Ok(SubmissionOutcome::failed(format!(
					"relayer unreachable: {}",
					e
				)));
			}
		};

		let status = response.status();
		if status.is_success() {
			match response.json::<SubmitResponse>().await {
				Ok(parsed) => {
					tracing::info!(
						chain_id,
						transaction_hash = %parsed.transaction_hash,
						"authorization accepted by relayer"
					);
					Ok(SubmissionOutcome::ok(parsed.transaction_hash))
				}
				Err(e) => Ok(SubmissionOutcome::failed(format!(
					"invalid relayer response: {}",
					e
				))),
			}
		} else {
			let message = match response.json::<ErrorResponse>().await {
				Ok(err) => err.message,
				Err(_) => format!("relayer returned HTTP {}", status),
			};
			tracing::warn!(chain_id, %status, message, "relayer rejected submission");
			Ok(SubmissionOutcome::failed(message))
		}
	}

	/// Fetches relay availability for pre-flight display.
	pub async fn status(&self, chain_id: u64) -> Result<RelayerStatus, ClientError> {
		let endpoint = self.endpoint(chain_id)?;

		let response = self
			.http
			.get(format!("{}/status", endpoint))
			.send()
			.await
			.and_then(|r| r.error_for_status());

		match response {
			Ok(response) => match response.json::<StatusResponse>().await {
				Ok(parsed) => Ok(RelayerStatus {
					available: parsed.supported_chains.contains(&chain_id),
					supported_chains: parsed.supported_chains,
					queue_length: parsed.queue_length,
					estimated_wait_time_secs: parsed.estimated_wait_time,
				}),
				Err(e) => Err(ClientError::Http(e.to_string())),
			},
			Err(e) => {
				tracing::warn!(chain_id, error = %e, "relayer status check failed");
				Ok(RelayerStatus {
					available: false,
					supported_chains: Vec::new(),
					queue_length: 0,
					estimated_wait_time_secs: 0,
				})
			}
		}
	}

	/// Submits a batch concurrently and aggregates the outcomes.
	///
	/// All items fan out at once; completion order is not guaranteed but
	/// the aggregated results preserve input order. One item's network
	/// failure never aborts the others.
	pub async fn submit_batch(
		&self,
		chain_id: u64,
		token: Address,
		items: &[SignedAuthorization],
	) -> Result<BatchSubmissionOutcome, ClientError> {
		// Resolve routing up front so an unmapped chain fails the whole
		// call before any request is made.
		self.endpoint(chain_id)?;

		let submissions = items.iter().map(|signed| self.submit(chain_id, token, signed));
		let results = join_all(submissions)
			.await
			.into_iter()
			.collect::<Result<Vec<_>, _>>()?;

		let outcome = BatchSubmissionOutcome::from_results(results);
		tracing::info!(
			chain_id,
			total = items.len(),
			succeeded = outcome.success_count,
			failed = outcome.failure_count,
			"batch submission complete"
		);
		Ok(outcome)
	}
}
