//! Relayer submission outcome and status types.

use serde::{Deserialize, Serialize};

/// The outcome of submitting one signed authorization to a relayer.
///
/// Network failures and relayer-side rejections are both expressed as
/// `success: false` with a descriptive error, never as a panic or an
/// opaque exception the caller must catch blindly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_hash: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl SubmissionOutcome {
	/// A successful submission with its transaction hash.
	pub fn ok(transaction_hash: impl Into<String>) -> Self {
		Self {
			success: true,
			transaction_hash: Some(transaction_hash.into()),
			error: None,
		}
	}

	/// A failed submission with a descriptive reason.
	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			success: false,
			transaction_hash: None,
			error: Some(error.into()),
		}
	}
}

/// Pre-flight relayer availability information.
///
/// Advisory only; used for UX ahead of submission, not for correctness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayerStatus {
	pub available: bool,
	pub supported_chains: Vec<u64>,
	pub queue_length: u64,
	pub estimated_wait_time_secs: u64,
}

/// Aggregated outcome of a concurrent batch submission.
///
/// `results` preserves the input order by index regardless of completion
/// order; `success` holds only when every item succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubmissionOutcome {
	pub success: bool,
	pub results: Vec<SubmissionOutcome>,
	pub success_count: usize,
	pub failure_count: usize,
}

impl BatchSubmissionOutcome {
	/// Aggregates per-item outcomes, preserving their order.
	pub fn from_results(results: Vec<SubmissionOutcome>) -> Self {
		let success_count = results.iter().filter(|r| r.success).count();
		let failure_count = results.len() - success_count;
		Self {
			success: failure_count == 0 && !results.is_empty(),
			results,
			success_count,
			failure_count,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aggregation_counts_and_overall_flag() {
		let outcome = BatchSubmissionOutcome::from_results(vec![
			SubmissionOutcome::ok("0xabc"),
			SubmissionOutcome::failed("relayer timeout"),
			SubmissionOutcome::ok("0xdef"),
		]);
		assert!(!outcome.success);
		assert_eq!(outcome.success_count, 2);
		assert_eq!(outcome.failure_count, 1);
		assert_eq!(outcome.results[1].error.as_deref(), Some("relayer timeout"));
	}

	#[test]
	fn all_successful_batch_is_successful() {
		let outcome = BatchSubmissionOutcome::from_results(vec![
			SubmissionOutcome::ok("0x1"),
			SubmissionOutcome::ok("0x2"),
		]);
		assert!(outcome.success);
		assert_eq!(outcome.failure_count, 0);
	}
}
