//! Batch payment input and validation result types.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// A single proposed payment as supplied by the caller, prior to validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPaymentItem {
	/// Recipient address as a hex string; validated before use.
	pub recipient: String,
	/// Payment amount in display units of the token.
	pub amount: f64,
	/// Optional token symbol; the chain's default token is used when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
	/// Optional free-form memo, length-bounded by validation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub memo: Option<String>,
}

/// A payment item that passed validation, with its recipient parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPayment {
	/// Index of the item in the original input list.
	pub index: usize,
	pub recipient: Address,
	pub amount: f64,
	pub token: Option<String>,
	pub memo: Option<String>,
}

/// A validation error for one field of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
	/// Index of the offending item in the original input list.
	pub index: usize,
	/// Field the error applies to, e.g. "recipient" or "amount".
	pub field: String,
	pub message: String,
}

impl ItemError {
	/// Creates a new item error.
	pub fn new(index: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			index,
			field: field.into(),
			message: message.into(),
		}
	}
}

/// Outcome of validating a batch: input items partitioned into valid and
/// invalid, with per-row error detail. The input list is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchValidationResult {
	/// True when every item is valid and the batch itself is acceptable.
	pub valid: bool,
	pub valid_items: Vec<ValidatedPayment>,
	/// Indices of items that failed validation.
	pub invalid_items: Vec<usize>,
	/// Every field-level error, across all invalid items.
	pub errors: Vec<ItemError>,
}

impl BatchValidationResult {
	/// A result rejecting the whole batch with a single batch-level error.
	pub fn rejected(message: impl Into<String>) -> Self {
		Self {
			valid: false,
			valid_items: Vec::new(),
			invalid_items: Vec::new(),
			errors: vec![ItemError::new(0, "batch", message)],
		}
	}
}
