//! Batch payment validation.
//!
//! Checks a set of proposed payments for structural validity before any
//! nonce is issued or network call made: recipient well-formedness, amount
//! bounds, memo length, and batch size limits. Validation partitions input
//! into valid and invalid items with per-row, per-field error records and
//! never mutates its input. Duplicate recipients are surfaced as advisory
//! information, not rejections, since repeated payments to one address are
//! legitimate.

use alloy_primitives::Address;
use relayer_types::{BatchPaymentItem, BatchValidationResult, ItemError, ValidatedPayment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Structural limits applied to batches and their items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLimits {
	/// Batches above this size are rejected outright, with no partial
	/// processing.
	#[serde(default = "default_max_batch_size")]
	pub max_batch_size: usize,
	/// Minimum payment amount, in token display units.
	#[serde(default = "default_min_amount")]
	pub min_amount: f64,
	/// Maximum payment amount, guarding against fat-finger inputs.
	#[serde(default = "default_max_amount")]
	pub max_amount: f64,
	/// Maximum memo length in characters.
	#[serde(default = "default_max_memo_length")]
	pub max_memo_length: usize,
}

fn default_max_batch_size() -> usize {
	100
}

fn default_min_amount() -> f64 {
	0.01
}

fn default_max_amount() -> f64 {
	1_000_000.0
}

fn default_max_memo_length() -> usize {
	256
}

impl Default for BatchLimits {
	fn default() -> Self {
		Self {
			max_batch_size: default_max_batch_size(),
			min_amount: default_min_amount(),
			max_amount: default_max_amount(),
			max_memo_length: default_max_memo_length(),
		}
	}
}

/// A group of items sharing one recipient address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRecipient {
	pub recipient: Address,
	/// Indices in the input list that share this recipient.
	pub indices: Vec<usize>,
}

/// Pre-submission display totals for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTotals {
	pub total_amount: f64,
	pub item_count: usize,
	pub unique_recipients: usize,
}

/// Validates a single batch item, collecting every field error for the row.
pub fn validate_item(
	item: &BatchPaymentItem,
	index: usize,
	limits: &BatchLimits,
) -> Result<ValidatedPayment, Vec<ItemError>> {
	let mut errors = Vec::new();

	let recipient = match Address::from_str(item.recipient.trim()) {
		Ok(address) => Some(address),
		Err(_) => {
			errors.push(ItemError::new(
				index,
				"recipient",
				format!("'{}' is not a valid address", item.recipient),
			));
			None
		}
	};

	if !item.amount.is_finite() {
		errors.push(ItemError::new(index, "amount", "amount must be a finite number"));
	} else if item.amount <= 0.0 {
		// Positivity holds even when the configured minimum is zero.
		errors.push(ItemError::new(index, "amount", "amount must be positive"));
	} else if item.amount < limits.min_amount {
		errors.push(ItemError::new(
			index,
			"amount",
			format!("amount must be at least {}", limits.min_amount),
		));
	} else if item.amount > limits.max_amount {
		errors.push(ItemError::new(
			index,
			"amount",
			format!("amount must not exceed {}", limits.max_amount),
		));
	}

	if let Some(memo) = &item.memo {
		if memo.chars().count() > limits.max_memo_length {
			errors.push(ItemError::new(
				index,
				"memo",
				format!("memo must not exceed {} characters", limits.max_memo_length),
			));
		}
	}

	match (recipient, errors.is_empty()) {
		(Some(recipient), true) => Ok(ValidatedPayment {
			index,
			recipient,
			amount: item.amount,
			token: item.token.clone(),
			memo: item.memo.clone(),
		}),
		_ => Err(errors),
	}
}

/// Validates a whole batch.
///
/// Empty batches and batches exceeding the size limit are rejected outright
/// with zero valid items; otherwise items are partitioned into valid and
/// invalid with per-row error detail.
pub fn validate_batch(items: &[BatchPaymentItem], limits: &BatchLimits) -> BatchValidationResult {
	if items.is_empty() {
		return BatchValidationResult::rejected("batch is empty");
	}
	if items.len() > limits.max_batch_size {
		return BatchValidationResult::rejected(format!(
			"batch size {} exceeds the maximum of {}",
			items.len(),
			limits.max_batch_size
		));
	}

	let mut valid_items = Vec::new();
	let mut invalid_items = Vec::new();
	let mut errors = Vec::new();

	for (index, item) in items.iter().enumerate() {
		match validate_item(item, index, limits) {
			Ok(payment) => valid_items.push(payment),
			Err(mut item_errors) => {
				invalid_items.push(index);
				errors.append(&mut item_errors);
			}
		}
	}

	if !invalid_items.is_empty() {
		tracing::debug!(
			invalid = invalid_items.len(),
			total = items.len(),
			"batch validation found invalid items"
		);
	}

	BatchValidationResult {
		valid: invalid_items.is_empty(),
		valid_items,
		invalid_items,
		errors,
	}
}

/// Flags repeated recipients across a batch.
///
/// Advisory only: legitimate flows pay one address several times, so the
/// caller confirms rather than the validator rejecting. Hex case never
/// matters since addresses are compared by value.
pub fn find_duplicate_recipients(items: &[BatchPaymentItem]) -> Vec<DuplicateRecipient> {
	let mut by_recipient: HashMap<Address, Vec<usize>> = HashMap::new();
	for (index, item) in items.iter().enumerate() {
		if let Ok(address) = Address::from_str(item.recipient.trim()) {
			by_recipient.entry(address).or_default().push(index);
		}
	}

	let mut duplicates: Vec<DuplicateRecipient> = by_recipient
		.into_iter()
		.filter(|(_, indices)| indices.len() > 1)
		.map(|(recipient, indices)| DuplicateRecipient { recipient, indices })
		.collect();
	duplicates.sort_by_key(|d| d.indices[0]);
	duplicates
}

/// Sums amounts and counts unique recipients for pre-submission display.
pub fn calculate_batch_totals(items: &[BatchPaymentItem]) -> BatchTotals {
	let unique: std::collections::HashSet<String> = items
		.iter()
		.map(|i| i.recipient.trim().to_lowercase())
		.collect();
	BatchTotals {
		total_amount: items.iter().map(|i| i.amount).sum(),
		item_count: items.len(),
		unique_recipients: unique.len(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(recipient: &str, amount: f64) -> BatchPaymentItem {
		BatchPaymentItem {
			recipient: recipient.to_string(),
			amount,
			token: None,
			memo: None,
		}
	}

	const ALICE: &str = "0x1111111111111111111111111111111111111111";
	const BOB: &str = "0x2222222222222222222222222222222222222222";

	#[test]
	fn valid_batch_passes_in_full() {
		let items = vec![item(ALICE, 10.0), item(BOB, 0.5)];
		let result = validate_batch(&items, &BatchLimits::default());
		assert!(result.valid);
		assert_eq!(result.valid_items.len(), items.len());
		assert!(result.errors.is_empty());
	}

	#[test]
	fn empty_and_oversized_batches_are_rejected_outright() {
		let limits = BatchLimits {
			max_batch_size: 2,
			..BatchLimits::default()
		};

		let empty = validate_batch(&[], &limits);
		assert!(!empty.valid);
		assert!(empty.valid_items.is_empty());

		let oversized = validate_batch(
			&[item(ALICE, 1.0), item(BOB, 1.0), item(ALICE, 1.0)],
			&limits,
		);
		assert!(!oversized.valid);
		assert!(oversized.valid_items.is_empty());
		assert_eq!(oversized.errors[0].field, "batch");
	}

	#[test]
	fn invalid_rows_collect_every_field_error() {
		let bad = BatchPaymentItem {
			recipient: "not-an-address".to_string(),
			amount: f64::NAN,
			token: None,
			memo: Some("x".repeat(300)),
		};
		let result = validate_batch(&[item(ALICE, 5.0), bad], &BatchLimits::default());

		assert!(!result.valid);
		assert_eq!(result.valid_items.len(), 1);
		assert_eq!(result.invalid_items, vec![1]);
		let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
		assert_eq!(fields, vec!["recipient", "amount", "memo"]);
	}

	#[test]
	fn amount_bounds_are_enforced() {
		let limits = BatchLimits::default();
		assert!(validate_item(&item(ALICE, 0.001), 0, &limits).is_err());
		assert!(validate_item(&item(ALICE, 2_000_000.0), 0, &limits).is_err());
		assert!(validate_item(&item(ALICE, -5.0), 0, &limits).is_err());
		assert!(validate_item(&item(ALICE, 0.01), 0, &limits).is_ok());
	}

	#[test]
	fn zero_and_negative_amounts_fail_even_with_a_zero_minimum() {
		let limits = BatchLimits {
			min_amount: 0.0,
			..BatchLimits::default()
		};
		assert!(validate_item(&item(ALICE, 0.0), 0, &limits).is_err());
		assert!(validate_item(&item(ALICE, -1.0), 0, &limits).is_err());
		assert!(validate_item(&item(ALICE, 0.000001), 0, &limits).is_ok());
	}

	#[test]
	fn duplicates_are_advisory_and_case_insensitive() {
		let carol = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
		let items = vec![
			item(carol, 1.0),
			item(BOB, 2.0),
			item("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD", 3.0),
		];
		let duplicates = find_duplicate_recipients(&items);
		assert_eq!(duplicates.len(), 1);
		assert_eq!(duplicates[0].indices, vec![0, 2]);

		// Still a valid batch; duplicates do not reject.
		assert!(validate_batch(&items, &BatchLimits::default()).valid);
	}

	#[test]
	fn totals_count_unique_recipients() {
		let items = vec![item(ALICE, 1.5), item(BOB, 2.5), item(ALICE, 1.0)];
		let totals = calculate_batch_totals(&items);
		assert_eq!(totals.item_count, 3);
		assert_eq!(totals.unique_recipients, 2);
		assert!((totals.total_amount - 5.0).abs() < 1e-12);
	}
}
