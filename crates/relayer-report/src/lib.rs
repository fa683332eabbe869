//! Batch report generation.
//!
//! Builds the audit trail for a batch run: per-item status plus a computed
//! summary, rendered as CSV with a trailing summary block or as a
//! plain-text notice listing only the failures. Reports are derived purely
//! from already-recorded submission outcomes and validated items; nothing
//! here re-queries external state.

use relayer_types::{
	current_timestamp, BatchPaymentItem, BatchReport, BatchSummary, ItemStatus, ReportItem,
	SubmissionOutcome, ValidatedPayment,
};
use uuid::Uuid;

/// Builder tracking a batch run from start to completion.
///
/// Created when the batch starts with every item pending; outcomes are
/// recorded as items resolve; the finished [`BatchReport`] is immutable.
pub struct ReportBuilder {
	report: BatchReport,
}

impl ReportBuilder {
	/// Opens a report over the batch's validated items, all pending.
	pub fn new(items: &[ValidatedPayment], default_token: &str) -> Self {
		let report_items: Vec<ReportItem> = items
			.iter()
			.map(|payment| ReportItem {
				recipient: payment.recipient.to_string(),
				amount: payment.amount,
				token: payment
					.token
					.clone()
					.unwrap_or_else(|| default_token.to_string()),
				status: ItemStatus::Pending,
				transaction_hash: None,
				error: None,
				timestamp: None,
			})
			.collect();

		let mut report = BatchReport {
			batch_id: Uuid::new_v4().to_string(),
			created_at: current_timestamp(),
			items: report_items,
			summary: empty_summary(),
		};
		report.summary = summarize(&report.items);
		Self { report }
	}

	/// Opens a report over the raw input rows, before validation, so the
	/// report enumerates every item's fate even when some never make it
	/// past validation.
	pub fn from_raw(items: &[BatchPaymentItem], default_token: &str) -> Self {
		let report_items: Vec<ReportItem> = items
			.iter()
			.map(|item| ReportItem {
				recipient: item.recipient.clone(),
				amount: item.amount,
				token: item
					.token
					.clone()
					.unwrap_or_else(|| default_token.to_string()),
				status: ItemStatus::Pending,
				transaction_hash: None,
				error: None,
				timestamp: None,
			})
			.collect();

		let mut report = BatchReport {
			batch_id: Uuid::new_v4().to_string(),
			created_at: current_timestamp(),
			items: report_items,
			summary: empty_summary(),
		};
		report.summary = summarize(&report.items);
		Self { report }
	}

	/// Records the submission outcome for the item at `index`.
	pub fn record_outcome(&mut self, index: usize, outcome: &SubmissionOutcome) {
		if let Some(item) = self.report.items.get_mut(index) {
			item.status = if outcome.success {
				ItemStatus::Success
			} else {
				ItemStatus::Failed
			};
			item.transaction_hash = outcome.transaction_hash.clone();
			item.error = outcome.error.clone();
			item.timestamp = Some(current_timestamp());
		}
		self.report.summary = summarize(&self.report.items);
	}

	/// Records a pre-submission failure (validation or verification) for
	/// the item at `index`.
	pub fn record_failure(&mut self, index: usize, reason: impl Into<String>) {
		if let Some(item) = self.report.items.get_mut(index) {
			item.status = ItemStatus::Failed;
			item.error = Some(reason.into());
			item.timestamp = Some(current_timestamp());
		}
		self.report.summary = summarize(&self.report.items);
	}

	/// Finishes the run and yields the immutable report.
	pub fn finish(self) -> BatchReport {
		tracing::info!(
			batch_id = %self.report.batch_id,
			total = self.report.summary.total,
			successful = self.report.summary.successful,
			failed = self.report.summary.failed,
			"batch report finalized"
		);
		self.report
	}
}

fn empty_summary() -> BatchSummary {
	BatchSummary {
		total: 0,
		successful: 0,
		failed: 0,
		pending: 0,
		total_amount: 0.0,
		successful_amount: 0.0,
	}
}

/// Recomputes the summary from the items.
fn summarize(items: &[ReportItem]) -> BatchSummary {
	let mut summary = empty_summary();
	summary.total = items.len();
	for item in items {
		summary.total_amount += item.amount;
		match item.status {
			ItemStatus::Success => {
				summary.successful += 1;
				summary.successful_amount += item.amount;
			}
			ItemStatus::Failed => summary.failed += 1,
			ItemStatus::Pending => summary.pending += 1,
		}
	}
	summary
}

/// Renders the report as CSV: a header row, one row per item, then a blank
/// line and a labeled summary block.
pub fn to_csv(report: &BatchReport) -> String {
	let mut out = String::from("Recipient,Amount,Token,Status,Transaction Hash,Error,Timestamp\n");

	for item in &report.items {
		out.push_str(&format!(
			"{},{},{},{},{},{},{}\n",
			csv_field(&item.recipient),
			item.amount,
			csv_field(&item.token),
			item.status.as_str(),
			csv_field(item.transaction_hash.as_deref().unwrap_or("")),
			csv_field(item.error.as_deref().unwrap_or("")),
			item.timestamp.map(|t| t.to_string()).unwrap_or_default(),
		));
	}

	let summary = &report.summary;
	out.push('\n');
	out.push_str("Summary\n");
	out.push_str(&format!("Batch ID,{}\n", report.batch_id));
	out.push_str(&format!("Total,{}\n", summary.total));
	out.push_str(&format!("Successful,{}\n", summary.successful));
	out.push_str(&format!("Failed,{}\n", summary.failed));
	out.push_str(&format!("Pending,{}\n", summary.pending));
	out.push_str(&format!("Total Amount,{}\n", summary.total_amount));
	out.push_str(&format!("Successful Amount,{}\n", summary.successful_amount));
	out
}

/// Quotes a CSV field when it contains a comma, quote, or newline.
fn csv_field(value: &str) -> String {
	if value.contains([',', '"', '\n']) {
		format!("\"{}\"", value.replace('"', "\"\""))
	} else {
		value.to_string()
	}
}

/// Renders a plain-text notice listing only the failed items with their
/// reasons, suitable for an operator email body.
pub fn render_failure_notice(report: &BatchReport) -> String {
	let failed: Vec<&ReportItem> = report
		.items
		.iter()
		.filter(|item| item.status == ItemStatus::Failed)
		.collect();

	if failed.is_empty() {
		return format!(
			"Batch {}: all {} payments succeeded.\n",
			report.batch_id, report.summary.total
		);
	}

	let mut out = format!(
		"Batch {}: {} of {} payments failed.\n\nFailed payments:\n",
		report.batch_id,
		failed.len(),
		report.summary.total
	);
	for item in failed {
		out.push_str(&format!(
			"  - {} ({} {}): {}\n",
			item.recipient,
			item.amount,
			item.token,
			item.error.as_deref().unwrap_or("unknown error"),
		));
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use relayer_types::ValidatedPayment;
	use std::str::FromStr;

	fn payments(n: usize) -> Vec<ValidatedPayment> {
		(0..n)
			.map(|i| ValidatedPayment {
				index: i,
				recipient: alloy_address(i),
				amount: 10.0 + i as f64,
				token: None,
				memo: None,
			})
			.collect()
	}

	fn alloy_address(i: usize) -> alloy_primitives::Address {
		alloy_primitives::Address::from_str(&format!("0x{:040x}", i + 1)).unwrap()
	}

	fn five_item_report() -> BatchReport {
		let mut builder = ReportBuilder::new(&payments(5), "USDC");
		builder.record_outcome(0, &SubmissionOutcome::ok("0xaaa"));
		builder.record_outcome(1, &SubmissionOutcome::ok("0xbbb"));
		builder.record_outcome(2, &SubmissionOutcome::ok("0xccc"));
		builder.record_outcome(3, &SubmissionOutcome::failed("relayer timeout"));
		builder.record_failure(4, "signer mismatch");
		builder.finish()
	}

	#[test]
	fn summary_tracks_item_resolution() {
		let report = five_item_report();
		assert_eq!(report.summary.total, 5);
		assert_eq!(report.summary.successful, 3);
		assert_eq!(report.summary.failed, 2);
		assert_eq!(report.summary.pending, 0);
		assert!((report.summary.successful_amount - (10.0 + 11.0 + 12.0)).abs() < 1e-12);
	}

	#[test]
	fn csv_has_header_rows_and_summary_block() {
		let report = five_item_report();
		let csv = to_csv(&report);
		let lines: Vec<&str> = csv.lines().collect();

		assert_eq!(
			lines[0],
			"Recipient,Amount,Token,Status,Transaction Hash,Error,Timestamp"
		);
		// 1 header + 5 items, then a blank separator before the summary.
		assert_eq!(lines[6], "");
		assert_eq!(lines[7], "Summary");
		assert!(csv.contains("Successful,3\n"));
		assert!(csv.contains("Failed,2\n"));
		assert!(csv.contains("Pending,0\n"));
	}

	#[test]
	fn csv_escapes_embedded_commas() {
		let mut builder = ReportBuilder::new(&payments(1), "USDC");
		builder.record_outcome(0, &SubmissionOutcome::failed("bad, very bad"));
		let csv = to_csv(&builder.finish());
		assert!(csv.contains("\"bad, very bad\""));
	}

	#[test]
	fn failure_notice_lists_only_failures() {
		let report = five_item_report();
		let notice = render_failure_notice(&report);
		assert!(notice.contains("2 of 5 payments failed"));
		assert!(notice.contains("relayer timeout"));
		assert!(notice.contains("signer mismatch"));
		assert!(!notice.contains("0xaaa"));
	}

	#[test]
	fn clean_batch_notice_reports_success() {
		let mut builder = ReportBuilder::new(&payments(2), "USDC");
		builder.record_outcome(0, &SubmissionOutcome::ok("0x1"));
		builder.record_outcome(1, &SubmissionOutcome::ok("0x2"));
		let notice = render_failure_notice(&builder.finish());
		assert!(notice.contains("all 2 payments succeeded"));
	}
}
