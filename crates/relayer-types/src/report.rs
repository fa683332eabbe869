//! Batch report types for audit trails.
//!
//! A report is created when a batch run starts, updated as each item
//! resolves, and is immutable after completion. It is derived purely from
//! recorded submission outcomes and validated items, never from re-querying
//! external state.

use serde::{Deserialize, Serialize};

/// Resolution state of a single batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
	Success,
	Failed,
	Pending,
}

impl ItemStatus {
	/// Human-readable label used in rendered reports.
	pub fn as_str(&self) -> &'static str {
		match self {
			ItemStatus::Success => "success",
			ItemStatus::Failed => "failed",
			ItemStatus::Pending => "pending",
		}
	}
}

/// Per-item record in a batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportItem {
	pub recipient: String,
	pub amount: f64,
	pub token: String,
	pub status: ItemStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transaction_hash: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Unix seconds at which the item resolved; unset while pending.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<u64>,
}

/// Computed summary over a report's items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
	pub total: usize,
	pub successful: usize,
	pub failed: usize,
	pub pending: usize,
	pub total_amount: f64,
	pub successful_amount: f64,
}

/// Auditable record of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
	pub batch_id: String,
	/// Unix seconds at which the batch run started.
	pub created_at: u64,
	pub items: Vec<ReportItem>,
	pub summary: BatchSummary,
}
