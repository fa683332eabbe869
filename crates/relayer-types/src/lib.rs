//! Common types module for the authorization relayer system.
//!
//! This module defines the core data types and structures used throughout
//! the relayer pipeline. It provides a centralized location for shared types
//! to ensure consistency across all relayer components.

/// EIP-712 domain and EIP-3009 authorization message types.
pub mod authorization;
/// Batch payment input and validation result types.
pub mod batch;
/// Network and token configuration types.
pub mod networks;
/// Relayer submission outcome and status types.
pub mod relay;
/// Batch report types for audit trails.
pub mod report;
/// Secure string type for private keys and API credentials.
pub mod secret_string;
/// Utility functions for hex strings and timestamps.
pub mod utils;

// Re-export all types for convenient access
pub use authorization::{
	parse_signature, AuthorizationMessage, DomainSpec, SignatureParseError, SignedAuthorization,
	TransferWithAuthorization,
};
pub use batch::{BatchPaymentItem, BatchValidationResult, ItemError, ValidatedPayment};
pub use networks::{deserialize_networks, ChainConfig, NetworksConfig, TokenConfig};
pub use relay::{BatchSubmissionOutcome, RelayerStatus, SubmissionOutcome};
pub use report::{BatchReport, BatchSummary, ItemStatus, ReportItem};
pub use secret_string::SecretString;
pub use utils::current_timestamp;
