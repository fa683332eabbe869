//! Relayer fee computation.
//!
//! Quotes the fee a relayer charges for executing authorized transfers:
//! gas estimate times chain gas price, converted to USD through the chain's
//! native-token price, with a multiplicative markup and a capped volume
//! discount for batches. The wei-denominated fee is computed in integer
//! basis-point math and is the authoritative value for on-chain fee
//! collection; every USD figure is a display-side derivation. A quote is
//! not a guarantee; actual on-chain gas may differ and reconciliation
//! happens after submission.

use alloy_primitives::U256;
use relayer_types::NetworksConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during fee computation.
#[derive(Debug, Error)]
pub enum FeeError {
	/// Error that occurs when quoting for a chain with no configuration.
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(u64),
	/// Error that occurs when a quote is requested for zero recipients.
	#[error("Recipient count must be positive")]
	NoRecipients,
}

/// Tunable fee parameters.
///
/// All rates are in basis points so the authoritative wei math never
/// touches floating point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
	/// Gas for a single authorized transfer.
	#[serde(default = "default_base_gas")]
	pub base_gas: u64,
	/// Amortized gas for each additional recipient in one submission.
	#[serde(default = "default_gas_per_additional_recipient")]
	pub gas_per_additional_recipient: u64,
	/// Relayer markup over raw gas cost, in basis points.
	#[serde(default = "default_markup_bps")]
	pub markup_bps: u64,
	/// Volume discount granted per additional recipient, in basis points.
	#[serde(default = "default_batch_discount_bps_per_recipient")]
	pub batch_discount_bps_per_recipient: u64,
	/// Cap on the total volume discount, in basis points.
	#[serde(default = "default_max_batch_discount_bps")]
	pub max_batch_discount_bps: u64,
}

fn default_base_gas() -> u64 {
	90_000
}

fn default_gas_per_additional_recipient() -> u64 {
	65_000
}

fn default_markup_bps() -> u64 {
	1_500 // 15%
}

fn default_batch_discount_bps_per_recipient() -> u64 {
	100 // 1% per additional recipient
}

fn default_max_batch_discount_bps() -> u64 {
	2_000 // capped at 20%
}

impl Default for FeeSchedule {
	fn default() -> Self {
		Self {
			base_gas: default_base_gas(),
			gas_per_additional_recipient: default_gas_per_additional_recipient(),
			markup_bps: default_markup_bps(),
			batch_discount_bps_per_recipient: default_batch_discount_bps_per_recipient(),
			max_batch_discount_bps: default_max_batch_discount_bps(),
		}
	}
}

/// A single-submission fee quote.
///
/// Recomputed per quote; derived, never persisted as authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
	pub gas_estimate: u64,
	pub gas_price_gwei: f64,
	/// Raw gas cost in the chain's native token, before markup.
	pub gas_cost_native: f64,
	/// Raw gas cost in USD, before markup.
	pub gas_cost_usd: f64,
	/// Markup as a fraction, e.g. 0.15.
	pub markup: f64,
	pub total_fee_usd: f64,
	/// The authoritative fee for on-chain collection.
	pub total_fee_wei: U256,
}

/// A batch fee quote: the discounted breakdown plus itemization data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFeeBreakdown {
	pub fee: FeeBreakdown,
	/// Applied volume discount as a fraction, e.g. 0.05.
	pub discount: f64,
	/// Share of the total fee per recipient, for itemized billing.
	pub per_recipient_fee_usd: f64,
}

/// Per-item fee allocation over a list of payment amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFee {
	pub amount: f64,
	pub fee: f64,
	pub net_amount: f64,
}

/// Totals over a batch of payments after fee allocation.
///
/// Invariant: `total_net_amount + total_fees == total_amount` within
/// floating rounding tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFeeTotals {
	pub items: Vec<ItemFee>,
	pub total_amount: f64,
	pub total_fees: f64,
	pub total_net_amount: f64,
}

/// Calculator over a fee schedule and the per-chain network registry.
///
/// Explicit configuration passed at construction; no process-global state.
pub struct FeeCalculator {
	schedule: FeeSchedule,
	networks: NetworksConfig,
}

impl FeeCalculator {
	/// Creates a calculator from a schedule and network registry.
	pub fn new(schedule: FeeSchedule, networks: NetworksConfig) -> Self {
		Self { schedule, networks }
	}

	/// Estimates gas for a submission covering `recipient_count` transfers:
	/// base gas plus an amortized increment per additional recipient.
	pub fn estimate_gas(&self, recipient_count: usize) -> Result<u64, FeeError> {
		if recipient_count == 0 {
			return Err(FeeError::NoRecipients);
		}
		Ok(self.schedule.base_gas
			+ self.schedule.gas_per_additional_recipient * (recipient_count as u64 - 1))
	}

	/// Quotes the relayer fee for one submission on the given chain.
	///
	/// Falls back to the chain's configured default gas price when the
	/// caller supplies none; an unknown chain is a hard failure.
	pub fn calculate_relayer_fee(
		&self,
		chain_id: u64,
		recipient_count: usize,
		gas_price_gwei: Option<f64>,
	) -> Result<FeeBreakdown, FeeError> {
		let chain = self
			.networks
			.get(&chain_id)
			.ok_or(FeeError::UnsupportedChain(chain_id))?;
		let gas_price_gwei = gas_price_gwei.unwrap_or(chain.default_gas_price_gwei);
		let gas_estimate = self.estimate_gas(recipient_count)?;

		let wei_per_gas = (gas_price_gwei * 1e9).round() as u128;
		let base_wei = gas_estimate as u128 * wei_per_gas;
		let total_fee_wei = apply_bps(base_wei, 10_000 + self.schedule.markup_bps);

		let gas_cost_native = base_wei as f64 / 1e18;
		let gas_cost_usd = gas_cost_native * chain.native_price_usd;
		let markup = self.schedule.markup_bps as f64 / 10_000.0;

		Ok(FeeBreakdown {
			gas_estimate,
			gas_price_gwei,
			gas_cost_native,
			gas_cost_usd,
			markup,
			total_fee_usd: gas_cost_usd * (1.0 + markup),
			total_fee_wei: U256::from(total_fee_wei),
		})
	}

	/// Quotes a batch of `recipient_count` transfers, applying the volume
	/// discount on top of the single-submission markup.
	pub fn calculate_batch_relayer_fee(
		&self,
		chain_id: u64,
		recipient_count: usize,
		gas_price_gwei: Option<f64>,
	) -> Result<BatchFeeBreakdown, FeeError> {
		let mut fee = self.calculate_relayer_fee(chain_id, recipient_count, gas_price_gwei)?;

		let discount_bps = (self.schedule.batch_discount_bps_per_recipient
			* (recipient_count as u64 - 1))
			.min(self.schedule.max_batch_discount_bps);
		let discount = discount_bps as f64 / 10_000.0;

		fee.total_fee_wei = U256::from(apply_bps(
			fee.total_fee_wei.to::<u128>(),
			10_000 - discount_bps,
		));
		fee.total_fee_usd *= 1.0 - discount;

		let per_recipient_fee_usd = fee.total_fee_usd / recipient_count as f64;
		tracing::debug!(
			chain_id,
			recipient_count,
			discount,
			total_fee_usd = fee.total_fee_usd,
			"quoted batch relayer fee"
		);

		Ok(BatchFeeBreakdown {
			fee,
			discount,
			per_recipient_fee_usd,
		})
	}

	/// Allocates the batch fee across payment amounts.
	///
	/// Each item is charged the equal per-recipient share; the net amount
	/// is what the recipient receives after fee deduction.
	pub fn calculate_batch_fees(
		&self,
		amounts: &[f64],
		chain_id: u64,
		gas_price_gwei: Option<f64>,
	) -> Result<BatchFeeTotals, FeeError> {
		let batch = self.calculate_batch_relayer_fee(chain_id, amounts.len(), gas_price_gwei)?;
		let per_item = batch.per_recipient_fee_usd;

		let items: Vec<ItemFee> = amounts
			.iter()
			.map(|&amount| ItemFee {
				amount,
				fee: per_item,
				net_amount: amount - per_item,
			})
			.collect();

		let total_amount: f64 = items.iter().map(|i| i.amount).sum();
		let total_fees: f64 = items.iter().map(|i| i.fee).sum();
		let total_net_amount: f64 = items.iter().map(|i| i.net_amount).sum();

		Ok(BatchFeeTotals {
			items,
			total_amount,
			total_fees,
			total_net_amount,
		})
	}
}

/// Scales a wei amount by basis points with integer math.
fn apply_bps(wei: u128, bps: u64) -> u128 {
	wei * bps as u128 / 10_000
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use relayer_types::{ChainConfig, TokenConfig};
	use std::collections::HashMap;

	fn networks() -> NetworksConfig {
		let mut networks = HashMap::new();
		networks.insert(
			1,
			ChainConfig {
				name: "ethereum".to_string(),
				relayer_endpoint: "https://relay.example.com/eth".to_string(),
				native_symbol: "ETH".to_string(),
				native_price_usd: 3000.0,
				default_gas_price_gwei: 20.0,
				tokens: vec![TokenConfig {
					address: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
					symbol: "USDC".to_string(),
					decimals: 6,
					domain_name: "USD Coin".to_string(),
					domain_version: "2".to_string(),
				}],
			},
		);
		networks
	}

	fn calculator() -> FeeCalculator {
		FeeCalculator::new(FeeSchedule::default(), networks())
	}

	#[test]
	fn gas_estimate_amortizes_additional_recipients() {
		let calc = calculator();
		assert_eq!(calc.estimate_gas(1).unwrap(), 90_000);
		assert_eq!(calc.estimate_gas(3).unwrap(), 90_000 + 2 * 65_000);
		assert!(matches!(calc.estimate_gas(0), Err(FeeError::NoRecipients)));
	}

	#[test]
	fn single_fee_quote_is_marked_up() {
		let calc = calculator();
		let fee = calc.calculate_relayer_fee(1, 1, Some(20.0)).unwrap();

		// 90_000 gas * 20 gwei = 1.8e15 wei = 0.0018 ETH = 5.40 USD raw.
		assert_eq!(fee.gas_estimate, 90_000);
		assert!((fee.gas_cost_native - 0.0018).abs() < 1e-12);
		assert!((fee.gas_cost_usd - 5.4).abs() < 1e-9);
		assert!((fee.total_fee_usd - 5.4 * 1.15).abs() < 1e-9);
		assert_eq!(
			fee.total_fee_wei,
			U256::from(1_800_000_000_000_000u128 * 11_500 / 10_000)
		);
	}

	#[test]
	fn default_gas_price_fallback_and_unknown_chain() {
		let calc = calculator();
		let fee = calc.calculate_relayer_fee(1, 1, None).unwrap();
		assert_eq!(fee.gas_price_gwei, 20.0);

		assert!(matches!(
			calc.calculate_relayer_fee(999, 1, None),
			Err(FeeError::UnsupportedChain(999))
		));
	}

	#[test]
	fn batch_discount_scales_and_caps() {
		let calc = calculator();

		let small = calc.calculate_batch_relayer_fee(1, 5, Some(20.0)).unwrap();
		assert!((small.discount - 0.04).abs() < 1e-12);

		// 50 recipients would earn 49% but the cap holds at 20%.
		let large = calc.calculate_batch_relayer_fee(1, 50, Some(20.0)).unwrap();
		assert!((large.discount - 0.20).abs() < 1e-12);

		let undiscounted = calc.calculate_relayer_fee(1, 50, Some(20.0)).unwrap();
		assert!(large.fee.total_fee_usd < undiscounted.total_fee_usd);
		assert!(large.fee.total_fee_wei < undiscounted.total_fee_wei);
		assert!(
			(large.per_recipient_fee_usd - large.fee.total_fee_usd / 50.0).abs() < 1e-12
		);
	}

	#[test]
	fn batch_fee_totals_reconcile() {
		let calc = calculator();
		let amounts = vec![10.0, 250.5, 0.75, 1_000.0, 33.33];
		let totals = calc.calculate_batch_fees(&amounts, 1, Some(20.0)).unwrap();

		assert_eq!(totals.items.len(), amounts.len());
		assert!(
			(totals.total_net_amount + totals.total_fees - totals.total_amount).abs() < 1e-9
		);
		assert!((totals.total_amount - 1_294.58).abs() < 1e-9);
	}
}
