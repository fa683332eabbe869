//! Command-line entry point for the authorization relayer pipeline.
//!
//! Reads a batch of proposed payments, validates them, quotes the relayer
//! fee, generates and signs one transfer authorization per payment, verifies
//! every signature, submits the batch to the chain's relay service, and
//! writes an auditable CSV report. Every input row ends up in the report,
//! whatever its fate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Bytes, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{bail, Context};
use clap::Parser;

use relayer_authorization::{AuthorizationGenerator, ValidityWindow};
use relayer_batch::{calculate_batch_totals, find_duplicate_recipients, validate_batch};
use relayer_client::RelayerClient;
use relayer_config::Config;
use relayer_fee::FeeCalculator;
use relayer_nonce::{implementations::memory::MemoryNonceStore, NonceService};
use relayer_report::{render_failure_notice, to_csv, ReportBuilder};
use relayer_types::{BatchPaymentItem, DomainSpec, SignedAuthorization, TokenConfig};
use relayer_verify::AuthorizationVerifier;
use tracing_subscriber::{fmt, EnvFilter};

/// Command-line arguments for the relayer pipeline.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Path to a JSON file with the batch payments
	#[arg(short, long)]
	payments: PathBuf,

	/// Chain ID to submit on
	#[arg(long)]
	chain: u64,

	/// Token symbol; the chain's first configured token when omitted
	#[arg(long)]
	token: Option<String>,

	/// Validity window duration in seconds
	#[arg(long, default_value_t = 3600)]
	validity_secs: i64,

	/// Where to write the CSV report
	#[arg(short, long, default_value = "batch-report.csv")]
	out: PathBuf,

	/// Validate, quote, generate and verify, but do not submit
	#[arg(long)]
	dry_run: bool,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Initialize tracing with env filter
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.clone()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	let config = Config::from_file(&args.config)
		.with_context(|| format!("loading config from {}", args.config.display()))?;
	tracing::info!(networks = config.networks.len(), "loaded configuration");

	run(args, config).await
}

async fn run(args: Args, config: Config) -> anyhow::Result<()> {
	let chain = config
		.networks
		.get(&args.chain)
		.with_context(|| format!("chain {} is not configured", args.chain))?;
	let token = resolve_token(&chain.tokens, args.token.as_deref())?;
	let domain = DomainSpec::new(
		token.domain_name.clone(),
		token.domain_version.clone(),
		args.chain,
		token.address,
	);

	let account = config
		.account
		.as_ref()
		.context("an [account] with a private key is required to sign authorizations")?;
	let signer: PrivateKeySigner = account
		.private_key
		.expose_secret()
		.parse()
		.context("parsing account private key")?;
	let sender = signer.address();
	tracing::info!(%sender, chain = args.chain, token = %token.symbol, "pipeline starting");

	// Wire the pipeline services around a shared nonce authority.
	let nonces = Arc::new(NonceService::new(Box::new(MemoryNonceStore::new())));
	let generator = AuthorizationGenerator::new(Arc::clone(&nonces));
	let verifier = AuthorizationVerifier::new(Arc::clone(&nonces));
	let fees = FeeCalculator::new(config.fees.clone(), config.networks.clone());
	let client = RelayerClient::new(
		&config.networks,
		Duration::from_secs(config.submission.timeout_seconds),
	)?;

	let payments = read_payments(&args.payments)?;
	let mut report = ReportBuilder::from_raw(&payments, &token.symbol);

	// Structural validation happens before any nonce is issued or network
	// call is made.
	let validation = validate_batch(&payments, &config.batch);
	if validation.valid_items.is_empty() {
		for error in &validation.errors {
			tracing::error!(index = error.index, field = %error.field, "{}", error.message);
		}
		let reason = validation
			.errors
			.first()
			.map(|e| e.message.clone())
			.unwrap_or_else(|| "batch rejected".to_string());
		for index in 0..payments.len() {
			report.record_failure(index, reason.clone());
		}
		let rejected = report.finish();
		std::fs::write(&args.out, to_csv(&rejected))
			.with_context(|| format!("writing report to {}", args.out.display()))?;
		bail!("no valid payments in batch");
	}
	for error in &validation.errors {
		tracing::warn!(index = error.index, field = %error.field, "{}", error.message);
	}
	let mut by_index: Vec<(usize, String)> = Vec::new();
	for error in &validation.errors {
		match by_index.iter_mut().find(|(i, _)| *i == error.index) {
			Some((_, joined)) => {
				joined.push_str("; ");
				joined.push_str(&error.message);
			}
			None => by_index.push((error.index, error.message.clone())),
		}
	}
	for (index, reason) in by_index {
		report.record_failure(index, reason);
	}

	for duplicate in find_duplicate_recipients(&payments) {
		tracing::warn!(
			recipient = %duplicate.recipient,
			indices = ?duplicate.indices,
			"duplicate recipient in batch; proceeding"
		);
	}
	let totals = calculate_batch_totals(&payments);
	tracing::info!(
		items = totals.item_count,
		unique_recipients = totals.unique_recipients,
		total_amount = totals.total_amount,
		"batch totals"
	);

	// Quote before submission; reconciliation happens after.
	let amounts: Vec<f64> = validation.valid_items.iter().map(|p| p.amount).collect();
	let quote = fees.calculate_batch_fees(&amounts, args.chain, None)?;
	tracing::info!(
		total_fees_usd = quote.total_fees,
		total_net_usd = quote.total_net_amount,
		"relayer fee quote"
	);

	if !args.dry_run {
		let status = client.status(args.chain).await?;
		tracing::info!(
			available = status.available,
			queue_length = status.queue_length,
			estimated_wait_secs = status.estimated_wait_time_secs,
			"relayer status"
		);
	}

	// Generate, sign, and verify one authorization per valid payment.
	let window = ValidityWindow::starting_now(args.validity_secs)?;
	let mut to_submit: Vec<(usize, SignedAuthorization)> = Vec::new();
	for payment in &validation.valid_items {
		let value = to_token_units(payment.amount, token.decimals);
		let prepared = generator
			.generate(&domain, sender, payment.recipient, value, window)
			.await?;
		let signature = signer.sign_hash_sync(&prepared.digest)?;
		let signed = SignedAuthorization::new(
			domain.clone(),
			prepared.message,
			Bytes::copy_from_slice(&signature.as_bytes()),
		);

		let verdict = verifier.validate(&signed).await?;
		if verdict.valid {
			to_submit.push((payment.index, signed));
		} else {
			let reason = verdict
				.error
				.map(|e| e.to_string())
				.unwrap_or_else(|| "verification failed".to_string());
			tracing::error!(index = payment.index, %reason, "authorization rejected");
			report.record_failure(payment.index, reason);
		}
	}

	if args.dry_run {
		tracing::info!(
			prepared = to_submit.len(),
			"dry run: skipping submission, items remain pending"
		);
	} else if !to_submit.is_empty() {
		let authorizations: Vec<SignedAuthorization> =
			to_submit.iter().map(|(_, s)| s.clone()).collect();
		let outcome = client
			.submit_batch(args.chain, token.address, &authorizations)
			.await?;

		for ((index, signed), result) in to_submit.iter().zip(&outcome.results) {
			if result.success {
				// Reflect on-chain consumption so replays are rejected.
				verifier.mark_executed(signed).await?;
			}
			report.record_outcome(*index, result);
		}
	}

	let final_report = report.finish();
	std::fs::write(&args.out, to_csv(&final_report))
		.with_context(|| format!("writing report to {}", args.out.display()))?;
	tracing::info!(path = %args.out.display(), batch_id = %final_report.batch_id, "report written");

	if final_report.summary.failed > 0 {
		eprintln!("{}", render_failure_notice(&final_report));
	}
	Ok(())
}

fn resolve_token<'a>(
	tokens: &'a [TokenConfig],
	symbol: Option<&str>,
) -> anyhow::Result<&'a TokenConfig> {
	match symbol {
		Some(symbol) => tokens
			.iter()
			.find(|t| t.symbol.eq_ignore_ascii_case(symbol))
			.with_context(|| format!("token '{}' is not configured on this chain", symbol)),
		None => tokens.first().context("chain has no configured tokens"),
	}
}

fn read_payments(path: &PathBuf) -> anyhow::Result<Vec<BatchPaymentItem>> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("reading payments from {}", path.display()))?;
	serde_json::from_str(&content).context("parsing payments JSON")
}

/// Converts a display amount into the token's smallest units.
fn to_token_units(amount: f64, decimals: u8) -> U256 {
	U256::from((amount * 10f64.powi(decimals as i32)).round() as u128)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_unit_conversion_rounds_to_smallest_unit() {
		assert_eq!(to_token_units(1.0, 6), U256::from(1_000_000u64));
		assert_eq!(to_token_units(0.01, 6), U256::from(10_000u64));
		assert_eq!(to_token_units(2.5, 18), U256::from(2_500_000_000_000_000_000u128));
	}

	#[test]
	fn token_resolution_prefers_symbol_then_default() {
		let tokens = vec![
			TokenConfig {
				address: alloy_primitives::Address::ZERO,
				symbol: "USDC".to_string(),
				decimals: 6,
				domain_name: "USD Coin".to_string(),
				domain_version: "2".to_string(),
			},
			TokenConfig {
				address: alloy_primitives::Address::ZERO,
				symbol: "EURC".to_string(),
				decimals: 6,
				domain_name: "EURC".to_string(),
				domain_version: "2".to_string(),
			},
		];
		assert_eq!(resolve_token(&tokens, Some("eurc")).unwrap().symbol, "EURC");
		assert_eq!(resolve_token(&tokens, None).unwrap().symbol, "USDC");
		assert!(resolve_token(&tokens, Some("DAI")).is_err());
	}
}
