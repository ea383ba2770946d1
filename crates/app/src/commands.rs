use std::fmt::Write as _;
use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::{MatchRecord, Money};
use tally_engine::{ReconcileEngine, Reconciliation, ReconciliationSummary};
use tally_import::{export_to_dir, load_bank, load_internal};

use crate::config::AppConfig;

/// Inputs and overrides for one `tally run`.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub internal: PathBuf,
    pub bank: PathBuf,
    pub date_tolerance: Option<u32>,
    pub amount_tolerance: Option<Decimal>,
    pub similarity_threshold: Option<f64>,
    pub out_dir: Option<PathBuf>,
    pub show: Option<String>,
    pub json: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub result: Reconciliation,
    pub summary: ReconciliationSummary,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a ReconciliationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a MatchRecord>,
}

/// Loads both ledgers, reconciles them and optionally exports the results.
pub fn reconcile_files(mut config: AppConfig, request: &RunRequest) -> Result<RunOutcome> {
    if let Some(days) = request.date_tolerance {
        config.matching.date_tolerance_days = days;
    }
    if let Some(tolerance) = request.amount_tolerance {
        config.matching.amount_tolerance = Money::new(tolerance);
    }
    if let Some(threshold) = request.similarity_threshold {
        config.matching.similarity_threshold = threshold;
    }
    let engine = ReconcileEngine::new(config.matching)?;

    let internal_file = File::open(&request.internal)
        .with_context(|| format!("opening internal ledger {}", request.internal.display()))?;
    let internal = load_internal(internal_file, &config.internal)
        .with_context(|| format!("reading internal ledger {}", request.internal.display()))?;

    let bank_file = File::open(&request.bank)
        .with_context(|| format!("opening bank ledger {}", request.bank.display()))?;
    let bank = load_bank(bank_file, &config.bank)
        .with_context(|| format!("reading bank ledger {}", request.bank.display()))?;

    tracing::info!(
        internal = internal.records.len(),
        bank = bank.records.len(),
        undated_internal = internal.undated.len(),
        undated_bank = bank.undated.len(),
        "ledgers loaded"
    );

    let result = engine.reconcile(&internal.records, &bank.records);
    let summary = ReconciliationSummary::new(&internal.records, &bank.records, &result)
        .with_undated(
            &result,
            internal.undated.iter().map(|row| row.vendor.as_deref()),
            bank.undated.len(),
        );

    if let Some(dir) = &request.out_dir {
        export_to_dir(dir, &result, &internal.undated, &bank.undated)
            .with_context(|| format!("exporting results to {}", dir.display()))?;
    }

    Ok(RunOutcome {
        result,
        summary,
    })
}

pub fn run(config: AppConfig, request: &RunRequest) -> Result<String> {
    let outcome = reconcile_files(config, request)?;

    let detail = match &request.show {
        Some(id) => Some(
            outcome
                .result
                .find_match(id)
                .with_context(|| format!("no match for transaction {id}"))?,
        ),
        None => None,
    };

    if request.json {
        let report = JsonReport {
            summary: &outcome.summary,
            detail,
        };
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = render_summary(&outcome.summary);
    if let Some(record) = detail {
        out.push('\n');
        out.push_str(&render_detail(record));
    }
    Ok(out)
}

pub fn show_config(config: &AppConfig) -> Result<String> {
    Ok(config.to_toml()?)
}

pub fn render_summary(summary: &ReconciliationSummary) -> String {
    let mut out = String::new();
    let percent = summary
        .match_percent
        .map_or_else(|| "n/a".to_string(), |p| format!("{p}%"));

    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "  Internal txns:       {}", summary.internal_count);
    let _ = writeln!(out, "  Bank txns:           {}", summary.bank_count);
    let _ = writeln!(out, "  Matches:             {}", summary.match_count);
    let _ = writeln!(out, "  Match %:             {percent}");
    let _ = writeln!(out, "  Unmatched internal:  {}", summary.unmatched_internal_count);
    let _ = writeln!(out, "  Unmatched bank:      {}", summary.unmatched_bank_count);

    if !summary.top_unmatched_vendors.is_empty() {
        let _ = writeln!(out, "\nTop unmatched vendors");
        for v in &summary.top_unmatched_vendors {
            let _ = writeln!(out, "  {:>4}  {}", v.unmatched_count, v.vendor);
        }
    }

    if !summary.daily_totals.is_empty() {
        let _ = writeln!(out, "\nDaily totals");
        for row in &summary.daily_totals {
            let source = row.source.to_string();
            let amount = row.amount.to_string();
            let _ = writeln!(out, "  {}  {:<8}  {:>14}", row.date, source, amount);
        }
    }

    out
}

/// Side-by-side view of one pairing.
pub fn render_detail(record: &MatchRecord) -> String {
    let mut out = String::new();
    let vendor = |v: &Option<String>| v.clone().unwrap_or_default();

    let _ = writeln!(out, "Match {} <-> {}", record.transaction_id, record.bank_ref);
    let _ = writeln!(out, "  {:<18}{:<24}{}", "", "Internal", "Bank");
    let _ = writeln!(
        out,
        "  {:<18}{:<24}{}",
        "Reference", record.transaction_id, record.bank_ref
    );
    let _ = writeln!(
        out,
        "  {:<18}{:<24}{}",
        "Date",
        record.internal_date.to_string(),
        record.bank_date
    );
    let _ = writeln!(
        out,
        "  {:<18}{:<24}{}",
        "Amount",
        record.internal_amount.to_string(),
        record.bank_amount
    );
    let _ = writeln!(
        out,
        "  {:<18}{:<24}{}",
        "Vendor",
        vendor(&record.vendor_internal),
        vendor(&record.vendor_bank)
    );
    let _ = writeln!(out, "  Vendor similarity {:.2}", record.vendor_similarity);
    let _ = writeln!(out, "  Amount difference {}", record.amount_diff);
    let _ = writeln!(out, "  Match type        {}", record.match_type);
    out
}
