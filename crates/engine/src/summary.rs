use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;
use tally_core::{BankTransaction, InternalTransaction, LedgerSource, Money};

use crate::engine::Reconciliation;

/// How many vendors the unmatched breakdown keeps.
pub const TOP_VENDOR_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorCount {
    pub vendor: String,
    pub unmatched_count: usize,
}

/// Total booked on one date by one ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub source: LedgerSource,
    pub amount: Money,
}

/// Headline numbers for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    pub internal_count: usize,
    pub bank_count: usize,
    pub match_count: usize,
    pub unmatched_internal_count: usize,
    pub unmatched_bank_count: usize,
    /// `None` when the internal ledger is empty.
    pub match_percent: Option<f64>,
    pub top_unmatched_vendors: Vec<VendorCount>,
    pub daily_totals: Vec<DailyTotal>,
}

impl ReconciliationSummary {
    pub fn new(
        internal: &[InternalTransaction],
        bank: &[BankTransaction],
        result: &Reconciliation,
    ) -> Self {
        Self {
            internal_count: internal.len(),
            bank_count: bank.len(),
            match_count: result.matches.len(),
            unmatched_internal_count: result.unmatched_internal.len(),
            unmatched_bank_count: result.unmatched_bank.len(),
            match_percent: match_percent(result.matches.len(), internal.len()),
            top_unmatched_vendors: top_unmatched_vendors(unmatched_vendors(result)),
            daily_totals: daily_totals(internal, bank),
        }
    }

    /// Folds in rows that were read but could not be dated. They count
    /// toward their ledger and are always unmatched; they carry no daily total.
    pub fn with_undated<'a, I>(
        mut self,
        result: &'a Reconciliation,
        undated_internal_vendors: I,
        undated_bank: usize,
    ) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let vendors: Vec<Option<&str>> = undated_internal_vendors.into_iter().collect();
        self.internal_count += vendors.len();
        self.unmatched_internal_count += vendors.len();
        self.bank_count += undated_bank;
        self.unmatched_bank_count += undated_bank;
        self.match_percent = match_percent(self.match_count, self.internal_count);
        self.top_unmatched_vendors =
            top_unmatched_vendors(unmatched_vendors(result).chain(vendors));
        self
    }
}

fn unmatched_vendors(result: &Reconciliation) -> impl Iterator<Item = Option<&str>> {
    result.unmatched_internal.iter().map(|tx| tx.vendor.as_deref())
}

fn match_percent(matched: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let pct = matched as f64 / total as f64 * 100.0;
    Some((pct * 100.0).round() / 100.0)
}

/// Most frequent raw vendor names among unmatched internal records. Equal
/// counts keep first-appearance order; records without a vendor are skipped.
pub fn top_unmatched_vendors<'a, I>(vendors: I) -> Vec<VendorCount>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for vendor in vendors.into_iter().flatten() {
        let count = counts.entry(vendor).or_insert_with(|| {
            order.push(vendor);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<VendorCount> = order
        .into_iter()
        .map(|vendor| VendorCount {
            vendor: vendor.to_string(),
            unmatched_count: counts[vendor],
        })
        .collect();
    ranked.sort_by(|a, b| b.unmatched_count.cmp(&a.unmatched_count));
    ranked.truncate(TOP_VENDOR_LIMIT);
    ranked
}

/// Per-date sums for both ledgers, by date then internal before bank.
pub fn daily_totals(
    internal: &[InternalTransaction],
    bank: &[BankTransaction],
) -> Vec<DailyTotal> {
    let mut totals: BTreeMap<(NaiveDate, LedgerSource), Money> = BTreeMap::new();
    let rows = internal
        .iter()
        .map(|tx| (tx.date, LedgerSource::Internal, tx.amount))
        .chain(bank.iter().map(|tx| (tx.date, LedgerSource::Bank, tx.amount)));
    for (date, source, amount) in rows {
        let entry = totals.entry((date, source)).or_insert_with(Money::zero);
        *entry = entry.saturating_add(amount);
    }

    totals
        .into_iter()
        .map(|((date, source), amount)| DailyTotal { date, source, amount })
        .collect()
}
