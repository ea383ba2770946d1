use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tally_core::{normalize_vendor, BankTransaction, InternalTransaction, MatchRecord};
use tally_engine::Reconciliation;
use thiserror::Error;

use crate::csv::UndatedRow;

pub const MATCHES_FILE: &str = "matches.csv";
pub const UNMATCHED_INTERNAL_FILE: &str = "unmatched_internal.csv";
pub const UNMATCHED_BANK_FILE: &str = "unmatched_bank.csv";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Serialize)]
struct MatchRow<'a> {
    #[serde(rename = "Transaction_ID")]
    transaction_id: &'a str,
    #[serde(rename = "Internal_Date")]
    internal_date: NaiveDate,
    #[serde(rename = "Internal_Amount")]
    internal_amount: String,
    #[serde(rename = "Vendor_internal")]
    vendor_internal: &'a str,
    #[serde(rename = "Bank_Ref")]
    bank_ref: &'a str,
    #[serde(rename = "Bank_Date")]
    bank_date: NaiveDate,
    #[serde(rename = "Bank_Amount")]
    bank_amount: String,
    #[serde(rename = "Vendor_bank")]
    vendor_bank: &'a str,
    #[serde(rename = "Vendor_similarity")]
    vendor_similarity: f64,
    #[serde(rename = "Amount_diff")]
    amount_diff: String,
    #[serde(rename = "MatchType")]
    match_type: String,
}

impl<'a> From<&'a MatchRecord> for MatchRow<'a> {
    fn from(m: &'a MatchRecord) -> Self {
        MatchRow {
            transaction_id: &m.transaction_id,
            internal_date: m.internal_date,
            internal_amount: m.internal_amount.as_decimal().to_string(),
            vendor_internal: m.vendor_internal.as_deref().unwrap_or_default(),
            bank_ref: &m.bank_ref,
            bank_date: m.bank_date,
            bank_amount: m.bank_amount.as_decimal().to_string(),
            vendor_bank: m.vendor_bank.as_deref().unwrap_or_default(),
            vendor_similarity: m.vendor_similarity,
            amount_diff: m.amount_diff.as_decimal().to_string(),
            match_type: m.match_type.to_string(),
        }
    }
}

pub fn write_matches<W: Write>(writer: W, matches: &[MatchRecord]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if matches.is_empty() {
        wtr.write_record([
            "Transaction_ID",
            "Internal_Date",
            "Internal_Amount",
            "Vendor_internal",
            "Bank_Ref",
            "Bank_Date",
            "Bank_Amount",
            "Vendor_bank",
            "Vendor_similarity",
            "Amount_diff",
            "MatchType",
        ])?;
    }
    for m in matches {
        wtr.serialize(MatchRow::from(m))?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Undated rows follow the dated ones, with their date cell as read.
pub fn write_internal<W: Write>(
    writer: W,
    rows: &[InternalTransaction],
    undated: &[UndatedRow],
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Transaction_ID", "Date", "Amount", "Vendor", "Vendor_clean"])?;
    for tx in rows {
        let date = tx.date.to_string();
        let amount = tx.amount.as_decimal().to_string();
        wtr.write_record([
            tx.transaction_id.as_str(),
            date.as_str(),
            amount.as_str(),
            tx.vendor.as_deref().unwrap_or_default(),
            tx.vendor_normalized.as_str(),
        ])?;
    }
    write_undated(&mut wtr, undated)?;
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_bank<W: Write>(
    writer: W,
    rows: &[BankTransaction],
    undated: &[UndatedRow],
) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Bank_Ref", "Date", "Amount", "Vendor_Name", "Vendor_clean"])?;
    for tx in rows {
        let date = tx.date.to_string();
        let amount = tx.amount.as_decimal().to_string();
        wtr.write_record([
            tx.bank_ref.as_str(),
            date.as_str(),
            amount.as_str(),
            tx.vendor_name.as_deref().unwrap_or_default(),
            tx.vendor_normalized.as_str(),
        ])?;
    }
    write_undated(&mut wtr, undated)?;
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn write_undated<W: Write>(
    wtr: &mut csv::Writer<W>,
    undated: &[UndatedRow],
) -> Result<(), ExportError> {
    for row in undated {
        let amount = row.amount.as_decimal().to_string();
        let vendor_clean = normalize_vendor(row.vendor.as_deref());
        wtr.write_record([
            row.id.as_str(),
            row.raw_date.as_str(),
            amount.as_str(),
            row.vendor.as_deref().unwrap_or_default(),
            vendor_clean.as_str(),
        ])?;
    }
    Ok(())
}

/// Writes the three result files into `dir`, returning their paths.
/// Undated rows are appended to the unmatched files of their ledger.
pub fn export_to_dir(
    dir: &Path,
    result: &Reconciliation,
    undated_internal: &[UndatedRow],
    undated_bank: &[UndatedRow],
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let create = |name: &str| {
        let path = dir.join(name);
        File::create(&path)
            .map(|file| (file, path.clone()))
            .map_err(|source| ExportError::Io { path, source })
    };

    let (file, matches_path) = create(MATCHES_FILE)?;
    write_matches(file, &result.matches)?;
    let (file, internal_path) = create(UNMATCHED_INTERNAL_FILE)?;
    write_internal(file, &result.unmatched_internal, undated_internal)?;
    let (file, bank_path) = create(UNMATCHED_BANK_FILE)?;
    write_bank(file, &result.unmatched_bank, undated_bank)?;

    tracing::info!(dir = %dir.display(), "results exported");
    Ok(vec![matches_path, internal_path, bank_path])
}
