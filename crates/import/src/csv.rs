use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;
use tally_core::{BankTransaction, InternalTransaction, Money};
use thiserror::Error;

const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y", "%d-%b-%Y", "%d %b %Y", "%Y-%m-%d",
    "%Y/%m/%d", "%m/%d/%Y",
];

const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y", "%b %d %Y", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y",
];

/// Header names and parsing options for one ledger file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerProfile {
    pub id_column: String,
    pub date_column: String,
    pub amount_column: String,
    pub vendor_column: String,
    /// Tried before the built-in formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    /// Read ambiguous dates such as `03/04/2024` as 3 April.
    pub day_first: bool,
    pub delimiter: char,
}

impl LedgerProfile {
    pub fn internal() -> Self {
        Self {
            id_column: "Transaction_ID".to_string(),
            date_column: "Date".to_string(),
            amount_column: "Amount".to_string(),
            vendor_column: "Vendor".to_string(),
            date_format: None,
            day_first: true,
            delimiter: ',',
        }
    }

    pub fn bank() -> Self {
        Self {
            id_column: "Bank_Ref".to_string(),
            vendor_column: "Vendor_Name".to_string(),
            ..Self::internal()
        }
    }
}

impl Default for LedgerProfile {
    fn default() -> Self {
        Self::internal()
    }
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Delimiter must be a single-byte character, got {0:?}")]
    InvalidDelimiter(char),
}

/// A row whose date could not be read. It can never fall inside a date
/// window, so it goes straight to the unmatched output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndatedRow {
    pub line: u64,
    pub id: String,
    pub raw_date: String,
    pub amount: Money,
    pub vendor: Option<String>,
}

/// Records ready for matching plus the rows that could not be dated.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLedger<T> {
    pub records: Vec<T>,
    pub undated: Vec<UndatedRow>,
}

/// One parsed row before it is turned into a ledger record.
#[derive(Debug, Clone)]
struct LedgerRow {
    line: u64,
    id: String,
    date: Option<NaiveDate>,
    raw_date: String,
    amount: Money,
    vendor: Option<String>,
}

impl LedgerRow {
    fn split<T>(
        rows: Vec<LedgerRow>,
        build: impl Fn(String, NaiveDate, Money, Option<String>) -> T,
    ) -> LoadedLedger<T> {
        let mut records = Vec::new();
        let mut undated = Vec::new();
        for row in rows {
            match row.date {
                Some(date) => records.push(build(row.id, date, row.amount, row.vendor)),
                None => undated.push(UndatedRow {
                    line: row.line,
                    id: row.id,
                    raw_date: row.raw_date,
                    amount: row.amount,
                    vendor: row.vendor,
                }),
            }
        }
        LoadedLedger { records, undated }
    }
}

/// Column positions resolved from the header row.
struct ColumnMap {
    id: usize,
    date: usize,
    amount: usize,
    vendor: usize,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord, profile: &LedgerProfile) -> Result<Self, CsvError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| CsvError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            id: find(&profile.id_column)?,
            date: find(&profile.date_column)?,
            amount: find(&profile.amount_column)?,
            vendor: find(&profile.vendor_column)?,
        })
    }
}

pub fn load_internal<R: Read>(
    data: R,
    profile: &LedgerProfile,
) -> Result<LoadedLedger<InternalTransaction>, CsvError> {
    Ok(LedgerRow::split(read_rows(data, profile)?, |id, date, amount, vendor| {
        InternalTransaction::new(id, date, amount, vendor)
    }))
}

pub fn load_bank<R: Read>(
    data: R,
    profile: &LedgerProfile,
) -> Result<LoadedLedger<BankTransaction>, CsvError> {
    Ok(LedgerRow::split(read_rows(data, profile)?, |id, date, amount, vendor| {
        BankTransaction::new(id, date, amount, vendor)
    }))
}

fn read_rows<R: Read>(data: R, profile: &LedgerProfile) -> Result<Vec<LedgerRow>, CsvError> {
    let delimiter = u8::try_from(profile.delimiter)
        .map_err(|_| CsvError::InvalidDelimiter(profile.delimiter))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data);

    let columns = ColumnMap::resolve(reader.headers()?, profile)?;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        let field = |col: usize| record.get(col).unwrap_or_default().trim();

        let raw_date = field(columns.date);
        let date = parse_date(raw_date, profile);
        if date.is_none() {
            tracing::warn!(line, value = raw_date, "unparseable date, row cannot match");
        }

        let raw_amount = field(columns.amount);
        let amount = parse_amount(raw_amount).unwrap_or_else(|| {
            tracing::warn!(line, value = raw_amount, "unparseable amount, using zero");
            Money::zero()
        });

        let vendor = Some(field(columns.vendor))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        rows.push(LedgerRow {
            line,
            id: field(columns.id).to_string(),
            date,
            raw_date: raw_date.to_string(),
            amount,
            vendor,
        });
    }

    tracing::debug!(rows = rows.len(), "ledger loaded");
    Ok(rows)
}

fn parse_date(s: &str, profile: &LedgerProfile) -> Option<NaiveDate> {
    // Timestamps such as `2024-01-15 00:00:00` keep only the date part.
    let s = match s.split_once([' ', 'T']) {
        Some((day, _)) if day.len() >= 8 && day.bytes().all(is_date_byte) => day,
        _ => s,
    };

    if let Some(format) = &profile.date_format {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    let fallbacks = if profile.day_first {
        DAY_FIRST_FORMATS
    } else {
        MONTH_FIRST_FORMATS
    };
    fallbacks
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn is_date_byte(b: u8) -> bool {
    b.is_ascii_digit() || b"-/.".contains(&b)
}

fn parse_amount(s: &str) -> Option<Money> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned = s.replace([',', '$', '₹', ' '], "");
    let mut dec = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    if negative {
        dec = -dec;
    }
    Some(Money::new(dec))
}
