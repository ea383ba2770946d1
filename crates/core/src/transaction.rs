use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::normalize::normalize_vendor;

/// Which ledger a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LedgerSource {
    Internal,
    Bank,
}

impl fmt::Display for LedgerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerSource::Internal => write!(f, "Internal"),
            LedgerSource::Bank => write!(f, "Bank"),
        }
    }
}

/// A record from the organization's own ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalTransaction {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub vendor: Option<String>,
    pub vendor_normalized: String,
}

impl InternalTransaction {
    pub fn new(
        transaction_id: impl Into<String>,
        date: NaiveDate,
        amount: Money,
        vendor: Option<String>,
    ) -> Self {
        let vendor_normalized = normalize_vendor(vendor.as_deref());
        InternalTransaction {
            transaction_id: transaction_id.into(),
            date,
            amount,
            vendor,
            vendor_normalized,
        }
    }
}

/// A record from the bank statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub bank_ref: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub vendor_name: Option<String>,
    pub vendor_normalized: String,
}

impl BankTransaction {
    pub fn new(
        bank_ref: impl Into<String>,
        date: NaiveDate,
        amount: Money,
        vendor_name: Option<String>,
    ) -> Self {
        let vendor_normalized = normalize_vendor(vendor_name.as_deref());
        BankTransaction {
            bank_ref: bank_ref.into(),
            date,
            amount,
            vendor_name,
            vendor_normalized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchType {
    #[default]
    Fuzzy,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Fuzzy => write!(f, "Fuzzy"),
        }
    }
}

/// One accepted internal/bank pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub transaction_id: String,
    pub internal_date: NaiveDate,
    pub internal_amount: Money,
    pub vendor_internal: Option<String>,
    pub bank_ref: String,
    pub bank_date: NaiveDate,
    pub bank_amount: Money,
    pub vendor_bank: Option<String>,
    pub vendor_similarity: f64,
    pub amount_diff: Money,
    pub match_type: MatchType,
}

impl MatchRecord {
    pub fn pair(internal: &InternalTransaction, bank: &BankTransaction, similarity: f64) -> Self {
        MatchRecord {
            transaction_id: internal.transaction_id.clone(),
            internal_date: internal.date,
            internal_amount: internal.amount,
            vendor_internal: internal.vendor.clone(),
            bank_ref: bank.bank_ref.clone(),
            bank_date: bank.date,
            bank_amount: bank.amount,
            vendor_bank: bank.vendor_name.clone(),
            vendor_similarity: similarity,
            amount_diff: internal.amount.abs_diff(bank.amount),
            match_type: MatchType::Fuzzy,
        }
    }

    /// Absolute distance between the two booking dates, in whole days.
    pub fn date_diff_days(&self) -> u64 {
        (self.internal_date - self.bank_date).num_days().unsigned_abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn constructors_normalize_vendor() {
        let tx = InternalTransaction::new(
            "T1",
            date(2024, 1, 10),
            Money::from_cents(100000),
            Some("Acme Ltd".to_string()),
        );
        assert_eq!(tx.vendor_normalized, "acme");

        let b = BankTransaction::new("B1", date(2024, 1, 11), Money::from_cents(100000), None);
        assert_eq!(b.vendor_normalized, "");
    }

    #[test]
    fn pair_copies_both_sides() {
        let tx = InternalTransaction::new(
            "T1",
            date(2024, 1, 10),
            Money::from_cents(100000),
            Some("Acme Ltd".to_string()),
        );
        let b = BankTransaction::new(
            "B1",
            date(2024, 1, 13),
            Money::from_cents(99950),
            Some("ACME".to_string()),
        );
        let rec = MatchRecord::pair(&tx, &b, 1.0);
        assert_eq!(rec.transaction_id, "T1");
        assert_eq!(rec.bank_ref, "B1");
        assert_eq!(rec.vendor_internal.as_deref(), Some("Acme Ltd"));
        assert_eq!(rec.vendor_bank.as_deref(), Some("ACME"));
        assert_eq!(rec.amount_diff, Money::from_cents(50));
        assert_eq!(rec.date_diff_days(), 3);
        assert_eq!(rec.match_type, MatchType::Fuzzy);
    }

    #[test]
    fn match_type_serializes_as_tag() {
        assert_eq!(MatchType::Fuzzy.to_string(), "Fuzzy");
        assert_eq!(serde_json::to_string(&MatchType::Fuzzy).unwrap(), "\"Fuzzy\"");
    }
}
