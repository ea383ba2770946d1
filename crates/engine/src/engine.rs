use std::collections::HashSet;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tally_core::{BankTransaction, InternalTransaction, MatchRecord};

use crate::bucket::AmountBucketIndex;
use crate::params::{MatchParams, ParamsError};
use crate::similarity::similarity;

/// Weight of the relative amount difference in a candidate's score.
const AMOUNT_PENALTY_WEIGHT: f64 = 0.25;

/// Result of one reconciliation run. Every input record lands in exactly one
/// of the matched or unmatched collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// In internal processing order.
    pub matches: Vec<MatchRecord>,
    /// Same relative order as the internal input.
    pub unmatched_internal: Vec<InternalTransaction>,
    /// Same relative order as the bank input.
    pub unmatched_bank: Vec<BankTransaction>,
}

impl Reconciliation {
    pub fn find_match(&self, transaction_id: &str) -> Option<&MatchRecord> {
        self.matches.iter().find(|m| m.transaction_id == transaction_id)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    bank_pos: usize,
    score: f64,
    similarity: f64,
}

/// Greedy, single-pass matcher.
///
/// Internal records are visited in input order and each takes the best
/// remaining bank record from its own and the two neighbouring amount
/// buckets. A taken bank record is consumed for the rest of the run, so
/// earlier internal records win contended bank records.
#[derive(Debug, Clone, Default)]
pub struct ReconcileEngine {
    params: MatchParams,
}

impl ReconcileEngine {
    pub fn new(params: MatchParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn reconcile(
        &self,
        internal: &[InternalTransaction],
        bank: &[BankTransaction],
    ) -> Reconciliation {
        tracing::debug!(
            internal = internal.len(),
            bank = bank.len(),
            date_tolerance_days = self.params.date_tolerance_days,
            similarity_threshold = self.params.similarity_threshold,
            amount_tolerance = %self.params.amount_tolerance,
            "starting reconciliation; amount tolerance does not gate matches"
        );

        let index = AmountBucketIndex::build(bank);
        let mut used: HashSet<usize> = HashSet::new();
        let mut matches = Vec::new();
        let mut unmatched_internal = Vec::new();

        for tx in internal {
            match self.find_best_match(tx, &index, &used) {
                Some(best) => {
                    used.insert(best.bank_pos);
                    let record = MatchRecord::pair(tx, &bank[best.bank_pos], best.similarity);
                    tracing::debug!(
                        transaction_id = %record.transaction_id,
                        bank_ref = %record.bank_ref,
                        similarity = best.similarity,
                        score = best.score,
                        "matched"
                    );
                    matches.push(record);
                }
                None => unmatched_internal.push(tx.clone()),
            }
        }

        let unmatched_bank: Vec<BankTransaction> = bank
            .iter()
            .enumerate()
            .filter(|(pos, _)| !used.contains(pos))
            .map(|(_, tx)| tx.clone())
            .collect();

        tracing::info!(
            matched = matches.len(),
            unmatched_internal = unmatched_internal.len(),
            unmatched_bank = unmatched_bank.len(),
            "reconciliation finished"
        );

        Reconciliation {
            matches,
            unmatched_internal,
            unmatched_bank,
        }
    }

    /// First candidate with the strictly highest positive score among those
    /// that clear the date window and similarity threshold. Equal scores keep
    /// the earlier candidate in bucket search order.
    fn find_best_match(
        &self,
        tx: &InternalTransaction,
        index: &AmountBucketIndex<'_>,
        used: &HashSet<usize>,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        let mut best_score = 0.0;

        for (bank_pos, candidate) in index.candidates(tx.amount) {
            if used.contains(&bank_pos) {
                continue;
            }
            if !self.within_date_window(tx, candidate) {
                continue;
            }

            let sim = similarity(&tx.vendor_normalized, &candidate.vendor_normalized);
            let score = sim - amount_penalty(tx, candidate);
            if score > best_score && sim >= self.params.similarity_threshold {
                best_score = score;
                best = Some(Candidate {
                    bank_pos,
                    score,
                    similarity: sim,
                });
            }
        }

        best
    }

    fn within_date_window(&self, tx: &InternalTransaction, candidate: &BankTransaction) -> bool {
        let days = (tx.date - candidate.date).num_days().unsigned_abs();
        days <= u64::from(self.params.date_tolerance_days)
    }
}

/// `|a - b| / (|a| + 1) * 0.25`, with `a` the internal amount.
///
/// At the top of the decimal range `|a| + 1` is not representable; `|a|`
/// alone stands in for it there.
fn amount_penalty(tx: &InternalTransaction, candidate: &BankTransaction) -> f64 {
    let amount = tx.amount.as_decimal();
    let magnitude = amount.abs();
    let denominator = magnitude.checked_add(Decimal::ONE).unwrap_or(magnitude);
    let relative = amount
        .checked_sub(candidate.amount.as_decimal())
        .map(|diff| diff.abs())
        .and_then(|diff| diff.checked_div(denominator))
        .and_then(|r| r.to_f64())
        .unwrap_or(f64::INFINITY);
    relative * AMOUNT_PENALTY_WEIGHT
}

/// Reconciles with the given parameters. See [`ReconcileEngine`].
pub fn reconcile(
    internal: &[InternalTransaction],
    bank: &[BankTransaction],
    params: &MatchParams,
) -> Result<Reconciliation, ParamsError> {
    Ok(ReconcileEngine::new(params.clone())?.reconcile(internal, bank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use tally_core::Money;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    fn int_tx(id: &str, d: NaiveDate, amount: &str, vendor: &str) -> InternalTransaction {
        InternalTransaction::new(id, d, money(amount), Some(vendor.to_string()))
    }

    fn bank_tx(r: &str, d: NaiveDate, amount: &str, vendor: &str) -> BankTransaction {
        BankTransaction::new(r, d, money(amount), Some(vendor.to_string()))
    }

    fn engine(date_tol: u32, threshold: f64) -> ReconcileEngine {
        ReconcileEngine::new(MatchParams::new(date_tol, money("50"), threshold)).unwrap()
    }

    #[test]
    fn matches_normalized_vendor_within_date_window() {
        let internal = vec![int_tx("T1", date(2024, 1, 10), "1000.00", "Acme Ltd")];
        let bank = vec![bank_tx("B1", date(2024, 1, 11), "1000.00", "ACME")];
        let out = engine(2, 0.75).reconcile(&internal, &bank);

        assert_eq!(out.matches.len(), 1);
        let m = &out.matches[0];
        assert_eq!(m.transaction_id, "T1");
        assert_eq!(m.bank_ref, "B1");
        assert!(m.amount_diff.is_zero());
        assert_eq!(m.date_diff_days(), 1);
        assert_eq!(m.vendor_similarity, 1.0);
        assert!(out.unmatched_internal.is_empty());
        assert!(out.unmatched_bank.is_empty());
    }

    #[test]
    fn date_outside_window_is_unmatched() {
        let internal = vec![int_tx("T2", date(2024, 2, 1), "500.00", "Zylo Corp")];
        let bank = vec![bank_tx("B2", date(2024, 2, 20), "500.00", "Zylo Corp")];
        let out = engine(2, 0.75).reconcile(&internal, &bank);

        assert!(out.matches.is_empty());
        assert_eq!(out.unmatched_internal[0].transaction_id, "T2");
        assert_eq!(out.unmatched_bank[0].bank_ref, "B2");
    }

    #[test]
    fn date_window_is_inclusive() {
        let internal = vec![int_tx("T1", date(2024, 3, 1), "200", "Globex")];
        let bank = vec![bank_tx("B1", date(2024, 3, 3), "200", "Globex")];
        assert_eq!(engine(2, 0.75).reconcile(&internal, &bank).matches.len(), 1);
        assert!(engine(1, 0.75).reconcile(&internal, &bank).matches.is_empty());
    }

    #[test]
    fn earlier_internal_record_wins_contended_bank_record() {
        let internal = vec![
            int_tx("T1", date(2024, 4, 1), "300", "Initech Services"),
            int_tx("T2", date(2024, 4, 1), "300", "Initech"),
        ];
        let bank = vec![bank_tx("B1", date(2024, 4, 1), "300", "Initech")];
        let out = engine(2, 0.5).reconcile(&internal, &bank);

        assert_eq!(out.matches.len(), 1);
        assert_eq!(out.matches[0].transaction_id, "T1");
        assert!(out.matches[0].vendor_similarity < 1.0);
        assert_eq!(out.unmatched_internal.len(), 1);
        assert_eq!(out.unmatched_internal[0].transaction_id, "T2");
    }

    #[test]
    fn zero_amount_does_not_divide_by_zero() {
        let internal = vec![int_tx("T0", date(2024, 5, 1), "0.00", "Refund Desk")];
        let bank = vec![bank_tx("B0", date(2024, 5, 1), "4.00", "Refund Desk")];
        let out = engine(0, 0.75).reconcile(&internal, &bank);
        // penalty = 4 / (0 + 1) * 0.25 = 1.0 cancels the perfect similarity
        assert!(out.matches.is_empty());

        let bank = vec![bank_tx("B0", date(2024, 5, 1), "2.00", "Refund Desk")];
        let out = engine(0, 0.75).reconcile(&internal, &bank);
        assert_eq!(out.matches.len(), 1);
        assert_eq!(out.matches[0].amount_diff, money("2"));
    }

    #[test]
    fn prefers_closer_amount_when_vendors_tie() {
        let internal = vec![int_tx("T1", date(2024, 6, 1), "100", "Hooli")];
        let bank = vec![
            bank_tx("B_far", date(2024, 6, 1), "108", "Hooli"),
            bank_tx("B_near", date(2024, 6, 1), "101", "Hooli"),
        ];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        assert_eq!(out.matches[0].bank_ref, "B_near");
    }

    #[test]
    fn equal_scores_keep_first_in_search_order() {
        let internal = vec![int_tx("T1", date(2024, 6, 1), "100", "Hooli")];
        let bank = vec![
            bank_tx("B_first", date(2024, 6, 2), "100", "Hooli"),
            bank_tx("B_second", date(2024, 6, 1), "100", "Hooli"),
        ];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        assert_eq!(out.matches[0].bank_ref, "B_first");
    }

    #[test]
    fn lower_bucket_is_searched_first() {
        // 94 -> bucket 9, 100 -> bucket 10, both score equally against 97.
        let internal = vec![int_tx("T1", date(2024, 6, 1), "97", "Hooli")];
        let bank = vec![
            bank_tx("B_own", date(2024, 6, 1), "100", "Hooli"),
            bank_tx("B_low", date(2024, 6, 1), "94", "Hooli"),
        ];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        assert_eq!(out.matches[0].bank_ref, "B_low");
    }

    #[test]
    fn amounts_two_buckets_apart_are_never_candidates() {
        let internal = vec![int_tx("T1", date(2024, 6, 1), "100", "Hooli")];
        let bank = vec![bank_tx("B1", date(2024, 6, 1), "121", "Hooli")];
        assert!(engine(2, 0.0).reconcile(&internal, &bank).matches.is_empty());
    }

    #[test]
    fn similarity_below_threshold_is_rejected() {
        let internal = vec![int_tx("T1", date(2024, 7, 1), "250", "Umbrella")];
        let bank = vec![bank_tx("B1", date(2024, 7, 1), "250", "Soylent")];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        assert!(out.matches.is_empty());
        assert_eq!(out.unmatched_bank.len(), 1);
    }

    #[test]
    fn consumed_bank_record_is_skipped_for_later_records() {
        let internal = vec![
            int_tx("T1", date(2024, 8, 1), "75", "Stark"),
            int_tx("T2", date(2024, 8, 1), "75", "Stark"),
        ];
        let bank = vec![
            bank_tx("B1", date(2024, 8, 1), "75", "Stark"),
            bank_tx("B2", date(2024, 8, 2), "75", "Stark"),
        ];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        let pairs: Vec<_> = out
            .matches
            .iter()
            .map(|m| (m.transaction_id.as_str(), m.bank_ref.as_str()))
            .collect();
        assert_eq!(pairs, vec![("T1", "B1"), ("T2", "B2")]);
    }

    #[test]
    fn negative_amounts_use_absolute_denominator() {
        let internal = vec![int_tx("T1", date(2024, 9, 1), "-1.00", "Wayne")];
        let bank = vec![bank_tx("B1", date(2024, 9, 1), "-1.00", "Wayne")];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        assert_eq!(out.matches.len(), 1);
    }

    #[test]
    fn missing_vendors_never_match_above_zero_threshold() {
        let internal = vec![InternalTransaction::new("T1", date(2024, 9, 1), money("10"), None)];
        let bank = vec![bank_tx("B1", date(2024, 9, 1), "10", "Wayne")];
        let out = engine(2, 0.1).reconcile(&internal, &bank);
        assert!(out.matches.is_empty());
    }

    #[test]
    fn empty_inputs_pass_through() {
        let bank = vec![bank_tx("B1", date(2024, 9, 1), "10", "Wayne")];
        let out = engine(2, 0.75).reconcile(&[], &bank);
        assert!(out.matches.is_empty());
        assert_eq!(out.unmatched_bank, bank);

        let internal = vec![int_tx("T1", date(2024, 9, 1), "10", "Wayne")];
        let out = engine(2, 0.75).reconcile(&internal, &[]);
        assert_eq!(out.unmatched_internal, internal);
        assert!(out.unmatched_bank.is_empty());
    }

    #[test]
    fn unmatched_bank_keeps_original_order() {
        let internal = vec![int_tx("T1", date(2024, 9, 1), "500", "Massive Dynamic")];
        let bank = vec![
            bank_tx("B1", date(2024, 9, 1), "20", "Other"),
            bank_tx("B2", date(2024, 9, 1), "500", "Massive Dynamic"),
            bank_tx("B3", date(2024, 9, 1), "10", "Another"),
        ];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        let refs: Vec<_> = out.unmatched_bank.iter().map(|b| b.bank_ref.as_str()).collect();
        assert_eq!(refs, vec!["B1", "B3"]);
    }

    #[test]
    fn amount_tolerance_does_not_change_results() {
        let internal = vec![int_tx("T1", date(2024, 1, 10), "1000", "Acme")];
        let bank = vec![bank_tx("B1", date(2024, 1, 10), "1009", "Acme")];
        let tight = MatchParams::new(2, money("0"), 0.75);
        let loose = MatchParams::new(2, money("500"), 0.75);
        assert_eq!(
            reconcile(&internal, &bank, &tight).unwrap(),
            reconcile(&internal, &bank, &loose).unwrap()
        );
    }

    #[test]
    fn largest_representable_amounts_do_not_overflow() {
        let internal = vec![InternalTransaction::new(
            "T1",
            date(2024, 1, 10),
            Money::new(Decimal::MAX),
            Some("Acme".to_string()),
        )];
        let bank = vec![
            BankTransaction::new("B0", date(2024, 1, 10), Money::new(Decimal::MIN), None),
            BankTransaction::new(
                "B1",
                date(2024, 1, 10),
                Money::new(Decimal::MAX),
                Some("Acme".to_string()),
            ),
        ];
        let out = reconcile(&internal, &bank, &MatchParams::default()).unwrap();
        assert_eq!(out.matches.len(), 1);
        assert_eq!(out.matches[0].bank_ref, "B1");
        assert!(out.matches[0].amount_diff.is_zero());
        assert_eq!(out.unmatched_bank[0].bank_ref, "B0");
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(ReconcileEngine::new(MatchParams::new(2, money("0"), 2.0)).is_err());
    }

    #[test]
    fn find_match_by_transaction_id() {
        let internal = vec![int_tx("T1", date(2024, 1, 10), "1000", "Acme")];
        let bank = vec![bank_tx("B1", date(2024, 1, 10), "1000", "Acme")];
        let out = engine(2, 0.75).reconcile(&internal, &bank);
        assert_eq!(out.find_match("T1").map(|m| m.bank_ref.as_str()), Some("B1"));
        assert!(out.find_match("T9").is_none());
    }
}
