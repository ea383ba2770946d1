use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tally_core::{BankTransaction, Money};

/// Fixed quantization width of the amount buckets, in currency units.
pub const BUCKET_WIDTH: i64 = 10;

/// `round(amount / 10)`, half to even.
///
/// Every integral `Decimal` fits in an `i128`, so keys never saturate and
/// `key ± 1` cannot overflow.
pub fn bucket_key(amount: Money) -> i128 {
    (amount.as_decimal() / Decimal::from(BUCKET_WIDTH))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i128()
        .unwrap_or_default()
}

/// The bucket itself and its two neighbours, lowest first.
pub fn neighbour_keys(key: i128) -> [i128; 3] {
    [key - 1, key, key + 1]
}

/// Bank records grouped by [`bucket_key`], each bucket in original bank order.
#[derive(Debug, Default)]
pub struct AmountBucketIndex<'a> {
    buckets: HashMap<i128, Vec<(usize, &'a BankTransaction)>>,
}

impl<'a> AmountBucketIndex<'a> {
    pub fn build(bank: &'a [BankTransaction]) -> Self {
        let mut buckets: HashMap<i128, Vec<(usize, &'a BankTransaction)>> = HashMap::new();
        for (pos, tx) in bank.iter().enumerate() {
            buckets.entry(bucket_key(tx.amount)).or_default().push((pos, tx));
        }
        Self { buckets }
    }

    /// Records in bucket `key`; empty when the bucket does not exist.
    pub fn get(&self, key: i128) -> &[(usize, &'a BankTransaction)] {
        self.buckets.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates for an amount in search order: buckets `k-1`, `k`, `k+1`.
    pub fn candidates(
        &self,
        amount: Money,
    ) -> impl Iterator<Item = (usize, &'a BankTransaction)> + '_ {
        neighbour_keys(bucket_key(amount))
            .into_iter()
            .flat_map(move |key| self.get(key).iter().copied())
    }
}
