// Batch-relative row filters: exact-duplicate removal and the one-sided
// high-amount trim. Both are single passes and keep input order.
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::types::DonationRecord;
use crate::util::quantile;

/// Every user-visible column of a record, in a hashable form.
#[derive(Hash, PartialEq, Eq)]
struct RowKey<'a> {
    donor_name: &'a str,
    email: &'a str,
    donation_type: Option<&'a str>,
    project: &'a str,
    amount: Option<u64>,
    date: Option<NaiveDate>,
    phone: &'a str,
    payment_method: &'a str,
    location: Option<&'a str>,
    notes: &'a str,
    extras: Vec<Option<&'a str>>,
}

impl<'a> RowKey<'a> {
    fn of(r: &'a DonationRecord) -> Self {
        Self {
            donor_name: &r.donor_name,
            email: &r.email,
            donation_type: r.donation_type.as_deref(),
            project: r.project.name(),
            // +0.0 folds -0.0 onto 0.0 so they compare equal as bits.
            amount: r.amount.map(|a| (a + 0.0).to_bits()),
            date: r.date,
            phone: &r.phone,
            payment_method: &r.payment_method,
            location: r.location.as_deref(),
            notes: &r.notes,
            extras: r.extras.iter().map(|e| e.as_deref()).collect(),
        }
    }
}

/// Drop rows equal to an earlier row in every column. Returns the kept rows
/// and how many were removed.
pub fn dedup_exact(records: Vec<DonationRecord>) -> (Vec<DonationRecord>, usize) {
    let before = records.len();
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(records.len());
        records.iter().map(|r| seen.insert(RowKey::of(r))).collect()
    };
    let kept: Vec<DonationRecord> = records
        .into_iter()
        .zip(keep)
        .filter_map(|(r, keep)| keep.then_some(r))
        .collect();
    let removed = before - kept.len();
    tracing::info!(removed, remaining = kept.len(), "removed exact duplicates");
    (kept, removed)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierTrim {
    /// Amount at the configured quantile, `None` when no row had an amount.
    pub threshold: Option<f64>,
    pub removed: usize,
}

/// Drop every row whose amount is above the `q` quantile of the batch.
///
/// Rows without a parseable amount cannot be shown to be within the bound
/// and are dropped too. Low amounts are never trimmed.
pub fn trim_outliers(records: Vec<DonationRecord>, q: f64) -> (Vec<DonationRecord>, OutlierTrim) {
    let amounts: Vec<f64> = records.iter().filter_map(|r| r.amount).collect();
    let threshold = quantile(amounts, q);
    let before = records.len();
    let kept: Vec<DonationRecord> = records
        .into_iter()
        .filter(|r| match (r.amount, threshold) {
            (Some(amount), Some(limit)) => amount <= limit,
            _ => false,
        })
        .collect();
    let removed = before - kept.len();
    tracing::info!(?threshold, removed, remaining = kept.len(), "trimmed high outliers");
    (kept, OutlierTrim { threshold, removed })
}
