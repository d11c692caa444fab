// Aggregations over the cleaned dataset. Everything here reads only the
// records plus the regime's currency code; no cleaning happens here.
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::derive::weekday_name;
use crate::loader::CleanedDataset;
use crate::normalize::{INVALID_PHONE, OTHER_PAYMENT};
use crate::types::{
    CategoryTotalRow, DonationRecord, ProjectTypeRow, RegularDonorRow, SummaryStats, TopDonorRow,
};
use crate::util::{average, format_money};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Default)]
struct Acc {
    count: usize,
    total: f64,
}

fn amount(r: &DonationRecord) -> f64 {
    r.amount.unwrap_or(0.0)
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Count and sum per key; rows for which `key` returns `None` are skipped.
fn group<K, F>(data: &[DonationRecord], key: F) -> Vec<(K, Acc)>
where
    K: std::hash::Hash + Eq,
    F: Fn(&DonationRecord) -> Option<K>,
{
    let mut map: HashMap<K, Acc> = HashMap::new();
    for r in data {
        if let Some(k) = key(r) {
            let e = map.entry(k).or_default();
            e.count += 1;
            e.total += amount(r);
        }
    }
    map.into_iter().collect()
}

fn to_rows(groups: Vec<(String, Acc)>, currency: &str) -> Vec<CategoryTotalRow> {
    groups
        .into_iter()
        .map(|(category, acc)| CategoryTotalRow {
            category,
            donations: acc.count,
            total: format_money(acc.total, currency),
        })
        .collect()
}

fn by_total_desc(mut groups: Vec<(String, Acc)>) -> Vec<(String, Acc)> {
    groups.sort_by(|a, b| desc(a.1.total, b.1.total).then_with(|| a.0.cmp(&b.0)));
    groups
}

/// Largest single donation per donor, top `limit`.
pub fn top_donors(data: &CleanedDataset, limit: usize) -> Vec<TopDonorRow> {
    let mut best: HashMap<&str, f64> = HashMap::new();
    for r in &data.records {
        let e = best.entry(r.donor_name.as_str()).or_insert(f64::MIN);
        *e = e.max(amount(r));
    }
    let mut ranked: Vec<(&str, f64)> = best.into_iter().collect();
    ranked.sort_by(|a, b| desc(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, (donor, value))| TopDonorRow {
            rank: idx + 1,
            donor_name: donor.to_string(),
            largest_donation: format_money(value, data.regime.code()),
        })
        .collect()
}

/// Donors with more than one donation, most frequent first.
pub fn regular_donors(data: &CleanedDataset) -> Vec<RegularDonorRow> {
    let mut groups: Vec<(String, Acc)> = group(&data.records, |r| Some(r.donor_name.clone()))
        .into_iter()
        .filter(|(_, acc)| acc.count > 1)
        .collect();
    groups.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
    let currency = data.regime.code();
    groups
        .into_iter()
        .map(|(donor_name, acc)| RegularDonorRow {
            donor_name,
            donation_count: acc.count,
            total_donated: format_money(acc.total, currency),
            average_donation: format_money(acc.total / acc.count as f64, currency),
        })
        .collect()
}

pub fn project_totals(data: &CleanedDataset) -> Vec<CategoryTotalRow> {
    let groups = group(&data.records, |r| Some(r.project.name().to_string()));
    to_rows(by_total_desc(groups), data.regime.code())
}

pub fn donation_type_totals(data: &CleanedDataset) -> Vec<CategoryTotalRow> {
    let mut groups = group(&data.records, |r| r.donation_type.clone());
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    to_rows(groups, data.regime.code())
}

/// Breakdown label for rows with no donation type.
const UNSPECIFIED_TYPE: &str = "Unspecified";

pub fn project_type_breakdown(data: &CleanedDataset) -> Vec<ProjectTypeRow> {
    let mut groups = group(&data.records, |r| {
        Some((
            r.project.name().to_string(),
            r.donation_type
                .clone()
                .unwrap_or_else(|| UNSPECIFIED_TYPE.to_string()),
        ))
    });
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    let currency = data.regime.code();
    groups
        .into_iter()
        .map(|((project, donation_type), acc)| ProjectTypeRow {
            project,
            donation_type,
            total: format_money(acc.total, currency),
        })
        .collect()
}

/// Locations by number of donations.
pub fn location_counts(data: &CleanedDataset) -> Vec<CategoryTotalRow> {
    let mut groups = group(&data.records, |r| r.location.clone());
    groups.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(&b.0)));
    to_rows(groups, data.regime.code())
}

/// Locations by donated amount.
pub fn location_totals(data: &CleanedDataset) -> Vec<CategoryTotalRow> {
    let groups = group(&data.records, |r| r.location.clone());
    to_rows(by_total_desc(groups), data.regime.code())
}

/// Totals per calendar month. Rows without a month are left out.
pub fn monthly_totals(data: &CleanedDataset) -> Vec<CategoryTotalRow> {
    let mut groups = group(&data.records, |r| r.derived.month);
    groups.sort_by_key(|(month, _)| *month);
    let named = groups
        .into_iter()
        .map(|(month, acc)| (MONTHS[(month as usize - 1) % 12].to_string(), acc))
        .collect();
    to_rows(named, data.regime.code())
}

pub fn weekday_totals(data: &CleanedDataset) -> Vec<CategoryTotalRow> {
    let groups = group(&data.records, |r| {
        r.derived.day_of_week.map(|d| weekday_name(d).to_string())
    });
    to_rows(by_total_desc(groups), data.regime.code())
}

pub fn holiday_totals(data: &CleanedDataset) -> Vec<CategoryTotalRow> {
    let mut groups = group(&data.records, |r| Some(r.derived.is_holiday));
    groups.sort_by_key(|(holiday, _)| *holiday);
    let named = groups
        .into_iter()
        .map(|(holiday, acc)| {
            let label = if holiday { "Holiday" } else { "Non-holiday" };
            (label.to_string(), acc)
        })
        .collect();
    to_rows(named, data.regime.code())
}

/// Most frequent value; ties go to the alphabetically first.
fn most_common<'a, I>(values: I) -> Option<String>
where
    I: Iterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    counts
        .into_iter()
        .min_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(v, _)| v.to_string())
}

pub fn generate_summary(data: &CleanedDataset) -> SummaryStats {
    let records = &data.records;
    let amounts: Vec<f64> = records.iter().map(amount).collect();

    let mut per_donor: HashMap<&str, usize> = HashMap::new();
    for r in records {
        *per_donor.entry(r.donor_name.as_str()).or_default() += 1;
    }
    let unique_donors = per_donor.len();
    let regular_donors = per_donor.values().filter(|c| **c > 1).count();
    let loyalty_rate = if unique_donors == 0 {
        0.0
    } else {
        regular_donors as f64 / unique_donors as f64 * 100.0
    };

    // First row holding the largest amount.
    let top_donor = records
        .iter()
        .fold(None::<&DonationRecord>, |best, r| match best {
            Some(b) if amount(b) >= amount(r) => Some(b),
            _ => Some(r),
        })
        .map(|r| r.donor_name.clone());

    let unmatched: HashSet<&str> = records
        .iter()
        .filter(|r| !r.project.is_matched())
        .map(|r| r.project.name())
        .collect();

    SummaryStats {
        amount_col: data.amount_col.clone(),
        currency: data.regime.code().to_string(),
        total_rows: records.len(),
        total_donations: amounts.iter().sum(),
        average_donation: average(&amounts),
        unique_donors,
        regular_donors,
        loyalty_rate,
        top_donor,
        top_project: most_common(records.iter().map(|r| r.project.name())),
        popular_method: most_common(records.iter().map(|r| r.payment_method.as_str())),
        unmatched_projects: unmatched.len(),
        invalid_phones: records.iter().filter(|r| r.phone == INVALID_PHONE).count(),
        other_payment_methods: records
            .iter()
            .filter(|r| r.payment_method == OTHER_PAYMENT)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanerConfig;
    use crate::loader::clean_reader;
    use crate::schema::Regime;

    const INPUT: &str = "Donor Name,Donation Type,Project,Donation Amount,Date,Phone,Payment Method,Location\n\
        Amina,Zakat,Orphan Children,100,2024-12-25,01712345678,Bkash,Dhaka\n\
        Amina,Monthly,Orphan Children,200,2024-01-10,01712345678,Bkash,Dhaka\n\
        Karim,Zakat,Medical Aid,300,2024-01-11,123,Card,Sylhet\n\
        Nusrat,Sadaqah,Food Drive,50,2024-02-05,01811223344,Cash,Dhaka\n\
        Nusrat,Sadaqah,Food Drive,60,not a date,01811223344,Nagad,Dhaka\n\
        Rahim,Zakat,Medical Aid,100000,2024-03-01,01911000111,Card,Khulna\n";

    fn data() -> CleanedDataset {
        clean_reader(INPUT.as_bytes(), Regime::Bdt, &CleanerConfig::default())
            .unwrap()
            .0
    }

    #[test]
    fn test_outlier_is_excluded_from_reports() {
        let d = data();
        assert_eq!(d.records.len(), 5);
        assert!(d.records.iter().all(|r| r.donor_name != "Rahim"));
    }

    #[test]
    fn test_summary() {
        let s = generate_summary(&data());
        assert_eq!(s.currency, "BDT");
        assert_eq!(s.amount_col, "Donation Amount");
        assert_eq!(s.total_rows, 5);
        assert_eq!(s.total_donations, 710.0);
        assert_eq!(s.average_donation, 142.0);
        assert_eq!(s.unique_donors, 3);
        assert_eq!(s.regular_donors, 2);
        assert!((s.loyalty_rate - 66.666).abs() < 0.01);
        assert_eq!(s.top_donor.as_deref(), Some("Karim"));
        assert_eq!(s.top_project.as_deref(), Some("Food Drive"));
        assert_eq!(s.popular_method.as_deref(), Some("Bkash"));
        assert_eq!(s.unmatched_projects, 1);
        assert_eq!(s.invalid_phones, 1);
        assert_eq!(s.other_payment_methods, 1);
    }

    #[test]
    fn test_top_and_regular_donors() {
        let d = data();
        let top = top_donors(&d, 10);
        let names: Vec<_> = top.iter().map(|r| r.donor_name.as_str()).collect();
        assert_eq!(names, vec!["Karim", "Amina", "Nusrat"]);
        assert_eq!(top[0].largest_donation, "300.00 BDT");
        assert_eq!(top_donors(&d, 1).len(), 1);

        let regular = regular_donors(&d);
        assert_eq!(regular.len(), 2);
        assert_eq!(regular[0].donor_name, "Amina");
        assert_eq!(regular[0].donation_count, 2);
        assert_eq!(regular[0].total_donated, "300.00 BDT");
        assert_eq!(regular[0].average_donation, "150.00 BDT");
    }

    #[test]
    fn test_grouped_totals() {
        let d = data();
        let projects = project_totals(&d);
        // Equal totals fall back to name order.
        assert_eq!(projects[0].category, "Medical Aid");
        assert_eq!(projects[1].category, "Orphan Children");
        assert_eq!(projects[1].total, "300.00 BDT");
        assert_eq!(projects[2].category, "Food Drive");

        let types: Vec<_> = donation_type_totals(&d)
            .into_iter()
            .map(|r| r.category)
            .collect();
        assert_eq!(types, vec!["Monthly", "Sadaqah", "Zakat"]);

        let months = monthly_totals(&d);
        let labels: Vec<_> = months.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(labels, vec!["Jan", "Feb", "Dec"]);
        assert_eq!(months[0].total, "500.00 BDT");

        let holidays = holiday_totals(&d);
        assert_eq!(holidays[0].category, "Non-holiday");
        assert_eq!(holidays[1].category, "Holiday");
        assert_eq!(holidays[1].total, "100.00 BDT");

        let locations = location_counts(&d);
        assert_eq!(locations[0].category, "Dhaka");
        assert_eq!(locations[0].donations, 4);

        let breakdown = project_type_breakdown(&d);
        assert_eq!(breakdown.len(), 4);
        assert_eq!(breakdown[0].project, "Food Drive");

        let weekdays = weekday_totals(&d);
        assert_eq!(weekdays.iter().map(|r| r.donations).sum::<usize>(), 4);
    }

    #[test]
    fn test_breakdown_labels_missing_type() {
        let mut d = data();
        d.records[2].donation_type = None;
        let karim = d.records[2].project.name().to_string();
        let breakdown = project_type_breakdown(&d);
        let row = breakdown
            .iter()
            .find(|r| r.project == karim && r.donation_type == UNSPECIFIED_TYPE)
            .unwrap();
        assert_eq!(row.total, "300.00 BDT");
    }
}
