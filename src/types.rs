use chrono::{NaiveDate, Weekday};
use serde::Serialize;
use tabled::Tabled;

use crate::categorize::ProjectMatch;

/// One input row before any repair: every cell is optional text, empty cells
/// are `None`.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub donor_name: Option<String>,
    pub email: Option<String>,
    pub donation_type: Option<String>,
    pub project: Option<String>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub phone: Option<String>,
    pub payment_method: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// Values of uninterpreted columns, in header order.
    pub extras: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonationRecord {
    pub donor_name: String,
    pub email: String,
    pub donation_type: Option<String>,
    pub project: ProjectMatch,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub phone: String,
    pub payment_method: String,
    pub location: Option<String>,
    pub notes: String,
    pub extras: Vec<Option<String>>,
    pub derived: Derived,
}

/// Attributes computed from `date` for downstream aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derived {
    pub month: Option<u32>,
    pub day_of_week: Option<Weekday>,
    pub is_holiday: bool,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopDonorRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Donor Name")]
    #[tabled(rename = "Donor Name")]
    pub donor_name: String,
    #[serde(rename = "Largest Donation")]
    #[tabled(rename = "Largest Donation")]
    pub largest_donation: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegularDonorRow {
    #[serde(rename = "Donor Name")]
    #[tabled(rename = "Donor Name")]
    pub donor_name: String,
    #[serde(rename = "Donation Count")]
    #[tabled(rename = "Donation Count")]
    pub donation_count: usize,
    #[serde(rename = "Total Donated")]
    #[tabled(rename = "Total Donated")]
    pub total_donated: String,
    #[serde(rename = "Average Donation")]
    #[tabled(rename = "Average Donation")]
    pub average_donation: String,
}

/// Count and sum of donations for one value of a grouping column.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CategoryTotalRow {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Donations")]
    #[tabled(rename = "Donations")]
    pub donations: usize,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProjectTypeRow {
    #[serde(rename = "Project")]
    #[tabled(rename = "Project")]
    pub project: String,
    #[serde(rename = "Donation Type")]
    #[tabled(rename = "Donation Type")]
    pub donation_type: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub amount_col: String,
    pub currency: String,
    pub total_rows: usize,
    pub total_donations: f64,
    pub average_donation: f64,
    pub unique_donors: usize,
    pub regular_donors: usize,
    pub loyalty_rate: f64,
    pub top_donor: Option<String>,
    pub top_project: Option<String>,
    pub popular_method: Option<String>,
    pub unmatched_projects: usize,
    pub invalid_phones: usize,
    pub other_payment_methods: usize,
}
