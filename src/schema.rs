//! Schema resolution: which column holds the amount, what every other column
//! means, and which currency regime governs the batch.
//!
//! The mapping is built once from the header row so the rest of the pipeline
//! works with typed column roles instead of searching names per row.
use std::fmt;
use std::str::FromStr;

use crate::error::{CleanError, Result};

const AMOUNT_MARKER: &str = "donation amount";

/// Currency/locale context for a whole batch. Fixed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    Bdt,
    Usd,
}

impl Regime {
    /// Guess the regime from a source identifier such as the upload's file
    /// name: `BDT` when it mentions "bdt" or "bangladesh", else `USD`.
    ///
    /// This is a naming heuristic, not an inference from the data; callers
    /// that know better should pass the regime explicitly.
    pub fn from_source(source_id: &str) -> Self {
        let lower = source_id.to_lowercase();
        if lower.contains("bdt") || lower.contains("bangladesh") {
            Regime::Bdt
        } else {
            Regime::Usd
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Regime::Bdt => "BDT",
            Regime::Usd => "USD",
        }
    }

    pub fn phone_prefix(&self) -> &'static str {
        match self {
            Regime::Bdt => "+880",
            Regime::Usd => "+1",
        }
    }

    /// Closed set of accepted payment methods, in title case.
    pub fn payment_methods(&self) -> &'static [&'static str] {
        match self {
            Regime::Bdt => &["Bkash", "Nagad", "Bank Transfer", "Card"],
            Regime::Usd => &["Card", "Bank Transfer", "Paypal", "Apple Pay"],
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bdt" => Ok(Regime::Bdt),
            "usd" => Ok(Regime::Usd),
            other => Err(format!("unknown currency '{other}', expected bdt or usd")),
        }
    }
}

/// Semantic role of one input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    DonorName,
    Email,
    DonationType,
    Project,
    Amount,
    Date,
    Phone,
    PaymentMethod,
    Location,
    Notes,
    /// Column the pipeline does not interpret; carried through verbatim.
    Extra(usize),
}

const NAMED_COLUMNS: &[(&str, Column)] = &[
    ("donor name", Column::DonorName),
    ("email", Column::Email),
    ("donation type", Column::DonationType),
    ("project", Column::Project),
    ("date", Column::Date),
    ("phone", Column::Phone),
    ("payment method", Column::PaymentMethod),
    ("location", Column::Location),
    ("notes", Column::Notes),
];

#[derive(Debug, Clone)]
pub struct SchemaMapping {
    /// Header names exactly as they appeared in the input.
    pub headers: Vec<String>,
    /// Role of each header, aligned with `headers`.
    pub columns: Vec<Column>,
    /// Discovered name of the amount column.
    pub amount_col: String,
}

/// Index of the first column whose name contains "donation amount",
/// case-insensitively.
pub fn resolve_amount_column(headers: &[String]) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.to_lowercase().contains(AMOUNT_MARKER))
        .ok_or_else(|| CleanError::Schema {
            requirement: format!("no column name contains '{AMOUNT_MARKER}'"),
            columns: headers.to_vec(),
        })
}

impl SchemaMapping {
    pub fn resolve(headers: &[String]) -> Result<Self> {
        let amount_idx = resolve_amount_column(headers)?;
        let mut extras = 0usize;
        let mut columns = Vec::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let column = if idx == amount_idx {
                Column::Amount
            } else {
                let key = header.trim().to_lowercase();
                NAMED_COLUMNS
                    .iter()
                    .find(|(name, column)| *name == key && !columns.contains(column))
                    .map(|(_, column)| *column)
                    .unwrap_or_else(|| {
                        extras += 1;
                        Column::Extra(extras - 1)
                    })
            };
            columns.push(column);
        }
        for (name, column) in NAMED_COLUMNS {
            if !columns.contains(column) {
                tracing::warn!(column = *name, "expected column missing, using fallbacks");
            }
        }
        Ok(Self {
            headers: headers.to_vec(),
            columns,
            amount_col: headers[amount_idx].clone(),
        })
    }

    pub fn extra_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| matches!(c, Column::Extra(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_regime_from_source() {
        assert_eq!(Regime::from_source("donations_BDT_2024.csv"), Regime::Bdt);
        assert_eq!(Regime::from_source("Bangladesh-export.csv"), Regime::Bdt);
        assert_eq!(Regime::from_source("donations_2024.csv"), Regime::Usd);
    }

    #[test]
    fn test_regime_parse() {
        assert_eq!("BDT".parse::<Regime>(), Ok(Regime::Bdt));
        assert_eq!(" usd ".parse::<Regime>(), Ok(Regime::Usd));
        assert!("eur".parse::<Regime>().is_err());
    }

    #[test]
    fn test_amount_column_first_match() {
        let h = headers(&["Donor Name", "Donation Amount (BDT)", "donation amount usd"]);
        assert_eq!(resolve_amount_column(&h).unwrap(), 1);
    }

    #[test]
    fn test_missing_amount_column_is_schema_error() {
        let h = headers(&["Donor Name", "Amount", "Date"]);
        match SchemaMapping::resolve(&h) {
            Err(CleanError::Schema { columns, .. }) => assert_eq!(columns, h),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_mapping_roles_and_extras() {
        let h = headers(&["Donation ID", "Donor Name", "Donation Amount ($)", "email", "Project"]);
        let mapping = SchemaMapping::resolve(&h).unwrap();
        assert_eq!(mapping.amount_col, "Donation Amount ($)");
        assert_eq!(
            mapping.columns,
            vec![
                Column::Extra(0),
                Column::DonorName,
                Column::Amount,
                Column::Email,
                Column::Project
            ]
        );
        assert!(!mapping.columns.contains(&Column::Phone));
        assert_eq!(mapping.extra_count(), 1);
    }

    #[test]
    fn test_duplicate_header_becomes_extra() {
        let h = headers(&["Donation Amount", "Notes", "Notes"]);
        let mapping = SchemaMapping::resolve(&h).unwrap();
        assert_eq!(mapping.columns[1], Column::Notes);
        assert_eq!(mapping.columns[2], Column::Extra(0));
    }
}
