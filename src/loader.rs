use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::categorize::{Categorizer, ProjectMatch};
use crate::config::CleanerConfig;
use crate::derive::{derive_all, parse_date_lenient};
use crate::error::Result;
use crate::filter::{dedup_exact, trim_outliers};
use crate::normalize::{
    normalize_donation_type, normalize_donor_name, normalize_email, normalize_location,
    normalize_notes, normalize_payment_method, normalize_phone, normalize_project_text,
    INVALID_PHONE, OTHER_PAYMENT,
};
use crate::schema::{Column, Regime, SchemaMapping};
use crate::types::{DonationRecord, Derived, RawRecord};
use crate::util::parse_f64_safe;

/// What happened to the batch on its way through the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub total_rows: usize,
    pub unreadable_rows: usize,
    pub unparsed_amounts: usize,
    pub unparsed_dates: usize,
    pub invalid_phones: usize,
    pub other_payment_methods: usize,
    pub unmatched_projects: usize,
    pub duplicates_removed: usize,
    pub outliers_removed: usize,
    pub outlier_threshold: Option<f64>,
    pub cleaned_rows: usize,
}

/// The cleaned batch plus everything reporting needs to render it.
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub records: Vec<DonationRecord>,
    pub mapping: SchemaMapping,
    pub amount_col: String,
    pub regime: Regime,
}

/// Clean a CSV file. The regime comes from `regime` when given, otherwise
/// from `source_id` (or the file name when that is absent too).
pub fn load_and_clean(
    path: &Path,
    source_id: Option<&str>,
    regime: Option<Regime>,
    config: &CleanerConfig,
) -> Result<(CleanedDataset, CleanReport)> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source_id = source_id.unwrap_or(&file_name);
    let regime = regime.unwrap_or_else(|| Regime::from_source(source_id));
    tracing::info!(path = %path.display(), source_id, %regime, "loading donations");
    let file = std::fs::File::open(path)?;
    clean_reader(file, regime, config)
}

pub fn clean_reader<R: Read>(
    reader: R,
    regime: Regime,
    config: &CleanerConfig,
) -> Result<(CleanedDataset, CleanReport)> {
    let mut report = CleanReport::default();
    let (mapping, raw) = read_raw(reader, &mut report)?;
    let categorizer = Categorizer::from_config(config);

    let records: Vec<DonationRecord> = raw
        .into_iter()
        .enumerate()
        .map(|(idx, row)| normalize_record(row, idx + 1, regime, &categorizer, &mut report))
        .collect();
    tracing::info!(
        rows = records.len(),
        unmatched_projects = report.unmatched_projects,
        invalid_phones = report.invalid_phones,
        "normalized fields"
    );

    let (records, duplicates_removed) = dedup_exact(records);
    let (mut records, trim) = trim_outliers(records, config.outlier_quantile);

    let calendars = &config.holidays;
    if calendars.bdt == calendars.usd {
        tracing::debug!("BDT and USD holiday calendars are identical");
    }
    derive_all(&mut records, calendars.for_regime(regime));

    report.duplicates_removed = duplicates_removed;
    report.outliers_removed = trim.removed;
    report.outlier_threshold = trim.threshold;
    report.cleaned_rows = records.len();

    let amount_col = mapping.amount_col.clone();
    Ok((
        CleanedDataset {
            records,
            mapping,
            amount_col,
            regime,
        },
        report,
    ))
}

/// Resolve the schema from the header row and pull every row into a
/// `RawRecord`. Rows the CSV reader cannot decode are skipped and counted.
pub fn read_raw<R: Read>(
    reader: R,
    report: &mut CleanReport,
) -> Result<(SchemaMapping, Vec<RawRecord>)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mapping = SchemaMapping::resolve(&headers)?;

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        report.total_rows += 1;
        match result {
            Ok(record) => rows.push(to_raw(&mapping, &record)),
            Err(e) => {
                report.unreadable_rows += 1;
                tracing::warn!(row = idx + 1, error = %e, "skipping unreadable row");
            }
        }
    }
    Ok((mapping, rows))
}

fn to_raw(mapping: &SchemaMapping, record: &StringRecord) -> RawRecord {
    let mut raw = RawRecord {
        extras: vec![None; mapping.extra_count()],
        ..RawRecord::default()
    };
    for (idx, column) in mapping.columns.iter().enumerate() {
        // Empty cells count as missing.
        let value = record
            .get(idx)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        match column {
            Column::DonorName => raw.donor_name = value,
            Column::Email => raw.email = value,
            Column::DonationType => raw.donation_type = value,
            Column::Project => raw.project = value,
            Column::Amount => raw.amount = value,
            Column::Date => raw.date = value,
            Column::Phone => raw.phone = value,
            Column::PaymentMethod => raw.payment_method = value,
            Column::Location => raw.location = value,
            Column::Notes => raw.notes = value,
            Column::Extra(i) => raw.extras[*i] = value,
        }
    }
    raw
}

/// Run every field normalizer and the project categorizer over one row.
/// Degraded fields are counted in `report` and logged at debug level.
pub fn normalize_record(
    raw: RawRecord,
    row: usize,
    regime: Regime,
    categorizer: &Categorizer,
    report: &mut CleanReport,
) -> DonationRecord {
    let amount = parse_f64_safe(raw.amount.as_deref());
    if amount.is_none() {
        report.unparsed_amounts += 1;
        tracing::debug!(row, value = ?raw.amount, "amount did not parse");
    }
    let date = parse_date_lenient(raw.date.as_deref());
    if date.is_none() {
        report.unparsed_dates += 1;
        tracing::debug!(row, value = ?raw.date, "date did not parse");
    }

    let phone = normalize_phone(raw.phone.as_deref(), regime);
    if phone == INVALID_PHONE {
        report.invalid_phones += 1;
        tracing::debug!(row, value = ?raw.phone, "phone too short");
    }
    let payment_method = normalize_payment_method(raw.payment_method.as_deref(), regime);
    if payment_method == OTHER_PAYMENT {
        report.other_payment_methods += 1;
    }
    let project = categorizer.categorize(&normalize_project_text(raw.project.as_deref()));
    match &project {
        ProjectMatch::Matched { canonical, score } => {
            tracing::trace!(row, project = %canonical, score, "project matched");
        }
        ProjectMatch::Unmatched(text) => {
            report.unmatched_projects += 1;
            tracing::debug!(row, project = %text, "project left unmatched");
        }
    }

    DonationRecord {
        donor_name: normalize_donor_name(raw.donor_name.as_deref()),
        email: normalize_email(raw.email.as_deref()),
        donation_type: normalize_donation_type(raw.donation_type.as_deref()),
        project,
        amount,
        date,
        phone,
        payment_method,
        location: normalize_location(raw.location.as_deref()),
        notes: normalize_notes(raw.notes.as_deref()),
        extras: raw.extras,
        derived: Derived::default(),
    }
}
