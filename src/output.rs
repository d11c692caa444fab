use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::derive::weekday_name;
use crate::error::Result;
use crate::loader::CleanedDataset;
use crate::schema::Column;
use crate::types::DonationRecord;

pub const DERIVED_HEADERS: [&str; 3] = ["Month", "DayOfWeek", "Holiday"];

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn cell(record: &DonationRecord, column: Column) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    match column {
        Column::DonorName => record.donor_name.clone(),
        Column::Email => record.email.clone(),
        Column::DonationType => opt(&record.donation_type),
        Column::Project => record.project.name().to_string(),
        Column::Amount => record.amount.map(|a| a.to_string()).unwrap_or_default(),
        Column::Date => record
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Column::Phone => record.phone.clone(),
        Column::PaymentMethod => record.payment_method.clone(),
        Column::Location => opt(&record.location),
        Column::Notes => record.notes.clone(),
        Column::Extra(i) => record.extras.get(i).and_then(|v| v.clone()).unwrap_or_default(),
    }
}

/// Export the cleaned dataset: the input columns in their original order
/// followed by the derived columns.
pub fn write_cleaned<W: Write>(writer: W, data: &CleanedDataset) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let headers = data
        .mapping
        .headers
        .iter()
        .map(String::as_str)
        .chain(DERIVED_HEADERS);
    wtr.write_record(headers)?;
    for r in &data.records {
        let mut row: Vec<String> = data.mapping.columns.iter().map(|c| cell(r, *c)).collect();
        row.push(r.derived.month.map(|m| m.to_string()).unwrap_or_default());
        row.push(
            r.derived
                .day_of_week
                .map(|d| weekday_name(d).to_string())
                .unwrap_or_default(),
        );
        row.push(if r.derived.is_holiday { "True" } else { "False" }.to_string());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_cleaned_file(path: &Path, data: &CleanedDataset) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_cleaned(file, data)
}

/// Print a titled markdown preview of the first `max_rows` rows.
pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
