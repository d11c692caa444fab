// Entry point and high-level CLI flow.
//
// By default the binary cleans the input, exports the cleaned dataset and
// writes every report in one go. With `--interactive` it runs a small menu:
// - Option [1] loads and cleans the CSV, printing diagnostics.
// - Option [2] generates the reports and a JSON summary.
mod categorize;
mod config;
mod derive;
mod error;
mod filter;
mod loader;
mod logging;
mod normalize;
mod output;
mod reports;
mod schema;
mod types;
mod util;

use clap::Parser;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tabled::Tabled;

use config::CleanerConfig;
use error::Result;
use loader::CleanedDataset;
use schema::Regime;

const CLEANED_FILE: &str = "cleaned_donations.csv";

#[derive(Parser)]
#[command(
    name = "donation_cleaner",
    about = "Clean a donation export and summarize it for reporting."
)]
struct Cli {
    /// Donation export to clean (CSV)
    input: PathBuf,
    /// Name used to detect the currency (default: the input file name)
    #[arg(long = "source-name")]
    source_name: Option<String>,
    /// Force the currency regime instead of guessing it (bdt or usd)
    #[arg(long)]
    currency: Option<Regime>,
    /// JSON file overriding projects, thresholds and holiday calendars
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for the cleaned dataset and report files
    #[arg(long = "out-dir", default_value = ".")]
    out_dir: PathBuf,
    /// Run the load/report menu instead of doing everything at once
    #[arg(long)]
    interactive: bool,
}

// The cleaned dataset is kept between menu choices so reports can be
// regenerated without reloading.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<CleanedDataset>,
}

/// Prompt and read one trimmed line. `None` once input is closed.
fn read_line_from<R: BufRead>(input: &mut R, prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn read_line(prompt: &str) -> Option<String> {
    read_line_from(&mut io::stdin().lock(), prompt)
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N` or
/// closed the input.
fn back_to_menu_from<R: BufRead>(input: &mut R) -> bool {
    loop {
        let Some(choice) = read_line_from(input, "Back to Report Selection (Y/N): ") else {
            return false;
        };
        match choice.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn prompt_back_to_menu() -> bool {
    back_to_menu_from(&mut io::stdin().lock())
}

/// Load, clean and export the input, then cache the dataset in `APP_STATE`.
fn handle_load(cli: &Cli, config: &CleanerConfig) -> Result<()> {
    let (data, report) = loader::load_and_clean(
        &cli.input,
        cli.source_name.as_deref(),
        cli.currency,
        config,
    )?;
    println!(
        "Processing dataset... ({} rows read, {} kept, currency {})",
        util::format_int(report.total_rows),
        util::format_int(report.cleaned_rows),
        data.regime
    );
    println!(
        "Removed {} duplicate rows and {} rows above {}.",
        util::format_int(report.duplicates_removed),
        util::format_int(report.outliers_removed),
        report
            .outlier_threshold
            .map(|t| util::format_money(t, data.regime.code()))
            .unwrap_or_else(|| "the outlier threshold".to_string())
    );
    println!(
        "Fallbacks: {} unparsed amounts, {} unparsed dates, {} invalid phones, {} other payment methods, {} unmatched projects.",
        util::format_int(report.unparsed_amounts),
        util::format_int(report.unparsed_dates),
        util::format_int(report.invalid_phones),
        util::format_int(report.other_payment_methods),
        util::format_int(report.unmatched_projects)
    );
    if report.unreadable_rows > 0 {
        println!(
            "Note: {} rows skipped because they could not be read.",
            util::format_int(report.unreadable_rows)
        );
    }

    std::fs::create_dir_all(&cli.out_dir)?;
    let cleaned_path = cli.out_dir.join(CLEANED_FILE);
    output::write_cleaned_file(&cleaned_path, &data)?;
    println!("(Cleaned dataset exported to {})\n", cleaned_path.display());

    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state.data = Some(data);
    Ok(())
}

fn emit<T>(
    out_dir: &Path,
    file: &str,
    title: &str,
    note: Option<&str>,
    rows: &[T],
    preview: usize,
) -> Result<()>
where
    T: Serialize + Tabled + Clone,
{
    let path = out_dir.join(file);
    output::write_csv(&path, rows)?;
    output::preview_table(title, note, rows, preview);
    println!("(Full table exported to {})\n", path.display());
    Ok(())
}

/// Write every report CSV plus `summary.json` and preview each on stdout.
fn handle_generate_reports(out_dir: &Path) -> Result<()> {
    let data = {
        let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return Ok(());
    };
    std::fs::create_dir_all(out_dir)?;

    println!("Generating reports...\n");
    let top5 = Some("Top 5 shown");
    emit(
        out_dir,
        "top_donors.csv",
        "Top Donors by Single Donation",
        None,
        &reports::top_donors(&data, 10),
        10,
    )?;
    emit(
        out_dir,
        "regular_donors.csv",
        "Regular Donors",
        Some("Donated more than once"),
        &reports::regular_donors(&data),
        10,
    )?;
    emit(
        out_dir,
        "project_totals.csv",
        "Top Funded Projects",
        top5,
        &reports::project_totals(&data),
        5,
    )?;
    emit(
        out_dir,
        "donation_type_totals.csv",
        "Donations by Type",
        None,
        &reports::donation_type_totals(&data),
        10,
    )?;
    emit(
        out_dir,
        "project_type_breakdown.csv",
        "Donation Type Breakdown by Project",
        None,
        &reports::project_type_breakdown(&data),
        10,
    )?;
    emit(
        out_dir,
        "location_counts.csv",
        "Top Donor Locations",
        top5,
        &reports::location_counts(&data),
        5,
    )?;
    emit(
        out_dir,
        "location_totals.csv",
        "Donations by Region",
        top5,
        &reports::location_totals(&data),
        5,
    )?;
    emit(
        out_dir,
        "monthly_totals.csv",
        "Monthly Donation Trends",
        Some("Rows without a valid date are excluded"),
        &reports::monthly_totals(&data),
        12,
    )?;
    emit(
        out_dir,
        "weekday_totals.csv",
        "Donations by Day of Week",
        None,
        &reports::weekday_totals(&data),
        7,
    )?;
    emit(
        out_dir,
        "holiday_totals.csv",
        "Seasonal Donation Trends",
        None,
        &reports::holiday_totals(&data),
        2,
    )?;

    let summary = reports::generate_summary(&data);
    let summary_path = out_dir.join("summary.json");
    output::write_json(&summary_path, &summary)?;
    println!("Summary Stats ({}):", summary_path.display());
    println!(
        "Total donations {}, average {}, {} donors ({} regular, loyalty {:.1}%)\n",
        util::format_money(summary.total_donations, &summary.currency),
        util::format_money(summary.average_donation, &summary.currency),
        util::format_int(summary.unique_donors),
        util::format_int(summary.regular_donors),
        summary.loyalty_rate
    );
    Ok(())
}

fn run_interactive(cli: &Cli, config: &CleanerConfig) {
    loop {
        println!("Select an option:");
        println!("[1] Load the file");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_line("Enter choice: ") else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                if let Err(e) = handle_load(cli, config) {
                    eprintln!("Failed to load file: {}\n", e);
                }
            }
            "2" => {
                println!();
                if let Err(e) = handle_generate_reports(&cli.out_dir) {
                    eprintln!("Write error: {}", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => println!("Invalid choice. Please enter 1 or 2.\n"),
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;
    if cli.interactive {
        run_interactive(cli, &config);
        return Ok(());
    }
    handle_load(cli, &config)?;
    handle_generate_reports(&cli.out_dir)
}

fn main() {
    logging::init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
