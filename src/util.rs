// Numeric parsing, small statistics helpers and display formatting.
//
// Donation exports are hand-edited spreadsheets more often than not, so the
// parsing here is forgiving and never panics: anything unusable becomes
// `None` and the caller decides which sentinel to use.
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Parse a donation amount cell into `f64`.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (`"N/A"`, `"ten"`).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed, including
///   `NaN` and infinities.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn average(v: &[f64]) -> f64 {
    // Returns 0 for an empty slice to avoid NaNs leaking into reports.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Quantile with linear interpolation between the two closest ranks.
///
/// For `n` sorted values the position is `(n - 1) * q`; the result is
/// interpolated between `floor(pos)` and `ceil(pos)`. Returns `None` for an
/// empty input. `q` is clamped to `[0, 1]`.
pub fn quantile(mut v: Vec<f64>, q: f64) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let q = q.clamp(0.0, 1.0);
    let pos = (v.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(v[lower] + (v[upper] - v[lower]) * frac)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Amount followed by the currency code, e.g. `12,500.00 BDT`.
pub fn format_money(n: f64, currency: &str) -> String {
    format!("{} {}", format_number(n, 2), currency)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
