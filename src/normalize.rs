// Per-column repair functions.
//
// Every normalizer is pure and total: missing or malformed input degrades to
// a sentinel instead of failing, and running a normalizer on its own output
// returns the same value.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::Regime;

pub const NO_EMAIL: &str = "No email provided";
pub const INVALID_PHONE: &str = "Invalid";
pub const OTHER_PAYMENT: &str = "Other";
pub const UNKNOWN_DONOR: &str = "Unknown Donor";
pub const UNSPECIFIED_PROJECT: &str = "Unspecified";
/// Missing notes are written as the text form of a null cell rather than
/// an empty string. Kept as-is so existing exports stay comparable.
pub const MISSING_NOTES: &str = "nan";

const PHONE_DIGITS: usize = 10;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid regex"));

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").trim().to_string()
}

/// Upper-case the first letter of every word and lower-case the rest. A word
/// starts at any letter that does not directly follow another letter, so
/// `"o'neil-smith"` becomes `"O'Neil-Smith"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

/// Upper-case only the first character; the rest is left untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn normalize_donor_name(raw: Option<&str>) -> String {
    present(raw)
        .map(collapse_whitespace)
        .unwrap_or_else(|| UNKNOWN_DONOR.to_string())
}

pub fn normalize_email(raw: Option<&str>) -> String {
    match present(raw) {
        Some(email) if !email.eq_ignore_ascii_case(NO_EMAIL) => email.to_lowercase(),
        _ => NO_EMAIL.to_string(),
    }
}

pub fn normalize_donation_type(raw: Option<&str>) -> Option<String> {
    present(raw).map(capitalize_first)
}

/// Pre-match cleanup for project text; the result feeds the categorizer.
pub fn normalize_project_text(raw: Option<&str>) -> String {
    present(raw)
        .map(|p| title_case(&collapse_whitespace(p)))
        .unwrap_or_else(|| UNSPECIFIED_PROJECT.to_string())
}

/// Keep the last ten digits and prefix them with the regime's country code.
/// Fewer than ten digits yields [`INVALID_PHONE`].
pub fn normalize_phone(raw: Option<&str>, regime: Regime) -> String {
    let digits = NON_DIGIT.replace_all(raw.unwrap_or_default(), "");
    if digits.len() < PHONE_DIGITS {
        return INVALID_PHONE.to_string();
    }
    // Only ASCII digits remain, so byte slicing is safe.
    let local = &digits[digits.len() - PHONE_DIGITS..];
    format!("{}{}", regime.phone_prefix(), local)
}

pub fn normalize_payment_method(raw: Option<&str>, regime: Regime) -> String {
    let Some(method) = present(raw) else {
        return OTHER_PAYMENT.to_string();
    };
    let method = title_case(method);
    if regime.payment_methods().contains(&method.as_str()) {
        method
    } else {
        OTHER_PAYMENT.to_string()
    }
}

pub fn normalize_notes(raw: Option<&str>) -> String {
    match raw {
        Some(notes) => collapse_whitespace(notes),
        None => MISSING_NOTES.to_string(),
    }
}

pub fn normalize_location(raw: Option<&str>) -> Option<String> {
    present(raw).map(title_case)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("orphan  CHILDRENS"), "Orphan  Childrens");
        assert_eq!(title_case("o'neil-smith"), "O'Neil-Smith");
        assert_eq!(title_case("apple pay"), "Apple Pay");
    }

    #[test]
    fn test_email() {
        assert_eq!(normalize_email(Some("  Jane.Doe@Example.COM ")), "jane.doe@example.com");
        assert_eq!(normalize_email(None), NO_EMAIL);
        assert_eq!(normalize_email(Some("   ")), NO_EMAIL);
        assert_eq!(normalize_email(Some(NO_EMAIL)), NO_EMAIL);
    }

    #[test]
    fn test_donation_type_capitalizes_first_letter_only() {
        assert_eq!(normalize_donation_type(Some("  one-Time ")).as_deref(), Some("One-Time"));
        assert_eq!(normalize_donation_type(Some("zakat")).as_deref(), Some("Zakat"));
        assert_eq!(normalize_donation_type(None), None);
    }

    #[test]
    fn test_project_text() {
        assert_eq!(normalize_project_text(Some("orphan childrens ")), "Orphan Childrens");
        assert_eq!(normalize_project_text(Some(" feed\t the   hungry")), "Feed The Hungry");
        assert_eq!(normalize_project_text(None), UNSPECIFIED_PROJECT);
    }

    #[test]
    fn test_phone_bdt() {
        assert_eq!(normalize_phone(Some("01712-345678"), Regime::Bdt), "+8801712345678");
        assert_eq!(normalize_phone(Some("+880 1712 345678"), Regime::Bdt), "+8801712345678");
    }

    #[test]
    fn test_phone_usd_and_invalid() {
        assert_eq!(normalize_phone(Some("(555) 123-4567"), Regime::Usd), "+15551234567");
        assert_eq!(normalize_phone(Some("1-555-123-4567"), Regime::Usd), "+15551234567");
        assert_eq!(normalize_phone(Some("12345"), Regime::Usd), INVALID_PHONE);
        assert_eq!(normalize_phone(Some("12345"), Regime::Bdt), INVALID_PHONE);
        assert_eq!(normalize_phone(None, Regime::Bdt), INVALID_PHONE);
    }

    #[test]
    fn test_payment_method() {
        assert_eq!(normalize_payment_method(Some(" bkash "), Regime::Bdt), "Bkash");
        assert_eq!(normalize_payment_method(Some("PayPal"), Regime::Usd), "Paypal");
        assert_eq!(normalize_payment_method(Some("apple pay"), Regime::Usd), "Apple Pay");
        assert_eq!(normalize_payment_method(Some("Crypto"), Regime::Usd), OTHER_PAYMENT);
        assert_eq!(normalize_payment_method(Some("Bkash"), Regime::Usd), OTHER_PAYMENT);
        assert_eq!(normalize_payment_method(None, Regime::Usd), OTHER_PAYMENT);
    }

    #[test]
    fn test_notes_and_location() {
        assert_eq!(normalize_notes(Some("  in memory\n of   father ")), "in memory of father");
        assert_eq!(normalize_notes(None), MISSING_NOTES);
        assert_eq!(normalize_location(Some(" dhaka ")).as_deref(), Some("Dhaka"));
        assert_eq!(normalize_location(Some("NEW YORK")).as_deref(), Some("New York"));
        assert_eq!(normalize_location(Some("")), None);
    }

    #[test]
    fn test_normalizers_are_idempotent() {
        let once = normalize_phone(Some("01712-345678"), Regime::Bdt);
        assert_eq!(normalize_phone(Some(&once), Regime::Bdt), once);
        let once = normalize_phone(Some("555 123 4567"), Regime::Usd);
        assert_eq!(normalize_phone(Some(&once), Regime::Usd), once);
        let once = normalize_email(Some(" A@B.org"));
        assert_eq!(normalize_email(Some(&once)), once);
        let once = normalize_payment_method(Some("crypto"), Regime::Bdt);
        assert_eq!(normalize_payment_method(Some(&once), Regime::Bdt), once);
        let once = normalize_notes(None);
        assert_eq!(normalize_notes(Some(&once)), once);
        let once = normalize_project_text(Some("back  to school KITS"));
        assert_eq!(normalize_project_text(Some(&once)), once);
        let once = normalize_donation_type(Some("monthly")).unwrap();
        assert_eq!(normalize_donation_type(Some(&once)).unwrap(), once);
    }
}
