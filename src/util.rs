// Utility helpers for normalization and number formatting.
//
// Postal-code cleanup and percentage arithmetic live here so the report
// builders can work with plain, already-normalized values.
use num_format::{Locale, ToFormattedString};

/// Length of the postal-code prefix used to group micro-hub candidates.
pub const PREFIX_LEN: usize = 3;

/// Normalize a postal code as it appears in a spreadsheet export.
///
/// Numeric cells often come back as floats (`12345.0`). A value made of
/// digits followed by a fractional part of only zeros is cut back to its
/// integer digits; anything else passes through trimmed. Leading zeros are
/// kept, and the result is stable under repeated application.
pub fn normalize_postal_code(raw: &str) -> String {
    let s = raw.trim();
    if let Some((int_part, frac_part)) = s.split_once('.') {
        let int_ok = !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit());
        let frac_ok = !frac_part.is_empty() && frac_part.chars().all(|c| c == '0');
        if int_ok && frac_ok {
            return int_part.to_string();
        }
    }
    s.to_string()
}

/// First `PREFIX_LEN` characters of a normalized code, or `None` when the
/// code is too short.
pub fn postal_prefix(code: &str) -> Option<String> {
    if code.chars().count() < PREFIX_LEN {
        return None;
    }
    Some(code.chars().take(PREFIX_LEN).collect())
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `part / whole * 100`, rounded to two decimals. Returns 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234.50`).
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

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// `display_with` hook for percentage columns in table previews.
pub fn display_pct(v: &f64) -> String {
    format_number(*v, 2)
}
