// Utility helpers for parsing, header folding and formatting.
//
// This module centralizes all the "dirty" spreadsheet text handling so the
// rest of the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

static SIGN_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\s*[-+=–—]\s*\)\s*").expect("invalid sign marker regex"));

/// Parse a string-like value into `f64` while being forgiving about the
/// formatting found in Brazilian spreadsheets.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Strips a leading `R$` and any whitespace.
/// - Treats `(1.234,56)` as a negative number.
/// - Understands both `1.234,56` and `1,234.56`; when only one kind of
///   separator appears, repeated ones are thousands separators and a single
///   one is the decimal mark. The exception is a lone dot followed by exactly
///   three digits (`3.000`, `R$ 1.500`), which is a pt-BR thousands group.
/// - Rejects values that contain alphabetic characters.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    let s = s.strip_prefix("R$").unwrap_or(s);
    let mut s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() || s.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    let negative = s.starts_with('(') && s.ends_with(')');
    if negative {
        s = s[1..s.len() - 1].to_string();
    }

    let commas = s.matches(',').count();
    let dots = s.matches('.').count();
    let cleaned = match (commas, dots) {
        (0, 0) => s,
        (c, d) if c > 0 && d > 0 => {
            // Whichever separator comes last is the decimal mark.
            let last_comma = s.rfind(',').unwrap_or(0);
            let last_dot = s.rfind('.').unwrap_or(0);
            if last_comma > last_dot {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (1, 0) => s.replace(',', "."),
        (_, 0) => s.replace(',', ""),
        (0, 1) if is_thousands_group(&s) => s.replace('.', ""),
        (0, 1) => s,
        _ => s.replace('.', ""),
    };

    let v = cleaned.parse::<f64>().ok()?;
    if !v.is_finite() {
        return None;
    }
    Some(if negative { -v } else { v })
}

fn is_thousands_group(s: &str) -> bool {
    let Some((int, frac)) = s.split_once('.') else {
        return false;
    };
    let int = int.trim_start_matches(|c: char| c == '-' || c == '+');
    frac.len() == 3 && frac.bytes().all(|b| b.is_ascii_digit()) && !int.is_empty() && int != "0"
}

/// Case/space/sign-marker folding used for header comparison:
/// `"  (-)  Total   Encargos "` becomes `"TOTAL ENCARGOS"`.
pub fn fold_header(s: &str) -> String {
    let trimmed = s.trim();
    SIGN_MARKER
        .replace(trimmed, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// `fold_header` plus diacritic removal, so `SALÁRIO` and `SALARIO` compare equal.
pub fn fold_header_unaccented(s: &str) -> String {
    strip_accents(&fold_header(s))
}

/// Decompose to NFD and drop the combining marks.
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Division that returns `0.0` when the denominator is zero or the result is
/// not finite.
pub fn safe_div(dividend: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        return 0.0;
    }
    let q = dividend / divisor;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

/// Brazilian currency, e.g. `R$ 1.234,56` or `R$ -310,00`.
pub fn format_money(n: f64) -> String {
    format!("R$ {}", format_with_locale(n, 2, &Locale::pt))
}

/// Ratio rendered as a percentage with two decimals (`0.1234` -> `12,34%`).
pub fn format_pct(ratio: f64) -> String {
    format!("{}%", format_with_locale(ratio * 100.0, 2, &Locale::pt))
}

fn format_with_locale(n: f64, decimals: usize, locale: &Locale) -> String {
    let n = if n.is_finite() { n } else { 0.0 };
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, n.abs());
    let neg = n.is_sign_negative() && s.chars().any(|c| c != '0' && c != '.');
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(locale);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push_str(locale.decimal());
            res.push_str(frac);
        }
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
