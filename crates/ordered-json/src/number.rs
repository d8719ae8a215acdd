//! Number formatting and validation.

use crate::error::{JsonError, Result};

/// Bit width a float is rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatBits {
    F32,
    F64,
}

/// Renders `f` as the shortest decimal text that parses back to the same
/// value at the given width.
///
/// Plain notation is used for magnitudes in `[1e-6, 1e21)`, exponent
/// notation with an explicit sign otherwise (`1e+21`, `1e-7`).
/// Non-finite values fail with [`JsonError::UnsupportedValue`].
pub fn format_float(f: f64, bits: FloatBits) -> Result<String> {
    if f.is_nan() {
        return Err(JsonError::UnsupportedValue("NaN".into()));
    }
    if f.is_infinite() {
        let text = if f > 0.0 { "+Inf" } else { "-Inf" };
        return Err(JsonError::UnsupportedValue(text.into()));
    }

    let abs = f.abs();
    let exponent_form = abs != 0.0
        && match bits {
            FloatBits::F64 => abs < 1e-6 || abs >= 1e21,
            FloatBits::F32 => {
                let abs = abs as f32;
                abs < 1e-6 || abs >= 1e21
            }
        };

    let mut text = match (bits, exponent_form) {
        (FloatBits::F64, false) => format!("{f}"),
        (FloatBits::F64, true) => format!("{f:e}"),
        (FloatBits::F32, false) => format!("{}", f as f32),
        (FloatBits::F32, true) => format!("{:e}", f as f32),
    };
    if exponent_form {
        if let Some(e) = text.find('e') {
            if text.as_bytes().get(e + 1) != Some(&b'-') {
                text.insert(e + 1, '+');
            }
        }
    }
    Ok(text)
}

/// Reports whether `s` matches the JSON number grammar.
pub fn is_valid_number(s: &str) -> bool {
    let b = s.as_bytes();
    let mut i = 0;
    if b.first() == Some(&b'-') {
        i += 1;
    }
    match b.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = skip_digits(b, i + 1),
        _ => return false,
    }
    if b.get(i) == Some(&b'.') {
        let end = skip_digits(b, i + 1);
        if end == i + 1 {
            return false;
        }
        i = end;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(b.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let end = skip_digits(b, i);
        if end == i {
            return false;
        }
        i = end;
    }
    i == b.len()
}

fn skip_digits(b: &[u8], mut i: usize) -> usize {
    while matches!(b.get(i), Some(b'0'..=b'9')) {
        i += 1;
    }
    i
}

/// Rewrites a number literal with a fraction or exponent as plain integer
/// text when its value is integral, e.g. `12.5e1` becomes `125`.
///
/// Returns `None` when the value has a non-zero fractional part or an
/// exponent too large to expand.
pub(crate) fn integral_text(s: &str) -> Option<String> {
    const MAX_EXPONENT: i64 = 400;

    if !is_valid_number(s) {
        return None;
    }
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], body[pos + 1..].parse::<i64>().ok()?),
        None => (body, 0),
    };
    if exponent.abs() > MAX_EXPONENT {
        return None;
    }
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mut digits: String = format!("{int_part}{frac_part}");
    let point = int_part.len() as i64 + exponent;

    if point <= 0 {
        return digits.bytes().all(|d| d == b'0').then(|| "0".to_string());
    }
    let point = point as usize;
    if point >= digits.len() {
        digits.extend(std::iter::repeat('0').take(point - digits.len()));
    } else {
        if digits[point..].bytes().any(|d| d != b'0') {
            return None;
        }
        digits.truncate(point);
    }
    let trimmed = digits.trim_start_matches('0');
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
    Some(if negative && trimmed != "0" {
        format!("-{trimmed}")
    } else {
        trimmed.to_string()
    })
}
