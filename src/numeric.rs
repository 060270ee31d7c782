//! Numeric literal scanners (spec §4.A).
//!
//! Each function takes a start position and a byte slice and, on success,
//! writes the end position (one past the last consumed byte) and returns the
//! parsed value. On failure the cursor is never advanced — callers retry at
//! `start` for the next rule, or report a lexical error at `start`.

/// Parse a signed decimal integer: optional sign, up to 10 digits, rejecting
/// overflow and a following identifier character.
pub fn int_literal(data: &[u8], start: usize) -> Option<(i32, usize)> {
    let mut pos = start;
    let negative = match data.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let digits_start = pos;
    while matches!(data.get(pos), Some(b'0'..=b'9')) {
        pos += 1;
    }
    let ndigits = pos - digits_start;
    if ndigits == 0 || ndigits > 10 {
        return None;
    }

    // Reject a literal immediately followed by an identifier character —
    // "123abc" is not a number token.
    if matches!(data.get(pos), Some(c) if is_ident_continue(*c)) {
        return None;
    }

    let digits = std::str::from_utf8(&data[digits_start..pos]).ok()?;
    let magnitude: i64 = digits.parse().ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    if signed < i32::MIN as i64 || signed > i32::MAX as i64 {
        return None;
    }
    Some((signed as i32, pos))
}

/// Parse a double: optional sign, optional integer part, optional `.frac`,
/// optional `e`/`E` exponent. At least one of the integer or fractional
/// digit runs must be non-empty. Rejects a trailing `.`, `_`, or alnum.
pub fn double_literal(data: &[u8], start: usize) -> Option<(f64, usize)> {
    let mut pos = start;
    if matches!(data.get(pos), Some(b'-') | Some(b'+')) {
        pos += 1;
    }

    let int_start = pos;
    while matches!(data.get(pos), Some(b'0'..=b'9')) {
        pos += 1;
    }
    let has_int_digits = pos > int_start;

    let mut has_frac_digits = false;
    if matches!(data.get(pos), Some(b'.')) {
        pos += 1;
        let frac_start = pos;
        while matches!(data.get(pos), Some(b'0'..=b'9')) {
            pos += 1;
        }
        has_frac_digits = pos > frac_start;
    }

    if !has_int_digits && !has_frac_digits {
        return None;
    }

    if matches!(data.get(pos), Some(b'e') | Some(b'E')) {
        pos += 1;
        if matches!(data.get(pos), Some(b'-') | Some(b'+')) {
            pos += 1;
        }
        let exp_digits_start = pos;
        while matches!(data.get(pos), Some(b'0'..=b'9')) {
            pos += 1;
        }
        if pos == exp_digits_start {
            // "1e" / "1e+" with no digits: the exponent is present but
            // empty, so the whole literal is rejected outright.
            return None;
        }
    }

    // A number can't be directly followed by '.', '_', or an identifier char
    // — that's a different (invalid) token, not two adjacent tokens.
    if matches!(data.get(pos), Some(b'.') | Some(b'_')) {
        return None;
    }
    if matches!(data.get(pos), Some(c) if is_ident_continue(*c)) {
        return None;
    }

    let text = std::str::from_utf8(&data[start..pos]).ok()?;
    let value: f64 = text.parse().ok()?;
    Some((value, pos))
}

/// Narrowing wrapper over [`double_literal`].
pub fn float_literal(data: &[u8], start: usize) -> Option<(f32, usize)> {
    let (value, end) = double_literal(data, start)?;
    Some((value as f32, end))
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_int() {
        assert_eq!(int_literal(b"42 ", 0), Some((42, 2)));
    }

    #[test]
    fn parses_negative_int() {
        assert_eq!(int_literal(b"-7,", 0), Some((-7, 2)));
    }

    #[test]
    fn rejects_ten_plus_one_digits() {
        assert!(int_literal(b"1234567890", 0).is_some());
        assert!(int_literal(b"12345678901", 0).is_none());
    }

    #[test]
    fn rejects_int_followed_by_letter() {
        assert!(int_literal(b"123abc", 0).is_none());
    }

    #[test]
    fn parses_double_with_exponent() {
        assert_eq!(double_literal(b"1.5e-3 ", 0), Some((1.5e-3, 6)));
    }

    #[test]
    fn parses_double_leading_dot() {
        assert_eq!(double_literal(b".5 ", 0), Some((0.5, 2)));
    }

    #[test]
    fn parses_double_trailing_dot() {
        assert_eq!(double_literal(b"5. ", 0), Some((5.0, 2)));
    }

    #[test]
    fn rejects_bare_dot() {
        assert!(double_literal(b". ", 0).is_none());
    }

    #[test]
    fn rejects_dangling_exponent_marker() {
        // "1e" with no exponent digits rejects the whole literal.
        assert_eq!(double_literal(b"1e", 0), None);
        assert_eq!(double_literal(b"1e+", 0), None);
    }

    #[test]
    fn rejects_number_followed_by_underscore() {
        assert!(double_literal(b"1_2", 0).is_none());
    }

    #[test]
    fn float_narrows_double() {
        assert_eq!(float_literal(b"2.5 ", 0), Some((2.5f32, 3)));
    }
}
