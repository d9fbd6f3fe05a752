//! ASCII header micro-parser for the `NAME=VALUE<UNIT>` dialect used by the
//! MPH, SPH and dataset-descriptor blocks.
//!
//! The value classifier follows the legacy product conventions: quoted text
//! is a string, an empty value is a degenerate placeholder, a lone character
//! is its byte code, and anything starting with a `+`/`-` sign is split into
//! sign-prefixed numeric tokens. The sign-token scan is an explicit
//! finite-state tokenizer so its edge cases (lone trailing sign, trailing
//! garbage inside a token, a decimal point anywhere in a token) are
//! enumerable and individually tested.
use tracing::warn;

use crate::core::record::{Field, FieldData, FieldInfo, Record};
use crate::error::{Error, Result};
use crate::types::ScalarType;

/// Parse a whole header block, one field per recognized line, in file order.
///
/// Malformed lines are reported through the log and skipped; they never abort
/// the block. Blank lines are ignored silently.
pub fn parse_header_block(text: &str) -> Record {
    let mut record = Record::new();
    for line in text.lines() {
        match parse_header_line(line.trim()) {
            Ok(Some(field)) => record.push(field),
            Ok(None) => {}
            Err(e) => warn!("skipping header line: {e}"),
        }
    }
    record
}

/// Parse one trimmed header line into a field.
///
/// Returns `Ok(None)` for a blank line, `Err(Error::Syntax)` for a non-blank
/// line without a `NAME=VALUE` shape.
pub fn parse_header_line(line: &str) -> Result<Option<Field>> {
    if line.is_empty() {
        return Ok(None);
    }
    let Some((name, rest)) = line.split_once('=') else {
        return Err(Error::syntax(line, "missing `=`"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::syntax(line, "empty field name"));
    }

    let (value, unit) = split_unit(rest);
    let (scalar_type, element_count, total_size, data) = classify_value(value);

    let info = FieldInfo {
        name: name.to_string(),
        unit,
        scalar_type,
        element_count,
        total_size,
    };
    Ok(Some(Field::new(info, data)))
}

/// Strip a trailing `<...>` unit marker. A quoted value ends in `"` rather
/// than `>`, so its text is never split even when it contains angle brackets.
fn split_unit(value: &str) -> (&str, Option<String>) {
    if value.ends_with('>') {
        if let Some(pos) = value.rfind('<') {
            let unit = &value[pos + 1..value.len() - 1];
            return (&value[..pos], Some(unit.to_string()));
        }
    }
    (value, None)
}

fn classify_value(value: &str) -> (ScalarType, usize, usize, FieldData) {
    let bytes = value.as_bytes();

    // Quoted: a single opaque string element backed by its character length.
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        let inner = &value[1..value.len() - 1];
        return (
            ScalarType::Str,
            1,
            inner.len(),
            FieldData::Str(inner.as_bytes().to_vec()),
        );
    }

    // Empty: degenerate placeholder, one declared element of zero bytes.
    if bytes.is_empty() {
        return (ScalarType::UInt8, 1, 0, FieldData::UInt8(Vec::new()));
    }

    // Single unsigned character: its byte code.
    if bytes.len() == 1 && bytes[0] != b'+' && bytes[0] != b'-' {
        return (ScalarType::UInt8, 1, 1, FieldData::UInt8(vec![bytes[0]]));
    }

    // Sign-prefixed numeric tokens.
    if bytes[0] == b'+' || bytes[0] == b'-' {
        return scan_sign_tokens(value);
    }

    // Legacy fallback: unquoted, unsigned-looking, multi-character text is a
    // single int32; the stored value is the longest parseable integer prefix.
    let v = parse_int_prefix(bytes);
    (ScalarType::Int32, 1, 4, FieldData::Int32(vec![v as i32]))
}

#[derive(PartialEq)]
enum ScanState {
    /// Just consumed a sign character; digits may follow.
    InSign,
    /// Accumulating digits of the current token.
    InDigits,
    /// Inside the current token but past its numeric part; characters are
    /// ignored until the next sign starts a new token.
    Trailing,
}

/// Split a `+`/`-`-prefixed value into maximal sign-delimited tokens and
/// decide the field type.
///
/// A decimal point anywhere in any token switches the whole value to a single
/// float element. Otherwise each token contributes one 32-bit integer; any
/// `-` sign makes the whole field signed. Tokens without digits are dropped.
fn scan_sign_tokens(value: &str) -> (ScalarType, usize, usize, FieldData) {
    let mut state = ScanState::InSign;
    let mut negative_token = value.as_bytes()[0] == b'-';
    let mut any_negative = false;
    let mut acc: u32 = 0;
    let mut digits_seen = false;
    // (magnitude, is_negative) per completed token
    let mut elements: Vec<(u32, bool)> = Vec::new();

    let mut flush = |acc: &mut u32, digits_seen: &mut bool, negative: bool| {
        if *digits_seen {
            elements.push((*acc, negative));
        }
        *acc = 0;
        *digits_seen = false;
    };

    for &b in &value.as_bytes()[1..] {
        match b {
            b'+' | b'-' => {
                flush(&mut acc, &mut digits_seen, negative_token);
                any_negative |= negative_token;
                negative_token = b == b'-';
                state = ScanState::InSign;
            }
            b'.' => {
                // Float mode: the whole value collapses to one float64,
                // parsed with leading-prefix (atof) semantics.
                let v = parse_float_prefix(value);
                return (ScalarType::Float64, 1, 8, FieldData::Float64(vec![v]));
            }
            b'0'..=b'9' if state != ScanState::Trailing => {
                acc = acc.wrapping_mul(10).wrapping_add((b - b'0') as u32);
                digits_seen = true;
                state = ScanState::InDigits;
            }
            // Trailing garbage inside the token: numeric parsing stops here.
            _ => state = ScanState::Trailing,
        }
    }
    flush(&mut acc, &mut digits_seen, negative_token);
    any_negative |= negative_token;

    let count = elements.len();
    if any_negative {
        let v: Vec<i32> = elements
            .iter()
            .map(|&(mag, neg)| {
                if neg {
                    (mag as i32).wrapping_neg()
                } else {
                    mag as i32
                }
            })
            .collect();
        (ScalarType::Int32, count, count * 4, FieldData::Int32(v))
    } else {
        let v: Vec<u32> = elements.iter().map(|&(mag, _)| mag).collect();
        (ScalarType::UInt32, count, count * 4, FieldData::UInt32(v))
    }
}

/// Parse the longest leading floating-point literal of `value`, like `atof`.
fn parse_float_prefix(value: &str) -> f64 {
    let bytes = value.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    // Optional exponent, only kept when complete.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    value[..end].parse::<f64>().unwrap_or(0.0)
}

/// Parse the longest leading signed-integer literal, wrapping on overflow.
fn parse_int_prefix(bytes: &[u8]) -> i64 {
    let mut idx = 0;
    let negative = if !bytes.is_empty() && (bytes[0] == b'+' || bytes[0] == b'-') {
        idx = 1;
        bytes[0] == b'-'
    } else {
        false
    };
    let mut acc: i64 = 0;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        acc = acc
            .wrapping_mul(10)
            .wrapping_add((bytes[idx] - b'0') as i64);
        idx += 1;
    }
    if negative { acc.wrapping_neg() } else { acc }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Field {
        parse_header_line(line).unwrap().unwrap()
    }

    #[test]
    fn unsigned_padded_integer_with_unit() {
        let f = parse("NAME=+00000036<unit>");
        assert_eq!(f.name(), "NAME");
        assert_eq!(f.scalar_type(), ScalarType::UInt32);
        assert_eq!(f.info.element_count, 1);
        assert_eq!(f.uint32_at(0).unwrap(), 36);
        assert_eq!(f.unit(), Some("unit"));
    }

    #[test]
    fn negative_float_value() {
        let f = parse("X_POSITION=-7162215.231<m>");
        assert_eq!(f.scalar_type(), ScalarType::Float64);
        assert_eq!(f.info.element_count, 1);
        assert_eq!(f.info.total_size, 8);
        assert!((f.float64_at(0).unwrap() + 7162215.231).abs() < 1e-9);
        assert_eq!(f.unit(), Some("m"));
    }

    #[test]
    fn multi_element_unsigned_array() {
        let f = parse("BANDWIDTH=+10001+10002+10003<10-3nm>");
        assert_eq!(f.scalar_type(), ScalarType::UInt32);
        assert_eq!(f.info.element_count, 3);
        for (i, expected) in [10001u32, 10002, 10003].iter().enumerate() {
            assert_eq!(f.uint32_at(i).unwrap(), *expected);
        }
        assert_eq!(f.unit(), Some("10-3nm"));
    }

    #[test]
    fn one_negative_token_makes_whole_field_signed() {
        let f = parse("OFFSETS=+100-200+300");
        assert_eq!(f.scalar_type(), ScalarType::Int32);
        assert_eq!(f.info.element_count, 3);
        assert_eq!(f.int32_at(0).unwrap(), 100);
        assert_eq!(f.int32_at(1).unwrap(), -200);
        assert_eq!(f.int32_at(2).unwrap(), 300);
    }

    #[test]
    fn quoted_string_value() {
        let f = parse("PRODUCT=\"MER_RR__2P\"");
        assert_eq!(f.scalar_type(), ScalarType::Str);
        assert_eq!(f.info.element_count, 1);
        assert_eq!(f.info.total_size, 10);
        assert_eq!(f.str_value().unwrap(), "MER_RR__2P");
        assert_eq!(f.unit(), None);
    }

    #[test]
    fn quoted_text_with_angle_brackets_is_not_split() {
        let f = parse("SOFTWARE_VER=\"MERIS<5.02>\"");
        assert_eq!(f.scalar_type(), ScalarType::Str);
        assert_eq!(f.str_value().unwrap(), "MERIS<5.02>");
        assert_eq!(f.unit(), None);

        // A unit after the closing quote still splits off.
        let f = parse("NAME=\"abc\"<bytes>");
        assert_eq!(f.str_value().unwrap(), "abc");
        assert_eq!(f.unit(), Some("bytes"));
    }

    #[test]
    fn empty_value_is_degenerate_placeholder() {
        let f = parse("SPARE=");
        assert_eq!(f.scalar_type(), ScalarType::UInt8);
        assert_eq!(f.info.element_count, 1);
        assert_eq!(f.info.total_size, 0);
        assert!(f.data.is_empty());
    }

    #[test]
    fn single_character_is_its_byte_code() {
        let f = parse("DS_TYPE=M");
        assert_eq!(f.scalar_type(), ScalarType::UInt8);
        assert_eq!(f.uint8_at(0).unwrap(), b'M');
    }

    #[test]
    fn lone_sign_contributes_no_element() {
        let f = parse("X=+");
        assert_eq!(f.scalar_type(), ScalarType::UInt32);
        assert_eq!(f.info.element_count, 0);
        assert_eq!(f.info.total_size, 0);
    }

    #[test]
    fn trailing_garbage_in_token_is_ignored() {
        let f = parse("V=+123abc+456");
        assert_eq!(f.scalar_type(), ScalarType::UInt32);
        assert_eq!(f.info.element_count, 2);
        assert_eq!(f.uint32_at(0).unwrap(), 123);
        assert_eq!(f.uint32_at(1).unwrap(), 456);
    }

    #[test]
    fn garbage_digits_after_stop_do_not_resume() {
        // A digit after non-digit garbage belongs to no token element.
        let f = parse("V=+12x3");
        assert_eq!(f.info.element_count, 1);
        assert_eq!(f.uint32_at(0).unwrap(), 12);
    }

    #[test]
    fn float_prefix_wins_over_later_tokens() {
        let f = parse("V=+1.5-2.5");
        assert_eq!(f.scalar_type(), ScalarType::Float64);
        assert_eq!(f.info.element_count, 1);
        assert_eq!(f.float64_at(0).unwrap(), 1.5);
    }

    #[test]
    fn unquoted_text_falls_back_to_int32() {
        let f = parse("WHAT=ever");
        assert_eq!(f.scalar_type(), ScalarType::Int32);
        assert_eq!(f.info.element_count, 1);
        assert_eq!(f.int32_at(0).unwrap(), 0);

        let f = parse("N=1234");
        assert_eq!(f.scalar_type(), ScalarType::Int32);
        assert_eq!(f.int32_at(0).unwrap(), 1234);
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert!(parse_header_line("").unwrap().is_none());
        assert!(matches!(
            parse_header_line("no equals sign"),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(
            parse_header_line("=value"),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn block_parse_skips_bad_lines_and_keeps_order() {
        let text = "PRODUCT=\"MER_RR__2P\"\n\nbogus line\nNUM_DSD=+0000000022\n";
        let rec = parse_header_block(text);
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.field_at(0).unwrap().name(), "PRODUCT");
        assert_eq!(rec.field_at(1).unwrap().name(), "NUM_DSD");
        assert_eq!(rec.field_at(1).unwrap().uint32_at(0).unwrap(), 22);
    }

    #[test]
    fn overflow_wraps_instead_of_failing() {
        let f = parse("BIG=+99999999999999999999");
        assert_eq!(f.scalar_type(), ScalarType::UInt32);
        assert_eq!(f.info.element_count, 1);
        // Value is whatever 32-bit wrapping accumulation produces; the parse
        // must simply not fail.
        assert!(f.uint32_at(0).is_ok());
    }
}
