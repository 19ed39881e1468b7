//! Numeric conversions, rendered the way the C library renders them.

use crate::buffer::StatementBuffer;

/// Width, precision and the flags that shape a numeric conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub precision: Option<usize>,
    pub left: bool,
    pub zero: bool,
    pub alt: bool,
}

/// Writes [prefix] and [body] padded to the layout's width. Zero padding goes
///  between the two.
pub fn pad(out: &mut StatementBuffer, prefix: &[u8], body: &[u8], layout: &Layout, zero_ok: bool) {
    let len = prefix.len() + body.len();
    let fill = layout.width.saturating_sub(len);
    if layout.left {
        out.push_bytes(prefix);
        out.push_bytes(body);
        out.push_repeated(b' ', fill);
    } else if layout.zero && zero_ok {
        out.push_bytes(prefix);
        out.push_repeated(b'0', fill);
        out.push_bytes(body);
    } else {
        out.push_repeated(b' ', fill);
        out.push_bytes(prefix);
        out.push_bytes(body);
    }
}

fn with_precision(digits: String, zero: bool, precision: Option<usize>) -> String {
    match precision {
        Some(0) if zero => String::new(),
        Some(p) if p > digits.len() => format!("{}{digits}", "0".repeat(p - digits.len())),
        _ => digits,
    }
}

/// `%d`: [value] is first truncated to [bits], as a C `int` argument would be.
pub fn signed(out: &mut StatementBuffer, value: i64, bits: u32, layout: &Layout) {
    let shift = 64 - bits.clamp(1, 64);
    let value = (value << shift) >> shift;
    let magnitude = value.unsigned_abs();
    let digits = with_precision(magnitude.to_string(), magnitude == 0, layout.precision);
    let sign: &[u8] = if value < 0 { b"-" } else { b"" };
    pad(out, sign, digits.as_bytes(), layout, layout.precision.is_none());
}

/// `%o`, `%u`, `%x` and `%X`.
pub fn unsigned(out: &mut StatementBuffer, value: i64, bits: u32, letter: u8, layout: &Layout) {
    let mask = match bits {
        64.. => u64::MAX,
        b => (1u64 << b) - 1,
    };
    let value = value as u64 & mask;
    let digits = match letter {
        b'o' => format!("{value:o}"),
        b'x' => format!("{value:x}"),
        b'X' => format!("{value:X}"),
        _ => value.to_string(),
    };
    let mut digits = with_precision(digits, value == 0, layout.precision);
    let mut prefix: &[u8] = b"";
    if layout.alt {
        match letter {
            b'o' if !digits.starts_with('0') => digits.insert(0, '0'),
            b'x' if value != 0 => prefix = b"0x",
            b'X' if value != 0 => prefix = b"0X",
            _ => {}
        }
    }
    pad(out, prefix, digits.as_bytes(), layout, layout.precision.is_none());
}

/// `%p`
pub fn pointer(out: &mut StatementBuffer, value: usize, layout: &Layout) {
    if value == 0 {
        pad(out, b"", b"(nil)", layout, false);
    } else {
        pad(out, b"0x", format!("{value:x}").as_bytes(), layout, false);
    }
}

/// `%e` and friends. Upper-case letters give upper-case output.
pub fn float(out: &mut StatementBuffer, value: f64, letter: u8, layout: &Layout) {
    let upper = letter.is_ascii_uppercase();
    let sign: &[u8] = if value.is_sign_negative() { b"-" } else { b"" };
    let a = value.abs();

    if !a.is_finite() {
        let body = match (a.is_nan(), upper) {
            (true, false) => "nan",
            (true, true) => "NAN",
            (false, false) => "inf",
            (false, true) => "INF",
        };
        pad(out, sign, body.as_bytes(), layout, false);
        return;
    }

    let body = match letter.to_ascii_lowercase() {
        b'f' => fixed(a, layout.precision.unwrap_or(6), layout.alt),
        b'e' => exponent(a, layout.precision.unwrap_or(6), layout.alt),
        b'g' => general(a, layout.precision, layout.alt),
        _ => {
            let hex = hex(a, layout.precision, layout.alt);
            let mut prefix = sign.to_vec();
            prefix.extend_from_slice(if upper { b"0X" } else { b"0x" });
            let hex = if upper { hex.to_ascii_uppercase() } else { hex };
            pad(out, &prefix, hex.as_bytes(), layout, true);
            return;
        }
    };
    let body = if upper { body.to_ascii_uppercase() } else { body };
    pad(out, sign, body.as_bytes(), layout, true);
}

/// Fraction digits past this are zero for every finite `f64`.
const EXACT_DIGITS: usize = 1100;

fn fixed(a: f64, precision: usize, alt: bool) -> String {
    let exact = precision.min(EXACT_DIGITS);
    let mut s = format!("{a:.exact$}");
    s.extend(std::iter::repeat_n('0', precision - exact));
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

/// Decimal exponent of [a] once rounded to [precision] fraction digits.
fn decimal_exponent(a: f64, precision: usize) -> i64 {
    let exact = precision.min(EXACT_DIGITS);
    let s = format!("{a:.exact$e}");
    s.split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0)
}

fn exponent(a: f64, precision: usize, alt: bool) -> String {
    let exact = precision.min(EXACT_DIGITS);
    let s = format!("{a:.exact$e}");
    let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let zeros = "0".repeat(precision - exact);
    let point = if alt && precision == 0 { "." } else { "" };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{zeros}{point}e{sign}{:02}", exp.unsigned_abs())
}

fn general(a: f64, precision: Option<usize>, alt: bool) -> String {
    let p = match precision {
        None => 6,
        Some(0) => 1,
        Some(p) => p,
    };
    let x = if a == 0.0 { 0 } else { decimal_exponent(a, p - 1) };
    let p_signed = i64::try_from(p).unwrap_or(i64::MAX);
    let s = if x < p_signed && x >= -4 {
        // -4 <= x < p, so the fraction length is in 0..=p+3
        fixed(a, usize::try_from(p_signed - 1 - x).unwrap_or(0), alt)
    } else {
        exponent(a, p - 1, alt)
    };
    if alt {
        return s;
    }
    let (mantissa, exp) = match s.find('e') {
        Some(i) => s.split_at(i),
        None => (s.as_str(), ""),
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}{exp}")
}

/// `%a` without the `0x` prefix.
fn hex(a: f64, precision: Option<usize>, alt: bool) -> String {
    const FRACTION_DIGITS: usize = 13;
    let bits = a.to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i32;
    let mut fraction = bits & ((1u64 << 52) - 1);
    let (mut lead, exp) = match (exp_bits, fraction) {
        (0, 0) => (0u64, 0),
        (0, _) => (0, -1022),
        (e, _) => (1, e - 1023),
    };

    let digits = match precision {
        None => {
            let all = format!("{fraction:013x}");
            all.trim_end_matches('0').to_string()
        }
        Some(p) if p < FRACTION_DIGITS => {
            let shift = (FRACTION_DIGITS - p) as u32 * 4;
            let mut kept = fraction >> shift;
            let rest = fraction & ((1u64 << shift) - 1);
            let half = 1u64 << (shift - 1);
            if rest > half || (rest == half && kept & 1 == 1) {
                kept += 1;
            }
            let limit = 1u64 << (p * 4);
            if kept >= limit {
                lead += 1;
                kept -= limit;
            }
            fraction = kept;
            if p == 0 {
                String::new()
            } else {
                format!("{fraction:0p$x}")
            }
        }
        Some(p) => format!("{fraction:013x}{}", "0".repeat(p - FRACTION_DIGITS)),
    };

    let point = if digits.is_empty() && !alt { "" } else { "." };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{lead}{point}{digits}p{sign}{}", exp.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut StatementBuffer)) -> String {
        let mut out = StatementBuffer::new();
        f(&mut out);
        out.into_string()
    }

    fn layout(width: usize, precision: Option<usize>) -> Layout {
        Layout {
            width,
            precision,
            ..Layout::default()
        }
    }

    #[test]
    fn signed_integers() {
        let plain = Layout::default();
        assert_eq!(render(|o| signed(o, -42, 32, &plain)), "-42");
        assert_eq!(render(|o| signed(o, 1 << 32, 32, &plain)), "0");
        assert_eq!(render(|o| signed(o, 1 << 32, 64, &plain)), "4294967296");
        assert_eq!(render(|o| signed(o, 200, 8, &plain)), "-56");
        assert_eq!(render(|o| signed(o, i64::MIN, 64, &plain)), "-9223372036854775808");

        assert_eq!(render(|o| signed(o, 7, 32, &layout(4, None))), "   7");
        assert_eq!(render(|o| signed(o, 7, 32, &layout(4, Some(3)))), " 007");
        assert_eq!(render(|o| signed(o, 0, 32, &layout(0, Some(0)))), "");

        let zero = Layout {
            width: 5,
            zero: true,
            ..Layout::default()
        };
        assert_eq!(render(|o| signed(o, -7, 32, &zero)), "-0007");
        let left = Layout {
            width: 5,
            left: true,
            zero: true,
            ..Layout::default()
        };
        assert_eq!(render(|o| signed(o, -7, 32, &left)), "-7   ");
    }

    #[test]
    fn unsigned_integers() {
        let plain = Layout::default();
        assert_eq!(render(|o| unsigned(o, -1, 32, b'u', &plain)), "4294967295");
        assert_eq!(render(|o| unsigned(o, 255, 32, b'x', &plain)), "ff");
        assert_eq!(render(|o| unsigned(o, 255, 32, b'X', &plain)), "FF");
        assert_eq!(render(|o| unsigned(o, 8, 32, b'o', &plain)), "10");

        let alt = Layout {
            alt: true,
            ..Layout::default()
        };
        assert_eq!(render(|o| unsigned(o, 255, 32, b'x', &alt)), "0xff");
        assert_eq!(render(|o| unsigned(o, 0, 32, b'x', &alt)), "0");
        assert_eq!(render(|o| unsigned(o, 8, 32, b'o', &alt)), "010");
    }

    #[test]
    fn pointers() {
        let plain = Layout::default();
        assert_eq!(render(|o| pointer(o, 0x1f, &plain)), "0x1f");
        assert_eq!(render(|o| pointer(o, 0, &plain)), "(nil)");
    }

    #[test]
    fn fixed_and_exponent() {
        let plain = Layout::default();
        assert_eq!(render(|o| float(o, 3.14159, b'f', &plain)), "3.141590");
        assert_eq!(render(|o| float(o, 2.5, b'f', &layout(0, Some(0)))), "2");
        assert_eq!(render(|o| float(o, -0.0, b'f', &layout(0, Some(1)))), "-0.0");
        assert_eq!(render(|o| float(o, 1.5e10, b'e', &plain)), "1.500000e+10");
        assert_eq!(render(|o| float(o, 0.00012, b'E', &layout(0, Some(2)))), "1.20E-04");
        assert_eq!(render(|o| float(o, 1.0, b'f', &layout(8, Some(2)))), "    1.00");
        assert_eq!(render(|o| float(o, f64::INFINITY, b'F', &plain)), "INF");
        assert_eq!(render(|o| float(o, f64::NEG_INFINITY, b'f', &plain)), "-inf");
    }

    #[test]
    fn general() {
        let plain = Layout::default();
        assert_eq!(render(|o| float(o, 100000.0, b'g', &plain)), "100000");
        assert_eq!(render(|o| float(o, 1000000.0, b'g', &plain)), "1e+06");
        assert_eq!(render(|o| float(o, 0.0001, b'g', &plain)), "0.0001");
        assert_eq!(render(|o| float(o, 0.00001, b'g', &plain)), "1e-05");
        assert_eq!(render(|o| float(o, 3.5, b'g', &plain)), "3.5");
        assert_eq!(render(|o| float(o, 0.0, b'g', &plain)), "0");
        assert_eq!(render(|o| float(o, 123456789.0, b'G', &layout(0, Some(3)))), "1.23E+08");
    }

    #[test]
    fn precision_past_exact_digits() {
        let wide = layout(0, Some(70_000));
        let fixed = render(|o| float(o, 1.0, b'f', &wide));
        assert_eq!(fixed.len(), 2 + 70_000);
        assert!(fixed.starts_with("1.000"));
        assert!(fixed[2..].bytes().all(|b| b == b'0'));

        let exp = render(|o| float(o, 0.1, b'e', &wide));
        assert!(exp.starts_with("1.000000000000000055511151231257827"));
        assert!(exp.ends_with("0e-01"));
        assert_eq!(exp.len(), 2 + 70_000 + 4);

        assert_eq!(render(|o| float(o, 0.5, b'g', &wide)), "0.5");
        assert_eq!(render(|o| float(o, 1e300, b'g', &wide)).len(), 301);
    }

    #[test]
    fn hex_floats() {
        let plain = Layout::default();
        assert_eq!(render(|o| float(o, 1.0, b'a', &plain)), "0x1p+0");
        assert_eq!(render(|o| float(o, 3.0, b'a', &plain)), "0x1.8p+1");
        assert_eq!(render(|o| float(o, -0.5, b'A', &plain)), "-0X1P-1");
        assert_eq!(render(|o| float(o, 0.0, b'a', &plain)), "0x0p+0");
        assert_eq!(render(|o| float(o, 1.0, b'a', &layout(0, Some(2)))), "0x1.00p+0");
    }
}
