//! printf-style statement building over typed arguments.
//!
//! `%[flags][width][.precision][length]conversion`, with the flags
//!  `#` (SQL quoting), `!` (release the argument after use) and `-`
//!  (left-align). On top of the usual numeric conversions:
//!
//!  * `%s` / `%S`: text. `%#s` is a quoted, escaped literal, `%#S` is escaped
//!    but not wrapped. A null argument is `NULL` with `#`, an error without.
//!  * `%c`: a character; `'\0'` is `NULL`.
//!  * `%T` / `%U` / `%Z`: a timestamp as a SQL datetime, local or UTC.
//!  * `%B`: `TRUE`/`FALSE`, or `'Y'`/`'N'` with `#`.
//!
//! Anything we cannot format is copied to the output unchanged.

pub mod arg;
pub mod directive;
pub mod numeric;
pub mod timestamp;

use thiserror::Error;

use crate::{
    buffer::StatementBuffer,
    escape::EscapeCodec,
    quote::Quote,
    scan::Scanner,
};
pub use arg::Arg;
use directive::{Conversion, Count, Directive, Parsed};
use numeric::Layout;
pub use timestamp::{Zone, parse_datetime};

/// The absence-of-value keyword.
pub const NULL: &str = "NULL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("missing argument {position}")]
    MissingArgument { position: usize },
    #[error("argument {position} is {found}, which %{conversion} cannot format")]
    ArgumentMismatch {
        position: usize,
        conversion: char,
        found: &'static str,
    },
    #[error("argument {position} is null; only %#s and %#S write NULL")]
    NullText { position: usize },
    #[error("argument {position} is not a representable timestamp")]
    TimestampOutOfRange { position: usize },
    #[error("width or precision over {MAX_FIELD} for argument {position}")]
    FieldTooWide { position: usize },
}

/// Largest width or precision a directive may ask for.
pub const MAX_FIELD: usize = 1 << 20;

/// Formats [args] into a new statement.
///
/// ```
/// use sql_expand::format::{format, Arg};
///
/// let sql = format("SELECT * FROM t WHERE name = %#s", &mut [Arg::from("O'Brien")]).unwrap();
/// assert_eq!(sql, "SELECT * FROM t WHERE name = 'O''Brien'");
/// ```
pub fn format(fmt: &str, args: &mut [Arg<'_>]) -> Result<String, FormatError> {
    let mut out = StatementBuffer::with_capacity(fmt.len());
    format_into(&mut out, fmt, args)?;
    Ok(out.into_string())
}

/// Appends to [out]. On error [out] is left as it was, though `!` arguments
///  already written have been released.
pub fn format_into(out: &mut StatementBuffer, fmt: &str, args: &mut [Arg<'_>]) -> Result<(), FormatError> {
    let rollback = out.len();
    let result = write(out, fmt, args);
    if result.is_err() {
        out.truncate(rollback);
    }
    result
}

/// `format` with the arguments converted in place.
#[macro_export]
macro_rules! sql_format {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        $crate::format::format($fmt, &mut [$($crate::format::Arg::from($arg)),*])
    };
}

struct Args<'s, 'a> {
    args: &'s mut [Arg<'a>],
    next: usize,
}

impl<'a> Args<'_, 'a> {
    fn take(&mut self) -> Result<(usize, &mut Arg<'a>), FormatError> {
        let position = self.next;
        let arg = self
            .args
            .get_mut(position)
            .ok_or(FormatError::MissingArgument { position })?;
        self.next += 1;
        Ok((position, arg))
    }

    /// A `*` width or precision, read as a C `int`.
    fn count(&mut self, letter: u8) -> Result<i32, FormatError> {
        let (position, arg) = self.take()?;
        match *arg {
            Arg::Int(v) => Ok(v as i32),
            Arg::UInt(v) => Ok(v as i32),
            _ => Err(mismatch(position, letter, arg)),
        }
    }
}

fn mismatch(position: usize, letter: u8, arg: &Arg) -> FormatError {
    FormatError::ArgumentMismatch {
        position,
        conversion: letter as char,
        found: arg.kind(),
    }
}

fn integer(position: usize, letter: u8, arg: &Arg) -> Result<i64, FormatError> {
    arg.as_integer().ok_or_else(|| mismatch(position, letter, arg))
}

fn character(position: usize, letter: u8, arg: &Arg) -> Result<char, FormatError> {
    integer(position, letter, arg)?
        .try_into()
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| mismatch(position, letter, arg))
}

fn write(out: &mut StatementBuffer, fmt: &str, args: &mut [Arg<'_>]) -> Result<(), FormatError> {
    let mut s = Scanner::new(fmt.as_bytes());
    let mut args = Args { args, next: 0 };
    while let Some(b) = s.peek() {
        if b != b'%' {
            let start = s.position();
            s.consume_while(|b| b != b'%');
            out.push_bytes(s.since(start));
            continue;
        }
        match directive::parse(&mut s) {
            Parsed::Percent => out.push(b'%'),
            Parsed::Verbatim(text) => out.push_bytes(text),
            Parsed::Directive(d) => convert(out, &d, &mut args)?,
        }
    }
    Ok(())
}

fn layout(d: &Directive, args: &mut Args) -> Result<Layout, FormatError> {
    let mut layout = Layout {
        left: d.flags.left_align,
        zero: d.flags.zero_pad,
        alt: d.flags.alt,
        ..Layout::default()
    };
    match d.width {
        Count::Literal(n) => layout.width = n,
        Count::FromArg => {
            let width = args.count(d.letter)?;
            // A negative width is a `-` flag
            layout.left |= width < 0;
            layout.width = usize::try_from(width.unsigned_abs()).unwrap_or(usize::MAX);
        }
        Count::Unset => {}
    }
    layout.precision = match d.precision {
        Count::Literal(n) => Some(n),
        Count::FromArg => usize::try_from(args.count(d.letter)?).ok(),
        Count::Unset => None,
    };
    if layout.width > MAX_FIELD || layout.precision.is_some_and(|p| p > MAX_FIELD) {
        return Err(FormatError::FieldTooWide { position: args.next });
    }
    Ok(layout)
}

fn convert(out: &mut StatementBuffer, d: &Directive, args: &mut Args) -> Result<(), FormatError> {
    let layout = layout(d, args)?;
    if !d.conversion.takes_argument() {
        write_text(out, &os_error(), false, false, &layout);
        return Ok(());
    }

    let (position, arg) = args.take()?;
    match d.conversion {
        Conversion::Int => {
            numeric::signed(out, integer(position, d.letter, arg)?, d.length.int_bits(), &layout)
        }
        Conversion::Unsigned(letter) => {
            numeric::unsigned(out, integer(position, d.letter, arg)?, d.length.int_bits(), letter, &layout)
        }
        Conversion::Float(letter) => {
            let Some(value) = arg.as_float() else {
                return Err(mismatch(position, d.letter, arg));
            };
            numeric::float(out, value, letter, &layout)
        }
        Conversion::Pointer => {
            let value = match *arg {
                Arg::Pointer(p) => p,
                Arg::UInt(v) => match usize::try_from(v) {
                    Ok(p) => p,
                    Err(_) => return Err(mismatch(position, d.letter, arg)),
                },
                _ => return Err(mismatch(position, d.letter, arg)),
            };
            numeric::pointer(out, value, &layout)
        }
        Conversion::WideChar => {
            let c = character(position, d.letter, arg)?;
            numeric::pad(out, b"", c.encode_utf8(&mut [0; 4]).as_bytes(), &layout, false)
        }
        Conversion::Char => {
            let c = character(position, d.letter, arg)?;
            let mut utf8 = [0; 4];
            let bytes = c.encode_utf8(&mut utf8).as_bytes();
            if c == '\0' {
                out.push_str(NULL);
            } else if layout.alt {
                EscapeCodec::new(Quote::Single).push_quoted(out, bytes);
            } else {
                out.push_bytes(bytes);
            }
        }
        Conversion::Text { wrap } => {
            let Arg::Text(text) = &*arg else {
                return Err(mismatch(position, d.letter, arg));
            };
            match text {
                Some(text) => write_text(out, text, layout.alt, wrap && layout.alt, &layout),
                None if layout.alt => out.push_str(NULL),
                None => return Err(FormatError::NullText { position }),
            }
            if d.flags.free_after_use {
                *arg = Arg::null();
            }
        }
        Conversion::DateTimeLocal | Conversion::DateTimeUtc => {
            let seconds = match *arg {
                Arg::Timestamp(v) | Arg::Int(v) => v,
                _ => return Err(mismatch(position, d.letter, arg)),
            };
            let zone = if d.conversion == Conversion::DateTimeLocal {
                Zone::Local
            } else {
                Zone::Utc
            };
            let mut text = timestamp::render(seconds, zone).ok_or(FormatError::TimestampOutOfRange { position })?;
            if seconds != 0 && layout.width > 0 {
                text.truncate(layout.width);
            }
            if layout.alt {
                out.push(b'\'');
                out.push_str(&text);
                out.push(b'\'');
            } else {
                out.push_str(&text);
            }
        }
        Conversion::Bool => {
            let value = integer(position, d.letter, arg)? != 0;
            out.push_str(match (value, layout.alt) {
                (true, false) => "TRUE",
                (false, false) => "FALSE",
                (true, true) => "'Y'",
                (false, true) => "'N'",
            });
        }
        Conversion::OsError => {}
    }
    Ok(())
}

/// Text with precision counted in characters and width padding based on the
///  unescaped length. Padding goes inside the quotes.
fn write_text(out: &mut StatementBuffer, text: &str, escape: bool, wrap: bool, layout: &Layout) {
    let text = match layout.precision {
        Some(p) => text.char_indices().nth(p).map_or(text, |(end, _)| &text[..end]),
        None => text,
    };
    let fill = layout.width.saturating_sub(text.chars().count());
    if wrap {
        out.push(b'\'');
    }
    if !layout.left {
        out.push_repeated(b' ', fill);
    }
    if escape {
        EscapeCodec::new(Quote::Single).push_all(out, text.as_bytes());
    } else {
        out.push_str(text);
    }
    if layout.left {
        out.push_repeated(b' ', fill);
    }
    if wrap {
        out.push(b'\'');
    }
}

/// `%m`: the message for the last OS error.
fn os_error() -> String {
    let message = std::io::Error::last_os_error().to_string();
    match message.rsplit_once(" (os error ") {
        Some((text, _)) => text.to_string(),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    macro_rules! assert_formats {
        ($expected:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
            assert_eq!(
                crate::sql_format!($fmt $(, $arg)*).as_deref(),
                Ok($expected),
                "format {:?}",
                $fmt
            );
        };
    }

    #[test]
    fn literal_text() {
        assert_formats!("select 1", "select 1");
        assert_formats!("100%", "100%%");
        assert_formats!("a % b", "a %-3% b");
    }

    #[test]
    fn quoted_strings() {
        assert_formats!("'a''b'", "%#s", "a'b");
        assert_formats!("a''b", "%#S", "a'b");
        assert_formats!("a'b", "%s", "a'b");
        assert_formats!("'line\\nbreak\\\\'", "%#s", "line\nbreak\\");
        assert_formats!("NULL", "%#s", None::<&str>);
        assert_formats!("NULL", "%#S", None::<&str>);
    }

    #[test]
    fn null_without_quoting_is_an_error() {
        assert_eq!(sql_format!("%s", None::<&str>), Err(FormatError::NullText { position: 0 }));
    }

    #[test]
    fn string_width_and_precision() {
        assert_formats!("  ab", "%4s", "ab");
        assert_formats!("ab  |", "%-4s|", "ab");
        assert_formats!("abc", "%.3s", "abcdef");
        assert_formats!("", "%.0s", "abcdef");
        assert_formats!("'  it''s'", "%#6s", "it's");
        assert_formats!("  xy", "%*s", 4, "xy");
        assert_formats!("xy  ", "%*s", -4, "xy");
        assert_formats!("ab", "%.*s", 2, "abc");
        assert_formats!("zoë", "%.3s", "zoë!");
    }

    #[test]
    fn characters() {
        assert_formats!("x", "%c", 'x');
        assert_formats!("'x'", "%#c", 'x');
        assert_formats!("''''", "%#c", '\'');
        assert_formats!("'\\n'", "%#c", '\n');
        assert_formats!("NULL", "%c", '\0');
        assert_formats!("A", "%c", 65);
        assert_formats!("  x", "%3C", 'x');
    }

    #[test]
    fn booleans() {
        assert_formats!("TRUE", "%B", 1);
        assert_formats!("FALSE", "%B", false);
        assert_formats!("'N'", "%#B", 0);
        assert_formats!("'Y'", "%#B", true);
    }

    #[test]
    fn timestamps() {
        assert_formats!("0000-00-00", "%Z", Arg::Timestamp(0));
        assert_formats!("'0000-00-00'", "%#U", 0);
        assert_formats!("0000-00-00", "%T", 0);
        assert_formats!("2024-02-29 12:00:00", "%Z", Arg::Timestamp(1_709_208_000));
        assert_formats!("'2024-02-29 12:00:00'", "%#U", 1_709_208_000i64);
        assert_formats!("2024-02-29", "%10U", 1_709_208_000i64);
        assert_eq!(
            sql_format!("%U", Arg::Timestamp(i64::MAX)),
            Err(FormatError::TimestampOutOfRange { position: 0 })
        );
    }

    #[test]
    fn numbers() {
        assert_formats!("42 -7 ff", "%d %i %x", 42, -7, 255u8);
        assert_formats!("00042", "%05d", 42);
        assert_formats!("4294967295", "%u", -1);
        assert_formats!("-1", "%lld", -1);
        assert_formats!("3.14", "%.2f", 3.14159);
        assert_formats!("1.500000e+00", "%e", 1.5);
        assert_formats!("0.1", "%g", 0.1);
        assert_formats!("3.000", "%.3f", 3);
        assert_formats!("0x10", "%p", Arg::Pointer(16));
        assert_formats!("0x1f", "%#x", 31);
    }

    #[test]
    fn large_and_star_precisions() {
        let out = sql_format!("%.70000f", 1.0).unwrap();
        assert_eq!(out.len(), 70_002);
        assert!(out.starts_with("1.0"));

        // `*` counts are C ints: 2^31 wraps negative, which means no precision
        assert_formats!("1", "%.*g", Arg::Int(2_147_483_648), 1.0);
        assert_formats!("1.500", "%.*f", Arg::Int((1 << 32) + 3), 1.5);
        assert_formats!("x  |", "%*s|", -3, "x");

        assert_eq!(
            sql_format!("%.2000000f", 1.0),
            Err(FormatError::FieldTooWide { position: 0 })
        );
        assert_eq!(
            sql_format!("%99999999999d", 1),
            Err(FormatError::FieldTooWide { position: 0 })
        );
        assert_eq!(
            sql_format!("%d %*d", 1, Arg::Int(i64::from(i32::MAX)), 2),
            Err(FormatError::FieldTooWide { position: 2 })
        );
    }

    #[test]
    fn unknown_directives_are_verbatim() {
        assert_formats!("%k", "%k");
        assert_formats!("%-5k", "%-5k");
        assert_formats!("%n", "%n");
        assert_formats!("50%", "50%");
        assert_formats!("%0000000000000000000000001d", "%0000000000000000000000001d");
    }

    #[test]
    fn os_error_takes_no_argument() {
        let out = sql_format!("%m|%d", 1).unwrap();
        assert!(out.ends_with("|1"), "{out}");
    }

    #[test]
    fn argument_errors() {
        assert_eq!(sql_format!("%d %d", 1), Err(FormatError::MissingArgument { position: 1 }));
        assert_eq!(
            sql_format!("%d", "x"),
            Err(FormatError::ArgumentMismatch {
                position: 0,
                conversion: 'd',
                found: "text"
            })
        );
        assert_eq!(
            sql_format!("%s", 1),
            Err(FormatError::ArgumentMismatch {
                position: 0,
                conversion: 's',
                found: "int"
            })
        );
        assert!(matches!(
            sql_format!("%*d", "w", 1),
            Err(FormatError::ArgumentMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn failed_format_leaves_buffer_alone() {
        let mut out = StatementBuffer::new();
        out.push_str("kept");
        let err = format_into(&mut out, "x %d %d", &mut [Arg::from(1)]);
        assert!(err.is_err());
        assert_eq!(out.as_bytes(), b"kept");
    }

    #[test]
    fn free_after_use_releases_the_argument() {
        let mut args = [Arg::from(String::from("owned")), Arg::from("kept")];
        let sql = format("%!#s %s", &mut args).unwrap();
        assert_eq!(sql, "'owned' kept");
        assert_eq!(args[0], Arg::null());
        assert_eq!(args[1], Arg::Text(Some(Cow::Borrowed("kept"))));
    }

    #[test]
    fn escaping_is_applied_once() {
        let once = format("%#S", &mut [Arg::from("a'b")]).unwrap();
        assert_eq!(once, "a''b");
        // Escaping the output again is a second pass over new raw bytes
        let twice = format("%#S", &mut [Arg::from(once.as_str())]).unwrap();
        assert_eq!(twice, "a''''b");
    }
}
