//! The escaping table. Both the template expander and the formatter's quoted
//!  conversions go through [EscapeCodec]; nothing else in the crate writes
//!  substituted bytes into a statement.
//!
//! | input             | None    | Single/Double    | Backtick |
//! |-------------------|---------|------------------|----------|
//! | `'`               | literal | `''`             | literal  |
//! | `` ` ``           | literal | literal          | doubled  |
//! | `\`               | literal | `\\`             | literal  |
//! | `\n` `\r` `\t`    | literal | `\n` `\r` `\t`   | dropped  |
//! | form feed         | literal | literal          | dropped  |
//! | other < 0x20      | dropped | dropped          | dropped  |
//! | everything else   | literal | literal          | literal  |

use crate::{buffer::StatementBuffer, quote::Quote};

const FORM_FEED: u8 = 0x0c;

/// Which bytes of a list-mode value separate elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Split {
    /// Not a list: commas are ordinary bytes.
    #[default]
    Never,
    Commas,
    CommasAndTabs,
}

impl Split {
    fn is_separator(self, byte: u8) -> bool {
        match self {
            Split::Never => false,
            Split::Commas => byte == b',',
            Split::CommasAndTabs => byte == b',' || byte == b'\t',
        }
    }
}

/// Escapes raw bytes for one quoting context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeCodec {
    quote: Quote,
    split: Split,
}

impl EscapeCodec {
    pub fn new(quote: Quote) -> Self {
        Self {
            quote,
            split: Split::Never,
        }
    }

    /// A codec for list-mode substitution: every separator closes the current
    ///  element and opens the next one.
    pub fn list(quote: Quote, split: Split) -> Self {
        Self { quote, split }
    }

    pub fn quote(&self) -> Quote {
        self.quote
    }

    /// Appends the escaped form of [byte].
    pub fn push(&self, out: &mut StatementBuffer, byte: u8) {
        if self.split.is_separator(byte) {
            let q = self.quote.list_quote();
            out.push(q);
            out.push(b',');
            out.push(q);
            return;
        }
        match self.quote {
            Quote::None => {
                if !byte.is_ascii_control()
                    || matches!(byte, b'\n' | b'\r' | b'\t' | FORM_FEED)
                    || byte == 0x7f
                {
                    out.push(byte);
                }
            }
            Quote::Backtick => match byte {
                b'`' => out.push_bytes(b"``"),
                b if b >= b' ' => out.push(b),
                _ => {}
            },
            Quote::Single | Quote::Double => match byte {
                b'\'' => out.push_bytes(b"''"),
                b'\\' => out.push_bytes(b"\\\\"),
                b'\n' => out.push_bytes(b"\\n"),
                b'\r' => out.push_bytes(b"\\r"),
                b'\t' => out.push_bytes(b"\\t"),
                FORM_FEED => out.push(byte),
                b if b >= b' ' => out.push(b),
                _ => {}
            },
        }
    }

    pub fn push_all(&self, out: &mut StatementBuffer, bytes: &[u8]) {
        for &b in bytes {
            self.push(out, b);
        }
    }

    /// Appends [bytes] as a complete literal: escaped and wrapped in the
    ///  canonical quote (`'` when the codec is unquoted).
    pub fn push_quoted(&self, out: &mut StatementBuffer, bytes: &[u8]) {
        let q = self.quote.canonical().unwrap_or(b'\'');
        let inner = if self.quote.is_quoted() {
            *self
        } else {
            EscapeCodec {
                quote: Quote::Single,
                ..*self
            }
        };
        out.push(q);
        inner.push_all(out, bytes);
        out.push(q);
    }

    /// True when [byte] would not come out unchanged.
    pub fn alters(&self, byte: u8) -> bool {
        let mut scratch = StatementBuffer::with_capacity(2);
        self.push(&mut scratch, byte);
        scratch.as_bytes() != [byte]
    }
}

/// Escapes a whole string into a single-quoted SQL literal.
pub fn quote_literal(s: &str) -> String {
    let mut out = StatementBuffer::with_capacity(s.len() + 2);
    EscapeCodec::new(Quote::Single).push_quoted(&mut out, s.as_bytes());
    out.into_string()
}

/// Escapes a string for use inside an existing single-quoted literal.
pub fn escape_str(s: &str) -> String {
    let mut out = StatementBuffer::with_capacity(s.len());
    EscapeCodec::new(Quote::Single).push_all(&mut out, s.as_bytes());
    out.into_string()
}
