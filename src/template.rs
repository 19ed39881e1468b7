//! Expands `$` references in a statement template.
//!
//! The template is scanned once, byte by byte, tracking which quote we are
//!  inside. Substituted values are escaped for that quote, so a value can
//!  never close the quote it was placed in. Unquoted values must be numbers
//!  (see [numeric]) or come out as a quoted literal.

pub mod numeric;
pub mod reference;

use thiserror::Error;
use tracing::debug;

use crate::{
    buffer::StatementBuffer,
    escape::{EscapeCodec, Split},
    quote::{Quote, QuoteContext},
    resolve::{Resolver, VariableSource},
    scan::Scanner,
};
use reference::{Reference, Token};

/// Written in place of an unquoted value that is neither a number nor clearly
///  a string.
pub const PLACEHOLDER: u8 = b'0';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// An unquoted `;` inside the statement. Only one statement may be run per
    ///  template.
    #[error("multiple statements: unquoted ';' at byte {offset}")]
    MultipleStatements { offset: usize },
}

#[inline]
fn is_trimmable(b: u8) -> bool {
    b <= b' '
}

/// Byte range of the statement proper: surrounding whitespace and control
///  bytes and one trailing `;` are not part of it.
pub fn statement_bounds(template: &[u8]) -> (usize, usize) {
    let start = template
        .iter()
        .position(|&b| !is_trimmable(b))
        .unwrap_or(template.len());
    let mut end = template.len();
    while end > start && is_trimmable(template[end - 1]) {
        end -= 1;
    }
    if end > start && template[end - 1] == b';' {
        end -= 1;
        while end > start && is_trimmable(template[end - 1]) {
            end -= 1;
        }
    }
    (start, end)
}

/// The template with its terminator and surrounding whitespace removed.
pub fn trim_statement(template: &str) -> &str {
    let (start, end) = statement_bounds(template.as_bytes());
    // Both bounds sit next to ASCII bytes, so they are char boundaries
    &template[start..end]
}

/// Codec for a substituted value in the current quote. Unquoted values are
///  wrapped in `'` by the caller and escaped as such.
fn value_codec(quote: Quote, split: Split) -> EscapeCodec {
    let quote = if quote.is_quoted() { quote } else { Quote::Single };
    EscapeCodec::list(quote, split)
}

#[derive(Debug, Clone)]
pub struct Expander<S> {
    resolver: Resolver<S>,
}

impl<S: VariableSource> Expander<S> {
    pub fn new(source: S) -> Self {
        Self {
            resolver: Resolver::new(source),
        }
    }

    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    pub fn expand(&self, template: &str) -> Result<String, ExpandError> {
        let mut out = StatementBuffer::with_capacity(template.len());
        self.expand_into(template, &mut out)?;
        Ok(out.into_string())
    }

    /// Expands [template] onto the end of [out]. On error [out] is left as it
    ///  was.
    pub fn expand_into(&self, template: &str, out: &mut StatementBuffer) -> Result<(), ExpandError> {
        let rollback = out.len();
        let result = self.scan(template, out);
        if result.is_err() {
            out.truncate(rollback);
        }
        result
    }

    fn scan(&self, template: &str, out: &mut StatementBuffer) -> Result<(), ExpandError> {
        let (start, end) = statement_bounds(template.as_bytes());
        let mut s = Scanner::new(&template.as_bytes()[start..end]);
        let mut cx = QuoteContext::new();

        while let Some(byte) = s.peek() {
            // Closing the current quote
            if let Ok(next) = cx.quote.exit(byte) {
                out.push(cx.quote.canonical().unwrap_or(byte));
                cx.quote = next;
                s.advance(1);
                continue;
            }

            // Opening a quote
            if !cx.quote.is_quoted()
                && let Some(quote) = Quote::enter(byte)
            {
                cx.quote = quote;
                out.push(quote.canonical().unwrap_or(byte));
                s.advance(1);
                continue;
            }

            // A ' inside another kind of quote: the output is single-quoted
            if cx.quote.is_quoted() && byte == b'\'' {
                out.push_bytes(b"''");
                s.advance(1);
                continue;
            }

            // Escaped byte, copied as-is
            if byte == b'\\'
                && let Some(escaped) = s.peek_at(1)
            {
                out.push(byte);
                out.push(escaped);
                s.advance(2);
                continue;
            }

            if byte == b'$' {
                let mark = s;
                if let Some(token) = reference::parse(&mut s) {
                    if !self.substitute(token, &mut cx, out) {
                        // Unresolved: only the `$` is taken, the rest is template text
                        s = mark;
                        out.push(byte);
                        s.advance(1);
                    }
                    continue;
                }
            }

            if !cx.quote.is_quoted() && byte == b';' {
                return Err(ExpandError::MultipleStatements {
                    offset: start + s.position(),
                });
            }

            cx.track_paren(byte);
            EscapeCodec::new(cx.quote).push(out, byte);
            s.advance(1);
        }

        if cx.quote.is_quoted() {
            debug!(quote = ?cx.quote, "unterminated quote in template");
        }
        if cx.paren_depth != 0 {
            debug!(depth = cx.paren_depth, "unbalanced parentheses in template");
        }
        Ok(())
    }

    /// Writes the value of [token]. Returns false, writing nothing, when the
    ///  variable has no value.
    fn substitute(&self, token: Token, cx: &mut QuoteContext, out: &mut StatementBuffer) -> bool {
        match token.reference {
            Reference::Dollar => out.push(b'$'),
            Reference::Stdin => {
                let var = self.resolver.stdin();
                self.emit_literal(value_codec(cx.quote, Split::Never), cx.quote, var.value(), out);
            }
            Reference::Variable {
                name,
                hash,
                comma,
                file,
                ..
            } => {
                cx.hash = hash;
                cx.comma = comma;
                cx.file = file;
                let resolved = match self.resolver.resolve(name, file) {
                    Ok(var) => {
                        self.emit_variable(cx, var.value(), out);
                        true
                    }
                    Err(_) => false,
                };
                cx.clear_modifiers();
                return resolved;
            }
        }
        true
    }

    fn emit_variable(&self, cx: &QuoteContext, value: &[u8], out: &mut StatementBuffer) {
        if cx.file {
            let split = if cx.list_mode() { Split::Commas } else { Split::Never };
            self.emit_literal(value_codec(cx.quote, split), cx.quote, value, out);
            return;
        }

        if cx.list_mode() {
            let split = if cx.comma {
                Split::CommasAndTabs
            } else {
                Split::Commas
            };
            self.emit_literal(value_codec(cx.quote, split), cx.quote, value, out);
            return;
        }

        match cx.quote {
            // Identifiers: only names and dotted paths get through
            Quote::Backtick => {
                for &b in value {
                    if b.is_ascii_alphanumeric() || b == b'.' {
                        out.push(b);
                    }
                }
            }
            Quote::Single | Quote::Double => EscapeCodec::new(cx.quote).push_all(out, value),
            Quote::None => {
                let codec = EscapeCodec::new(Quote::Single);
                if numeric::is_numeric_expression(value) {
                    out.push_bytes(value);
                } else if value.iter().any(|&b| codec.alters(b)) {
                    codec.push_quoted(out, value);
                } else {
                    debug!(value = %String::from_utf8_lossy(value), "invalid syntax in variable");
                    out.push(PLACEHOLDER);
                }
            }
        }
    }

    /// Writes an escaped value, wrapped in `'` when outside any quote.
    fn emit_literal(&self, codec: EscapeCodec, quote: Quote, value: &[u8], out: &mut StatementBuffer) {
        if !quote.is_quoted() {
            out.push(b'\'');
        }
        codec.push_all(out, value);
        if !quote.is_quoted() {
            out.push(b'\'');
        }
    }
}
