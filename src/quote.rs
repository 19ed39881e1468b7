use thiserror::Error;

/// Which quote the template scanner is currently inside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Quote {
    #[default]
    None,
    Single,
    Double,
    Backtick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("byte {found:#04x} does not close a {quote:?} quote")]
    NotACloser { quote: Quote, found: u8 },
    #[error("not inside a quote")]
    NotQuoted,
}

impl Quote {
    /// The quote opened by [byte] when seen outside any quote.
    pub fn enter(byte: u8) -> Option<Quote> {
        match byte {
            b'\'' => Some(Quote::Single),
            b'"' => Some(Quote::Double),
            b'`' => Some(Quote::Backtick),
            _ => None,
        }
    }

    /// Leaves the quote when [byte] is its closer.
    pub fn exit(self, byte: u8) -> Result<Quote, QuoteError> {
        match self.closer() {
            None => Err(QuoteError::NotQuoted),
            Some(c) if c == byte => Ok(Quote::None),
            Some(_) => Err(QuoteError::NotACloser {
                quote: self,
                found: byte,
            }),
        }
    }

    #[inline]
    pub fn is_quoted(self) -> bool {
        self != Quote::None
    }

    /// The byte that ends this quote in the template.
    pub fn closer(self) -> Option<u8> {
        match self {
            Quote::None => None,
            Quote::Single => Some(b'\''),
            Quote::Double => Some(b'"'),
            Quote::Backtick => Some(b'`'),
        }
    }

    /// The byte written to the statement for this quote. Double-quoted
    ///  strings always come out single-quoted.
    pub fn canonical(self) -> Option<u8> {
        match self {
            Quote::None => None,
            Quote::Single | Quote::Double => Some(b'\''),
            Quote::Backtick => Some(b'`'),
        }
    }

    /// Quote byte used around list elements: the active quote, except that
    ///  unquoted and double-quoted contexts use `'`.
    pub fn list_quote(self) -> u8 {
        match self {
            Quote::Backtick => b'`',
            _ => b'\'',
        }
    }
}

/// Full scanner state: the active quote plus the modifiers of the variable
///  reference being substituted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteContext {
    pub quote: Quote,
    /// `$#NAME`: the value is a list, split on commas.
    pub hash: bool,
    /// `$,NAME`: the value is a list, split on commas and tabs.
    pub comma: bool,
    /// `$@NAME`: the value is the contents of the file named by NAME.
    pub file: bool,
    /// Unquoted parenthesis nesting. Informational only.
    pub paren_depth: i32,
}

impl QuoteContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn list_mode(&self) -> bool {
        self.hash || self.comma
    }

    /// Clears the per-reference modifiers, keeping the quote and nesting.
    pub fn clear_modifiers(&mut self) {
        self.hash = false;
        self.comma = false;
        self.file = false;
    }

    /// Tracks unquoted parenthesis nesting for a template byte.
    pub fn track_paren(&mut self, byte: u8) {
        if self.quote.is_quoted() {
            return;
        }
        match byte {
            b'(' => self.paren_depth += 1,
            b')' => self.paren_depth -= 1,
            _ => {}
        }
    }
}
