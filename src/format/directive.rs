use crate::scan::Scanner;

/// Directives whose text (from `%` up to the conversion letter) is longer
///  than this are written out verbatim.
pub const MAX_DIRECTIVE_LEN: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// `#`: SQL quoting for text, C alternate form for numbers.
    pub alt: bool,
    /// `!`: release the argument once it has been written.
    pub free_after_use: bool,
    /// `-`
    pub left_align: bool,
    /// Width written with a leading `0`.
    pub zero_pad: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Count {
    #[default]
    Unset,
    Literal(usize),
    /// `*`: taken from the next argument.
    FromArg,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Length {
    #[default]
    None,
    /// `hh`
    Char,
    /// `h`
    Short,
    /// `l`
    Long,
    /// `ll`
    LongLong,
    /// `L`
    LongDouble,
    /// `q`, `j`, `z` and `t`: all 64 bits wide here.
    Wide,
}

impl Length {
    /// Bits an integer argument is truncated to.
    pub fn int_bits(self) -> u32 {
        match self {
            Length::None => 32,
            Length::Char => 8,
            Length::Short => 16,
            Length::Long | Length::LongLong | Length::LongDouble | Length::Wide => 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// `d` `i`
    Int,
    /// `o` `u` `x` `X`
    Unsigned(u8),
    /// `e` `E` `f` `F` `g` `G` `a` `A`
    Float(u8),
    /// `p`
    Pointer,
    /// `m`
    OsError,
    /// `C`
    WideChar,
    /// `c`
    Char,
    /// `s` quoted with `#`, `S` escaped only.
    Text { wrap: bool },
    /// `T`
    DateTimeLocal,
    /// `U` `Z`
    DateTimeUtc,
    /// `B`
    Bool,
}

impl Conversion {
    fn from_byte(b: u8) -> Option<Conversion> {
        Some(match b {
            b'd' | b'i' => Conversion::Int,
            b'o' | b'u' | b'x' | b'X' => Conversion::Unsigned(b),
            b'e' | b'E' | b'f' | b'F' | b'g' | b'G' | b'a' | b'A' => Conversion::Float(b),
            b'p' => Conversion::Pointer,
            b'm' => Conversion::OsError,
            b'C' => Conversion::WideChar,
            b'c' => Conversion::Char,
            b's' => Conversion::Text { wrap: true },
            b'S' => Conversion::Text { wrap: false },
            b'T' => Conversion::DateTimeLocal,
            b'U' | b'Z' => Conversion::DateTimeUtc,
            b'B' => Conversion::Bool,
            _ => return None,
        })
    }

    /// Whether the conversion takes an argument of its own.
    pub fn takes_argument(self) -> bool {
        self != Conversion::OsError
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub flags: Flags,
    pub width: Count,
    pub precision: Count,
    pub length: Length,
    pub conversion: Conversion,
    /// The conversion letter as written.
    pub letter: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed<'a> {
    Directive(Directive),
    /// `%%`, possibly with flags or a width in between.
    Percent,
    /// Not something we can format. The text is written as-is and the scanner
    ///  is left on the byte that ended it.
    Verbatim(&'a [u8]),
}

/// Parses the directive at the `%` under the cursor.
pub fn parse<'a>(s: &mut Scanner<'a>) -> Parsed<'a> {
    let start = s.position();
    s.advance(1);

    let mut flags = Flags::default();
    loop {
        if s.consume1(b'!') {
            flags.free_after_use = true;
        } else if s.consume1(b'#') {
            flags.alt = true;
        } else if s.consume1(b'-') {
            flags.left_align = true;
        } else {
            break;
        }
    }

    let width = if s.consume1(b'*') {
        Count::FromArg
    } else {
        flags.zero_pad = s.peek() == Some(b'0');
        match s.consume_decimal() {
            Some(0) | None => Count::Unset,
            Some(n) => Count::Literal(n),
        }
    };

    let precision = if s.consume1(b'.') {
        if s.consume1(b'*') {
            Count::FromArg
        } else {
            Count::Literal(s.consume_decimal().unwrap_or(0))
        }
    } else {
        Count::Unset
    };

    let length = match (s.peek(), s.peek_at(1)) {
        (Some(b'h'), Some(b'h')) => {
            s.advance(2);
            Length::Char
        }
        (Some(b'l'), Some(b'l')) => {
            s.advance(2);
            Length::LongLong
        }
        (Some(b'h'), _) => {
            s.advance(1);
            Length::Short
        }
        (Some(b'l'), _) => {
            s.advance(1);
            Length::Long
        }
        (Some(b'L'), _) => {
            s.advance(1);
            Length::LongDouble
        }
        (Some(b'q' | b'j' | b'z' | b't'), _) => {
            s.advance(1);
            Length::Wide
        }
        _ => Length::None,
    };

    if s.consume1(b'%') {
        return Parsed::Percent;
    }

    let text_len = s.position() - start;
    match s.peek().and_then(Conversion::from_byte) {
        Some(conversion) if text_len <= MAX_DIRECTIVE_LEN => {
            let letter = s.pop().unwrap_or_default();
            Parsed::Directive(Directive {
                flags,
                width,
                precision,
                length,
                conversion,
                letter,
            })
        }
        _ => Parsed::Verbatim(s.since(start)),
    }
}
