use std::borrow::Cow;

use chrono::{DateTime, TimeZone};

/// One typed formatter argument. Arguments are consumed left to right, one
///  per directive plus one per `*` width or precision.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg<'a> {
    Int(i64),
    UInt(u64),
    Float(f64),
    /// `None` is SQL `NULL`.
    Text(Option<Cow<'a, str>>),
    Char(char),
    /// Seconds since the epoch. `0` is the zero date.
    Timestamp(i64),
    Bool(bool),
    Pointer(usize),
}

impl Arg<'_> {
    pub fn null() -> Self {
        Arg::Text(None)
    }

    /// Name of the variant, for mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Int(_) => "int",
            Arg::UInt(_) => "uint",
            Arg::Float(_) => "float",
            Arg::Text(Some(_)) => "text",
            Arg::Text(None) => "null",
            Arg::Char(_) => "char",
            Arg::Timestamp(_) => "timestamp",
            Arg::Bool(_) => "bool",
            Arg::Pointer(_) => "pointer",
        }
    }

    /// The argument as a C `long long`, for integer conversions.
    pub(crate) fn as_integer(&self) -> Option<i64> {
        match *self {
            Arg::Int(v) | Arg::Timestamp(v) => Some(v),
            Arg::UInt(v) => Some(v as i64),
            Arg::Char(c) => Some(c as i64),
            Arg::Bool(b) => Some(b as i64),
            Arg::Pointer(p) => Some(p as i64),
            _ => None,
        }
    }

    pub(crate) fn as_float(&self) -> Option<f64> {
        match *self {
            Arg::Float(v) => Some(v),
            Arg::Int(v) => Some(v as f64),
            Arg::UInt(v) => Some(v as f64),
            _ => None,
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg<'_> {
            fn from(v: $t) -> Self {
                Arg::Int(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Arg<'_> {
            fn from(v: $t) -> Self {
                Arg::UInt(v as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Arg<'_> {
    fn from(v: f32) -> Self {
        Arg::Float(v as f64)
    }
}

impl From<f64> for Arg<'_> {
    fn from(v: f64) -> Self {
        Arg::Float(v)
    }
}

impl From<bool> for Arg<'_> {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

impl From<char> for Arg<'_> {
    fn from(v: char) -> Self {
        Arg::Char(v)
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(v: &'a str) -> Self {
        Arg::Text(Some(Cow::Borrowed(v)))
    }
}

impl From<String> for Arg<'_> {
    fn from(v: String) -> Self {
        Arg::Text(Some(Cow::Owned(v)))
    }
}

impl<'a, T> From<Option<T>> for Arg<'a>
where
    T: Into<Cow<'a, str>>,
{
    fn from(v: Option<T>) -> Self {
        Arg::Text(v.map(Into::into))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Arg<'_> {
    fn from(v: DateTime<Tz>) -> Self {
        Arg::Timestamp(v.timestamp())
    }
}
