/// A byte cursor shared by every hand-written scanner in the crate.
///
/// This type simply holds a reference to the source bytes and an index, so it's
///  cheap to copy, making lookahead/rewind operations very easy: take a copy,
///  try to consume something, and put the copy back if it didn't pan out.
#[derive(Clone, Copy, Debug)]
pub struct Scanner<'input> {
    source: &'input [u8],
    current: usize,
}

impl<'input> Scanner<'input> {
    pub fn new(source: &'input [u8]) -> Self {
        Self { source, current: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Byte index of the next byte to be consumed.
    #[inline]
    pub fn position(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.source.get(self.current).copied()
    }

    #[inline]
    pub fn peek_at(&self, at: usize) -> Option<u8> {
        self.source.get(self.current + at).copied()
    }

    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        let res = self.peek();
        if res.is_some() {
            self.current += 1;
        }
        res
    }

    /// Skips [n] bytes, stopping at the end of the source.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.current = (self.current + n).min(self.source.len());
    }

    #[inline]
    pub fn remaining(&self) -> &'input [u8] {
        &self.source[self.current.min(self.source.len())..]
    }

    /// Source bytes between [start] and the current position.
    #[inline]
    pub fn since(&self, start: usize) -> &'input [u8] {
        &self.source[start..self.current]
    }

    /// If current starts with [prefix], consume it and return true.
    pub fn consume1(&mut self, prefix: u8) -> bool {
        if let Some(c) = self.peek()
            && c == prefix
        {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Like [consume1] but only when another byte follows [prefix]. Signs and
    ///  operators in numeric values must never be the last byte.
    pub fn consume1_followed(&mut self, predicate: impl Fn(u8) -> bool) -> Option<u8> {
        match (self.peek(), self.peek_at(1)) {
            (Some(c), Some(_)) if predicate(c) => {
                self.current += 1;
                Some(c)
            }
            _ => None,
        }
    }

    /// Consumes bytes while [predicate] holds and returns how many were taken.
    #[inline]
    pub fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) -> usize {
        let start = self.current;
        while let Some(c) = self.peek()
            && predicate(c)
        {
            self.current += 1;
        }
        self.current - start
    }

    /// Parses a run of ASCII digits as a decimal number, saturating on
    ///  overflow. Returns `None` when no digit is present.
    pub fn consume_decimal(&mut self) -> Option<usize> {
        let digits = self.consume_while(|b| b.is_ascii_digit());
        if digits == 0 {
            return None;
        }
        Some(
            self.since(self.current - digits)
                .iter()
                .fold(0usize, |n, d| n.saturating_mul(10).saturating_add((d - b'0') as usize)),
        )
    }
}
