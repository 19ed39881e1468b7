use std::fmt;

/// Growth step for [StatementBuffer]. Statements are built a byte at a time,
///  so capacity is reserved in chunks rather than per push.
pub const CHUNK: usize = 1000;

/// Growable output sink shared by the template expander and the formatter.
///
/// Bytes rather than a `String`: substituted values come from the environment,
///  files and stdin, none of which promise UTF-8. [StatementBuffer::into_string]
///  is the single place where the statement becomes text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatementBuffer {
    bytes: Vec<u8>,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Makes room for [extra] more bytes, growing by at least one chunk.
    #[inline]
    fn ensure(&mut self, extra: usize) {
        if self.bytes.len() + extra > self.bytes.capacity() {
            self.bytes.reserve(extra.max(CHUNK));
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.ensure(1);
        self.bytes.push(byte);
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        self.bytes.extend_from_slice(bytes);
    }

    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// Pushes [byte] [count] times; used for padding.
    pub fn push_repeated(&mut self, byte: u8, count: usize) {
        self.ensure(count);
        self.bytes.resize(self.bytes.len() + count, byte);
    }

    /// Removes and returns the last byte, e.g. a trailing separator left by a
    ///  loop that builds a list.
    pub fn pop(&mut self) -> Option<u8> {
        self.bytes.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Finishes the statement. Invalid UTF-8 coming from a substituted value
    ///  is replaced rather than rejected.
    pub fn into_string(self) -> String {
        match String::from_utf8(self.bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl fmt::Write for StatementBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl fmt::Display for StatementBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn grows_in_chunks() {
        let mut buf = StatementBuffer::new();
        buf.push(b'x');
        assert!(buf.capacity() >= CHUNK);
        let cap = buf.capacity();
        for _ in 1..cap {
            buf.push(b'x');
        }
        assert_eq!(buf.capacity(), cap);
        buf.push(b'y');
        assert!(buf.capacity() >= cap + CHUNK);
    }

    #[test]
    fn pushes_and_pops() {
        let mut buf = StatementBuffer::new();
        buf.push_str("a,b,");
        assert_eq!(buf.pop(), Some(b','));
        buf.push_repeated(b' ', 2);
        write!(buf, "{}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"a,b  42");
        assert_eq!(buf.len(), 7);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn lossy_on_invalid_utf8() {
        let mut buf = StatementBuffer::new();
        buf.push_bytes(b"ok \xff");
        assert_eq!(buf.into_string(), "ok \u{fffd}");
    }
}
