//! The one place unquoted substituted text reaches a statement: simple numbers
//!  and arithmetic on them, so `$LIMIT` or `$PRICE*1.2` work unquoted.
//!
//! Accepted: groups of an optional `+`, `-` or `(`, a decimal number with an
//!  optional fraction, an exponent only after a `.`, any number of `)`, then spaces and one
//!  optional `+ - * /`. Signs, opening parens and operators are only taken
//!  when more input follows. The whole value must be consumed, parens must
//!  balance and at least one digit must appear.
//!
//! Do not widen this without re-checking that nothing but numbers, parens and
//!  arithmetic can get through.

use crate::scan::Scanner;

#[inline]
fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

fn consume_exponent(s: &mut Scanner) {
    let mark = *s;
    if s.consume1(b'e') || s.consume1(b'E') {
        if !s.consume1(b'+') {
            s.consume1(b'-');
        }
        if s.consume_while(is_digit) == 0 {
            *s = mark;
        }
    }
}

pub fn is_numeric_expression(value: &[u8]) -> bool {
    let mut s = Scanner::new(value);
    let mut depth = 0i32;
    let mut digits = false;

    while !s.is_empty() {
        if s.consume1_followed(|b| matches!(b, b'+' | b'-' | b'(')) == Some(b'(') {
            depth += 1;
        }
        match s.peek() {
            Some(b) if is_digit(b) || b == b'.' => {}
            _ => break,
        }

        digits |= s.consume_while(is_digit) > 0;
        if s.consume1(b'.') {
            digits |= s.consume_while(is_digit) > 0;
            consume_exponent(&mut s);
        }

        while s.consume1(b')') {
            depth -= 1;
        }
        s.consume_while(|b| b == b' ');
        s.consume1_followed(|b| matches!(b, b'*' | b'/' | b'+' | b'-'));
        s.consume_while(|b| b == b' ');
    }

    s.is_empty() && depth == 0 && digits
}
