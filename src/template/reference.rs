use crate::scan::Scanner;

/// One `$` construct in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `$$`
    Dollar,
    /// `$-`
    Stdin,
    /// `$NAME`, `${NAME}` with any of the `#`, `,` and `@` prefixes.
    Variable {
        name: &'a str,
        hash: bool,
        comma: bool,
        file: bool,
        braced: bool,
    },
}

/// A reference together with the template text it was parsed from, which is
///  written back unchanged when the variable has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub reference: Reference<'a>,
    pub source: &'a [u8],
}

#[inline]
fn is_name_continuation(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Parses the reference starting at the `$` under the cursor. On success the
///  scanner is left after the reference; otherwise it is not moved and the `$`
///  is an ordinary byte.
pub fn parse<'a>(scanner: &mut Scanner<'a>) -> Option<Token<'a>> {
    let mut s = *scanner;
    let start = s.position();
    if !s.consume1(b'$') {
        return None;
    }

    let reference = if s.consume1(b'$') {
        Reference::Dollar
    } else if s.consume1(b'-') {
        Reference::Stdin
    } else {
        let (mut hash, mut comma, mut file) = (false, false, false);
        loop {
            if s.consume1(b'#') {
                hash = true;
            } else if s.consume1(b',') {
                comma = true;
            } else if s.consume1(b'@') {
                file = true;
            } else {
                break;
            }
        }

        let braced = s.peek() == Some(b'{') && s.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic());
        let name = if braced {
            s.advance(1);
            let name_start = s.position();
            s.consume_while(|b| b != b'}');
            let name = s.since(name_start);
            // No closing brace: not a reference at all
            if !s.consume1(b'}') {
                return None;
            }
            name
        } else if s.peek().is_some_and(|b| b.is_ascii_alphabetic()) {
            let name_start = s.position();
            s.consume_while(is_name_continuation);
            s.since(name_start)
        } else {
            return None;
        };

        Reference::Variable {
            name: std::str::from_utf8(name).ok()?,
            hash,
            comma,
            file,
            braced,
        }
    };

    let source = s.since(start);
    *scanner = s;
    Some(Token { reference, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str) -> (Option<Token<'_>>, usize) {
        let mut s = Scanner::new(text.as_bytes());
        let token = parse(&mut s);
        (token, s.position())
    }

    fn var(name: &str, hash: bool, comma: bool, file: bool, braced: bool) -> Reference<'_> {
        Reference::Variable {
            name,
            hash,
            comma,
            file,
            braced,
        }
    }

    #[test]
    fn specials() {
        let (token, at) = parse_str("$$x");
        assert_eq!(token.unwrap().reference, Reference::Dollar);
        assert_eq!(at, 2);

        let (token, at) = parse_str("$-");
        assert_eq!(token.unwrap().reference, Reference::Stdin);
        assert_eq!(at, 2);
    }

    #[test]
    fn bare_names() {
        let (token, at) = parse_str("$NAME_1 rest");
        let token = token.unwrap();
        assert_eq!(token.reference, var("NAME_1", false, false, false, false));
        assert_eq!(token.source, b"$NAME_1");
        assert_eq!(at, 7);

        // Names must start with a letter
        assert_eq!(parse_str("$1abc").0, None);
        assert_eq!(parse_str("$_abc").0, None);
        assert_eq!(parse_str("$").0, None);
    }

    #[test]
    fn braced_names() {
        let (token, at) = parse_str("${NAME}suffix");
        let token = token.unwrap();
        assert_eq!(token.reference, var("NAME", false, false, false, true));
        assert_eq!(token.source, b"${NAME}");
        assert_eq!(at, 7);

        let (token, _) = parse_str("${A B}");
        assert_eq!(token.unwrap().reference, var("A B", false, false, false, true));

        // Unterminated or not starting with a letter
        assert_eq!(parse_str("${NAME").0, None);
        assert_eq!(parse_str("${1}").0, None);
    }

    #[test]
    fn prefixes_in_any_order() {
        for text in ["$#,@F", "$@,#F", "$,#@F", "$#@,F"] {
            let (token, _) = parse_str(text);
            assert_eq!(token.unwrap().reference, var("F", true, true, true, false), "{text}");
        }
        let (token, _) = parse_str("$#{LIST}");
        assert_eq!(token.unwrap().reference, var("LIST", true, false, false, true));
        let (token, _) = parse_str("$,LIST");
        assert_eq!(token.unwrap().reference, var("LIST", false, true, false, false));

        // Prefixes without a name are not a reference
        let (token, at) = parse_str("$#,");
        assert_eq!(token, None);
        assert_eq!(at, 0);
    }
}
