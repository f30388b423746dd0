// Minimal s-expression reader for PRCS project descriptors.
//
// Atoms are symbols, strings or numbers. Numbers keep their raw text, so
// version-like atoms such as `1.10` are never confused with `1.1`.

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Value {
    Symbol(String),
    String(String),
    Number(String),
    List(Vec<Value>),
}

impl Value {
    /// Textual content of an atom, `None` for lists.
    pub(crate) fn as_text(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) | Self::String(s) | Self::Number(s) => Some(s),
            Self::List(_) => None,
        }
    }

    pub(crate) fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ParseError {
    UnterminatedString { line: usize },
    UnexpectedClose { line: usize },
    UnexpectedEof,
    TrailingData { line: usize },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::UnterminatedString { line } => {
                write!(f, "unterminated string starting at line {line}")
            }
            Self::UnexpectedClose { line } => write!(f, "unexpected ')' at line {line}"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::TrailingData { line } => write!(f, "trailing data at line {line}"),
        }
    }
}

/// Parses exactly one value from `src`. Only whitespace and comments may
/// follow it.
pub(crate) fn parse(src: &str) -> Result<Value, ParseError> {
    let mut reader = Reader {
        chars: src.chars().peekable(),
        line: 1,
    };

    let value = reader.read_value()?.ok_or(ParseError::UnexpectedEof)?;
    reader.skip_blank();
    if reader.chars.peek().is_some() {
        return Err(ParseError::TrailingData { line: reader.line });
    }
    Ok(value)
}

struct Reader<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl Reader<'_> {
    fn bump(&mut self) -> Option<char> {
        let chr = self.chars.next();
        if chr == Some('\n') {
            self.line += 1;
        }
        chr
    }

    fn skip_blank(&mut self) {
        while let Some(&chr) = self.chars.peek() {
            if chr == ';' {
                while self.bump().is_some_and(|c| c != '\n') {}
            } else if chr.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    // Returns `None` at end of input.
    fn read_value(&mut self) -> Result<Option<Value>, ParseError> {
        self.skip_blank();
        let Some(&chr) = self.chars.peek() else {
            return Ok(None);
        };

        match chr {
            '(' => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    self.skip_blank();
                    match self.chars.peek() {
                        None => return Err(ParseError::UnexpectedEof),
                        Some(')') => {
                            self.bump();
                            return Ok(Some(Value::List(items)));
                        }
                        Some(_) => {
                            let item = self.read_value()?.ok_or(ParseError::UnexpectedEof)?;
                            items.push(item);
                        }
                    }
                }
            }
            ')' => Err(ParseError::UnexpectedClose { line: self.line }),
            '"' => {
                let start_line = self.line;
                self.bump();
                let mut s = String::new();
                loop {
                    match self.bump() {
                        None => return Err(ParseError::UnterminatedString { line: start_line }),
                        Some('"') => break,
                        // PRCS only escapes quotes and backslashes
                        Some('\\') => match self.bump() {
                            None => {
                                return Err(ParseError::UnterminatedString { line: start_line });
                            }
                            Some(escaped) => s.push(escaped),
                        },
                        Some(c) => s.push(c),
                    }
                }
                Ok(Some(Value::String(s)))
            }
            _ => {
                let mut token = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';') {
                        break;
                    }
                    token.push(c);
                    self.bump();
                }
                if is_number(&token) {
                    Ok(Some(Value::Number(token)))
                } else {
                    Ok(Some(Value::Symbol(token)))
                }
            }
        }
    }
}

fn is_number(token: &str) -> bool {
    let digits = token
        .strip_prefix('-')
        .or_else(|| token.strip_prefix('+'))
        .unwrap_or(token);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for chr in digits.chars() {
        match chr {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

#[cfg(test)]
mod tests {
    use super::{ParseError, Value, parse};

    fn sym(s: &str) -> Value {
        Value::Symbol(s.into())
    }

    fn num(s: &str) -> Value {
        Value::Number(s.into())
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            parse("(Files (a.c (P/0_a.c 1.1 644)) (b.c ()))").unwrap(),
            Value::List(vec![
                sym("Files"),
                Value::List(vec![
                    sym("a.c"),
                    Value::List(vec![sym("P/0_a.c"), num("1.1"), num("644")]),
                ]),
                Value::List(vec![sym("b.c"), Value::List(vec![])]),
            ]),
        );
    }

    #[test]
    fn test_numbers_keep_raw_text() {
        let value = parse("(1.10 1.1 -3 +4 1.2.3 -*- .)").unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                num("1.10"),
                num("1.1"),
                num("-3"),
                num("+4"),
                sym("1.2.3"),
                sym("-*-"),
                sym("."),
            ]),
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            parse(r#"("say \"hi\"" "back\\slash" "two
lines" "")"#)
            .unwrap(),
            Value::List(vec![
                Value::String("say \"hi\"".into()),
                Value::String("back\\slash".into()),
                Value::String("two\nlines".into()),
                Value::String(String::new()),
            ]),
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            parse(";; -*- Prcs -*-\n(a ; trailing ( comment\n b)\n; end").unwrap(),
            Value::List(vec![sym("a"), sym("b")]),
        );
    }

    #[test]
    fn test_adjacent_tokens() {
        assert_eq!(
            parse(r#"(a"b"(c)d)"#).unwrap(),
            Value::List(vec![
                sym("a"),
                Value::String("b".into()),
                Value::List(vec![sym("c")]),
                sym("d"),
            ]),
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("(a\n\"open"),
            Err(ParseError::UnterminatedString { line: 2 }),
        );
        assert_eq!(parse("(a (b)"), Err(ParseError::UnexpectedEof));
        assert_eq!(parse(""), Err(ParseError::UnexpectedEof));
        assert_eq!(parse(")"), Err(ParseError::UnexpectedClose { line: 1 }));
        assert_eq!(parse("(a)\n)"), Err(ParseError::TrailingData { line: 2 }));
    }
}
