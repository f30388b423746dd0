use std::collections::HashMap;

/// PRCS login to git identity.
pub(crate) struct UserMap {
    map: HashMap<String, UserMapEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UserMapEntry {
    name: String,
    email: String,
}

pub(crate) enum UserMapParseError {
    Io(std::io::Error),
    BadLine(usize, String),
    DuplicateLogin(usize, String),
}

impl From<std::io::Error> for UserMapParseError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl std::fmt::Display for UserMapParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Io(ref e) => e.fmt(f),
            Self::BadLine(line, ref line_data) => {
                write!(f, "bad line {}: \"{}\"", line + 1, line_data.escape_default())
            }
            Self::DuplicateLogin(line, ref login) => {
                write!(f, "login {login:?} mapped again at line {}", line + 1)
            }
        }
    }
}

impl UserMap {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub(crate) fn parse(src: &mut dyn std::io::BufRead) -> Result<Self, UserMapParseError> {
        let mut map = HashMap::new();

        for (line_i, line) in std::io::BufRead::lines(src).enumerate() {
            let line = line?;
            match parse_line(&line) {
                Some(Some((login, entry))) => {
                    if map.contains_key(login) {
                        return Err(UserMapParseError::DuplicateLogin(line_i, login.into()));
                    }
                    map.insert(String::from(login), entry);
                }
                Some(None) => {}
                None => return Err(UserMapParseError::BadLine(line_i, line)),
            }
        }

        Ok(Self { map })
    }

    pub(crate) fn get(&self, login: &str) -> Option<(&str, &str)> {
        self.map
            .get(login)
            .map(|entry| (entry.name.as_str(), entry.email.as_str()))
    }
}

/// `Some(None)` for blank and comment lines, `None` for malformed ones.
fn parse_line(line: &str) -> Option<Option<(&str, UserMapEntry)>> {
    let rem = line.trim();
    if rem.is_empty() || rem.starts_with('#') {
        return Some(None);
    }

    let (login, rem) = rem.split_once('=')?;
    let login = login.trim_end();
    if login.is_empty() || login.contains(char::is_whitespace) {
        return None;
    }

    let (name, rem) = rem.split_once('<')?;
    let (email, rem) = rem.split_once('>')?;
    if !rem.trim().is_empty() || email.contains('<') {
        return None;
    }

    Some(Some((
        login,
        UserMapEntry {
            name: name.trim().into(),
            email: email.into(),
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::{UserMap, UserMapEntry, parse_line};

    fn entry(name: &str, email: &str) -> UserMapEntry {
        UserMapEntry {
            name: name.into(),
            email: email.into(),
        }
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line(" kaz = Kaz Kylheku <kaz@example.com> "),
            Some(Some(("kaz", entry("Kaz Kylheku", "kaz@example.com")))),
        );
        assert_eq!(
            parse_line("kaz=Kaz Kylheku<kaz@example.com>"),
            Some(Some(("kaz", entry("Kaz Kylheku", "kaz@example.com")))),
        );
        assert_eq!(parse_line(""), Some(None));
        assert_eq!(parse_line("   "), Some(None));
        assert_eq!(parse_line("# kaz = Kaz <kaz@example.com>"), Some(None));

        assert_eq!(parse_line("kaz"), None);
        assert_eq!(parse_line("kaz = Kaz"), None);
        assert_eq!(parse_line("= Kaz <kaz@example.com>"), None);
        assert_eq!(parse_line("k z = Kaz <kaz@example.com>"), None);
        assert_eq!(parse_line("kaz = Kaz <kaz@example.com> trailing"), None);
    }

    #[test]
    fn test_parse() {
        let src = "# logins\nkaz = Kaz <kaz@example.com>\n\njoe = Joe User <joe@example.org>\n";
        let Ok(map) = UserMap::parse(&mut src.as_bytes()) else {
            panic!("parse failed");
        };
        assert_eq!(map.get("kaz"), Some(("Kaz", "kaz@example.com")));
        assert_eq!(map.get("joe"), Some(("Joe User", "joe@example.org")));
        assert_eq!(map.get("bob"), None);
    }

    #[test]
    fn test_parse_errors() {
        let src = "kaz = Kaz <kaz@example.com>\nbroken line\n";
        assert!(matches!(
            UserMap::parse(&mut src.as_bytes()),
            Err(super::UserMapParseError::BadLine(1, ref line)) if line == "broken line",
        ));

        let src = "kaz = Kaz <kaz@example.com>\nkaz = Other <other@example.com>\n";
        assert!(matches!(
            UserMap::parse(&mut src.as_bytes()),
            Err(super::UserMapParseError::DuplicateLogin(1, _)),
        ));
    }
}
