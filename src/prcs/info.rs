use std::collections::BTreeMap;

/// One line of `prcs info` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Revision {
    pub(crate) id: String,
    /// Local time, as printed by PRCS.
    pub(crate) date: chrono::NaiveDateTime,
    pub(crate) author: String,
    pub(crate) deleted: bool,
}

pub(crate) struct InfoParser {
    regex: regex_automata::meta::Regex,
}

impl InfoParser {
    pub(crate) fn new() -> Self {
        // project, revision, date, author, deletion marker
        let regex = regex_automata::meta::Regex::new(
            r"^([^ ]+) ([^ ]+) (.+) by ([^ ]+)( \*DELETED\*)?$",
        )
        .expect("invalid info regex");
        Self { regex }
    }

    /// Parses a whole listing. Lines that do not match the expected format
    /// are skipped.
    pub(crate) fn parse(&self, project: &str, output: &str) -> BTreeMap<String, Revision> {
        let mut revisions = BTreeMap::new();
        for line in output.lines() {
            match self.parse_line(line) {
                Some((line_project, rev)) => {
                    if line_project != project {
                        tracing::debug!("skipping revision of project {line_project:?}: {line:?}");
                        continue;
                    }
                    if let Some(prev) = revisions.insert(rev.id.clone(), rev) {
                        tracing::warn!("revision {} listed more than once", prev.id);
                    }
                }
                None => {
                    tracing::debug!("skipping unrecognized info line: {line:?}");
                }
            }
        }
        revisions
    }

    fn parse_line<'a>(&self, line: &'a str) -> Option<(&'a str, Revision)> {
        let line = line.trim_end_matches('\r');
        let mut caps = self.regex.create_captures();
        self.regex.captures(line, &mut caps);
        if !caps.is_match() {
            return None;
        }

        let group = |i: usize| caps.get_group(i).map(|span| &line[span.range()]);

        let project = group(1)?;
        let id = group(2)?;
        let date = parse_date(group(3)?)?;
        let author = group(4)?;
        let deleted = group(5).is_some();

        Some((
            project,
            Revision {
                id: id.into(),
                date,
                author: author.into(),
                deleted,
            },
        ))
    }
}

/// Parses an RFC 2822 style date. Any zone is ignored, the time is
/// interpreted as local time.
pub(crate) fn parse_date(raw: &str) -> Option<chrono::NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(raw) {
        return Some(date.naive_local());
    }

    // Without zone
    let no_weekday = raw.split_once(", ").map_or(raw, |(_, rest)| rest);
    ["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(no_weekday, fmt).ok())
}
