use crate::convert::GitCommitMeta;
use crate::git;
use crate::prcs;
use crate::user_map::UserMap;

/// Used when a revision has no log message. Git accepts empty messages, but
/// most tools handle them badly.
const EMPTY_MESSAGE_PLACEHOLDER: &str = "(no message)";

pub(crate) struct GitMetaMaker<'a> {
    user_map: &'a UserMap,
    jinja_env: minijinja::Environment<'a>,
}

impl<'a> GitMetaMaker<'a> {
    pub(crate) fn new(
        user_map: &'a UserMap,
        user_fallback_template: &'a str,
        commit_msg_template: &'a str,
    ) -> Result<Self, String> {
        let mut jinja_env = minijinja::Environment::empty();
        jinja_env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);

        jinja_env
            .add_template("user_fallback", user_fallback_template)
            .map_err(|e| format!("failed to parse user fallback template: {e}"))?;
        jinja_env
            .add_template("commit_msg", commit_msg_template)
            .map_err(|e| format!("failed to parse commit message template: {e}"))?;

        Ok(Self {
            user_map,
            jinja_env,
        })
    }

    fn render(&self, name: &str, ctx: &JinjaCtx<'_>) -> Result<String, String> {
        let template = self
            .jinja_env
            .get_template(name)
            .map_err(|e| format!("missing template {name:?}: {e}"))?;
        template
            .render(ctx)
            .map_err(|e| format!("failed to render {name} template: {e}"))
    }

    fn convert_author(&self, ctx: &JinjaCtx<'_>) -> Result<(String, String), String> {
        if let Some((name, email)) = self.user_map.get(ctx.prcs_author) {
            return Ok((name.into(), email.into()));
        }

        let author = self.render("user_fallback", ctx)?;
        let Some((name, email)) = split_author_name_email(&author) else {
            return Err(format!(
                "author {author:?} is not in \"name <email>\" format"
            ));
        };
        Ok((name.into(), email.into()))
    }
}

impl crate::convert::GitMetaMaker for GitMetaMaker<'_> {
    fn make_git_commit_meta(
        &self,
        prcs_project: &str,
        prcs_rev: &prcs::Revision,
        prcs_version: (&str, &str),
        prcs_log: &str,
    ) -> Result<GitCommitMeta, String> {
        let (mapped_author_name, mapped_author_email) =
            self.user_map.get(&prcs_rev.author).unwrap_or_default();
        let ctx = JinjaCtx {
            prcs_project,
            prcs_rev: &prcs_rev.id,
            prcs_author: &prcs_rev.author,
            prcs_log,
            prcs_major: prcs_version.0,
            prcs_minor: prcs_version.1,
            mapped_author_name,
            mapped_author_email,
        };

        let (name, email) = self.convert_author(&ctx)?;

        let mut message = self.render("commit_msg", &ctx)?.replace("\r\n", "\n");
        if message.trim().is_empty() {
            message = EMPTY_MESSAGE_PLACEHOLDER.into();
        }

        let time = local_time(&prcs_rev.date, &chrono::Local);
        let signature = git::Signature { name, email, time };

        Ok(GitCommitMeta {
            author: signature.clone(),
            committer: signature,
            message,
        })
    }
}

#[derive(serde::Serialize)]
struct JinjaCtx<'a> {
    prcs_project: &'a str,
    prcs_rev: &'a str,
    prcs_author: &'a str,
    prcs_log: &'a str,
    prcs_major: &'a str,
    prcs_minor: &'a str,
    mapped_author_name: &'a str,
    mapped_author_email: &'a str,
}

fn split_author_name_email(raw: &str) -> Option<(&str, &str)> {
    if raw.contains('\n') {
        return None;
    }

    let (name, rem) = raw.split_once('<')?;
    let email = rem.trim_end_matches(' ').strip_suffix('>')?.trim_matches(' ');

    Some((name.trim_matches(' '), email))
}

/// PRCS prints dates in the local time of the machine that made the
/// listing. Ambiguous times take the earliest instant, nonexistent ones
/// (skipped by a DST jump) are taken as UTC.
fn local_time<Tz: chrono::TimeZone>(
    date: &chrono::NaiveDateTime,
    tz: &Tz,
) -> chrono::DateTime<chrono::FixedOffset> {
    match tz.from_local_datetime(date).earliest() {
        Some(date) => date.fixed_offset(),
        None => date.and_utc().fixed_offset(),
    }
}

#[cfg(test)]
mod tests {
    use super::{GitMetaMaker, local_time, split_author_name_email};
    use crate::convert::GitMetaMaker as _;
    use crate::prcs;
    use crate::user_map::UserMap;

    fn revision(author: &str) -> prcs::Revision {
        prcs::Revision {
            id: "1.2".into(),
            date: chrono::NaiveDate::from_ymd_opt(2013, 2, 4)
                .unwrap()
                .and_hms_opt(21, 19, 32)
                .unwrap(),
            author: author.into(),
            deleted: false,
        }
    }

    fn user_map() -> UserMap {
        let src = "kaz = Kaz Kylheku <kaz@example.com>\n";
        match UserMap::parse(&mut src.as_bytes()) {
            Ok(map) => map,
            Err(e) => panic!("{e}"),
        }
    }

    #[test]
    fn test_mapped_author() {
        let user_map = user_map();
        let maker =
            GitMetaMaker::new(&user_map, "{{ prcs_author }} <{{ prcs_author }}>", "{{ prcs_log }}")
                .unwrap();

        let meta = maker
            .make_git_commit_meta("demo", &revision("kaz"), ("1", "2"), "Fix the frobnicator.")
            .unwrap();
        assert_eq!(meta.author.name, "Kaz Kylheku");
        assert_eq!(meta.author.email, "kaz@example.com");
        assert_eq!(meta.committer.name, "Kaz Kylheku");
        assert_eq!(meta.message, "Fix the frobnicator.");
        assert_eq!(meta.author.time, meta.committer.time);
    }

    #[test]
    fn test_fallback_author() {
        let user_map = user_map();
        let maker = GitMetaMaker::new(
            &user_map,
            "{{ prcs_author }} <{{ prcs_author }}@{{ prcs_project }}.invalid>",
            "{{ prcs_log }}\n\n[{{ prcs_project }} {{ prcs_major }}.{{ prcs_minor }}]",
        )
        .unwrap();

        let meta = maker
            .make_git_commit_meta("demo", &revision("joe"), ("1", "2"), "Initial import")
            .unwrap();
        assert_eq!(meta.author.name, "joe");
        assert_eq!(meta.author.email, "joe@demo.invalid");
        assert_eq!(meta.message, "Initial import\n\n[demo 1.2]");
    }

    #[test]
    fn test_empty_message() {
        let user_map = UserMap::new();
        let maker =
            GitMetaMaker::new(&user_map, "{{ prcs_author }} <{{ prcs_author }}>", "{{ prcs_log }}")
                .unwrap();

        let meta = maker
            .make_git_commit_meta("demo", &revision("kaz"), ("1", "2"), "")
            .unwrap();
        assert_eq!(meta.message, "(no message)");
        assert_eq!(meta.author.name, "kaz");
        assert_eq!(meta.author.email, "kaz");

        let meta = maker
            .make_git_commit_meta("demo", &revision("kaz"), ("1", "2"), " \n\n")
            .unwrap();
        assert_eq!(meta.message, "(no message)");
    }

    #[test]
    fn test_bad_templates() {
        let user_map = UserMap::new();
        assert!(GitMetaMaker::new(&user_map, "{{ prcs_author", "{{ prcs_log }}").is_err());

        let maker = GitMetaMaker::new(&user_map, "{{ prcs_author }}", "{{ prcs_log }}").unwrap();
        assert!(
            maker
                .make_git_commit_meta("demo", &revision("kaz"), ("1", "2"), "x")
                .is_err()
        );

        let maker = GitMetaMaker::new(
            &user_map,
            "{{ prcs_author }} <{{ prcs_author }}>",
            "{{ prcs_comment }}",
        )
        .unwrap();
        assert!(
            maker
                .make_git_commit_meta("demo", &revision("kaz"), ("1", "2"), "x")
                .is_err()
        );
    }

    #[test]
    fn test_split_author_name_email() {
        assert_eq!(
            split_author_name_email("Kaz Kylheku <kaz@example.com>"),
            Some(("Kaz Kylheku", "kaz@example.com")),
        );
        assert_eq!(split_author_name_email("kaz <kaz>"), Some(("kaz", "kaz")));
        assert_eq!(split_author_name_email("kaz"), None);
        assert_eq!(split_author_name_email("kaz <kaz"), None);
        assert_eq!(split_author_name_email("kaz\n<kaz>"), None);
    }

    #[test]
    fn test_local_time() {
        let date = revision("kaz").date;

        let tz = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        let time = local_time(&date, &tz);
        assert_eq!(time.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(time.naive_local(), date);
        assert_eq!(time.timestamp(), date.and_utc().timestamp() + 5 * 3600);

        let time = local_time(&date, &chrono::Utc);
        assert_eq!(time.offset().local_minus_utc(), 0);
        assert_eq!(time.timestamp(), date.and_utc().timestamp());
    }
}
