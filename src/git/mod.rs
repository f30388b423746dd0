use std::io::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub(crate) enum GitError {
    Spawn {
        error: std::io::Error,
    },
    Io {
        args: Vec<String>,
        error: std::io::Error,
    },
    Failed {
        args: Vec<String>,
        status: std::process::ExitStatus,
        stderr: String,
    },
    BadOutput {
        args: Vec<String>,
        output: String,
    },
    NoBranch,
    CreateDir {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { error } => write!(f, "failed to spawn process \"git\": {error}"),
            Self::Io { args, error } => {
                write!(f, "failed to communicate with \"git {}\": {error}", args.join(" "))
            }
            Self::Failed {
                args,
                status,
                stderr,
            } => {
                write!(f, "\"git {}\" finished with {status}", args.join(" "))?;
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr.trim_end())?;
                }
                Ok(())
            }
            Self::BadOutput { args, output } => {
                write!(f, "unexpected output from \"git {}\": {output:?}", args.join(" "))
            }
            Self::NoBranch => write!(f, "no branch selected for commit"),
            Self::CreateDir { path, error } => {
                write!(f, "failed to create directory {path:?}: {error}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Signature {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) time: chrono::DateTime<chrono::FixedOffset>,
}

impl Signature {
    fn git_date(&self) -> String {
        format!("{} {}", self.time.timestamp(), self.time.format("%z"))
    }
}

/// A non-bare git repository whose work tree and index are used to stage
/// each commit.
///
/// Commits are created with plumbing commands, so `HEAD` is not touched
/// until [`WorkTree::set_head`]. The index always mirrors `base`.
pub(crate) struct WorkTree {
    path: PathBuf,
    base: Option<gix_hash::ObjectId>,
    branch: Option<String>,
}

impl WorkTree {
    /// Opens the repository at `path`, creating it if it does not exist.
    pub(crate) fn open_or_init(path: &Path) -> Result<Self, GitError> {
        let work_tree = Self {
            path: path.to_path_buf(),
            base: None,
            branch: None,
        };

        if !path.join(".git").exists() {
            std::fs::create_dir_all(path).map_err(|e| GitError::CreateDir {
                path: path.to_path_buf(),
                error: e,
            })?;
            tracing::info!("initializing git repository at {path:?}");
            work_tree.run(&["init", "-q"], None, &[])?;
        }

        Ok(work_tree)
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn run(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
        envs: &[(&str, &str)],
    ) -> Result<String, GitError> {
        let args_vec = || args.iter().map(|&s| String::from(s)).collect::<Vec<_>>();

        tracing::trace!("running git {}", args.join(" "));

        let mut child = std::process::Command::new("git")
            .args(args)
            .env("GIT_LITERAL_PATHSPECS", "1")
            .envs(envs.iter().copied())
            .current_dir(&self.path)
            .stdin(if stdin.is_some() {
                std::process::Stdio::piped()
            } else {
                std::process::Stdio::null()
            })
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| GitError::Spawn { error: e })?;

        if let Some(input) = stdin {
            if let Some(mut child_stdin) = child.stdin.take() {
                child_stdin.write_all(input).map_err(|e| GitError::Io {
                    args: args_vec(),
                    error: e,
                })?;
            }
        }

        let output = child.wait_with_output().map_err(|e| GitError::Io {
            args: args_vec(),
            error: e,
        })?;
        if !output.status.success() {
            return Err(GitError::Failed {
                args: args_vec(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_for_oid(
        &self,
        args: &[&str],
        stdin: Option<&[u8]>,
        envs: &[(&str, &str)],
    ) -> Result<gix_hash::ObjectId, GitError> {
        let output = self.run(args, stdin, envs)?;
        gix_hash::ObjectId::from_hex(output.trim().as_bytes()).map_err(|_| GitError::BadOutput {
            args: args.iter().map(|&s| String::from(s)).collect(),
            output,
        })
    }

    /// Makes index and work tree match `commit`, or the empty tree when
    /// `commit` is `None`. Untracked files are left alone.
    pub(crate) fn update(&mut self, commit: Option<gix_hash::ObjectId>) -> Result<(), GitError> {
        match commit {
            Some(commit) => {
                let hex = commit.to_string();
                self.run(&["read-tree", "--reset", "-u", hex.as_str()], None, &[])?;
            }
            None => {
                // Drop the index first so that previously tracked files
                // become untracked and can be cleaned.
                self.run(&["read-tree", "--empty"], None, &[])?;
                self.run(&["clean", "-ffdxq"], None, &[])?;
            }
        }
        self.base = commit;
        Ok(())
    }

    /// Paths that differ from the index: modified, deleted or untracked.
    pub(crate) fn status(&self) -> Result<Vec<String>, GitError> {
        let output = self.run(
            &["ls-files", "-z", "--others", "--modified", "--deleted"],
            None,
            &[],
        )?;
        let mut paths: Vec<String> = output
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect();
        paths.sort_unstable();
        paths.dedup();
        Ok(paths)
    }

    /// Discards every change to the work tree, including untracked files.
    pub(crate) fn revert_all(&self) -> Result<(), GitError> {
        self.run(&["checkout-index", "-a", "-f"], None, &[])?;
        self.run(&["clean", "-ffdxq"], None, &[])?;
        Ok(())
    }

    /// Records that each `(old path, new path)` was moved in the work tree.
    ///
    /// Git has no explicit rename records, renames are detected from the
    /// staged removals and additions. All old paths are unstaged before any
    /// new path is staged, so a path may be both the source of one rename
    /// and the target of another.
    pub(crate) fn rename(&self, renames: &[(&str, &str)]) -> Result<(), GitError> {
        if renames.is_empty() {
            return Ok(());
        }

        let mut pathspec = Vec::new();
        for (old_path, _) in renames {
            pathspec.extend(old_path.as_bytes());
            pathspec.push(0);
        }
        self.run(
            &[
                "rm",
                "-q",
                "--cached",
                "--ignore-unmatch",
                "--pathspec-from-file=-",
                "--pathspec-file-nul",
            ],
            Some(&pathspec),
            &[],
        )?;

        let new_paths: Vec<&str> = renames.iter().map(|&(_, new_path)| new_path).collect();
        self.add(&new_paths)
    }

    pub(crate) fn add(&self, paths: &[&str]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }

        let mut pathspec = Vec::new();
        for path in paths {
            pathspec.extend(path.as_bytes());
            pathspec.push(0);
        }
        self.run(
            &[
                "add",
                "-f",
                "--pathspec-from-file=-",
                "--pathspec-file-nul",
            ],
            Some(&pathspec),
            &[],
        )?;
        Ok(())
    }

    /// Selects the branch that the next commit will be created on. The
    /// branch is created or moved as needed.
    pub(crate) fn set_branch(&mut self, name: &str) {
        self.branch = Some(name.into());
    }

    /// Commits the work tree on top of the current base and moves the
    /// selected branch to the new commit.
    pub(crate) fn commit(
        &mut self,
        author: &Signature,
        committer: &Signature,
        message: &str,
    ) -> Result<gix_hash::ObjectId, GitError> {
        let branch = self.branch.clone().ok_or(GitError::NoBranch)?;

        // Modified and removed tracked files
        self.run(&["add", "-u"], None, &[])?;
        let tree = self.run_for_oid(&["write-tree"], None, &[])?;

        let tree_hex = tree.to_string();
        let base_hex = self.base.map(|base| base.to_string());
        let mut args = vec!["commit-tree", tree_hex.as_str()];
        if let Some(ref base_hex) = base_hex {
            args.push("-p");
            args.push(base_hex.as_str());
        }

        let author_date = author.git_date();
        let committer_date = committer.git_date();
        let envs = [
            ("GIT_AUTHOR_NAME", author.name.as_str()),
            ("GIT_AUTHOR_EMAIL", author.email.as_str()),
            ("GIT_AUTHOR_DATE", author_date.as_str()),
            ("GIT_COMMITTER_NAME", committer.name.as_str()),
            ("GIT_COMMITTER_EMAIL", committer.email.as_str()),
            ("GIT_COMMITTER_DATE", committer_date.as_str()),
        ];
        let commit = self.run_for_oid(&args, Some(message.as_bytes()), &envs)?;

        let ref_name = format!("refs/heads/{branch}");
        let commit_hex = commit.to_string();
        self.run(&["update-ref", ref_name.as_str(), commit_hex.as_str()], None, &[])?;

        self.base = Some(commit);
        Ok(commit)
    }

    /// Creates or overwrites a lightweight tag.
    pub(crate) fn tag(&self, name: &str, commit: gix_hash::ObjectId) -> Result<(), GitError> {
        let ref_name = format!("refs/tags/{name}");
        let commit_hex = commit.to_string();
        self.run(&["update-ref", ref_name.as_str(), commit_hex.as_str()], None, &[])?;
        Ok(())
    }

    /// Points `HEAD` to `branch` and checks it out.
    pub(crate) fn set_head(&mut self, branch: &str) -> Result<(), GitError> {
        let ref_name = format!("refs/heads/{branch}");
        self.run(&["symbolic-ref", "HEAD", ref_name.as_str()], None, &[])?;
        self.run(&["read-tree", "--reset", "-u", "HEAD"], None, &[])?;
        self.run(&["clean", "-ffdxq"], None, &[])?;
        Ok(())
    }
}

/// Replaces characters and sequences that are not allowed in git ref names.
pub(crate) fn legalize_ref_name(raw_name: &str) -> String {
    fn fix_component_end(name: &mut String) {
        if let Some(stem) = name.strip_suffix(".lock") {
            let len = stem.len();
            name.truncate(len);
            name.push_str("_lock");
        } else if name.ends_with('.') {
            name.pop();
            name.push('_');
        }
    }

    let mut legal_name = String::with_capacity(raw_name.len());
    for chr in raw_name.chars() {
        if chr == '/' {
            if !legal_name.is_empty() && !legal_name.ends_with('/') {
                fix_component_end(&mut legal_name);
                legal_name.push('/');
            }
            continue;
        }

        let at_component_start = legal_name.is_empty() || legal_name.ends_with('/');
        let replace = matches!(
            chr,
            '\0'..=' ' | '*' | ':' | '?' | '[' | '\\' | '^' | '~' | '\u{7f}'
        ) || (chr == '.' && (at_component_start || legal_name.ends_with('.')))
            || (chr == '{' && legal_name.ends_with('@'))
            || (chr == '-' && legal_name.is_empty());

        legal_name.push(if replace { '_' } else { chr });
    }

    if legal_name.ends_with('/') {
        legal_name.pop();
    }
    fix_component_end(&mut legal_name);
    if legal_name.is_empty() || legal_name == "@" {
        legal_name = String::from("_");
    }

    legal_name
}

#[cfg(test)]
mod tests {
    use super::{Signature, WorkTree, legalize_ref_name};

    fn have_git() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|output| output.status.success())
    }

    fn temp_repo_path() -> std::path::PathBuf {
        use rand::RngExt as _;

        std::env::temp_dir().join(format!(
            "prcs2git-git-test-{:08x}",
            rand::rng().random::<u32>(),
        ))
    }

    #[test]
    fn test_rename_swapped_paths() {
        if !have_git() {
            return;
        }

        let path = temp_repo_path();
        let mut work_tree = WorkTree::open_or_init(&path).unwrap();
        let signature = Signature {
            name: "Kaz Kylheku".into(),
            email: "kaz@example.com".into(),
            time: chrono::DateTime::from_timestamp(1359806400, 0)
                .unwrap()
                .fixed_offset(),
        };

        work_tree.update(None).unwrap();
        std::fs::write(path.join("a"), "A\n").unwrap();
        std::fs::write(path.join("b"), "B\n").unwrap();
        work_tree.add(&["a", "b"]).unwrap();
        work_tree.set_branch("master");
        work_tree.commit(&signature, &signature, "first").unwrap();

        // Both files keep their identity but trade paths
        std::fs::write(path.join("a"), "B\n").unwrap();
        std::fs::write(path.join("b"), "A\n").unwrap();
        work_tree.rename(&[("b", "a"), ("a", "b")]).unwrap();
        let commit = work_tree
            .commit(&signature, &signature, "second")
            .unwrap()
            .to_string();

        let listing = work_tree
            .run(&["ls-tree", "-r", "--name-only", commit.as_str()], None, &[])
            .unwrap();
        assert_eq!(listing, "a\nb\n");
        let a_spec = format!("{commit}:a");
        let b_spec = format!("{commit}:b");
        assert_eq!(work_tree.run(&["show", a_spec.as_str()], None, &[]).unwrap(), "B\n");
        assert_eq!(work_tree.run(&["show", b_spec.as_str()], None, &[]).unwrap(), "A\n");

        std::fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_legalize_ref_name() {
        assert_eq!(legalize_ref_name("master"), "master");
        assert_eq!(legalize_ref_name("feature-x"), "feature-x");
        assert_eq!(legalize_ref_name("1.10"), "1.10");
        assert_eq!(legalize_ref_name("feature-x.3"), "feature-x.3");
        assert_eq!(legalize_ref_name("a b"), "a_b");
        assert_eq!(legalize_ref_name("a..b"), "a._b");
        assert_eq!(legalize_ref_name(".hidden"), "_hidden");
        assert_eq!(legalize_ref_name("-opt"), "_opt");
        assert_eq!(legalize_ref_name("x.lock"), "x_lock");
        assert_eq!(legalize_ref_name("x."), "x_");
        assert_eq!(legalize_ref_name("a//b/"), "a/b");
        assert_eq!(legalize_ref_name("a.lock/b"), "a_lock/b");
        assert_eq!(legalize_ref_name("x@{1}"), "x@_1}");
        assert_eq!(legalize_ref_name("what?*"), "what__");
        assert_eq!(legalize_ref_name(""), "_");
        assert_eq!(legalize_ref_name("@"), "_");
    }
}
