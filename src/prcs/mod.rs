use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub(crate) mod descriptor;
pub(crate) mod info;
pub(crate) mod sexp;

pub(crate) use descriptor::{Descriptor, DescriptorError, FileEntry};
pub(crate) use info::Revision;

#[derive(Debug)]
pub(crate) enum CommandError {
    Spawn {
        arg0: OsString,
        error: std::io::Error,
    },
    Failed {
        args: Vec<String>,
        status: std::process::ExitStatus,
        stderr: String,
    },
    DescriptorRead {
        path: PathBuf,
        error: std::io::Error,
    },
    Descriptor {
        rev: String,
        error: DescriptorError,
    },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { arg0, error } => {
                write!(f, "failed to spawn process {arg0:?}: {error}")
            }
            Self::Failed {
                args,
                status,
                stderr,
            } => {
                write!(f, "\"prcs {}\" finished with {status}", args.join(" "))?;
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr.trim_end())?;
                }
                Ok(())
            }
            Self::DescriptorRead { path, error } => {
                write!(f, "failed to read descriptor {path:?}: {error}")
            }
            Self::Descriptor { rev, error } => {
                write!(f, "invalid descriptor for revision {rev}: {error}")
            }
        }
    }
}

/// A PRCS project, checked out into `work_dir`.
pub(crate) struct Project {
    name: String,
    prcs_bin: PathBuf,
    work_dir: PathBuf,
}

struct Output {
    status: std::process::ExitStatus,
    stdout: String,
    stderr: String,
}

impl Project {
    pub(crate) fn new(name: &str, prcs_bin: &Path, work_dir: &Path) -> Self {
        Self {
            name: name.into(),
            prcs_bin: prcs_bin.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, args: &[&str]) -> Result<Output, CommandError> {
        tracing::debug!("running prcs {}", args.join(" "));

        let output = std::process::Command::new(&self.prcs_bin)
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(std::process::Stdio::null())
            .output()
            .map_err(|e| CommandError::Spawn {
                arg0: self.prcs_bin.clone().into_os_string(),
                error: e,
            })?;

        Ok(Output {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Lists the revisions of the project, keyed by revision id.
    ///
    /// Errors reported by PRCS are only warnings, a partial listing is still
    /// usable.
    pub(crate) fn revisions(&self) -> Result<BTreeMap<String, Revision>, CommandError> {
        let output = self.run(&["info", "-f", self.name.as_str()])?;
        for line in output.stderr.lines() {
            tracing::warn!("prcs info: {line}");
        }
        if !output.status.success() {
            tracing::warn!("prcs info finished with {}", output.status);
        }

        Ok(info::InfoParser::new().parse(&self.name, &output.stdout))
    }

    /// Checks out `rev` (or the latest revision) into the work directory.
    ///
    /// When `files` is empty the whole project is checked out and files not
    /// belonging to it are removed.
    pub(crate) fn checkout(&self, rev: Option<&str>, files: &[&str]) -> Result<(), CommandError> {
        let mut args = vec!["checkout", "-fqu"];
        if files.is_empty() {
            args.push("-P");
        }
        if let Some(rev) = rev {
            args.push("-r");
            args.push(rev);
        }
        args.push(self.name.as_str());
        args.extend_from_slice(files);

        let output = self.run(&args)?;
        if !output.status.success() {
            return Err(CommandError::Failed {
                args: args.iter().map(|&s| s.into()).collect(),
                status: output.status,
                stderr: output.stderr,
            });
        }
        for line in output.stderr.lines() {
            tracing::warn!("prcs checkout: {line}");
        }

        Ok(())
    }

    /// Fetches and parses the descriptor of `rev`. The descriptor file is
    /// removed from the work directory afterwards.
    pub(crate) fn descriptor(&self, rev: &str) -> Result<Descriptor, CommandError> {
        let prj_name = format!("{}.prj", self.name);
        self.checkout(Some(rev), &[prj_name.as_str()])?;

        let prj_path = self.work_dir.join(&prj_name);
        let raw = std::fs::read(&prj_path).map_err(|e| CommandError::DescriptorRead {
            path: prj_path.clone(),
            error: e,
        })?;
        if let Err(e) = std::fs::remove_file(&prj_path) {
            tracing::warn!("failed to remove {prj_path:?}: {e}");
        }

        Descriptor::parse(&String::from_utf8_lossy(&raw)).map_err(|e| CommandError::Descriptor {
            rev: rev.into(),
            error: e,
        })
    }
}
