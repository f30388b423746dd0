use crate::term_out::ProgressPrint;
use crate::{git, prcs};

mod filemap;
mod git_wrap;
mod options;
mod prcs_wrap;
mod replay;
mod rev_map;

pub(crate) use options::{InitOptions, Options};

pub(crate) struct ConvertError;

pub(crate) struct GitCommitMeta {
    pub(crate) author: git::Signature,
    pub(crate) committer: git::Signature,
    pub(crate) message: String,
}

pub(crate) trait GitMetaMaker {
    fn make_git_commit_meta(
        &self,
        prcs_project: &str,
        prcs_rev: &prcs::Revision,
        prcs_version: (&str, &str),
        prcs_log: &str,
    ) -> Result<GitCommitMeta, String>;
}

/// Read access to the legacy repository.
pub(crate) trait RevisionSource {
    fn project_name(&self) -> &str;

    fn descriptor(&self, rev: &str) -> Result<prcs::Descriptor, ConvertError>;

    /// Materializes the full tree of `rev` into the work tree, removing
    /// files that do not belong to it.
    fn checkout(&self, rev: &str) -> Result<(), ConvertError>;
}

/// Mutations of the target repository and its work tree.
pub(crate) trait TargetRepo {
    /// Resets index and tracked files to `commit`, or to the empty state.
    fn update(&mut self, commit: Option<gix_hash::ObjectId>) -> Result<(), ConvertError>;

    /// Modified, deleted and untracked paths.
    fn status(&self) -> Result<Vec<String>, ConvertError>;

    fn revert_all(&mut self) -> Result<(), ConvertError>;

    /// Records all `(old path, new path)` moves of a revision at once.
    fn rename(&mut self, renames: &[(&str, &str)]) -> Result<(), ConvertError>;

    fn add(&mut self, paths: &[&str]) -> Result<(), ConvertError>;

    fn set_branch(&mut self, name: &str) -> Result<(), ConvertError>;

    fn commit(&mut self, meta: &GitCommitMeta) -> Result<gix_hash::ObjectId, ConvertError>;

    fn tag(&mut self, name: &str, commit: gix_hash::ObjectId) -> Result<(), ConvertError>;

    fn set_head(&mut self, branch: &str) -> Result<(), ConvertError>;
}

pub(crate) fn convert(
    progress_print: &ProgressPrint,
    options: &Options,
    meta_maker: &dyn GitMetaMaker,
    project_name: &str,
    prcs_bin: &std::path::Path,
    dst_path: &std::path::Path,
) -> Result<(), ConvertError> {
    progress_print.set_progress("initializing git repository".into());
    let mut work_tree = git_wrap::WorkTree::open(dst_path)?;

    progress_print.set_progress("listing PRCS revisions".into());
    let project = prcs_wrap::Project::new(project_name, prcs_bin, work_tree.path());
    let revisions = project.revisions()?;
    if revisions.is_empty() {
        tracing::error!("no revisions found for project {project_name:?}");
        return Err(ConvertError);
    }
    tracing::info!("found {} revisions", revisions.len());

    let output = replay::run(
        progress_print,
        options,
        meta_maker,
        &project,
        &mut work_tree,
        revisions,
    )?;

    progress_print.set_progress("finalizing".into());
    progress_print.freeze_progress();

    tracing::info!(
        "converted {} revisions ({} skipped)",
        output.rev_map.len(),
        output.skipped.len(),
    );
    for (rev, commit) in output.rev_map.iter() {
        tracing::debug!("PRCS {rev} -> {commit}");
    }
    for rev in output.skipped.iter() {
        tracing::debug!("PRCS {rev} -> (deleted)");
    }

    if let Some(ref head_branch) = output.head_branch {
        tracing::info!("setting HEAD to \"{head_branch}\"");
        work_tree.set_head(head_branch)?;
    }

    Ok(())
}
