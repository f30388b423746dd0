use super::{ConvertError, GitCommitMeta, TargetRepo};
use crate::git;

pub(super) struct WorkTree {
    inner: git::WorkTree,
}

impl WorkTree {
    pub(super) fn open(path: &std::path::Path) -> Result<Self, ConvertError> {
        let inner = git::WorkTree::open_or_init(path).map_err(|e| {
            tracing::error!("failed to open git repository at {path:?}: {e}");
            ConvertError
        })?;
        Ok(Self { inner })
    }

    #[inline]
    pub(super) fn path(&self) -> &std::path::Path {
        self.inner.path()
    }
}

impl TargetRepo for WorkTree {
    fn update(&mut self, commit: Option<gix_hash::ObjectId>) -> Result<(), ConvertError> {
        self.inner.update(commit).map_err(|e| {
            match commit {
                Some(commit) => tracing::error!("failed to update work tree to {commit}: {e}"),
                None => tracing::error!("failed to empty work tree: {e}"),
            }
            ConvertError
        })
    }

    fn status(&self) -> Result<Vec<String>, ConvertError> {
        self.inner.status().map_err(|e| {
            tracing::error!("failed to query work tree status: {e}");
            ConvertError
        })
    }

    fn revert_all(&mut self) -> Result<(), ConvertError> {
        self.inner.revert_all().map_err(|e| {
            tracing::error!("failed to revert work tree: {e}");
            ConvertError
        })
    }

    fn rename(&mut self, renames: &[(&str, &str)]) -> Result<(), ConvertError> {
        self.inner.rename(renames).map_err(|e| {
            tracing::error!("failed to record {} rename(s): {e}", renames.len());
            ConvertError
        })
    }

    fn add(&mut self, paths: &[&str]) -> Result<(), ConvertError> {
        self.inner.add(paths).map_err(|e| {
            tracing::error!("failed to add {} file(s): {e}", paths.len());
            ConvertError
        })
    }

    fn set_branch(&mut self, name: &str) -> Result<(), ConvertError> {
        self.inner.set_branch(name);
        Ok(())
    }

    fn commit(&mut self, meta: &GitCommitMeta) -> Result<gix_hash::ObjectId, ConvertError> {
        self.inner
            .commit(&meta.author, &meta.committer, &meta.message)
            .map_err(|e| {
                tracing::error!("failed to commit: {e}");
                ConvertError
            })
    }

    fn tag(&mut self, name: &str, commit: gix_hash::ObjectId) -> Result<(), ConvertError> {
        self.inner.tag(name, commit).map_err(|e| {
            tracing::error!("failed to tag {commit} as \"{name}\": {e}");
            ConvertError
        })
    }

    fn set_head(&mut self, branch: &str) -> Result<(), ConvertError> {
        self.inner.set_head(branch).map_err(|e| {
            tracing::error!("failed to set HEAD to \"{branch}\": {e}");
            ConvertError
        })
    }
}
