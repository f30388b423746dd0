use std::collections::{BTreeMap, BTreeSet};

use crate::prcs::FileEntry;

/// File identity to path, for a single revision.
pub(super) type Filemap = BTreeMap<String, String>;

#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct FileChanges {
    pub(super) filemap: Filemap,
    /// `(old path, new path)`
    pub(super) renames: Vec<(String, String)>,
    pub(super) adds: Vec<String>,
    /// Identities used by more than one path, with all of their paths.
    pub(super) duplicates: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum FilemapError {
    MissingIdentity { path: String },
}

impl std::fmt::Display for FilemapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdentity { path } => write!(f, "file {path:?} has no identity"),
        }
    }
}

/// Builds the filemap of a revision from its file list and classifies each
/// file against the parent filemap.
///
/// Symbolic links are not tracked. A warning is emitted the first time each
/// link path is seen, `warned_symlinks` carries that state across revisions.
pub(super) fn build(
    parent: Option<&Filemap>,
    files: &BTreeMap<String, FileEntry>,
    warned_symlinks: &mut BTreeSet<String>,
) -> Result<FileChanges, FilemapError> {
    let mut changes = FileChanges::default();

    for (path, entry) in files.iter() {
        let identity = match entry {
            FileEntry::Symlink { target } => {
                if warned_symlinks.insert(path.clone()) {
                    tracing::warn!("symbolic link {path:?} -> {target:?} cannot be converted, ignoring it");
                }
                continue;
            }
            FileEntry::Directory => {
                tracing::debug!("ignoring directory entry {path:?}");
                continue;
            }
            FileEntry::Tracked {
                identity,
                revision,
                mode,
            } => {
                let identity = identity.as_deref().ok_or_else(|| FilemapError::MissingIdentity {
                    path: path.clone(),
                })?;
                tracing::trace!(
                    "{path:?}: {identity} {} {:o}",
                    revision.as_deref().unwrap_or("-"),
                    mode.unwrap_or(0),
                );
                identity
            }
        };

        if let Some(first_path) = changes.filemap.get(identity) {
            changes
                .duplicates
                .entry(identity.into())
                .or_insert_with(|| vec![first_path.clone()])
                .push(path.clone());
            changes.adds.push(path.clone());
            continue;
        }

        match parent.and_then(|parent| parent.get(identity)) {
            Some(old_path) if old_path != path => {
                changes.renames.push((old_path.clone(), path.clone()));
            }
            _ => changes.adds.push(path.clone()),
        }
        changes.filemap.insert(identity.into(), path.clone());
    }

    for (identity, paths) in changes.duplicates.iter() {
        let paths = paths
            .iter()
            .map(|path| format!("{path:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::warn!("file identity {identity:?} is shared by {paths}");
    }

    Ok(changes)
}
