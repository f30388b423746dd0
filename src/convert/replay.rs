use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::filemap::{self, Filemap};
use super::options::Options;
use super::rev_map::RevisionMap;
use super::{ConvertError, GitMetaMaker, RevisionSource, TargetRepo};
use crate::term_out::ProgressPrint;
use crate::{FHashMap, git, prcs};

pub(super) struct Output {
    pub(super) rev_map: RevisionMap,
    pub(super) skipped: BTreeSet<String>,
    pub(super) head_branch: Option<String>,
}

/// Replays every revision of `revisions` as a git commit.
pub(super) fn run(
    progress_print: &ProgressPrint,
    options: &Options,
    meta_maker: &dyn GitMetaMaker,
    source: &dyn RevisionSource,
    target: &mut dyn TargetRepo,
    revisions: BTreeMap<String, prcs::Revision>,
) -> Result<Output, ConvertError> {
    let order = processing_order(&revisions);

    let mut stage = Stage {
        progress_print,
        options,
        meta_maker,
        source,
        target,
        revisions,
        rev_map: RevisionMap::new(),
        filemaps: FHashMap::default(),
        skipped: BTreeSet::new(),
        warned_symlinks: BTreeSet::new(),
        branch_names: FHashMap::default(),
        used_branches: BTreeSet::new(),
        last_branch: None,
    };
    stage.run(&order)?;

    let head_branch = if stage.used_branches.contains(&stage.options.trunk_branch) {
        Some(stage.options.trunk_branch.clone())
    } else {
        stage.last_branch
    };

    Ok(Output {
        rev_map: stage.rev_map,
        skipped: stage.skipped,
        head_branch,
    })
}

/// Chronological order. Revisions with the same date are ordered by their
/// version numbers.
fn processing_order(revisions: &BTreeMap<String, prcs::Revision>) -> Vec<String> {
    let mut order: Vec<&prcs::Revision> = revisions.values().collect();
    order.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| compare_rev_ids(&a.id, &b.id)));
    order.into_iter().map(|rev| rev.id.clone()).collect()
}

fn compare_rev_ids(a: &str, b: &str) -> Ordering {
    fn split(id: &str) -> (&str, &str) {
        id.rsplit_once('.').unwrap_or((id, ""))
    }

    fn compare_component(a: &str, b: &str) -> Ordering {
        match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        }
    }

    let (a_major, a_minor) = split(a);
    let (b_major, b_minor) = split(b);
    compare_component(a_major, b_major)
        .then_with(|| compare_component(a_minor, b_minor))
        .then_with(|| a.cmp(b))
}

struct Pending {
    rev: String,
    descriptor: Option<prcs::Descriptor>,
}

struct Stage<'a> {
    progress_print: &'a ProgressPrint,
    options: &'a Options,
    meta_maker: &'a dyn GitMetaMaker,
    source: &'a dyn RevisionSource,
    target: &'a mut dyn TargetRepo,
    revisions: BTreeMap<String, prcs::Revision>,
    rev_map: RevisionMap,
    filemaps: FHashMap<String, Filemap>,
    skipped: BTreeSet<String>,
    warned_symlinks: BTreeSet<String>,
    // PRCS major version to git branch name
    branch_names: FHashMap<String, String>,
    used_branches: BTreeSet<String>,
    last_branch: Option<String>,
}

impl Stage<'_> {
    fn run(&mut self, order: &[String]) -> Result<(), ConvertError> {
        for rev in order.iter() {
            if !self.is_done(rev) {
                self.resolve_and_convert(rev)?;
            }
        }
        Ok(())
    }

    fn is_done(&self, rev: &str) -> bool {
        self.rev_map.contains(rev) || self.skipped.contains(rev)
    }

    /// Converts `rev` after converting its missing ancestors, oldest first.
    fn resolve_and_convert(&mut self, rev: &str) -> Result<(), ConvertError> {
        let mut pending = vec![Pending {
            rev: rev.into(),
            descriptor: None,
        }];

        while let Some(mut current) = pending.pop() {
            let Some(revision) = self.revisions.get(&current.rev) else {
                tracing::error!("revision {} does not exist", current.rev);
                return Err(ConvertError);
            };
            if revision.deleted {
                tracing::warn!("revision {} was deleted, skipping it", current.rev);
                self.skipped.insert(current.rev);
                continue;
            }

            let descriptor = match current.descriptor.take() {
                Some(descriptor) => descriptor,
                None => self.source.descriptor(&current.rev)?,
            };
            let parent = descriptor.parent().map_err(|e| {
                tracing::error!("failed to get parent of revision {}: {e}", current.rev);
                ConvertError
            })?;

            if let Some(ref parent) = parent {
                if !self.rev_map.contains(parent) {
                    if self.skipped.contains(parent) {
                        tracing::error!(
                            "parent {parent} of revision {} was deleted, its file map is not available",
                            current.rev,
                        );
                        return Err(ConvertError);
                    }
                    if !self.revisions.contains_key(parent) {
                        tracing::error!(
                            "parent {parent} of revision {} is not a known revision",
                            current.rev,
                        );
                        return Err(ConvertError);
                    }
                    if *parent == current.rev || pending.iter().any(|p| p.rev == *parent) {
                        tracing::error!(
                            "parent {parent} of revision {} is also its descendant",
                            current.rev,
                        );
                        return Err(ConvertError);
                    }

                    tracing::debug!("converting parent {parent} of {} first", current.rev);
                    current.descriptor = Some(descriptor);
                    pending.push(current);
                    pending.push(Pending {
                        rev: parent.clone(),
                        descriptor: None,
                    });
                    continue;
                }
            }

            self.convert_revision(&current.rev, &descriptor, parent.as_deref())?;
        }

        Ok(())
    }

    fn convert_revision(
        &mut self,
        rev: &str,
        descriptor: &prcs::Descriptor,
        parent: Option<&str>,
    ) -> Result<(), ConvertError> {
        let done = self.rev_map.len() + self.skipped.len();
        self.progress_print.set_progress(format!(
            "converting revision {rev} - {} / {}",
            done + 1,
            self.revisions.len(),
        ));
        tracing::info!("converting revision {rev}");

        let merge_parents = descriptor.merge_parents().map_err(|e| {
            tracing::error!("failed to get merge parents of revision {rev}: {e}");
            ConvertError
        })?;
        if !merge_parents.is_empty() {
            tracing::error!(
                "revision {rev} is a merge of {}, merges are not supported",
                merge_parents.join(", "),
            );
            return Err(ConvertError);
        }

        let files = descriptor.files().map_err(|e| {
            tracing::error!("failed to get file list of revision {rev}: {e}");
            ConvertError
        })?;
        let (major, minor) = descriptor.version().map_err(|e| {
            tracing::error!("failed to get version of revision {rev}: {e}");
            ConvertError
        })?;

        let (parent_commit, parent_filemap) = match parent {
            None => (None, None),
            Some(parent) => {
                let (Some(commit), Some(filemap)) =
                    (self.rev_map.get(parent), self.filemaps.get(parent))
                else {
                    tracing::error!("parent {parent} of revision {rev} has not been converted");
                    return Err(ConvertError);
                };
                (Some(commit), Some(filemap))
            }
        };

        let changes = filemap::build(parent_filemap, &files, &mut self.warned_symlinks)
            .map_err(|e| {
                tracing::error!("revision {rev}: {e}");
                ConvertError
            })?;

        self.reset_work_tree(parent_commit)?;
        self.source.checkout(rev)?;

        let mut renames = Vec::with_capacity(changes.renames.len());
        for (old_path, new_path) in changes.renames.iter() {
            tracing::debug!("renamed {old_path:?} -> {new_path:?}");
            renames.push((old_path.as_str(), new_path.as_str()));
        }
        self.target.rename(&renames)?;
        let adds: Vec<&str> = changes.adds.iter().map(String::as_str).collect();
        self.target.add(&adds)?;

        let branch = self.branch_name(&major);
        self.target.set_branch(&branch)?;

        let revision = &self.revisions[rev];
        let meta = self
            .meta_maker
            .make_git_commit_meta(
                self.source.project_name(),
                revision,
                (major.as_str(), minor.as_str()),
                &descriptor.message(),
            )
            .map_err(|e| {
                tracing::error!("failed to make git commit metadata for revision {rev}: {e}");
                ConvertError
            })?;
        let commit = self.target.commit(&meta)?;
        tracing::debug!("revision {rev} committed as {commit} on \"{branch}\"");

        self.rev_map.insert(rev, commit);
        self.filemaps.insert(rev.into(), changes.filemap);

        let tag = git::legalize_ref_name(rev);
        if tag != rev {
            tracing::warn!(
                "revision {rev} tagged as \"{}\" due to invalid characters or sequences",
                tag.escape_default(),
            );
        }
        self.target.tag(&tag, commit)?;

        self.used_branches.insert(branch.clone());
        self.last_branch = Some(branch);

        Ok(())
    }

    /// Brings the work tree to the exact state of `base`, discarding every
    /// leftover from previous revisions.
    fn reset_work_tree(&mut self, base: Option<gix_hash::ObjectId>) -> Result<(), ConvertError> {
        self.target.update(base)?;
        let dirty = self.target.status()?;
        if !dirty.is_empty() {
            tracing::debug!("discarding {} modified or untracked path(s)", dirty.len());
            self.target.revert_all()?;
        }
        Ok(())
    }

    fn branch_name(&mut self, major: &str) -> String {
        let raw_name = self.options.branch_for_major(major);
        if let Some(name) = self.branch_names.get(raw_name) {
            return name.clone();
        }

        let name = git::legalize_ref_name(raw_name);
        if name != raw_name {
            tracing::warn!(
                "branch \"{}\" named \"{}\" due to invalid characters or sequences",
                raw_name.escape_default(),
                name.escape_default(),
            );
        }
        self.branch_names.insert(raw_name.into(), name.clone());
        name
    }
}
