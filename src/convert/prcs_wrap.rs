use std::collections::BTreeMap;

use super::{ConvertError, RevisionSource};
use crate::prcs;

pub(super) struct Project {
    inner: prcs::Project,
}

impl Project {
    pub(super) fn new(name: &str, prcs_bin: &std::path::Path, work_dir: &std::path::Path) -> Self {
        Self {
            inner: prcs::Project::new(name, prcs_bin, work_dir),
        }
    }

    pub(super) fn revisions(&self) -> Result<BTreeMap<String, prcs::Revision>, ConvertError> {
        self.inner.revisions().map_err(|e| {
            tracing::error!("failed to list revisions of {:?}: {e}", self.inner.name());
            ConvertError
        })
    }
}

impl RevisionSource for Project {
    fn project_name(&self) -> &str {
        self.inner.name()
    }

    fn descriptor(&self, rev: &str) -> Result<prcs::Descriptor, ConvertError> {
        self.inner.descriptor(rev).map_err(|e| {
            tracing::error!("failed to get descriptor of revision {rev}: {e}");
            ConvertError
        })
    }

    fn checkout(&self, rev: &str) -> Result<(), ConvertError> {
        self.inner.checkout(Some(rev), &[]).map_err(|e| {
            tracing::error!("failed to check out revision {rev}: {e}");
            ConvertError
        })
    }
}
