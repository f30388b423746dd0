use super::ConvertError;
use crate::git;

pub(crate) struct InitOptions {
    pub(crate) trunk_branch: String,
}

pub(crate) struct Options {
    pub(super) trunk_branch: String,
}

impl Options {
    pub(crate) fn new(init: InitOptions) -> Self {
        Self {
            trunk_branch: init.trunk_branch,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConvertError> {
        if git::legalize_ref_name(&self.trunk_branch) != self.trunk_branch {
            tracing::error!(
                "trunk branch name \"{}\" is not a valid git branch name",
                self.trunk_branch.escape_default(),
            );
            return Err(ConvertError);
        }
        Ok(())
    }

    /// Versions whose major component is a plain number live on the trunk.
    /// Any other major component names its own branch.
    pub(super) fn branch_for_major<'a>(&'a self, major: &'a str) -> &'a str {
        if !major.is_empty() && major.bytes().all(|b| b.is_ascii_digit()) {
            &self.trunk_branch
        } else {
            major
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InitOptions, Options};

    fn options() -> Options {
        Options::new(InitOptions {
            trunk_branch: "master".into(),
        })
    }

    #[test]
    fn test_branch_for_major() {
        let options = options();
        assert_eq!(options.branch_for_major("2"), "master");
        assert_eq!(options.branch_for_major("0"), "master");
        assert_eq!(options.branch_for_major("feature-x"), "feature-x");
        assert_eq!(options.branch_for_major("2a"), "2a");
        assert_eq!(options.branch_for_major("-1"), "-1");
    }

    #[test]
    fn test_validate() {
        assert!(options().validate().is_ok());
        assert!(
            Options::new(InitOptions {
                trunk_branch: "bad name".into(),
            })
            .validate()
            .is_err()
        );
    }
}
