use std::collections::{BTreeMap, BTreeSet};

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Test {
    #[serde(default = "default_project")]
    pub(crate) project: String,
    #[serde(rename = "prcs-revs")]
    pub(crate) prcs_revs: Vec<PrcsRev>,
    /// Raw lines appended to the generated `prcs info` listing.
    #[serde(rename = "extra-info")]
    pub(crate) extra_info: Option<String>,
    #[serde(rename = "conv-params")]
    pub(crate) conv_params: Option<String>,
    #[serde(rename = "user-map")]
    pub(crate) user_map: Option<String>,
    #[serde(rename = "failed", default = "false_")]
    pub(crate) failed: bool,
    #[serde(rename = "logs")]
    pub(crate) logs: Option<String>,
    #[serde(rename = "git-head")]
    pub(crate) git_head: Option<String>,
    #[serde(rename = "git-refs")]
    pub(crate) git_refs: Option<BTreeSet<String>>,
    #[serde(rename = "git-revs", default = "Vec::new")]
    pub(crate) git_revs: Vec<GitRev>,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PrcsRev {
    pub(crate) id: String,
    /// As printed by `prcs info`.
    pub(crate) date: String,
    #[serde(default = "default_author")]
    pub(crate) author: String,
    #[serde(default = "false_")]
    pub(crate) deleted: bool,
    pub(crate) parent: Option<String>,
    #[serde(default = "String::new")]
    pub(crate) log: String,
    #[serde(rename = "merge-parents", default = "Vec::new")]
    pub(crate) merge_parents: Vec<String>,
    #[serde(default = "BTreeMap::new")]
    pub(crate) files: BTreeMap<String, PrcsFile>,
    #[serde(default = "BTreeMap::new")]
    pub(crate) symlinks: BTreeMap<String, String>,
    /// Replaces the generated descriptor.
    pub(crate) descriptor: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PrcsFile {
    /// File identity (internal file name).
    pub(crate) id: String,
    #[serde(default = "default_file_rev")]
    pub(crate) rev: String,
    #[serde(default = "false_")]
    pub(crate) exec: bool,
    pub(crate) data: String,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GitRev {
    pub(crate) rev: String,
    pub(crate) author: Option<GitSignature>,
    pub(crate) committer: Option<GitSignature>,
    pub(crate) message: Option<String>,
    pub(crate) parents: Option<Vec<String>>,
    pub(crate) tree: Option<BTreeMap<String, GitTreeEntry>>,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GitSignature {
    pub(crate) name: String,
    pub(crate) email: String,
    /// Unix timestamp.
    pub(crate) time: Option<i64>,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub(crate) enum GitTreeEntry {
    #[serde(rename = "normal")]
    Normal { data: String },
    #[serde(rename = "exec")]
    Exec { data: String },
    #[serde(rename = "dir")]
    Dir,
}

fn default_project() -> String {
    "demo".into()
}

fn default_author() -> String {
    "kaz".into()
}

fn default_file_rev() -> String {
    "1.1".into()
}

#[inline(always)]
fn false_() -> bool {
    false
}
