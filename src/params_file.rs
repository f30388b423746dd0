use std::path::PathBuf;

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConvParams {
    #[serde(rename = "trunk-branch", default = "default_trunk_branch")]
    pub(crate) trunk_branch: String,
    #[serde(rename = "user-map-file")]
    pub(crate) user_map_file: Option<PathBuf>,
    #[serde(rename = "user-fallback-template")]
    pub(crate) user_fallback_template: Option<String>,
    #[serde(rename = "commit-msg-template")]
    pub(crate) commit_msg_template: Option<String>,
}

impl Default for ConvParams {
    fn default() -> Self {
        Self {
            trunk_branch: default_trunk_branch(),
            user_map_file: None,
            user_fallback_template: None,
            commit_msg_template: None,
        }
    }
}

fn default_trunk_branch() -> String {
    "master".into()
}
