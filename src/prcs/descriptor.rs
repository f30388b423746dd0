use std::collections::{BTreeMap, HashMap};

use super::sexp::{self, Value};

/// Component used by PRCS in `Parent-Version` for the root revision.
const ROOT_MARKER: &str = "-*-";

/// A parsed project descriptor (`<project>.prj`).
///
/// Property names are stored lowercased. Each property maps to the values
/// that follow its name inside the top-level list.
#[derive(Clone, Debug)]
pub(crate) struct Descriptor {
    properties: HashMap<String, Vec<Value>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FileEntry {
    Tracked {
        identity: Option<String>,
        revision: Option<String>,
        mode: Option<u32>,
    },
    Symlink {
        target: String,
    },
    Directory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DescriptorError {
    Syntax(sexp::ParseError),
    MissingProperty { name: &'static str },
    BadProperty { name: &'static str },
    BadFileEntry { index: usize },
    BadMode { path: String, mode: String },
}

impl std::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(e) => write!(f, "syntax error: {e}"),
            Self::MissingProperty { name } => write!(f, "missing property {name:?}"),
            Self::BadProperty { name } => write!(f, "malformed property {name:?}"),
            Self::BadFileEntry { index } => write!(f, "malformed file entry #{index}"),
            Self::BadMode { path, mode } => {
                write!(f, "invalid mode {mode:?} for file {path:?}")
            }
        }
    }
}

impl Descriptor {
    pub(crate) fn parse(src: &str) -> Result<Self, DescriptorError> {
        // PRCS writes the properties without an enclosing list.
        let wrapped = format!("(\n{src}\n)");
        let root = sexp::parse(&wrapped).map_err(DescriptorError::Syntax)?;

        let mut properties = HashMap::new();
        if let Value::List(items) = root {
            for item in items {
                let Value::List(mut entry) = item else {
                    continue;
                };
                let Some(name) = entry.first().and_then(Value::as_symbol) else {
                    continue;
                };
                let name = name.to_ascii_lowercase();
                entry.remove(0);
                properties.insert(name, entry);
            }
        }

        Ok(Self { properties })
    }

    fn property(&self, name: &'static str) -> Option<&[Value]> {
        self.properties
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// Parent version as `"major.minor"`, `None` for the root revision.
    pub(crate) fn parent(&self) -> Result<Option<String>, DescriptorError> {
        const NAME: &str = "Parent-Version";

        let values = self
            .property(NAME)
            .ok_or(DescriptorError::MissingProperty { name: NAME })?;
        let [_, major, minor, ..] = values else {
            return Err(DescriptorError::BadProperty { name: NAME });
        };
        let (Some(major), Some(minor)) = (major.as_text(), minor.as_text()) else {
            return Err(DescriptorError::BadProperty { name: NAME });
        };

        if major == ROOT_MARKER && minor == ROOT_MARKER {
            Ok(None)
        } else {
            Ok(Some(format!("{major}.{minor}")))
        }
    }

    /// Versions listed in `Merge-Parents`.
    pub(crate) fn merge_parents(&self) -> Result<Vec<String>, DescriptorError> {
        const NAME: &str = "Merge-Parents";

        let Some(values) = self.property(NAME) else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|entry| {
                entry
                    .as_list()
                    .and_then(|items| items.first())
                    .and_then(Value::as_text)
                    .map(String::from)
                    .ok_or(DescriptorError::BadProperty { name: NAME })
            })
            .collect()
    }

    /// `(major, minor)` of `Project-Version`.
    pub(crate) fn version(&self) -> Result<(String, String), DescriptorError> {
        const NAME: &str = "Project-Version";

        let values = self
            .property(NAME)
            .ok_or(DescriptorError::MissingProperty { name: NAME })?;
        let [_, major, minor, ..] = values else {
            return Err(DescriptorError::BadProperty { name: NAME });
        };
        match (major.as_text(), minor.as_text()) {
            (Some(major), Some(minor)) => Ok((major.into(), minor.into())),
            _ => Err(DescriptorError::BadProperty { name: NAME }),
        }
    }

    pub(crate) fn message(&self) -> String {
        self.property("Version-Log")
            .and_then(|values| values.first())
            .and_then(Value::as_text)
            .map(String::from)
            .unwrap_or_default()
    }

    /// File list, keyed by path.
    ///
    /// Each entry has the shape `(path (id revision mode) flags...)`. For
    /// symbolic links the inner list holds the link target instead.
    pub(crate) fn files(&self) -> Result<BTreeMap<String, FileEntry>, DescriptorError> {
        let mut files = BTreeMap::new();
        let Some(values) = self.property("Files") else {
            return Ok(files);
        };

        for (index, entry) in values.iter().enumerate() {
            let bad_entry = || DescriptorError::BadFileEntry { index };

            let items = entry.as_list().ok_or_else(bad_entry)?;
            let [path, info, flags @ ..] = items else {
                return Err(bad_entry());
            };
            let path = path.as_text().ok_or_else(bad_entry)?;
            let info = info.as_list().ok_or_else(bad_entry)?;

            let has_flag = |flag: &str| flags.iter().any(|f| f.as_text() == Some(flag));

            let file_entry = if has_flag(":symlink") {
                let target = info
                    .first()
                    .and_then(Value::as_text)
                    .ok_or_else(bad_entry)?;
                FileEntry::Symlink {
                    target: target.into(),
                }
            } else if has_flag(":directory") || has_flag(":implicit-directory") {
                FileEntry::Directory
            } else {
                let text_at = |i: usize| info.get(i).and_then(Value::as_text).map(String::from);
                let mode = text_at(2)
                    .map(|raw| {
                        u32::from_str_radix(&raw, 8).map_err(|_| DescriptorError::BadMode {
                            path: path.into(),
                            mode: raw.clone(),
                        })
                    })
                    .transpose()?;
                FileEntry::Tracked {
                    identity: text_at(0),
                    revision: text_at(1),
                    mode,
                }
            };

            files.insert(path.to_owned(), file_entry);
        }

        Ok(files)
    }
}
