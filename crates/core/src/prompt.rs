use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::selection::Selection;
use crate::settings::Settings;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSource {
    #[default]
    Local,
    Remote,
    Both,
}

impl FileSource {
    pub fn next(self) -> Self {
        match self {
            FileSource::Local => FileSource::Remote,
            FileSource::Remote => FileSource::Both,
            FileSource::Both => FileSource::Local,
        }
    }
}

pub fn assemble(system: &str, files: &str, user: &str) -> String {
    let mut out = String::with_capacity(system.len() + files.len() + user.len() + 4);
    out.push_str(system);
    out.push_str("\n\n");
    out.push_str(files);
    out.push_str("\n\n");
    out.push_str(user);
    out
}

pub fn compose(
    settings: &Settings,
    system: &str,
    user: &str,
    selections: &[&Selection],
    allow_oversize: bool,
) -> Result<String> {
    if settings.api_key.trim().is_empty() {
        return Err(Error::MissingCredential);
    }
    if user.trim().is_empty() {
        return Err(Error::MissingPrompt);
    }
    let mut files = String::new();
    for sel in selections {
        files.push_str(&sel.formatted(allow_oversize)?);
    }
    Ok(assemble(system, &files, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{SelectedFile, SIZE_LIMIT};

    fn keyed() -> Settings {
        Settings {
            api_key: "sk-test".into(),
            ..Settings::default()
        }
    }

    #[test]
    fn sections_in_fixed_order() {
        assert_eq!(assemble("sys", "FILES", "ask"), "sys\n\nFILES\n\nask");
    }

    #[test]
    fn compose_joins_selections_in_order() {
        let mut local = Selection::new();
        local.insert(SelectedFile::remote("l.rs", "local".into()));
        let mut remote = Selection::new();
        remote.insert(SelectedFile::remote("r.rs", "remote".into()));

        let out = compose(&keyed(), "sys", "ask", &[&local, &remote], false).unwrap();
        assert_eq!(out, assemble("sys", &(local.format() + &remote.format()), "ask"));
    }

    #[test]
    fn missing_inputs_block_send() {
        let sel = Selection::new();
        assert!(matches!(
            compose(&Settings::default(), "", "ask", &[&sel], false),
            Err(Error::MissingCredential)
        ));
        assert!(matches!(
            compose(&keyed(), "sys", "  \n", &[&sel], false),
            Err(Error::MissingPrompt)
        ));
    }

    #[test]
    fn oversize_needs_confirmation() {
        let mut big = Selection::new();
        big.insert(SelectedFile::remote("big", "x".repeat(SIZE_LIMIT + 1)));
        assert!(matches!(
            compose(&keyed(), "", "ask", &[&big], false),
            Err(Error::SizeLimitExceeded { .. })
        ));
        assert!(compose(&keyed(), "", "ask", &[&big], true).is_ok());
    }
}
