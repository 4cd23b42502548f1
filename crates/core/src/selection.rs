use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const SIZE_LIMIT: usize = 5 * 1024 * 1024;

const NAME_TAG: &str = "[file name]: ";
const BEGIN_TAG: &str = "[file content begin]";
const END_TAG: &str = "[file content end]";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Local(PathBuf),
    Remote,
}

#[derive(Clone, Debug)]
pub struct SelectedFile {
    pub path: String,
    pub content: String,
    // Size as reported by the source, which may differ from `content.len()`.
    pub size: u64,
    pub origin: Origin,
}

impl SelectedFile {
    pub fn remote(path: impl Into<String>, content: String) -> Self {
        let size = content.len() as u64;
        Self {
            path: path.into(),
            content,
            size,
            origin: Origin::Remote,
        }
    }
}

// Insertion-ordered map of path to file. Replacing a path keeps its slot.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    files: Vec<SelectedFile>,
    index: HashMap<String, usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: SelectedFile) -> Option<SelectedFile> {
        match self.index.get(&file.path) {
            Some(&i) => Some(std::mem::replace(&mut self.files[i], file)),
            None => {
                self.index.insert(file.path.clone(), self.files.len());
                self.files.push(file);
                None
            }
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<SelectedFile> {
        let i = self.index.remove(path)?;
        let removed = self.files.remove(i);
        for f in &self.files[i..] {
            if let Some(slot) = self.index.get_mut(&f.path) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.index.clear();
    }

    pub fn get(&self, path: &str) -> Option<&SelectedFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedFile> {
        self.files.iter()
    }

    // Sum of decoded content lengths; this is what the size policy checks.
    pub fn content_len(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }

    pub fn reported_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn exceeds_limit(&self) -> bool {
        self.content_len() > SIZE_LIMIT
    }

    pub fn format(&self) -> String {
        let mut out = String::with_capacity(self.content_len() + self.files.len() * 64);
        for f in &self.files {
            out.push_str(NAME_TAG);
            out.push_str(&f.path);
            out.push('\n');
            out.push_str(BEGIN_TAG);
            out.push('\n');
            out.push_str(&f.content);
            out.push('\n');
            out.push_str(END_TAG);
            out.push_str("\n\n");
        }
        out
    }

    // Renders the selection, enforcing `SIZE_LIMIT` unless the caller
    // already has the user's confirmation.
    pub fn formatted(&self, allow_oversize: bool) -> Result<String> {
        let total = self.content_len();
        if total > SIZE_LIMIT && !allow_oversize {
            return Err(Error::SizeLimitExceeded {
                total,
                limit: SIZE_LIMIT,
            });
        }
        Ok(self.format())
    }
}

pub fn parse_formatted(text: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(NAME_TAG) {
        let after = &rest[pos + NAME_TAG.len()..];
        let Some(nl) = after.find('\n') else { break };
        let path = &after[..nl];
        let body = &after[nl + 1..];
        let Some(body) = body.strip_prefix(BEGIN_TAG).and_then(|b| b.strip_prefix('\n')) else {
            rest = body;
            continue;
        };
        let end_marker = format!("\n{END_TAG}\n");
        let Some(end) = body.find(&end_marker) else { break };
        out.push((path.to_string(), body[..end].to_string()));
        rest = &body[end + end_marker.len()..];
    }
    out
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> SelectedFile {
        SelectedFile::remote(path, content.to_string())
    }

    #[test]
    fn format_keeps_insertion_order_and_round_trips() {
        let mut sel = Selection::new();
        sel.insert(file("b.rs", "fn b() {}"));
        sel.insert(file("a/x.py", "print('x')\n\nmore"));
        sel.insert(file("c.txt", ""));

        let text = sel.format();
        assert!(text.starts_with("[file name]: b.rs\n[file content begin]\nfn b() {}\n[file content end]\n\n"));

        let parsed = parse_formatted(&text);
        assert_eq!(
            parsed,
            vec![
                ("b.rs".to_string(), "fn b() {}".to_string()),
                ("a/x.py".to_string(), "print('x')\n\nmore".to_string()),
                ("c.txt".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn parse_ignores_surrounding_prompt_text() {
        let mut sel = Selection::new();
        sel.insert(file("main.rs", "fn main() {}"));
        let prompt = format!("system says hi\n\n{}\n\nplease review", sel.format());
        assert_eq!(
            parse_formatted(&prompt),
            vec![("main.rs".to_string(), "fn main() {}".to_string())]
        );
    }

    #[test]
    fn reinsert_overwrites_in_place() {
        let mut sel = Selection::new();
        sel.insert(file("one", "1"));
        sel.insert(file("two", "2"));
        let old = sel.insert(file("one", "uno"));

        assert_eq!(old.map(|f| f.content), Some("1".to_string()));
        assert_eq!(sel.len(), 2);
        let paths: Vec<_> = sel.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["one", "two"]);
        assert_eq!(sel.get("one").map(|f| f.content.as_str()), Some("uno"));
    }

    #[test]
    fn remove_reindexes_and_absent_is_noop() {
        let mut sel = Selection::new();
        for p in ["a", "b", "c"] {
            sel.insert(file(p, p));
        }
        assert!(sel.remove("a").is_some());
        assert!(sel.remove("a").is_none());
        assert_eq!(sel.get("c").map(|f| f.content.as_str()), Some("c"));
        sel.insert(file("c", "cc"));
        let paths: Vec<_> = sel.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["b", "c"]);
    }

    #[test]
    fn oversize_requires_confirmation_and_leaves_selection_alone() {
        let mut sel = Selection::new();
        sel.insert(file("big", &"x".repeat(SIZE_LIMIT)));
        sel.insert(file("extra", "y"));

        match sel.formatted(false) {
            Err(Error::SizeLimitExceeded { total, limit }) => {
                assert_eq!(total, SIZE_LIMIT + 1);
                assert_eq!(limit, SIZE_LIMIT);
            }
            other => panic!("expected size error, got {:?}", other.map(|s| s.len())),
        }
        assert_eq!(sel.len(), 2);
        assert!(sel.formatted(true).is_ok());
    }

    #[test]
    fn exactly_at_limit_passes() {
        let mut sel = Selection::new();
        sel.insert(file("big", &"x".repeat(SIZE_LIMIT)));
        assert!(sel.formatted(false).is_ok());
    }

    #[test]
    fn sizes_are_humanised() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
