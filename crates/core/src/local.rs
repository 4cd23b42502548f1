use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use url::Url;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::filter::ExtensionFilter;
use crate::selection::{Origin, SelectedFile, Selection};

pub const PER_FILE_LIMIT: u64 = 5 * 1024 * 1024;

pub const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "venv", "__pycache__", ".idea", ".vscode"];

pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Replaced,
    Filtered,
}

#[derive(Debug, Default)]
pub struct AddReport {
    pub added: usize,
    pub replaced: usize,
    pub filtered: usize,
    pub errors: Vec<Error>,
}

impl AddReport {
    fn record(&mut self, res: Result<AddOutcome>) {
        match res {
            Ok(AddOutcome::Added) => self.added += 1,
            Ok(AddOutcome::Replaced) => self.replaced += 1,
            Ok(AddOutcome::Filtered) => self.filtered += 1,
            Err(e) => self.errors.push(e),
        }
    }

    fn merge(&mut self, other: AddReport) {
        self.added += other.added;
        self.replaced += other.replaced;
        self.filtered += other.filtered;
        self.errors.extend(other.errors);
    }

    pub fn accepted(&self) -> usize {
        self.added + self.replaced
    }
}

#[derive(Debug, Default)]
pub struct LocalCollector {
    selection: Selection,
    filter: ExtensionFilter,
}

impl LocalCollector {
    pub fn new(filter: &str) -> Self {
        Self {
            selection: Selection::new(),
            filter: ExtensionFilter::parse(filter),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn filter(&self) -> &ExtensionFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, raw: &str) {
        self.filter = ExtensionFilter::parse(raw);
    }

    // Adds one file. `explicit_path` is the selection key; it defaults to the
    // file name.
    pub fn add_entry(&mut self, file: &Path, explicit_path: Option<&str>) -> Result<AddOutcome> {
        let key = match explicit_path {
            Some(p) => p.to_string(),
            None => file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.to_string_lossy().into_owned()),
        };
        let meta = fs::metadata(file).map_err(|source| Error::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let size = meta.len();
        if size > PER_FILE_LIMIT {
            self.selection.remove(&key);
            warn!(target: "core::local", "rejecting {} ({} bytes)", key, size);
            return Err(Error::PerFileSizeExceeded {
                path: key,
                size,
                limit: PER_FILE_LIMIT,
            });
        }
        if !self.filter.matches(&key) {
            debug!(target: "core::local", "filtered out {}", key);
            return Ok(AddOutcome::Filtered);
        }
        let bytes = fs::read(file).map_err(|source| Error::Read {
            path: file.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let replaced = self.selection.insert(SelectedFile {
            path: key,
            content,
            size,
            origin: Origin::Local(file.to_path_buf()),
        });
        Ok(if replaced.is_some() {
            AddOutcome::Replaced
        } else {
            AddOutcome::Added
        })
    }

    // Walks `root` recursively in file-name order. Keys are relative to
    // `root` and joined with `/`.
    pub fn add_directory(&mut self, root: &Path) -> AddReport {
        let mut report = AddReport::default();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir() && is_ignored_dir(&e.file_name().to_string_lossy()))
            });
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    warn!(target: "core::local", "walk error under {}: {}", root.display(), e);
                    report.errors.push(Error::Read {
                        path,
                        source: e.into(),
                    });
                    continue;
                }
            };
            let ft = entry.file_type();
            if ft.is_dir() {
                continue;
            }
            // Links are never descended. A file link is read through; a
            // dangling one fails in add_entry.
            if ft.is_symlink() && entry.path().is_dir() {
                debug!(target: "core::local", "not following dir link {}", entry.path().display());
                continue;
            }
            let key = relative_key(root, entry.path());
            report.record(self.add_entry(entry.path(), Some(&key)));
        }
        info!(
            target: "core::local",
            "added {} from {} (filtered {}, errors {})",
            report.accepted(),
            root.display(),
            report.filtered,
            report.errors.len()
        );
        report
    }

    pub fn add_path(&mut self, path: &Path) -> AddReport {
        if path.is_dir() {
            return self.add_directory(path);
        }
        let mut report = AddReport::default();
        report.record(self.add_entry(path, None));
        report
    }

    pub fn add_dropped(&mut self, pasted: &str) -> AddReport {
        let mut report = AddReport::default();
        for path in parse_dropped_paths(pasted) {
            report.merge(self.add_path(&path));
        }
        report
    }

    pub fn remove_entry(&mut self, path: &str) -> bool {
        self.selection.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    pub fn formatted(&self, allow_oversize: bool) -> Result<String> {
        self.selection.formatted(allow_oversize)
    }
}

fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    let mut tokens: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some('"') if ch == '\\' && matches!(chars.peek(), Some('"') | Some('\\')) => {
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            Some(_) => cur.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_token = true;
                }
                '\\' if chars.peek().is_some_and(|n| is_escapable(*n)) => {
                    if let Some(next) = chars.next() {
                        cur.push(next);
                    }
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut cur));
                        in_token = false;
                    }
                }
                c => {
                    cur.push(c);
                    in_token = true;
                }
            },
        }
    }
    if in_token {
        tokens.push(cur);
    }
    tokens
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.starts_with("file://") {
                if let Some(p) = Url::parse(&t).ok().and_then(|u| u.to_file_path().ok()) {
                    return p;
                }
            }
            PathBuf::from(t)
        })
        .collect()
}

fn is_escapable(c: char) -> bool {
    c.is_whitespace() || "\\'\"()[]{}&;$!*?#<>|`~".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let p = dir.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, content).unwrap();
    }

    fn paths(c: &LocalCollector) -> Vec<String> {
        c.selection().iter().map(|f| f.path.clone()).collect()
    }

    #[test]
    fn walks_directory_with_relative_slash_paths() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/main.rs", "fn main() {}");
        write(tmp.path(), "src/util/mod.rs", "pub fn x() {}");
        write(tmp.path(), "Cargo.toml", "[package]");
        write(tmp.path(), "node_modules/dep/index.js", "x");
        write(tmp.path(), ".git/HEAD", "ref");
        write(tmp.path(), "__pycache__/a.pyc", "x");

        let mut c = LocalCollector::new("");
        let report = c.add_directory(tmp.path());

        assert_eq!(report.added, 3);
        assert!(report.errors.is_empty());
        assert_eq!(paths(&c), ["Cargo.toml", "src/main.rs", "src/util/mod.rs"]);
        assert_eq!(
            c.selection().get("src/main.rs").map(|f| f.content.as_str()),
            Some("fn main() {}")
        );
    }

    #[test]
    fn ignore_list_is_exact_match() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Node_Modules/keep.js", "x");
        write(tmp.path(), "venv2/keep.py", "x");
        write(tmp.path(), "venv/skip.py", "x");

        let mut c = LocalCollector::new("");
        c.add_directory(tmp.path());
        assert_eq!(paths(&c), ["Node_Modules/keep.js", "venv2/keep.py"]);
    }

    #[test]
    fn extension_filter_applies_to_walk() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/app.js", "js");
        write(tmp.path(), "tool.py", "py");
        write(tmp.path(), "README.md", "md");

        let mut c = LocalCollector::new(".py,.js");
        let report = c.add_directory(tmp.path());
        assert_eq!(report.filtered, 1);
        assert_eq!(paths(&c), ["src/app.js", "tool.py"]);
    }

    #[test]
    fn single_file_uses_name_or_explicit_path() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "deep/nested/a.txt", "a");
        let file = tmp.path().join("deep/nested/a.txt");

        let mut c = LocalCollector::new("");
        assert_eq!(c.add_entry(&file, None).unwrap(), AddOutcome::Added);
        assert_eq!(c.add_entry(&file, Some("nested/a.txt")).unwrap(), AddOutcome::Added);
        assert_eq!(c.add_entry(&file, None).unwrap(), AddOutcome::Replaced);
        assert_eq!(paths(&c), ["a.txt", "nested/a.txt"]);
    }

    #[test]
    fn oversized_file_is_rejected_and_evicts_previous_entry() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "big.bin", "small at first");
        let file = tmp.path().join("big.bin");

        let mut c = LocalCollector::new(".txt");
        c.set_filter("");
        c.add_entry(&file, None).unwrap();
        assert_eq!(c.selection().len(), 1);

        fs::write(&file, vec![b'x'; PER_FILE_LIMIT as usize + 1]).unwrap();
        c.set_filter(".nomatch");
        match c.add_entry(&file, None) {
            Err(Error::PerFileSizeExceeded { path, size, .. }) => {
                assert_eq!(path, "big.bin");
                assert_eq!(size, PER_FILE_LIMIT + 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(c.selection().is_empty());
    }

    #[test]
    fn oversized_file_inside_directory_does_not_stop_walk() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.txt", "a");
        fs::write(tmp.path().join("b.txt"), vec![b'x'; PER_FILE_LIMIT as usize + 1]).unwrap();
        write(tmp.path(), "c.txt", "c");

        let mut c = LocalCollector::new("");
        let report = c.add_directory(tmp.path());
        assert_eq!(report.added, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(paths(&c), ["a.txt", "c.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn linked_files_inside_directory_are_read_through() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        write(&root, "a.rs", "a");
        write(tmp.path(), "outside/real.rs", "real");
        write(tmp.path(), "outside/sub/x.rs", "x");
        symlink(tmp.path().join("outside/real.rs"), root.join("link.rs")).unwrap();
        symlink(tmp.path().join("outside/sub"), root.join("linkdir")).unwrap();
        symlink(tmp.path().join("missing.rs"), root.join("dangling.rs")).unwrap();

        let mut c = LocalCollector::new("");
        let report = c.add_directory(&root);
        assert_eq!(report.added, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], Error::Read { .. }));
        assert_eq!(paths(&c), ["a.rs", "link.rs"]);
        assert_eq!(
            c.selection().get("link.rs").map(|f| f.content.as_str()),
            Some("real")
        );
    }

    #[test]
    fn binary_content_is_coerced_to_text() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("blob.dat");
        fs::write(&file, [0x66, 0x6f, 0xff, 0x6f]).unwrap();

        let mut c = LocalCollector::new("");
        c.add_entry(&file, None).unwrap();
        let f = c.selection().get("blob.dat").unwrap();
        assert_eq!(f.size, 4);
        assert_eq!(f.content, "fo\u{fffd}o");
    }

    #[test]
    fn remove_and_clear() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.txt", "a");
        write(tmp.path(), "b.txt", "b");
        let mut c = LocalCollector::new("");
        c.add_directory(tmp.path());

        assert!(c.remove_entry("a.txt"));
        assert!(!c.remove_entry("a.txt"));
        assert_eq!(paths(&c), ["b.txt"]);
        c.clear();
        assert!(c.selection().is_empty());
    }

    #[test]
    fn missing_path_reports_read_error() {
        let mut c = LocalCollector::new("");
        let report = c.add_path(Path::new("/definitely/not/here.txt"));
        assert_eq!(report.accepted(), 0);
        assert!(matches!(report.errors.as_slice(), [Error::Read { .. }]));
    }

    #[test]
    fn dropped_paths_parsing() {
        assert_eq!(
            parse_dropped_paths("'/tmp/my file.rs' /tmp/other.rs\n"),
            vec![PathBuf::from("/tmp/my file.rs"), PathBuf::from("/tmp/other.rs")]
        );
        assert_eq!(
            parse_dropped_paths(r#"/tmp/a\ b.txt "/tmp/q \"x\".txt""#),
            vec![PathBuf::from("/tmp/a b.txt"), PathBuf::from("/tmp/q \"x\".txt")]
        );
        assert_eq!(parse_dropped_paths("  \n "), Vec::<PathBuf>::new());
    }

    #[cfg(unix)]
    #[test]
    fn dropped_file_uri_is_decoded() {
        assert_eq!(
            parse_dropped_paths("file:///tmp/with%20space.rs"),
            vec![PathBuf::from("/tmp/with space.rs")]
        );
    }

    #[test]
    fn dropped_text_goes_through_same_validation() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "proj/lib.rs", "lib");
        write(tmp.path(), "proj/notes.md", "md");
        write(tmp.path(), "single.rs", "single");

        let mut c = LocalCollector::new(".rs");
        let pasted = format!(
            "'{}' '{}'",
            tmp.path().join("proj").display(),
            tmp.path().join("single.rs").display()
        );
        let report = c.add_dropped(&pasted);
        assert_eq!(report.added, 2);
        assert_eq!(report.filtered, 1);
        assert_eq!(paths(&c), ["lib.rs", "single.rs"]);
    }
}
