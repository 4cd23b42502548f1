use std::{collections::BTreeMap, fs, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use dsc_core::settings::KvStore;
use tracing::warn;

pub fn storage_path() -> Option<PathBuf> {
    let base = BaseDirs::new()?;
    Some(base.config_dir().join("dscoder").join("storage.json"))
}

// String map persisted as one JSON object. Every write rewrites the file
// through a temp file and a rename. Without a path it only lives in memory.
#[derive(Debug, Default)]
pub struct FileStore {
    path: Option<PathBuf>,
    map: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let map = if path.exists() {
            let data =
                fs::read(&path).with_context(|| format!("read storage file: {}", path.display()))?;
            serde_json::from_slice(&data).with_context(|| "parse storage json")?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            map,
        })
    }

    pub fn open_default() -> Self {
        let Some(path) = storage_path() else {
            return Self::default();
        };
        match Self::open(path.clone()) {
            Ok(s) => s,
            Err(e) => {
                warn!(target: "tui", "storage unreadable, starting empty: {:#}", e);
                Self {
                    path: Some(path),
                    map: BTreeMap::new(),
                }
            }
        }
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        let data = serde_json::to_vec_pretty(&self.map)?;
        let mut tmp = path.clone();
        tmp.set_extension("json.tmp");
        {
            let mut f =
                fs::File::create(&tmp).with_context(|| format!("create tmp: {}", tmp.display()))?;
            f.write_all(&data)?;
            f.flush()?;
        }
        fs::rename(tmp, path).with_context(|| format!("persist storage to {}", path.display()))?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> dsc_core::Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        self.flush()
            .map_err(|e| dsc_core::Error::Storage(format!("{:#}", e)))
    }

    fn remove(&mut self, key: &str) -> dsc_core::Result<()> {
        if self.map.remove(key).is_some() {
            self.flush()
                .map_err(|e| dsc_core::Error::Storage(format!("{:#}", e)))?;
        }
        Ok(())
    }
}
