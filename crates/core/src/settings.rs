use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

pub const KEY_API_KEY: &str = "apiKey";
pub const KEY_MODEL: &str = "model";
pub const KEY_TEMPERATURE: &str = "temperature";
pub const KEY_MAX_TOKENS: &str = "maxTokens";
pub const KEY_THEME: &str = "theme";
pub const KEY_LANGUAGE: &str = "language";
pub const KEY_HISTORY: &str = "history";

pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::En => "en",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ru" => Some(Language::Ru),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::Ru => Language::En,
            Language::En => Language::Ru,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub theme: Theme,
    pub language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            theme: Theme::default(),
            language: Language::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub request: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

pub struct SettingsStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    // Absent or unparsable values fall back to their defaults.
    pub fn settings(&self) -> Settings {
        let d = Settings::default();
        let get = |k: &str| self.store.get(k).filter(|v| !v.is_empty());
        Settings {
            api_key: self.store.get(KEY_API_KEY).unwrap_or_default(),
            model: get(KEY_MODEL).unwrap_or(d.model),
            temperature: get(KEY_TEMPERATURE)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|t| t.is_finite())
                .unwrap_or(d.temperature),
            max_tokens: get(KEY_MAX_TOKENS)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(d.max_tokens),
            theme: get(KEY_THEME).and_then(|v| Theme::parse(&v)).unwrap_or(d.theme),
            language: get(KEY_LANGUAGE)
                .and_then(|v| Language::parse(&v))
                .unwrap_or(d.language),
        }
    }

    pub fn save(&mut self, s: &Settings) -> Result<()> {
        self.store.set(KEY_API_KEY, &s.api_key)?;
        self.store.set(KEY_MODEL, &s.model)?;
        self.store.set(KEY_TEMPERATURE, &s.temperature.to_string())?;
        self.store.set(KEY_MAX_TOKENS, &s.max_tokens.to_string())?;
        self.store.set(KEY_THEME, s.theme.as_str())?;
        self.store.set(KEY_LANGUAGE, s.language.as_str())?;
        Ok(())
    }

    // Oldest first. A corrupt stored list reads as empty.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.store.get(KEY_HISTORY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(h) => h,
            Err(e) => {
                warn!(target: "core::settings", "ignoring unreadable history: {}", e);
                Vec::new()
            }
        }
    }

    pub fn record(&mut self, request: &str, response: &str) -> Result<HistoryEntry> {
        self.record_at(request, response, Utc::now())
    }

    pub fn record_at(&mut self, request: &str, response: &str, timestamp: DateTime<Utc>) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            request: request.to_string(),
            response: response.to_string(),
            timestamp,
        };
        let mut all = self.history();
        all.push(entry.clone());
        let raw = serde_json::to_string(&all).map_err(|e| Error::Storage(e.to_string()))?;
        self.store.set(KEY_HISTORY, &raw)?;
        Ok(entry)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.store.remove(KEY_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_when_empty() {
        let s = SettingsStore::new(MemoryStore::default()).settings();
        assert_eq!(s, Settings::default());
        assert_eq!(s.temperature, 0.7);
        assert_eq!(s.max_tokens, 2048);
        assert_eq!(s.model, "deepseek-chat");
        assert_eq!(s.theme, Theme::Light);
        assert_eq!(s.language, Language::Ru);
    }

    #[test]
    fn save_then_load() {
        let mut st = SettingsStore::new(MemoryStore::default());
        let s = Settings {
            api_key: "sk-1".into(),
            model: "deepseek-coder".into(),
            temperature: 0.0,
            max_tokens: 4096,
            theme: Theme::Dark,
            language: Language::En,
        };
        st.save(&s).unwrap();
        assert_eq!(st.settings(), s);
        assert_eq!(st.into_inner().get(KEY_THEME).as_deref(), Some("dark"));
    }

    #[test]
    fn garbage_values_fall_back() {
        let mut kv = MemoryStore::default();
        kv.set(KEY_TEMPERATURE, "warm").unwrap();
        kv.set(KEY_MAX_TOKENS, "-3").unwrap();
        kv.set(KEY_THEME, "purple").unwrap();
        kv.set(KEY_MODEL, "").unwrap();
        let s = SettingsStore::new(kv).settings();
        assert_eq!(s.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(s.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(s.theme, Theme::Light);
        assert_eq!(s.model, DEFAULT_MODEL);
    }

    #[test]
    fn history_appends_in_order_and_clears() {
        let mut st = SettingsStore::new(MemoryStore::default());
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        st.record_at("q1", "a1", t0).unwrap();
        st.record("q2", "a2").unwrap();

        let h = st.history();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].request, "q1");
        assert_eq!(h[0].timestamp, t0);
        assert_eq!(h[1].response, "a2");

        st.clear_history().unwrap();
        assert!(st.history().is_empty());
    }

    #[test]
    fn corrupt_history_reads_empty() {
        let mut kv = MemoryStore::default();
        kv.set(KEY_HISTORY, "{not json").unwrap();
        let mut st = SettingsStore::new(kv);
        assert!(st.history().is_empty());
        st.record("q", "a").unwrap();
        assert_eq!(st.history().len(), 1);
    }
}
