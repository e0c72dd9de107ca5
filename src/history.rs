//! Dedup window store.
//!
//! Remembers which canonical URLs were delivered and when, so an article is
//! not sent twice within the window. The history lives in a JSON object
//! mapping URL to epoch seconds:
//!
//! ```text
//! {
//!   "https://ru.investing.com/news/stock-market-news/article-1001": 1731000000
//! }
//! ```
//!
//! Reading never fails: a missing, unreadable or malformed file is an empty
//! history. Writing goes to a sibling `.tmp` file under an exclusive lock and
//! is renamed over the live file, so readers see either the old or the new
//! state. A failed write is logged and the previous file stays authoritative.
//!
//! Two overlapping runs can still read the same state and deliver the same
//! item twice; keeping runs from overlapping is the scheduler's job.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

use crate::error::HistoryError;
use crate::models::{CanonicalUrl, EpochSeconds};

/// Delivered URLs and the time each was last delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupHistory {
    entries: BTreeMap<CanonicalUrl, EpochSeconds>,
}

impl DedupHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this history without entries older than `window_seconds`.
    pub fn prune(&self, now: EpochSeconds, window_seconds: i64) -> DedupHistory {
        DedupHistory {
            entries: self
                .entries
                .iter()
                .filter(|(_, ts)| now.saturating_sub(**ts) <= window_seconds)
                .map(|(url, ts)| (url.clone(), *ts))
                .collect(),
        }
    }

    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.entries.contains_key(url)
    }

    /// Insert or overwrite the delivery time for `url`.
    pub fn record(&mut self, url: CanonicalUrl, now: EpochSeconds) {
        self.entries.insert(url, now);
    }

    pub fn get(&self, url: &CanonicalUrl) -> Option<EpochSeconds> {
        self.entries.get(url).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CanonicalUrl, EpochSeconds)> {
        self.entries.iter().map(|(url, ts)| (url, *ts))
    }

    /// Build a history from arbitrary JSON, keeping only `url -> integer` entries.
    ///
    /// Keys that canonicalize to the same URL keep the latest timestamp.
    fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        let mut entries = BTreeMap::new();
        for (url, ts) in map {
            let Some(ts) = ts.as_i64() else {
                continue;
            };
            entries
                .entry(CanonicalUrl::new(&url))
                .and_modify(|seen: &mut EpochSeconds| *seen = (*seen).max(ts))
                .or_insert(ts);
        }
        Self { entries }
    }

    fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(url, ts)| (url.to_string(), Value::from(*ts)))
                .collect(),
        )
    }
}

/// File-backed persistence for [`DedupHistory`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read the history; any problem yields an empty history.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub fn load(&self) -> DedupHistory {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "History not readable; starting empty");
                return DedupHistory::new();
            }
        };
        if raw.trim().is_empty() {
            return DedupHistory::new();
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => DedupHistory::from_value(value),
            Err(e) => {
                warn!(error = %e, "History file is not valid JSON; starting empty");
                DedupHistory::new()
            }
        }
    }

    /// Persist the history atomically. Returns whether the write landed.
    ///
    /// Failures are logged, never propagated: the previous file remains the
    /// state the next run starts from.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display(), entries = history.len()))]
    pub fn save_atomic(&self, history: &DedupHistory) -> bool {
        match self.write_atomic(history) {
            Ok(()) => {
                info!(entries = history.len(), "History saved");
                true
            }
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "Failed to save history; previous state kept");
                let _ = fs::remove_file(self.tmp_path());
                false
            }
        }
    }

    fn write_atomic(&self, history: &DedupHistory) -> Result<(), HistoryError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let payload = serde_json::to_string_pretty(&history.to_value())?;

        let tmp = self.tmp_path();
        let mut file: File = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        file.lock()?;
        let written = file
            .write_all(payload.as_bytes())
            .and_then(|_| file.flush())
            .and_then(|_| file.sync_all());
        file.unlock()?;
        written?;
        drop(file);

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: i64 = 3600;
    const NOW: i64 = 1_731_000_000;

    fn url(path: &str) -> CanonicalUrl {
        CanonicalUrl::new(&format!("https://site.test{path}"))
    }

    #[test]
    fn test_prune_drops_only_entries_outside_window() {
        let mut history = DedupHistory::new();
        history.record(url("/news/fresh"), NOW - HOUR);
        history.record(url("/news/edge"), NOW - 24 * HOUR);
        history.record(url("/news/stale"), NOW - 24 * HOUR - 1);

        let pruned = history.prune(NOW, 24 * HOUR);
        assert!(pruned.contains(&url("/news/fresh")));
        assert!(pruned.contains(&url("/news/edge")));
        assert!(!pruned.contains(&url("/news/stale")));
        for (_, ts) in pruned.iter() {
            assert!(NOW - ts <= 24 * HOUR);
        }
        // The input is left untouched.
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_record_overwrites() {
        let mut history = DedupHistory::new();
        history.record(url("/news/a"), 10);
        history.record(url("/news/a/"), 20);
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(&url("/news/a")), Some(20));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_malformed_content_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::new(&path);

        for content in ["{not json", "", "   ", "[1, 2, 3]", "\"text\"", "null"] {
            fs::write(&path, content).unwrap();
            assert!(store.load().is_empty(), "expected empty for {content:?}");
        }
    }

    #[test]
    fn test_load_skips_non_integer_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"{"https://site.test/news/a": 1731000000, "https://site.test/news/b": "soon", "http://site.test/news/c/": 5}"#,
        )
        .unwrap();

        let history = HistoryStore::new(&path).load();
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(&url("/news/a")), Some(1_731_000_000));
        assert_eq!(history.get(&url("/news/c")), Some(5));
    }

    #[test]
    fn test_load_merges_spellings_of_the_same_url() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        for content in [
            r#"{"http://site.test/news/a/": 300, "https://site.test/news/a": 100, "https://site.test/news/a#c": 200}"#,
            r#"{"https://site.test/news/a#c": 200, "https://site.test/news/a": 100, "http://site.test/news/a/": 300}"#,
        ] {
            fs::write(&path, content).unwrap();
            let history = HistoryStore::new(&path).load();
            assert_eq!(history.len(), 1);
            assert_eq!(history.get(&url("/news/a")), Some(300), "{content}");
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("history.json");
        let store = HistoryStore::new(&path);

        let mut history = DedupHistory::new();
        history.record(url("/news/a"), NOW);
        assert!(store.save_atomic(&history));

        assert_eq!(store.load(), history);
        assert!(!store.tmp_path().exists());
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"https://site.test/news/a\": 1731000000"));
    }

    #[test]
    fn test_save_failure_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();

        let store = HistoryStore::new(blocker.join("history.json"));
        let mut history = DedupHistory::new();
        history.record(url("/news/a"), NOW);

        assert!(!store.save_atomic(&history));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "file");
    }
}
