//! History and watchlist persistence.
//!
//! In-memory lists behind a mutex, written through to JSON files after each
//! mutation. This mirrors the browser-storage model the data originally
//! lived in: single writer, last write wins, reads never block on I/O.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::constants::store::{HISTORY_FILE, WATCHLIST_FILE};
use crate::models::{AnalysisRecord, WatchlistEntry};

/// Dashboard counters derived from the two lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub watchlist_count: usize,
    pub analysis_count: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
}

#[derive(Clone)]
pub struct AnalysisStore {
    history: Arc<Mutex<Vec<AnalysisRecord>>>,
    watchlist: Arc<Mutex<Vec<WatchlistEntry>>>,
    data_dir: PathBuf,
    pub history_limit: usize,
}

impl AnalysisStore {
    /// Open the store, loading whatever the data directory already holds.
    /// Missing or unreadable files start the corresponding list empty.
    pub fn new(data_dir: impl AsRef<Path>, history_limit: usize) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let history = load_list(&data_dir.join(HISTORY_FILE));
        let watchlist = load_list(&data_dir.join(WATCHLIST_FILE));

        Self {
            history: Arc::new(Mutex::new(history)),
            watchlist: Arc::new(Mutex::new(watchlist)),
            data_dir,
            history_limit,
        }
    }

    /// Prepend a record, evicting the oldest entries past the cap.
    pub fn add_to_history(&self, record: AnalysisRecord) {
        let mut history = self.history.lock().unwrap();
        history.insert(0, record);
        history.truncate(self.history_limit);
        self.persist(HISTORY_FILE, &history);
    }

    pub fn remove_from_history(&self, index: usize) -> Option<AnalysisRecord> {
        let mut history = self.history.lock().unwrap();
        if index >= history.len() {
            return None;
        }
        let removed = history.remove(index);
        self.persist(HISTORY_FILE, &history);
        Some(removed)
    }

    pub fn clear_history(&self) {
        let mut history = self.history.lock().unwrap();
        history.clear();
        self.persist(HISTORY_FILE, &history);
    }

    pub fn history(&self) -> Vec<AnalysisRecord> {
        self.history.lock().unwrap().clone()
    }

    /// Add an entry unless its (symbol, market) pair is already present.
    /// Returns false on the duplicate no-op.
    pub fn add_to_watchlist(&self, entry: WatchlistEntry) -> bool {
        let mut watchlist = self.watchlist.lock().unwrap();
        let duplicate = watchlist
            .iter()
            .any(|existing| existing.symbol == entry.symbol && existing.market == entry.market);
        if duplicate {
            warn!(
                "{} ({}) is already on the watchlist",
                entry.symbol, entry.market
            );
            return false;
        }
        watchlist.push(entry);
        self.persist(WATCHLIST_FILE, &watchlist);
        true
    }

    pub fn remove_from_watchlist(&self, index: usize) -> Option<WatchlistEntry> {
        let mut watchlist = self.watchlist.lock().unwrap();
        if index >= watchlist.len() {
            return None;
        }
        let removed = watchlist.remove(index);
        self.persist(WATCHLIST_FILE, &watchlist);
        Some(removed)
    }

    pub fn watchlist(&self) -> Vec<WatchlistEntry> {
        self.watchlist.lock().unwrap().clone()
    }

    /// Dashboard counters. Buy/sell signals are counted by recommendation
    /// substring, matching the loose phrasing the decision stage returns.
    pub fn stats(&self) -> StoreStats {
        let history = self.history.lock().unwrap();
        let watchlist = self.watchlist.lock().unwrap();

        let mut buy_signals = 0;
        let mut sell_signals = 0;
        for record in history.iter() {
            let recommendation = record.recommendation();
            if recommendation.contains('買') {
                buy_signals += 1;
            }
            if recommendation.contains('賣') {
                sell_signals += 1;
            }
        }

        StoreStats {
            watchlist_count: watchlist.len(),
            analysis_count: history.len(),
            buy_signals,
            sell_signals,
        }
    }

    /// Write-through. Storage is treated as always succeeding; an I/O
    /// failure costs durability, not the in-memory result.
    fn persist<T: Serialize>(&self, file: &str, list: &[T]) {
        if let Err(err) = fs::create_dir_all(&self.data_dir) {
            warn!("failed to create data dir {:?}: {}", self.data_dir, err);
            return;
        }
        let path = self.data_dir.join(file);
        match serde_json::to_string_pretty(list) {
            Ok(json) => {
                if let Err(err) = fs::write(&path, json) {
                    warn!("failed to write {:?}: {}", path, err);
                }
            }
            Err(err) => warn!("failed to serialize {}: {}", file, err),
        }
    }
}

fn load_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(list) => list,
            Err(err) => {
                warn!("ignoring unreadable {:?}: {}", path, err);
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    }
}
