//! Query history shared between queries of a sequential batch

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A successfully executed question and the SQL that answered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub sql: String,
}

/// Bounded window of recent successful queries.
///
/// Queries receive a copy through [`QueryHistory::snapshot`]; only the batch
/// runner records new entries, after a query has finished.
#[derive(Debug, Clone, Default)]
pub struct QueryHistory {
    window: usize,
    entries: VecDeque<HistoryEntry>,
}

impl QueryHistory {
    /// Keep at most `window` entries. Zero disables history.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            entries: VecDeque::with_capacity(window),
        }
    }

    pub fn record(&mut self, question: impl Into<String>, sql: impl Into<String>) {
        if self.window == 0 {
            return;
        }
        if self.entries.len() == self.window {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            question: question.into(),
            sql: sql.into(),
        });
    }

    /// Oldest-first copy of the current window.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
