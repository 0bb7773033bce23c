//! The in-memory key/value store and its diff-and-apply step.
//!
//! Reads and the single writer (the reload thread) meet in a sharded
//! concurrent map: each key is replaced atomically, but a reader may observe
//! a snapshot that is only partly applied.

use std::collections::BTreeMap;

use dashmap::DashMap;
use superdiamond_config::BlankValuePolicy;

use crate::event::{ChangeEvent, ChangeKind};

/// Whether a load is the initial one or a live update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadMode {
    /// Initial load; never raises events.
    Bootstrap,
    /// Pushed update; diffs against current state and raises events.
    Reload,
}

/// Concurrent map from configuration key to value.
#[derive(Debug, Default)]
pub struct VersionedStore {
    entries: DashMap<String, String>,
}

impl VersionedStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of every key and its raw value.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Raw values of every key starting with `<prefix>.`, in map order.
    #[must_use]
    pub fn values_with_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = format!("{prefix}.");
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Applies snapshot pairs in order, handing each change to `emit`.
    ///
    /// Non-blank values are written; blank values never are. Each key is
    /// compared against its value before this pair was applied. Bootstrap
    /// loads emit nothing. Returns the number of events emitted.
    pub(crate) fn apply<F>(
        &self,
        pairs: &[(String, String)],
        mode: LoadMode,
        blank_values: BlankValuePolicy,
        mut emit: F,
    ) -> usize
    where
        F: FnMut(ChangeEvent),
    {
        let mut emitted = 0;
        for (key, value) in pairs {
            let blank = value.trim().is_empty();
            let previous = if !blank {
                self.entries.insert(key.clone(), value.clone())
            } else if blank_values == BlankValuePolicy::Remove {
                self.entries.remove(key).map(|(_, old)| old)
            } else {
                self.get(key)
            };

            if mode == LoadMode::Bootstrap {
                continue;
            }
            if let Some(kind) = classify(previous.as_deref(), value, blank, blank_values) {
                emitted += 1;
                emit(ChangeEvent::new(kind, key.as_str(), value.as_str()));
            }
        }
        emitted
    }
}

fn classify(
    previous: Option<&str>,
    value: &str,
    blank: bool,
    blank_values: BlankValuePolicy,
) -> Option<ChangeKind> {
    let removing = blank && blank_values == BlankValuePolicy::Remove;
    match previous {
        None if removing => None,
        None => Some(ChangeKind::Add),
        Some(_) if removing => Some(ChangeKind::Remove),
        Some(old) if old != value => Some(ChangeKind::Update),
        Some(_) => None,
    }
}
