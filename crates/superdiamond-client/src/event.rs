//! Change notifications raised when a pushed snapshot alters the store.
//!
//! Listeners run synchronously on the reload thread, in registration order,
//! and only see events fired after they registered.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Kind of change applied to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The key was not present before.
    Add,
    /// The key held a different value before.
    Update,
    /// The key was removed by a blank value; only raised under
    /// [`BlankValuePolicy::Remove`](superdiamond_config::BlankValuePolicy::Remove).
    Remove,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        };
        formatter.write_str(label)
    }
}

/// A single key change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened to the key.
    pub kind: ChangeKind,
    /// Affected key.
    pub key: String,
    /// Value carried by the snapshot that caused the change.
    pub value: String,
}

impl ChangeEvent {
    /// Builds an event.
    #[must_use]
    pub fn new(kind: ChangeKind, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Selects which events a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event.
    Any,
    /// Only events of one kind.
    Kind(ChangeKind),
}

impl EventFilter {
    fn matches(self, kind: ChangeKind) -> bool {
        match self {
            Self::Any => true,
            Self::Kind(wanted) => wanted == kind,
        }
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Registration {
    id: ListenerId,
    filter: EventFilter,
    listener: Listener,
}

/// Registry of change listeners.
#[derive(Default)]
pub struct EventSource {
    next_id: AtomicU64,
    registrations: RwLock<Vec<Registration>>,
}

impl EventSource {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events matching `filter`.
    pub fn add_listener<F>(&self, filter: EventFilter, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations.write().push(Registration {
            id,
            filter,
            listener: Arc::new(listener),
        });
        id
    }

    /// Removes a listener; returns `false` when it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registrations = self.registrations.write();
        let before = registrations.len();
        registrations.retain(|registration| registration.id != id);
        registrations.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registrations.read().len()
    }

    /// Invokes every listener whose filter matches `event`.
    ///
    /// The registry lock is released before listeners run, so a listener may
    /// add or remove listeners; such changes apply from the next event.
    pub fn fire(&self, event: &ChangeEvent) {
        let matching: Vec<Listener> = self
            .registrations
            .read()
            .iter()
            .filter(|registration| registration.filter.matches(event.kind))
            .map(|registration| Arc::clone(&registration.listener))
            .collect();
        for listener in matching {
            listener(event);
        }
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EventSource")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
