//! Broadcaster implementation.
//!
//! Provides the typed [`Channel`] and the [`EventBroadcaster`] that groups
//! the client's three channels.

use parking_lot::Mutex;
use std::sync::Arc;

use super::events::{BedLevelEvent, EventCategory, TelemetrySample};

/// A registered callback
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Append-only list of listeners for one payload type
pub struct Channel<T> {
    category: EventCategory,
    listeners: Mutex<Vec<Listener<T>>>,
}

impl<T> Channel<T> {
    /// Create an empty channel
    pub fn new(category: EventCategory) -> Self {
        Self {
            category,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Append a listener
    ///
    /// Listeners cannot be removed; they live as long as the channel.
    pub fn register<F>(&self, listener: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock();
        listeners.push(Arc::new(listener));
        tracing::trace!("{} listener #{} registered", self.category, listeners.len());
    }

    /// Deliver `payload` to every listener registered so far
    ///
    /// The listener list is copied under the lock and called after it is
    /// released, so a listener may register further listeners; those only
    /// see later emissions. Returns the number of listeners called.
    pub fn emit(&self, payload: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self.listeners.lock().clone();
        for listener in &snapshot {
            listener(payload);
        }
        snapshot.len()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// The category this channel carries
    pub fn category(&self) -> EventCategory {
        self.category
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("category", &self.category)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// The client's log, telemetry and bed-level channels
#[derive(Debug)]
pub struct EventBroadcaster {
    /// Raw serial traffic, verbatim, plus read-error notices.
    pub log: Channel<String>,
    /// Temperature samples, only while monitoring is enabled.
    pub telemetry: Channel<TelemetrySample>,
    /// Bed-leveling session events.
    pub bed_level: Channel<BedLevelEvent>,
}

impl EventBroadcaster {
    /// Create a broadcaster with no listeners
    pub fn new() -> Self {
        Self {
            log: Channel::new(EventCategory::Log),
            telemetry: Channel::new(EventCategory::Telemetry),
            bed_level: Channel::new(EventCategory::BedLevel),
        }
    }

    /// Number of listeners on the channel for `category`
    pub fn listener_count(&self, category: EventCategory) -> usize {
        match category {
            EventCategory::Log => self.log.listener_count(),
            EventCategory::Telemetry => self.telemetry.listener_count(),
            EventCategory::BedLevel => self.bed_level.listener_count(),
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
