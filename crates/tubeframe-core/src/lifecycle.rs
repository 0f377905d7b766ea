//! Host lifecycle binding
//!
//! The host container (window, activity, view) reports foreground/background
//! and teardown through a [`LifecycleSource`]. A bound [`crate::Player`]
//! translates them: `Resume -> play`, `Pause -> pause`, `Destroy -> release`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle signal from the host container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Resume,
    Pause,
    Destroy,
}

/// Subscription handle returned by [`LifecycleSource::subscribe`]
pub type SubscriptionId = u64;

/// Receives lifecycle signals
pub trait LifecycleObserver: Send + Sync {
    fn on_lifecycle_event(&self, event: LifecycleEvent);
}

/// Something that emits lifecycle signals
pub trait LifecycleSource: Send + Sync {
    fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// A plain in-process [`LifecycleSource`] the host drives with [`emit`](Self::emit)
#[derive(Default)]
pub struct LifecycleRegistry {
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn LifecycleObserver>)>>,
    next_id: AtomicU64,
    unsubscribe_calls: AtomicU64,
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every current observer. Observers may unsubscribe while being
    /// notified.
    pub fn emit(&self, event: LifecycleEvent) {
        let observers: Vec<Arc<dyn LifecycleObserver>> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        debug!(?event, observers = observers.len(), "Lifecycle event");
        for observer in observers {
            observer.on_lifecycle_event(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Total `unsubscribe` calls received, including ones for unknown ids
    pub fn unsubscribe_calls(&self) -> u64 {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }
}

impl LifecycleSource for LifecycleRegistry {
    fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().push((id, observer));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.observers.lock().retain(|(existing, _)| *existing != id);
    }
}

/// An active subscription; dropping it does nothing, call [`unbind`](Self::unbind)
pub(crate) struct LifecycleBinding {
    source: Arc<dyn LifecycleSource>,
    id: SubscriptionId,
}

impl LifecycleBinding {
    pub(crate) fn bind(source: Arc<dyn LifecycleSource>, observer: Arc<dyn LifecycleObserver>) -> Self {
        let id = source.subscribe(observer);
        Self { source, id }
    }

    pub(crate) fn unbind(self) {
        self.source.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LifecycleEvent>>,
    }

    impl LifecycleObserver for Recorder {
        fn on_lifecycle_event(&self, event: LifecycleEvent) {
            self.events.lock().push(event);
        }
    }

    #[test]
    fn test_emit_reaches_subscribers() {
        let registry = LifecycleRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.subscribe(recorder.clone());

        registry.emit(LifecycleEvent::Resume);
        registry.emit(LifecycleEvent::Pause);

        assert_eq!(*recorder.events.lock(), vec![LifecycleEvent::Resume, LifecycleEvent::Pause]);
    }

    #[test]
    fn test_unsubscribed_observer_is_silent() {
        let registry = LifecycleRegistry::new();
        let recorder = Arc::new(Recorder::default());
        let id = registry.subscribe(recorder.clone());
        registry.unsubscribe(id);

        registry.emit(LifecycleEvent::Destroy);
        assert!(recorder.events.lock().is_empty());
        assert_eq!(registry.observer_count(), 0);
        assert_eq!(registry.unsubscribe_calls(), 1);
    }

    #[test]
    fn test_binding_unbinds_once() {
        let registry = Arc::new(LifecycleRegistry::new());
        let binding = LifecycleBinding::bind(registry.clone(), Arc::new(Recorder::default()));
        assert_eq!(registry.observer_count(), 1);

        binding.unbind();
        assert_eq!(registry.observer_count(), 0);
        assert_eq!(registry.unsubscribe_calls(), 1);
    }
}
