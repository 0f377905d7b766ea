//! Player listeners and the registry that fans events out to them

use crate::{event::PlayerEvent, player::Player, state::PlayerState};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Observer of player events.
///
/// Every callback is optional; implement only the ones you need. Callbacks run
/// on the transport's delivery task, one event at a time, and receive the
/// player so they can issue commands directly (for example `load_video` from
/// `on_ready`).
pub trait PlayerListener: Send + Sync {
    /// The remote player accepts commands
    fn on_ready(&self, _player: &Player) {}

    fn on_state_change(&self, _player: &Player, _state: PlayerState) {}

    fn on_playback_quality_change(&self, _player: &Player, _quality: &str) {}

    fn on_playback_rate_change(&self, _player: &Player, _rate: &str) {}

    /// Remote player error code, uninterpreted
    fn on_error(&self, _player: &Player, _error: &str) {}

    /// Current playback position in seconds, sampled by the page poller
    fn on_current_second(&self, _player: &Player, _second: f64) {}

    fn on_video_duration(&self, _player: &Player, _duration: f64) {}

    /// 0.0..=1.0
    fn on_video_loaded_fraction(&self, _player: &Player, _fraction: f64) {}

    fn on_video_id(&self, _player: &Player, _video_id: &str) {}
}

/// Invoke the callback matching `event` on a single listener
pub(crate) fn notify(listener: &dyn PlayerListener, player: &Player, event: &PlayerEvent) {
    match event {
        PlayerEvent::Ready => listener.on_ready(player),
        PlayerEvent::StateChange(state) => listener.on_state_change(player, *state),
        PlayerEvent::PlaybackQualityChange(quality) => {
            listener.on_playback_quality_change(player, quality)
        }
        PlayerEvent::PlaybackRateChange(rate) => listener.on_playback_rate_change(player, rate),
        PlayerEvent::Error(code) => listener.on_error(player, code),
        PlayerEvent::CurrentSecond(second) => listener.on_current_second(player, *second),
        PlayerEvent::VideoDuration(duration) => listener.on_video_duration(player, *duration),
        PlayerEvent::VideoLoadedFraction(fraction) => {
            listener.on_video_loaded_fraction(player, *fraction)
        }
        PlayerEvent::VideoId(id) => listener.on_video_id(player, id),
    }
}

/// Ordered, weakly-held set of listeners.
///
/// The registry never keeps a listener alive; the host owns it. Entries whose
/// listener has been dropped are compacted away on the next snapshot.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<Vec<Weak<dyn PlayerListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. The same listener may be registered more than once
    /// and is then notified once per registration.
    pub fn add(&self, listener: &Arc<dyn PlayerListener>) {
        self.entries.lock().push(Arc::downgrade(listener));
    }

    /// Remove the first registration of `listener`. Returns false if it was
    /// not registered.
    pub fn remove(&self, listener: &Arc<dyn PlayerListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut entries = self.entries.lock();
        match entries.iter().position(|entry| entry.as_ptr() as *const () == target) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Live listeners in registration order.
    ///
    /// Dispatch iterates this copy, so listeners added or removed during a
    /// callback take effect from the next event on.
    pub fn snapshot(&self) -> Vec<Arc<dyn PlayerListener>> {
        let mut entries = self.entries.lock();
        entries.retain(|entry| entry.strong_count() > 0);
        entries.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of registrations whose listener is still alive
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
