//! Player facade - the control surface host code talks to
//!
//! Coordinates:
//! - Readiness gate (`Uninitialized -> Loading -> Ready`)
//! - Command forwarding over the [`Transport`]
//! - Inbound event dispatch: cache update, then listener fan-out
//! - `when_ready` continuations
//! - Lifecycle binding and teardown

use crate::{
    command::Command,
    event::PlayerEvent,
    lifecycle::{LifecycleBinding, LifecycleEvent, LifecycleObserver, LifecycleSource},
    listener::{notify, ListenerRegistry, PlayerListener},
    options::PlayerOptions,
    state::{PlaybackSnapshot, PlayerPhase, PlayerState, SessionState},
    transport::Transport,
    Error, Result,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Unique identifier for a player instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type ReadyCallback = Box<dyn FnOnce(&Player) + Send + 'static>;

struct PlayerInner {
    /// Unique session ID
    id: SessionId,
    /// Channel to the embedded runtime
    transport: Box<dyn Transport>,
    /// Registered observers
    listeners: ListenerRegistry,
    /// Last-known values from inbound events
    session: RwLock<SessionState>,
    /// Pending `when_ready` continuations. Held while the phase flips to
    /// `Ready` so a continuation is either queued before or run after.
    ready_waiters: Mutex<Vec<ReadyCallback>>,
    initialized: AtomicBool,
    released: AtomicBool,
    lifecycle: Mutex<Option<LifecycleBinding>>,
}

impl PlayerInner {
    fn shutdown(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(binding) = self.lifecycle.lock().take() {
            binding.unbind();
        }
        self.listeners.clear();
        self.ready_waiters.lock().clear();
        self.session.write().set_phase(PlayerPhase::Released);
        self.transport.release();

        info!(session_id = %self.id, "Player released");
    }
}

impl Drop for PlayerInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Handle to an embedded player.
///
/// Cheap to clone; all clones control the same instance. Every method returns
/// immediately. Results of commands arrive later through listener callbacks.
///
/// ```rust
/// use std::sync::Arc;
/// use tubeframe_core::{MemoryTransport, Player, PlayerEvent, PlayerListener, PlayerOptions};
///
/// struct AutoLoad;
/// impl PlayerListener for AutoLoad {
///     fn on_ready(&self, player: &Player) {
///         player.load_video("uHq9km2E6rk", 0.0);
///     }
/// }
///
/// let transport = Arc::new(MemoryTransport::new());
/// let player = Player::new(transport.clone());
/// let listener: Arc<dyn PlayerListener> = Arc::new(AutoLoad);
/// player.initialize(&listener, PlayerOptions::default()).unwrap();
///
/// transport.emit(PlayerEvent::Ready);
/// assert!(player.is_ready());
/// assert_eq!(player.current_video_id().as_deref(), Some("uHq9km2E6rk"));
/// ```
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl Player {
    /// Create an uninitialized player over `transport`
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            inner: Arc::new(PlayerInner {
                id: SessionId::new(),
                transport: Box::new(transport),
                listeners: ListenerRegistry::new(),
                session: RwLock::new(SessionState::default()),
                ready_waiters: Mutex::new(Vec::new()),
                initialized: AtomicBool::new(false),
                released: AtomicBool::new(false),
                lifecycle: Mutex::new(None),
            }),
        }
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Register `listener`, wire inbound delivery and load the player page.
    ///
    /// Callable once per instance. A second call fails with
    /// [`Error::AlreadyInitialized`]. If the transport cannot be opened the
    /// instance is released and [`Error::TransportInit`] is returned.
    pub fn initialize(&self, listener: &Arc<dyn PlayerListener>, options: PlayerOptions) -> Result<()> {
        if self.inner.released.load(Ordering::SeqCst) {
            return Err(Error::Released);
        }
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        self.inner.listeners.add(listener);
        self.inner.session.write().set_phase(PlayerPhase::Loading);

        let weak: Weak<PlayerInner> = Arc::downgrade(&self.inner);
        self.inner.transport.on_message(Box::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                Player { inner }.dispatch(event);
            }
        }));

        if let Err(e) = self.inner.transport.open(&options) {
            error!(session_id = %self.inner.id, error = %e, "Player initialization failed");
            self.inner.shutdown();
            return Err(e);
        }

        info!(session_id = %self.inner.id, options = %options.encode(), "Player initializing");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Load and play a video.
    ///
    /// The cached video id is updated right away; `onVideoId` confirms it later.
    pub fn load_video(&self, video_id: impl Into<String>, start_seconds: f64) {
        let video_id = video_id.into();
        if self.set_video_id_optimistically(&video_id) {
            self.send(Command::LoadVideo { video_id, start_seconds });
        }
    }

    /// Load a video without starting playback
    pub fn cue_video(&self, video_id: impl Into<String>, start_seconds: f64) {
        let video_id = video_id.into();
        if self.set_video_id_optimistically(&video_id) {
            self.send(Command::CueVideo { video_id, start_seconds });
        }
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Seek to `seconds` from the start
    pub fn seek_to(&self, seconds: f64) {
        self.send(Command::SeekTo { seconds });
    }

    /// Set the volume from a `0.0..=1.0` level. Out-of-range values are
    /// clamped; the remote side receives an integer percent.
    pub fn set_volume(&self, volume: f64) {
        self.send(Command::set_volume(volume));
    }

    fn set_video_id_optimistically(&self, video_id: &str) -> bool {
        if self.inner.released.load(Ordering::SeqCst) {
            debug!(session_id = %self.inner.id, video_id, "Video requested after release; ignored");
            return false;
        }
        self.inner.session.write().video_id = Some(video_id.to_string());
        true
    }

    fn send(&self, command: Command) {
        if self.inner.released.load(Ordering::SeqCst) {
            debug!(session_id = %self.inner.id, command = %command, "Command after release; ignored");
            return;
        }

        let phase = self.inner.session.read().phase;
        if phase != PlayerPhase::Ready {
            debug!(session_id = %self.inner.id, command = %command, %phase, "Command before ready; forwarding best-effort");
        }

        self.inner.transport.send(command);
    }

    // ------------------------------------------------------------------------
    // Readiness
    // ------------------------------------------------------------------------

    /// Run `callback` once the remote player is ready.
    ///
    /// Runs immediately (on the calling thread) if already ready, otherwise on
    /// the delivery task right after the next `onReady` has been dispatched to
    /// listeners. Runs at most once. Dropped without running if the player is
    /// released first.
    pub fn when_ready<F>(&self, callback: F)
    where
        F: FnOnce(&Player) + Send + 'static,
    {
        if self.inner.released.load(Ordering::SeqCst) {
            return;
        }

        let mut waiters = self.inner.ready_waiters.lock();
        if self.inner.session.read().is_ready() {
            drop(waiters);
            callback(self);
        } else {
            waiters.push(Box::new(callback));
        }
    }

    /// True once `onReady` has been received
    pub fn is_ready(&self) -> bool {
        self.inner.session.read().is_ready()
    }

    pub fn phase(&self) -> PlayerPhase {
        self.inner.session.read().phase
    }

    // ------------------------------------------------------------------------
    // Cached accessors
    // ------------------------------------------------------------------------

    /// Last playback position reported by the page, in seconds.
    ///
    /// This is a cache, not a live read; it lags by at most one polling
    /// interval while a video is active.
    pub fn current_time(&self) -> f64 {
        self.inner.session.read().current_time
    }

    /// Last reported duration in seconds; 0.0 until the page reports one
    pub fn duration(&self) -> f64 {
        self.inner.session.read().duration
    }

    /// Last reported playback state
    pub fn player_state(&self) -> PlayerState {
        self.inner.session.read().state
    }

    pub fn loaded_fraction(&self) -> f64 {
        self.inner.session.read().loaded_fraction
    }

    /// Video id, optimistic after `load_video`/`cue_video`, confirmed by `onVideoId`
    pub fn current_video_id(&self) -> Option<String> {
        self.inner.session.read().video_id.clone()
    }

    /// Consistent copy of all cached values
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.session.read().clone()
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    /// Append a listener. The registry holds it weakly; keep the `Arc` alive
    /// for as long as you want callbacks.
    pub fn add_listener(&self, listener: &Arc<dyn PlayerListener>) {
        if self.inner.released.load(Ordering::SeqCst) {
            return;
        }
        self.inner.listeners.add(listener);
    }

    /// Remove the first registration of `listener`
    pub fn remove_listener(&self, listener: &Arc<dyn PlayerListener>) -> bool {
        self.inner.listeners.remove(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Apply one inbound event: update the cache, then notify listeners in
    /// registration order over a snapshot of the registry.
    fn dispatch(&self, event: PlayerEvent) {
        if self.inner.released.load(Ordering::SeqCst) {
            return;
        }

        let is_ready_event = event == PlayerEvent::Ready;
        let changed = if is_ready_event {
            let _gate = self.inner.ready_waiters.lock();
            self.inner.session.write().apply(&event)
        } else {
            self.inner.session.write().apply(&event)
        };

        match &event {
            PlayerEvent::CurrentSecond(_)
            | PlayerEvent::VideoDuration(_)
            | PlayerEvent::VideoLoadedFraction(_) => {
                trace!(session_id = %self.inner.id, event = %event, changed, "Dispatching")
            }
            PlayerEvent::Error(code) => {
                warn!(session_id = %self.inner.id, code = %code, "Remote player error")
            }
            _ => debug!(session_id = %self.inner.id, event = %event, changed, "Dispatching"),
        }

        for listener in self.inner.listeners.snapshot() {
            if self.inner.released.load(Ordering::SeqCst) {
                return;
            }
            notify(listener.as_ref(), self, &event);
        }

        if is_ready_event {
            let waiters = std::mem::take(&mut *self.inner.ready_waiters.lock());
            for callback in waiters {
                callback(self);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Follow `source`: resume plays, pause pauses, destroy releases.
    ///
    /// Replaces any previous binding.
    pub fn bind_lifecycle(&self, source: Arc<dyn LifecycleSource>) -> Result<()> {
        if self.inner.released.load(Ordering::SeqCst) {
            return Err(Error::Released);
        }

        let observer = Arc::new(LifecycleHook {
            player: Arc::downgrade(&self.inner),
        });
        let binding = LifecycleBinding::bind(source, observer);
        let previous = self.inner.lifecycle.lock().replace(binding);
        if let Some(previous) = previous {
            previous.unbind();
        }

        // released while binding: don't leave a dangling subscription behind
        if self.inner.released.load(Ordering::SeqCst) {
            if let Some(binding) = self.inner.lifecycle.lock().take() {
                binding.unbind();
            }
            return Err(Error::Released);
        }
        Ok(())
    }

    /// Drop the lifecycle binding, if any
    pub fn unbind_lifecycle(&self) {
        if let Some(binding) = self.inner.lifecycle.lock().take() {
            binding.unbind();
        }
    }

    fn handle_lifecycle(&self, event: LifecycleEvent) {
        debug!(session_id = %self.inner.id, ?event, "Host lifecycle");
        match event {
            LifecycleEvent::Resume => self.play(),
            LifecycleEvent::Pause => self.pause(),
            LifecycleEvent::Destroy => self.release(),
        }
    }

    /// Tear down: unbind lifecycle, clear listeners and pending continuations,
    /// release the transport. Safe to call more than once.
    pub fn release(&self) {
        self.inner.shutdown();
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.session.read();
        f.debug_struct("Player")
            .field("id", &self.inner.id)
            .field("phase", &session.phase)
            .field("state", &session.state)
            .field("video_id", &session.video_id)
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}

/// Observer handed to the lifecycle source; holds the player weakly
struct LifecycleHook {
    player: Weak<PlayerInner>,
}

impl LifecycleObserver for LifecycleHook {
    fn on_lifecycle_event(&self, event: LifecycleEvent) {
        if let Some(inner) = self.player.upgrade() {
            Player { inner }.handle_lifecycle(event);
        }
    }
}
