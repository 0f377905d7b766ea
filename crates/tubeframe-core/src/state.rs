//! Player state tracking
//!
//! Two independent machines live here:
//! - [`PlayerPhase`]: the bridge lifecycle (`Uninitialized -> Loading -> Ready`),
//!   the readiness gate for commands.
//! - [`PlayerState`]: the remote player's playback state, decoded from the
//!   IFrame state codes.
//!
//! [`SessionState`] caches the last values seen on inbound events. Accessors on
//! [`crate::Player`] read from it; nothing here performs a round trip to the
//! embedded runtime.

use crate::event::PlayerEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Playback state reported by the remote player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// Code not covered by the IFrame protocol, or nothing reported yet
    #[default]
    Unknown,
    /// -1: video loaded but not started
    Unstarted,
    /// 0
    Ended,
    /// 1
    Playing,
    /// 2
    Paused,
    /// 3
    Buffering,
    /// 5
    VideoCued,
}

impl PlayerState {
    /// Map an IFrame state code. Anything outside the table is `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => PlayerState::Unstarted,
            0 => PlayerState::Ended,
            1 => PlayerState::Playing,
            2 => PlayerState::Paused,
            3 => PlayerState::Buffering,
            5 => PlayerState::VideoCued,
            _ => PlayerState::Unknown,
        }
    }

    /// The IFrame code for this state, if it has one
    pub fn code(&self) -> Option<i64> {
        match self {
            PlayerState::Unknown => None,
            PlayerState::Unstarted => Some(-1),
            PlayerState::Ended => Some(0),
            PlayerState::Playing => Some(1),
            PlayerState::Paused => Some(2),
            PlayerState::Buffering => Some(3),
            PlayerState::VideoCued => Some(5),
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Unknown => write!(f, "unknown"),
            PlayerState::Unstarted => write!(f, "unstarted"),
            PlayerState::Ended => write!(f, "ended"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Buffering => write!(f, "buffering"),
            PlayerState::VideoCued => write!(f, "video_cued"),
        }
    }
}

/// Bridge lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPhase {
    /// `initialize` has not been called
    #[default]
    Uninitialized,
    /// Host page is loading, remote player not ready yet
    Loading,
    /// Remote player signalled `onReady`
    Ready,
    /// Torn down; terminal
    Released,
}

impl PlayerPhase {
    /// Check if transition to target phase is valid
    pub fn can_transition_to(&self, target: PlayerPhase) -> bool {
        use PlayerPhase::*;
        matches!(
            (self, target),
            (Uninitialized, Loading) |
            (Loading, Ready) |
            // the runtime may re-announce readiness after a page reload
            (Ready, Ready) |
            (Uninitialized, Released) | (Loading, Released) | (Ready, Released)
        )
    }
}

impl std::fmt::Display for PlayerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerPhase::Uninitialized => write!(f, "uninitialized"),
            PlayerPhase::Loading => write!(f, "loading"),
            PlayerPhase::Ready => write!(f, "ready"),
            PlayerPhase::Released => write!(f, "released"),
        }
    }
}

/// Last-known values observed from inbound events.
///
/// Staleness is bounded by the page polling interval for time, duration and
/// loaded fraction, and by event delivery for everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: PlayerPhase,
    pub state: PlayerState,
    /// Seconds
    pub current_time: f64,
    /// Seconds
    pub duration: f64,
    /// 0.0..=1.0
    pub loaded_fraction: f64,
    pub video_id: Option<String>,
    pub playback_quality: Option<String>,
    pub playback_rate: Option<String>,
    pub last_error: Option<String>,
    /// When an inbound event last changed the cache
    pub updated_at: Option<DateTime<Utc>>,
}

/// Read-only copy of [`SessionState`] handed to callers
pub type PlaybackSnapshot = SessionState;

impl SessionState {
    /// True once the remote player has signalled readiness
    pub fn is_ready(&self) -> bool {
        self.phase == PlayerPhase::Ready
    }

    /// Fold an inbound event into the cache. Returns true if anything changed.
    pub fn apply(&mut self, event: &PlayerEvent) -> bool {
        let changed = match event {
            PlayerEvent::Ready => self.set_phase(PlayerPhase::Ready),
            PlayerEvent::StateChange(state) => replace(&mut self.state, *state),
            PlayerEvent::PlaybackQualityChange(quality) => {
                replace(&mut self.playback_quality, Some(quality.clone()))
            }
            PlayerEvent::PlaybackRateChange(rate) => {
                replace(&mut self.playback_rate, Some(rate.clone()))
            }
            PlayerEvent::Error(code) => replace(&mut self.last_error, Some(code.clone())),
            PlayerEvent::CurrentSecond(seconds) => replace(&mut self.current_time, *seconds),
            PlayerEvent::VideoDuration(seconds) => replace(&mut self.duration, *seconds),
            PlayerEvent::VideoLoadedFraction(fraction) => {
                replace(&mut self.loaded_fraction, *fraction)
            }
            PlayerEvent::VideoId(id) => replace(&mut self.video_id, Some(id.clone())),
        };

        if changed {
            self.updated_at = Some(Utc::now());
        }
        changed
    }

    /// Move to a new phase if the transition is allowed
    pub(crate) fn set_phase(&mut self, phase: PlayerPhase) -> bool {
        if !self.phase.can_transition_to(phase) {
            return false;
        }
        replace(&mut self.phase, phase)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
