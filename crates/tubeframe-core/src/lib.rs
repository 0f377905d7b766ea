//! Tubeframe Core - embedded YouTube IFrame player bridge
//!
//! This crate lets native host code drive a YouTube player running inside an
//! embedded web runtime:
//! - Player parameter encoding (`playerVars`)
//! - Host page and in-page bridge script
//! - Command/event protocol over a duplex transport
//! - Readiness gate and cached playback state
//! - Ordered listener dispatch
//! - Host lifecycle binding (resume/pause/destroy)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Tubeframe Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Options    │  │  Lifecycle   │  │   Listener   │           │
//! │  │   Encoder    │  │   Binding    │  │   Registry   │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Player    │  readiness gate, cache       │
//! │                    │   Facade    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │ Command ↓   ↑ PlayerEvent           │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Transport  │  page + bridge script        │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │                  embedded web runtime                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod listener;
pub mod options;
pub mod page;
pub mod player;
pub mod state;
pub mod transport;

pub use command::{parse_script, Command, RemoteInvocation};
pub use error::{Error, Result};
pub use event::{InboundMessage, PlayerEvent};
pub use lifecycle::{LifecycleEvent, LifecycleObserver, LifecycleRegistry, LifecycleSource, SubscriptionId};
pub use listener::PlayerListener;
pub use options::PlayerOptions;
pub use page::{render_player_page, BridgeConfig};
pub use player::{Player, SessionId};
pub use state::{PlaybackSnapshot, PlayerPhase, PlayerState};
pub use transport::{EmbeddingSurface, InboundSender, MemoryTransport, MessageHandler, ScriptTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Tubeframe Core initialized");
}
