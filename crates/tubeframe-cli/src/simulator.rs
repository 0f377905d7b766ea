//! Simulated embedded runtime
//!
//! Stands in for a web view running the host page. It receives the page and
//! the invocation scripts the bridge evaluates, and answers with the inbound
//! JSON messages the real page would post: `onReady` once loaded, state
//! changes for commands, and `onCurrentSecond`/`onVideoDuration`/
//! `onVideoLoadedFraction` samples on the polling interval.

use crate::catalog;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};
use tubeframe_core::{
    parse_script, Command, EmbeddingSurface, Error, InboundSender, PlayerState, Result,
};
use url::Url;

/// IFrame error code for an invalid video id
const INVALID_PARAMETER: &str = "2";

/// Seconds the simulated page reports as buffered ahead of the playhead
const BUFFER_AHEAD_SECS: f64 = 30.0;

enum PageInput {
    Loaded,
    Invoke(Command),
    Close,
}

/// [`EmbeddingSurface`] backed by a tokio task that plays the page's part
pub struct SimulatedPage {
    tx: mpsc::UnboundedSender<PageInput>,
}

impl SimulatedPage {
    /// Spawn the page task. Must be called from within a tokio runtime.
    pub fn start(inbound: InboundSender, poll_interval: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Surface(format!("simulated page needs a runtime: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_page(rx, inbound, poll_interval));
        Ok(Self { tx })
    }

    fn push(&self, input: PageInput) -> Result<()> {
        self.tx
            .send(input)
            .map_err(|_| Error::Surface("simulated page has stopped".to_string()))
    }
}

impl EmbeddingSurface for SimulatedPage {
    fn load_html(&mut self, html: &str, base_url: &Url) -> Result<()> {
        if !html.contains("onYouTubeIframeAPIReady") {
            return Err(Error::Surface("page does not bootstrap the IFrame API".to_string()));
        }
        debug!(%base_url, bytes = html.len(), "Simulated page loaded");
        self.push(PageInput::Loaded)
    }

    fn evaluate_script(&mut self, script: &str) -> Result<()> {
        let command = Command::try_from(parse_script(script)?)?;
        self.push(PageInput::Invoke(command))
    }

    fn close(&mut self) {
        let _ = self.push(PageInput::Close);
    }
}

async fn run_page(mut rx: mpsc::UnboundedReceiver<PageInput>, inbound: InboundSender, poll_interval: Duration) {
    let mut page = PageState::new(inbound, poll_interval);
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            input = rx.recv() => match input {
                Some(PageInput::Loaded) => page.on_loaded(),
                Some(PageInput::Invoke(Command::Teardown)) | Some(PageInput::Close) | None => break,
                Some(PageInput::Invoke(command)) => page.invoke(command),
            },
            _ = ticker.tick(), if page.is_polling() => page.sample(),
        }
    }
    debug!("Simulated page stopped");
}

struct Video {
    id: String,
    duration: f64,
}

/// What the page-side player would be doing
struct PageState {
    inbound: InboundSender,
    step: f64,
    ready: bool,
    video: Option<Video>,
    position: f64,
    playing: bool,
    volume: u8,
}

impl PageState {
    fn new(inbound: InboundSender, poll_interval: Duration) -> Self {
        Self {
            inbound,
            step: poll_interval.as_secs_f64(),
            ready: false,
            video: None,
            position: 0.0,
            playing: false,
            volume: 100,
        }
    }

    fn emit(&self, event: &str, data: Value) {
        trace!(event, %data, "Simulated page posting");
        self.inbound.post(json!({ "event": event, "data": data }).to_string());
    }

    fn emit_state(&self, state: PlayerState) {
        if let Some(code) = state.code() {
            self.emit("onStateChange", json!(code));
        }
        if state == PlayerState::Playing {
            if let Some(video) = &self.video {
                self.emit("onVideoId", json!(video.id));
            }
        }
    }

    fn is_polling(&self) -> bool {
        self.ready && self.video.is_some()
    }

    fn on_loaded(&mut self) {
        self.ready = true;
        self.emit("onReady", Value::Null);
    }

    fn invoke(&mut self, command: Command) {
        if !self.ready {
            warn!(command = %command, "Invocation before the player exists; ignored");
            return;
        }

        match command {
            Command::LoadVideo { video_id, start_seconds } => {
                if self.select(&video_id, start_seconds) {
                    self.emit_state(PlayerState::Unstarted);
                    self.emit_state(PlayerState::Buffering);
                    self.emit("onPlaybackQualityChange", json!("hd720"));
                    self.playing = true;
                    self.emit_state(PlayerState::Playing);
                }
            }
            Command::CueVideo { video_id, start_seconds } => {
                if self.select(&video_id, start_seconds) {
                    self.emit_state(PlayerState::VideoCued);
                }
            }
            Command::Play => {
                if self.video.is_some() && !self.playing {
                    self.playing = true;
                    self.emit_state(PlayerState::Playing);
                }
            }
            Command::Pause => {
                if self.playing {
                    self.playing = false;
                    self.emit_state(PlayerState::Paused);
                }
            }
            Command::Stop => {
                if self.video.is_some() {
                    self.playing = false;
                    self.position = 0.0;
                    self.emit_state(PlayerState::VideoCued);
                }
            }
            Command::SeekTo { seconds } => {
                if let Some(video) = &self.video {
                    self.position = seconds.clamp(0.0, video.duration);
                    self.emit("onCurrentSecond", json!(self.position));
                }
            }
            Command::SetVolume { percent } => {
                self.volume = percent;
                debug!(volume = self.volume, "Simulated volume changed");
            }
            Command::Teardown => {}
        }
    }

    /// Switch to `video_id`; false (and an `onError`) if the id is not plausible
    fn select(&mut self, video_id: &str, start_seconds: f64) -> bool {
        if video_id.len() != 11 {
            self.emit("onError", json!(INVALID_PARAMETER));
            return false;
        }

        let duration = catalog::duration_of(video_id);
        self.video = Some(Video {
            id: video_id.to_string(),
            duration,
        });
        self.position = start_seconds.clamp(0.0, duration);
        self.playing = false;
        true
    }

    fn sample(&mut self) {
        let Some(duration) = self.video.as_ref().map(|video| video.duration) else {
            return;
        };

        if self.playing {
            self.position = (self.position + self.step).min(duration);
        }

        self.emit("onCurrentSecond", json!(self.position));
        self.emit("onVideoDuration", json!(duration));
        let loaded = ((self.position + BUFFER_AHEAD_SECS) / duration).min(1.0);
        self.emit("onVideoLoadedFraction", json!(loaded));

        if self.playing && self.position >= duration {
            self.playing = false;
            self.emit_state(PlayerState::Ended);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tubeframe_core::{
        BridgeConfig, Player, PlayerEvent, PlayerListener, PlayerOptions, ScriptTransport,
    };

    struct Forward(mpsc::UnboundedSender<PlayerEvent>);

    impl PlayerListener for Forward {
        fn on_ready(&self, _player: &Player) {
            let _ = self.0.send(PlayerEvent::Ready);
        }
        fn on_state_change(&self, _player: &Player, state: PlayerState) {
            let _ = self.0.send(PlayerEvent::StateChange(state));
        }
        fn on_error(&self, _player: &Player, error: &str) {
            let _ = self.0.send(PlayerEvent::Error(error.to_string()));
        }
        fn on_video_id(&self, _player: &Player, video_id: &str) {
            let _ = self.0.send(PlayerEvent::VideoId(video_id.to_string()));
        }
    }

    async fn started() -> (Player, mpsc::UnboundedReceiver<PlayerEvent>, Arc<dyn PlayerListener>) {
        let config = BridgeConfig::default();
        let poll = config.poll_interval();
        let transport =
            ScriptTransport::new(config, |inbound| SimulatedPage::start(inbound, poll)).unwrap();
        let player = Player::new(transport);
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Arc<dyn PlayerListener> = Arc::new(Forward(tx));
        player.initialize(&listener, PlayerOptions::default()).unwrap();
        (player, rx, listener)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<PlayerEvent>) -> PlayerEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_load_video_plays_and_reports_id() {
        let (player, mut events, _listener) = started().await;
        assert_eq!(next(&mut events).await, PlayerEvent::Ready);

        player.load_video("uHq9km2E6rk", 0.0);
        assert_eq!(next(&mut events).await, PlayerEvent::StateChange(PlayerState::Unstarted));
        assert_eq!(next(&mut events).await, PlayerEvent::StateChange(PlayerState::Buffering));
        assert_eq!(next(&mut events).await, PlayerEvent::StateChange(PlayerState::Playing));
        assert_eq!(next(&mut events).await, PlayerEvent::VideoId("uHq9km2E6rk".into()));
        assert_eq!(player.player_state(), PlayerState::Playing);
    }

    #[tokio::test]
    async fn test_invalid_video_id_reports_error() {
        let (player, mut events, _listener) = started().await;
        assert_eq!(next(&mut events).await, PlayerEvent::Ready);

        player.load_video("short", 0.0);
        assert_eq!(next(&mut events).await, PlayerEvent::Error(INVALID_PARAMETER.into()));
    }

    #[tokio::test]
    async fn test_polling_advances_cached_time() {
        let (player, mut events, _listener) = started().await;
        assert_eq!(next(&mut events).await, PlayerEvent::Ready);

        player.load_video("M7lc1UVf-VE", 10.0);
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(player.current_time() > 10.0);
        assert_eq!(player.duration(), 79.0);
        assert!(player.loaded_fraction() > 0.0);
    }

    #[test]
    fn test_rejects_page_without_bootstrap() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut page = SimulatedPage { tx };
        let base = Url::parse("https://www.youtube.com").unwrap();
        assert!(page.load_html("<html></html>", &base).is_err());
    }
}
