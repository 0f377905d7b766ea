//! Transport between the native side and the embedded runtime
//!
//! [`Transport`] is the seam the [`crate::Player`] facade talks through.
//! Two implementations ship with the crate:
//!
//! - [`ScriptTransport`]: drives an [`EmbeddingSurface`] (a web view that can
//!   load HTML and evaluate script). A single tokio task owns the surface and
//!   processes one queue holding outbound commands and inbound messages, so
//!   inbound events are delivered strictly in arrival order and the surface is
//!   only ever touched from that task.
//! - [`MemoryTransport`]: no runtime at all. Records commands and lets the
//!   caller inject events; used for headless hosts and tests.

use crate::{
    command::Command,
    event::{InboundMessage, PlayerEvent},
    options::PlayerOptions,
    page::{render_player_page, BridgeConfig},
    Error, Result,
};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// Receives every decoded inbound event, one at a time
pub type MessageHandler = Box<dyn FnMut(PlayerEvent) + Send + 'static>;

/// Duplex channel to the embedded runtime
pub trait Transport: Send + Sync {
    /// Establish the embedding and load the host page.
    ///
    /// Failure is fatal for the owning player and is not retried.
    fn open(&self, options: &PlayerOptions) -> Result<()>;

    /// Fire-and-forget command. Never blocks and never fails; commands sent
    /// before `open` are queued, commands sent after `release` are dropped.
    fn send(&self, command: Command);

    /// Register the single inbound handler, replacing any previous one
    fn on_message(&self, handler: MessageHandler);

    /// Stop delivery and tear down the page side. Idempotent.
    fn release(&self);
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn open(&self, options: &PlayerOptions) -> Result<()> {
        (**self).open(options)
    }

    fn send(&self, command: Command) {
        (**self).send(command)
    }

    fn on_message(&self, handler: MessageHandler) {
        (**self).on_message(handler)
    }

    fn release(&self) {
        (**self).release()
    }
}

/// Decode a raw inbound message, logging and dropping anything unrecognized
pub(crate) fn decode_inbound(message: &InboundMessage) -> Option<PlayerEvent> {
    match PlayerEvent::decode(message) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(event = %message.event, code = e.error_code(), error = %e, "Dropping inbound message");
            None
        }
    }
}

fn run_handler(handler: &mut MessageHandler, event: PlayerEvent) {
    let name = event.name();
    if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
        error!(event = name, "Inbound handler panicked; continuing with next message");
    }
}

// ============================================================================
// Script transport
// ============================================================================

/// A web view (or equivalent) hosting the player page.
///
/// Implementations are owned by the transport's delivery task and are only
/// called from it.
pub trait EmbeddingSurface: Send + 'static {
    /// Load the host page
    fn load_html(&mut self, html: &str, base_url: &Url) -> Result<()>;

    /// Evaluate a script in the page; the result is ignored
    fn evaluate_script(&mut self, script: &str) -> Result<()>;

    /// Dispose of native resources
    fn close(&mut self) {}
}

enum BridgeMessage {
    Command(Command),
    Inbound(RawInbound),
    Handler(MessageHandler),
    Shutdown,
}

enum RawInbound {
    Text(String),
    Message(InboundMessage),
}

/// Handle the surface's IPC callback uses to post messages to the bridge.
///
/// Cheap to clone and callable from any thread.
#[derive(Clone)]
pub struct InboundSender {
    tx: mpsc::UnboundedSender<BridgeMessage>,
}

impl InboundSender {
    /// Post a raw JSON text message as produced by the page
    pub fn post(&self, raw: impl Into<String>) {
        self.push(RawInbound::Text(raw.into()));
    }

    /// Post an already-structured message
    pub fn post_message(&self, message: InboundMessage) {
        self.push(RawInbound::Message(message));
    }

    fn push(&self, raw: RawInbound) {
        if self.tx.send(BridgeMessage::Inbound(raw)).is_err() {
            debug!("Inbound message after transport shutdown; dropped");
        }
    }
}

impl std::fmt::Debug for InboundSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

struct Pending<S> {
    surface: S,
    rx: mpsc::UnboundedReceiver<BridgeMessage>,
}

/// Transport over an [`EmbeddingSurface`]
pub struct ScriptTransport<S: EmbeddingSurface> {
    tx: mpsc::UnboundedSender<BridgeMessage>,
    pending: Mutex<Option<Pending<S>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
    config: BridgeConfig,
    released: AtomicBool,
}

impl<S: EmbeddingSurface> ScriptTransport<S> {
    /// Create the transport and its surface.
    ///
    /// `create_surface` receives the [`InboundSender`] to wire into the
    /// surface's message callback. Fails with [`Error::TransportInit`] if the
    /// surface cannot be created or no tokio runtime is available.
    pub fn new<F>(config: BridgeConfig, create_surface: F) -> Result<Self>
    where
        F: FnOnce(InboundSender) -> Result<S>,
    {
        let runtime = Handle::try_current()
            .map_err(|e| Error::TransportInit(format!("no tokio runtime: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let surface = create_surface(InboundSender { tx: tx.clone() }).map_err(|e| match e {
            Error::TransportInit(_) => e,
            other => Error::TransportInit(other.to_string()),
        })?;

        Ok(Self {
            tx,
            pending: Mutex::new(Some(Pending { surface, rx })),
            task: Mutex::new(None),
            runtime,
            config,
            released: AtomicBool::new(false),
        })
    }

    /// Another sender for the same bridge
    pub fn inbound(&self) -> InboundSender {
        InboundSender { tx: self.tx.clone() }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// True once the delivery task has finished
    pub fn is_finished(&self) -> bool {
        self.task.lock().as_ref().map(|t| t.is_finished()).unwrap_or(false)
    }

    /// Take the delivery task handle, e.g. to await shutdown
    pub fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }
}

impl<S: EmbeddingSurface> Transport for ScriptTransport<S> {
    fn open(&self, options: &PlayerOptions) -> Result<()> {
        if self.released.load(Ordering::SeqCst) {
            return Err(Error::Released);
        }

        let Pending { mut surface, rx } = self
            .pending
            .lock()
            .take()
            .ok_or_else(|| Error::TransportInit("transport already opened".to_string()))?;

        let html = render_player_page(options, &self.config);
        if let Err(e) = surface.load_html(&html, &self.config.base_url) {
            surface.close();
            return Err(Error::TransportInit(format!("failed to load player page: {}", e)));
        }

        info!(base_url = %self.config.base_url, "Player page loaded");
        *self.task.lock() = Some(self.runtime.spawn(deliver(surface, rx)));
        Ok(())
    }

    fn send(&self, command: Command) {
        if self.released.load(Ordering::SeqCst) {
            debug!(command = %command, "Command after release; dropped");
            return;
        }
        if self.tx.send(BridgeMessage::Command(command)).is_err() {
            debug!("Delivery task gone; command dropped");
        }
    }

    fn on_message(&self, handler: MessageHandler) {
        let _ = self.tx.send(BridgeMessage::Handler(handler));
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        // never opened: nobody else owns the surface
        if let Some(Pending { mut surface, .. }) = self.pending.lock().take() {
            surface.close();
            return;
        }

        let _ = self.tx.send(BridgeMessage::Shutdown);
        info!("Transport released");
    }
}

impl<S: EmbeddingSurface> Drop for ScriptTransport<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// The delivery sequence: one message fully processed before the next
async fn deliver<S: EmbeddingSurface>(mut surface: S, mut rx: mpsc::UnboundedReceiver<BridgeMessage>) {
    let mut handler: Option<MessageHandler> = None;

    while let Some(message) = rx.recv().await {
        match message {
            BridgeMessage::Command(command) => invoke(&mut surface, &command),
            BridgeMessage::Inbound(raw) => {
                let message = match raw {
                    RawInbound::Message(message) => message,
                    RawInbound::Text(text) => match InboundMessage::parse(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!(error = %e, "Dropping unparseable inbound message");
                            continue;
                        }
                    },
                };
                let Some(event) = decode_inbound(&message) else {
                    continue;
                };
                match handler.as_mut() {
                    Some(handler) => run_handler(handler, event),
                    None => debug!(event = event.name(), "No inbound handler registered"),
                }
            }
            BridgeMessage::Handler(new_handler) => handler = Some(new_handler),
            BridgeMessage::Shutdown => break,
        }
    }

    invoke(&mut surface, &Command::Teardown);
    surface.close();
    debug!("Delivery task stopped");
}

fn invoke<S: EmbeddingSurface>(surface: &mut S, command: &Command) {
    let script = match command.to_script() {
        Ok(script) => script,
        Err(e) => {
            error!(command = %command, error = %e, "Failed to encode command");
            return;
        }
    };
    debug!(command = %command, "Invoking remote command");
    if let Err(e) = surface.evaluate_script(&script) {
        warn!(command = %command, error = %e, "Surface rejected command");
    }
}

// ============================================================================
// Memory transport
// ============================================================================

/// In-process transport without an embedded runtime.
///
/// `emit` delivers events synchronously on the calling thread; concurrent
/// `emit` calls are serialized. Do not call `emit` from inside a listener.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<Command>>,
    handler: Mutex<Option<MessageHandler>>,
    delivery: Mutex<()>,
    opened_with: Mutex<Option<PlayerOptions>>,
    open_failure: Option<String>,
    released: AtomicBool,
    release_count: Mutex<usize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose `open` fails, as if the surface could not be created
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            open_failure: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Deliver one event to the registered handler
    pub fn emit(&self, event: PlayerEvent) {
        let _sequence = self.delivery.lock();
        if self.released.load(Ordering::SeqCst) {
            return;
        }

        let Some(mut handler) = self.handler.lock().take() else {
            debug!(event = event.name(), "No inbound handler registered");
            return;
        };

        run_handler(&mut handler, event);

        let mut slot = self.handler.lock();
        if slot.is_none() && !self.released.load(Ordering::SeqCst) {
            *slot = Some(handler);
        }
    }

    /// Decode and deliver a raw message; undecodable messages are dropped
    pub fn emit_raw(&self, message: &InboundMessage) {
        if let Some(event) = decode_inbound(message) {
            self.emit(event);
        }
    }

    /// Commands sent so far, oldest first
    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().clone()
    }

    /// Drain the sent commands
    pub fn take_sent(&self) -> Vec<Command> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Options passed to `open`, if it succeeded
    pub fn opened_with(&self) -> Option<PlayerOptions> {
        self.opened_with.lock().clone()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// How many times `release` actually tore down (0 or 1)
    pub fn release_count(&self) -> usize {
        *self.release_count.lock()
    }
}

impl Transport for MemoryTransport {
    fn open(&self, options: &PlayerOptions) -> Result<()> {
        if let Some(reason) = &self.open_failure {
            return Err(Error::TransportInit(reason.clone()));
        }
        *self.opened_with.lock() = Some(options.clone());
        Ok(())
    }

    fn send(&self, command: Command) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        self.sent.lock().push(command);
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.release_count.lock() += 1;
        self.handler.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::parse_script;
    use crate::state::PlayerState;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Surface that records scripts and forwards them to the test
    struct RecordingSurface {
        scripts: mpsc::UnboundedSender<String>,
        fail_load: bool,
    }

    impl EmbeddingSurface for RecordingSurface {
        fn load_html(&mut self, html: &str, _base_url: &Url) -> Result<()> {
            if self.fail_load {
                return Err(Error::Surface("web view unavailable".into()));
            }
            assert!(html.contains("onYouTubeIframeAPIReady"));
            Ok(())
        }

        fn evaluate_script(&mut self, script: &str) -> Result<()> {
            let _ = self.scripts.send(script.to_string());
            Ok(())
        }
    }

    fn script_transport(
        fail_load: bool,
    ) -> (ScriptTransport<RecordingSurface>, UnboundedReceiver<String>) {
        let (scripts, rx) = mpsc::unbounded_channel();
        let transport = ScriptTransport::new(BridgeConfig::default(), |_inbound| {
            Ok(RecordingSurface { scripts, fail_load })
        })
        .unwrap();
        (transport, rx)
    }

    async fn next<T>(rx: &mut UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    #[test]
    fn test_new_without_runtime_fails() {
        let result = ScriptTransport::new(BridgeConfig::default(), |_| {
            let (scripts, _rx) = mpsc::unbounded_channel();
            Ok(RecordingSurface { scripts, fail_load: false })
        });
        assert!(matches!(result, Err(Error::TransportInit(_))));
    }

    #[tokio::test]
    async fn test_surface_creation_failure_is_init_error() {
        let result = ScriptTransport::<RecordingSurface>::new(BridgeConfig::default(), |_| {
            Err(Error::Surface("no display".into()))
        });
        match result {
            Err(Error::TransportInit(reason)) => assert!(reason.contains("no display")),
            _ => panic!("expected TransportInit"),
        }
    }

    #[tokio::test]
    async fn test_page_load_failure_is_init_error() {
        let (transport, _scripts) = script_transport(true);
        assert!(matches!(
            transport.open(&PlayerOptions::default()),
            Err(Error::TransportInit(_))
        ));
    }

    #[tokio::test]
    async fn test_commands_queued_before_open_are_flushed_in_order() {
        let (transport, mut scripts) = script_transport(false);
        transport.send(Command::Play);
        transport.send(Command::set_volume(0.5));
        transport.open(&PlayerOptions::default()).unwrap();

        let first = parse_script(&next(&mut scripts).await).unwrap();
        let second = parse_script(&next(&mut scripts).await).unwrap();
        assert_eq!(first.name, "play");
        assert_eq!(second.name, "setVolume");
        assert_eq!(second.args, vec![serde_json::json!(50)]);
    }

    #[tokio::test]
    async fn test_inbound_delivered_in_order_and_bad_messages_dropped() {
        let (transport, _scripts) = script_transport(false);
        let (events_tx, mut events) = mpsc::unbounded_channel();
        transport.on_message(Box::new(move |event| {
            let _ = events_tx.send(event);
        }));
        transport.open(&PlayerOptions::default()).unwrap();

        let inbound = transport.inbound();
        inbound.post(r#"{"event":"onReady"}"#);
        inbound.post("garbage");
        inbound.post(r#"{"event":"onSomethingElse","data":1}"#);
        inbound.post(r#"{"event":"onStateChange","data":1}"#);
        inbound.post_message(InboundMessage::new("onCurrentSecond", serde_json::json!(5.0)));

        assert_eq!(next(&mut events).await, PlayerEvent::Ready);
        assert_eq!(next(&mut events).await, PlayerEvent::StateChange(PlayerState::Playing));
        assert_eq!(next(&mut events).await, PlayerEvent::CurrentSecond(5.0));
    }

    #[tokio::test]
    async fn test_handler_panic_does_not_stop_delivery() {
        let (transport, _scripts) = script_transport(false);
        let (events_tx, mut events) = mpsc::unbounded_channel();
        transport.on_message(Box::new(move |event| {
            if event == PlayerEvent::Ready {
                panic!("listener bug");
            }
            let _ = events_tx.send(event);
        }));
        transport.open(&PlayerOptions::default()).unwrap();

        let inbound = transport.inbound();
        inbound.post(r#"{"event":"onReady"}"#);
        inbound.post(r#"{"event":"onVideoId","data":"abc123"}"#);

        assert_eq!(next(&mut events).await, PlayerEvent::VideoId("abc123".into()));
    }

    #[tokio::test]
    async fn test_release_tears_down_page_once() {
        let (transport, mut scripts) = script_transport(false);
        transport.open(&PlayerOptions::default()).unwrap();
        transport.release();
        transport.release();
        transport.send(Command::Play);

        let teardown = parse_script(&next(&mut scripts).await).unwrap();
        assert_eq!(teardown.name, "teardown");

        let task = transport.take_task().unwrap();
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(scripts.recv().await.is_none());
    }

    #[test]
    fn test_memory_transport_records_and_delivers() {
        let transport = MemoryTransport::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        transport.on_message(Box::new(move |event| sink.lock().push(event)));

        transport.send(Command::Play);
        transport.emit(PlayerEvent::Ready);
        transport.emit_raw(&InboundMessage::new("onBogus", serde_json::Value::Null));
        transport.emit_raw(&InboundMessage::new("onVideoId", serde_json::json!("xyz")));

        assert_eq!(transport.sent(), vec![Command::Play]);
        assert_eq!(
            *seen.lock(),
            vec![PlayerEvent::Ready, PlayerEvent::VideoId("xyz".into())]
        );

        transport.release();
        transport.release();
        transport.emit(PlayerEvent::Ready);
        transport.send(Command::Pause);
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(transport.sent(), vec![Command::Play]);
        assert_eq!(transport.release_count(), 1);
    }
}
