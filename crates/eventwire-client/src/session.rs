//! Connection Lifecycle Manager
//!
//! Owns the single connection for the life of the process:
//! - spawns the inbound read task on the read half
//! - performs every outbound write from the main loop, one at a time
//! - runs the close handshake with a bounded wait for the peer
//!
//! State machine: `Connected -> ClosingSent -> {PeerAcked | TimedOut} -> Closed`.
//! There is no way back to `Connected`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

use eventwire_core::{
    CloseCode, CompletionMarker, CompletionWaiter, Connector, Event, InboundMessage, MessageReader,
    MessageWriter, Telemetry, TelemetrySpan, TransportError, CONNECT_SPAN, SEND_SPAN,
};

use crate::error::{ClientError, Result};

/// Panic message for the null-event contract violation
pub const NULL_EVENT: &str = "ev is nil";

/// Default bound on waiting for the peer to acknowledge a close frame
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ----------------------------------------------------------------------------
// Lifecycle Types
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    ClosingSent,
    PeerAcked,
    TimedOut,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::ClosingSent => write!(f, "ClosingSent"),
            ConnectionState::PeerAcked => write!(f, "PeerAcked"),
            ConnectionState::TimedOut => write!(f, "TimedOut"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

/// How the close handshake ended. The handle is closed in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The read task saw the connection close before the bound
    PeerAcknowledged,
    /// The bound elapsed first
    TimedOut,
    /// The close frame could not be written; no wait was attempted
    CloseFrameFailed,
}

/// Where successfully received messages go
pub trait InboundSink: Send + Sync + 'static {
    fn observe(&self, message: &InboundMessage);
}

/// Logs every inbound message
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl InboundSink for LogSink {
    fn observe(&self, message: &InboundMessage) {
        info!("recv: {}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub close_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

// ----------------------------------------------------------------------------
// Connection Lifecycle Manager
// ----------------------------------------------------------------------------

pub struct ConnectionLifecycleManager<W: MessageWriter> {
    writer: W,
    state: ConnectionState,
    read_task: JoinHandle<()>,
    read_done: CompletionWaiter,
    telemetry: Arc<dyn Telemetry>,
    config: SessionConfig,
}

impl<W: MessageWriter> ConnectionLifecycleManager<W> {
    /// Dial `url` and start the read task. A failed dial is returned to the
    /// caller, which treats it as fatal.
    pub async fn connect<C>(
        connector: &C,
        url: &str,
        telemetry: Arc<dyn Telemetry>,
        sink: Arc<dyn InboundSink>,
        config: SessionConfig,
    ) -> Result<Self>
    where
        C: Connector<Writer = W>,
    {
        info!("connecting to {}", url);

        let span = start_span(telemetry.as_ref(), CONNECT_SPAN);
        let connected = connector.connect(url).await;
        finish_span(telemetry.as_ref(), span);

        let (writer, reader) = connected.map_err(ClientError::Connect)?;
        Ok(Self::from_parts(writer, reader, telemetry, sink, config))
    }

    /// Take ownership of an already established connection
    pub fn from_parts<R: MessageReader>(
        writer: W,
        reader: R,
        telemetry: Arc<dyn Telemetry>,
        sink: Arc<dyn InboundSink>,
        config: SessionConfig,
    ) -> Self {
        let (marker, read_done) = CompletionMarker::new();
        let read_task = tokio::spawn(read_loop(reader, sink, marker));

        Self {
            writer,
            state: ConnectionState::Connected,
            read_task,
            read_done,
            telemetry,
            config,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the read task has stopped
    pub fn reader_finished(&self) -> bool {
        self.read_done.is_fired()
    }

    /// Write one event. `None` is a caller bug: it is reported and then the
    /// call panics. Write failures are logged and never retried.
    pub async fn send(&mut self, event: Option<&Event>) {
        let Some(event) = event else {
            if let Err(e) = self.telemetry.catch("send", NULL_EVENT) {
                debug!("error report failed: {}", e);
            }
            panic!("{}", NULL_EVENT);
        };

        let span = start_span(self.telemetry.as_ref(), SEND_SPAN);
        let result = self.write_event(event).await;
        finish_span(self.telemetry.as_ref(), span);

        if let Err(e) = result {
            error!("send err: {}", e);
        }
    }

    async fn write_event(&mut self, event: &Event) -> std::result::Result<(), TransportError> {
        let payload = event.to_wire()?;
        match event.kind() {
            Some(kind) => debug!("send {} ({}): {}", event.label(), kind, payload),
            None => debug!("send {}: {}", event.label(), payload),
        }
        self.writer.send_text(payload).await
    }

    /// Run the close handshake and close the handle
    ///
    /// Sends one normal-closure frame, then waits for the read task to see the
    /// connection close, up to the configured bound. If the frame cannot be
    /// written the wait is skipped. The handle is closed afterwards in all cases.
    pub async fn shutdown(mut self) -> ShutdownOutcome {
        let outcome = match self.writer.send_close(CloseCode::Normal, "").await {
            Err(e) => {
                error!("write close: {}", e);
                ShutdownOutcome::CloseFrameFailed
            }
            Ok(()) => {
                self.transition(ConnectionState::ClosingSent);
                match timeout(self.config.close_timeout, self.read_done.wait()).await {
                    Ok(()) => {
                        self.transition(ConnectionState::PeerAcked);
                        ShutdownOutcome::PeerAcknowledged
                    }
                    Err(_) => {
                        self.transition(ConnectionState::TimedOut);
                        ShutdownOutcome::TimedOut
                    }
                }
            }
        };

        self.close_handle().await;
        outcome
    }

    async fn close_handle(&mut self) {
        self.read_task.abort();
        if let Err(e) = self.writer.close().await {
            debug!("close: {}", e);
        }
        self.transition(ConnectionState::Closed);
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!("connection {} -> {}", self.state, next);
        self.state = next;
    }
}

// ----------------------------------------------------------------------------
// Read Task
// ----------------------------------------------------------------------------

/// Deliver inbound messages until the first receive failure, then fire `done`
async fn read_loop<R: MessageReader>(
    mut reader: R,
    sink: Arc<dyn InboundSink>,
    done: CompletionMarker,
) {
    loop {
        match reader.receive().await {
            Ok(message) => sink.observe(&message),
            Err(e) => {
                info!("read: {}", e);
                break;
            }
        }
    }
    done.fire();
}

// ----------------------------------------------------------------------------
// Telemetry Helpers
// ----------------------------------------------------------------------------

fn start_span(telemetry: &dyn Telemetry, name: &'static str) -> Option<TelemetrySpan> {
    match telemetry.start_span(name) {
        Ok(span) => Some(span),
        Err(e) => {
            debug!("telemetry: {}", e);
            None
        }
    }
}

fn finish_span(telemetry: &dyn Telemetry, span: Option<TelemetrySpan>) {
    if let Some(span) = span {
        if let Err(e) = telemetry.finish_span(span) {
            debug!("telemetry: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventwire_core::testing::{
        mock_connection, MockConnector, RecordingTelemetry, TelemetryCall, WrittenFrame,
    };
    use eventwire_core::{EventKind, NoopTelemetry, PayloadGenerator, RandomPayloads};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        seen: Mutex<Vec<InboundMessage>>,
    }

    impl InboundSink for CollectingSink {
        fn observe(&self, message: &InboundMessage) {
            self.seen.lock().unwrap().push(message.clone());
        }
    }

    fn heartbeat() -> Event {
        let mut generator = RandomPayloads::seeded(11);
        Event::heartbeat(EventKind::KeepAlive, chrono::Local::now(), generator.profile())
    }

    #[tokio::test]
    async fn test_connect_brackets_dial_in_span() {
        let (connector, peer) = MockConnector::new();
        let telemetry = RecordingTelemetry::new();

        let mut session = ConnectionLifecycleManager::connect(
            &connector,
            "ws://localhost:8080/event",
            Arc::new(telemetry.clone()),
            Arc::new(LogSink),
            SessionConfig::default(),
        )
        .await
        .expect("mock connect");

        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(
            telemetry.calls(),
            vec![TelemetryCall::Start(CONNECT_SPAN), TelemetryCall::Finish(CONNECT_SPAN)]
        );

        session.send(Some(&heartbeat())).await;
        assert_eq!(peer.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_refused_dial_is_fatal_error() {
        let telemetry = RecordingTelemetry::new();

        let result = ConnectionLifecycleManager::connect(
            &MockConnector::refusing(),
            "ws://localhost:8080/event",
            Arc::new(telemetry.clone()),
            Arc::new(LogSink),
            SessionConfig::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(ClientError::Connect(TransportError::ConnectionFailed { .. }))
        ));
        assert_eq!(
            telemetry.calls(),
            vec![TelemetryCall::Start(CONNECT_SPAN), TelemetryCall::Finish(CONNECT_SPAN)]
        );
    }

    #[tokio::test]
    async fn test_send_writes_exactly_once() {
        let (writer, reader, peer) = mock_connection();
        let telemetry = RecordingTelemetry::new();
        let mut session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(telemetry.clone()),
            Arc::new(LogSink),
            SessionConfig::default(),
        );

        session.send(Some(&heartbeat())).await;

        assert_eq!(peer.texts().len(), 1);
        assert_eq!(
            telemetry.calls(),
            vec![TelemetryCall::Start(SEND_SPAN), TelemetryCall::Finish(SEND_SPAN)]
        );
    }

    #[tokio::test]
    async fn test_write_failure_is_not_retried() {
        let (writer, reader, peer) = mock_connection();
        let telemetry = RecordingTelemetry::new();
        let mut session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(telemetry.clone()),
            Arc::new(LogSink),
            SessionConfig::default(),
        );
        peer.fail_sends(true);

        session.send(Some(&heartbeat())).await;

        assert!(peer.texts().is_empty());
        // span still closed after the failed write
        assert_eq!(telemetry.calls().last(), Some(&TelemetryCall::Finish(SEND_SPAN)));
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_failing_telemetry_never_blocks_write() {
        let (writer, reader, peer) = mock_connection();
        let mut session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(RecordingTelemetry::failing()),
            Arc::new(LogSink),
            SessionConfig::default(),
        );

        session.send(Some(&heartbeat())).await;
        session.send(Some(&heartbeat())).await;

        assert_eq!(peer.texts().len(), 2);
    }

    #[tokio::test]
    #[should_panic(expected = "ev is nil")]
    async fn test_null_event_panics() {
        let (writer, reader, _peer) = mock_connection();
        let mut session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(NoopTelemetry),
            Arc::new(LogSink),
            SessionConfig::default(),
        );

        session.send(None).await;
    }

    #[tokio::test]
    async fn test_null_event_is_reported_before_any_write() {
        let (writer, reader, peer) = mock_connection();
        let telemetry = RecordingTelemetry::new();
        let session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(telemetry.clone()),
            Arc::new(LogSink),
            SessionConfig::default(),
        );

        let result = tokio::spawn(async move {
            let mut session = session;
            session.send(None).await;
        })
        .await;

        assert!(result.unwrap_err().is_panic());
        assert!(peer.frames().is_empty());
        assert_eq!(
            telemetry.calls(),
            vec![TelemetryCall::Catch {
                context: "send".to_string(),
                message: NULL_EVENT.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_read_task_delivers_until_failure() {
        let (writer, reader, peer) = mock_connection();
        let sink = Arc::new(CollectingSink::default());
        let session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(NoopTelemetry),
            sink.clone(),
            SessionConfig::default(),
        );

        peer.push_text("one");
        peer.push_text("two");
        peer.close_from_peer();
        peer.push_text("after close");

        let mut done = session.read_done.clone();
        done.wait().await;

        let seen = sink.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                InboundMessage::Text("one".into()),
                InboundMessage::Text("two".into())
            ]
        );
        assert!(session.reader_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_promptly_on_peer_ack() {
        let (writer, reader, peer) = mock_connection();
        peer.ack_close(true);
        let session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(NoopTelemetry),
            Arc::new(LogSink),
            SessionConfig {
                close_timeout: Duration::from_secs(60),
            },
        );

        let started = tokio::time::Instant::now();
        let outcome = session.shutdown().await;

        assert_eq!(outcome, ShutdownOutcome::PeerAcknowledged);
        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(
            peer.frames(),
            vec![
                WrittenFrame::Close {
                    code: CloseCode::Normal,
                    reason: String::new()
                },
                WrittenFrame::Closed
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_times_out_on_silent_peer() {
        let (writer, reader, peer) = mock_connection();
        let session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(NoopTelemetry),
            Arc::new(LogSink),
            SessionConfig::default(),
        );

        let started = tokio::time::Instant::now();
        let outcome = session.shutdown().await;

        assert_eq!(outcome, ShutdownOutcome::TimedOut);
        assert!(started.elapsed() >= DEFAULT_CLOSE_TIMEOUT);
        assert_eq!(peer.close_frames(), 1);
        assert!(peer.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_close_frame_skips_wait() {
        let (writer, reader, peer) = mock_connection();
        peer.fail_close_frame(true);
        let session = ConnectionLifecycleManager::from_parts(
            writer,
            reader,
            Arc::new(NoopTelemetry),
            Arc::new(LogSink),
            SessionConfig::default(),
        );

        let started = tokio::time::Instant::now();
        let outcome = session.shutdown().await;

        assert_eq!(outcome, ShutdownOutcome::CloseFrameFailed);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(peer.frames(), vec![WrittenFrame::Closed]);
    }
}
