//! Test doubles: a scripted in-memory connection and a recording telemetry sink

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::{TelemetryError, TelemetryResult, TransportError, TransportResult};
use crate::telemetry::{Telemetry, TelemetrySpan};
use crate::transport::{CloseCode, Connector, InboundMessage, MessageReader, MessageWriter};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ----------------------------------------------------------------------------
// Mock Connection
// ----------------------------------------------------------------------------

/// Everything the client wrote, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrittenFrame {
    Text(String),
    Close { code: CloseCode, reason: String },
    /// The handle was torn down
    Closed,
}

#[derive(Debug, Default)]
struct PeerBehavior {
    fail_sends: bool,
    fail_close_frame: bool,
    ack_close: bool,
}

#[derive(Debug, Default)]
struct Shared {
    frames: Vec<WrittenFrame>,
    behavior: PeerBehavior,
}

type Inbound = TransportResult<InboundMessage>;

/// Remote end of a mock connection, held by the test
#[derive(Clone)]
pub struct MockPeer {
    shared: Arc<Mutex<Shared>>,
    inbound: mpsc::UnboundedSender<Inbound>,
}

impl MockPeer {
    /// Deliver an application message to the client's read half
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.inbound.send(Ok(InboundMessage::Text(text.into())));
    }

    /// Fail the client's next receive as if the peer closed the connection
    pub fn close_from_peer(&self) {
        let _ = self.inbound.send(Err(TransportError::ClosedByPeer {
            code: CloseCode::Normal.into(),
            reason: String::new(),
        }));
    }

    /// Make every application write fail
    pub fn fail_sends(&self, fail: bool) {
        lock(&self.shared).behavior.fail_sends = fail;
    }

    /// Make the control close frame fail
    pub fn fail_close_frame(&self, fail: bool) {
        lock(&self.shared).behavior.fail_close_frame = fail;
    }

    /// Answer a close frame by closing the connection from this side
    pub fn ack_close(&self, ack: bool) {
        lock(&self.shared).behavior.ack_close = ack;
    }

    pub fn frames(&self) -> Vec<WrittenFrame> {
        lock(&self.shared).frames.clone()
    }

    /// Payloads of all application messages written so far
    pub fn texts(&self) -> Vec<String> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                WrittenFrame::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn close_frames(&self) -> usize {
        self.frames()
            .iter()
            .filter(|frame| matches!(frame, WrittenFrame::Close { .. }))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.frames().contains(&WrittenFrame::Closed)
    }
}

/// Write half of a mock connection
pub struct MockWriter {
    peer: MockPeer,
}

/// Read half of a mock connection
pub struct MockReader {
    inbound: mpsc::UnboundedReceiver<Inbound>,
}

/// Create a connected writer/reader pair and the peer controlling them
pub fn mock_connection() -> (MockWriter, MockReader, MockPeer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let peer = MockPeer {
        shared: Arc::new(Mutex::new(Shared::default())),
        inbound: tx,
    };
    (MockWriter { peer: peer.clone() }, MockReader { inbound: rx }, peer)
}

#[async_trait]
impl MessageWriter for MockWriter {
    async fn send_text(&mut self, payload: String) -> TransportResult<()> {
        let mut shared = lock(&self.peer.shared);
        if shared.behavior.fail_sends {
            return Err(TransportError::SendFailed {
                reason: "mock send failure".to_string(),
            });
        }
        shared.frames.push(WrittenFrame::Text(payload));
        Ok(())
    }

    async fn send_close(&mut self, code: CloseCode, reason: &str) -> TransportResult<()> {
        let ack = {
            let mut shared = lock(&self.peer.shared);
            if shared.behavior.fail_close_frame {
                return Err(TransportError::SendFailed {
                    reason: "mock close frame failure".to_string(),
                });
            }
            shared.frames.push(WrittenFrame::Close {
                code,
                reason: reason.to_string(),
            });
            shared.behavior.ack_close
        };
        if ack {
            self.peer.close_from_peer();
        }
        Ok(())
    }

    async fn close(&mut self) -> TransportResult<()> {
        lock(&self.peer.shared).frames.push(WrittenFrame::Closed);
        let _ = self.peer.inbound.send(Err(TransportError::Closed));
        Ok(())
    }
}

#[async_trait]
impl MessageReader for MockReader {
    async fn receive(&mut self) -> TransportResult<InboundMessage> {
        match self.inbound.recv().await {
            Some(result) => result,
            None => Err(TransportError::Closed),
        }
    }
}

/// Connector handing out one prepared mock connection
pub struct MockConnector {
    connection: Mutex<Option<(MockWriter, MockReader)>>,
}

impl MockConnector {
    pub fn new() -> (Self, MockPeer) {
        let (writer, reader, peer) = mock_connection();
        let connector = Self {
            connection: Mutex::new(Some((writer, reader))),
        };
        (connector, peer)
    }

    /// Connector whose every dial fails
    pub fn refusing() -> Self {
        Self {
            connection: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Writer = MockWriter;
    type Reader = MockReader;

    async fn connect(&self, url: &str) -> TransportResult<(MockWriter, MockReader)> {
        lock(&self.connection)
            .take()
            .ok_or_else(|| TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
    }
}

// ----------------------------------------------------------------------------
// Recording Telemetry
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryCall {
    Start(&'static str),
    Finish(&'static str),
    Catch { context: String, message: String },
}

/// Telemetry that records calls and can be told to fail all of them
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    calls: Arc<Mutex<Vec<TelemetryCall>>>,
    failing: bool,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that records calls but reports an error from each one
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TelemetryCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: TelemetryCall) -> TelemetryResult<()> {
        lock(&self.calls).push(call);
        if self.failing {
            return Err(TelemetryError::ReportDropped {
                reason: "recording sink configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

impl Telemetry for RecordingTelemetry {
    fn start_span(&self, name: &'static str) -> TelemetryResult<TelemetrySpan> {
        self.record(TelemetryCall::Start(name))
            .map(|_| TelemetrySpan::detached(name))
            .map_err(|e| TelemetryError::SpanStart {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn finish_span(&self, span: TelemetrySpan) -> TelemetryResult<()> {
        self.record(TelemetryCall::Finish(span.name()))
            .map_err(|e| TelemetryError::SpanFinish {
                name: span.name().to_string(),
                reason: e.to_string(),
            })
    }

    fn catch(&self, context: &str, message: &str) -> TelemetryResult<()> {
        self.record(TelemetryCall::Catch {
            context: context.to_string(),
            message: message.to_string(),
        })
    }
}
