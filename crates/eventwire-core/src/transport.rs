//! Transport seam
//!
//! The client never touches wire framing directly. A [`Connector`] dials a URL
//! and hands back the two halves of one connection: the [`MessageWriter`]
//! stays with the lifecycle manager, the [`MessageReader`] moves into the read
//! task. Each half is driven by exactly one task.

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;

use crate::errors::TransportResult;

// ----------------------------------------------------------------------------
// Wire Types
// ----------------------------------------------------------------------------

/// Status code carried by a control close frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// 1000
    Normal,
    /// 1001
    GoingAway,
    Other(u16),
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::Other(code) => code,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            other => CloseCode::Other(other),
        }
    }
}

/// Application message received from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl InboundMessage {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            InboundMessage::Text(text) => Cow::Borrowed(text),
            InboundMessage::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

// ----------------------------------------------------------------------------
// Transport Traits
// ----------------------------------------------------------------------------

/// Write half of a connection
#[async_trait]
pub trait MessageWriter: Send {
    /// Send one application message
    async fn send_text(&mut self, payload: String) -> TransportResult<()>;

    /// Send a control close frame announcing shutdown
    async fn send_close(&mut self, code: CloseCode, reason: &str) -> TransportResult<()>;

    /// Tear the connection down; no frames are sent after this
    async fn close(&mut self) -> TransportResult<()>;
}

/// Read half of a connection
#[async_trait]
pub trait MessageReader: Send + 'static {
    /// Wait for the next application message. A peer close, end of stream or
    /// protocol failure is an error.
    async fn receive(&mut self) -> TransportResult<InboundMessage>;
}

/// Dials the remote endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    type Writer: MessageWriter;
    type Reader: MessageReader;

    async fn connect(&self, url: &str) -> TransportResult<(Self::Writer, Self::Reader)>;
}
