//! WebSocket transport over `tokio-tungstenite`
//!
//! The stream is split once at connect time. Control frames (ping/pong) are
//! answered by tungstenite and never reach the reader's caller.

use std::borrow::Cow;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use eventwire_core::{
    CloseCode, Connector, InboundMessage, MessageReader, MessageWriter, TransportError,
    TransportResult,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Status reported when the peer closes without a code
const NO_STATUS_RECEIVED: u16 = 1005;

/// Dials `ws://` and `wss://` endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

pub struct WsWriter {
    sink: SplitSink<WsStream, Message>,
}

pub struct WsReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl Connector for WsConnector {
    type Writer = WsWriter;
    type Reader = WsReader;

    async fn connect(&self, url: &str) -> TransportResult<(WsWriter, WsReader)> {
        let (ws, response) =
            connect_async(url)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        debug!("handshake status: {}", response.status());

        let (sink, stream) = ws.split();
        Ok((WsWriter { sink }, WsReader { stream }))
    }
}

#[async_trait]
impl MessageWriter for WsWriter {
    async fn send_text(&mut self, payload: String) -> TransportResult<()> {
        self.sink
            .send(Message::Text(payload))
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })
    }

    async fn send_close(&mut self, code: CloseCode, reason: &str) -> TransportResult<()> {
        let frame = CloseFrame {
            code: WsCloseCode::from(u16::from(code)),
            reason: Cow::Owned(reason.to_string()),
        };
        self.sink
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.sink.close().await.map_err(|e| TransportError::SendFailed {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MessageReader for WsReader {
    async fn receive(&mut self) -> TransportResult<InboundMessage> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(InboundMessage::Text(text)),
                Some(Ok(Message::Binary(bytes))) => return Ok(InboundMessage::Binary(bytes)),
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                    return Err(TransportError::ClosedByPeer { code, reason });
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed {
                        reason: e.to_string(),
                    })
                }
                None => return Err(TransportError::Closed),
            }
        }
    }
}
