//! eventwire client
//!
//! One persistent WebSocket connection, three outbound sources and a
//! concurrent read path:
//! - [`session`]: connection ownership, read task, sends, close handshake
//! - [`multiplexer`]: heartbeat, burst, interactive and termination sources
//! - [`input`]: blocking line reader feeding the interactive source
//! - [`ws`]: the `tokio-tungstenite` transport

pub mod endpoint;
pub mod error;
pub mod input;
pub mod multiplexer;
pub mod session;
pub mod ws;

pub use endpoint::event_url;
pub use error::{ClientError, Result};
pub use input::{spawn_line_reader, LineReader};
pub use multiplexer::{EventSourceMultiplexer, RunSummary, SourceConfig};
pub use session::{
    ConnectionLifecycleManager, ConnectionState, InboundSink, LogSink, SessionConfig,
    ShutdownOutcome,
};
pub use ws::{WsConnector, WsReader, WsWriter};
