//! eventwire core
//!
//! Event model, payload generators, and the seams the client is built
//! against: the transport traits, the observability sink and the one-shot
//! completion marker. Nothing in this crate performs network I/O.

pub mod completion;
pub mod errors;
pub mod event;
pub mod profile;
pub mod telemetry;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use completion::{CompletionMarker, CompletionWaiter};
pub use errors::{TelemetryError, TelemetryResult, TransportError, TransportResult};
pub use event::{format_timestamp, Event, EventKind};
pub use profile::{PayloadGenerator, Profile, RandomPayloads};
pub use telemetry::{
    NoopTelemetry, ServiceContext, Telemetry, TelemetrySpan, TracingTelemetry, CONNECT_SPAN,
    SEND_SPAN,
};
pub use transport::{CloseCode, Connector, InboundMessage, MessageReader, MessageWriter};
