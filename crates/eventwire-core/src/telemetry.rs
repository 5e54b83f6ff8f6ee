//! Observability sink
//!
//! Spans bracket connection establishment and every send; `catch` reports a
//! failure that is about to take the process down. The sink is injected into
//! the lifecycle manager, never reached through global state. Callers treat
//! every [`TelemetryError`] as non-fatal.

use std::time::{Duration, Instant};

use tracing::{debug, error, info_span, Span};

use crate::errors::{TelemetryError, TelemetryResult};

/// Span name around connection establishment
pub const CONNECT_SPAN: &str = "wsclient-connect";
/// Span name around one send
pub const SEND_SPAN: &str = "wsclient-send";

// ----------------------------------------------------------------------------
// Span Handle
// ----------------------------------------------------------------------------

/// One open span; hand it back to [`Telemetry::finish_span`] when done
#[derive(Debug)]
pub struct TelemetrySpan {
    name: &'static str,
    started: Instant,
    span: Span,
}

impl TelemetrySpan {
    pub fn new(name: &'static str, span: Span) -> Self {
        Self {
            name,
            started: Instant::now(),
            span,
        }
    }

    /// Span that is not attached to any subscriber
    pub fn detached(name: &'static str) -> Self {
        Self::new(name, Span::none())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

// ----------------------------------------------------------------------------
// Telemetry Trait
// ----------------------------------------------------------------------------

/// Span and error reporting capabilities
pub trait Telemetry: Send + Sync {
    fn start_span(&self, name: &'static str) -> TelemetryResult<TelemetrySpan>;

    fn finish_span(&self, span: TelemetrySpan) -> TelemetryResult<()>;

    /// Report a fault observed in `context`
    fn catch(&self, context: &str, message: &str) -> TelemetryResult<()>;
}

/// Service identity attached to spans and reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    pub project: String,
    pub service: String,
    pub version: String,
}

impl ServiceContext {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            service: "ws".to_string(),
            version: "v1.0".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

/// Telemetry emitted as `tracing` spans and events
#[derive(Debug, Clone)]
pub struct TracingTelemetry {
    context: ServiceContext,
}

impl TracingTelemetry {
    pub fn new(context: ServiceContext) -> TelemetryResult<Self> {
        if context.project.trim().is_empty() {
            return Err(TelemetryError::ReportDropped {
                reason: "no project configured".to_string(),
            });
        }
        Ok(Self { context })
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }
}

impl Telemetry for TracingTelemetry {
    fn start_span(&self, name: &'static str) -> TelemetryResult<TelemetrySpan> {
        let span = info_span!(
            "span",
            span_name = name,
            project = %self.context.project,
            service = %self.context.service,
        );
        Ok(TelemetrySpan::new(name, span))
    }

    fn finish_span(&self, span: TelemetrySpan) -> TelemetryResult<()> {
        let elapsed = span.elapsed();
        span.span().in_scope(|| {
            debug!(elapsed_us = elapsed.as_micros() as u64, "{} finished", span.name());
        });
        Ok(())
    }

    fn catch(&self, context: &str, message: &str) -> TelemetryResult<()> {
        error!(
            project = %self.context.project,
            service = %self.context.service,
            version = %self.context.version,
            context,
            "reported: {}",
            message
        );
        Ok(())
    }
}

/// Telemetry that only hands out detached spans
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn start_span(&self, name: &'static str) -> TelemetryResult<TelemetrySpan> {
        Ok(TelemetrySpan::detached(name))
    }

    fn finish_span(&self, _span: TelemetrySpan) -> TelemetryResult<()> {
        Ok(())
    }

    fn catch(&self, _context: &str, _message: &str) -> TelemetryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_telemetry_requires_project() {
        assert!(TracingTelemetry::new(ServiceContext::new("")).is_err());
        assert!(TracingTelemetry::new(ServiceContext::new("  ")).is_err());

        let telemetry = TracingTelemetry::new(ServiceContext::new("demo-project")).unwrap();
        assert_eq!(telemetry.context().service, "ws");
        assert_eq!(telemetry.context().version, "v1.0");
    }

    #[test]
    fn test_span_lifecycle() {
        let telemetry = TracingTelemetry::new(ServiceContext::new("demo-project")).unwrap();
        let span = telemetry.start_span(SEND_SPAN).unwrap();
        assert_eq!(span.name(), SEND_SPAN);
        assert!(telemetry.finish_span(span).is_ok());
        assert!(telemetry.catch("send", "boom").is_ok());
    }

    #[test]
    fn test_noop_spans_are_detached() {
        let span = NoopTelemetry.start_span(CONNECT_SPAN).unwrap();
        assert!(span.span().is_none());
        assert!(NoopTelemetry.finish_span(span).is_ok());
    }
}
