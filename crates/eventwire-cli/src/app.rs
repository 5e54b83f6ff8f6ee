//! Process wiring: telemetry, connection, line reader and the main loop

use std::io::BufReader;
use std::sync::Arc;

use rand::rngs::StdRng;
use tracing::{debug, error, info};

use eventwire_client::{
    spawn_line_reader, ConnectionLifecycleManager, EventSourceMultiplexer, LineReader, LogSink,
    RunSummary, WsConnector,
};
use eventwire_core::{NoopTelemetry, RandomPayloads, Telemetry, TracingTelemetry};

use crate::config::AppConfig;
use crate::error::Result;

/// Build the telemetry sink; without a project only detached spans are produced
pub fn build_telemetry(config: &AppConfig) -> Arc<dyn Telemetry> {
    match TracingTelemetry::new(config.service_context()) {
        Ok(telemetry) => Arc::new(telemetry),
        Err(e) => {
            debug!("telemetry disabled: {}", e);
            Arc::new(NoopTelemetry)
        }
    }
}

/// Connect, run until interrupted, and close the connection
///
/// Returns an error only when the client cannot start; everything after the
/// connection is up is handled inside the loop.
pub async fn run(config: AppConfig) -> Result<RunSummary> {
    let url = config.url()?;
    let telemetry = build_telemetry(&config);

    let session = ConnectionLifecycleManager::connect(
        &WsConnector,
        url.as_str(),
        telemetry,
        Arc::new(LogSink),
        config.session(),
    )
    .await?;

    let LineReader {
        lines,
        mut finished,
    } = spawn_line_reader(BufReader::new(std::io::stdin()))?;
    tokio::spawn(async move {
        finished.wait().await;
        info!("stdin reached end of input; timers keep running");
    });
    let generator: RandomPayloads<StdRng> = RandomPayloads::new();

    let multiplexer = EventSourceMultiplexer::new(session, generator, lines, config.sources());
    Ok(multiplexer.run(interrupt()).await)
}

/// One-line exit report covering every source the loop dispatched
pub fn describe_summary(summary: &RunSummary) -> String {
    format!(
        "sent {} heartbeats and {} lines after {} bursts; shutdown {:?}",
        summary.heartbeats, summary.lines, summary.bursts, summary.shutdown
    )
}

/// Resolves on the first interrupt signal
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("signal: {}", e);
        std::future::pending::<()>().await;
    }
}
