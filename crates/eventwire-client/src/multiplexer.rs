//! Event Source Multiplexer
//!
//! Selects among the heartbeat timer, the burst timer, the interactive line
//! queue and the termination signal, dispatching one action per iteration.
//! Termination is always polled first, so a ready signal ends the loop even
//! when other sources are ready in the same iteration.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use eventwire_core::{format_timestamp, Event, MessageWriter, PayloadGenerator};

use crate::session::{ConnectionLifecycleManager, ShutdownOutcome};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BURST_INTERVAL: Duration = Duration::from_secs(30);

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConfig {
    pub heartbeat_interval: Duration,
    pub burst_interval: Duration,
    /// When set, every burst tick sends a null event and takes the process
    /// down. Turning it off leaves only the burst notice.
    pub fault_injection: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            burst_interval: DEFAULT_BURST_INTERVAL,
            fault_injection: true,
        }
    }
}

/// What the loop dispatched before it was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub heartbeats: u64,
    pub bursts: u64,
    pub lines: u64,
    pub shutdown: ShutdownOutcome,
}

// ----------------------------------------------------------------------------
// Multiplexer
// ----------------------------------------------------------------------------

pub struct EventSourceMultiplexer<W: MessageWriter, G: PayloadGenerator> {
    session: ConnectionLifecycleManager<W>,
    generator: G,
    lines: mpsc::Receiver<String>,
    config: SourceConfig,
}

impl<W: MessageWriter, G: PayloadGenerator> EventSourceMultiplexer<W, G> {
    pub fn new(
        session: ConnectionLifecycleManager<W>,
        generator: G,
        lines: mpsc::Receiver<String>,
        config: SourceConfig,
    ) -> Self {
        Self {
            session,
            generator,
            lines,
            config,
        }
    }

    /// Run until `terminate` resolves, then perform the close handshake
    ///
    /// Timers first fire one full period after the call. A closed line queue
    /// disables the interactive source; the loop keeps running on its timers.
    pub async fn run<S>(self, terminate: S) -> RunSummary
    where
        S: Future<Output = ()>,
    {
        let Self {
            mut session,
            mut generator,
            mut lines,
            config,
        } = self;

        let start = Instant::now();
        let mut heartbeat = interval_at(start + config.heartbeat_interval, config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut burst = interval_at(start + config.burst_interval, config.burst_interval);
        burst.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(terminate);
        let mut interactive_open = true;
        let (mut heartbeats, mut bursts, mut line_count) = (0u64, 0u64, 0u64);

        loop {
            let user = generator.profile();

            tokio::select! {
                biased;

                _ = &mut terminate => {
                    info!("interrupt");
                    if session.reader_finished() {
                        debug!("read task already stopped");
                    }
                    let shutdown = session.shutdown().await;
                    info!(
                        heartbeats,
                        bursts,
                        lines = line_count,
                        "connection closed: {:?}",
                        shutdown
                    );
                    return RunSummary {
                        heartbeats,
                        bursts,
                        lines: line_count,
                        shutdown,
                    };
                }

                fired = heartbeat.tick() => {
                    let fired_at = wall_clock_at(fired, Instant::now(), Local::now());
                    let event = Event::heartbeat(generator.classification(), fired_at, user);
                    session.send(Some(&event)).await;
                    heartbeats += 1;
                }

                _ = burst.tick() => {
                    bursts += 1;
                    println!("BOOM? - {}", format_timestamp(&Local::now()));
                    if config.fault_injection {
                        session.send(None).await;
                    } else {
                        debug!("fault injection disabled, burst skipped");
                    }
                }

                line = lines.recv(), if interactive_open => match line {
                    Some(text) => {
                        let event = Event::interactive(text, generator.classification(), Local::now(), user);
                        session.send(Some(&event)).await;
                        line_count += 1;
                    }
                    None => {
                        debug!("interactive input closed");
                        interactive_open = false;
                    }
                },
            }
        }
    }
}

/// Wall-clock time of a monotonic instant, given one paired reading of both clocks
fn wall_clock_at(at: Instant, now: Instant, wall_now: DateTime<Local>) -> DateTime<Local> {
    let lag = now.saturating_duration_since(at);
    chrono::Duration::from_std(lag)
        .map(|lag| wall_now - lag)
        .unwrap_or(wall_now)
}
