//! Interactive line source
//!
//! Line reads block, so they run on a dedicated thread that feeds a channel.
//! The multiplexer only ever awaits the channel.

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use eventwire_core::{CompletionMarker, CompletionWaiter};

/// Lines buffered between the reader thread and the main loop
pub const LINE_QUEUE_CAPACITY: usize = 16;

/// Handle to a running line reader
pub struct LineReader {
    pub lines: mpsc::Receiver<String>,
    /// Fires when the input is exhausted or fails
    pub finished: CompletionWaiter,
}

/// Start reading `input` line by line on its own thread. The thread exits at
/// end of input, on a read error, or once the receiving side is dropped.
pub fn spawn_line_reader<R>(input: R) -> std::io::Result<LineReader>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_QUEUE_CAPACITY);
    let (marker, finished) = CompletionMarker::new();

    thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            debug!("line queue closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("stdin: {}", e);
                        break;
                    }
                }
            }
            marker.fire();
        })?;

    Ok(LineReader {
        lines: rx,
        finished,
    })
}
