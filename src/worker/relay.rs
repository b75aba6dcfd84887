//! Relay of the worker's output streams into the daemon log.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

/// Which child stream a relay drains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_label(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Drains `reader` line by line until EOF.
///
/// Stdout lines become `info` records, stderr lines `warn` records. Empty lines are
/// dropped. The relay never stops reading early, so the child cannot block on a
/// full pipe.
pub(crate) async fn relay<R>(reader: R, stream: Stream)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let label = stream.as_label();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.is_empty() => {}
            Ok(Some(line)) => match stream {
                Stream::Stdout => info!(target: "worker", stream = label, "{line}"),
                Stream::Stderr => warn!(target: "worker", stream = label, "{line}"),
            },
            Ok(None) => break,
            Err(err) => {
                debug!(target: "worker", stream = label, error = %err, "output relay stopped");
                break;
            }
        }
    }
}
