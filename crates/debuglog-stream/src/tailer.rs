//! Forward tailing of a positioned log source
//!
//! A line is complete once its `\n` has been read; partial lines are held
//! until the rest arrives. At end of file a following tailer idles and polls.
//! A non-following tailer treats end of file as "source exhausted": it
//! delivers any trailing unterminated line (with a `\n` appended) and stops.
//! That fragment is delivered even though the backlog scan does not count it,
//! so `backlog=1` over `a\nb\npart` yields `b` and `part`.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StreamError};
use crate::filter::LineFilter;

/// Default delay between checks for new data at end of file
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Tailer behaviour at end of file
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// How long to idle before checking for appended data
    pub poll_interval: Duration,

    /// Keep waiting for new data at end of file; when false the tailer
    /// stops cleanly once the source is exhausted
    pub follow: bool,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            follow: true,
        }
    }
}

/// Background task copying filtered lines from a reader to a writer
///
/// The task is the only writer to its sink. It ends when stopped, when the
/// source is exhausted (without `follow`), or on the first read or write
/// failure.
pub struct Tailer {
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
    outcome: Option<Result<()>>,
}

impl Tailer {
    /// Start tailing `reader` from its current position
    pub fn spawn<R, W, F>(reader: R, writer: W, filter: F, config: TailerConfig) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        F: LineFilter + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tail_loop(reader, writer, filter, config, cancel.clone()));

        Self {
            cancel,
            handle,
            outcome: None,
        }
    }

    /// Ask the tailer to stop. A line already being written is completed.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait for the tailer task to end, for whatever reason
    ///
    /// Cancel-safe; the outcome is kept for [`Tailer::wait`].
    pub async fn dead(&mut self) {
        if self.outcome.is_none() {
            let joined = (&mut self.handle).await;
            self.outcome = Some(joined.unwrap_or_else(|e| {
                Err(StreamError::SourceIo(io::Error::other(format!(
                    "tailer task failed: {e}"
                ))))
            }));
        }
    }

    /// Wait for the tailer to end and return its outcome
    pub async fn wait(mut self) -> Result<()> {
        self.dead().await;
        self.outcome.take().unwrap_or(Ok(()))
    }
}

impl Drop for Tailer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn tail_loop<R, W, F>(
    reader: R,
    mut writer: W,
    filter: F,
    config: TailerConfig,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: LineFilter,
{
    let mut reader = BufReader::new(reader);
    // Bytes of the line being read; kept across EOF until its newline arrives
    let mut line = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(StreamError::SourceIo)?;

        if line.ends_with(b"\n") {
            deliver(&mut writer, &filter, &line).await?;
            line.clear();
            continue;
        }

        // End of file
        if !config.follow {
            // trailing fragment, see module docs
            if !line.is_empty() {
                line.push(b'\n');
                deliver(&mut writer, &filter, &line).await?;
            }
            tracing::debug!("log source exhausted");
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}

/// Write a newline-terminated line if the filter accepts it
async fn deliver<W, F>(writer: &mut W, filter: &F, line: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
    F: LineFilter,
{
    let accepted = {
        let text = String::from_utf8_lossy(&line[..line.len() - 1]);
        filter.accept(text.trim_end_matches('\r'))
    };
    if !accepted {
        return Ok(());
    }

    let written = async {
        writer.write_all(line).await?;
        writer.flush().await
    }
    .await;
    written.map_err(|e| {
        tracing::warn!(error = %e, "cannot deliver log line to subscriber");
        StreamError::Transport(e)
    })
}
