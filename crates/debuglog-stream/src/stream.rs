use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite};
use tracing::debug;

use crate::ack;
use crate::error::{Result, StreamError};
use crate::filter::{FilterChain, LineFilter};
use crate::params::StreamParams;
use crate::position::position;
use crate::signal::CapSignal;
use crate::tailer::{Tailer, TailerConfig};

/// One subscriber's stream over a log source
///
/// Positions the source, acknowledges the subscriber, then tails matching
/// lines until the source ends, the sink fails, or `maxLines` lines have been
/// delivered. A stream is consumed by [`LogStream::run`].
pub struct LogStream {
    params: StreamParams,
    filter: Arc<FilterChain>,
    line_count: Arc<AtomicU64>,
    max_lines_reached: Arc<CapSignal>,
    tailer: Option<Tailer>,
    config: TailerConfig,
}

impl LogStream {
    pub fn new(params: StreamParams) -> Self {
        Self {
            filter: Arc::new(FilterChain::new(&params)),
            params,
            line_count: Arc::new(AtomicU64::new(0)),
            max_lines_reached: Arc::new(CapSignal::new()),
            tailer: None,
            config: TailerConfig::default(),
        }
    }

    /// Set the tailer behaviour at end of file
    pub fn with_config(mut self, config: TailerConfig) -> Self {
        self.config = config;
        self
    }

    /// Matching lines counted so far (only counted when `maxLines` is set)
    pub fn line_count(&self) -> u64 {
        self.line_count.load(Ordering::Acquire)
    }

    /// Open the log file at `path` and stream it to `writer`
    ///
    /// An open failure is reported to the subscriber before returning.
    pub async fn serve<W>(self, path: &Path, mut writer: W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(source) => {
                let err = StreamError::SourceOpen {
                    path: path.to_path_buf(),
                    source,
                };
                let _ = ack::send_error(&mut writer, &err).await;
                return Err(err);
            }
        };
        self.run(file, writer).await
    }

    /// Position `reader`, acknowledge, and tail until done
    pub async fn run<R, W>(mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let offset = match position(
            &mut reader,
            self.params.from_start,
            self.params.backlog,
            self.filter.as_ref(),
        )
        .await
        {
            Ok(offset) => offset,
            Err(e) => {
                let err = StreamError::Positioning(e);
                let _ = ack::send_error(&mut writer, &err).await;
                return Err(err);
            }
        };
        debug!(offset, "log source positioned");

        ack::send_ok(&mut writer).await?;

        self.start(reader, writer);
        let result = self.wait().await;
        debug!(lines = self.line_count(), "log stream finished");
        result
    }

    fn start<R, W>(&mut self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let filter = CountedFilter {
            chain: Arc::clone(&self.filter),
            max_lines: self.params.max_lines,
            count: Arc::clone(&self.line_count),
            max_lines_reached: Arc::clone(&self.max_lines_reached),
        };
        self.tailer = Some(Tailer::spawn(reader, writer, filter, self.config.clone()));
    }

    /// Block until the tailer is done or the maximum line count is reached
    async fn wait(&mut self) -> Result<()> {
        let Some(mut tailer) = self.tailer.take() else {
            return Ok(());
        };

        let max_lines_reached = tokio::select! {
            _ = tailer.dead() => false,
            _ = self.max_lines_reached.fired() => true,
        };

        if !max_lines_reached {
            return tailer.wait().await;
        }

        debug!(max_lines = self.params.max_lines, "maximum line count reached");
        tailer.stop();
        if let Err(e) = tailer.wait().await {
            debug!(error = %e, "tailer ended with error after reaching line limit");
        }
        Ok(())
    }
}

/// Filter chain that also enforces `maxLines`
///
/// Once the limit is reached every further line is rejected and the
/// completion signal has fired.
struct CountedFilter {
    chain: Arc<FilterChain>,
    max_lines: u64,
    count: Arc<AtomicU64>,
    max_lines_reached: Arc<CapSignal>,
}

impl LineFilter for CountedFilter {
    fn accept(&self, line: &str) -> bool {
        if !self.chain.accept(line) {
            return false;
        }
        if self.max_lines == 0 {
            return true;
        }

        let counted = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_lines).then_some(n + 1)
            });
        match counted {
            Ok(previous) => {
                if previous + 1 == self.max_lines {
                    self.max_lines_reached.fire();
                }
                true
            }
            Err(_) => false,
        }
    }
}
