use std::path::Path;

use anyhow::{Context, Result, bail};
use debuglog_stream::{AckRecord, LogStream, QueryParams, StreamParams, TailerConfig};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Pipe capacity between a local stream and its printer
const LOCAL_PIPE_BYTES: usize = 64 * 1024;

/// Subscribe to a debuglog server and copy the streamed lines to `out`
pub async fn tail<W>(addr: &str, query: &str, out: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let (read_half, mut write_half) = stream.into_split();

    write_half
        .write_all(format!("{query}\n").as_bytes())
        .await
        .context("cannot send request")?;

    receive(read_half, out).await
}

/// Stream a local log file to `out`, filtered by `query`
pub async fn tail_file<W>(
    path: &Path,
    query: &str,
    config: TailerConfig,
    out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let query = query.strip_prefix('?').unwrap_or(query);
    let params = StreamParams::parse(&QueryParams::from_query(query))?;

    let (sink, source) = tokio::io::duplex(LOCAL_PIPE_BYTES);
    let stream = LogStream::new(params).with_config(config);
    let path = path.to_path_buf();
    let producer = tokio::spawn(async move { stream.serve(&path, sink).await });

    receive(source, out).await?;
    producer.await.context("log stream task failed")??;
    Ok(())
}

/// Check the acknowledgement line, then copy everything after it to `out`
async fn receive<R, W>(reader: R, out: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut ack_line = String::new();
    reader
        .read_line(&mut ack_line)
        .await
        .context("cannot read acknowledgement")?;
    let ack: AckRecord =
        serde_json::from_str(ack_line.trim_end()).context("malformed acknowledgement")?;
    if let Some(err) = ack.error {
        bail!("server rejected request: {}", err.message);
    }

    tokio::io::copy(&mut reader, out)
        .await
        .context("log stream interrupted")?;
    out.flush().await?;
    Ok(())
}
