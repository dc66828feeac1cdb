//! Initial read position for a stream
//!
//! The backlog is counted in *matching* lines: the backward scan runs every
//! complete line through the filter and only counts the ones that pass.

use std::io::{self, SeekFrom};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

use crate::filter::LineFilter;

/// Bytes read per step of the backward scan
const SCAN_CHUNK_SIZE: usize = 64 * 1024;

/// Seek `reader` to where tailing should begin and return that offset
///
/// - `from_start`: offset 0, `backlog` is ignored
/// - otherwise: the start of the `backlog`-th matching line counted back from
///   the current end, or 0 when fewer lines match
///
/// The end is read once; data appended during the scan is left for the tailer.
pub async fn position<R, F>(
    reader: &mut R,
    from_start: bool,
    backlog: u64,
    filter: &F,
) -> io::Result<u64>
where
    R: AsyncRead + AsyncSeek + Unpin,
    F: LineFilter + ?Sized,
{
    if from_start {
        return reader.seek(SeekFrom::Start(0)).await;
    }

    let end = reader.seek(SeekFrom::End(0)).await?;
    if backlog == 0 {
        return Ok(end);
    }

    let offset = scan_back(reader, end, backlog, filter).await?;
    reader.seek(SeekFrom::Start(offset)).await
}

async fn scan_back<R, F>(reader: &mut R, end: u64, backlog: u64, filter: &F) -> io::Result<u64>
where
    R: AsyncRead + AsyncSeek + Unpin,
    F: LineFilter + ?Sized,
{
    let mut found = 0u64;

    // Tail of the line currently being assembled, from chunks already scanned
    let mut pending: Vec<u8> = Vec::new();
    // Set once the newline ending the last complete line has been seen; bytes
    // after it form an unterminated fragment that is not counted.
    let mut terminated = false;

    let mut chunk = vec![0u8; SCAN_CHUNK_SIZE];
    let mut chunk_end = end;

    while chunk_end > 0 {
        let chunk_start = chunk_end.saturating_sub(SCAN_CHUNK_SIZE as u64);
        let len = (chunk_end - chunk_start) as usize;
        reader.seek(SeekFrom::Start(chunk_start)).await?;
        reader.read_exact(&mut chunk[..len]).await?;
        let buf = &chunk[..len];

        // Index in `buf` where the current line's content stops
        let mut line_end = len;
        for i in (0..len).rev() {
            if buf[i] != b'\n' {
                continue;
            }
            if terminated {
                let line_start = chunk_start + i as u64 + 1;
                let mut bytes = buf[i + 1..line_end].to_vec();
                bytes.append(&mut pending);
                if accepts(filter, &bytes) {
                    found += 1;
                    if found == backlog {
                        return Ok(line_start);
                    }
                }
            }
            pending.clear();
            terminated = true;
            line_end = i;
        }

        if terminated {
            let mut head = buf[..line_end].to_vec();
            head.append(&mut pending);
            pending = head;
        }
        chunk_end = chunk_start;
    }

    // The first line of the file has no newline in front of it
    if terminated && accepts(filter, &pending) {
        found += 1;
    }

    tracing::debug!(found, backlog, "backlog scan reached start of file");
    Ok(0)
}

fn accepts<F: LineFilter + ?Sized>(filter: &F, bytes: &[u8]) -> bool {
    filter.accept(String::from_utf8_lossy(bytes).trim_end_matches('\r'))
}
