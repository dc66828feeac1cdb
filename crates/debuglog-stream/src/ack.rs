//! Acknowledgement record sent before any log content
//!
//! Exactly one JSON line: `{"error":null}` when the stream is about to start,
//! or `{"error":{"message":"..."}}` when it will not.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Result, StreamError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckRecord {
    pub error: Option<AckError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckError {
    pub message: String,
}

impl AckRecord {
    pub fn ok() -> Self {
        Self { error: None }
    }

    pub fn failed(err: impl Display) -> Self {
        Self {
            error: Some(AckError {
                message: err.to_string(),
            }),
        }
    }

    /// Newline-terminated JSON encoding
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut message = serde_json::to_vec(self)?;
        message.push(b'\n');
        Ok(message)
    }
}

/// Tell the subscriber the stream is starting
pub async fn send_ok<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<()> {
    send(writer, &AckRecord::ok()).await
}

/// Report `err` to the subscriber and close the connection
pub async fn send_error<W: AsyncWrite + Unpin>(writer: &mut W, err: impl Display) -> Result<()> {
    let sent = send(writer, &AckRecord::failed(err)).await;
    let _ = writer.shutdown().await;
    sent
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, record: &AckRecord) -> Result<()> {
    let message = record.encode()?;
    writer
        .write_all(&message)
        .await
        .map_err(StreamError::Transport)?;
    writer.flush().await.map_err(StreamError::Transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParamError;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_encode_ok() {
        let encoded = AckRecord::ok().encode().unwrap();
        assert_eq!(encoded, b"{\"error\":null}\n");
    }

    #[test]
    fn test_encode_failure() {
        let encoded = AckRecord::failed("cannot open log file: gone")
            .encode()
            .unwrap();
        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            "{\"error\":{\"message\":\"cannot open log file: gone\"}}\n"
        );
    }

    #[tokio::test]
    async fn test_send_error_closes() {
        let (mut server, mut client) = tokio::io::duplex(256);
        let err = ParamError::InvalidLevel("LOUD".into());
        send_error(&mut server, &err).await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        let record: AckRecord = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(record, AckRecord::failed(&err));
    }
}
