//! The wire format spoken over the preloader's Unix domain socket:
//! length-prefixed JSON frames, one request per connection.

use std::io::{Read, Write};

use anyhow::{Context, Result, bail};
use corpusflow_registry::JobContext;
use serde::{Deserialize, Serialize};

/// One request a client sends to the preloader server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Ask a preloaded worker to run one job.
    Dispatch {
        preload_target: String,
        config_fingerprint: String,
        ctx: JobContext,
    },
    /// Ask the server to finish in-flight jobs, tear down every worker
    /// pool, and remove its socket file.
    Shutdown,
}

/// The server's reply to a `Dispatch` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    Ran,
    /// The target exists but every worker is currently busy; a
    /// `force_preloader` caller retries, anything else falls back to an
    /// unpreloaded run.
    Busy,
    /// The registry or resolved config the caller compiled against no
    /// longer matches this worker pool's fingerprint.
    ConfigMismatch { expected: String, actual: String },
    /// No worker pool is registered for `preload_target`.
    UnknownTarget(String),
    /// The processor's `run` returned an error.
    Failed(String),
    ShuttingDown,
}

const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> Result<()> {
    let bytes = serde_json::to_vec(message).context("serializing preloader frame")?;
    let len = u32::try_from(bytes.len()).context("preloader frame too large")?;
    writer.write_all(&len.to_be_bytes()).context("writing frame length")?;
    writer.write_all(&bytes).context("writing frame body")?;
    writer.flush().context("flushing preloader socket")?;
    Ok(())
}

pub fn read_frame<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).context("reading frame length")?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        bail!("preloader frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte limit");
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).context("reading frame body")?;
    serde_json::from_slice(&body).context("deserializing preloader frame")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_dispatch_request() {
        let ctx = JobContext { source_file: Some("doc".into()), corpus_id: "mycorpus".into(), params: BTreeMap::new() };
        let msg = ClientMessage::Dispatch { preload_target: "wsd:tag".into(), config_fingerprint: "abc".into(), ctx };

        let mut buf = Vec::new();
        write_frame(&mut buf, &msg).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded: ClientMessage = read_frame(&mut cursor).unwrap();

        match decoded {
            ClientMessage::Dispatch { preload_target, .. } => assert_eq!(preload_target, "wsd:tag"),
            _ => panic!("expected a dispatch message"),
        }
    }

    #[test]
    fn rejects_frames_claiming_an_excessive_length() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        let err = read_frame::<_, ClientMessage>(&mut cursor).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }
}
