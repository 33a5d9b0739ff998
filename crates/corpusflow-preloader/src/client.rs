//! The preloader client the scheduler (or a CLI's `preload stop`
//! verb) talks to the server through.

use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use corpusflow_registry::JobContext;
use corpusflow_retry::{RetryExecutor, RetryPolicy};

use crate::error::PreloaderError;
use crate::protocol::{ClientMessage, ServerMessage, read_frame, write_frame};

/// One dispatch attempt's outcome once the server has actually run the
/// job (as opposed to refusing it with `Busy`/`ConfigMismatch`).
pub enum DispatchOutcome {
    Ran,
    Failed(String),
}

fn connect(socket_path: &Path) -> Result<UnixStream, PreloaderError> {
    UnixStream::connect(socket_path).map_err(|source| PreloaderError::SocketUnavailable { path: socket_path.display().to_string(), source })
}

/// Dispatches one job to the preloader, failing immediately on `Busy`
/// rather than retrying — the caller's own fallback (running the job
/// unpreloaded) takes over.
pub fn dispatch_once(socket_path: &Path, preload_target: &str, config_fingerprint: &str, ctx: &JobContext) -> Result<DispatchOutcome, PreloaderError> {
    let mut stream = connect(socket_path)?;
    let request = ClientMessage::Dispatch { preload_target: preload_target.to_string(), config_fingerprint: config_fingerprint.to_string(), ctx: ctx.clone() };
    write_frame(&mut stream, &request).map_err(|e| PreloaderError::Protocol(e.to_string()))?;
    let reply: ServerMessage = read_frame(&mut stream).map_err(|e| PreloaderError::Protocol(e.to_string()))?;
    interpret(preload_target, reply)
}

/// `force_preloader` behavior (§6): block and retry with backoff while
/// the server reports `Busy` instead of falling back to an unpreloaded
/// run, using the same retry machinery the scheduler's own backoff
/// chain is built on.
pub fn dispatch_blocking(socket_path: &Path, preload_target: &str, config_fingerprint: &str, ctx: &JobContext) -> Result<DispatchOutcome, PreloaderError> {
    let executor = RetryExecutor::from_policy(RetryPolicy::Aggressive);
    executor.run(|_attempt| match dispatch_once(socket_path, preload_target, config_fingerprint, ctx) {
        Err(PreloaderError::Busy(_)) => Err(PreloaderError::Busy(preload_target.to_string())),
        other => other,
    })
}

fn interpret(preload_target: &str, reply: ServerMessage) -> Result<DispatchOutcome, PreloaderError> {
    match reply {
        ServerMessage::Ran => Ok(DispatchOutcome::Ran),
        ServerMessage::Failed(reason) => Ok(DispatchOutcome::Failed(reason)),
        ServerMessage::Busy => Err(PreloaderError::Busy(preload_target.to_string())),
        ServerMessage::ConfigMismatch { expected, actual } => {
            Err(PreloaderError::ConfigMismatch { target: preload_target.to_string(), expected, actual })
        }
        ServerMessage::UnknownTarget(target) => Err(PreloaderError::UnknownTarget(target)),
        ServerMessage::ShuttingDown => Err(PreloaderError::Protocol("server is shutting down".into())),
    }
}

/// Sends a `Shutdown` request and waits briefly for the server to
/// acknowledge it, for the `preload stop` CLI verb.
pub fn shutdown(socket_path: &Path) -> Result<(), PreloaderError> {
    let mut stream = connect(socket_path)?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|source| PreloaderError::SocketUnavailable { path: socket_path.display().to_string(), source })?;
    write_frame(&mut stream, &ClientMessage::Shutdown).map_err(|e| PreloaderError::Protocol(e.to_string()))?;
    let _reply: ServerMessage = read_frame(&mut stream).map_err(|e| PreloaderError::Protocol(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_without_a_listening_server_reports_socket_unavailable() {
        let path = Path::new("/tmp/corpusflow-preloader-test-missing.sock");
        let ctx = JobContext { source_file: None, corpus_id: "c".into(), params: Default::default() };
        let err = dispatch_once(path, "echo", "fp", &ctx).unwrap_err();
        assert!(matches!(err, PreloaderError::SocketUnavailable { .. }));
    }
}
