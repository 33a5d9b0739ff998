//! Typed errors a preloader client can branch on, as opposed to the
//! `anyhow::Result` the server's own internals use for plumbing.

#[derive(Debug, thiserror::Error)]
pub enum PreloaderError {
    #[error("could not reach preloader socket at {path}: {source}")]
    SocketUnavailable { path: String, #[source] source: std::io::Error },
    #[error("preloader pool for {target} was compiled against fingerprint {expected} but this run has {actual}")]
    ConfigMismatch { target: String, expected: String, actual: String },
    #[error("no preload target registered for {0}")]
    UnknownTarget(String),
    #[error("every worker for {0} is currently busy")]
    Busy(String),
    #[error("preloaded job for {target} failed: {reason}")]
    Failed { target: String, reason: String },
    #[error("preloader protocol error: {0}")]
    Protocol(String),
}
