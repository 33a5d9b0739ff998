//! Preloader daemon (§4.F): warm-starts processors that declare a
//! [`corpusflow_types::PreloaderSpec`] behind a Unix domain socket so
//! repeated jobs for the same processor (typically a model-backed
//! tagger) skip paying its startup cost on every file.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{DispatchOutcome, dispatch_blocking, dispatch_once, shutdown};
pub use config::{PreloadTarget, PreloaderConfig};
pub use error::PreloaderError;
pub use server::PreloaderServer;
