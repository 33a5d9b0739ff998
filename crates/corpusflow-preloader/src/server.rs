//! The preloader server: a synchronous Unix-domain-socket listener that
//! warm-starts a worker pool per preloaded processor and dispatches jobs
//! to an idle worker instead of letting the scheduler invoke
//! `Processor::run` cold.

use std::any::Any;
use std::collections::BTreeMap;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use corpusflow_registry::Registry;

use crate::config::PreloaderConfig;
use crate::protocol::{ClientMessage, ServerMessage, read_frame, write_frame};

type WarmState = Box<dyn Any + Send>;

/// One preloaded processor's warm workers. `shared` pools keep a single
/// slot every dispatch reuses under the same lock (mirroring a
/// processor whose warm state is safe to hand out concurrently, e.g. a
/// read-only model); non-shared pools keep one independent slot per
/// worker, so at most `slots.len()` jobs for this target run at once.
struct WorkerPool {
    processor_id: String,
    fingerprint: String,
    slots: Vec<Mutex<Option<WarmState>>>,
}

pub struct PreloaderServer {
    registry: Arc<Registry>,
    listener: UnixListener,
    socket_path: std::path::PathBuf,
    pools: BTreeMap<String, WorkerPool>,
}

impl PreloaderServer {
    /// Binds the socket and warm-starts every configured target by
    /// calling its processor's `preload` hook once per worker slot.
    /// Fails fast if the socket path is already taken by a live server.
    pub fn start(config: &PreloaderConfig, registry: Arc<Registry>, params: &BTreeMap<String, serde_json::Value>) -> Result<Self> {
        if let Some(parent) = config.socket_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path).with_context(|| format!("removing stale socket {}", config.socket_path.display()))?;
        }
        let listener = UnixListener::bind(&config.socket_path).with_context(|| format!("binding preloader socket {}", config.socket_path.display()))?;

        let mut pools = BTreeMap::new();
        for target in &config.targets {
            let processor = registry
                .get(&target.processor_id)
                .with_context(|| format!("preload target names unknown processor {}", target.processor_id))?;
            let fingerprint = registry.fingerprint();
            let worker_count = if target.shared { 1 } else { target.processes.max(1) };
            let mut slots = Vec::with_capacity(worker_count);
            for _ in 0..worker_count {
                let warm = processor.preload(params).with_context(|| format!("preloading {}", target.processor_id))?;
                slots.push(Mutex::new(Some(warm)));
            }
            pools.insert(target.preload_target.clone(), WorkerPool { processor_id: target.processor_id.clone(), fingerprint, slots });
        }

        Ok(Self { registry, listener, socket_path: config.socket_path.clone(), pools })
    }

    /// Serves connections until a client sends `Shutdown`, then removes
    /// the socket file before returning.
    pub fn serve(&self) -> Result<()> {
        for conn in self.listener.incoming() {
            let mut stream = conn.context("accepting preloader connection")?;
            match self.handle_one(&mut stream) {
                Ok(true) => break,
                Ok(false) => continue,
                Err(e) => {
                    let _ = write_frame(&mut stream, &ServerMessage::Failed(e.to_string()));
                }
            }
        }
        let _ = std::fs::remove_file(&self.socket_path);
        Ok(())
    }

    /// Handles one connection. Returns `Ok(true)` if the server should
    /// stop serving after this connection.
    fn handle_one(&self, stream: &mut UnixStream) -> Result<bool> {
        let message: ClientMessage = read_frame(stream)?;
        match message {
            ClientMessage::Shutdown => {
                write_frame(stream, &ServerMessage::ShuttingDown)?;
                Ok(true)
            }
            ClientMessage::Dispatch { preload_target, config_fingerprint, ctx } => {
                let reply = self.dispatch(&preload_target, &config_fingerprint, &ctx);
                write_frame(stream, &reply)?;
                Ok(false)
            }
        }
    }

    fn dispatch(&self, preload_target: &str, config_fingerprint: &str, ctx: &corpusflow_registry::JobContext) -> ServerMessage {
        let Some(pool) = self.pools.get(preload_target) else {
            return ServerMessage::UnknownTarget(preload_target.to_string());
        };
        if pool.fingerprint != config_fingerprint {
            return ServerMessage::ConfigMismatch { expected: pool.fingerprint.clone(), actual: config_fingerprint.to_string() };
        }
        let Some(processor) = self.registry.get(&pool.processor_id) else {
            return ServerMessage::UnknownTarget(preload_target.to_string());
        };

        for slot in &pool.slots {
            let Ok(mut guard) = slot.try_lock() else { continue };
            let warm = guard.take().expect("preloader slot left empty after a prior dispatch");
            let outcome = processor.run(ctx);
            let next_state = match processor.preloader_cleanup(warm, ctx) {
                Ok(state) => state,
                Err(_) => Box::new(()) as Box<dyn Any + Send>,
            };
            *guard = Some(next_state);
            return match outcome {
                Ok(()) => ServerMessage::Ran,
                Err(e) => ServerMessage::Failed(e.to_string()),
            };
        }
        ServerMessage::Busy
    }
}
