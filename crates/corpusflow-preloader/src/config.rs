//! The preloader's own small configuration surface: where its socket
//! lives and how many warm workers each preloaded processor gets.

use std::path::PathBuf;

/// One processor's preload target, resolved from its
/// `corpusflow_types::PreloaderSpec` plus how many workers to start.
#[derive(Debug, Clone)]
pub struct PreloadTarget {
    pub processor_id: String,
    pub preload_target: String,
    pub shared: bool,
    pub processes: usize,
}

#[derive(Debug, Clone)]
pub struct PreloaderConfig {
    pub socket_path: PathBuf,
    pub targets: Vec<PreloadTarget>,
}

impl PreloaderConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into(), targets: Vec::new() }
    }

    pub fn with_target(mut self, target: PreloadTarget) -> Self {
        self.targets.push(target);
        self
    }
}
