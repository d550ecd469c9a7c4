//! Teardown for a local launch. Both phases run at most once, however many
//! triggers fire.

use crate::config::{Component, NETWORK_NAME};
use crate::docker::{container_rm_force, network_rm, ContainerRuntime};
use crate::process::ProcessHandle;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Cleanup {
    runtime: Arc<dyn ContainerRuntime>,
    build_files: Vec<PathBuf>,
    files_done: AtomicBool,
    processes_done: AtomicBool,
}

impl Cleanup {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, build_files: Vec<PathBuf>) -> Self {
        Cleanup {
            runtime,
            build_files,
            files_done: AtomicBool::new(false),
            processes_done: AtomicBool::new(false),
        }
    }

    /// Delete the temporary build files. Failures are ignored.
    pub async fn cleanup_files(&self) {
        if self.files_done.swap(true, Ordering::SeqCst) {
            return;
        }
        for file in &self.build_files {
            if let Err(e) = tokio::fs::remove_file(file).await {
                tracing::debug!("could not remove {}: {e}", file.display());
            }
        }
    }

    /// Remove both containers and the network, then terminate the process handles.
    pub async fn cleanup_processes(&self, handles: &[&ProcessHandle]) {
        if self.processes_done.swap(true, Ordering::SeqCst) {
            return;
        }
        for component in Component::all() {
            let name = component.container_name();
            if let Err(e) = container_rm_force(self.runtime.as_ref(), name).await {
                tracing::debug!("{e}");
            }
        }
        if let Err(e) = network_rm(self.runtime.as_ref(), NETWORK_NAME).await {
            tracing::debug!("{e}");
        }
        for handle in handles {
            handle.terminate();
        }
    }

    pub async fn teardown(&self, handles: &[&ProcessHandle]) {
        self.cleanup_files().await;
        self.cleanup_processes(handles).await;
    }
}
