//! Recording fakes for the launch collaborators.

use crate::assets::ObjectStore;
use crate::docker::{CommandOutput, ContainerRuntime};
use crate::error::{OpsError, Result};
use crate::process::{ProcessEvent, ProcessHandle, Terminate};
use crate::registry::PackageRegistry;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct TerminationCounter(AtomicUsize);

impl TerminationCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Terminate for TerminationCounter {
    fn terminate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct LaunchedProcess {
    pub name: String,
    pub script: String,
    pub events: mpsc::UnboundedSender<ProcessEvent>,
    pub terminations: Arc<TerminationCounter>,
}

/// Records every runtime call; replies with configured outputs (default: success).
#[derive(Default)]
pub struct FakeRuntime {
    calls: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, CommandOutput)>>,
    hang_on: Mutex<Vec<String>>,
    launched: Mutex<Vec<LaunchedProcess>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to every call whose joined args start with `prefix`.
    pub fn respond(&self, prefix: &str, output: CommandOutput) {
        self.responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), output));
    }

    /// Never answer calls whose joined args start with `prefix`.
    pub fn hang_on(&self, prefix: &str) {
        self.hang_on.lock().unwrap().push(prefix.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn launched_names(&self) -> Vec<String> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn script(&self, name: &str) -> Option<String> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.script.clone())
    }

    pub fn send(&self, name: &str, event: ProcessEvent) {
        let launched = self.launched.lock().unwrap();
        let p = launched
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("{name} was never launched"));
        p.events.send(event).unwrap();
    }

    pub fn terminations(&self, name: &str) -> usize {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.terminations.count())
            .unwrap_or(0)
    }

    /// Wait until a call starting with `prefix` has been made.
    pub async fn wait_for_call(&self, prefix: &str) {
        for _ in 0..500 {
            if self.count_calls(prefix) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected a `{prefix}` call, saw {:?}", self.calls());
    }

    /// Wait until `n` processes have been launched.
    pub async fn wait_for_launches(&self, n: usize) {
        for _ in 0..500 {
            if self.launched.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} launches, saw {:?}", self.launched_names());
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn exec(&self, args: &[String]) -> Result<CommandOutput> {
        let joined = args.join(" ");
        self.calls.lock().unwrap().push(joined.clone());
        let hang = self
            .hang_on
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| joined.starts_with(prefix.as_str()));
        if hang {
            std::future::pending::<()>().await;
        }
        let responses = self.responses.lock().unwrap();
        let out = responses
            .iter()
            .find(|(prefix, _)| joined.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or(CommandOutput {
                code: Some(0),
                ..Default::default()
            });
        Ok(out)
    }

    fn launch(&self, name: &str, script: &str) -> Result<ProcessHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        let terminations = Arc::new(TerminationCounter::default());
        self.launched.lock().unwrap().push(LaunchedProcess {
            name: name.to_string(),
            script: script.to_string(),
            events: tx,
            terminations: terminations.clone(),
        });
        Ok(ProcessHandle::new(name, rx, terminations))
    }

    fn binary(&self) -> &str {
        "docker"
    }
}

/// Serves objects from memory and counts downloads.
#[derive(Default)]
pub struct FakeStore {
    objects: HashMap<String, String>,
    downloads: AtomicUsize,
}

impl FakeStore {
    pub fn with_objects(objects: &[(&str, &str)]) -> Self {
        FakeStore {
            objects: objects
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn download(&self, key: &str, dest: &Path) -> Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let body = self.objects.get(key).ok_or_else(|| {
            OpsError::infrastructure(
                format!("Failed to fetch {key}"),
                anyhow::anyhow!("NoSuchKey"),
            )
        })?;
        tokio::fs::write(dest, body).await?;
        Ok(())
    }
}

/// Resolves every package except the configured missing ones.
#[derive(Default)]
pub struct FakeRegistry {
    missing: HashSet<String>,
    interrupt_on: Option<String>,
    queried: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn missing(names: &[&str]) -> Self {
        FakeRegistry {
            missing: names.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn interrupting_on(name: &str) -> Self {
        FakeRegistry {
            interrupt_on: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageRegistry for FakeRegistry {
    async fn resolve(&self, package: &str) -> Result<()> {
        self.queried.lock().unwrap().push(package.to_string());
        if self.interrupt_on.as_deref() == Some(package) {
            return Err(OpsError::interrupted("SIGINT"));
        }
        if self.missing.contains(package) {
            return Err(OpsError::infrastructure(
                format!("npm view {package} failed"),
                anyhow::anyhow!("404 Not Found"),
            ));
        }
        Ok(())
    }
}
