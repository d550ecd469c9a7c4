//! Local launch of the ops console: validate, resolve dependencies, fetch build
//! files, bootstrap the network, start backend then frontend, and tear
//! everything down on a fatal event or a shutdown request.
//!
//! Names (network, containers, temp files) are fixed, so only one launch per
//! machine can run at a time.

pub mod cleanup;
pub mod launcher;
pub mod shutdown;
pub mod supervisor;

use crate::assets::{fetch_and_patch, HttpObjectStore, ObjectStore};
use crate::config::{Component, Settings, NETWORK_NAME};
use crate::docker::{network_create, network_rm, ContainerRuntime, DockerCli};
use crate::error::{OpsError, Result};
use crate::manifest::load_dependencies;
use crate::output;
use crate::preflight::{
    check_ports_available, host_architecture, normalize_architecture, resolve_config_path,
    ResolvedPaths,
};
use crate::process::ProcessHandle;
use crate::registry::{validate_dependencies, NpmRegistry, PackageRegistry};
use cleanup::Cleanup;
use launcher::{launch_backend, launch_frontend};
use shutdown::Shutdown;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use supervisor::{Reaction, Supervisor};

pub const NETWORK_ERROR: &str = "Error launching ops console network!";

pub type OpenFn = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Raw architecture identifier; the host's when absent.
    pub arch: Option<String>,
    pub config_file: Option<PathBuf>,
    pub backend_port: u16,
    pub frontend_port: u16,
    pub verbose: bool,
}

/// External collaborators of a launch.
#[derive(Clone)]
pub struct Toolkit {
    pub runtime: Arc<dyn ContainerRuntime>,
    pub store: Arc<dyn ObjectStore>,
    pub registry: Arc<dyn PackageRegistry>,
    pub open_url: OpenFn,
}

impl Toolkit {
    pub fn system(settings: &Settings, cwd: &Path) -> Self {
        Toolkit {
            runtime: Arc::new(DockerCli::new(&settings.docker_bin, cwd)),
            store: Arc::new(HttpObjectStore::new(&settings.assets_url)),
            registry: Arc::new(NpmRegistry::new(&settings.npm_bin)),
            open_url: Arc::new(|url: &str| open::that_detached(url)),
        }
    }
}

struct Prepared {
    paths: ResolvedPaths,
    deps: BTreeSet<String>,
}

pub struct Launch {
    settings: Settings,
    tools: Toolkit,
    shutdown: Shutdown,
    cwd: PathBuf,
}

impl Launch {
    pub fn new(settings: Settings, tools: Toolkit, shutdown: Shutdown, cwd: PathBuf) -> Self {
        Launch {
            settings,
            tools,
            shutdown,
            cwd,
        }
    }

    /// Run the launch until teardown. A shutdown request after both containers
    /// started is a normal stop and returns `Ok`.
    pub async fn run(&self, opts: &LaunchOptions) -> Result<()> {
        let cleanup = Cleanup::new(self.tools.runtime.clone(), self.settings.build_files());

        let prepared = match self.prepare(opts).await {
            Ok(p) => p,
            Err(e) => {
                cleanup.cleanup_files().await;
                return Err(e);
            }
        };

        let runtime = self.tools.runtime.as_ref();
        let backend = match launch_backend(
            runtime,
            &self.settings,
            &prepared.deps,
            &prepared.paths,
            opts.backend_port,
        ) {
            Ok(h) => h,
            Err(e) => {
                cleanup.teardown(&[]).await;
                return Err(e);
            }
        };
        let frontend =
            match launch_frontend(runtime, &self.settings, &prepared.deps, opts.frontend_port) {
                Ok(h) => h,
                Err(e) => {
                    cleanup.teardown(&[&backend]).await;
                    return Err(e);
                }
            };

        output::info("Building and starting the ops console containers...");
        self.supervise(backend, frontend, &cleanup, opts.frontend_port)
            .await
    }

    async fn prepare(&self, opts: &LaunchOptions) -> Result<Prepared> {
        self.shutdown.check()?;

        let paths = resolve_config_path(opts.config_file.as_deref(), &self.cwd)?;
        let raw_arch = opts
            .arch
            .clone()
            .unwrap_or_else(|| host_architecture().to_string());
        let tag = normalize_architecture(&raw_arch)?;
        if opts.verbose {
            output::info(&format!(
                "Using {} for {} images",
                paths.full_path().display(),
                tag.as_str()
            ));
        }
        self.shutdown
            .guard(check_ports_available(&[opts.backend_port, opts.frontend_port]))
            .await?;

        let deps = load_dependencies(&paths.full_path())?;
        self.shutdown
            .guard(validate_dependencies(self.tools.registry.as_ref(), &deps))
            .await?;

        self.shutdown
            .guard(fetch_and_patch(self.tools.store.as_ref(), &self.settings, tag))
            .await?;
        self.shutdown
            .guard(ensure_network(self.tools.runtime.as_ref()))
            .await?;

        self.shutdown.check()?;
        Ok(Prepared { paths, deps })
    }

    async fn supervise(
        &self,
        mut backend: ProcessHandle,
        mut frontend: ProcessHandle,
        cleanup: &Cleanup,
        frontend_port: u16,
    ) -> Result<()> {
        let mut supervisor = Supervisor::new();
        let mut backend_open = true;
        let mut frontend_open = true;

        let outcome = loop {
            if !backend_open && !frontend_open {
                tracing::debug!("both processes ended");
                cleanup.cleanup_files().await;
                return Ok(());
            }

            let (component, event) = tokio::select! {
                _ = self.shutdown.requested() => {
                    tracing::debug!("shutdown requested: {}", self.shutdown.reason());
                    break Ok(());
                }
                ev = backend.next_event(), if backend_open => match ev {
                    Some(ev) => (Component::Backend, ev),
                    None => {
                        backend_open = false;
                        continue;
                    }
                },
                ev = frontend.next_event(), if frontend_open => match ev {
                    Some(ev) => (Component::Frontend, ev),
                    None => {
                        frontend_open = false;
                        continue;
                    }
                },
            };

            match supervisor.react(component, event) {
                Reaction::Nothing => {}
                Reaction::Ready(Component::Backend) => {
                    output::success("Ops console backend successfully launched");
                }
                Reaction::Ready(Component::Frontend) => {
                    output::success("Ops console frontend successfully launched");
                    self.open_in_browser(format!("http://localhost:{frontend_port}"));
                }
                Reaction::Ended(component, code) => {
                    let code = code.map_or("no code".to_string(), |c| c.to_string());
                    output::warn(&format!(
                        "Ops console {} exited with code {code}",
                        component.label()
                    ));
                }
                Reaction::Teardown(err) => break Err(err),
            }
        };

        cleanup.teardown(&[&backend, &frontend]).await;
        if outcome.is_ok() {
            output::info("Ops console stopped.");
        }
        outcome
    }

    /// Openers may block until the browser returns, so they run off the supervision loop.
    fn open_in_browser(&self, url: String) {
        let open_url = self.tools.open_url.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = open_url(&url) {
                output::warn(&format!("Could not open {url} in a browser: {e}"));
            }
        });
    }
}

/// Recreate the bridge network. A missing network is fine; any other failure is fatal.
pub async fn ensure_network(runtime: &dyn ContainerRuntime) -> Result<()> {
    let res = match network_rm(runtime, NETWORK_NAME).await {
        Ok(()) => network_create(runtime, NETWORK_NAME).await,
        Err(e) => Err(e),
    };
    res.map_err(|e| match e {
        OpsError::Infrastructure { message, source } => {
            OpsError::infrastructure(NETWORK_ERROR, source.context(message))
        }
        other => other,
    })
}
