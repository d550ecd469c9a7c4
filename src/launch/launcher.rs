use crate::config::{Component, Settings, NETWORK_NAME};
use crate::docker::ContainerRuntime;
use crate::error::Result;
use crate::preflight::ResolvedPaths;
use crate::process::{shell_quote, ProcessHandle};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One-shot substring watch over a process's output lines.
#[derive(Debug)]
pub struct Readiness {
    marker: &'static str,
    fired: bool,
}

impl Readiness {
    pub fn new(marker: &'static str) -> Self {
        Readiness {
            marker,
            fired: false,
        }
    }

    pub fn for_component(component: Component) -> Self {
        Self::new(component.readiness_marker())
    }

    /// `true` only the first time a line containing the marker is seen.
    pub fn observe(&mut self, line: &str) -> bool {
        if self.fired || !line.contains(self.marker) {
            return false;
        }
        self.fired = true;
        true
    }
}

fn build_command(
    docker: &str,
    settings: &Settings,
    component: Component,
    deps: &BTreeSet<String>,
) -> String {
    let deps = deps.iter().cloned().collect::<Vec<_>>().join(" ");
    format!(
        "{docker} build --build-arg DEPENDENCIES={deps} -t {image} -f {file} {context}",
        deps = shell_quote(&deps),
        image = component.local_image(),
        file = shell_quote(&settings.build_file(component).to_string_lossy()),
        context = shell_quote(&settings.tmp_dir.to_string_lossy()),
    )
}

fn replace_container(docker: &str, component: Component) -> [String; 2] {
    let name = component.container_name();
    [
        format!("{docker} container stop {name} || true"),
        format!("{docker} container rm {name} || true"),
    ]
}

fn script(lines: Vec<String>) -> String {
    let mut all = vec!["set -e".to_string()];
    all.extend(lines);
    all.join("\n")
}

pub fn backend_script(
    docker: &str,
    settings: &Settings,
    deps: &BTreeSet<String>,
    paths: &ResolvedPaths,
    host_port: u16,
    home: Option<PathBuf>,
) -> String {
    let component = Component::Backend;
    let mut run = vec![format!("{docker} run --name {}", component.container_name())];
    if let Some(home) = home {
        let aws = home.join(".aws");
        run.push(format!(
            "-v {}",
            shell_quote(&format!("{}:/root/.aws", aws.to_string_lossy()))
        ));
    }
    run.push(format!(
        "-v {}",
        shell_quote(&format!("{}:/config:rw", paths.parent_directory.to_string_lossy()))
    ));
    run.push(format!(
        "--env CONFIG_PATH={}",
        shell_quote(&format!("../config/{}", paths.file))
    ));
    run.push(format!("-p {host_port}:{}", component.container_port()));
    run.push(format!("--network={NETWORK_NAME}"));
    run.push(component.local_image());

    let mut lines = vec![build_command(docker, settings, component, deps)];
    lines.extend(replace_container(docker, component));
    lines.push(run.join(" "));
    script(lines)
}

pub fn frontend_script(
    docker: &str,
    settings: &Settings,
    deps: &BTreeSet<String>,
    host_port: u16,
) -> String {
    let component = Component::Frontend;
    let backend = Component::Backend;
    let run = [
        format!("{docker} run --name {}", component.container_name()),
        format!(
            "--env API_ENDPOINT=http://{}:{}",
            backend.container_name(),
            backend.container_port()
        ),
        format!("-p {host_port}:{}", component.container_port()),
        format!("--network={NETWORK_NAME}"),
        component.local_image(),
    ];

    let mut lines = vec![build_command(docker, settings, component, deps)];
    lines.extend(replace_container(docker, component));
    lines.push(run.join(" "));
    script(lines)
}

pub fn launch_backend(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    deps: &BTreeSet<String>,
    paths: &ResolvedPaths,
    host_port: u16,
) -> Result<ProcessHandle> {
    let script = backend_script(
        runtime.binary(),
        settings,
        deps,
        paths,
        host_port,
        dirs::home_dir(),
    );
    runtime.launch(Component::Backend.container_name(), &script)
}

pub fn launch_frontend(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    deps: &BTreeSet<String>,
    host_port: u16,
) -> Result<ProcessHandle> {
    let script = frontend_script(runtime.binary(), settings, deps, host_port);
    runtime.launch(Component::Frontend.container_name(), &script)
}
