use crate::env::var_or;
use std::fs;
use std::path::{Path, PathBuf};

pub const TMP_DIR: &str = "/tmp/.ops-console";
pub const DEFAULT_CONFIG_FILENAME: &str = "config.yml";
pub const CREDENTIALS_FILENAME: &str = "credentials";

pub const NETWORK_NAME: &str = "ops-console";

pub const DEFAULT_BACKEND_PORT: u16 = 8000;
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;

pub const DEFAULT_ASSETS_URL: &str = "https://ops-console-public-assets.s3.us-west-2.amazonaws.com";
pub const DEFAULT_API_URL: &str = "https://rbxfvmjh4e.execute-api.us-west-2.amazonaws.com";
pub const SIGNUP_URL: &str = "https://ops.tinystacks.com";

/// One of the two containers that make up a local ops console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Backend,
    Frontend,
}

impl Component {
    pub fn label(&self) -> &'static str {
        match self {
            Component::Backend => "backend",
            Component::Frontend => "frontend",
        }
    }

    pub fn container_name(&self) -> &'static str {
        match self {
            Component::Backend => "ops-api",
            Component::Frontend => "ops-frontend",
        }
    }

    /// Local tag given to the image built from the patched build file.
    pub fn local_image(&self) -> String {
        format!("{}:local", self.container_name())
    }

    /// Object key in the asset bucket, also used as the temp file name.
    pub fn build_file_name(&self) -> &'static str {
        match self {
            Component::Backend => "Dockerfile.api",
            Component::Frontend => "Dockerfile.ui",
        }
    }

    pub fn base_image(&self, tag: &str) -> String {
        let repo = match self {
            Component::Backend => "public.ecr.aws/tinystacks/ops-api",
            Component::Frontend => "public.ecr.aws/tinystacks/ops-frontend",
        };
        if tag.is_empty() {
            format!("{repo}:latest")
        } else {
            format!("{repo}:latest-{tag}")
        }
    }

    pub fn container_port(&self) -> u16 {
        match self {
            Component::Backend => 8000,
            Component::Frontend => 3000,
        }
    }

    pub fn readiness_marker(&self) -> &'static str {
        match self {
            Component::Backend => "Running on http://localhost:8000",
            Component::Frontend => "ready - started server on 0.0.0.0:3000",
        }
    }

    pub fn all() -> [Component; 2] {
        [Component::Backend, Component::Frontend]
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub docker_bin: String,
    pub npm_bin: String,
    pub tmp_dir: PathBuf,
    pub assets_url: String,
    pub api_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            docker_bin: resolve_docker_binary(),
            npm_bin: var_or("NPM_BIN", "npm"),
            tmp_dir: PathBuf::from(var_or("OPS_CONSOLE_TMP_DIR", TMP_DIR)),
            assets_url: var_or("OPS_CONSOLE_ASSETS_URL", DEFAULT_ASSETS_URL),
            api_url: var_or("OPS_CONSOLE_API_URL", DEFAULT_API_URL),
        }
    }

    pub fn build_file(&self, component: Component) -> PathBuf {
        self.tmp_dir.join(component.build_file_name())
    }

    pub fn build_files(&self) -> Vec<PathBuf> {
        Component::all().iter().map(|c| self.build_file(*c)).collect()
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.tmp_dir.join(CREDENTIALS_FILENAME)
    }
}

pub fn resolve_docker_binary() -> String {
    var_or("DOCKER_BIN", "docker")
}

/// Absolute location of the console config: the given path, or `config.yml` in `cwd`.
pub fn config_file_location(raw: Option<&Path>, cwd: &Path) -> PathBuf {
    match raw {
        Some(p) if p.is_absolute() => p.to_path_buf(),
        Some(p) => cwd.join(p),
        None => cwd.join(DEFAULT_CONFIG_FILENAME),
    }
}

pub fn ensure_dir_exists(p: &Path) -> std::io::Result<()> {
    if !p.exists() {
        fs::create_dir_all(p)?;
    }
    Ok(())
}
