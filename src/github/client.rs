use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
};
use tokio::process::Command;

use super::{GithubClient, Package, PackageVersion};

const GH_PROGRAM: &str = "gh";
const ACCEPT_HEADER: &str = "Accept: application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version: 2022-11-28";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Delete,
}

/// Fails unless the GitHub CLI can be found on `PATH`.
pub fn check_gh_installed() -> Result<()> {
    check_installed(GH_PROGRAM, &env::var_os("PATH").unwrap_or_default())
}

fn check_installed(program: &str, paths: &OsStr) -> Result<()> {
    match find_in_path(program, paths) {
        Some(path) => {
            log::debug!("Using {}", path.display());
            Ok(())
        }
        None => Err(anyhow!(
            "GitHub CLI (gh) is not installed or not in PATH. Please install it and try again"
        )),
    }
}

fn find_in_path(program: &str, paths: &OsStr) -> Option<PathBuf> {
    env::split_paths(paths).find_map(|dir| {
        let candidate = dir.join(format!("{}{}", program, env::consts::EXE_SUFFIX));
        is_executable(&candidate).then_some(candidate)
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Nested container names (`owner/image`) must be sent as a single path segment.
fn encode_package_name(package_name: &str) -> String {
    package_name.replace('/', "%2F")
}

fn api_args(method: Method, path: &str) -> Vec<String> {
    let mut args = vec![
        "api".to_string(),
        "-H".to_string(),
        ACCEPT_HEADER.to_string(),
        "-H".to_string(),
        API_VERSION_HEADER.to_string(),
    ];
    if method == Method::Delete {
        args.push("-X".to_string());
        args.push("DELETE".to_string());
    }
    args.push(path.to_string());
    args
}

/// Talks to the GitHub REST API through an authenticated `gh` binary.
pub struct GhCliClient {
    program: PathBuf,
}

impl GhCliClient {
    pub fn new() -> Self {
        Self::with_program(GH_PROGRAM)
    }

    pub fn with_program(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// Runs `gh api` and returns its stdout if it exited successfully.
    async fn api(&self, method: Method, path: &str) -> Result<Vec<u8>> {
        let args = api_args(method, path);
        log::debug!("Running {} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .context(format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} api {} failed with {}\nOutput: {}\n{}",
                self.program.display(),
                path,
                output.status,
                String::from_utf8_lossy(&output.stdout).trim_end(),
                String::from_utf8_lossy(&output.stderr).trim_end(),
            ));
        }

        Ok(output.stdout)
    }

    async fn api_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.api(Method::Get, path).await?;
        serde_json::from_slice(&body).context("Failed to parse reply as json")
    }
}

impl Default for GhCliClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GithubClient for GhCliClient {
    async fn list_packages(&self) -> Result<Vec<Package>> {
        // https://docs.github.com/en/rest/packages/packages?apiVersion=2022-11-28#list-packages-for-the-authenticated-users-namespace
        self.api_json("/user/packages?package_type=container")
            .await
            .context("Failed to list packages")
    }

    async fn get_package_versions(&self, package_name: &str) -> Result<Vec<PackageVersion>> {
        // https://docs.github.com/en/rest/packages/packages?apiVersion=2022-11-28#list-package-versions-for-a-package-owned-by-the-authenticated-user
        self.api_json(&versions_path(package_name))
            .await
            .context(format!("Failed to get versions of {}", package_name))
    }

    async fn delete_package_version(&self, package_name: &str, version_id: u64) -> Result<()> {
        self.api(
            Method::Delete,
            &format!("{}/{}", versions_path(package_name), version_id),
        )
        .await
        .context(format!(
            "Failed to delete version {} of {}",
            version_id, package_name
        ))?;
        Ok(())
    }
}

fn versions_path(package_name: &str) -> String {
    format!(
        "/user/packages/container/{}/versions",
        encode_package_name(package_name)
    )
}
