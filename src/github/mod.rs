use anyhow::{anyhow, Result};
use async_trait::async_trait;

pub use api::*;
pub use client::*;

use crate::repo::RepoName;

mod api;
mod client;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GithubClient {
    /// Container packages in the authenticated user's namespace.
    async fn list_packages(&self) -> Result<Vec<Package>>;

    async fn get_package_versions(&self, package_name: &str) -> Result<Vec<PackageVersion>>;

    async fn delete_package_version(&self, package_name: &str, version_id: u64) -> Result<()>;
}

/// Looks up the container package published from the given repository.
pub async fn resolve_package_name(client: &impl GithubClient, repo: &RepoName) -> Result<String> {
    let packages = client.list_packages().await?;
    let full_name = repo.to_string();

    match find_package_name(&packages, &full_name) {
        Some(name) => {
            log::debug!("Repository {} publishes package {}", full_name, name);
            Ok(name.to_string())
        }
        None => Err(anyhow!("package not found for {}", full_name)),
    }
}
