use std::{
    env,
    io::{self, BufRead, Write},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use github::{check_gh_installed, resolve_package_name, GhCliClient, OutputVersion};
use repo::RepoName;

use crate::github::GithubClient;

mod confirm;
mod github;
mod repo;

/// List and delete container image versions in the GitHub Container Registry.
///
/// All requests go through the GitHub CLI (gh), which must be installed and
/// logged in.
#[derive(Parser)]
#[clap(version)]
struct Args {
    /// Make logging more verbose.
    /// You can also specify the log level via the RUST_LOG env variable.
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List image versions of the package published from a repository
    List {
        /// Repository owning the package
        #[clap(value_name = "OWNER/REPO")]
        repo: String,
    },

    /// Delete an image version of the package published from a repository
    Delete {
        /// Don't ask for confirmation
        #[clap(long, short)]
        yes: bool,

        /// Repository owning the package
        #[clap(value_name = "OWNER/REPO")]
        repo: String,

        /// Id of the version to delete, as printed by `list`
        version_id: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if env::var("RUST_LOG").is_err() {
        let level = match args.verbose {
            true => "debug",
            false => "info",
        };
        env::set_var("RUST_LOG", format!("{}={}", env!("CARGO_CRATE_NAME"), level));
    }
    env_logger::init();

    log::info!(
        "Starting {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );
    log::debug!("With arguments {:?}", env::args().collect::<Vec<_>>());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{:?}", error);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    check_gh_installed()?;
    let client = GhCliClient::new();

    match args.command {
        Command::List { repo } => {
            let repo = RepoName::parse(&repo)?;
            list_versions(&client, &repo, &mut io::stdout().lock()).await
        }
        Command::Delete {
            yes,
            repo,
            version_id,
        } => {
            let repo = RepoName::parse(&repo)?;
            delete_version(
                &client,
                &repo,
                version_id,
                yes,
                &mut io::stdin().lock(),
                &mut io::stdout().lock(),
            )
            .await
        }
    }
}

async fn list_versions(
    client: &impl GithubClient,
    repo: &RepoName,
    output: &mut impl Write,
) -> Result<()> {
    let package_name = resolve_package_name(client, repo).await?;
    let versions = client.get_package_versions(&package_name).await?;
    log::debug!("Found {} versions of {}", versions.len(), package_name);

    let versions: Vec<OutputVersion> = versions
        .into_iter()
        .map(|version| OutputVersion::new(&package_name, version))
        .collect();

    let json = serde_json::to_string_pretty(&versions).context("Failed to create json output")?;
    writeln!(output, "{}", json)?;

    Ok(())
}

async fn delete_version(
    client: &impl GithubClient,
    repo: &RepoName,
    version_id: u64,
    assume_yes: bool,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<()> {
    let package_name = resolve_package_name(client, repo).await?;

    let prompt = format!(
        "Are you sure you want to delete image {} version {}?",
        package_name, version_id
    );
    if !assume_yes && !confirm::confirm(input, output, &prompt)? {
        writeln!(output, "Deletion cancelled.")?;
        return Ok(());
    }

    log::debug!("Deleting {}:{}", package_name, version_id);
    client
        .delete_package_version(&package_name, version_id)
        .await?;

    writeln!(
        output,
        "Successfully deleted image {} version {}",
        package_name, version_id
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use clap::CommandFactory;
    use mockall::predicate::*;

    use super::*;
    use crate::github::{
        MockGithubClient, Package, PackageOwner, PackageRepository, PackageVersion,
    };

    fn client_with_package() -> MockGithubClient {
        let mut client = MockGithubClient::new();
        client.expect_list_packages().returning(|| {
            Ok(vec![Package {
                name: "pkg".to_string(),
                owner: PackageOwner {
                    login: "octo".to_string(),
                },
                repository: PackageRepository {
                    full_name: "octo/repo".to_string(),
                },
            }])
        });
        client
    }

    fn repo() -> RepoName {
        RepoName::parse("octo/repo").unwrap()
    }

    #[test]
    fn test_args() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(["ghcr-cli", "delete", "octo/repo", "42", "-y"]).unwrap();
        match args.command {
            Command::Delete {
                yes,
                repo,
                version_id,
            } => {
                assert!(yes);
                assert_eq!(repo, "octo/repo");
                assert_eq!(version_id, 42);
            }
            _ => panic!("expected delete"),
        }

        assert!(Args::try_parse_from(["ghcr-cli", "delete", "octo/repo", "latest"]).is_err());
        assert!(Args::try_parse_from(["ghcr-cli", "list"]).is_err());
        assert!(Args::try_parse_from(["ghcr-cli", "list", "a/b", "c/d"]).is_err());
    }

    #[tokio::test]
    async fn test_list_versions() {
        let mut client = client_with_package();
        client
            .expect_get_package_versions()
            .with(eq("pkg"))
            .times(1)
            .returning(|_| {
                Ok(vec![
                    PackageVersion {
                        name: "v1".to_string(),
                        id: 1,
                    },
                    PackageVersion {
                        name: "v2".to_string(),
                        id: 2,
                    },
                ])
            });

        let mut output = Vec::new();
        list_versions(&client, &repo(), &mut output).await.unwrap();

        let printed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let expected: serde_json::Value = serde_json::from_str(
            r#"[{"package":"pkg","name":"v1","id":1},{"package":"pkg","name":"v2","id":2}]"#,
        )
        .unwrap();
        assert_eq!(printed, expected);

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with("[\n  {\n    \"package\": \"pkg\",\n"));
        assert!(printed.ends_with("]\n"));
    }

    #[tokio::test]
    async fn test_list_versions_empty() {
        let mut client = client_with_package();
        client
            .expect_get_package_versions()
            .returning(|_| Ok(vec![]));

        let mut output = Vec::new();
        list_versions(&client, &repo(), &mut output).await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "[]\n");
    }

    #[tokio::test]
    async fn test_list_versions_unknown_repo() {
        let client = client_with_package();

        let mut output = Vec::new();
        let repo = RepoName::parse("octo/other").unwrap();
        let error = list_versions(&client, &repo, &mut output)
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "package not found for octo/other");
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_delete_version_confirmed() {
        for answer in ["y\n", "Y\n", "yes\n", "YES\n"] {
            let mut client = client_with_package();
            client
                .expect_delete_package_version()
                .with(eq("pkg"), eq(42))
                .times(1)
                .returning(|_, _| Ok(()));

            let mut output = Vec::new();
            delete_version(
                &client,
                &repo(),
                42,
                false,
                &mut answer.as_bytes(),
                &mut output,
            )
            .await
            .unwrap();

            let printed = String::from_utf8(output).unwrap();
            assert_eq!(
                printed,
                "Are you sure you want to delete image pkg version 42? (y/N): \
                 Successfully deleted image pkg version 42\n"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_version_cancelled() {
        for answer in ["", "\n", "n\n", "no\n", "yess\n"] {
            let mut client = client_with_package();
            client.expect_delete_package_version().never();

            let mut output = Vec::new();
            delete_version(
                &client,
                &repo(),
                42,
                false,
                &mut answer.as_bytes(),
                &mut output,
            )
            .await
            .unwrap();

            let printed = String::from_utf8(output).unwrap();
            assert!(printed.ends_with("Deletion cancelled.\n"));
            assert!(!printed.contains("Successfully"));
        }
    }

    #[tokio::test]
    async fn test_delete_version_cancelled_on_closed_stdin() {
        let mut client = client_with_package();
        client.expect_delete_package_version().never();

        let mut output = Vec::new();
        delete_version(&client, &repo(), 42, false, &mut "".as_bytes(), &mut output)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Are you sure you want to delete image pkg version 42? (y/N): \n\
             Deletion cancelled.\n"
        );
    }

    #[tokio::test]
    async fn test_delete_version_assume_yes() {
        let mut client = client_with_package();
        client
            .expect_delete_package_version()
            .with(eq("pkg"), eq(7))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut output = Vec::new();
        delete_version(&client, &repo(), 7, true, &mut "".as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Successfully deleted image pkg version 7\n"
        );
    }

    #[tokio::test]
    async fn test_delete_version_failure() {
        let mut client = client_with_package();
        client
            .expect_delete_package_version()
            .returning(|_, _| Err(anyhow!("gh api failed")));

        let mut output = Vec::new();
        let error = delete_version(&client, &repo(), 7, true, &mut "".as_bytes(), &mut output)
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "gh api failed");
        assert!(output.is_empty());
    }
}
