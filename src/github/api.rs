use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub owner: PackageOwner,
    pub repository: PackageRepository,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageOwner {
    pub login: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageRepository {
    pub full_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
    pub id: u64,
    pub name: String,
}

/// A package version as printed by the `list` command.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputVersion {
    pub package: String,
    pub name: String,
    pub id: u64,
}

impl OutputVersion {
    pub fn new(package_name: &str, version: PackageVersion) -> Self {
        Self {
            package: package_name.to_string(),
            name: version.name,
            id: version.id,
        }
    }
}

/// Returns the name of the first package built from the repository `full_name`.
pub fn find_package_name<'a>(packages: &'a [Package], full_name: &str) -> Option<&'a str> {
    packages
        .iter()
        .find(|package| package.repository.full_name == full_name)
        .map(|package| package.name.as_str())
}
