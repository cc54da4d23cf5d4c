use crate::agents::package_manager::{CommandRunner, PackageManager, YarnDialect};
use crate::error::{Result, UpdateDbError};
use serde::Deserialize;
use std::path::Path;

/// Latest published release of the tracked package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryVersionRecord {
    pub version: String,
    pub tarball: String,
    pub integrity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PackageInfo {
    version: String,
    dist: DistInfo,
}

#[derive(Debug, Deserialize)]
struct DistInfo {
    tarball: String,
    #[serde(default)]
    integrity: Option<String>,
}

/// `yarn info --json` wraps the record in `{ "type": "inspect", "data": {...} }`
#[derive(Debug, Deserialize)]
struct YarnInfoEnvelope {
    data: PackageInfo,
}

impl From<PackageInfo> for RegistryVersionRecord {
    fn from(info: PackageInfo) -> Self {
        Self {
            version: info.version,
            tarball: info.dist.tarball,
            integrity: info.dist.integrity.filter(|hash| !hash.is_empty()),
        }
    }
}

impl RegistryVersionRecord {
    /// Decodes the JSON printed by the manager's info command.
    pub fn parse(
        manager: PackageManager,
        dialect: Option<YarnDialect>,
        json: &str,
    ) -> Result<Self> {
        let info = match (manager, dialect) {
            (PackageManager::Yarn, Some(YarnDialect::Classic)) => {
                serde_json::from_str::<YarnInfoEnvelope>(json.trim()).map(|env| env.data)
            }
            _ => serde_json::from_str::<PackageInfo>(json.trim()),
        }
        .map_err(|e| UpdateDbError::Registry(format!("Unexpected package info: {e}")))?;

        Ok(info.into())
    }
}

/// Asks the detected package manager for the newest release of `package`.
pub fn query_latest(
    runner: &dyn CommandRunner,
    manager: PackageManager,
    dialect: Option<YarnDialect>,
    package: &str,
    cwd: &Path,
) -> Result<RegistryVersionRecord> {
    let command = manager.info_command(dialect, package);
    let output = runner.run(&command, cwd)?;
    if !output.success {
        return Err(UpdateDbError::Registry(format!(
            "`{}` failed: {}",
            command,
            output.stderr.trim()
        )));
    }

    let record = RegistryVersionRecord::parse(manager, dialect, &output.stdout)?;
    tracing::debug!("Latest {} is {} ({})", package, record.version, record.tarball);
    Ok(record)
}
