use crate::agents::package_manager::{PackageManager, YarnDialect};
use crate::error::{Result, UpdateDbError};
use crate::utils::fs::find_ancestor;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "package.json";
const YARN_CLASSIC_MARKER: &str = "# yarn lockfile v1";

/// Lockfile candidates in priority order. The first existing file wins, so a
/// pnpm lockfile shadows a coexisting npm one.
const LOCKFILE_PROBES: [(&str, PackageManager); 4] = [
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("package-lock.json", PackageManager::Npm),
    ("yarn.lock", PackageManager::Yarn),
    ("npm-shrinkwrap.json", PackageManager::Npm),
];

/// How the tracked package gets refreshed for a given lockfile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockFormat {
    /// npm JSON lockfile with nested `dependencies` objects
    StructuredTree,
    /// yarn v1 text lockfile made of blank-line separated entries
    LineBlock,
    /// The package manager updates its own lockfile through a single command
    DelegatedUpgrade,
}

/// Detected lockfile of the current project
#[derive(Debug, Clone)]
pub struct LockDescriptor {
    pub manager: PackageManager,
    pub format: LockFormat,
    pub path: PathBuf,
    pub yarn_dialect: Option<YarnDialect>,
    content: Option<String>,
}

impl LockDescriptor {
    /// Directory holding the manifest and the lockfile; external commands run here.
    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Reads the lockfile on first use; later calls return the cached text.
    pub fn load_content(&mut self) -> Result<&str> {
        if self.content.is_none() {
            let text = fs::read_to_string(&self.path)?;
            self.content = Some(text);
        }
        Ok(self.content.as_deref().unwrap_or_default())
    }
}

/// LockfileLocator finds the manifest directory and the lockfile inside it
pub struct LockfileLocator {
    start: PathBuf,
}

impl LockfileLocator {
    pub fn new<P: AsRef<Path>>(start: P) -> Self {
        Self {
            start: start.as_ref().to_path_buf(),
        }
    }

    /// Nearest directory at or above the start path that holds `package.json`.
    pub fn find_project_dir(&self) -> Result<PathBuf> {
        find_ancestor(&self.start, |_, names| {
            names.iter().any(|name| name == MANIFEST_FILE)
        })?
        .ok_or_else(|| UpdateDbError::NoManifestFound(self.start.clone()))
    }

    pub fn detect(&self) -> Result<LockDescriptor> {
        let package_dir = self.find_project_dir()?;

        for (file_name, manager) in LOCKFILE_PROBES {
            let path = package_dir.join(file_name);
            if !path.is_file() {
                continue;
            }
            tracing::debug!("Using lockfile {}", path.display());
            return Self::describe(manager, path);
        }

        Err(UpdateDbError::NoLockfileFound(package_dir))
    }

    fn describe(manager: PackageManager, path: PathBuf) -> Result<LockDescriptor> {
        match manager {
            PackageManager::Pnpm => Ok(LockDescriptor {
                manager,
                format: LockFormat::DelegatedUpgrade,
                path,
                yarn_dialect: None,
                content: None,
            }),
            PackageManager::Npm => Ok(LockDescriptor {
                manager,
                format: LockFormat::StructuredTree,
                path,
                yarn_dialect: None,
                content: None,
            }),
            PackageManager::Yarn => {
                let content = fs::read_to_string(&path)?;
                let dialect = detect_yarn_dialect(&content);
                let format = match dialect {
                    YarnDialect::Classic => LockFormat::LineBlock,
                    YarnDialect::Berry => LockFormat::DelegatedUpgrade,
                };
                Ok(LockDescriptor {
                    manager,
                    format,
                    path,
                    yarn_dialect: Some(dialect),
                    content: Some(content),
                })
            }
        }
    }
}

fn detect_yarn_dialect(content: &str) -> YarnDialect {
    if content.contains(YARN_CLASSIC_MARKER) {
        YarnDialect::Classic
    } else {
        YarnDialect::Berry
    }
}
