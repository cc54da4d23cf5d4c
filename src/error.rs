use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdateDbError {
    #[error(
        "Cannot find package.json in {} or any parent directory. \
         Is this the right directory to run the update in?",
        .0.display()
    )]
    NoManifestFound(PathBuf),

    #[error(
        "No lockfile found in {}. Run \"npm install\", \"yarn install\" or \"pnpm install\"",
        .0.display()
    )]
    NoLockfileFound(PathBuf),

    #[error("Browser list retrieval failed: {0}")]
    Capture(String),

    #[error("Problem with `{command}` call: {detail}. Run it manually.{output}")]
    ExternalCommand {
        command: String,
        detail: String,
        output: String,
    },

    #[error("Lockfile parsing failed: {0}")]
    Parse(String),

    #[error("Registry query failed: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpdateDbError {
    /// Capture errors only suppress the browser diff; every other kind aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UpdateDbError::Capture(_))
    }
}

pub type Result<T> = std::result::Result<T, UpdateDbError>;
