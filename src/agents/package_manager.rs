use crate::error::{Result, UpdateDbError};
use std::fmt;
use std::path::Path;
use std::process::{Command, Output};

/// Package managers whose lockfiles can be refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

/// The two incompatible `yarn.lock` layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YarnDialect {
    /// Yarn 1, marked by a `# yarn lockfile v1` header
    Classic,
    /// Yarn 2 and later
    Berry,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        };
        f.write_str(label)
    }
}

impl PackageManager {
    /// Command printing the registry record of `package` as JSON
    pub fn info_command(self, dialect: Option<YarnDialect>, package: &str) -> ExternalCommand {
        match (self, dialect) {
            (PackageManager::Yarn, Some(YarnDialect::Berry)) => {
                ExternalCommand::new("yarn", ["npm", "info", package, "--json"])
            }
            (PackageManager::Yarn, _) => ExternalCommand::new("yarn", ["info", package, "--json"]),
            (PackageManager::Npm | PackageManager::Pnpm, _) => {
                ExternalCommand::new("npm", ["show", package, "--json"])
            }
        }
    }

    pub fn install_command(self, package: &str) -> ExternalCommand {
        match self {
            PackageManager::Yarn => ExternalCommand::new("yarn", ["add", "-W", package]),
            PackageManager::Npm => ExternalCommand::new("npm", ["install", package]),
            PackageManager::Pnpm => ExternalCommand::new("pnpm", ["add", package]),
        }
    }

    pub fn uninstall_command(self, package: &str) -> ExternalCommand {
        match self {
            PackageManager::Yarn => ExternalCommand::new("yarn", ["remove", "-W", package]),
            PackageManager::Npm => ExternalCommand::new("npm", ["uninstall", package]),
            PackageManager::Pnpm => ExternalCommand::new("pnpm", ["remove", package]),
        }
    }

    /// Single-command upgrade for managers that resolve the lockfile themselves.
    ///
    /// Returns `None` when the lockfile has to be rewritten by hand instead.
    pub fn upgrade_command(
        self,
        dialect: Option<YarnDialect>,
        package: &str,
    ) -> Option<ExternalCommand> {
        match (self, dialect) {
            (PackageManager::Yarn, Some(YarnDialect::Berry)) => {
                Some(ExternalCommand::new("yarn", ["up", "-R", package]))
            }
            (PackageManager::Pnpm, _) => Some(ExternalCommand::new("pnpm", ["up", package])),
            _ => None,
        }
    }
}

/// Command listing the project's resolved target browsers, one `browser version` per line
pub fn browsers_command() -> ExternalCommand {
    ExternalCommand::new("npx", ["browserslist"])
}

/// A program plus its arguments, spawned without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[cfg(test)]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Turns a non-zero exit into an `ExternalCommand` error carrying both streams.
    pub fn ensure_success(self, command: &ExternalCommand) -> Result<Self> {
        if self.success {
            return Ok(self);
        }

        let detail = match self.code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        };
        Err(command_error(command, detail, &self.stdout, &self.stderr))
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

fn command_error(
    command: &ExternalCommand,
    detail: String,
    stdout: &str,
    stderr: &str,
) -> UpdateDbError {
    let mut output = String::new();
    for stream in [stdout.trim_end(), stderr.trim_end()] {
        if !stream.is_empty() {
            output.push('\n');
            output.push_str(stream);
        }
    }

    UpdateDbError::ExternalCommand {
        command: command.to_string(),
        detail,
        output,
    }
}

/// Synchronous execution of package-manager commands
pub trait CommandRunner {
    /// Runs `command` inside `cwd` and blocks until it exits.
    ///
    /// A non-zero exit is reported through `CommandOutput::success`; only a
    /// failure to spawn the process is an error.
    fn run(&self, command: &ExternalCommand, cwd: &Path) -> Result<CommandOutput>;
}

/// Spawns real child processes
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn resolve_program(program: &str) -> String {
        // npm, npx, yarn and pnpm are installed as .cmd shims on Windows
        if cfg!(target_os = "windows") {
            format!("{program}.cmd")
        } else {
            program.to_string()
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ExternalCommand, cwd: &Path) -> Result<CommandOutput> {
        tracing::debug!("Running `{}` in {}", command, cwd.display());

        let output = Command::new(Self::resolve_program(&command.program))
            .current_dir(cwd)
            .args(&command.args)
            .output()
            .map_err(|e| command_error(command, format!("failed to start: {e}"), "", ""))?;

        let output = CommandOutput::from(output);
        tracing::debug!("`{}` finished with status {:?}", command, output.code);
        Ok(output)
    }
}
