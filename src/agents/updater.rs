use crate::agents::lockfile_locator::LockDescriptor;
use crate::agents::package_manager::{CommandOutput, CommandRunner, ExternalCommand};
use crate::error::Result;
use crate::lockfile::{LockfileRewriter, ObservedVersions, rewriter_for};
use crate::registry::RegistryVersionRecord;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Duration;

/// What the apply step did to the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The lockfile already records only the latest version
    UpToDate,
    /// Stale entries were rewritten and the package manager re-resolved the package
    Reinstalled { previous: Vec<String> },
    /// The package manager upgraded the package itself
    Delegated { command: String },
}

/// Result of inspecting a lockfile without touching it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    UpToDate,
    Outdated { installed: Vec<String> },
    /// The lockfile is only updated through the package manager
    Unknown,
}

/// DbUpdater refreshes the tracked package in a detected lockfile
pub struct DbUpdater<'a> {
    runner: &'a dyn CommandRunner,
    package: &'a str,
}

impl<'a> DbUpdater<'a> {
    pub fn new(runner: &'a dyn CommandRunner, package: &'a str) -> Self {
        Self { runner, package }
    }

    /// Brings the lockfile to `latest`, either by rewriting it and reinstalling
    /// or by delegating to the package manager's own upgrade command.
    pub fn apply(
        &self,
        lock: &mut LockDescriptor,
        latest: &RegistryVersionRecord,
    ) -> Result<ApplyOutcome> {
        match rewriter_for(lock, self.package)? {
            Some(rewriter) => self.update_manually(lock, rewriter.as_ref(), latest),
            None => {
                let command = lock
                    .manager
                    .upgrade_command(lock.yarn_dialect, self.package)
                    .unwrap_or_else(|| lock.manager.install_command(self.package));
                self.update_with(lock, command)
            }
        }
    }

    /// Reports the installed versions without writing or running anything.
    pub fn inspect(
        &self,
        lock: &mut LockDescriptor,
        latest: &RegistryVersionRecord,
    ) -> Result<LockStatus> {
        let Some(rewriter) = rewriter_for(lock, self.package)? else {
            return Ok(LockStatus::Unknown);
        };

        let result = rewriter.rewrite(lock.load_content()?, latest)?;
        if result.observed.is_exactly(&latest.version) {
            Ok(LockStatus::UpToDate)
        } else {
            Ok(LockStatus::Outdated {
                installed: installed_versions(&result.observed),
            })
        }
    }

    fn update_manually(
        &self,
        lock: &mut LockDescriptor,
        rewriter: &dyn LockfileRewriter,
        latest: &RegistryVersionRecord,
    ) -> Result<ApplyOutcome> {
        let result = rewriter.rewrite(lock.load_content()?, latest)?;
        tracing::debug!(
            "Observed {} version(s) of {} in {}",
            result.observed.len(),
            self.package,
            lock.path.display()
        );

        if result.observed.is_exactly(&latest.version) {
            println!("Installed version:  {}", latest.version.green().bold());
            println!("{}", format!("{} is up to date", self.package).green().bold());
            return Ok(ApplyOutcome::UpToDate);
        }

        let previous = installed_versions(&result.observed);
        let label = if previous.len() == 1 {
            "Installed version: "
        } else {
            "Installed versions:"
        };
        println!("{} {}", label, previous.join(", ").red().bold());
        println!("Removing old {} from lock file", self.package);
        fs::write(&lock.path, &result.content)?;

        let install = lock.manager.install_command(self.package);
        println!("Installing new {} version", self.package);
        self.run_checked(lock, &install)?;

        let uninstall = lock.manager.uninstall_command(self.package);
        println!("Cleaning package.json dependencies from {}", self.package);
        self.run_checked(lock, &uninstall)?;

        Ok(ApplyOutcome::Reinstalled { previous })
    }

    fn update_with(
        &self,
        lock: &LockDescriptor,
        command: ExternalCommand,
    ) -> Result<ApplyOutcome> {
        println!("Updating {} version", self.package);
        self.run_checked(lock, &command)?;
        Ok(ApplyOutcome::Delegated {
            command: command.to_string(),
        })
    }

    fn run_checked(
        &self,
        lock: &LockDescriptor,
        command: &ExternalCommand,
    ) -> Result<CommandOutput> {
        println!("{}", format!("$ {command}").yellow());

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Running {}", command.program));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let output = self.runner.run(command, lock.project_dir());
        spinner.finish_and_clear();

        output?.ensure_success(command)
    }
}

fn installed_versions(observed: &ObservedVersions) -> Vec<String> {
    if observed.is_empty() {
        vec!["none".to_string()]
    } else {
        observed.sorted()
    }
}
