use crate::agents::{
    ApplyOutcome, CommandRunner, DbUpdater, LockStatus, LockfileLocator, SystemRunner,
};
use crate::browsers::{BrowserSnapshot, Change, DiffEntry, diff};
use crate::error::{Result, UpdateDbError};
use crate::registry::query_latest;
use colored::Colorize;
use std::path::Path;

/// Settings for a single update run
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub package: String,
    /// Capture target browsers before and after the update and print the difference
    pub show_diff: bool,
}

/// What an update run did, for callers that need more than the printed report
#[derive(Debug, Clone)]
pub struct UpdateSummary {
    pub latest: String,
    pub outcome: ApplyOutcome,
    /// `None` when the browser comparison was skipped or could not be captured
    pub changes: Option<Vec<DiffEntry>>,
}

/// Execute the update workflow
pub fn execute_update<P: AsRef<Path>>(project_path: P, options: &UpdateOptions) -> Result<()> {
    let summary = run_update(project_path.as_ref(), options, &SystemRunner)?;
    tracing::debug!(
        "Reported {} target browser change(s)",
        summary.changes.as_ref().map_or(0, Vec::len)
    );

    let message = match &summary.outcome {
        ApplyOutcome::UpToDate => format!("✨ Already on {}", summary.latest),
        ApplyOutcome::Reinstalled { previous } => {
            format!("✨ Moved from {} to {}", previous.join(", "), summary.latest)
        }
        ApplyOutcome::Delegated { command } => {
            format!("✨ Updated to {} via `{}`", summary.latest, command)
        }
    };
    println!("\n{}", message.green().bold());
    Ok(())
}

fn run_update(
    project_path: &Path,
    options: &UpdateOptions,
    runner: &dyn CommandRunner,
) -> Result<UpdateSummary> {
    let package = options.package.as_str();
    println!("{}", format!("Updating {package}...").cyan().bold());

    // Step 1: Locate the lockfile
    println!("\n{}", "1. Detecting lockfile...".yellow());
    let mut lock = LockfileLocator::new(project_path).detect()?;
    println!(
        "{}",
        format!("✓ Found {} ({})", lock.file_name(), lock.manager).green()
    );

    // Step 2: Ask the registry for the latest release
    println!("\n{}", "2. Querying latest version...".yellow());
    let latest = query_latest(
        runner,
        lock.manager,
        lock.yarn_dialect,
        package,
        lock.project_dir(),
    )?;

    let before = options
        .show_diff
        .then(|| BrowserSnapshot::capture(runner, lock.project_dir()));

    println!("Latest version:     {}", latest.version.green().bold());

    // Step 3: Rewrite the lockfile or let the package manager upgrade
    println!("\n{}", "3. Updating lockfile...".yellow());
    let outcome = DbUpdater::new(runner, package).apply(&mut lock, &latest)?;
    println!(
        "{}",
        format!("✓ {package} has been successfully updated").green()
    );

    // Step 4: Compare target browsers
    let changes = match before {
        None => None,
        Some(before) => {
            println!("\n{}", "4. Comparing target browsers...".yellow());
            let snapshots = before.and_then(|before| {
                BrowserSnapshot::capture(runner, lock.project_dir()).map(|after| (before, after))
            });

            match snapshots {
                Ok((before, after)) => {
                    let changes = diff(&before, &after);
                    print_browser_changes(&changes);
                    Some(changes)
                }
                Err(e) if e.is_recoverable() => {
                    print_capture_problem(&e);
                    None
                }
                Err(e) => return Err(e),
            }
        }
    };

    Ok(UpdateSummary {
        latest: latest.version,
        outcome,
        changes,
    })
}

fn print_browser_changes(changes: &[DiffEntry]) {
    if changes.is_empty() {
        println!("\n{}", "No target browser changes".green());
        return;
    }

    println!("\n{}", "Target browser changes:".cyan().bold());
    for entry in changes {
        let line = entry.to_string();
        match entry.change {
            Change::Removed => println!("{}", line.red()),
            Change::Added => println!("{}", line.green()),
        }
    }
}

fn print_capture_problem(error: &UpdateDbError) {
    tracing::warn!("Browser snapshot unavailable: {}", error);
    println!("\n{}", error.to_string().red());
    println!(
        "{}",
        "Problem with browser list retrieval.\nTarget browser changes won't be shown.".red()
    );
}

/// Execute the check workflow (dry-run)
pub fn execute_check<P: AsRef<Path>>(project_path: P, package: &str) -> Result<()> {
    run_check(project_path.as_ref(), package, &SystemRunner).map(|_| ())
}

fn run_check(
    project_path: &Path,
    package: &str,
    runner: &dyn CommandRunner,
) -> Result<LockStatus> {
    println!(
        "{}",
        format!("Checking {package} in the project lockfile...").cyan().bold()
    );

    println!("\n{}", "1. Detecting lockfile...".yellow());
    let mut lock = LockfileLocator::new(project_path).detect()?;
    println!(
        "{}",
        format!("✓ Found {} ({})", lock.file_name(), lock.manager).green()
    );

    println!("\n{}", "2. Querying latest version...".yellow());
    let latest = query_latest(
        runner,
        lock.manager,
        lock.yarn_dialect,
        package,
        lock.project_dir(),
    )?;
    println!("Latest version:     {}", latest.version.green().bold());

    println!("\n{}", "3. Inspecting lockfile...".yellow());
    let status = DbUpdater::new(runner, package).inspect(&mut lock, &latest)?;
    match &status {
        LockStatus::UpToDate => {
            println!("Installed version:  {}", latest.version.green().bold());
            println!("\n{}", format!("✨ {package} is up to date!").green().bold());
        }
        LockStatus::Outdated { installed } => {
            println!("Installed versions: {}", installed.join(", ").red().bold());
            println!("\n{}", "To apply the update, run:".dimmed());
            println!("  {}", "caniuse-refresh update".cyan());
        }
        LockStatus::Unknown => {
            println!(
                "{}",
                format!(
                    "{} updates {} itself; installed versions are not inspected",
                    lock.manager,
                    lock.file_name()
                )
                .dimmed()
            );
        }
    }

    Ok(status)
}

/// Execute the browsers workflow - print the current target browsers
pub fn execute_browsers<P: AsRef<Path>>(project_path: P) -> Result<()> {
    let project_dir = LockfileLocator::new(project_path).find_project_dir()?;
    let snapshot = BrowserSnapshot::capture(&SystemRunner, &project_dir)?;

    println!("{}", "Target browsers:".cyan().bold());
    if snapshot.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for (browser, versions) in snapshot.iter() {
        println!("  {} {}", browser.white().bold(), versions.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::package_manager::CommandOutput;
    use crate::agents::package_manager::testing::ScriptedRunner;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const NPM_SHOW: &str = r#"{"version":"1.0.1","dist":{"tarball":"https://x/1.0.1.tgz","integrity":"sha-new"}}"#;
    const PACKAGE_LOCK: &str = r#"{
  "name": "app",
  "dependencies": {
    "caniuse-lite": { "version": "1.0.0" }
  }
}
"#;

    fn npm_project() -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("package-lock.json"), PACKAGE_LOCK).unwrap();
        dir
    }

    fn options(show_diff: bool) -> UpdateOptions {
        UpdateOptions {
            package: "caniuse-lite".to_string(),
            show_diff,
        }
    }

    fn npm_runner() -> ScriptedRunner {
        ScriptedRunner::new()
            .respond("npm show caniuse-lite --json", CommandOutput::success(NPM_SHOW))
            .respond("npm install caniuse-lite", CommandOutput::success(""))
            .respond("npm uninstall caniuse-lite", CommandOutput::success(""))
    }

    #[test]
    fn full_run_reports_browser_changes_in_order() {
        let dir = npm_project();
        let runner = npm_runner()
            .respond(
                "npx browserslist",
                CommandOutput::success("IE 10\nIE 11\nChrome 90\n"),
            )
            .respond(
                "npx browserslist",
                CommandOutput::success("IE 11\nChrome 90\nChrome 91\nFirefox 89\n"),
            );

        let summary = run_update(dir.path(), &options(true), &runner).unwrap();

        assert_eq!(summary.latest, "1.0.1");
        assert_eq!(
            summary.outcome,
            ApplyOutcome::Reinstalled {
                previous: vec!["1.0.0".to_string()]
            }
        );
        let rendered: Vec<String> = summary
            .changes
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["- IE 10", "+ Chrome 91", "+ Firefox 89"]);
        assert_eq!(
            runner.calls(),
            vec![
                "npm show caniuse-lite --json",
                "npx browserslist",
                "npm install caniuse-lite",
                "npm uninstall caniuse-lite",
                "npx browserslist",
            ]
        );
        let written = fs::read_to_string(dir.path().join("package-lock.json")).unwrap();
        assert!(!written.contains("caniuse-lite"));
    }

    #[test]
    fn failed_first_snapshot_skips_comparison_but_succeeds() {
        let dir = npm_project();
        let runner =
            npm_runner().respond("npx browserslist", CommandOutput::failure(1, "not found"));

        let summary = run_update(dir.path(), &options(true), &runner).unwrap();

        assert!(summary.changes.is_none());
        let listings = runner
            .calls()
            .iter()
            .filter(|call| *call == "npx browserslist")
            .count();
        assert_eq!(listings, 1);
    }

    #[test]
    fn failed_second_snapshot_skips_comparison_but_succeeds() {
        let dir = npm_project();
        let runner = npm_runner()
            .respond("npx browserslist", CommandOutput::success("chrome 120\n"))
            .respond("npx browserslist", CommandOutput::failure(1, "crashed"));

        let summary = run_update(dir.path(), &options(true), &runner).unwrap();
        assert!(summary.changes.is_none());
    }

    #[test]
    fn no_diff_never_lists_browsers() {
        let dir = npm_project();
        let runner = npm_runner();

        let summary = run_update(dir.path(), &options(false), &runner).unwrap();

        assert!(summary.changes.is_none());
        assert!(!runner.calls().iter().any(|call| call == "npx browserslist"));
    }

    #[test]
    fn registry_failure_aborts_before_any_change() {
        let dir = npm_project();
        let runner = ScriptedRunner::new().respond(
            "npm show caniuse-lite --json",
            CommandOutput::failure(1, "E404"),
        );

        let err = run_update(dir.path(), &options(true), &runner).unwrap_err();

        assert!(matches!(err, UpdateDbError::Registry(_)));
        assert_eq!(runner.calls(), vec!["npm show caniuse-lite --json"]);
        let content = fs::read_to_string(dir.path().join("package-lock.json")).unwrap();
        assert_eq!(content, PACKAGE_LOCK);
    }

    #[test]
    fn failed_uninstall_is_fatal() {
        let dir = npm_project();
        let runner = ScriptedRunner::new()
            .respond("npm show caniuse-lite --json", CommandOutput::success(NPM_SHOW))
            .respond("npm install caniuse-lite", CommandOutput::success(""))
            .respond(
                "npm uninstall caniuse-lite",
                CommandOutput::failure(1, "EPERM"),
            );

        let err = run_update(dir.path(), &options(false), &runner).unwrap_err();
        assert!(matches!(err, UpdateDbError::ExternalCommand { .. }));
    }

    #[test]
    fn check_reports_outdated_without_writing() {
        let dir = npm_project();
        let runner = ScriptedRunner::new()
            .respond("npm show caniuse-lite --json", CommandOutput::success(NPM_SHOW));

        let status = run_check(dir.path(), "caniuse-lite", &runner).unwrap();

        assert_eq!(
            status,
            LockStatus::Outdated {
                installed: vec!["1.0.0".to_string()]
            }
        );
        assert_eq!(runner.calls(), vec!["npm show caniuse-lite --json"]);
        let content = fs::read_to_string(dir.path().join("package-lock.json")).unwrap();
        assert_eq!(content, PACKAGE_LOCK);
    }
}
