use crate::agents::package_manager::{CommandRunner, browsers_command};
use crate::error::{Result, UpdateDbError};
use std::path::Path;

/// Target browsers and their versions at one point in time.
///
/// Browsers and versions keep the order in which they were first seen so
/// that reports built from two snapshots are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserSnapshot {
    browsers: Vec<(String, Vec<String>)>,
}

impl BrowserSnapshot {
    /// Runs the listing command in `cwd` and parses its output.
    pub fn capture(runner: &dyn CommandRunner, cwd: &Path) -> Result<Self> {
        let command = browsers_command();
        let output = runner
            .run(&command, cwd)
            .map_err(|e| UpdateDbError::Capture(e.to_string()))?;

        if !output.success {
            return Err(UpdateDbError::Capture(format!(
                "`{}` exited with code {}: {}",
                command,
                output.code.unwrap_or(-1),
                output.stderr.trim()
            )));
        }

        Self::parse(&output.stdout)
    }

    /// Parses `browser version` rows, one per line.
    pub fn parse(output: &str) -> Result<Self> {
        let mut snapshot = Self::default();

        for line in output.trim().lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(browser), Some(version), None) => snapshot.insert(browser, version),
                _ => {
                    return Err(UpdateDbError::Capture(format!(
                        "Unexpected browser list line: '{line}'"
                    )));
                }
            }
        }

        Ok(snapshot)
    }

    pub fn insert(&mut self, browser: &str, version: &str) {
        match self.browsers.iter_mut().find(|(name, _)| name == browser) {
            Some((_, versions)) => {
                if !versions.iter().any(|v| v == version) {
                    versions.push(version.to_string());
                }
            }
            None => self
                .browsers
                .push((browser.to_string(), vec![version.to_string()])),
        }
    }

    pub fn versions(&self, browser: &str) -> Option<&[String]> {
        self.browsers
            .iter()
            .find(|(name, _)| name == browser)
            .map(|(_, versions)| versions.as_slice())
    }

    pub fn contains(&self, browser: &str) -> bool {
        self.versions(browser).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.browsers
            .iter()
            .map(|(name, versions)| (name.as_str(), versions.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.browsers.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for BrowserSnapshot {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut snapshot = Self::default();
        for (browser, version) in iter {
            snapshot.insert(browser, version);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::package_manager::CommandOutput;
    use crate::agents::package_manager::testing::ScriptedRunner;

    #[test]
    fn groups_versions_by_browser() {
        let snapshot = BrowserSnapshot::parse("chrome 120\nfirefox 121\nchrome 119\n").unwrap();

        assert_eq!(
            snapshot.versions("chrome"),
            Some(&["120".to_string(), "119".to_string()][..])
        );
        let order: Vec<&str> = snapshot.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["chrome", "firefox"]);
    }

    #[test]
    fn empty_output_is_an_empty_snapshot() {
        assert!(BrowserSnapshot::parse("").unwrap().is_empty());
        assert!(BrowserSnapshot::parse("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn accepts_ranges_and_extra_whitespace() {
        let snapshot = BrowserSnapshot::parse("  ios_saf 17.2-17.3 \nop_mini   all\n").unwrap();
        assert_eq!(
            snapshot.versions("ios_saf"),
            Some(&["17.2-17.3".to_string()][..])
        );
        assert!(snapshot.contains("op_mini"));
    }

    #[test]
    fn rejects_unparsable_lines() {
        let err = BrowserSnapshot::parse("chrome\n").unwrap_err();
        assert!(matches!(err, UpdateDbError::Capture(_)));

        let err = BrowserSnapshot::parse("npm warn exec the following package\n").unwrap_err();
        assert!(matches!(err, UpdateDbError::Capture(_)));
    }

    #[test]
    fn failed_listing_is_a_capture_error() {
        let runner = ScriptedRunner::new()
            .respond("npx browserslist", CommandOutput::failure(1, "Unknown browser query"));
        let err = BrowserSnapshot::capture(&runner, Path::new(".")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn spawn_failure_is_a_capture_error() {
        let runner = ScriptedRunner::new();
        let err = BrowserSnapshot::capture(&runner, Path::new(".")).unwrap_err();
        assert!(matches!(err, UpdateDbError::Capture(_)));
    }
}
