// Lockfile rewriting for the tracked package.
//
// - NpmLockfile: strips stale entries from JSON lockfiles so the following
//   install resolves the package again
// - YarnLockfile: rewrites yarn v1 entries in place to point at the latest release
pub mod npm;
pub mod yarn;

pub use npm::NpmLockfile;
pub use yarn::YarnLockfile;

use crate::agents::lockfile_locator::{LockDescriptor, LockFormat};
use crate::error::Result;
use crate::registry::RegistryVersionRecord;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Rewrites every occurrence of the tracked package inside a lockfile
pub trait LockfileRewriter {
    fn rewrite(&self, content: &str, latest: &RegistryVersionRecord) -> Result<RewriteResult>;
}

/// New lockfile text plus the versions that were recorded before rewriting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub content: String,
    pub observed: ObservedVersions,
}

/// Distinct versions of the tracked package found in a lockfile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedVersions(BTreeSet<String>);

impl ObservedVersions {
    pub fn insert(&mut self, version: impl Into<String>) {
        self.0.insert(version.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True only when the lockfile records `version` and nothing else.
    pub fn is_exactly(&self, version: &str) -> bool {
        self.0.len() == 1 && self.0.contains(version)
    }

    /// Versions in semver order, or lexical order if any entry is not semver.
    pub fn sorted(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.0.iter().cloned().collect();
        let all_semver = versions.iter().all(|v| semver::Version::parse(v).is_ok());
        if all_semver {
            versions.sort_by(|a, b| compare_semver(a, b));
        }
        versions
    }
}

fn compare_semver(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Rewriter for formats edited in place; delegated formats have none.
pub fn rewriter_for(
    lock: &LockDescriptor,
    package: &str,
) -> Result<Option<Box<dyn LockfileRewriter>>> {
    let rewriter: Option<Box<dyn LockfileRewriter>> = match lock.format {
        LockFormat::StructuredTree => Some(Box::new(NpmLockfile::new(package))),
        LockFormat::LineBlock => Some(Box::new(YarnLockfile::new(package)?)),
        LockFormat::DelegatedUpgrade => None,
    };
    Ok(rewriter)
}
