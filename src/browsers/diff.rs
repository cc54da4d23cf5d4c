use crate::browsers::BrowserSnapshot;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added,
    Removed,
}

/// One browser version that appeared or disappeared between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub browser: String,
    pub version: String,
    pub change: Change,
}

impl DiffEntry {
    fn new(browser: &str, version: &str, change: Change) -> Self {
        Self {
            browser: browser.to_string(),
            version: version.to_string(),
            change,
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.change {
            Change::Added => '+',
            Change::Removed => '-',
        };
        write!(f, "{} {} {}", sign, self.browser, self.version)
    }
}

/// Lists the browser versions removed and added going from `old` to `new`.
///
/// Browsers come in `old`'s order followed by browsers only present in `new`.
/// Within a browser, removals precede additions. An empty result means the
/// two snapshots target the same browsers.
pub fn diff(old: &BrowserSnapshot, new: &BrowserSnapshot) -> Vec<DiffEntry> {
    let browsers = old
        .iter()
        .map(|(name, _)| name)
        .chain(new.iter().map(|(name, _)| name).filter(|name| !old.contains(name)));

    let mut entries = Vec::new();
    for browser in browsers {
        let old_versions = old.versions(browser).unwrap_or_default();
        let new_versions = new.versions(browser).unwrap_or_default();

        entries.extend(
            old_versions
                .iter()
                .filter(|v| !new_versions.contains(v))
                .map(|v| DiffEntry::new(browser, v, Change::Removed)),
        );
        entries.extend(
            new_versions
                .iter()
                .filter(|v| !old_versions.contains(v))
                .map(|v| DiffEntry::new(browser, v, Change::Added)),
        );
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rows: &[(&'static str, &'static str)]) -> BrowserSnapshot {
        rows.iter().copied().collect()
    }

    fn rendered(entries: &[DiffEntry]) -> Vec<String> {
        entries.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn reports_removals_then_additions_in_browser_order() {
        let old = snapshot(&[("IE", "10"), ("IE", "11"), ("Chrome", "90")]);
        let new = snapshot(&[
            ("IE", "11"),
            ("Chrome", "90"),
            ("Chrome", "91"),
            ("Firefox", "89"),
        ]);

        assert_eq!(
            rendered(&diff(&old, &new)),
            vec!["- IE 10", "+ Chrome 91", "+ Firefox 89"]
        );
    }

    #[test]
    fn removals_precede_additions_within_a_browser() {
        let old = snapshot(&[("chrome", "119"), ("chrome", "120")]);
        let new = snapshot(&[("chrome", "120"), ("chrome", "121")]);

        let entries = diff(&old, &new);
        assert_eq!(
            entries,
            vec![
                DiffEntry::new("chrome", "119", Change::Removed),
                DiffEntry::new("chrome", "121", Change::Added),
            ]
        );
    }

    #[test]
    fn identical_targets_produce_no_changes() {
        let old = snapshot(&[("safari", "17"), ("chrome", "120"), ("chrome", "119")]);
        let new = snapshot(&[("chrome", "119"), ("chrome", "120"), ("safari", "17")]);
        assert!(diff(&old, &new).is_empty());
        assert!(diff(&BrowserSnapshot::default(), &BrowserSnapshot::default()).is_empty());
    }

    #[test]
    fn dropped_browser_is_removed_entirely() {
        let old = snapshot(&[("ie", "11"), ("edge", "120")]);
        let new = snapshot(&[("edge", "120")]);
        assert_eq!(rendered(&diff(&old, &new)), vec!["- ie 11"]);
    }

    #[test]
    fn swapping_sides_swaps_added_and_removed() {
        let a = snapshot(&[("IE", "10"), ("IE", "11"), ("Chrome", "90")]);
        let b = snapshot(&[("IE", "11"), ("Chrome", "91"), ("Firefox", "89")]);

        let forward = diff(&a, &b);
        let backward = diff(&b, &a);

        let pick = |entries: &[DiffEntry], change: Change| {
            let mut keys: Vec<(String, String)> = entries
                .iter()
                .filter(|e| e.change == change)
                .map(|e| (e.browser.clone(), e.version.clone()))
                .collect();
            keys.sort();
            keys
        };

        assert_eq!(
            pick(&forward, Change::Removed),
            pick(&backward, Change::Added)
        );
        assert_eq!(
            pick(&forward, Change::Added),
            pick(&backward, Change::Removed)
        );
    }
}
