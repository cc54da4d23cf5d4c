use crate::error::{Result, UpdateDbError};
use crate::lockfile::{LockfileRewriter, ObservedVersions, RewriteResult};
use crate::registry::RegistryVersionRecord;
use regex::{NoExpand, Regex};

/// A yarn v1 lockfile split into entries and the blank-line runs between them.
///
/// Joining the blocks back together reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Lines of one entry, without their terminating newlines
    Entry(Vec<String>),
    /// A run of newlines kept verbatim
    Separator(String),
}

/// Rewriter for yarn v1 `yarn.lock` files
pub struct YarnLockfile {
    header: String,
    separator: Regex,
    version: Regex,
    resolved: Regex,
    integrity: Regex,
}

impl YarnLockfile {
    pub fn new(package: &str) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| UpdateDbError::Parse(format!("Regex error: {e}")))
        };

        Ok(Self {
            header: format!("{package}@"),
            separator: compile(r"\n{2,}")?,
            version: compile(r#"version "([^"]*)""#)?,
            resolved: compile(r#"resolved "[^"]+""#)?,
            integrity: compile(r"integrity .+")?,
        })
    }

    pub fn parse(&self, content: &str) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut last = 0;

        for run in self.separator.find_iter(content) {
            push_entry(&mut blocks, &content[last..run.start()]);
            blocks.push(Block::Separator(run.as_str().to_string()));
            last = run.end();
        }

        let tail = &content[last..];
        match tail.strip_suffix('\n') {
            Some(entry) => {
                push_entry(&mut blocks, entry);
                blocks.push(Block::Separator("\n".to_string()));
            }
            None => push_entry(&mut blocks, tail),
        }

        blocks
    }

    pub fn transform(
        &self,
        blocks: Vec<Block>,
        latest: &RegistryVersionRecord,
    ) -> Result<(Vec<Block>, ObservedVersions)> {
        let mut observed = ObservedVersions::default();
        let blocks = blocks
            .into_iter()
            .map(|block| match block {
                Block::Entry(lines) => self
                    .update_entry(lines, latest, &mut observed)
                    .map(Block::Entry),
                separator => Ok(separator),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((blocks, observed))
    }

    fn update_entry(
        &self,
        mut lines: Vec<String>,
        latest: &RegistryVersionRecord,
        observed: &mut ObservedVersions,
    ) -> Result<Vec<String>> {
        if !lines.first().is_some_and(|line| line.contains(&self.header)) {
            return Ok(lines);
        }

        let current = lines
            .get(1)
            .and_then(|line| self.version.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| {
                UpdateDbError::Parse(format!(
                    "Entry `{}` has no `version \"...\"` line",
                    lines[0].trim_end_matches(':')
                ))
            })?;

        observed.insert(current.as_str());
        if current == latest.version {
            return Ok(lines);
        }

        let version_field = format!("version \"{}\"", latest.version);
        lines[1] = self
            .version
            .replace(&lines[1], NoExpand(&version_field))
            .into_owned();

        if let Some(line) = lines.get_mut(2) {
            let resolved_field = format!("resolved \"{}\"", latest.tarball);
            *line = self
                .resolved
                .replace(line.as_str(), NoExpand(&resolved_field))
                .into_owned();
        }

        // Only four-line entries are known to end with an integrity line.
        if lines.len() == 4 {
            lines[3] = match &latest.integrity {
                Some(hash) => {
                    let integrity_field = format!("integrity {hash}");
                    self.integrity
                        .replace(&lines[3], NoExpand(&integrity_field))
                        .into_owned()
                }
                None => String::new(),
            };
        }

        Ok(lines)
    }

    pub fn serialize(blocks: &[Block]) -> String {
        let mut out = String::new();
        for block in blocks {
            match block {
                Block::Entry(lines) => out.push_str(&lines.join("\n")),
                Block::Separator(run) => out.push_str(run),
            }
        }
        out
    }
}

fn push_entry(blocks: &mut Vec<Block>, text: &str) {
    if !text.is_empty() {
        blocks.push(Block::Entry(text.split('\n').map(str::to_string).collect()));
    }
}

impl LockfileRewriter for YarnLockfile {
    fn rewrite(&self, content: &str, latest: &RegistryVersionRecord) -> Result<RewriteResult> {
        let blocks = self.parse(content);
        let (blocks, observed) = self.transform(blocks, latest)?;
        Ok(RewriteResult {
            content: Self::serialize(&blocks),
            observed,
        })
    }
}
