use crate::error::{Result, UpdateDbError};
use crate::lockfile::{LockfileRewriter, ObservedVersions, RewriteResult};
use crate::registry::RegistryVersionRecord;
use serde_json::{Map, Value};

const NODE_MODULES: &str = "node_modules/";

/// Rewriter for `package-lock.json` and `npm-shrinkwrap.json`.
///
/// Entries of the tracked package are removed rather than updated; the
/// install that follows records the fresh resolution.
pub struct NpmLockfile {
    package: String,
}

impl NpmLockfile {
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
        }
    }

    /// Consumes a dependency node and returns it without the tracked package,
    /// descending through every nested `dependencies` object.
    fn strip_node(&self, node: Value, observed: &mut ObservedVersions) -> Value {
        let Value::Object(mut fields) = node else {
            return node;
        };

        if let Some(Value::Object(dependencies)) = fields.get_mut("dependencies") {
            let taken = std::mem::take(dependencies);
            *dependencies = taken
                .into_iter()
                .filter_map(|(name, child)| {
                    if name == self.package {
                        record_version(&child, observed);
                        None
                    } else {
                        Some((name, self.strip_node(child, observed)))
                    }
                })
                .collect();
        }

        Value::Object(fields)
    }

    /// Lockfile v2/v3 keep a flat `packages` map keyed by install path.
    fn strip_packages(
        &self,
        mut root: Map<String, Value>,
        observed: &mut ObservedVersions,
    ) -> Map<String, Value> {
        if let Some(Value::Object(packages)) = root.get_mut("packages") {
            let taken = std::mem::take(packages);
            *packages = taken
                .into_iter()
                .filter(|(path, entry)| {
                    if self.is_install_path(path) {
                        record_version(entry, observed);
                        false
                    } else {
                        true
                    }
                })
                .collect();
        }
        root
    }

    fn is_install_path(&self, path: &str) -> bool {
        path.rsplit_once(NODE_MODULES)
            .is_some_and(|(_, name)| name == self.package)
    }
}

fn record_version(entry: &Value, observed: &mut ObservedVersions) {
    if let Some(version) = entry.get("version").and_then(Value::as_str) {
        observed.insert(version);
    }
}

impl LockfileRewriter for NpmLockfile {
    fn rewrite(&self, content: &str, _latest: &RegistryVersionRecord) -> Result<RewriteResult> {
        let root: Value = serde_json::from_str(content)
            .map_err(|e| UpdateDbError::Parse(format!("Invalid JSON lockfile: {e}")))?;

        let mut observed = ObservedVersions::default();
        let root = match self.strip_node(root, &mut observed) {
            Value::Object(fields) => Value::Object(self.strip_packages(fields, &mut observed)),
            other => other,
        };

        let mut content_out = serde_json::to_string_pretty(&root)?;
        if content.ends_with('\n') {
            content_out.push('\n');
        }

        Ok(RewriteResult {
            content: content_out,
            observed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest() -> RegistryVersionRecord {
        RegistryVersionRecord {
            version: "1.0.30001700".to_string(),
            tarball: "https://registry.npmjs.org/caniuse-lite/-/caniuse-lite-1.0.30001700.tgz"
                .to_string(),
            integrity: Some("sha512-new".to_string()),
        }
    }

    fn rewrite(content: &str) -> RewriteResult {
        NpmLockfile::new("caniuse-lite")
            .rewrite(content, &latest())
            .unwrap()
    }

    #[test]
    fn removes_every_nested_occurrence() {
        let content = r#"{
  "name": "app",
  "lockfileVersion": 1,
  "dependencies": {
    "browserslist": {
      "version": "4.16.0",
      "dependencies": {
        "caniuse-lite": { "version": "1.0.30001100" }
      }
    },
    "caniuse-lite": { "version": "1.0.30001100" },
    "autoprefixer": {
      "version": "10.0.0",
      "dependencies": {
        "caniuse-lite": { "version": "1.0.30001200" }
      }
    }
  }
}"#;
        let result = rewrite(content);

        assert!(!result.content.contains("caniuse-lite"));
        assert_eq!(result.observed.len(), 2);
        assert_eq!(
            result.observed.sorted(),
            vec!["1.0.30001100", "1.0.30001200"]
        );
    }

    #[test]
    fn keeps_key_order_and_two_space_indent() {
        let content = "{\n  \"name\": \"app\",\n  \"version\": \"1.0.0\",\n  \"dependencies\": {\n    \"zeta\": {\n      \"version\": \"1.0.0\"\n    },\n    \"caniuse-lite\": {\n      \"version\": \"1.0.0\"\n    },\n    \"alpha\": {\n      \"version\": \"2.0.0\"\n    }\n  }\n}\n";
        let expected = "{\n  \"name\": \"app\",\n  \"version\": \"1.0.0\",\n  \"dependencies\": {\n    \"zeta\": {\n      \"version\": \"1.0.0\"\n    },\n    \"alpha\": {\n      \"version\": \"2.0.0\"\n    }\n  }\n}\n";

        assert_eq!(rewrite(content).content, expected);
    }

    #[test]
    fn strips_flat_packages_map() {
        let content = r#"{
  "lockfileVersion": 3,
  "packages": {
    "": { "name": "app" },
    "node_modules/caniuse-lite": { "version": "1.0.30001600" },
    "node_modules/browserslist": { "version": "4.23.0" },
    "node_modules/browserslist/node_modules/caniuse-lite": { "version": "1.0.30001500" },
    "node_modules/not-caniuse-lite": { "version": "0.1.0" }
  }
}"#;
        let result = rewrite(content);

        assert_eq!(
            result.observed.sorted(),
            vec!["1.0.30001500", "1.0.30001600"]
        );
        assert!(result.content.contains("node_modules/browserslist"));
        assert!(result.content.contains("node_modules/not-caniuse-lite"));
        assert!(!result.content.contains("\"node_modules/caniuse-lite\""));
    }

    #[test]
    fn reports_zero_occurrences() {
        let result = rewrite(r#"{"dependencies":{"react":{"version":"18.0.0"}}}"#);
        assert!(result.observed.is_empty());
        assert!(result.content.contains("react"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = NpmLockfile::new("caniuse-lite")
            .rewrite("{ not json", &latest())
            .unwrap_err();
        assert!(matches!(err, UpdateDbError::Parse(_)));
    }
}
