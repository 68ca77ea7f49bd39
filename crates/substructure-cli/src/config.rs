//! CLI configuration file.
//!
//! ```json
//! {
//!   "merge":   { "unresolved": "skip" },
//!   "compile": { "distinct": true, "indent": "  ", "class_comments": true }
//! }
//! ```
//!
//! Every field is optional; the defaults reproduce the plain query grammar.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use substructure_sparql::{CompileConfig, SparqlCompiler};
use substructure_sync::MergeConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstructureConfig {
    pub merge: MergeConfig,
    pub compile: CompileConfig,
}

impl SubstructureConfig {
    /// Read the config at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn compiler(&self) -> SparqlCompiler {
        SparqlCompiler::new(self.compile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use substructure_sync::UnresolvedPolicy;

    #[test]
    fn missing_path_gives_defaults() {
        let config = SubstructureConfig::load(None).unwrap();
        assert_eq!(config, SubstructureConfig::default());
        assert_eq!(config.merge.unresolved, UnresolvedPolicy::Skip);
        assert!(config.compile.distinct);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("substructure.json");
        std::fs::write(&path, r#"{"merge":{"unresolved":"reject"}}"#).unwrap();

        let config = SubstructureConfig::load(Some(&path)).unwrap();
        assert_eq!(config.merge.unresolved, UnresolvedPolicy::Reject);
        assert_eq!(config.compile, CompileConfig::default());
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = SubstructureConfig::load(Some(Path::new("/nonexistent/substructure.json")))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/substructure.json"));
    }
}
