//! The subset of `package.json` preflight reads.
//!
//! The package manager owns the manifest; preflight only needs to know which
//! script the smoke test should launch and whether a `start` script exists for
//! the next-steps summary.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Entry script npm assumes when `main` is absent.
pub const DEFAULT_MAIN: &str = "index.js";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub main: Option<String>,
    pub scripts: HashMap<String, String>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Script the service starts from.
    pub fn entry_script(&self) -> &str {
        self.main
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MAIN)
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// `name@version` when both are present, else whichever is.
    pub fn label(&self) -> Option<String> {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => Some(format!("{}@{}", name, version)),
            (Some(name), None) => Some(name.clone()),
            _ => None,
        }
    }
}
