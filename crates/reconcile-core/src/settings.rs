//! Settings loaded from `.reconcile.toml`
//!
//! ```toml
//! default_remote = "origin"
//! default_scope = "workflow"
//! check_fetched_objects = true
//! require_clean_workspace = true
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::context::Scope;

/// File name looked up in the working directory root
pub const SETTINGS_FILE: &str = ".reconcile.toml";

fn default_true() -> bool {
    true
}

/// Workflow settings for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Remote preselected in the choose-remote stage
    #[serde(default)]
    pub default_remote: Option<String>,

    /// Scope preselected in the select-scope stage
    #[serde(default)]
    pub default_scope: Scope,

    /// Verify fetched objects before moving tracking references
    #[serde(default = "default_true")]
    pub check_fetched_objects: bool,

    /// Refuse to start while the working tree has local changes
    #[serde(default = "default_true")]
    pub require_clean_workspace: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_remote: None,
            default_scope: Scope::default(),
            check_fetched_objects: true,
            require_clean_workspace: true,
        }
    }
}

impl Settings {
    /// Parse settings from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `<root>/.reconcile.toml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "Loading settings");
                Self::parse(&content)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}
