//! # Configuration Tree
//!
//! The persisted shape of a dashboard: whether it is enabled, its own
//! settings, and for every module its enabled flag and settings. Values are
//! primitive scalars only.
//!
//! ```json
//! {
//!   "enabled": true,
//!   "settings": { "layout": "registers assembly", "output": "", "style": true },
//!   "modules": {
//!     "assembly": { "enabled": true, "settings": { "instructions-before": 6, "opcodes": false } }
//!   }
//! }
//! ```
//!
//! Settings missing from a tree keep their current values, so a partial tree
//! is a valid overlay.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::SettingValue;

const fn enabled_by_default() -> bool
{
    true
}

/// Persisted state of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig
{
    /// Whether the module is drawn
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Settings by name
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
}

/// Persisted state of a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig
{
    /// Whether the dashboard renders at all
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Dashboard-level settings by name
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
    /// Module state by module name
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
}

impl DashboardConfig
{
    /// Parse a tree from JSON.
    ///
    /// ## Errors
    ///
    /// `Json` for malformed input.
    pub fn from_json(json: &str) -> Result<Self>
    {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON.
    ///
    /// ## Errors
    ///
    /// `Json` if serialisation fails.
    pub fn to_json(&self) -> Result<String>
    {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a tree from a file.
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be read, `Json` if it does not parse.
    pub fn load(path: &Path) -> Result<Self>
    {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Write the tree to a file.
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()>
    {
        fs::write(path, self.to_json()? + "\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_partial_tree_uses_defaults()
    {
        let config = DashboardConfig::from_json(r#"{ "modules": { "assembly": { "settings": { "instructions-before": 3 } } } }"#).unwrap();
        assert!(config.enabled);
        assert!(config.settings.is_empty());
        let assembly = &config.modules["assembly"];
        assert!(assembly.enabled);
        assert_eq!(assembly.settings["instructions-before"], SettingValue::Int(3));
    }

    #[test]
    fn test_scalars_keep_their_types()
    {
        let config = DashboardConfig::from_json(r#"{ "settings": { "style": false, "output": "/tmp/x" } }"#).unwrap();
        assert_eq!(config.settings["style"], SettingValue::Bool(false));
        assert_eq!(config.settings["output"], SettingValue::Str("/tmp/x".into()));
        assert!(DashboardConfig::from_json(r#"{ "settings": { "style": [1] } }"#).is_err());
    }
}
