//! # Settings
//!
//! Named, typed settings of the dashboard and of each module.
//!
//! A setting keeps the type of its default for its whole life: assigning a
//! value of another type is rejected, and text given on the command line is
//! parsed according to that type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// Type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind
{
    /// `on`/`off`
    Bool,
    /// Signed integer
    Int,
    /// Free text
    Str,
}

impl fmt::Display for SettingKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SettingKind::Bool => write!(f, "boolean"),
            SettingKind::Int => write!(f, "integer"),
            SettingKind::Str => write!(f, "string"),
        }
    }
}

/// Value of a setting.
///
/// Serialises as the bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue
{
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// String
    Str(String),
}

impl SettingValue
{
    /// Type of the value.
    pub fn kind(&self) -> SettingKind
    {
        match self {
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::Int(_) => SettingKind::Int,
            SettingValue::Str(_) => SettingKind::Str,
        }
    }

    /// Parse command-line text as a value of `kind`.
    ///
    /// ```rust
    /// use vantage_dash::settings::{SettingKind, SettingValue};
    ///
    /// assert_eq!(SettingValue::parse(SettingKind::Bool, "off"), Some(SettingValue::Bool(false)));
    /// assert_eq!(SettingValue::parse(SettingKind::Int, "12"), Some(SettingValue::Int(12)));
    /// assert_eq!(SettingValue::parse(SettingKind::Int, "twelve"), None);
    /// ```
    pub fn parse(kind: SettingKind, text: &str) -> Option<Self>
    {
        let text = text.trim();
        match kind {
            SettingKind::Bool => match text.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => Some(SettingValue::Bool(true)),
                "off" | "false" | "no" | "0" => Some(SettingValue::Bool(false)),
                _ => None,
            },
            SettingKind::Int => text.parse().ok().map(SettingValue::Int),
            SettingKind::Str => Some(SettingValue::Str(text.to_string())),
        }
    }
}

impl fmt::Display for SettingValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            SettingValue::Bool(true) => write!(f, "on"),
            SettingValue::Bool(false) => write!(f, "off"),
            SettingValue::Int(value) => write!(f, "{value}"),
            SettingValue::Str(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for SettingValue
{
    fn from(value: bool) -> Self
    {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue
{
    fn from(value: i64) -> Self
    {
        SettingValue::Int(value)
    }
}

impl From<&str> for SettingValue
{
    fn from(value: &str) -> Self
    {
        SettingValue::Str(value.to_string())
    }
}

/// One declared setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting
{
    /// Name used on the command line and in the configuration tree
    pub name: &'static str,
    /// One-line description
    pub doc: &'static str,
    default: SettingValue,
    value: SettingValue,
}

impl Setting
{
    /// Current value.
    pub fn value(&self) -> &SettingValue
    {
        &self.value
    }

    /// Value the setting was declared with.
    pub fn default_value(&self) -> &SettingValue
    {
        &self.default
    }
}

/// Settings of one scope (the dashboard or a module), in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings
{
    scope: String,
    entries: Vec<Setting>,
}

impl Settings
{
    /// Empty settings for `scope`.
    pub fn new(scope: impl Into<String>) -> Self
    {
        Self {
            scope: scope.into(),
            entries: Vec::new(),
        }
    }

    /// Declare a setting with its default value.
    #[must_use]
    pub fn define(mut self, name: &'static str, default: impl Into<SettingValue>, doc: &'static str) -> Self
    {
        let default = default.into();
        self.entries.retain(|setting| setting.name != name);
        self.entries.push(Setting {
            name,
            doc,
            value: default.clone(),
            default,
        });
        self
    }

    /// Scope name used in error messages.
    pub fn scope(&self) -> &str
    {
        &self.scope
    }

    /// Value of a setting.
    pub fn get(&self, name: &str) -> Option<&SettingValue>
    {
        self.entries.iter().find(|setting| setting.name == name).map(Setting::value)
    }

    /// A boolean setting, `false` if missing or of another type.
    pub fn bool(&self, name: &str) -> bool
    {
        matches!(self.get(name), Some(SettingValue::Bool(true)))
    }

    /// An integer setting, `0` if missing or of another type.
    pub fn int(&self, name: &str) -> i64
    {
        match self.get(name) {
            Some(SettingValue::Int(value)) => *value,
            _ => 0,
        }
    }

    /// A string setting, empty if missing or of another type.
    pub fn str(&self, name: &str) -> &str
    {
        match self.get(name) {
            Some(SettingValue::Str(value)) => value,
            _ => "",
        }
    }

    /// Assign a value of the setting's own type.
    ///
    /// ## Errors
    ///
    /// `UnknownSetting` for undeclared names, `InvalidValue` for a type mismatch.
    pub fn set(&mut self, name: &str, value: SettingValue) -> Result<()>
    {
        let scope = &self.scope;
        let setting = self
            .entries
            .iter_mut()
            .find(|setting| setting.name == name)
            .ok_or_else(|| DashError::UnknownSetting {
                scope: scope.clone(),
                name: name.to_string(),
            })?;
        if setting.default.kind() != value.kind() {
            return Err(DashError::InvalidValue {
                scope: scope.clone(),
                name: name.to_string(),
                expected: setting.default.kind(),
                value: value.to_string(),
            });
        }
        setting.value = value;
        Ok(())
    }

    /// Parse `text` according to the setting's type and assign it.
    ///
    /// ## Errors
    ///
    /// As [`Settings::set`], plus `InvalidValue` for unparsable text.
    pub fn set_from_str(&mut self, name: &str, text: &str) -> Result<()>
    {
        let kind = self.kind_of(name)?;
        let value = SettingValue::parse(kind, text).ok_or_else(|| DashError::InvalidValue {
            scope: self.scope.clone(),
            name: name.to_string(),
            expected: kind,
            value: text.to_string(),
        })?;
        self.set(name, value)
    }

    /// Type of a declared setting.
    ///
    /// ## Errors
    ///
    /// `UnknownSetting` for undeclared names.
    pub fn kind_of(&self, name: &str) -> Result<SettingKind>
    {
        self.entries
            .iter()
            .find(|setting| setting.name == name)
            .map(|setting| setting.default.kind())
            .ok_or_else(|| DashError::UnknownSetting {
                scope: self.scope.clone(),
                name: name.to_string(),
            })
    }

    /// Every setting, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Setting>
    {
        self.entries.iter()
    }

    /// Restore every default.
    pub fn reset(&mut self)
    {
        for setting in &mut self.entries {
            setting.value = setting.default.clone();
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn settings() -> Settings
    {
        Settings::new("assembly")
            .define("context", 5_i64, "Instructions around the pc")
            .define("opcodes", false, "Show opcode bytes")
            .define("output", "", "Destination")
    }

    #[test]
    fn test_typed_getters()
    {
        let settings = settings();
        assert_eq!(settings.int("context"), 5);
        assert!(!settings.bool("opcodes"));
        assert_eq!(settings.str("output"), "");
        assert_eq!(settings.int("missing"), 0);
    }

    #[test]
    fn test_type_is_fixed_by_default()
    {
        let mut settings = settings();
        let err = settings.set("context", SettingValue::Bool(true)).unwrap_err();
        assert!(matches!(err, DashError::InvalidValue { expected: SettingKind::Int, .. }));
        assert!(settings.set_from_str("context", "lots").is_err());

        settings.set_from_str("context", "8").unwrap();
        settings.set_from_str("opcodes", "on").unwrap();
        settings.set_from_str("output", "/tmp/asm").unwrap();
        assert_eq!(settings.int("context"), 8);
        assert!(settings.bool("opcodes"));
        assert_eq!(settings.str("output"), "/tmp/asm");

        settings.reset();
        assert_eq!(settings.int("context"), 5);
    }

    #[test]
    fn test_unknown_setting()
    {
        let mut settings = settings();
        let err = settings.set_from_str("colour", "red").unwrap_err();
        assert_eq!(err.to_string(), "assembly: no setting named \"colour\"");
    }
}
