//! Run configuration
//!
//! Loaded from an optional TOML file next to the invocation. Everything has a
//! default so the tool runs without any configuration at all.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::types::FxIndexMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Extra module names the platform registry should resolve.
    pub platform_modules: Vec<String>,

    /// Extra alias-to-canonical-name entries for the platform registry.
    pub platform_aliases: FxIndexMap<String, String>,

    /// Treat a non-empty consolidated missing-dependency report as an error
    /// instead of a warning.
    pub fail_on_missing: bool,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.platform_modules.is_empty());
        assert!(!config.fail_on_missing);
    }

    #[test]
    fn load_parses_all_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
platform_modules = ["Vendor.Sdk"]
fail_on_missing  = true

[platform_aliases]
"Vendor.Sdk.Compat" = "Vendor.Sdk"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.platform_modules, vec!["Vendor.Sdk"]);
        assert!(config.fail_on_missing);
        assert_eq!(
            config.platform_aliases.get("Vendor.Sdk.Compat").map(String::as_str),
            Some("Vendor.Sdk")
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("no_such_key = 1").is_err());
    }
}
