//! Platform module registry
//!
//! When the closure hits a reference to a module the universe has no symbols
//! for, one opportunistic registry lookup is attempted before the reference
//! is reported as a missing dependency. The registry is an explicit,
//! immutable lookup table built once from the built-in platform set plus the
//! configuration, then threaded through the run; there is no hidden global
//! cache.

use log::debug;

use crate::config::Config;
use crate::types::FxIndexMap;

/// Canonical platform modules every target framework is assumed to provide,
/// with the historical aliases that resolve to them.
const BUILTIN: &[(&str, &str)] = &[
    ("System.Runtime", "System.Runtime"),
    ("System.Private.CoreLib", "System.Runtime"),
    ("mscorlib", "System.Runtime"),
    ("netstandard", "netstandard"),
];

/// Immutable name-to-canonical-name table for platform modules.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    canonical_by_alias: FxIndexMap<String, String>,
}

impl PlatformRegistry {
    /// Built-in platform set only.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for (alias, canonical) in BUILTIN {
            registry
                .canonical_by_alias
                .insert((*alias).to_string(), (*canonical).to_string());
        }
        registry
    }

    /// Built-in platform set extended with the configured module names and
    /// aliases. Configured entries win over built-ins.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::builtin();
        for name in &config.platform_modules {
            registry
                .canonical_by_alias
                .insert(name.clone(), name.clone());
        }
        for (alias, canonical) in &config.platform_aliases {
            registry
                .canonical_by_alias
                .insert(alias.clone(), canonical.clone());
        }
        debug!("platform registry holds {} entries", registry.len());
        registry
    }

    /// Resolve a module name to its canonical platform module, if known.
    pub fn resolve(&self, module: &str) -> Option<&str> {
        self.canonical_by_alias.get(module).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.canonical_by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical_by_alias.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_aliases_resolve_to_canonical_name() {
        let registry = PlatformRegistry::builtin();
        assert_eq!(registry.resolve("mscorlib"), Some("System.Runtime"));
        assert_eq!(registry.resolve("System.Runtime"), Some("System.Runtime"));
        assert_eq!(registry.resolve("ThirdParty.Lib"), None);
    }

    #[test]
    fn configured_entries_extend_and_override() {
        let mut config = Config::default();
        config.platform_modules.push("Vendor.Sdk".to_string());
        config
            .platform_aliases
            .insert("mscorlib".to_string(), "Vendor.Corlib".to_string());

        let registry = PlatformRegistry::from_config(&config);
        assert_eq!(registry.resolve("Vendor.Sdk"), Some("Vendor.Sdk"));
        assert_eq!(registry.resolve("mscorlib"), Some("Vendor.Corlib"));
    }
}
