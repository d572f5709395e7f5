//! Configuration Management
//!
//! This module handles loading and saving connection profiles.
//!
//! # Configuration Locations
//! - Local: `.rolesweep/config.json` (team-shareable, per-directory)
//! - Global: `~/.config/rolesweep/connections.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Explicit connection flags (highest priority, handled by the CLI)
//! 2. Local config file (`.rolesweep/config.json`)
//! 3. Global config file (`~/.config/rolesweep/connections.json`)
//!
//! # Named Profiles
//! Connections are stored as named profiles (e.g., "local", "staging",
//! "prod"). Passwords are either stored directly or referenced through an
//! environment variable name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, RolesweepError};
use crate::store::ConnectionConfig;

/// Profile registry (stored in config files)
///
/// Example:
/// ```json
/// {
///   "profiles": {
///     "local": { "host": "localhost", "port": 5432, ... },
///     "staging": { "host": "db.staging", "port": 5432, ... }
///   },
///   "default": "local"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileRegistry {
    /// Named profiles
    pub profiles: HashMap<String, StoredProfile>,

    /// Name of the default profile (must exist in the profiles map)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Stored connection profile
///
/// Like `ConnectionConfig` but supports an environment variable reference
/// for the password, so config files need not hold credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    /// Connection configuration
    #[serde(flatten)]
    pub config: ConnectionConfig,

    /// Environment variable name for the password (if not stored directly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl StoredProfile {
    /// Resolve environment variables and return a usable `ConnectionConfig`
    pub fn resolve(&self) -> Result<ConnectionConfig> {
        let mut config = self.config.clone();

        // If password_env is set, resolve the environment variable
        if let Some(env_var) = &self.password_env {
            match std::env::var(env_var) {
                Ok(password) => config.password = Some(password),
                Err(_) => {
                    return Err(RolesweepError::config_error(format!(
                        "Environment variable {env_var} not found for password"
                    )));
                }
            }
        }

        Ok(config)
    }
}

/// Configuration file location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Local config: `.rolesweep/config.json` (team-shareable)
    Local,
    /// Global config: `~/.config/rolesweep/connections.json` (per-user)
    Global,
}

/// Get path to local config file (`.rolesweep/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        RolesweepError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".rolesweep").join("config.json"))
}

/// Get path to global config file (`~/.config/rolesweep/connections.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        RolesweepError::config_error("Could not determine user config directory")
    })?;

    Ok(config_dir.join("rolesweep").join("connections.json"))
}

/// Load a profile registry from a config file
///
/// A missing file is an empty registry, not an error.
pub fn load_registry(path: &Path) -> Result<ProfileRegistry> {
    if !path.exists() {
        return Ok(ProfileRegistry::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RolesweepError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str::<ProfileRegistry>(&contents)
        .map_err(|e| RolesweepError::config_error(format!("Invalid config file format: {e}")))
}

/// Save a profile registry to a config file
pub fn save_registry(path: &Path, registry: &ProfileRegistry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RolesweepError::config_error(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(registry)
        .map_err(|e| RolesweepError::config_error(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| RolesweepError::config_error(format!("Could not write config file: {e}")))?;

    Ok(())
}

/// Merge two registries, with `local` winning per profile name
///
/// The local default pointer also wins when set.
fn merge_registries(global: ProfileRegistry, local: ProfileRegistry) -> ProfileRegistry {
    let mut merged = global;

    for (name, profile) in local.profiles {
        merged.profiles.insert(name, profile);
    }

    if local.default.is_some() {
        merged.default = local.default;
    }

    merged
}

/// Load profiles with precedence (local over global)
pub fn load_with_precedence() -> Result<ProfileRegistry> {
    let local_path = local_config_path()?;
    let global_path = global_config_path()?;

    let global = load_registry(&global_path)?;
    let local = load_registry(&local_path)?;

    Ok(merge_registries(global, local))
}

/// Resolve a profile by name from the merged view
///
/// With `name` unset, the registry's default profile is used.
pub fn resolve_profile(name: Option<&str>) -> Result<ConnectionConfig> {
    let registry = load_with_precedence()?;

    let profile_name = match name {
        Some(n) => n.to_string(),
        None => registry.default.clone().ok_or_else(|| {
            let available: Vec<_> = registry.profiles.keys().collect();
            RolesweepError::config_error(format!(
                "No default profile set. Available profiles: {available:?}. \
                 Specify one with --conn or save one first."
            ))
        })?,
    };

    let stored = registry.profiles.get(&profile_name).ok_or_else(|| {
        let available: Vec<_> = registry.profiles.keys().collect();
        RolesweepError::config_error(format!(
            "Profile '{profile_name}' not found. Available profiles: {available:?}"
        ))
    })?;

    stored.resolve()
}

/// Save a profile to a config file
///
/// The first profile saved to a file becomes that file's default.
pub fn save_profile(
    name: &str,
    config: ConnectionConfig,
    password_env: Option<String>,
    location: ConfigLocation,
) -> Result<()> {
    let config_path = match location {
        ConfigLocation::Local => local_config_path()?,
        ConfigLocation::Global => global_config_path()?,
    };

    let mut registry = load_registry(&config_path)?;

    let is_first_profile = registry.profiles.is_empty();

    registry.profiles.insert(name.to_string(), StoredProfile { config, password_env });

    if is_first_profile {
        registry.default = Some(name.to_string());
    }

    save_registry(&config_path, &registry)
}

/// Remove a profile from a config file
///
/// Returns whether a profile was actually removed. A default pointer at
/// the removed profile is cleared.
pub fn remove_profile(name: &str, location: ConfigLocation) -> Result<bool> {
    let config_path = match location {
        ConfigLocation::Local => local_config_path()?,
        ConfigLocation::Global => global_config_path()?,
    };

    let mut registry = load_registry(&config_path)?;

    if registry.profiles.remove(name).is_none() {
        return Ok(false);
    }

    if registry.default.as_deref() == Some(name) {
        registry.default = None;
    }

    save_registry(&config_path, &registry)?;
    Ok(true)
}

/// List all available profiles from the merged view
///
/// Returns a Vec of tuples: (`profile_name`, config, `is_default`)
pub fn list_profiles() -> Result<Vec<(String, ConnectionConfig, bool)>> {
    let registry = load_with_precedence()?;

    let mut profiles = Vec::new();
    for (name, stored) in &registry.profiles {
        match stored.resolve() {
            Ok(config) => {
                let is_default = registry.default.as_deref() == Some(name.as_str());
                profiles.push((name.clone(), config, is_default));
            }
            Err(_e) => {
                // Skip profiles that fail to resolve (e.g., missing env vars)
                // Note: Error details not logged to prevent credential leakage
                eprintln!("Warning: Could not resolve profile '{name}'");
            }
        }
    }

    profiles.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(host: &str, password: Option<&str>, password_env: Option<&str>) -> StoredProfile {
        StoredProfile {
            config: ConnectionConfig::new(
                host.to_string(),
                5432,
                "user".to_string(),
                password.map(String::from),
                "db".to_string(),
            ),
            password_env: password_env.map(String::from),
        }
    }

    #[test]
    fn test_profile_registry_serialization() {
        let mut registry = ProfileRegistry::default();
        registry.profiles.insert("test".to_string(), profile("localhost", Some("pass"), None));
        registry.default = Some("test".to_string());

        let json = serde_json::to_string_pretty(&registry).unwrap();
        assert!(json.contains("test"));
        assert!(json.contains("localhost"));
        // Flattened config: no nested "config" object
        assert!(!json.contains("\"config\""));
    }

    #[test]
    fn test_stored_profile_resolve_direct_password() {
        let stored = profile("localhost", Some("pass"), None);

        let resolved = stored.resolve().unwrap();
        assert_eq!(resolved.password, Some("pass".to_string()));
    }

    #[test]
    fn test_stored_profile_resolve_env_var() {
        std::env::set_var("ROLESWEEP_TEST_PASSWORD", "secret");

        let stored = profile("localhost", None, Some("ROLESWEEP_TEST_PASSWORD"));

        let resolved = stored.resolve().unwrap();
        assert_eq!(resolved.password, Some("secret".to_string()));

        std::env::remove_var("ROLESWEEP_TEST_PASSWORD");
    }

    #[test]
    fn test_stored_profile_resolve_missing_env_var() {
        let stored = profile("localhost", None, Some("ROLESWEEP_NONEXISTENT_VAR"));

        let result = stored.resolve();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .message()
            .contains("Environment variable ROLESWEEP_NONEXISTENT_VAR not found"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProfileRegistry::default();
        assert!(registry.profiles.is_empty());
        assert!(registry.default.is_none());
    }

    #[test]
    fn test_merging_both_profiles_visible() {
        let mut global = ProfileRegistry::default();
        global.profiles.insert("global-conn".to_string(), profile("global-host", None, None));
        global.default = Some("global-conn".to_string());

        let mut local = ProfileRegistry::default();
        local.profiles.insert("local-conn".to_string(), profile("local-host", None, None));

        let merged = merge_registries(global, local);

        assert_eq!(merged.profiles.len(), 2);
        assert!(merged.profiles.contains_key("global-conn"));
        assert!(merged.profiles.contains_key("local-conn"));
        // Local had no default pointer, so the global one survives
        assert_eq!(merged.default.as_deref(), Some("global-conn"));
    }

    #[test]
    fn test_merging_local_overrides_global() {
        let mut global = ProfileRegistry::default();
        global.profiles.insert("shared".to_string(), profile("global-host", None, None));

        let mut local = ProfileRegistry::default();
        local.profiles.insert("shared".to_string(), profile("local-host", None, None));

        let merged = merge_registries(global, local);

        assert_eq!(merged.profiles.len(), 1);
        assert_eq!(merged.profiles["shared"].config.host, "local-host");
    }

    #[test]
    fn test_merging_local_default_wins() {
        let mut global = ProfileRegistry::default();
        global.profiles.insert("a".to_string(), profile("a-host", None, None));
        global.default = Some("a".to_string());

        let mut local = ProfileRegistry::default();
        local.profiles.insert("b".to_string(), profile("b-host", None, None));
        local.default = Some("b".to_string());

        let merged = merge_registries(global, local);
        assert_eq!(merged.default.as_deref(), Some("b"));
    }

    #[test]
    fn test_password_env_not_serialized_when_none() {
        let stored = profile("localhost", Some("pass"), None);
        let json = serde_json::to_string(&stored).unwrap();

        assert!(!json.contains("password_env"));
    }

    #[test]
    fn test_registry_round_trip() {
        let mut registry = ProfileRegistry::default();
        registry
            .profiles
            .insert("prod".to_string(), profile("db.example.com", None, Some("PROD_PG_PASSWORD")));
        registry.default = Some("prod".to_string());

        let json = serde_json::to_string(&registry).unwrap();
        let parsed: ProfileRegistry = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.default.as_deref(), Some("prod"));
        let stored = &parsed.profiles["prod"];
        assert_eq!(stored.config.host, "db.example.com");
        assert_eq!(stored.password_env.as_deref(), Some("PROD_PG_PASSWORD"));
        assert_eq!(stored.config.password, None);
    }
}
