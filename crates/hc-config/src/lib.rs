// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for hostcompat.
//!
//! [`HostConfig`] decides which host flavor is assumed, whether the FFI
//! adapter may be offered, whether the composed surface is installed into the
//! process-wide slot, and the default log level.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use hc_error::{CompatError, ErrorCode};
use hc_identity::{HostFlavor, HostIdentity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file could not be read.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Parse error detail.
        reason: String,
    },

    /// Semantic validation failed.
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

impl From<ConfigError> for CompatError {
    fn from(err: ConfigError) -> Self {
        CompatError::new(ErrorCode::ConfigInvalid, err.to_string()).with_source(err)
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory issues that do not prevent operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// FFI was enabled but the flavor cannot provide it.
    FfiIgnored {
        /// Flavor that was configured.
        flavor: HostFlavor,
    },
    /// The reference flavor never installs anything, so `install_global` is moot.
    InstallIgnored,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::FfiIgnored { flavor } => {
                write!(f, "ffi = true has no effect for flavor '{flavor}'")
            }
            ConfigWarning::InstallIgnored => {
                f.write_str("install_global has no effect for the reference flavor")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level hostcompat configuration.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct HostConfig {
    /// Force a host flavor instead of deriving it from the build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<HostFlavor>,

    /// Offer the FFI adapter when the build includes it.
    #[serde(default = "default_true")]
    pub ffi: bool,

    /// Install the composed surface into the process-wide slot.
    #[serde(default = "default_true")]
    pub install_global: bool,

    /// Log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            flavor: None,
            ffi: true,
            install_global: true,
            log_level: Some("info".into()),
        }
    }
}

impl HostConfig {
    /// Resolve the identity this configuration injects.
    ///
    /// `ffi_compiled` is whether the FFI adapter exists in this build; it is
    /// only offered when the config also allows it.
    pub fn identity(&self, ffi_compiled: bool) -> HostIdentity {
        HostIdentity::detect(self.flavor, ffi_compiled && self.ffi)
    }
}

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`HostConfig`] from an optional TOML file path.
///
/// Environment overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<HostConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => HostConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Parse a TOML string into a [`HostConfig`].
pub fn parse_toml(content: &str) -> Result<HostConfig, ConfigError> {
    toml::from_str::<HostConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply overrides from the process environment.
///
/// Recognised variables:
/// - `HOSTCOMPAT_FLAVOR`
/// - `HOSTCOMPAT_FFI` (`1`/`true`/`0`/`false`)
/// - `HOSTCOMPAT_LOG_LEVEL`
pub fn apply_env_overrides(config: &mut HostConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides_from(
    config: &mut HostConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(val) = lookup("HOSTCOMPAT_FLAVOR") {
        let flavor = val
            .parse::<HostFlavor>()
            .map_err(|e| ConfigError::ParseError {
                reason: e.to_string(),
            })?;
        config.flavor = Some(flavor);
    }
    if let Some(val) = lookup("HOSTCOMPAT_FFI") {
        config.ffi = match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => {
                return Err(ConfigError::ParseError {
                    reason: format!("HOSTCOMPAT_FFI must be a boolean, got '{other}'"),
                });
            }
        };
    }
    if let Some(val) = lookup("HOSTCOMPAT_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
pub fn validate_config(config: &HostConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }

    match config.flavor {
        Some(flavor @ (HostFlavor::Reference | HostFlavor::Plain)) if config.ffi => {
            warnings.push(ConfigWarning::FfiIgnored { flavor });
        }
        _ => {}
    }
    if config.flavor == Some(HostFlavor::Reference) && config.install_global {
        warnings.push(ConfigWarning::InstallIgnored);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence.
///
/// Boolean switches always come from the overlay because TOML cannot express
/// "unset" for them once defaults are applied.
pub fn merge_configs(base: HostConfig, overlay: HostConfig) -> HostConfig {
    HostConfig {
        flavor: overlay.flavor.or(base.flavor),
        ffi: overlay.ffi,
        install_global: overlay.install_global,
        log_level: overlay.log_level.or(base.log_level),
    }
}

/// JSON schema of [`HostConfig`].
pub fn config_schema() -> schemars::Schema {
    schemars::schema_for!(HostConfig)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_errors_convert_to_config_invalid() {
        let err = parse_toml("ffi = [").unwrap_err();
        let compat = CompatError::from(err);
        assert_eq!(compat.code, ErrorCode::ConfigInvalid);
        assert!(compat.message.contains("parse"));
        assert!(compat.source.is_some());
    }

    #[test]
    fn default_config_is_valid_without_warnings() {
        let warnings = validate_config(&HostConfig::default()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn parse_full_toml() {
        let cfg = parse_toml(
            r#"
            flavor = "plain"
            ffi = false
            install_global = false
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.flavor, Some(HostFlavor::Plain));
        assert!(!cfg.ffi);
        assert!(!cfg.install_global);
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn parse_empty_toml_uses_serde_defaults() {
        let cfg = parse_toml("").unwrap();
        assert!(cfg.ffi);
        assert!(cfg.install_global);
        assert!(cfg.flavor.is_none());
    }

    #[test]
    fn parse_unknown_flavor_is_parse_error() {
        let err = parse_toml(r#"flavor = "deno""#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_log_level_fails_validation() {
        let cfg = HostConfig {
            log_level: Some("verbose".into()),
            ..Default::default()
        };
        match validate_config(&cfg).unwrap_err() {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons[0].contains("verbose"));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn reference_flavor_warns_about_moot_switches() {
        let cfg = HostConfig {
            flavor: Some(HostFlavor::Reference),
            ..Default::default()
        };
        let warnings = validate_config(&cfg).unwrap();
        assert!(warnings.contains(&ConfigWarning::InstallIgnored));
        assert!(warnings.contains(&ConfigWarning::FfiIgnored {
            flavor: HostFlavor::Reference
        }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = HostConfig::default();
        apply_overrides_from(
            &mut cfg,
            lookup(&[
                ("HOSTCOMPAT_FLAVOR", "reference"),
                ("HOSTCOMPAT_FFI", "0"),
                ("HOSTCOMPAT_LOG_LEVEL", "trace"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.flavor, Some(HostFlavor::Reference));
        assert!(!cfg.ffi);
        assert_eq!(cfg.log_level.as_deref(), Some("trace"));
    }

    #[test]
    fn env_override_rejects_bad_bool() {
        let mut cfg = HostConfig::default();
        let err = apply_overrides_from(&mut cfg, lookup(&[("HOSTCOMPAT_FFI", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn identity_respects_ffi_switch() {
        let mut cfg = HostConfig::default();
        assert!(cfg.identity(true).has_ffi_bridge());
        assert!(!cfg.identity(false).has_ffi_bridge());
        cfg.ffi = false;
        assert!(!cfg.identity(true).has_ffi_bridge());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = HostConfig {
            flavor: Some(HostFlavor::Plain),
            log_level: Some("warn".into()),
            ..Default::default()
        };
        let overlay = HostConfig {
            flavor: None,
            ffi: false,
            install_global: true,
            log_level: Some("debug".into()),
        };
        let merged = merge_configs(base, overlay);
        assert_eq!(merged.flavor, Some(HostFlavor::Plain));
        assert!(!merged.ffi);
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "flavor = \"bridged\"").unwrap();
        let cfg = load_config(Some(file.path())).unwrap();
        // The process environment may carry overrides, so only check the file value
        // when no flavor override is present.
        if std::env::var("HOSTCOMPAT_FLAVOR").is_err() {
            assert_eq!(cfg.flavor, Some(HostFlavor::Bridged));
        }
    }

    #[test]
    fn load_missing_file_errors() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn schema_mentions_fields() {
        let schema = serde_json::to_string(&config_schema()).unwrap();
        assert!(schema.contains("install_global"));
        assert!(schema.contains("log_level"));
    }
}
