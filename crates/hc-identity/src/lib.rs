// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identity of the executing host runtime.
//!
//! The identity is a plain value that is injected into capability selection.
//! Nothing in the surface sniffs the environment on its own.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which kind of host is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HostFlavor {
    /// The reference runtime itself; its native surface is already present.
    Reference,
    /// A host that exposes a native FFI bridge.
    Bridged,
    /// A host without a native FFI bridge.
    Plain,
}

impl HostFlavor {
    /// Every flavor, in declaration order.
    pub const ALL: [HostFlavor; 3] = [Self::Reference, Self::Bridged, Self::Plain];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Bridged => "bridged",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for HostFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown flavor name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFlavor(pub String);

impl fmt::Display for UnknownFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown host flavor '{}' (expected reference, bridged or plain)",
            self.0
        )
    }
}

impl std::error::Error for UnknownFlavor {}

impl FromStr for HostFlavor {
    type Err = UnknownFlavor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HostFlavor::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownFlavor(s.to_string()))
    }
}

/// Resolved identity of the executing host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    /// Host flavor.
    pub flavor: HostFlavor,
    /// Version string of the emulation layer.
    pub version: String,
}

impl HostIdentity {
    /// Identity for an explicit flavor.
    pub fn new(flavor: HostFlavor) -> Self {
        Self {
            flavor,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Identity derived from what this build can provide.
    ///
    /// `ffi_available` is whether the FFI adapter was compiled in. An
    /// explicit `flavor_override` always wins.
    pub fn detect(flavor_override: Option<HostFlavor>, ffi_available: bool) -> Self {
        let flavor = flavor_override.unwrap_or(if ffi_available {
            HostFlavor::Bridged
        } else {
            HostFlavor::Plain
        });
        Self::new(flavor)
    }

    /// `true` when the reference runtime is executing natively.
    pub fn is_reference(&self) -> bool {
        self.flavor == HostFlavor::Reference
    }

    /// `true` when the host exposes a native FFI bridge.
    pub fn has_ffi_bridge(&self) -> bool {
        self.flavor == HostFlavor::Bridged
    }

    /// Flavor name.
    pub fn name(&self) -> &'static str {
        self.flavor.as_str()
    }
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.flavor, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_prefers_override() {
        let id = HostIdentity::detect(Some(HostFlavor::Reference), true);
        assert!(id.is_reference());
        assert!(!id.has_ffi_bridge());
    }

    #[test]
    fn detect_follows_ffi_availability() {
        assert_eq!(HostIdentity::detect(None, true).flavor, HostFlavor::Bridged);
        assert_eq!(HostIdentity::detect(None, false).flavor, HostFlavor::Plain);
    }

    #[test]
    fn flavor_parse_is_case_insensitive() {
        assert_eq!("Bridged".parse::<HostFlavor>(), Ok(HostFlavor::Bridged));
        assert_eq!(" plain ".parse::<HostFlavor>(), Ok(HostFlavor::Plain));
        let err = "deno".parse::<HostFlavor>().unwrap_err();
        assert!(err.to_string().contains("deno"));
    }

    #[test]
    fn flavor_serde_matches_display() {
        for flavor in HostFlavor::ALL {
            let json = serde_json::to_string(&flavor).unwrap();
            assert_eq!(json, format!("\"{flavor}\""));
        }
    }

    #[test]
    fn identity_display() {
        let id = HostIdentity::new(HostFlavor::Plain);
        assert_eq!(id.to_string(), format!("plain/{}", env!("CARGO_PKG_VERSION")));
        assert_eq!(id.name(), "plain");
    }
}
