// SPDX-License-Identifier: MIT OR Apache-2.0
//! hostcompat
//!
//! Composes the base system surface ([`SystemApi`]) with the optional FFI
//! extension ([`ForeignApi`]) into a [`CapabilitySet`] chosen by the host's
//! identity. [`init`] returns the set for the application to thread
//! through; [`install`] additionally binds it into a process-wide slot,
//! at most once.
//!
//! ```no_run
//! # use hostcompat::{HostIdentity, HostFlavor, init};
//! let identity = HostIdentity::new(HostFlavor::Plain);
//! let caps = init(&identity).expect("plain hosts get a capability set");
//! assert!(!caps.has_foreign());
//! ```

pub mod install;
mod system;

#[cfg(feature = "ffi")]
mod foreign;

pub use hc_config as config;
pub use hc_error::{CompatError, CompatErrorDto, ErrorCategory, ErrorCode};
pub use hc_identity::{HostFlavor, HostIdentity};
pub use hc_process as process;
pub use hc_process::{Command, CommandOptions, CommandOutput, ExitStatus, SpawnedProcess, StdioMode};
pub use hc_sys as sys;
pub use install::{InstallOutcome, SURFACE_NAME, install, install_for, installed};
pub use system::{HostSystem, SystemApi};

/// The FFI adapter, re-exported. Pointer helpers live in [`ffi::pointer`].
#[cfg(feature = "ffi")]
pub use hc_ffi as ffi;
#[cfg(feature = "ffi")]
pub use foreign::{ForeignApi, HostForeign};

use hc_config::HostConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Whether this build includes the FFI adapter.
pub const FFI_COMPILED: bool = cfg!(feature = "ffi");

/// Which capability set a host receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostVariant {
    /// The reference runtime itself. Its native surface is used as is.
    Reference,
    /// Base surface only.
    Standard,
    /// Base surface plus FFI.
    Extended,
}

impl HostVariant {
    /// Select the variant for `identity`.
    ///
    /// `Extended` requires both a host FFI bridge and a build with the
    /// `ffi` feature; otherwise the FFI part is absent, never stubbed.
    pub fn select(identity: &HostIdentity) -> Self {
        if identity.is_reference() {
            Self::Reference
        } else if identity.has_ffi_bridge() && FFI_COMPILED {
            Self::Extended
        } else {
            Self::Standard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Standard => "standard",
            Self::Extended => "extended",
        }
    }
}

impl fmt::Display for HostVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The composed adapter surface.
///
/// Cheap to clone; every clone shares the same adapters.
#[derive(Clone)]
pub struct CapabilitySet {
    identity: HostIdentity,
    variant: HostVariant,
    system: Arc<dyn SystemApi>,
    #[cfg(feature = "ffi")]
    foreign: Option<Arc<dyn ForeignApi>>,
}

impl CapabilitySet {
    fn build(identity: &HostIdentity, variant: HostVariant) -> Self {
        Self {
            identity: identity.clone(),
            variant,
            system: Arc::new(HostSystem),
            #[cfg(feature = "ffi")]
            foreign: (variant == HostVariant::Extended)
                .then(|| Arc::new(HostForeign) as Arc<dyn ForeignApi>),
        }
    }

    /// Identity the set was built for.
    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    pub fn variant(&self) -> HostVariant {
        self.variant
    }

    /// Base surface: fs, env, process info, commands.
    pub fn system(&self) -> &dyn SystemApi {
        self.system.as_ref()
    }

    /// FFI surface, present only for [`HostVariant::Extended`].
    #[cfg(feature = "ffi")]
    pub fn foreign(&self) -> Option<&dyn ForeignApi> {
        self.foreign.as_deref()
    }

    /// FFI surface, or a `CAPABILITY_ABSENT` error.
    #[cfg(feature = "ffi")]
    pub fn require_foreign(&self) -> Result<&dyn ForeignApi, CompatError> {
        self.foreign().ok_or_else(|| {
            CompatError::new(ErrorCode::CapabilityAbsent, "this host has no FFI bridge")
                .with_context("identity", self.identity.to_string())
        })
    }

    pub fn has_foreign(&self) -> bool {
        #[cfg(feature = "ffi")]
        {
            self.foreign.is_some()
        }
        #[cfg(not(feature = "ffi"))]
        {
            false
        }
    }

    /// Shorthand for `system().command(..)`.
    pub fn command(&self, program: &str, options: CommandOptions) -> Command {
        self.system.command(program, options)
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("identity", &self.identity)
            .field("variant", &self.variant)
            .field("foreign", &self.has_foreign())
            .finish()
    }
}

/// Build the capability set for `identity`.
///
/// Returns `None` for the reference flavor, whose native surface needs no
/// emulation.
pub fn init(identity: &HostIdentity) -> Option<CapabilitySet> {
    let variant = HostVariant::select(identity);
    if variant == HostVariant::Reference {
        debug!(target: "hostcompat", %identity, "reference host, nothing to build");
        return None;
    }
    let set = CapabilitySet::build(identity, variant);
    debug!(
        target: "hostcompat",
        %identity,
        %variant,
        foreign = set.has_foreign(),
        "capability set built"
    );
    Some(set)
}

/// Result of [`bootstrap`].
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub identity: HostIdentity,
    /// `None` on the reference flavor.
    pub capabilities: Option<CapabilitySet>,
    /// `None` when the config disables global installation.
    pub install: Option<InstallOutcome>,
}

/// Resolve identity from `config`, build the set and install it when the
/// config asks for it.
pub fn bootstrap(config: &HostConfig) -> Bootstrap {
    let identity = config.identity(FFI_COMPILED);
    let capabilities = init(&identity);
    let install = config.install_global.then(|| match &capabilities {
        Some(set) => install(set.clone()),
        None => InstallOutcome::NativePresent,
    });
    Bootstrap {
        identity,
        capabilities,
        install,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_selection() {
        assert_eq!(
            HostVariant::select(&HostIdentity::new(HostFlavor::Reference)),
            HostVariant::Reference
        );
        assert_eq!(
            HostVariant::select(&HostIdentity::new(HostFlavor::Plain)),
            HostVariant::Standard
        );
        let bridged = HostVariant::select(&HostIdentity::new(HostFlavor::Bridged));
        if FFI_COMPILED {
            assert_eq!(bridged, HostVariant::Extended);
        } else {
            assert_eq!(bridged, HostVariant::Standard);
        }
    }

    #[test]
    fn reference_builds_nothing() {
        assert!(init(&HostIdentity::new(HostFlavor::Reference)).is_none());
    }

    #[test]
    fn plain_has_no_foreign_surface() {
        let set = init(&HostIdentity::new(HostFlavor::Plain)).unwrap();
        assert_eq!(set.variant(), HostVariant::Standard);
        assert!(!set.has_foreign());
        #[cfg(feature = "ffi")]
        {
            assert!(set.foreign().is_none());
            let err = set.require_foreign().unwrap_err();
            assert_eq!(err.code, ErrorCode::CapabilityAbsent);
        }
    }

    #[cfg(feature = "ffi")]
    #[test]
    fn bridged_gets_foreign_surface() {
        let set = init(&HostIdentity::new(HostFlavor::Bridged)).unwrap();
        assert_eq!(set.variant(), HostVariant::Extended);
        assert!(set.foreign().is_some());
    }

    #[test]
    fn variant_serde_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&HostVariant::Extended).unwrap(),
            "\"extended\""
        );
    }
}
