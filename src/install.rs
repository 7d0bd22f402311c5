// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-wide installation of a [`CapabilitySet`].
//!
//! The slot is written at most once. A host that already provides the
//! reference surface natively is never touched.

use crate::{CapabilitySet, HostIdentity, init};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Conventional name of the surface being emulated.
pub const SURFACE_NAME: &str = "Deno";

static INSTALLED: OnceLock<CapabilitySet> = OnceLock::new();

/// What [`install`] or [`install_for`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    /// The set was bound into the empty slot.
    Installed,
    /// The slot was already bound. The earlier set stays.
    AlreadyBound,
    /// The reference runtime is executing. Nothing was built or bound.
    NativePresent,
}

/// Bind `set` into the process-wide slot if it is empty.
pub fn install(set: CapabilitySet) -> InstallOutcome {
    let variant = set.variant();
    match INSTALLED.set(set) {
        Ok(()) => {
            info!(target: "hostcompat", surface = SURFACE_NAME, %variant, "surface installed");
            InstallOutcome::Installed
        }
        Err(_) => {
            debug!(
                target: "hostcompat",
                surface = SURFACE_NAME,
                "surface already bound, left untouched"
            );
            InstallOutcome::AlreadyBound
        }
    }
}

/// [`init`] then [`install`], skipping both on the reference flavor.
pub fn install_for(identity: &HostIdentity) -> InstallOutcome {
    match init(identity) {
        Some(set) => install(set),
        None => InstallOutcome::NativePresent,
    }
}

/// The installed set, if any.
pub fn installed() -> Option<&'static CapabilitySet> {
    INSTALLED.get()
}
