// SPDX-License-Identifier: MIT OR Apache-2.0
//! Config-driven bootstrap.

use hostcompat::config::{HostConfig, parse_toml};
use hostcompat::{HostFlavor, InstallOutcome, bootstrap, installed};

#[test]
fn reference_config_builds_nothing() {
    let config = parse_toml("flavor = \"reference\"").unwrap();
    let boot = bootstrap(&config);
    assert!(boot.identity.is_reference());
    assert!(boot.capabilities.is_none());
    assert_eq!(boot.install, Some(InstallOutcome::NativePresent));
    assert!(installed().is_none());
}

#[test]
fn install_global_false_leaves_the_slot_alone() {
    let config = HostConfig {
        flavor: Some(HostFlavor::Plain),
        install_global: false,
        ..HostConfig::default()
    };
    let boot = bootstrap(&config);
    assert!(boot.capabilities.is_some());
    assert_eq!(boot.install, None);
    assert!(installed().is_none());
}

#[test]
fn ffi_disabled_in_config_means_no_foreign_surface() {
    let config = HostConfig {
        ffi: false,
        install_global: false,
        ..HostConfig::default()
    };
    let boot = bootstrap(&config);
    assert_eq!(boot.identity.flavor, HostFlavor::Plain);
    assert!(!boot.capabilities.unwrap().has_foreign());
}
