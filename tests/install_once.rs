// SPDX-License-Identifier: MIT OR Apache-2.0
//! The process-wide slot is bound at most once. Kept in its own test binary
//! so no other test touches the slot.

use hostcompat::{
    HostFlavor, HostIdentity, HostVariant, InstallOutcome, init, install, install_for, installed,
};

#[test]
fn slot_is_written_once_and_never_clobbered() {
    // The reference flavor never builds or binds anything.
    assert_eq!(
        install_for(&HostIdentity::new(HostFlavor::Reference)),
        InstallOutcome::NativePresent
    );
    assert!(installed().is_none());

    let first = init(&HostIdentity::new(HostFlavor::Plain)).unwrap();
    assert_eq!(install(first), InstallOutcome::Installed);

    let second = init(&HostIdentity::new(HostFlavor::Bridged)).unwrap();
    assert_eq!(install(second), InstallOutcome::AlreadyBound);
    assert_eq!(
        install_for(&HostIdentity::new(HostFlavor::Bridged)),
        InstallOutcome::AlreadyBound
    );

    let bound = installed().expect("slot is bound");
    assert_eq!(bound.identity().flavor, HostFlavor::Plain);
    assert_eq!(bound.variant(), HostVariant::Standard);
    assert!(!bound.has_foreign());
}
