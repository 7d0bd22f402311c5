// SPDX-License-Identifier: MIT OR Apache-2.0
//! Environment variable accessors.

use crate::SysError;
use std::collections::BTreeMap;

fn check_key(key: &str) -> Result<(), SysError> {
    if key.is_empty() || key.contains(['=', '\0']) {
        return Err(SysError::InvalidEnvKey(key.to_string()));
    }
    Ok(())
}

/// Value of `key`, or `None` when unset or not valid Unicode.
pub fn env_get(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Set `key` for this process and children spawned afterwards.
///
/// # Safety
///
/// No other thread may read or write the environment concurrently, which
/// includes libc calls such as `getenv` made by foreign code.
pub unsafe fn env_set(key: &str, value: &str) -> Result<(), SysError> {
    check_key(key)?;
    if value.contains('\0') {
        return Err(SysError::InvalidEnvKey(key.to_string()));
    }
    unsafe { std::env::set_var(key, value) };
    Ok(())
}

/// Remove `key` from the environment.
///
/// # Safety
///
/// Same contract as [`env_set`].
pub unsafe fn env_delete(key: &str) -> Result<(), SysError> {
    check_key(key)?;
    unsafe { std::env::remove_var(key) };
    Ok(())
}

/// Snapshot of the whole environment. Non-Unicode entries are converted lossily.
pub fn env_to_map() -> BTreeMap<String, String> {
    std::env::vars_os()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_keys_the_host_would_panic_on() {
        for bad in ["", "A=B", "NUL\0"] {
            assert!(matches!(
                unsafe { env_set(bad, "x") },
                Err(SysError::InvalidEnvKey(_))
            ));
        }
    }

    #[test]
    fn set_get_delete_roundtrip() {
        let key = "HC_SYS_ENV_ROUNDTRIP_TEST";
        unsafe { env_set(key, "value") }.unwrap();
        assert_eq!(env_get(key).as_deref(), Some("value"));
        assert_eq!(env_to_map().get(key).map(String::as_str), Some("value"));
        unsafe { env_delete(key) }.unwrap();
        assert_eq!(env_get(key), None);
    }
}
