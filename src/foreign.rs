// SPDX-License-Identifier: MIT OR Apache-2.0
//! FFI extension surface.

use hc_ffi::{
    CallbackHandler, DynamicLibrary, FfiError, ForeignFunction, PointerValue, SymbolMap,
    UnsafeCallback, UnsafeFnPointer,
};
use std::fmt;
use std::path::Path;

/// Opening native libraries and exposing Rust handlers to native code.
///
/// Only present on hosts with an FFI bridge. Pointer helpers are free
/// functions in [`hc_ffi::pointer`].
pub trait ForeignApi: Send + Sync + fmt::Debug {
    /// Open `path` and bind `symbols`. Native-notation entries are rejected
    /// before the library is loaded.
    fn dlopen(&self, path: &Path, symbols: &SymbolMap) -> Result<DynamicLibrary, FfiError>;

    /// Wrap `handler` as a native function pointer.
    fn callback(
        &self,
        definition: ForeignFunction,
        handler: CallbackHandler,
    ) -> Result<UnsafeCallback, FfiError>;

    /// Bind a runtime function pointer to a signature.
    fn fn_pointer(
        &self,
        pointer: PointerValue,
        definition: ForeignFunction,
    ) -> Result<UnsafeFnPointer, FfiError>;
}

/// [`ForeignApi`] over libloading and libffi.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostForeign;

impl ForeignApi for HostForeign {
    fn dlopen(&self, path: &Path, symbols: &SymbolMap) -> Result<DynamicLibrary, FfiError> {
        hc_ffi::dlopen(path, symbols)
    }

    fn callback(
        &self,
        definition: ForeignFunction,
        handler: CallbackHandler,
    ) -> Result<UnsafeCallback, FfiError> {
        UnsafeCallback::from_boxed(definition, handler)
    }

    fn fn_pointer(
        &self,
        pointer: PointerValue,
        definition: ForeignFunction,
    ) -> Result<UnsafeFnPointer, FfiError> {
        UnsafeFnPointer::new(pointer, definition)
    }
}
