// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reading memory behind a native address.

use crate::{FfiError, PointerValue};
use std::ffi::{CStr, c_char};

/// Read-only view over memory at a native address.
///
/// Every read is `unsafe`: the caller guarantees the bytes at
/// `pointer + offset` are live and hold what is being read. Only the null
/// address is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsafePointerView {
    pointer: PointerValue,
}

macro_rules! getters {
    ($($name:ident => $t:ty),* $(,)?) => {
        $(
            #[doc = concat!("Read a `", stringify!($t), "` at `offset` bytes, unaligned.")]
            ///
            /// # Safety
            ///
            /// See the type-level contract.
            pub unsafe fn $name(&self, offset: usize) -> Result<$t, FfiError> {
                let at = self.at(offset)?;
                Ok(unsafe { std::ptr::read_unaligned(at as *const $t) })
            }
        )*
    };
}

impl UnsafePointerView {
    /// View memory starting at `pointer`.
    pub fn new(pointer: PointerValue) -> Self {
        Self { pointer }
    }

    /// The viewed address.
    pub fn pointer(&self) -> PointerValue {
        self.pointer
    }

    fn at(&self, offset: usize) -> Result<*const u8, FfiError> {
        if self.pointer.is_null() {
            return Err(FfiError::NullPointer);
        }
        Ok(self.pointer.address().wrapping_add(offset) as *const u8)
    }

    /// Read the NUL-terminated string at `pointer + offset`.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD.
    ///
    /// # Safety
    ///
    /// A NUL byte must occur before the end of the readable region.
    pub unsafe fn get_cstring_at(pointer: PointerValue, offset: usize) -> Result<String, FfiError> {
        let at = Self::new(pointer).at(offset)?;
        let s = unsafe { CStr::from_ptr(at as *const c_char) };
        Ok(s.to_string_lossy().into_owned())
    }

    /// Instance form of [`get_cstring_at`](Self::get_cstring_at).
    ///
    /// # Safety
    ///
    /// As for [`get_cstring_at`](Self::get_cstring_at).
    pub unsafe fn get_cstring(&self, offset: usize) -> Result<String, FfiError> {
        unsafe { Self::get_cstring_at(self.pointer, offset) }
    }

    /// Read one byte as a `bool`.
    ///
    /// # Safety
    ///
    /// See the type-level contract.
    pub unsafe fn get_bool(&self, offset: usize) -> Result<bool, FfiError> {
        Ok(unsafe { self.get_u8(offset) }? != 0)
    }

    getters! {
        get_u8 => u8,
        get_i8 => i8,
        get_u16 => u16,
        get_i16 => i16,
        get_u32 => u32,
        get_i32 => i32,
        get_u64 => u64,
        get_i64 => i64,
        get_f32 => f32,
        get_f64 => f64,
    }

    /// Read a stored address.
    ///
    /// # Safety
    ///
    /// See the type-level contract.
    pub unsafe fn get_pointer(&self, offset: usize) -> Result<PointerValue, FfiError> {
        let at = self.at(offset)?;
        Ok(PointerValue::from_address(unsafe {
            std::ptr::read_unaligned(at as *const usize)
        }))
    }

    /// Copy `dest.len()` bytes starting at `offset` into `dest`.
    ///
    /// # Safety
    ///
    /// The whole source range must be readable and must not overlap `dest`.
    pub unsafe fn copy_into(&self, dest: &mut [u8], offset: usize) -> Result<(), FfiError> {
        let at = self.at(offset)?;
        unsafe { std::ptr::copy_nonoverlapping(at, dest.as_mut_ptr(), dest.len()) };
        Ok(())
    }
}
