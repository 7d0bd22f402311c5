// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed values crossing the foreign boundary.

use crate::{FfiError, NativeType, PointerValue};
use libffi::middle::{Arg, arg};
use std::ffi::c_void;
use std::fmt;

/// A value passed to or returned from foreign code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeValue {
    /// Result of a `void` function.
    Void,
    /// `bool`
    Bool(bool),
    /// `u8`
    U8(u8),
    /// `i8`
    I8(i8),
    /// `u16`
    U16(u16),
    /// `i16`
    I16(i16),
    /// `u32`
    U32(u32),
    /// `i32`
    I32(i32),
    /// `u64`
    U64(u64),
    /// `i64`
    I64(i64),
    /// `usize`
    Usize(usize),
    /// `isize`
    Isize(isize),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
    /// `pointer`, `buffer` or `function`.
    Pointer(PointerValue),
}

impl NativeValue {
    /// The tag this value naturally carries. Addresses report `pointer`.
    pub fn native_type(&self) -> NativeType {
        match self {
            Self::Void => NativeType::Void,
            Self::Bool(_) => NativeType::Bool,
            Self::U8(_) => NativeType::U8,
            Self::I8(_) => NativeType::I8,
            Self::U16(_) => NativeType::U16,
            Self::I16(_) => NativeType::I16,
            Self::U32(_) => NativeType::U32,
            Self::I32(_) => NativeType::I32,
            Self::U64(_) => NativeType::U64,
            Self::I64(_) => NativeType::I64,
            Self::Usize(_) => NativeType::Usize,
            Self::Isize(_) => NativeType::Isize,
            Self::F32(_) => NativeType::F32,
            Self::F64(_) => NativeType::F64,
            Self::Pointer(_) => NativeType::Pointer,
        }
    }

    /// Whether this value can be passed where `ty` is declared.
    pub fn fits(&self, ty: NativeType) -> bool {
        if ty.is_pointer_like() {
            return matches!(self, Self::Pointer(_));
        }
        self.native_type() == ty
    }

    /// Parse a textual argument as `ty`.
    ///
    /// Addresses accept decimal or `0x`-prefixed hex.
    pub fn parse(ty: NativeType, input: &str) -> Result<Self, FfiError> {
        let invalid = || FfiError::InvalidValue {
            ty,
            input: input.to_string(),
        };
        let s = input.trim();
        let value = match ty {
            NativeType::Void => return Err(invalid()),
            NativeType::Bool => match s {
                "true" | "1" => Self::Bool(true),
                "false" | "0" => Self::Bool(false),
                _ => return Err(invalid()),
            },
            NativeType::U8 => Self::U8(s.parse().map_err(|_| invalid())?),
            NativeType::I8 => Self::I8(s.parse().map_err(|_| invalid())?),
            NativeType::U16 => Self::U16(s.parse().map_err(|_| invalid())?),
            NativeType::I16 => Self::I16(s.parse().map_err(|_| invalid())?),
            NativeType::U32 => Self::U32(s.parse().map_err(|_| invalid())?),
            NativeType::I32 => Self::I32(s.parse().map_err(|_| invalid())?),
            NativeType::U64 => Self::U64(s.parse().map_err(|_| invalid())?),
            NativeType::I64 => Self::I64(s.parse().map_err(|_| invalid())?),
            NativeType::Usize => Self::Usize(s.parse().map_err(|_| invalid())?),
            NativeType::Isize => Self::Isize(s.parse().map_err(|_| invalid())?),
            NativeType::F32 => Self::F32(s.parse().map_err(|_| invalid())?),
            NativeType::F64 => Self::F64(s.parse().map_err(|_| invalid())?),
            NativeType::Pointer | NativeType::Buffer | NativeType::Function => {
                let address = match s.strip_prefix("0x") {
                    Some(hex) => usize::from_str_radix(hex, 16),
                    None => s.parse(),
                }
                .map_err(|_| invalid())?;
                Self::Pointer(PointerValue::from_address(address))
            }
        };
        Ok(value)
    }

    /// Zero of the given type, used when a callback cannot produce a result.
    pub fn zero(ty: NativeType) -> Self {
        match ty {
            NativeType::Void => Self::Void,
            NativeType::Bool => Self::Bool(false),
            NativeType::U8 => Self::U8(0),
            NativeType::I8 => Self::I8(0),
            NativeType::U16 => Self::U16(0),
            NativeType::I16 => Self::I16(0),
            NativeType::U32 => Self::U32(0),
            NativeType::I32 => Self::I32(0),
            NativeType::U64 => Self::U64(0),
            NativeType::I64 => Self::I64(0),
            NativeType::Usize => Self::Usize(0),
            NativeType::Isize => Self::Isize(0),
            NativeType::F32 => Self::F32(0.0),
            NativeType::F64 => Self::F64(0.0),
            NativeType::Pointer | NativeType::Buffer | NativeType::Function => {
                Self::Pointer(PointerValue::NULL)
            }
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::Usize(v) => write!(f, "{v}"),
            Self::Isize(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Pointer(p) => write!(f, "{p}"),
        }
    }
}

/// Owned storage for one argument. libffi reads arguments by reference, so
/// slots must outlive the call.
pub(crate) enum ArgSlot {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Usize(usize),
    Isize(isize),
    F32(f32),
    F64(f64),
    Ptr(*mut c_void),
}

impl ArgSlot {
    pub(crate) fn new(ty: NativeType, value: &NativeValue) -> Option<Self> {
        let slot = match (ty, value) {
            (NativeType::Bool, NativeValue::Bool(v)) => Self::U8(u8::from(*v)),
            (NativeType::U8, NativeValue::U8(v)) => Self::U8(*v),
            (NativeType::I8, NativeValue::I8(v)) => Self::I8(*v),
            (NativeType::U16, NativeValue::U16(v)) => Self::U16(*v),
            (NativeType::I16, NativeValue::I16(v)) => Self::I16(*v),
            (NativeType::U32, NativeValue::U32(v)) => Self::U32(*v),
            (NativeType::I32, NativeValue::I32(v)) => Self::I32(*v),
            (NativeType::U64, NativeValue::U64(v)) => Self::U64(*v),
            (NativeType::I64, NativeValue::I64(v)) => Self::I64(*v),
            (NativeType::Usize, NativeValue::Usize(v)) => Self::Usize(*v),
            (NativeType::Isize, NativeValue::Isize(v)) => Self::Isize(*v),
            (NativeType::F32, NativeValue::F32(v)) => Self::F32(*v),
            (NativeType::F64, NativeValue::F64(v)) => Self::F64(*v),
            (
                NativeType::Pointer | NativeType::Buffer | NativeType::Function,
                NativeValue::Pointer(p),
            ) => Self::Ptr(p.as_mut_ptr()),
            _ => return None,
        };
        Some(slot)
    }

    pub(crate) fn as_arg(&self) -> Arg {
        match self {
            Self::U8(v) => arg(v),
            Self::I8(v) => arg(v),
            Self::U16(v) => arg(v),
            Self::I16(v) => arg(v),
            Self::U32(v) => arg(v),
            Self::I32(v) => arg(v),
            Self::U64(v) => arg(v),
            Self::I64(v) => arg(v),
            Self::Usize(v) => arg(v),
            Self::Isize(v) => arg(v),
            Self::F32(v) => arg(v),
            Self::F64(v) => arg(v),
            Self::Ptr(v) => arg(v),
        }
    }
}

/// Read one argument that libffi handed to a closure.
///
/// # Safety
///
/// `ptr` must point at a live value of the host type for `ty`.
pub(crate) unsafe fn read_arg(ty: NativeType, ptr: *const c_void) -> NativeValue {
    unsafe {
        match ty {
            NativeType::Void => NativeValue::Void,
            NativeType::Bool => NativeValue::Bool(*(ptr as *const u8) != 0),
            NativeType::U8 => NativeValue::U8(*(ptr as *const u8)),
            NativeType::I8 => NativeValue::I8(*(ptr as *const i8)),
            NativeType::U16 => NativeValue::U16(*(ptr as *const u16)),
            NativeType::I16 => NativeValue::I16(*(ptr as *const i16)),
            NativeType::U32 => NativeValue::U32(*(ptr as *const u32)),
            NativeType::I32 => NativeValue::I32(*(ptr as *const i32)),
            NativeType::U64 => NativeValue::U64(*(ptr as *const u64)),
            NativeType::I64 => NativeValue::I64(*(ptr as *const i64)),
            NativeType::Usize => NativeValue::Usize(*(ptr as *const usize)),
            NativeType::Isize => NativeValue::Isize(*(ptr as *const isize)),
            NativeType::F32 => NativeValue::F32(*(ptr as *const f32)),
            NativeType::F64 => NativeValue::F64(*(ptr as *const f64)),
            NativeType::Pointer | NativeType::Buffer | NativeType::Function => {
                NativeValue::Pointer(PointerValue::from_raw(*(ptr as *const *const c_void)))
            }
        }
    }
}
