// SPDX-License-Identifier: MIT OR Apache-2.0
//! Portable type tags and their translation into the host binding.

use crate::FfiError;
use libffi::middle::{Cif, Type};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portable type tag for one foreign parameter or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum NativeType {
    /// No value (results only).
    Void,
    /// C `bool`, passed as one byte.
    Bool,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 64-bit integer.
    I64,
    /// Pointer-width unsigned integer.
    Usize,
    /// Pointer-width signed integer.
    Isize,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// Opaque address.
    Pointer,
    /// Address of a byte buffer.
    Buffer,
    /// Address of a callable, typically an [`UnsafeCallback`](crate::UnsafeCallback).
    Function,
}

impl NativeType {
    /// Every tag, in declaration order.
    pub const ALL: [NativeType; 17] = [
        Self::Void,
        Self::Bool,
        Self::U8,
        Self::I8,
        Self::U16,
        Self::I16,
        Self::U32,
        Self::I32,
        Self::U64,
        Self::I64,
        Self::Usize,
        Self::Isize,
        Self::F32,
        Self::F64,
        Self::Pointer,
        Self::Buffer,
        Self::Function,
    ];

    /// The tag as written in symbol definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::Usize => "usize",
            Self::Isize => "isize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Pointer => "pointer",
            Self::Buffer => "buffer",
            Self::Function => "function",
        }
    }

    /// `true` for tags carried as an address.
    pub fn is_pointer_like(&self) -> bool {
        matches!(self, Self::Pointer | Self::Buffer | Self::Function)
    }

    /// Host binding type for this tag.
    pub fn host_type(self) -> HostType {
        match self {
            Self::Void => HostType::Void,
            Self::Bool | Self::U8 => HostType::U8,
            Self::I8 => HostType::I8,
            Self::U16 => HostType::U16,
            Self::I16 => HostType::I16,
            Self::U32 => HostType::U32,
            Self::I32 => HostType::I32,
            Self::U64 => HostType::U64,
            Self::I64 => HostType::I64,
            #[cfg(target_pointer_width = "64")]
            Self::Usize => HostType::U64,
            #[cfg(target_pointer_width = "64")]
            Self::Isize => HostType::I64,
            #[cfg(target_pointer_width = "32")]
            Self::Usize => HostType::U32,
            #[cfg(target_pointer_width = "32")]
            Self::Isize => HostType::I32,
            Self::F32 => HostType::F32,
            Self::F64 => HostType::F64,
            Self::Pointer | Self::Buffer | Self::Function => HostType::Pointer,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NativeType {
    type Err = FfiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NativeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FfiError::UnsupportedType { tag: s.to_string() })
    }
}

impl TryFrom<String> for NativeType {
    type Error = FfiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Type vocabulary of the host FFI binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    /// `ffi_type_void`
    Void,
    /// `ffi_type_uint8`
    U8,
    /// `ffi_type_sint8`
    I8,
    /// `ffi_type_uint16`
    U16,
    /// `ffi_type_sint16`
    I16,
    /// `ffi_type_uint32`
    U32,
    /// `ffi_type_sint32`
    I32,
    /// `ffi_type_uint64`
    U64,
    /// `ffi_type_sint64`
    I64,
    /// `ffi_type_float`
    F32,
    /// `ffi_type_double`
    F64,
    /// `ffi_type_pointer`
    Pointer,
}

impl HostType {
    /// The libffi type descriptor.
    pub fn to_ffi(self) -> Type {
        match self {
            Self::Void => Type::void(),
            Self::U8 => Type::u8(),
            Self::I8 => Type::i8(),
            Self::U16 => Type::u16(),
            Self::I16 => Type::i16(),
            Self::U32 => Type::u32(),
            Self::I32 => Type::i32(),
            Self::U64 => Type::u64(),
            Self::I64 => Type::i64(),
            Self::F32 => Type::f32(),
            Self::F64 => Type::f64(),
            Self::Pointer => Type::pointer(),
        }
    }
}

/// Translate a portable tag into the host binding's type.
///
/// Total over [`NativeType::ALL`]; any other tag fails naming the tag.
pub fn transform_type(tag: &str) -> Result<HostType, FfiError> {
    Ok(tag.parse::<NativeType>()?.host_type())
}

/// A fully translated signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSignature {
    /// Parameter types, in order.
    pub parameters: Vec<HostType>,
    /// Result type.
    pub result: HostType,
}

impl HostSignature {
    /// Prepare a libffi call interface for this signature.
    pub fn cif(&self) -> Cif {
        Cif::new(
            self.parameters.iter().map(|t| t.to_ffi()),
            self.result.to_ffi(),
        )
    }
}
