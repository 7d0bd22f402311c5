// SPDX-License-Identifier: MIT OR Apache-2.0
//! hc-ffi
//!
//! Foreign-function type adapter. Portable type tags ([`NativeType`]) are
//! translated into the host binding's vocabulary ([`HostType`], backed by
//! libffi); libraries are opened with libloading; callbacks are libffi
//! closures that dispatch into a Rust handler.
//!
//! Everything that dereferences a foreign address is an `unsafe fn`. The
//! caller vouches that declared signatures match the native code and that
//! pointers are live.
#![warn(missing_docs)]

mod callback;
mod library;
pub mod pointer;
mod symbols;
mod types;
mod value;
mod view;

pub use callback::{CallbackHandler, UnsafeCallback};
pub use library::{DynamicLibrary, ForeignSymbol, UnsafeFnPointer, dlopen};
pub use pointer::{PointerAddress, PointerValue};
pub use symbols::{ForeignFunction, SymbolDefinition, SymbolMap, parse_symbols};
pub use types::{HostSignature, HostType, NativeType, transform_type};
pub use value::NativeValue;
pub use view::UnsafePointerView;

use hc_error::{CompatError, ErrorCode};
use thiserror::Error;

/// Errors from type translation, library loading and foreign calls.
#[derive(Debug, Error)]
pub enum FfiError {
    /// A type tag outside the supported enumeration.
    #[error("type not supported: {tag}")]
    UnsupportedType {
        /// The offending tag.
        tag: String,
    },

    /// A symbol used the non-portable `{ "type": ... }` shorthand.
    #[error("symbol '{symbol}': native type notation is unsupported, use {{ parameters, result }}")]
    NativeNotation {
        /// Symbol name.
        symbol: String,
    },

    /// A declared signature cannot be bound.
    #[error("symbol '{symbol}': {reason}")]
    InvalidSignature {
        /// Symbol name.
        symbol: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The symbol map was not valid JSON of the expected shape.
    #[error("invalid symbol definitions: {0}")]
    InvalidSymbols(#[source] serde_json::Error),

    /// The dynamic library could not be opened.
    #[error("failed to open library '{path}': {source}")]
    Open {
        /// Path passed to `dlopen`.
        path: String,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },

    /// A declared symbol is not exported by the library.
    #[error("failed to resolve symbol '{symbol}': {source}")]
    MissingSymbol {
        /// Symbol name.
        symbol: String,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },

    /// No symbol with this name was declared.
    #[error("unknown symbol '{symbol}'")]
    UnknownSymbol {
        /// Symbol name.
        symbol: String,
    },

    /// Wrong number of arguments for a call.
    #[error("symbol '{symbol}' takes {expected} argument(s), got {found}")]
    ArityMismatch {
        /// Symbol name.
        symbol: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },

    /// An argument's type does not match the declaration.
    #[error("symbol '{symbol}' argument {index}: expected {expected}, got {found}")]
    TypeMismatch {
        /// Symbol name.
        symbol: String,
        /// Zero-based argument index.
        index: usize,
        /// Declared type.
        expected: NativeType,
        /// Supplied type.
        found: NativeType,
    },

    /// A value cannot be represented as a native address.
    #[error("invalid pointer address: {address}")]
    InvalidAddress {
        /// The rejected input, as text.
        address: String,
    },

    /// A text value could not be parsed as the requested type.
    #[error("cannot parse '{input}' as {ty}")]
    InvalidValue {
        /// Requested type.
        ty: NativeType,
        /// The rejected input.
        input: String,
    },

    /// A read through the null pointer.
    #[error("null pointer dereference")]
    NullPointer,
}

impl FfiError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedType { .. } => ErrorCode::ConfigUnsupportedType,
            Self::NativeNotation { .. } => ErrorCode::ConfigNativeNotation,
            Self::InvalidSignature { .. }
            | Self::InvalidSymbols(_)
            | Self::InvalidAddress { .. }
            | Self::InvalidValue { .. }
            | Self::NullPointer => ErrorCode::ConfigInvalid,
            Self::Open { .. } | Self::MissingSymbol { .. } | Self::UnknownSymbol { .. } => {
                ErrorCode::FfiLibraryOpen
            }
            Self::ArityMismatch { .. } | Self::TypeMismatch { .. } => {
                ErrorCode::FfiSignatureMismatch
            }
        }
    }
}

impl From<FfiError> for CompatError {
    fn from(err: FfiError) -> Self {
        CompatError::new(err.code(), err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_errors_name_the_tag() {
        let err = transform_type("u128").unwrap_err();
        let compat = CompatError::from(err);
        assert_eq!(compat.code, ErrorCode::ConfigUnsupportedType);
        assert!(compat.message.contains("u128"));
    }
}
