// SPDX-License-Identifier: MIT OR Apache-2.0
//! Opaque native addresses and the helpers that create and compare them.

use crate::FfiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// An opaque native address. Never dereferenced by this type.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerValue(usize);

impl PointerValue {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Wrap a raw address.
    pub fn from_address(address: usize) -> Self {
        Self(address)
    }

    /// Address of `ptr`.
    pub fn from_raw<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }

    /// The raw address.
    pub fn address(self) -> usize {
        self.0
    }

    /// `true` for the null address.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address as a const raw pointer.
    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    /// The address as a mutable raw pointer.
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}

impl fmt::Debug for PointerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointerValue({:#x})", self.0)
    }
}

impl fmt::Display for PointerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Numeric input accepted by [`create`]: a plain number or a wide integer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAddress {
    /// A double. Must be a non-negative integer no larger than 2^53 - 1.
    Number(f64),
    /// An arbitrary-width integer. Must fit the platform's address width.
    Wide(i128),
}

impl From<f64> for PointerAddress {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

macro_rules! wide_from {
    ($($t:ty),*) => {
        $(impl From<$t> for PointerAddress {
            fn from(value: $t) -> Self {
                Self::Wide(value as i128)
            }
        })*
    };
}

wide_from!(u32, u64, usize, i32, i64, isize, i128);

/// Address of the first byte of `buffer`.
pub fn of(buffer: &[u8]) -> PointerValue {
    PointerValue::from_raw(buffer.as_ptr())
}

/// Pointer from a numeric address.
pub fn create(address: impl Into<PointerAddress>) -> Result<PointerValue, FfiError> {
    match address.into() {
        PointerAddress::Wide(v) => usize::try_from(v)
            .map(PointerValue)
            .map_err(|_| FfiError::InvalidAddress {
                address: v.to_string(),
            }),
        PointerAddress::Number(f) => {
            if !f.is_finite() || f < 0.0 || f.fract() != 0.0 || f > MAX_SAFE_INTEGER {
                return Err(FfiError::InvalidAddress {
                    address: f.to_string(),
                });
            }
            usize::try_from(f as u64)
                .map(PointerValue)
                .map_err(|_| FfiError::InvalidAddress {
                    address: f.to_string(),
                })
        }
    }
}

/// Address equality.
pub fn equals(a: PointerValue, b: PointerValue) -> bool {
    a == b
}

/// The numeric address.
pub fn value(pointer: PointerValue) -> u64 {
    pointer.0 as u64
}

/// `pointer` moved by `by` bytes, wrapping on overflow.
pub fn offset(pointer: PointerValue, by: isize) -> PointerValue {
    PointerValue(pointer.0.wrapping_add_signed(by))
}
