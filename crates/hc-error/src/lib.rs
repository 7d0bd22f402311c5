// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy with stable codes for the hostcompat surface.
//!
//! Every adapter error maps onto an [`ErrorCode`], a machine-readable tag
//! that never changes across patch releases. [`CompatError`] bundles a code
//! with a message, an optional cause and key-value context for callers that
//! want one error type across the whole surface.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The subprocess could not be launched.
    Launch,
    /// A pending read, write or wait on a host stream failed.
    Io,
    /// The caller supplied a bad type tag, symbol form or option value.
    Config,
    /// The host lacks a capability, or a native binding could not be built.
    Capability,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Launch => "launch",
            Self::Io => "io",
            Self::Config => "config",
            Self::Capability => "capability",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Launch --
    /// Executable does not exist on the search path.
    LaunchNotFound,
    /// Executable exists but may not be executed.
    LaunchPermissionDenied,
    /// Any other synchronous launch failure.
    LaunchFailed,

    // -- Io --
    /// A write was issued after the stream was closed.
    IoWriteAfterClose,
    /// The reading end of a pipe went away.
    IoBrokenPipe,
    /// Any other host read/write/wait failure.
    IoFailed,

    // -- Config --
    /// FFI type tag outside the supported enumeration.
    ConfigUnsupportedType,
    /// Symbol declared with the non-portable `type` shorthand.
    ConfigNativeNotation,
    /// Seek origin outside start/current/end.
    ConfigInvalidSeekMode,
    /// Configuration file or value is invalid.
    ConfigInvalid,

    // -- Capability --
    /// The executing host does not provide this capability.
    CapabilityAbsent,
    /// A dynamic library or one of its symbols could not be loaded.
    FfiLibraryOpen,
    /// A foreign call did not match its declared signature.
    FfiSignatureMismatch,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LaunchNotFound | Self::LaunchPermissionDenied | Self::LaunchFailed => {
                ErrorCategory::Launch
            }

            Self::IoWriteAfterClose | Self::IoBrokenPipe | Self::IoFailed => ErrorCategory::Io,

            Self::ConfigUnsupportedType
            | Self::ConfigNativeNotation
            | Self::ConfigInvalidSeekMode
            | Self::ConfigInvalid => ErrorCategory::Config,

            Self::CapabilityAbsent | Self::FfiLibraryOpen | Self::FfiSignatureMismatch => {
                ErrorCategory::Capability
            }

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation (e.g. `"LAUNCH_NOT_FOUND"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LaunchNotFound => "LAUNCH_NOT_FOUND",
            Self::LaunchPermissionDenied => "LAUNCH_PERMISSION_DENIED",
            Self::LaunchFailed => "LAUNCH_FAILED",
            Self::IoWriteAfterClose => "IO_WRITE_AFTER_CLOSE",
            Self::IoBrokenPipe => "IO_BROKEN_PIPE",
            Self::IoFailed => "IO_FAILED",
            Self::ConfigUnsupportedType => "CONFIG_UNSUPPORTED_TYPE",
            Self::ConfigNativeNotation => "CONFIG_NATIVE_NOTATION",
            Self::ConfigInvalidSeekMode => "CONFIG_INVALID_SEEK_MODE",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::CapabilityAbsent => "CAPABILITY_ABSENT",
            Self::FfiLibraryOpen => "FFI_LIBRARY_OPEN",
            Self::FfiSignatureMismatch => "FFI_SIGNATURE_MISMATCH",
            Self::Internal => "INTERNAL",
        }
    }

    /// Classify a launch failure by the host's io error kind.
    pub fn for_launch(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::NotFound => Self::LaunchNotFound,
            std::io::ErrorKind::PermissionDenied => Self::LaunchPermissionDenied,
            _ => Self::LaunchFailed,
        }
    }

    /// Classify a stream failure by the host's io error kind.
    pub fn for_io(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::BrokenPipe => Self::IoBrokenPipe,
            _ => Self::IoFailed,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CompatError
// ---------------------------------------------------------------------------

/// Unified hostcompat error.
///
/// # Builder usage
///
/// ```
/// use hc_error::{CompatError, ErrorCode};
///
/// let err = CompatError::new(ErrorCode::LaunchNotFound, "no such program")
///     .with_context("program", "definitely-missing")
///     .with_context("args", 0);
/// assert_eq!(err.code, ErrorCode::LaunchNotFound);
/// ```
pub struct CompatError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause, passed through unchanged.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl CompatError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// Values that fail to serialise are skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for CompatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("CompatError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for CompatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of a [`CompatError`] without the opaque source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompatErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String form of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&CompatError> for CompatErrorDto {
    fn from(err: &CompatError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::LaunchNotFound,
        ErrorCode::LaunchPermissionDenied,
        ErrorCode::LaunchFailed,
        ErrorCode::IoWriteAfterClose,
        ErrorCode::IoBrokenPipe,
        ErrorCode::IoFailed,
        ErrorCode::ConfigUnsupportedType,
        ErrorCode::ConfigNativeNotation,
        ErrorCode::ConfigInvalidSeekMode,
        ErrorCode::ConfigInvalid,
        ErrorCode::CapabilityAbsent,
        ErrorCode::FfiLibraryOpen,
        ErrorCode::FfiSignatureMismatch,
        ErrorCode::Internal,
    ];

    #[test]
    fn display_without_context() {
        let err = CompatError::new(ErrorCode::LaunchNotFound, "no such program");
        assert_eq!(err.to_string(), "[LAUNCH_NOT_FOUND] no such program");
    }

    #[test]
    fn display_with_context_is_deterministic() {
        let err = CompatError::new(ErrorCode::ConfigUnsupportedType, "bad tag")
            .with_context("tag", "u128")
            .with_context("index", 2);
        assert_eq!(
            err.to_string(),
            r#"[CONFIG_UNSUPPORTED_TYPE] bad tag {"index":2,"tag":"u128"}"#
        );
    }

    #[test]
    fn debug_includes_source() {
        let src = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err = CompatError::new(ErrorCode::IoBrokenPipe, "write failed").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("IoBrokenPipe"));
        assert!(dbg.contains("pipe closed"));
    }

    #[test]
    fn source_chain_is_preserved() {
        let src = io::Error::other("underlying");
        let err = CompatError::new(ErrorCode::IoFailed, "read failed").with_source(src);
        let chained = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(chained.as_deref(), Some("underlying"));
    }

    // -- Categorisation --------------------------------------------------

    #[test]
    fn launch_codes_categorised() {
        for code in [
            ErrorCode::LaunchNotFound,
            ErrorCode::LaunchPermissionDenied,
            ErrorCode::LaunchFailed,
        ] {
            assert_eq!(code.category(), ErrorCategory::Launch);
        }
    }

    #[test]
    fn config_codes_categorised() {
        assert_eq!(
            ErrorCode::ConfigNativeNotation.category(),
            ErrorCategory::Config
        );
        assert_eq!(
            ErrorCode::ConfigInvalidSeekMode.category(),
            ErrorCategory::Config
        );
    }

    #[test]
    fn launch_kind_mapping() {
        assert_eq!(
            ErrorCode::for_launch(io::ErrorKind::NotFound),
            ErrorCode::LaunchNotFound
        );
        assert_eq!(
            ErrorCode::for_launch(io::ErrorKind::PermissionDenied),
            ErrorCode::LaunchPermissionDenied
        );
        assert_eq!(
            ErrorCode::for_launch(io::ErrorKind::Other),
            ErrorCode::LaunchFailed
        );
        assert_eq!(
            ErrorCode::for_io(io::ErrorKind::BrokenPipe),
            ErrorCode::IoBrokenPipe
        );
    }

    #[test]
    fn codes_are_unique_and_serde_stable() {
        let strs: HashSet<&str> = ALL_CODES.iter().map(|c| c.as_str()).collect();
        assert_eq!(strs.len(), ALL_CODES.len());
        for code in ALL_CODES {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn dto_drops_opaque_source() {
        let err = CompatError::new(ErrorCode::FfiLibraryOpen, "open failed")
            .with_source(io::Error::other("dlopen: no such file"))
            .with_context("path", "/nope.so");
        let dto = CompatErrorDto::from(&err);
        assert_eq!(dto.code, ErrorCode::FfiLibraryOpen);
        assert_eq!(dto.source_message.as_deref(), Some("dlopen: no such file"));
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["context"]["path"], "/nope.so");
    }
}
