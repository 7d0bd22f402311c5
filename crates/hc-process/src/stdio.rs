// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-stream stdio configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;
use std::str::FromStr;

/// How one of the child's three standard streams is wired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    /// Share the parent's stream.
    #[default]
    Inherit,
    /// Create an OS pipe the adapter reads or writes.
    Piped,
    /// Redirect to the platform null device.
    Null,
}

impl StdioMode {
    /// Host stdio slot for this mode.
    pub fn to_stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Piped => Stdio::piped(),
            Self::Null => Stdio::null(),
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::Piped => "piped",
            Self::Null => "null",
        }
    }
}

impl From<StdioMode> for Stdio {
    fn from(mode: StdioMode) -> Self {
        mode.to_stdio()
    }
}

impl fmt::Display for StdioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StdioMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inherit" => Ok(Self::Inherit),
            "piped" => Ok(Self::Piped),
            "null" => Ok(Self::Null),
            other => Err(format!(
                "invalid stdio mode '{other}' (expected piped, null or inherit)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_inherit() {
        assert_eq!(StdioMode::default(), StdioMode::Inherit);
    }

    #[test]
    fn parse_roundtrips_display() {
        for mode in [StdioMode::Inherit, StdioMode::Piped, StdioMode::Null] {
            assert_eq!(mode.to_string().parse::<StdioMode>(), Ok(mode));
        }
        assert!("pipe".parse::<StdioMode>().is_err());
    }
}
